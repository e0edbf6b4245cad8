mod smtp_transport;

pub use smtp_transport::{SmtpSession, SmtpTransport};
