use crate::features::alerting::AlertMessage;
use crate::shared::config::SmtpConfig;
use crate::shared::error::{SendStage, TransportError, TransportErrorKind};
use crate::shared::traits::{NotificationTransport, TransportSession};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::Error as SmtpError;
use lettre::Message;
use log::{debug, info};
use std::io;

/// The server closed the stream cleanly while a reply was pending.
fn is_missing_reply(err: &SmtpError) -> bool {
    // lettre reports EOF before a complete reply as an unparsable response
    err.is_response() && err.status().is_none()
}

/// The socket was torn down under us, possibly mid-write.
fn is_connection_dropped(err: &SmtpError) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            );
        }
        source = cause.source();
    }
    false
}

fn classify(err: &SmtpError, stage: SendStage) -> TransportErrorKind {
    if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_tls() || is_connection_dropped(err) {
        TransportErrorKind::Connection
    } else if is_missing_reply(err) {
        TransportErrorKind::Disconnected
    } else {
        match stage {
            SendStage::Connect => TransportErrorKind::Connection,
            SendStage::Authenticate => TransportErrorKind::Authentication,
            _ if err.is_transient() || err.is_permanent() => TransportErrorKind::Rejected,
            _ if err.is_client() => TransportErrorKind::MalformedMessage,
            _ => TransportErrorKind::Protocol,
        }
    }
}

fn smtp_error(err: &SmtpError, stage: SendStage) -> TransportError {
    TransportError::new(classify(err, stage), stage, err.to_string())
}

fn malformed(err: impl std::fmt::Display) -> TransportError {
    TransportError::new(
        TransportErrorKind::MalformedMessage,
        SendStage::Envelope,
        err.to_string(),
    )
}

fn build_email(message: &AlertMessage) -> Result<Message, TransportError> {
    let from: Mailbox = message.from.parse().map_err(malformed)?;
    let to: Mailbox = message.to.parse().map_err(malformed)?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .message_id(Some(message.message_id.clone()))
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(malformed)
}

/// Delivers alerts over SMTP with implicit TLS.
pub struct SmtpTransport {
    config: SmtpConfig,
    hello_name: ClientId,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config,
            hello_name: ClientId::Domain(whoami::hostname()),
        }
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.config.username, &self.config.password) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username.clone(), password.clone()))
            }
            _ => None,
        }
    }
}

impl NotificationTransport for SmtpTransport {
    type Session = SmtpSession;

    fn open_session(&self) -> Result<SmtpSession, TransportError> {
        let tls = TlsParameters::new(self.config.host.clone())
            .map_err(|e| smtp_error(&e, SendStage::Connect))?;

        let mut connection = SmtpConnection::connect(
            (self.config.host.as_str(), self.config.port),
            Some(self.config.timeout()),
            &self.hello_name,
            Some(&tls),
            None,
        )
        .map_err(|e| smtp_error(&e, SendStage::Connect))?;

        if let Some(credentials) = self.credentials() {
            if let Err(e) = connection.auth(&[Mechanism::Plain, Mechanism::Login], &credentials) {
                connection.abort();
                return Err(smtp_error(&e, SendStage::Authenticate));
            }
        }

        info!(
            "Opened SMTP session with {}:{}",
            self.config.host, self.config.port
        );
        Ok(SmtpSession { connection })
    }
}

pub struct SmtpSession {
    connection: SmtpConnection,
}

impl TransportSession for SmtpSession {
    fn send(&mut self, message: &AlertMessage) -> Result<(), TransportError> {
        let email = build_email(message)?;
        let envelope = email.envelope();

        self.connection
            .command(Mail::new(envelope.from().cloned(), vec![]))
            .map_err(|e| smtp_error(&e, SendStage::Envelope))?;
        for recipient in envelope.to() {
            self.connection
                .command(Rcpt::new(recipient.clone(), vec![]))
                .map_err(|e| smtp_error(&e, SendStage::Envelope))?;
        }
        self.connection
            .command(Data)
            .map_err(|e| smtp_error(&e, SendStage::Envelope))?;

        self.connection
            .message(&email.formatted())
            .map_err(|e| smtp_error(&e, SendStage::Payload))?;

        debug!("SMTP server accepted {}", message.message_id);
        Ok(())
    }

    fn close(mut self) {
        if self.connection.has_broken() {
            debug!("SMTP connection already closed by the server");
            return;
        }
        if let Err(e) = self.connection.quit() {
            debug!("Ignoring error while closing SMTP session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread;
    use std::time::Duration;

    /// How the stub server ends the exchange.
    #[derive(Clone, Copy)]
    enum StubEnding {
        /// Reads the whole message, then closes without a final reply.
        HangUpAfterPayload,
        /// Reads 1 KiB of the message, then closes with data unread.
        HangUpMidPayload,
        /// Refuses the recipient with a permanent error.
        RejectRecipient,
    }

    fn spawn_stub_server(ending: StubEnding) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let _ = writer.write_all(b"220 stub ESMTP\r\n");

            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    return;
                }
                let command = line.to_ascii_uppercase();
                let reply: &[u8] = if command.starts_with("EHLO") {
                    b"250 stub\r\n"
                } else if command.starts_with("MAIL") {
                    b"250 2.1.0 OK\r\n"
                } else if command.starts_with("RCPT") {
                    match ending {
                        StubEnding::RejectRecipient => b"550 5.1.1 No such user\r\n",
                        _ => b"250 2.1.5 OK\r\n",
                    }
                } else if command.starts_with("DATA") {
                    let _ = writer.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n");
                    match ending {
                        StubEnding::HangUpMidPayload => {
                            let mut chunk = [0u8; 1024];
                            let _ = reader.read(&mut chunk);
                        }
                        _ => loop {
                            line.clear();
                            if reader.read_line(&mut line).unwrap_or(0) == 0 || line == ".\r\n" {
                                break;
                            }
                        },
                    }
                    return;
                } else if command.starts_with("QUIT") {
                    let _ = writer.write_all(b"221 Bye\r\n");
                    return;
                } else {
                    b"500 Unrecognised command\r\n"
                };
                let _ = writer.write_all(reply);
            }
        });

        addr
    }

    fn plain_session(addr: SocketAddr) -> SmtpSession {
        let connection = SmtpConnection::connect(
            addr,
            Some(Duration::from_secs(5)),
            &ClientId::Domain("client.test".to_string()),
            None,
            None,
        )
        .unwrap();
        SmtpSession { connection }
    }

    fn alert(from: &str, to: &str) -> AlertMessage {
        AlertMessage {
            subject: "[Server Alert] High Resource Usage".to_string(),
            body: "CPU Usage: 95.0%\nDisk Usage: 10.0%".to_string(),
            from: from.to_string(),
            to: to.to_string(),
            message_id: "<5f0c@host.example>".to_string(),
        }
    }

    #[test]
    fn builds_plain_text_email_with_message_id() {
        let email = build_email(&alert("ops@example.org", "oncall@example.org")).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("Message-ID: <5f0c@host.example>"));
        assert!(formatted.contains("Subject: [Server Alert] High Resource Usage"));
        assert!(formatted.contains("Content-Type: text/plain"));
        assert_eq!(email.envelope().to().len(), 1);
    }

    #[test]
    fn invalid_address_is_malformed_message() {
        let err = build_email(&alert("not-an-address", "oncall@example.org")).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::MalformedMessage);
        assert!(!err.is_tolerated_disconnect());
    }

    #[test]
    fn hang_up_after_full_payload_is_tolerated() {
        let mut session = plain_session(spawn_stub_server(StubEnding::HangUpAfterPayload));

        let err = session
            .send(&alert("ops@example.org", "oncall@example.org"))
            .unwrap_err();
        session.close();

        assert_eq!(err.kind, TransportErrorKind::Disconnected);
        assert_eq!(err.stage, SendStage::Payload);
        assert!(err.is_tolerated_disconnect());
    }

    #[test]
    fn hang_up_mid_payload_is_critical() {
        let mut session = plain_session(spawn_stub_server(StubEnding::HangUpMidPayload));
        let mut message = alert("ops@example.org", "oncall@example.org");
        message.body = "x".repeat(20 * 1024 * 1024);

        let err = session.send(&message).unwrap_err();
        session.close();

        assert_eq!(err.kind, TransportErrorKind::Connection);
        assert_eq!(err.stage, SendStage::Payload);
        assert!(!err.is_tolerated_disconnect());
    }

    #[test]
    fn refused_recipient_is_rejected() {
        let mut session = plain_session(spawn_stub_server(StubEnding::RejectRecipient));

        let err = session
            .send(&alert("ops@example.org", "oncall@example.org"))
            .unwrap_err();
        session.close();

        assert_eq!(err.kind, TransportErrorKind::Rejected);
        assert_eq!(err.stage, SendStage::Envelope);
        assert!(!err.is_tolerated_disconnect());
    }
}
