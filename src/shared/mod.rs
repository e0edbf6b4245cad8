pub mod config;
pub mod storage;
pub mod transport;
pub mod error;
pub mod traits;

pub use error::*;
pub use traits::*;
