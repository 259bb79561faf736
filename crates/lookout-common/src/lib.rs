pub mod errors;
pub mod id;

pub use errors::{ConfigError, LookoutError, RelayError};
pub use id::{new_correlation_id, new_id, ConnectionId};

pub type Result<T> = std::result::Result<T, LookoutError>;
