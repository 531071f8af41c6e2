pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // transport errors
    #[error("websocket connect failed: {0}")]
    Connect(String),
    #[error("subscribe request failed: {0}")]
    Subscribe(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("operation timed out")]
    Timeout,

    // payload errors
    #[error("invalid notification: {0}")]
    InvalidNotification(String),
}

impl Error {
    /// timeouts are retried like any other transport error; callers only log
    /// them differently.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}
