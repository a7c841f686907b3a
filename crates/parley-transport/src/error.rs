/// Errors raised by brokers and broker clients.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the broker failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The peer closed the connection.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The broker refused the presented credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A frame could not be written to the socket.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading from the socket failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The broker could not bind or accept.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// A frame was not valid JSON or had an unknown `op`.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A subscription filter is malformed.
    #[error("invalid topic filter: {0}")]
    InvalidFilter(String),

    /// The client or broker has stopped.
    #[error("transport shut down")]
    Shutdown,
}
