/// Framing and parsing errors. Any of these leaves the byte stream in an
/// unknown position, so the connection that produced it must not be reused.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed in the middle of a frame")]
    UnexpectedEof,

    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error("malformed line: {0:?}")]
    Malformed(String),

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("data block is not terminated by CRLF")]
    MissingCrlf,

    #[error("unexpected response to {command}: {response}")]
    UnexpectedResponse {
        command: &'static str,
        response: String,
    },

    #[error("invalid stats document: {0}")]
    Stats(#[from] serde_yaml::Error),
}
