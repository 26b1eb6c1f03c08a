use stalk_proto::{ProtocolError, Response};

/// Errors returned by both client generations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("job {0} was buried: server out of memory")]
    Buried(u64),

    #[error("job exceeds the server's max-job-size")]
    JobTooBig,

    #[error("server is draining and refuses new jobs")]
    Draining,

    #[error("job data was not terminated by CRLF")]
    ExpectedCrlf,

    #[error("a reserved job is about to exceed its time-to-run")]
    DeadlineSoon,

    #[error("cannot ignore the only watched tube")]
    NotIgnored,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("server rejected {command}: {response}")]
    Server {
        command: &'static str,
        response: &'static str,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// True when the failure came from the socket rather than from a server
    /// reply, i.e. the session is gone.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { .. } | ClientError::Io(_) | ClientError::Protocol(_)
        )
    }
}

// --- Mapping helpers ---

/// Maps a reply no command-specific arm accepted.
pub(crate) fn unexpected_response(command: &'static str, response: Response) -> ClientError {
    if response.is_server_error() {
        return ClientError::Server {
            command,
            response: response.keyword(),
        };
    }
    ClientError::Protocol(ProtocolError::UnexpectedResponse {
        command,
        response: response.keyword().to_string(),
    })
}
