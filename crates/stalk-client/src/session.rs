use std::io::{self, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use stalk_proto::{Command, Response, TubeStats};
use tracing::{debug, trace};

use crate::error::{unexpected_response, ClientError};

/// Tube every fresh protocol session uses and watches.
pub(crate) const DEFAULT_TUBE: &str = "default";

/// A reserved job as read off the wire.
pub(crate) struct RawJob {
    pub(crate) id: u64,
    pub(crate) data: Vec<u8>,
}

/// The open socket of a session.
struct Stream {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

enum Link {
    /// No command sent yet.
    Idle,
    Open(Stream),
    /// The socket failed or could not be opened. Never reopened.
    Closed,
}

/// Protocol session shared by both client generations.
///
/// The socket is opened on the first command and lives as long as the
/// session. Any socket or framing failure closes it for good: every later
/// command fails with a `NotConnected` i/o error, so a reservation lost with
/// the socket can't be acknowledged through a fresh one.
pub(crate) struct Session {
    addr: String,
    connect_timeout: Option<Duration>,
    link: Link,
    /// Tubes the open socket watches, mirrored locally.
    watching: Vec<String>,
}

impl Session {
    pub(crate) fn new(host: &str, port: u16, connect_timeout: Option<Duration>) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            connect_timeout,
            link: Link::Idle,
            watching: vec![DEFAULT_TUBE.to_string()],
        }
    }

    pub(crate) fn addr(&self) -> &str {
        &self.addr
    }

    pub(crate) fn use_tube(&mut self, tube: &str) -> Result<(), ClientError> {
        let command = Command::use_tube(tube);
        match self.round_trip(&command)? {
            Response::Using(used) if used == tube => Ok(()),
            other => Err(unexpected_response(command.name(), other)),
        }
    }

    pub(crate) fn watch(&mut self, tube: &str) -> Result<u32, ClientError> {
        let command = Command::watch(tube);
        match self.round_trip(&command)? {
            Response::Watching(count) => {
                if !self.watching.iter().any(|t| t == tube) {
                    self.watching.push(tube.to_string());
                }
                Ok(count)
            }
            other => Err(unexpected_response(command.name(), other)),
        }
    }

    pub(crate) fn ignore(&mut self, tube: &str) -> Result<u32, ClientError> {
        let command = Command::ignore(tube);
        match self.round_trip(&command)? {
            Response::Watching(count) => {
                self.watching.retain(|t| t != tube);
                Ok(count)
            }
            Response::NotIgnored => Err(ClientError::NotIgnored),
            other => Err(unexpected_response(command.name(), other)),
        }
    }

    /// Watch `tube` and ignore every other tube on the watch list.
    pub(crate) fn watch_only(&mut self, tube: &str) -> Result<(), ClientError> {
        self.watch(tube)?;
        let others: Vec<String> = self
            .watching
            .iter()
            .filter(|t| t.as_str() != tube)
            .cloned()
            .collect();
        for other in others {
            self.ignore(&other)?;
        }
        Ok(())
    }

    pub(crate) fn put(
        &mut self,
        data: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ClientError> {
        let command = Command::put(priority, delay, ttr, data);
        match self.round_trip(&command)? {
            Response::Inserted(id) => Ok(id),
            Response::Buried(id) => Err(ClientError::Buried(id)),
            Response::JobTooBig => Err(ClientError::JobTooBig),
            Response::Draining => Err(ClientError::Draining),
            Response::ExpectedCrlf => Err(ClientError::ExpectedCrlf),
            other => Err(unexpected_response(command.name(), other)),
        }
    }

    pub(crate) fn reserve_with_timeout(&mut self, timeout: u32) -> Result<Option<RawJob>, ClientError> {
        let command = Command::ReserveWithTimeout { timeout };
        match self.round_trip(&command)? {
            Response::Reserved { id, data } => Ok(Some(RawJob { id, data })),
            Response::TimedOut => Ok(None),
            Response::DeadlineSoon => Err(ClientError::DeadlineSoon),
            other => Err(unexpected_response(command.name(), other)),
        }
    }

    pub(crate) fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        let command = Command::Delete { id };
        match self.round_trip(&command)? {
            Response::Deleted => Ok(()),
            Response::NotFound => Err(ClientError::NotFound(format!("job {id}"))),
            other => Err(unexpected_response(command.name(), other)),
        }
    }

    pub(crate) fn stats_tube(&mut self, tube: &str) -> Result<TubeStats, ClientError> {
        let command = Command::stats_tube(tube);
        match self.round_trip(&command)? {
            Response::Ok(document) => Ok(TubeStats::parse(&document)?),
            Response::NotFound => Err(ClientError::NotFound(format!("tube {tube}"))),
            other => Err(unexpected_response(command.name(), other)),
        }
    }

    /// Send one command and read its reply.
    fn round_trip(&mut self, command: &Command<'_>) -> Result<Response, ClientError> {
        let mut frame = Vec::with_capacity(64);
        command.write_to(&mut frame)?;

        let stream = self.stream()?;
        trace!(%command, "sending command");
        let result = stream
            .writer
            .write_all(&frame)
            .map_err(ClientError::from)
            .and_then(|()| Response::read_from(&mut stream.reader).map_err(ClientError::from));

        if result.is_err() {
            debug!(addr = %self.addr, command = command.name(), "closing session after failure");
            self.disconnect();
        }
        result
    }

    fn stream(&mut self) -> Result<&mut Stream, ClientError> {
        if let Link::Idle = self.link {
            match self.connect() {
                Ok(stream) => self.link = Link::Open(stream),
                Err(e) => {
                    self.link = Link::Closed;
                    return Err(e);
                }
            }
        }
        match &mut self.link {
            Link::Open(stream) => Ok(stream),
            Link::Idle | Link::Closed => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("connection to {} was closed by an earlier failure", self.addr),
            ))),
        }
    }

    fn connect(&self) -> Result<Stream, ClientError> {
        let connect_error = |source| ClientError::Connect {
            addr: self.addr.clone(),
            source,
        };

        let socket = match self.connect_timeout {
            Some(timeout) => {
                let mut last_error = None;
                let mut connected = None;
                for addr in self.addr.to_socket_addrs().map_err(connect_error)? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(socket) => {
                            connected = Some(socket);
                            break;
                        }
                        Err(e) => last_error = Some(e),
                    }
                }
                match connected {
                    Some(socket) => socket,
                    None => {
                        return Err(connect_error(last_error.unwrap_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::NotFound,
                                "address resolved to nothing",
                            )
                        })))
                    }
                }
            }
            None => TcpStream::connect(&self.addr).map_err(connect_error)?,
        };

        socket.set_nodelay(true)?;
        let reader = BufReader::new(socket.try_clone()?);
        debug!(addr = %self.addr, "connected to queue server");
        Ok(Stream {
            reader,
            writer: socket,
        })
    }

    fn disconnect(&mut self) {
        self.link = Link::Closed;
    }
}
