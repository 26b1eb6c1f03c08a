use std::io::{BufReader, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use stalk_proto::{Command, ProtocolError, Response, DEFAULT_MAX_JOB_SIZE};
use tracing::debug;

use crate::state::{ClientSession, JobStatus, PutRecord, State};

/// How often blocked reservations and the acceptor re-check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct Shared {
    state: Mutex<State>,
    changed: Condvar,
    shutdown: AtomicBool,
    sockets: Mutex<Vec<TcpStream>>,
    next_session: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, session: &mut ClientSession, command: &Command<'_>) -> Response {
        let mut state = self.state();
        state.log(command);

        let Command::ReserveWithTimeout { timeout } = command else {
            let response = state.execute(session, command, Instant::now());
            self.changed.notify_all();
            return response;
        };

        let deadline = Instant::now() + Duration::from_secs(u64::from(*timeout));
        loop {
            let now = Instant::now();
            state.tick(now);
            if let Some(response) = state.try_reserve(session, now) {
                return response;
            }
            if now >= deadline || self.shutdown.load(Ordering::SeqCst) {
                return Response::TimedOut;
            }
            let wait = (deadline - now).min(POLL_INTERVAL);
            state = match self.changed.wait_timeout(state, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// A running in-memory server, stopped when dropped.
///
/// ```no_run
/// let server = stalk_testkit::TestServer::start();
/// let dsn = format!("{}?tube_name=emails", server.dsn());
/// # let _ = dsn;
/// ```
pub struct TestServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    acceptor: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server on a random loopback port.
    pub fn start() -> Self {
        Self::start_with_max_job_size(DEFAULT_MAX_JOB_SIZE)
    }

    /// Start a server that answers `JOB_TOO_BIG` above `max_job_size` bytes.
    pub fn start_with_max_job_size(max_job_size: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("test server address");
        listener
            .set_nonblocking(true)
            .expect("non-blocking test listener");

        let shared = Arc::new(Shared {
            state: Mutex::new(State::new(max_job_size)),
            changed: Condvar::new(),
            shutdown: AtomicBool::new(false),
            sockets: Mutex::new(Vec::new()),
            next_session: AtomicU64::new(1),
        });

        let accept_shared = Arc::clone(&shared);
        let acceptor = thread::Builder::new()
            .name("stalk-testkit-accept".to_string())
            .spawn(move || accept_loop(listener, accept_shared))
            .expect("spawn test server acceptor");

        debug!(%addr, "test server started");
        Self {
            addr,
            shared,
            acceptor: Some(acceptor),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// DSN pointing at this server, without a query string.
    pub fn dsn(&self) -> String {
        format!("beanstalkd://{}", self.addr)
    }

    /// Every `put` received so far, in arrival order.
    pub fn puts(&self) -> Vec<PutRecord> {
        self.shared.state().puts().to_vec()
    }

    /// Every request line received so far, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.shared.state().commands().to_vec()
    }

    pub fn job_status(&self, id: u64) -> Option<JobStatus> {
        let mut state = self.shared.state();
        state.tick(Instant::now());
        state.job_status(id)
    }

    pub fn ready_count(&self, tube: &str) -> usize {
        let mut state = self.shared.state();
        state.tick(Instant::now());
        state.ready_count(tube)
    }

    /// Close every client socket, as a server restart would.
    pub fn drop_connections(&self) {
        let sockets = std::mem::take(
            &mut *self
                .shared
                .sockets
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for socket in sockets {
            let _ = socket.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.drop_connections();
        self.shared.changed.notify_all();
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
    }
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    while !shared.shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((socket, peer)) => {
                if socket.set_nonblocking(false).is_err() {
                    continue;
                }
                if let Ok(handle) = socket.try_clone() {
                    shared
                        .sockets
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(handle);
                }
                let conn_shared = Arc::clone(&shared);
                let spawned = thread::Builder::new()
                    .name(format!("stalk-testkit-{peer}"))
                    .spawn(move || serve(conn_shared, socket));
                if let Err(e) = spawned {
                    debug!(error = %e, "failed to spawn test connection thread");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL / 4),
            Err(e) => {
                debug!(error = %e, "test server accept failed");
                break;
            }
        }
    }
}

fn serve(shared: Arc<Shared>, socket: TcpStream) {
    let session_id = shared.next_session.fetch_add(1, Ordering::SeqCst);
    let mut session = ClientSession::new(session_id);
    let Ok(read_half) = socket.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut writer = socket;

    loop {
        let response = match Command::read_from(&mut reader) {
            Ok(Some(command)) => shared.handle(&mut session, &command),
            Ok(None) => break,
            Err(ProtocolError::UnknownCommand(_)) => Response::UnknownCommand,
            Err(ProtocolError::Malformed(_)) => Response::BadFormat,
            Err(ProtocolError::MissingCrlf) => Response::ExpectedCrlf,
            Err(e) => {
                debug!(session_id, error = %e, "closing test connection");
                break;
            }
        };

        let mut frame = Vec::with_capacity(64);
        if response.write_to(&mut frame).is_err() || writer.write_all(&frame).is_err() {
            break;
        }
    }

    shared.state().release_reserved_by(session.id);
    shared.changed.notify_all();
}
