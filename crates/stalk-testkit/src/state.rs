use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use stalk_proto::{validate_tube_name, Command, Response, TubeStats};

const DEFAULT_TUBE: &str = "default";
const URGENT_PRIORITY: u32 = 1024;

/// A `put` as the server received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub id: u64,
    pub tube: String,
    pub priority: u32,
    /// Whole seconds, as carried on the wire.
    pub delay: u32,
    pub ttr: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Ready,
    Delayed,
    Reserved,
}

enum Phase {
    Ready,
    Delayed { until: Instant },
    Reserved { by: u64, deadline: Instant },
}

struct JobRecord {
    tube: String,
    priority: u32,
    ttr: u32,
    data: Vec<u8>,
    phase: Phase,
}

#[derive(Default)]
struct TubeCounters {
    total_jobs: u64,
    cmd_delete: u64,
}

/// Per-connection protocol state.
pub(crate) struct ClientSession {
    pub(crate) id: u64,
    using: String,
    watching: Vec<String>,
}

impl ClientSession {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            id,
            using: DEFAULT_TUBE.to_string(),
            watching: vec![DEFAULT_TUBE.to_string()],
        }
    }
}

/// Jobs, tubes and the request log shared by every connection.
pub(crate) struct State {
    next_id: u64,
    jobs: BTreeMap<u64, JobRecord>,
    tubes: BTreeMap<String, TubeCounters>,
    puts: Vec<PutRecord>,
    commands: Vec<String>,
    max_job_size: usize,
}

impl State {
    pub(crate) fn new(max_job_size: usize) -> Self {
        let mut tubes = BTreeMap::new();
        tubes.insert(DEFAULT_TUBE.to_string(), TubeCounters::default());
        Self {
            next_id: 1,
            jobs: BTreeMap::new(),
            tubes,
            puts: Vec::new(),
            commands: Vec::new(),
            max_job_size,
        }
    }

    pub(crate) fn log(&mut self, command: &Command<'_>) {
        self.commands.push(command.to_string());
    }

    pub(crate) fn commands(&self) -> &[String] {
        &self.commands
    }

    pub(crate) fn puts(&self) -> &[PutRecord] {
        &self.puts
    }

    pub(crate) fn job_status(&self, id: u64) -> Option<JobStatus> {
        self.jobs.get(&id).map(|job| match job.phase {
            Phase::Ready => JobStatus::Ready,
            Phase::Delayed { .. } => JobStatus::Delayed,
            Phase::Reserved { .. } => JobStatus::Reserved,
        })
    }

    pub(crate) fn ready_count(&self, tube: &str) -> usize {
        self.jobs
            .values()
            .filter(|job| job.tube == tube && matches!(job.phase, Phase::Ready))
            .count()
    }

    /// Promote delayed jobs whose delay elapsed and return reservations
    /// whose time-to-run expired.
    pub(crate) fn tick(&mut self, now: Instant) {
        for job in self.jobs.values_mut() {
            let due = match job.phase {
                Phase::Delayed { until } => until <= now,
                Phase::Reserved { deadline, .. } => deadline <= now,
                Phase::Ready => false,
            };
            if due {
                job.phase = Phase::Ready;
            }
        }
    }

    /// Put every job reserved by a closed connection back in the ready queue.
    pub(crate) fn release_reserved_by(&mut self, session_id: u64) {
        for job in self.jobs.values_mut() {
            if matches!(job.phase, Phase::Reserved { by, .. } if by == session_id) {
                job.phase = Phase::Ready;
            }
        }
    }

    /// Reserve the most urgent ready job on a watched tube, oldest first
    /// among equal priorities.
    pub(crate) fn try_reserve(&mut self, session: &ClientSession, now: Instant) -> Option<Response> {
        let (&id, job) = self
            .jobs
            .iter_mut()
            .filter(|(_, job)| {
                matches!(job.phase, Phase::Ready) && session.watching.contains(&job.tube)
            })
            .min_by_key(|(id, job)| (job.priority, **id))?;

        job.phase = Phase::Reserved {
            by: session.id,
            deadline: now + Duration::from_secs(u64::from(job.ttr)),
        };
        Some(Response::Reserved {
            id,
            data: job.data.clone(),
        })
    }

    /// Apply a command that never blocks. A reserve is answered immediately.
    pub(crate) fn execute(
        &mut self,
        session: &mut ClientSession,
        command: &Command<'_>,
        now: Instant,
    ) -> Response {
        self.tick(now);
        match command {
            Command::Use { tube } => {
                if validate_tube_name(tube).is_err() {
                    return Response::BadFormat;
                }
                self.tubes.entry(tube.to_string()).or_default();
                session.using = tube.to_string();
                Response::Using(tube.to_string())
            }
            Command::Watch { tube } => {
                if validate_tube_name(tube).is_err() {
                    return Response::BadFormat;
                }
                self.tubes.entry(tube.to_string()).or_default();
                if !session.watching.iter().any(|t| t == tube) {
                    session.watching.push(tube.to_string());
                }
                Response::Watching(session.watching.len() as u32)
            }
            Command::Ignore { tube } => {
                if session.watching.iter().any(|t| t == tube) {
                    if session.watching.len() == 1 {
                        return Response::NotIgnored;
                    }
                    session.watching.retain(|t| t != tube);
                }
                Response::Watching(session.watching.len() as u32)
            }
            Command::Put {
                priority,
                delay,
                ttr,
                data,
            } => {
                if data.len() > self.max_job_size {
                    return Response::JobTooBig;
                }
                let id = self.next_id;
                self.next_id += 1;

                let phase = if *delay == 0 {
                    Phase::Ready
                } else {
                    Phase::Delayed {
                        until: now + Duration::from_secs(u64::from(*delay)),
                    }
                };
                self.jobs.insert(
                    id,
                    JobRecord {
                        tube: session.using.clone(),
                        priority: *priority,
                        ttr: (*ttr).max(1),
                        data: data.to_vec(),
                        phase,
                    },
                );
                self.tubes.entry(session.using.clone()).or_default().total_jobs += 1;
                self.puts.push(PutRecord {
                    id,
                    tube: session.using.clone(),
                    priority: *priority,
                    delay: *delay,
                    ttr: *ttr,
                    data: data.to_vec(),
                });
                Response::Inserted(id)
            }
            Command::ReserveWithTimeout { .. } => self
                .try_reserve(session, now)
                .unwrap_or(Response::TimedOut),
            Command::Delete { id } => {
                let deletable = match self.jobs.get(id) {
                    Some(job) => match job.phase {
                        Phase::Reserved { by, .. } => by == session.id,
                        _ => true,
                    },
                    None => false,
                };
                if !deletable {
                    return Response::NotFound;
                }
                if let Some(job) = self.jobs.remove(id) {
                    self.tubes.entry(job.tube).or_default().cmd_delete += 1;
                }
                Response::Deleted
            }
            Command::StatsTube { tube } => match self.stats(tube) {
                Some(stats) => match stats.to_yaml() {
                    Ok(document) => Response::Ok(document),
                    Err(_) => Response::InternalError,
                },
                None => Response::NotFound,
            },
        }
    }

    fn stats(&self, tube: &str) -> Option<TubeStats> {
        let counters = self.tubes.get(tube)?;
        let mut stats = TubeStats {
            name: tube.to_string(),
            total_jobs: counters.total_jobs,
            cmd_delete: counters.cmd_delete,
            ..TubeStats::default()
        };
        for job in self.jobs.values().filter(|job| job.tube == tube) {
            match job.phase {
                Phase::Ready => {
                    stats.current_jobs_ready += 1;
                    if job.priority < URGENT_PRIORITY {
                        stats.current_jobs_urgent += 1;
                    }
                }
                Phase::Delayed { .. } => stats.current_jobs_delayed += 1,
                Phase::Reserved { .. } => stats.current_jobs_reserved += 1,
            }
        }
        Some(stats)
    }
}
