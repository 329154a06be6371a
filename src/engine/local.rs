//! In-process scheduling engine.
//!
//! The local engine is driven by a command channel and a tick loop: control
//! operations travel through the channel so lifecycle transitions and
//! listener callbacks happen on the engine task, while status queries read
//! shared state directly. Triggers are declared in the configuration
//! properties (`job.<key>.schedule=...`) and fire at most once per tick
//! window, regardless of how many occurrences were missed.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use uuid::Uuid;

use super::schedule::Schedule;
use super::{
    EngineError, EngineFactory, EngineHandle, EngineListener, EngineMeta, JobDetail, ListenerInfo,
    LoggingListener, NoopListener, TriggerDetail, TriggerState,
};
use crate::core::props::ConfigProps;
use crate::core::types::{JobKey, TriggerKey};

/// Buffer size for the command channel between handle and engine loop.
const COMMAND_CHANNEL_BUFFER: usize = 32;

const DEFAULT_ENGINE_NAME: &str = "scheduler";
const DEFAULT_TICK_MILLIS: u64 = 1000;
const MIN_TICK_MILLIS: u64 = 10;

const NAME_KEY: &str = "engine.name";
const TICK_MILLIS_KEY: &str = "engine.tickMillis";
const TIMEZONE_KEY: &str = "engine.timezone";

/// Lifecycle state of the engine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    /// Alive but not firing triggers. Fresh engines begin here.
    Standby,
    /// Firing due triggers on every tick.
    Started,
    /// Terminal. The loop has exited.
    Shutdown,
}

impl RunState {
    fn label(self) -> &'static str {
        match self {
            RunState::Standby => "standby",
            RunState::Started => "started",
            RunState::Shutdown => "shutdown",
        }
    }
}

/// One trigger with its live bookkeeping.
struct TriggerSlot {
    key: TriggerKey,
    job_key: JobKey,
    schedule: Schedule,
    state: TriggerState,
    previous_fire_time: Option<DateTime<Utc>>,
    times_fired: u64,
}

impl TriggerSlot {
    fn detail(&self, now: DateTime<Utc>) -> TriggerDetail {
        TriggerDetail {
            key: self.key.clone(),
            job_key: self.job_key.clone(),
            schedule: self.schedule.expression().to_string(),
            state: self.state,
            previous_fire_time: self.previous_fire_time,
            next_fire_time: self.schedule.next_after(now),
            times_fired: self.times_fired,
        }
    }
}

/// State shared between the handle and the engine loop.
struct EngineShared {
    state: RwLock<RunState>,
    running_since: RwLock<Option<DateTime<Utc>>>,
    triggers: RwLock<BTreeMap<TriggerKey, TriggerSlot>>,
    fired_count: AtomicU64,
}

enum EngineCommand {
    Start {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Standby {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Shutdown {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
}

/// In-process engine instance.
pub struct LocalEngine {
    name: String,
    instance_id: String,
    tick_interval: Duration,
    jobs: BTreeMap<JobKey, JobDetail>,
    listeners: Arc<Vec<Arc<dyn EngineListener>>>,
    shared: Arc<EngineShared>,
    command_tx: mpsc::Sender<EngineCommand>,
}

impl LocalEngine {
    /// Build an engine from configuration properties and spawn its loop.
    ///
    /// Recognized keys: `engine.name`, `engine.tickMillis`, `engine.timezone`,
    /// `job.<key>.schedule`, `job.<key>.description`, `listener.<name>`.
    /// Unrecognized keys are ignored so callers can mix in their own.
    pub fn from_props(props: &ConfigProps) -> Result<Self, EngineError> {
        let name = props.get_or(NAME_KEY, DEFAULT_ENGINE_NAME).to_string();
        let tick_millis = props
            .get_u64(TICK_MILLIS_KEY)
            .unwrap_or(DEFAULT_TICK_MILLIS)
            .max(MIN_TICK_MILLIS);
        let timezone = props.get_or(TIMEZONE_KEY, "UTC");

        let mut jobs = BTreeMap::new();
        let mut triggers = BTreeMap::new();
        for (job_name, fields) in props.grouped("job") {
            let expression = fields.get("schedule").ok_or_else(|| {
                EngineError::InvalidConfig(format!("job {}: missing schedule", job_name))
            })?;
            let schedule = Schedule::parse_in_tz(expression.as_str(), timezone).map_err(|e| {
                EngineError::InvalidConfig(format!("job {}: {}", job_name, e))
            })?;

            let job_key = JobKey::new(job_name.as_str());
            jobs.insert(
                job_key.clone(),
                JobDetail {
                    key: job_key.clone(),
                    description: fields.get("description").cloned(),
                },
            );

            let trigger_key = TriggerKey::new(job_name.as_str());
            triggers.insert(
                trigger_key.clone(),
                TriggerSlot {
                    key: trigger_key,
                    job_key,
                    schedule,
                    state: TriggerState::Normal,
                    previous_fire_time: None,
                    times_fired: 0,
                },
            );
        }

        let mut listeners: Vec<Arc<dyn EngineListener>> = Vec::new();
        for (listener_name, kind) in props.with_prefix("listener") {
            match kind.as_str() {
                "logging" => listeners.push(Arc::new(LoggingListener::new(listener_name))),
                "noop" => listeners.push(Arc::new(NoopListener::new(listener_name))),
                other => {
                    return Err(EngineError::InvalidConfig(format!(
                        "listener {}: unknown kind {}",
                        listener_name, other
                    )));
                }
            }
        }

        let shared = Arc::new(EngineShared {
            state: RwLock::new(RunState::Standby),
            running_since: RwLock::new(None),
            triggers: RwLock::new(triggers),
            fired_count: AtomicU64::new(0),
        });
        let listeners = Arc::new(listeners);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_BUFFER);
        let tick_interval = Duration::from_millis(tick_millis);

        let engine = Self {
            name: name.clone(),
            instance_id: Uuid::new_v4().simple().to_string(),
            tick_interval,
            jobs,
            listeners: Arc::clone(&listeners),
            shared: Arc::clone(&shared),
            command_tx,
        };

        tokio::spawn(run_loop(shared, command_rx, listeners, tick_interval, name));

        Ok(engine)
    }

    async fn send_command(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), EngineError>>) -> EngineCommand,
        operation: &str,
    ) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            // A closed channel means the loop has exited, i.e. shutdown.
            .map_err(|_| EngineError::Shutdown)?;

        reply_rx
            .await
            .map_err(|_| EngineError::ChannelClosed(format!("no reply to {}", operation)))?
    }

    async fn run_state(&self) -> RunState {
        *self.shared.state.read().await
    }
}

#[async_trait::async_trait]
impl EngineHandle for LocalEngine {
    async fn start(&self) -> Result<(), EngineError> {
        self.send_command(|reply| EngineCommand::Start { reply }, "start")
            .await
    }

    async fn standby(&self) -> Result<(), EngineError> {
        self.send_command(|reply| EngineCommand::Standby { reply }, "standby")
            .await
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        if self.run_state().await == RunState::Shutdown {
            return Ok(());
        }
        match self
            .send_command(|reply| EngineCommand::Shutdown { reply }, "shutdown")
            .await
        {
            // Lost the race against another shutdown; the engine is down.
            Err(EngineError::Shutdown) => Ok(()),
            other => other,
        }
    }

    async fn is_started(&self) -> Result<bool, EngineError> {
        Ok(self.run_state().await == RunState::Started)
    }

    async fn is_standby(&self) -> Result<bool, EngineError> {
        Ok(self.run_state().await == RunState::Standby)
    }

    async fn is_shutdown(&self) -> Result<bool, EngineError> {
        Ok(self.run_state().await == RunState::Shutdown)
    }

    async fn metadata(&self) -> Result<EngineMeta, EngineError> {
        Ok(EngineMeta {
            name: self.name.clone(),
            instance_id: self.instance_id.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: self.run_state().await.label().to_string(),
            running_since: *self.shared.running_since.read().await,
            job_count: self.jobs.len(),
            fired_count: self.shared.fired_count.load(Ordering::Relaxed),
            tick_interval: self.tick_interval,
        })
    }

    async fn all_jobs(&self) -> Result<Vec<JobDetail>, EngineError> {
        if self.run_state().await == RunState::Shutdown {
            return Err(EngineError::Shutdown);
        }
        Ok(self.jobs.values().cloned().collect())
    }

    async fn triggers_of_job(&self, job: &JobKey) -> Result<Vec<TriggerDetail>, EngineError> {
        if self.run_state().await == RunState::Shutdown {
            return Err(EngineError::Shutdown);
        }
        if !self.jobs.contains_key(job) {
            return Err(EngineError::JobNotFound(job.clone()));
        }
        let now = Utc::now();
        let triggers = self.shared.triggers.read().await;
        Ok(triggers
            .values()
            .filter(|slot| &slot.job_key == job)
            .map(|slot| slot.detail(now))
            .collect())
    }

    async fn trigger_state(&self, trigger: &TriggerKey) -> Result<TriggerState, EngineError> {
        if self.run_state().await == RunState::Shutdown {
            return Err(EngineError::Shutdown);
        }
        let triggers = self.shared.triggers.read().await;
        triggers
            .get(trigger)
            .map(|slot| slot.state)
            .ok_or_else(|| EngineError::TriggerNotFound(trigger.clone()))
    }

    async fn pause_all_triggers(&self) -> Result<Vec<TriggerDetail>, EngineError> {
        if self.run_state().await == RunState::Shutdown {
            return Err(EngineError::Shutdown);
        }
        let now = Utc::now();
        let mut triggers = self.shared.triggers.write().await;
        let mut paused = Vec::new();
        for slot in triggers.values_mut() {
            if slot.state == TriggerState::Normal {
                slot.state = TriggerState::Paused;
                paused.push(slot.detail(now));
            }
        }
        tracing::info!(engine = %self.name, count = paused.len(), "paused triggers");
        Ok(paused)
    }

    async fn resume_all_triggers(&self) -> Result<Vec<TriggerDetail>, EngineError> {
        if self.run_state().await == RunState::Shutdown {
            return Err(EngineError::Shutdown);
        }
        let now = Utc::now();
        let mut triggers = self.shared.triggers.write().await;
        let mut resumed = Vec::new();
        for slot in triggers.values_mut() {
            if slot.state == TriggerState::Paused {
                slot.state = TriggerState::Normal;
                resumed.push(slot.detail(now));
            }
        }
        tracing::info!(engine = %self.name, count = resumed.len(), "resumed triggers");
        Ok(resumed)
    }

    async fn listeners(&self) -> Result<Vec<ListenerInfo>, EngineError> {
        Ok(self
            .listeners
            .iter()
            .map(|l| ListenerInfo {
                name: l.name().to_string(),
                kind: l.kind().to_string(),
            })
            .collect())
    }
}

/// Main engine loop: fires due triggers and serves control commands.
async fn run_loop(
    shared: Arc<EngineShared>,
    mut command_rx: mpsc::Receiver<EngineCommand>,
    listeners: Arc<Vec<Arc<dyn EngineListener>>>,
    tick_interval: Duration,
    name: String,
) {
    let mut interval = tokio::time::interval(tick_interval);
    let mut last_check = Utc::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now();
                if *shared.state.read().await == RunState::Started {
                    fire_due_triggers(&shared, &listeners, &name, last_check, now).await;
                }
                last_check = now;
            }

            command = command_rx.recv() => {
                // All handles gone without a shutdown command: stop ticking.
                let Some(command) = command else {
                    *shared.state.write().await = RunState::Shutdown;
                    break;
                };
                match command {
                    EngineCommand::Start { reply } => {
                        let mut state = shared.state.write().await;
                        match *state {
                            RunState::Started => {
                                let _ = reply.send(Ok(()));
                            }
                            RunState::Standby => {
                                *state = RunState::Started;
                                drop(state);

                                let mut since = shared.running_since.write().await;
                                if since.is_none() {
                                    *since = Some(Utc::now());
                                }
                                drop(since);

                                // Skip occurrences that passed while in standby.
                                last_check = Utc::now();

                                tracing::info!(engine = %name, "engine started");
                                for listener in listeners.iter() {
                                    listener.on_start().await;
                                }
                                let _ = reply.send(Ok(()));
                            }
                            RunState::Shutdown => {
                                let _ = reply.send(Err(EngineError::Shutdown));
                            }
                        }
                    }
                    EngineCommand::Standby { reply } => {
                        let mut state = shared.state.write().await;
                        match *state {
                            RunState::Standby => {
                                let _ = reply.send(Ok(()));
                            }
                            RunState::Started => {
                                *state = RunState::Standby;
                                drop(state);

                                tracing::info!(engine = %name, "engine placed in standby");
                                for listener in listeners.iter() {
                                    listener.on_standby().await;
                                }
                                let _ = reply.send(Ok(()));
                            }
                            RunState::Shutdown => {
                                let _ = reply.send(Err(EngineError::Shutdown));
                            }
                        }
                    }
                    EngineCommand::Shutdown { reply } => {
                        *shared.state.write().await = RunState::Shutdown;

                        tracing::info!(engine = %name, "engine shut down");
                        for listener in listeners.iter() {
                            listener.on_shutdown().await;
                        }
                        let _ = reply.send(Ok(()));
                        break;
                    }
                }
            }
        }
    }
}

/// Fire every non-paused trigger with an occurrence in `(last_check, now]`.
///
/// A trigger fires at most once per tick window even when several
/// occurrences were missed, so a slow tick never produces a burst.
async fn fire_due_triggers(
    shared: &EngineShared,
    listeners: &[Arc<dyn EngineListener>],
    name: &str,
    last_check: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    let mut fired = Vec::new();
    {
        let mut triggers = shared.triggers.write().await;
        for slot in triggers.values_mut() {
            if slot.state != TriggerState::Normal {
                continue;
            }
            if slot.schedule.fires_within(last_check, now) {
                slot.previous_fire_time = Some(now);
                slot.times_fired += 1;
                fired.push((slot.key.clone(), slot.job_key.clone()));
            }
        }
    }

    for (trigger_key, job_key) in fired {
        shared.fired_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(engine = %name, trigger = %trigger_key, job = %job_key, "trigger fired");
        for listener in listeners {
            listener.on_trigger_fired(&trigger_key, &job_key).await;
        }
    }
}

/// Factory producing [`LocalEngine`] instances.
pub struct LocalEngineFactory;

#[async_trait::async_trait]
impl EngineFactory for LocalEngineFactory {
    async fn build(&self, props: &ConfigProps) -> Result<Arc<dyn EngineHandle>, EngineError> {
        Ok(Arc::new(LocalEngine::from_props(props)?))
    }
}
