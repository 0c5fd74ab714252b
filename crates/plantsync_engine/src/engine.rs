//! The sync engine: poll loop and command dispatcher.

use crate::config::SyncConfig;
use crate::error::{EngineError, EngineResult};
use crate::state::{CommandResult, CommandStatus, EnginePhase, ErrorInfo, SyncState};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use plantsync_client::{ClientError, ClientResult, DeviceClient, HttpClient};
use plantsync_protocol::{Command, CommandKind, DeviceReading, DeviceSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What became of a successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The snapshot was published.
    Applied,
    /// A poll that started later had already been published; this result
    /// was dropped.
    Stale,
}

/// What became of a successfully dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The device acknowledged the command and state reflects it.
    Applied,
    /// A newer command of the same kind was submitted while this one was in
    /// flight; its resolution was dropped.
    Superseded {
        /// Sequence number of this command.
        sequence: u64,
        /// Sequence number of the newest command of the kind.
        latest: u64,
    },
}

/// Ordering bookkeeping. Every write to the published state happens while
/// this is locked.
#[derive(Debug, Default)]
struct Bookkeeping {
    next_poll: u64,
    applied_poll: u64,
    polls_in_flight: usize,
    command_seq: [u64; CommandKind::COUNT],
    /// Acknowledged set-points with the newest poll tag issued before the
    /// acknowledgement. Polls up to that tag may predate the change.
    patches: [Option<(u64, Command)>; CommandKind::COUNT],
}

impl Bookkeeping {
    /// Re-applies acknowledged set-points over a reading fetched by poll
    /// `tag`, and forgets those that `tag` is new enough to confirm.
    fn reapply_patches(&mut self, tag: u64, snapshot: &mut DeviceSnapshot) {
        for slot in &mut self.patches {
            if let Some((issued_before, command)) = *slot {
                if tag <= issued_before {
                    patch(snapshot, command);
                } else {
                    *slot = None;
                }
            }
        }
    }
}

/// Decrements the in-flight count of a poll on every exit path, including
/// when the `poll_once` future is dropped.
struct InFlightPoll<'a, C: HttpClient> {
    engine: &'a SyncEngine<C>,
    tag: u64,
    settled: bool,
}

impl<C: HttpClient> Drop for InFlightPoll<'_, C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut book = self.engine.inner.book.lock();
        book.polls_in_flight = book.polls_in_flight.saturating_sub(1);
        debug!(tag = self.tag, "poll abandoned");
        if !self.engine.is_stopped() {
            self.engine.publish_loading(&book);
        }
    }
}

/// Marks a dropped `submit` future's command as cancelled if it is still
/// the newest of its kind.
struct InFlightCommand<'a, C: HttpClient> {
    engine: &'a SyncEngine<C>,
    command: Command,
    sequence: u64,
    settled: bool,
}

impl<C: HttpClient> Drop for InFlightCommand<'_, C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let book = self.engine.inner.book.lock();
        let kind = self.command.kind();
        if self.engine.is_stopped() || book.command_seq[kind.index()] != self.sequence {
            return;
        }
        debug!(%kind, sequence = self.sequence, "command abandoned");
        let (command, sequence) = (self.command, self.sequence);
        self.engine.inner.state.send_modify(|s| {
            s.commands.insert(
                kind,
                CommandStatus {
                    sequence,
                    command,
                    result: CommandResult::Cancelled,
                    updated_at: Utc::now(),
                },
            );
        });
    }
}

struct Inner<C: HttpClient> {
    config: SyncConfig,
    client: DeviceClient<C>,
    state: watch::Sender<SyncState>,
    book: Mutex<Bookkeeping>,
    phase: RwLock<EnginePhase>,
    stopped: AtomicBool,
    shutdown: watch::Sender<bool>,
    wake: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Keeps a [`SyncState`] in step with one device.
///
/// The engine is the only writer of its state. Presentation code reads it
/// through [`SyncEngine::state`] or [`SyncEngine::subscribe`] and sends
/// intents through [`SyncEngine::submit`]. Handles are cheap to clone and
/// all refer to the same engine.
///
/// # Example
///
/// ```no_run
/// use plantsync_client::ReqwestClient;
/// use plantsync_engine::{SyncConfig, SyncEngine};
/// use plantsync_protocol::Command;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = SyncEngine::new(SyncConfig::new("http://192.168.4.1"), ReqwestClient::new()?)?;
/// let mut updates = engine.subscribe();
/// engine.start()?;
///
/// engine.submit(Command::SetDesiredMoisture(1800)).await?;
/// updates.changed().await?;
/// println!("{:?}", updates.borrow().snapshot);
///
/// engine.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct SyncEngine<C: HttpClient> {
    inner: Arc<Inner<C>>,
}

impl<C: HttpClient> Clone for SyncEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: HttpClient> SyncEngine<C> {
    /// Creates an idle engine.
    pub fn new(config: SyncConfig, http: C) -> EngineResult<Self> {
        config.validate()?;

        let client = DeviceClient::new(config.base_url.clone(), http);
        let (state, _) = watch::channel(SyncState::default());
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                client,
                state,
                book: Mutex::new(Bookkeeping::default()),
                phase: RwLock::new(EnginePhase::Idle),
                stopped: AtomicBool::new(false),
                shutdown,
                wake: Notify::new(),
                task: Mutex::new(None),
            }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Returns the device client.
    pub fn client(&self) -> &DeviceClient<C> {
        &self.inner.client
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Returns the loop phase.
    pub fn phase(&self) -> EnginePhase {
        *self.inner.phase.read()
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Returns true if the current snapshot is older than the configured
    /// threshold.
    pub fn is_stale(&self) -> bool {
        self.inner
            .state
            .borrow()
            .is_stale(Utc::now(), self.inner.config.stale_after)
    }

    /// Returns a handle that can only submit commands.
    pub fn command_sender(&self) -> CommandSender<C> {
        CommandSender {
            engine: self.clone(),
        }
    }

    /// Asks the loop to poll without waiting out the interval.
    ///
    /// Takes effect at the next wait boundary. Does nothing unless the loop
    /// is running.
    pub fn refresh_now(&self) {
        if self.phase().is_running() {
            self.inner.wake.notify_one();
        }
    }

    /// Stops the engine.
    ///
    /// The pending wait is cancelled and no further poll starts. Calls still
    /// in flight complete, but their results are discarded. Idempotent.
    pub fn stop(&self) {
        let _book = self.inner.book.lock();
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.inner.phase.write() = EnginePhase::Stopped;
        self.inner.shutdown.send_replace(true);
        info!(base_url = %self.inner.client.base_url(), "sync engine stopped");
    }

    /// Stops the engine and waits for the loop task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.inner.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "sync loop task failed");
            }
        }
    }

    /// Fetches the device state once and publishes the result.
    ///
    /// Each poll is tagged when it starts. If a poll that started later has
    /// already been published, this one's result is dropped and
    /// [`PollOutcome::Stale`] is returned. A failed poll records
    /// `last_error` and leaves the snapshot untouched.
    ///
    /// Dropping the returned future abandons the poll; its in-flight
    /// bookkeeping is released.
    pub async fn poll_once(&self) -> EngineResult<PollOutcome> {
        let poll = self.begin_poll()?;
        let result = self.inner.client.fetch_reading().await;
        self.finish_poll(poll, result)
    }

    /// Sends a command to the device.
    ///
    /// Invalid commands are rejected without a network call. Commands of
    /// different kinds may overlap; for one kind only the most recently
    /// submitted command's resolution is applied.
    ///
    /// Dropping the returned future marks the command
    /// [`CommandResult::Cancelled`] unless a newer one of its kind exists.
    pub async fn submit(&self, command: Command) -> EngineResult<CommandOutcome> {
        command.validate()?;
        let pending = self.begin_command(command)?;
        let result = self.inner.client.execute(&command).await;
        self.finish_command(pending, result)
    }

    fn publish_loading(&self, book: &Bookkeeping) {
        let loading = book.polls_in_flight > 0;
        self.inner.state.send_if_modified(|s| {
            let changed = s.loading != loading;
            s.loading = loading;
            changed
        });
    }

    fn begin_poll(&self) -> EngineResult<InFlightPoll<'_, C>> {
        let mut book = self.inner.book.lock();
        if self.is_stopped() {
            return Err(EngineError::Stopped);
        }
        book.next_poll += 1;
        book.polls_in_flight += 1;
        let tag = book.next_poll;
        self.inner.state.send_modify(|s| s.loading = true);
        debug!(tag, "poll started");
        Ok(InFlightPoll {
            engine: self,
            tag,
            settled: false,
        })
    }

    fn finish_poll(
        &self,
        mut poll: InFlightPoll<'_, C>,
        result: ClientResult<DeviceReading>,
    ) -> EngineResult<PollOutcome> {
        let tag = poll.tag;
        let mut book = self.inner.book.lock();
        poll.settled = true;
        book.polls_in_flight = book.polls_in_flight.saturating_sub(1);
        if self.is_stopped() {
            debug!(tag, "discarding poll result after stop");
            return Err(EngineError::Stopped);
        }

        let loading = book.polls_in_flight > 0;
        if tag <= book.applied_poll {
            warn!(tag, applied = book.applied_poll, "dropping out-of-order poll result");
            self.publish_loading(&book);
            return Ok(PollOutcome::Stale);
        }
        book.applied_poll = tag;

        let now = Utc::now();
        let result = result.and_then(|reading| {
            let previous = self.inner.state.borrow().snapshot.clone();
            reading
                .into_snapshot(now, previous.as_ref())
                .map_err(ClientError::from)
        });

        match result {
            Ok(mut snapshot) => {
                book.reapply_patches(tag, &mut snapshot);
                debug!(tag, soil_moisture = snapshot.soil_moisture, "poll applied");
                self.inner.state.send_modify(|s| {
                    s.snapshot = Some(snapshot);
                    s.last_error = None;
                    s.loading = loading;
                });
                Ok(PollOutcome::Applied)
            }
            Err(err) => {
                warn!(tag, error = %err, "poll failed");
                let info = ErrorInfo::from_error(&err, now);
                self.inner.state.send_modify(|s| {
                    s.last_error = Some(info);
                    s.loading = loading;
                });
                Err(EngineError::Client(err))
            }
        }
    }

    fn begin_command(&self, command: Command) -> EngineResult<InFlightCommand<'_, C>> {
        let mut book = self.inner.book.lock();
        if self.is_stopped() {
            return Err(EngineError::Stopped);
        }
        let kind = command.kind();
        let slot = &mut book.command_seq[kind.index()];
        *slot += 1;
        let sequence = *slot;

        self.inner.state.send_modify(|s| {
            s.commands.insert(
                kind,
                CommandStatus {
                    sequence,
                    command,
                    result: CommandResult::Pending,
                    updated_at: Utc::now(),
                },
            );
        });
        debug!(%kind, sequence, "command submitted");
        Ok(InFlightCommand {
            engine: self,
            command,
            sequence,
            settled: false,
        })
    }

    fn finish_command(
        &self,
        mut pending: InFlightCommand<'_, C>,
        result: ClientResult<()>,
    ) -> EngineResult<CommandOutcome> {
        let (command, sequence) = (pending.command, pending.sequence);
        let mut book = self.inner.book.lock();
        pending.settled = true;
        if self.is_stopped() {
            return Err(EngineError::Stopped);
        }

        let kind = command.kind();
        let latest = book.command_seq[kind.index()];
        if sequence != latest {
            debug!(%kind, sequence, latest, "dropping superseded command result");
            return Ok(CommandOutcome::Superseded { sequence, latest });
        }

        let now = Utc::now();
        match result {
            Ok(()) => {
                let optimistic = self.inner.config.optimistic_updates;
                if optimistic && is_patchable(command) {
                    book.patches[kind.index()] = Some((book.next_poll, command));
                }
                self.inner.state.send_modify(|s| {
                    if optimistic {
                        if let Some(snapshot) = s.snapshot.as_mut() {
                            patch(snapshot, command);
                        }
                    }
                    s.commands.insert(
                        kind,
                        CommandStatus {
                            sequence,
                            command,
                            result: CommandResult::Succeeded,
                            updated_at: now,
                        },
                    );
                });
                drop(book);
                info!(%command, "command acknowledged");
                // The next poll confirms what the device actually applied.
                self.refresh_now();
                Ok(CommandOutcome::Applied)
            }
            Err(err) => {
                warn!(%command, error = %err, "command failed");
                let info = ErrorInfo::from_error(&err, now);
                self.inner.state.send_modify(|s| {
                    s.commands.insert(
                        kind,
                        CommandStatus {
                            sequence,
                            command,
                            result: CommandResult::Failed(info),
                            updated_at: now,
                        },
                    );
                });
                Err(EngineError::Client(err))
            }
        }
    }

    fn set_phase(&self, next: EnginePhase) -> bool {
        let mut phase = self.inner.phase.write();
        if *phase == EnginePhase::Stopped {
            return false;
        }
        *phase = next;
        true
    }
}

impl<C: HttpClient + 'static> SyncEngine<C> {
    /// Starts the poll loop on the current tokio runtime.
    ///
    /// The first poll is issued immediately. An engine can be started once.
    pub fn start(&self) -> EngineResult<()> {
        let mut task = self.inner.task.lock();
        {
            let mut phase = self.inner.phase.write();
            if *phase != EnginePhase::Idle {
                return Err(EngineError::InvalidStateTransition {
                    from: format!("{:?}", *phase),
                    to: format!("{:?}", EnginePhase::Polling),
                });
            }
            *phase = EnginePhase::Polling;
        }

        let shutdown = self.inner.shutdown.subscribe();
        *task = Some(tokio::spawn(self.clone().run(shutdown)));
        info!(
            base_url = %self.inner.client.base_url(),
            interval = ?self.inner.config.poll_interval,
            "sync loop started"
        );
        Ok(())
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.inner.config.poll_interval;
        loop {
            if !self.set_phase(EnginePhase::Polling) {
                break;
            }
            // Failures are already recorded in state. A poll still waiting
            // on the device when the engine stops is abandoned.
            tokio::select! {
                result = self.poll_once() => {
                    if let Err(EngineError::Stopped) = result {
                        break;
                    }
                }
                _ = shutdown.changed() => break,
            }

            if !self.set_phase(EnginePhase::Waiting) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.inner.wake.notified() => debug!("poll requested before interval elapsed"),
                _ = shutdown.changed() => break,
            }
        }
        debug!("sync loop exited");
    }
}

/// A handle that can only submit commands.
///
/// Given to secondary callers, such as a one-shot "water now" trigger, that
/// must not observe or stop the engine.
pub struct CommandSender<C: HttpClient> {
    engine: SyncEngine<C>,
}

impl<C: HttpClient> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<C: HttpClient> CommandSender<C> {
    /// Submits a command. See [`SyncEngine::submit`].
    pub async fn submit(&self, command: Command) -> EngineResult<CommandOutcome> {
        self.engine.submit(command).await
    }
}

fn is_patchable(command: Command) -> bool {
    matches!(
        command,
        Command::SetDesiredMoisture(_) | Command::SetAutoWatering(_) | Command::SetPumpDuration(_)
    )
}

fn patch(snapshot: &mut DeviceSnapshot, command: Command) {
    match command {
        Command::SetDesiredMoisture(level) => snapshot.desired_moisture = level,
        Command::SetAutoWatering(enabled) => snapshot.auto_watering_enabled = enabled,
        Command::SetPumpDuration(seconds) if snapshot.pump_duration_seconds.is_some() => {
            snapshot.pump_duration_seconds = Some(seconds);
        }
        _ => {}
    }
}
