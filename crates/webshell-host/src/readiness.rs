// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Startup readiness: decides when the splash overlay may be dismissed.
//
//   Initializing -> PageMounted -> PageLoading -> { PageReady | TimedOut }
//
// `ReadinessMachine` is the pure transition logic. It never sleeps; it returns
// effects (schedule or cancel a timer, emit a shell command) that a driver
// executes. `ReadinessController` is that driver on the tokio runtime.
//
// The overlay is dismissed exactly once, either on readiness or when the
// max-wait timer fires. Load errors never lead to a dead state: they schedule
// a reload until the retry ceiling, then show an error view that waits for a
// manual retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use webshell_core::config::ReadinessConfig;
use webshell_core::human_errors::{HumanError, humanize_load_failure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Initializing,
    PageMounted,
    PageLoading,
    PageReady,
    TimedOut,
}

impl ReadinessState {
    /// Terminal for the overlay: once reached the state never changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PageReady | Self::TimedOut)
    }
}

/// External lifecycle signals from the browsing surface and the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    LoadStart,
    LoadEnd,
    /// Navigation failed; carries the platform's description.
    LoadError(String),
    /// PAGE_READY from the page.
    PageReady,
    /// The user pressed Retry on the error view.
    ManualRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Mount,
    Settle,
    MaxWait,
    Reload,
}

impl Timer {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        match self {
            Self::Mount => 0,
            Self::Settle => 1,
            Self::MaxWait => 2,
            Self::Reload => 3,
        }
    }

    fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Mount,
            1 => Self::Settle,
            2 => Self::MaxWait,
            _ => Self::Reload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    Ready,
    TimedOut,
}

/// Instructions for the shell around the page view.
#[derive(Debug, Clone)]
pub enum ShellCommand {
    DismissOverlay { reason: DismissReason },
    /// Reload the page. `attempt` is the number of consecutive failures so
    /// far (0 for a manual retry).
    Reload { attempt: u32 },
    ShowErrorView(HumanError),
    HideErrorView,
}

#[derive(Debug, Clone)]
pub enum Effect {
    Schedule(Timer, Duration),
    Cancel(Timer),
    Command(ShellCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessSnapshot {
    pub state: ReadinessState,
    pub retry_count: u32,
    pub load_error: bool,
    pub awaiting_manual_retry: bool,
    pub overlay_dismissed: bool,
}

pub struct ReadinessMachine {
    config: ReadinessConfig,
    state: ReadinessState,
    retry_count: u32,
    load_error: bool,
    awaiting_manual_retry: bool,
    overlay_dismissed: bool,
    settling: bool,
    /// Signals that arrived before the mount delay elapsed.
    deferred: Vec<Signal>,
}

impl ReadinessMachine {
    pub fn new(config: ReadinessConfig) -> Self {
        Self {
            config,
            state: ReadinessState::Initializing,
            retry_count: 0,
            load_error: false,
            awaiting_manual_retry: false,
            overlay_dismissed: false,
            settling: false,
            deferred: Vec::new(),
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        ReadinessSnapshot {
            state: self.state,
            retry_count: self.retry_count,
            load_error: self.load_error,
            awaiting_manual_retry: self.awaiting_manual_retry,
            overlay_dismissed: self.overlay_dismissed,
        }
    }

    /// The page view was constructed: arm the mount and max-wait timers.
    pub fn start(&mut self) -> Vec<Effect> {
        vec![
            Effect::Schedule(Timer::Mount, self.config.mount_delay()),
            Effect::Schedule(Timer::MaxWait, self.config.max_wait()),
        ]
    }

    pub fn signal(&mut self, signal: Signal) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.apply_signal(signal, &mut fx);
        fx
    }

    pub fn elapsed(&mut self, timer: Timer) -> Vec<Effect> {
        let mut fx = Vec::new();
        match timer {
            Timer::Mount => {
                if self.state == ReadinessState::Initializing {
                    self.transition(ReadinessState::PageMounted);
                    for signal in std::mem::take(&mut self.deferred) {
                        self.apply_signal(signal, &mut fx);
                    }
                }
            }
            Timer::Settle => {
                self.settling = false;
                if self.state == ReadinessState::PageLoading && !self.load_error {
                    self.become_ready(&mut fx);
                }
            }
            Timer::MaxWait => {
                if !self.state.is_terminal() {
                    warn!(
                        max_wait_ms = self.config.max_wait_ms,
                        state = ?self.state,
                        "page not ready in time; forcing overlay dismissal"
                    );
                    self.deferred.clear();
                    self.settling = false;
                    fx.push(Effect::Cancel(Timer::Mount));
                    fx.push(Effect::Cancel(Timer::Settle));
                    self.transition(ReadinessState::TimedOut);
                    self.dismiss(DismissReason::TimedOut, &mut fx);
                }
            }
            Timer::Reload => {
                if !self.awaiting_manual_retry {
                    self.load_error = false;
                    info!(attempt = self.retry_count, "reloading page after load error");
                    fx.push(Effect::Command(ShellCommand::Reload {
                        attempt: self.retry_count,
                    }));
                }
            }
        }
        fx
    }

    fn apply_signal(&mut self, signal: Signal, fx: &mut Vec<Effect>) {
        if self.state == ReadinessState::Initializing && signal != Signal::ManualRetry {
            debug!(?signal, "page not mounted yet; deferring signal");
            self.deferred.push(signal);
            return;
        }
        match signal {
            Signal::LoadStart => self.on_load_start(fx),
            Signal::LoadEnd => self.on_load_end(fx),
            Signal::LoadError(description) => self.on_load_error(&description, fx),
            Signal::PageReady => {
                if matches!(
                    self.state,
                    ReadinessState::PageMounted | ReadinessState::PageLoading
                ) && !self.load_error
                {
                    self.become_ready(fx);
                }
            }
            Signal::ManualRetry => self.on_manual_retry(fx),
        }
    }

    fn on_load_start(&mut self, fx: &mut Vec<Effect>) {
        self.load_error = false;
        if self.settling {
            self.settling = false;
            fx.push(Effect::Cancel(Timer::Settle));
        }
        if self.state == ReadinessState::PageMounted {
            self.transition(ReadinessState::PageLoading);
        }
    }

    fn on_load_end(&mut self, fx: &mut Vec<Effect>) {
        if self.load_error {
            debug!("load ended with an error; not settling");
            return;
        }
        self.retry_count = 0;
        if self.state == ReadinessState::PageMounted {
            // The load-start was missed; the page is evidently loading.
            self.transition(ReadinessState::PageLoading);
        }
        if self.state == ReadinessState::PageLoading && !self.settling {
            self.settling = true;
            fx.push(Effect::Schedule(Timer::Settle, self.config.settle_delay()));
        }
    }

    fn on_load_error(&mut self, description: &str, fx: &mut Vec<Effect>) {
        self.load_error = true;
        if self.settling {
            self.settling = false;
            fx.push(Effect::Cancel(Timer::Settle));
        }
        if self.awaiting_manual_retry {
            debug!(%description, "load error while waiting for manual retry");
            return;
        }

        self.retry_count += 1;
        if self.state == ReadinessState::PageMounted {
            self.transition(ReadinessState::PageLoading);
        }

        if self.retry_count < self.config.max_load_retries {
            warn!(
                attempt = self.retry_count,
                max = self.config.max_load_retries,
                %description,
                "page load failed; scheduling reload"
            );
            fx.push(Effect::Schedule(Timer::Reload, self.config.reload_backoff()));
        } else {
            warn!(
                attempts = self.retry_count,
                %description,
                "page load failed repeatedly; waiting for manual retry"
            );
            self.awaiting_manual_retry = true;
            fx.push(Effect::Cancel(Timer::Reload));
            fx.push(Effect::Command(ShellCommand::ShowErrorView(
                humanize_load_failure(description),
            )));
        }
    }

    fn on_manual_retry(&mut self, fx: &mut Vec<Effect>) {
        if !self.awaiting_manual_retry {
            debug!("manual retry without an error view; ignoring");
            return;
        }
        info!("manual retry requested");
        self.retry_count = 0;
        self.load_error = false;
        self.awaiting_manual_retry = false;
        fx.push(Effect::Command(ShellCommand::HideErrorView));
        fx.push(Effect::Command(ShellCommand::Reload { attempt: 0 }));
    }

    fn become_ready(&mut self, fx: &mut Vec<Effect>) {
        self.settling = false;
        fx.push(Effect::Cancel(Timer::Settle));
        fx.push(Effect::Cancel(Timer::MaxWait));
        self.transition(ReadinessState::PageReady);
        self.dismiss(DismissReason::Ready, fx);
    }

    fn dismiss(&mut self, reason: DismissReason, fx: &mut Vec<Effect>) {
        if !self.overlay_dismissed {
            self.overlay_dismissed = true;
            fx.push(Effect::Command(ShellCommand::DismissOverlay { reason }));
        }
    }

    fn transition(&mut self, next: ReadinessState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "readiness transition");
            self.state = next;
        }
    }
}

// ---------------------------------------------------------------------------
// Async driver
// ---------------------------------------------------------------------------

/// Deadlines of the armed timers, one slot per `Timer`.
#[derive(Default)]
struct Deadlines([Option<Instant>; Timer::COUNT]);

impl Deadlines {
    fn next(&self) -> Option<(Timer, Instant)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, at)| at.map(|at| (Timer::from_index(i), at)))
            .min_by_key(|(_, at)| *at)
    }

    fn set(&mut self, timer: Timer, at: Option<Instant>) {
        self.0[timer.index()] = at;
    }
}

/// Cloneable sender of lifecycle signals into a running controller.
#[derive(Clone)]
pub struct ReadinessSignals {
    tx: mpsc::UnboundedSender<Signal>,
}

impl ReadinessSignals {
    pub fn send(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            debug!("readiness driver stopped; signal dropped");
        }
    }
}

/// Runs a `ReadinessMachine` on its own task, owning its timers.
///
/// Timers are cancelled on every transition that makes them moot and all of
/// them are dropped when the controller shuts down, so nothing fires against
/// a torn-down page.
pub struct ReadinessController {
    signals: ReadinessSignals,
    snapshot: watch::Receiver<ReadinessSnapshot>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl ReadinessController {
    /// Start the machine. Shell commands arrive on the returned receiver.
    pub fn spawn(config: ReadinessConfig) -> (Self, mpsc::UnboundedReceiver<ShellCommand>) {
        let machine = ReadinessMachine::new(config);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(drive(
            machine,
            signal_rx,
            command_tx,
            snapshot_tx,
            Arc::clone(&shutdown),
        ));

        (
            Self {
                signals: ReadinessSignals { tx: signal_tx },
                snapshot: snapshot_rx,
                shutdown,
                task: Some(task),
            },
            command_rx,
        )
    }

    pub fn signal(&self, signal: Signal) {
        self.signals.send(signal);
    }

    pub fn signals(&self) -> ReadinessSignals {
        self.signals.clone()
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        *self.snapshot.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadinessSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until the overlay has been dismissed (ready or timed out).
    pub async fn overlay_dismissed(&self) -> ReadinessState {
        let mut rx = self.snapshot.clone();
        match rx.wait_for(|s| s.overlay_dismissed).await {
            Ok(snapshot) => snapshot.state,
            Err(_) => self.snapshot().state,
        }
    }

    /// Stop the driver and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "readiness driver task failed");
        }
    }
}

impl Drop for ReadinessController {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}

async fn drive(
    mut machine: ReadinessMachine,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    commands: mpsc::UnboundedSender<ShellCommand>,
    snapshot: watch::Sender<ReadinessSnapshot>,
    shutdown: Arc<Notify>,
) {
    let mut deadlines = Deadlines::default();
    let started = machine.start();
    apply(started, &mut deadlines, &commands);

    loop {
        let next = deadlines.next();
        let wake_at = next.map_or_else(Instant::now, |(_, at)| at);

        tokio::select! {
            _ = shutdown.notified() => {
                debug!("readiness driver received shutdown signal");
                break;
            }

            received = signals.recv() => match received {
                Some(signal) => {
                    let fx = machine.signal(signal);
                    apply(fx, &mut deadlines, &commands);
                }
                None => break,
            },

            _ = tokio::time::sleep_until(wake_at), if next.is_some() => {
                if let Some((timer, _)) = next {
                    deadlines.set(timer, None);
                    let fx = machine.elapsed(timer);
                    apply(fx, &mut deadlines, &commands);
                }
            }
        }

        let current = machine.snapshot();
        snapshot.send_if_modified(|s| {
            let changed = *s != current;
            *s = current;
            changed
        });
    }

    debug!(state = ?machine.state(), "readiness driver stopped; timers cancelled");
}

fn apply(
    effects: Vec<Effect>,
    deadlines: &mut Deadlines,
    commands: &mpsc::UnboundedSender<ShellCommand>,
) {
    for effect in effects {
        match effect {
            Effect::Schedule(timer, after) => deadlines.set(timer, Some(Instant::now() + after)),
            Effect::Cancel(timer) => deadlines.set(timer, None),
            Effect::Command(command) => {
                if commands.send(command).is_err() {
                    debug!("shell command receiver gone");
                }
            }
        }
    }
}
