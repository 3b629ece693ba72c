//! Background task that drives the [`Monitor`] on its poll schedule

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::manager::{Monitor, NextPoll};
use super::status::MonitorStatus;

enum Command {
    ChangePlayer(String),
    ClearPresence,
    Stop,
}

/// Control surface of a running monitor
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<MonitorStatus>,
    task: JoinHandle<Monitor>,
}

impl MonitorHandle {
    /// Track another player from the next cycle on, which runs right away
    pub fn change_player(&self, nickname: impl Into<String>) {
        self.send(Command::ChangePlayer(nickname.into()));
    }

    pub fn clear_presence(&self) {
        self.send(Command::ClearPresence);
    }

    pub fn status(&self) -> MonitorStatus {
        self.status.borrow().clone()
    }

    /// Receives the status after every cycle
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop polling. A cycle in flight finishes first. Returns the monitor so
    /// the caller can still clear the presence.
    pub async fn stop(self) -> Option<Monitor> {
        self.send(Command::Stop);
        match self.task.await {
            Ok(monitor) => Some(monitor),
            Err(e) => {
                tracing::error!("Monitor task failed: {}", e);
                None
            }
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Monitor task already stopped");
        }
    }
}

pub fn spawn_monitor(monitor: Monitor) -> MonitorHandle {
    let (commands, rx) = mpsc::unbounded_channel();
    let (status_tx, status) = watch::channel(monitor.status());
    let task = tokio::spawn(run_monitor_loop(monitor, rx, status_tx));

    MonitorHandle {
        commands,
        status,
        task,
    }
}

async fn run_monitor_loop(
    mut monitor: Monitor,
    mut commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<MonitorStatus>,
) -> Monitor {
    tracing::info!("Monitoring FACEIT matches for {}", monitor.nickname());
    let mut next_due = Instant::now();

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(Command::ChangePlayer(nickname)) => {
                    monitor.change_player(nickname);
                    status.send_replace(monitor.status());
                    next_due = Instant::now();
                }
                Some(Command::ClearPresence) => {
                    if let Err(e) = monitor.clear_presence().await {
                        tracing::warn!("Failed to clear presence: {}", e);
                    }
                }
                Some(Command::Stop) | None => break,
            },

            () = tokio::time::sleep_until(next_due) => {
                let started = Instant::now();
                let report = monitor.run_cycle().await;
                status.send_replace(monitor.status());

                let now = Instant::now();
                next_due = match report.next {
                    NextPoll::Suspend(delay) => now + delay,
                    NextPoll::Interval(delay) => {
                        let (due, skipped) = next_deadline(started, delay, now);
                        if skipped > 0 {
                            tracing::debug!("Poll took longer than the interval, skipped {} ticks", skipped);
                        }
                        due
                    }
                };
            }
        }
    }

    tracing::info!("Match monitor stopped");
    monitor
}

/// First tick of the schedule `started + k * delay` that is still ahead of
/// `now`, and how many ticks were missed on the way.
fn next_deadline(started: Instant, delay: Duration, now: Instant) -> (Instant, u32) {
    let mut due = started + delay;
    if delay.is_zero() {
        return (due.max(now), 0);
    }

    let mut skipped = 0u32;
    while due <= now {
        due += delay;
        skipped = skipped.saturating_add(1);
    }
    (due, skipped)
}
