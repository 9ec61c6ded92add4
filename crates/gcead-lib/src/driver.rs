use crate::controller::SessionController;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Cooperative timer that paces session ticks.
///
/// Disarming is immediate: once `stop` returns, `fire` reports false until
/// the timer is started again.
#[derive(Debug, Clone)]
pub struct PollTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Consume the deadline if it has passed and schedule the next one.
    pub fn fire(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        // Small tolerance so a ticker running at the same period does not
        // miss every other deadline through jitter.
        if now + self.interval / 10 < due {
            return false;
        }
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        true
    }
}

/// Controller shared between the polling thread and whoever issues commands.
/// The mutex is the one boundary serialising ticks with every other action.
pub type SharedController = Arc<Mutex<SessionController>>;

/// Background thread that feeds the controller's timer.
pub struct PollDriver {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl PollDriver {
    pub fn spawn(controller: SharedController) -> Self {
        let interval = match controller.lock() {
            Ok(guard) => guard.poll_interval(),
            Err(poisoned) => poisoned.into_inner().poll_interval(),
        };
        let (stop_tx, stop_rx) = bounded(1);
        let handle = std::thread::spawn(move || run_poll_loop(controller, interval, stop_rx));
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PollDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_poll_loop(controller: SharedController, interval: Duration, stop_rx: Receiver<()>) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> msg => {
                let Ok(now) = msg else { break };
                let mut guard = match controller.lock() {
                    Ok(guard) => guard,
                    Err(_) => {
                        log::error!("controller lock poisoned; stopping poll driver");
                        break;
                    }
                };
                if let Some(outcome) = guard.on_timer(now) {
                    log::trace!("tick: {outcome:?}");
                }
            }
        }
    }
}
