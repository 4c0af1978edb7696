use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::connection::Signal;
use super::timer::TimerSlot;

/// What the driver should do when a heartbeat is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Beat {
    /// Send a heartbeat now
    Send,
    /// Too many heartbeats went unacknowledged: the connection is a zombie
    Zombie { missed: u32 },
}

/// Heartbeat schedule for one connection, started by Hello and stopped on
/// every teardown.
///
/// The periodic task only emits [`Signal::HeartbeatDue`]; sending the frame and
/// tracking acknowledgements stays with the driver.
#[derive(Debug)]
pub(crate) struct HeartbeatScheduler {
    timer: TimerSlot,
    interval: Option<Duration>,
    awaiting_ack: bool,
    missed: u32,
    missed_limit: Option<u32>,
}

impl HeartbeatScheduler {
    pub(crate) fn new(missed_limit: Option<u32>) -> Self {
        Self {
            timer: TimerSlot::default(),
            interval: None,
            awaiting_ack: false,
            missed: 0,
            missed_limit,
        }
    }

    /// (Re)start the schedule. The first heartbeat is due one full `interval`
    /// from now.
    pub(crate) fn start(&mut self, interval: Duration, signals: mpsc::UnboundedSender<Signal>) {
        self.stop();
        self.interval = Some(interval);

        self.timer.arm(move |generation| async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if signals.send(Signal::HeartbeatDue { generation }).is_err() {
                    break;
                }
            }
        });
    }

    pub(crate) fn stop(&mut self) {
        self.timer.cancel();
        self.interval = None;
        self.awaiting_ack = false;
        self.missed = 0;
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.timer.is_current(generation)
    }

    pub(crate) fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Account for a due heartbeat.
    pub(crate) fn due(&mut self) -> Beat {
        if self.awaiting_ack {
            self.missed = self.missed.saturating_add(1);
            if let Some(limit) = self.missed_limit
                && self.missed >= limit
            {
                return Beat::Zombie {
                    missed: self.missed,
                };
            }
        }
        self.awaiting_ack = true;
        Beat::Send
    }

    pub(crate) fn acked(&mut self) {
        self.awaiting_ack = false;
        self.missed = 0;
    }
}
