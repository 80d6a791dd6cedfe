use std::fmt;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::CountdownError;
use crate::schedule::{Action, Scheduler};
use crate::worker::{self, WorkerHandle, WorkerState, TERMINAL, WORKER_INTERVAL};

pub const START_VALUE: u32 = 10;
pub const POLL_DELAY: Duration = Duration::from_millis(100);
pub const POLL_TIMEOUT: Duration = Duration::from_millis(50);
pub const CLEAR_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    /// Worker alive and emitting.
    Running,
    /// Worker has exited; the terminal value is still queued.
    Draining,
    /// Shut down; nothing is ever scheduled again.
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayedState {
    #[default]
    Empty,
    Count(u32),
    End,
}

impl fmt::Display for DisplayedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayedState::Empty => Ok(()),
            DisplayedState::Count(n) => write!(f, "{}", n),
            DisplayedState::End => f.write_str("End!"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub start: u32,
    pub worker_interval: Duration,
    pub poll_delay: Duration,
    pub poll_timeout: Duration,
    pub clear_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            start: START_VALUE,
            worker_interval: WORKER_INTERVAL,
            poll_delay: POLL_DELAY,
            poll_timeout: POLL_TIMEOUT,
            clear_delay: CLEAR_DELAY,
        }
    }
}

/// Owns the displayed countdown and the lifecycle of its worker. Lives on
/// the UI thread; every method is meant to be called from there.
pub struct Coordinator {
    config: CoordinatorConfig,
    state: CountdownState,
    display: DisplayedState,
    worker: Option<WorkerHandle>,
    inbox: Option<Receiver<u32>>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config, state: CountdownState::Idle, display: DisplayedState::Empty, worker: None, inbox: None }
    }

    pub fn state(&self) -> CountdownState { self.state }

    pub fn display(&self) -> DisplayedState { self.display }

    pub fn label(&self) -> String { self.display.to_string() }

    pub fn worker_state(&self) -> Option<WorkerState> { self.worker.as_ref().map(|w| w.state()) }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, CountdownState::Running | CountdownState::Draining)
    }

    /// Spawns a worker on a fresh channel and schedules the first poll.
    pub fn start_countdown(&mut self, scheduler: &mut impl Scheduler) -> Result<(), CountdownError> {
        if self.state != CountdownState::Idle {
            return Err(CountdownError::InvalidStateTransition { state: self.state, action: "start a countdown" });
        }
        let (handle, rx) = worker::spawn(self.config.start, self.config.worker_interval);
        self.worker = Some(handle);
        self.inbox = Some(rx);
        self.state = CountdownState::Running;
        info!("countdown started from {}", self.config.start);
        scheduler.schedule_after(self.config.poll_delay, Action::Poll);
        Ok(())
    }

    /// Takes at most one value off the channel and decides whether another
    /// poll is needed.
    pub fn poll_tick(&mut self, scheduler: &mut impl Scheduler) -> Result<(), CountdownError> {
        if !self.is_busy() {
            debug!("ignoring stale poll while {:?}", self.state);
            return Ok(());
        }
        if self.state == CountdownState::Running && !self.worker.as_ref().map(|w| w.is_alive()).unwrap_or(false) {
            self.state = CountdownState::Draining;
        }
        let received = match self.inbox.as_ref() {
            Some(rx) => rx.recv_timeout(self.config.poll_timeout),
            None => Err(RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(TERMINAL) => self.finish(scheduler),
            Ok(n) => {
                debug!("countdown at {}", n);
                self.display = DisplayedState::Count(n);
                scheduler.schedule_after(self.config.poll_delay, Action::Poll);
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                scheduler.schedule_after(self.config.poll_delay, Action::Poll);
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("countdown channel closed before the terminal value");
                self.inbox = None;
                self.worker = None;
                self.display = DisplayedState::Empty;
                self.state = CountdownState::Idle;
                Err(CountdownError::ChannelClosed)
            }
        }
    }

    fn finish(&mut self, scheduler: &mut impl Scheduler) -> Result<(), CountdownError> {
        // The worker still owes one pause and the trailing terminal, so this blocks up to one interval.
        let joined = match self.worker.as_mut() {
            Some(w) => w.join(),
            None => Ok(()),
        };
        self.inbox = None;
        self.display = DisplayedState::End;
        self.state = CountdownState::Idle;
        info!("countdown finished");
        scheduler.schedule_after(self.config.clear_delay, Action::ClearLabel);
        joined
    }

    pub fn clear_label(&mut self) {
        self.display = DisplayedState::Empty;
    }

    /// Forcibly ends a running worker and stops all scheduling. Safe to call
    /// more than once.
    pub fn shutdown(&mut self) {
        if self.state == CountdownState::Terminated { return; }
        if let Some(w) = self.worker.as_mut() {
            if w.is_alive() {
                info!("terminating countdown worker");
                w.terminate();
            }
        }
        self.inbox = None;
        self.state = CountdownState::Terminated;
    }
}

impl Default for Coordinator {
    fn default() -> Self { Self::new(CoordinatorConfig::default()) }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.is_busy() { self.shutdown(); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::TimerQueue;
    use std::sync::mpsc;
    use std::time::Instant;

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() {
            assert!(Instant::now() < deadline, "condition never became true");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<(Duration, Action)>);

    impl Scheduler for Recorder {
        fn schedule_after(&mut self, delay: Duration, action: Action) { self.0.push((delay, action)); }
    }

    fn fast(start: u32) -> CoordinatorConfig {
        CoordinatorConfig {
            start,
            worker_interval: Duration::from_millis(5),
            poll_delay: POLL_DELAY,
            poll_timeout: Duration::from_secs(1),
            clear_delay: CLEAR_DELAY,
        }
    }

    /// Polls until the countdown leaves the busy states, recording every
    /// label change.
    fn drive(c: &mut Coordinator, sched: &mut Recorder) -> Vec<String> {
        let mut seen = Vec::new();
        let mut guard = 0;
        while c.is_busy() {
            guard += 1;
            assert!(guard < 1000, "countdown never finished");
            let before = c.label();
            c.poll_tick(sched).unwrap();
            if c.label() != before { seen.push(c.label()); }
        }
        seen
    }

    #[test]
    fn scenario_start_three_shows_values_then_end() {
        let mut c = Coordinator::new(fast(3));
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        assert_eq!(c.state(), CountdownState::Running);
        assert_eq!(sched.0, vec![(POLL_DELAY, Action::Poll)]);

        let seen = drive(&mut c, &mut sched);
        assert_eq!(seen, vec!["2", "1", "End!"]);
        assert_eq!(c.state(), CountdownState::Idle);
        assert_eq!(c.worker_state(), Some(WorkerState::Joined));
        assert_eq!(sched.0.last(), Some(&(CLEAR_DELAY, Action::ClearLabel)));
        assert_eq!(sched.0.iter().filter(|(_, a)| *a == Action::ClearLabel).count(), 1);

        c.clear_label();
        assert_eq!(c.label(), "");
    }

    #[test]
    fn scenario_start_zero_ends_immediately() {
        let mut c = Coordinator::new(fast(0));
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        c.poll_tick(&mut sched).unwrap();
        assert_eq!(c.display(), DisplayedState::End);
        assert_eq!(c.state(), CountdownState::Idle);
        assert_eq!(sched.0, vec![(POLL_DELAY, Action::Poll), (CLEAR_DELAY, Action::ClearLabel)]);
    }

    #[test]
    fn empty_poll_keeps_label_and_reschedules_after_fixed_delay() {
        let mut config = fast(3);
        config.worker_interval = Duration::from_millis(300);
        config.poll_timeout = Duration::from_millis(10);
        let mut c = Coordinator::new(config);
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();

        // First value is sent before the worker's first pause.
        std::thread::sleep(Duration::from_millis(50));
        c.poll_tick(&mut sched).unwrap();
        assert_eq!(c.label(), "2");

        sched.0.clear();
        c.poll_tick(&mut sched).unwrap();
        assert_eq!(c.label(), "2");
        assert_eq!(sched.0, vec![(POLL_DELAY, Action::Poll)]);
        c.shutdown();
    }

    #[test]
    fn second_start_while_running_is_rejected() {
        let mut config = fast(10);
        config.worker_interval = Duration::from_millis(50);
        let mut c = Coordinator::new(config);
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        let err = c.start_countdown(&mut sched).unwrap_err();
        assert_eq!(err, CountdownError::InvalidStateTransition { state: CountdownState::Running, action: "start a countdown" });
        assert_eq!(sched.0.len(), 1);
        c.shutdown();
    }

    #[test]
    fn restart_after_completion_runs_a_fresh_countdown() {
        let mut c = Coordinator::new(fast(1));
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        assert_eq!(drive(&mut c, &mut sched), vec!["End!"]);
        c.start_countdown(&mut sched).unwrap();
        assert_eq!(c.worker_state(), Some(WorkerState::Alive));
        assert_eq!(drive(&mut c, &mut sched), Vec::<String>::new());
        assert_eq!(c.display(), DisplayedState::End);
    }

    #[test]
    fn shutdown_while_running_kills_worker_and_stops_polling() {
        let mut config = fast(10);
        config.worker_interval = Duration::from_millis(50);
        let mut c = Coordinator::new(config);
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        c.poll_tick(&mut sched).unwrap();
        assert_eq!(c.label(), "9");

        c.shutdown();
        assert_eq!(c.state(), CountdownState::Terminated);
        assert_eq!(c.worker_state(), Some(WorkerState::Killed));

        sched.0.clear();
        c.poll_tick(&mut sched).unwrap();
        assert!(sched.0.is_empty());
        assert!(c.start_countdown(&mut sched).is_err());
        c.shutdown();
        assert_eq!(c.state(), CountdownState::Terminated);
    }

    #[test]
    fn shutdown_when_idle_has_no_worker_to_kill() {
        let mut c = Coordinator::default();
        c.shutdown();
        assert_eq!(c.state(), CountdownState::Terminated);
        assert_eq!(c.worker_state(), None);
    }

    #[test]
    fn clear_label_is_idempotent() {
        let mut c = Coordinator::default();
        c.clear_label();
        c.clear_label();
        assert_eq!(c.display(), DisplayedState::Empty);
        assert_eq!(c.label(), "");
    }

    #[test]
    fn counts_render_as_plain_decimal() {
        assert_eq!(DisplayedState::Count(7).to_string(), "7");
        assert_eq!(DisplayedState::Count(10).to_string(), "10");
        assert_eq!(DisplayedState::Count(4_294_967_295).to_string(), "4294967295");
        assert_eq!(DisplayedState::End.to_string(), "End!");
        assert_eq!(DisplayedState::Empty.to_string(), "");
    }

    #[test]
    fn timer_queue_drives_a_full_countdown() {
        let mut c = Coordinator::new(fast(2));
        let mut timers = TimerQueue::new();
        c.start_countdown(&mut timers).unwrap();
        let mut guard = 0;
        while let Some(deadline) = timers.next_deadline() {
            guard += 1;
            assert!(guard < 1000);
            for action in timers.take_due(deadline) {
                match action {
                    Action::Poll => c.poll_tick(&mut timers).unwrap(),
                    Action::ClearLabel => {
                        assert_eq!(c.label(), "End!");
                        c.clear_label();
                    }
                }
            }
        }
        assert_eq!(c.state(), CountdownState::Idle);
        assert_eq!(c.label(), "");
    }

    #[test]
    fn disconnected_channel_without_terminal_returns_to_idle() {
        let mut config = fast(10);
        config.worker_interval = Duration::from_millis(50);
        let mut c = Coordinator::new(config);
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        c.poll_tick(&mut sched).unwrap();
        assert_eq!(c.label(), "9");

        // A worker that died before sending the terminal value.
        let (tx, rx) = mpsc::channel::<u32>();
        drop(tx);
        c.inbox = Some(rx);
        sched.0.clear();

        assert_eq!(c.poll_tick(&mut sched), Err(CountdownError::ChannelClosed));
        assert_eq!(c.state(), CountdownState::Idle);
        assert_eq!(c.label(), "");
        assert_eq!(c.worker_state(), None);
        assert!(c.inbox.is_none());
        assert!(sched.0.is_empty());
    }

    #[test]
    fn poll_after_worker_exit_drains_remaining_values() {
        let mut config = fast(2);
        config.worker_interval = Duration::from_millis(1);
        let mut c = Coordinator::new(config);
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        wait_until(|| c.worker.as_ref().map(|w| w.has_exited()).unwrap_or(true));

        c.poll_tick(&mut sched).unwrap();
        assert_eq!(c.state(), CountdownState::Draining);
        assert_eq!(c.label(), "1");
        assert!(c.is_busy());

        c.poll_tick(&mut sched).unwrap();
        assert_eq!(c.state(), CountdownState::Idle);
        assert_eq!(c.display(), DisplayedState::End);
    }

    #[test]
    fn dropping_a_busy_coordinator_stops_its_worker() {
        let mut config = fast(10);
        config.worker_interval = Duration::from_millis(20);
        let mut c = Coordinator::new(config);
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        c.poll_tick(&mut sched).unwrap();
        let worker = c.worker.take().unwrap();
        assert!(!worker.has_exited());

        drop(c);
        wait_until(|| worker.has_exited());
    }

    #[test]
    fn poll_after_completion_is_ignored() {
        let mut c = Coordinator::new(fast(1));
        let mut sched = Recorder::default();
        c.start_countdown(&mut sched).unwrap();
        drive(&mut c, &mut sched);
        assert_eq!(c.state(), CountdownState::Idle);

        sched.0.clear();
        c.poll_tick(&mut sched).unwrap();
        assert!(sched.0.is_empty());
        assert_eq!(c.state(), CountdownState::Idle);
        assert_eq!(c.display(), DisplayedState::End);
    }
}
