use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::error::CountdownError;

/// Pause between two decrements.
pub const WORKER_INTERVAL: Duration = Duration::from_millis(500);

/// The value every countdown ends with.
pub const TERMINAL: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState { Alive, Joined, Killed }

/// Counts down from `start` and publishes every step on `sink`, then sends
/// the terminal value once more.
pub fn run(start: u32, sink: Sender<u32>) -> Result<(), CountdownError> {
    run_with_interval(start, sink, WORKER_INTERVAL)
}

pub fn run_with_interval(start: u32, sink: Sender<u32>, interval: Duration) -> Result<(), CountdownError> {
    let mut current = start;
    while current > 0 {
        current -= 1;
        sink.send(current).map_err(|_| CountdownError::ChannelClosed)?;
        thread::sleep(interval);
    }
    sink.send(TERMINAL).map_err(|_| CountdownError::ChannelClosed)
}

/// Starts a worker thread bound to a fresh channel and hands back the
/// receiving end.
pub fn spawn(start: u32, interval: Duration) -> (WorkerHandle, Receiver<u32>) {
    let (tx, rx): (Sender<u32>, Receiver<u32>) = mpsc::channel();
    let join = thread::spawn(move || {
        // A torn down channel means the coordinator shut down under us.
        if let Err(e) = run_with_interval(start, tx, interval) {
            debug!("countdown worker stopped: {}", e);
        }
    });
    (WorkerHandle { join: Some(join), state: WorkerState::Alive }, rx)
}

pub struct WorkerHandle {
    join: Option<JoinHandle<()>>,
    state: WorkerState,
}

impl WorkerHandle {
    pub fn state(&self) -> WorkerState { self.state }

    pub fn is_alive(&self) -> bool {
        self.state == WorkerState::Alive && !self.has_exited()
    }

    /// Whether the thread itself has returned, whatever the handle's state.
    pub fn has_exited(&self) -> bool {
        self.join.as_ref().map(|j| j.is_finished()).unwrap_or(true)
    }

    /// Blocks until the worker thread has exited. A killed worker is never waited on.
    pub fn join(&mut self) -> Result<(), CountdownError> {
        if self.state == WorkerState::Killed { return Ok(()); }
        let Some(join) = self.join.take() else { return Ok(()); };
        self.state = WorkerState::Joined;
        join.join().map_err(|_| CountdownError::WorkerPanicked)
    }

    /// Gives up on the worker without waiting for it.
    ///
    /// A thread cannot be preempted, so the worker keeps running until its
    /// next send fails on the torn down channel. The caller is expected to
    /// drop the receiving end right after this. The thread is detached when
    /// the handle is dropped.
    pub fn terminate(&mut self) {
        if self.state != WorkerState::Alive { return; }
        self.state = WorkerState::Killed;
    }
}
