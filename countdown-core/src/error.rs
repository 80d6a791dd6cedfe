use thiserror::Error;

use crate::coordinator::CountdownState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CountdownError {
    /// The other end of the countdown channel is gone.
    #[error("countdown channel closed")]
    ChannelClosed,
    #[error("cannot {action} while {state:?}")]
    InvalidStateTransition { state: CountdownState, action: &'static str },
    #[error("countdown worker panicked")]
    WorkerPanicked,
}
