pub mod coordinator;
pub mod error;
pub mod logging;
pub mod schedule;
pub mod settings;
pub mod worker;

pub use coordinator::{Coordinator, CoordinatorConfig, CountdownState, DisplayedState};
pub use error::CountdownError;
pub use logging::init_logging;
pub use schedule::{Action, Scheduler, TimerQueue};
pub use settings::{AppSettings, SettingsStore};
pub use worker::{WorkerHandle, WorkerState};
