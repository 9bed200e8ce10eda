pub mod state;
pub mod tracker;

pub(crate) use state::report_misuse;
pub use state::{FocusSnapshot, FocusState, FocusStatus, TickOutcome, Visibility};
pub use tracker::{FocusConfig, FocusEvent, FocusTracker, VisibilitySender};
