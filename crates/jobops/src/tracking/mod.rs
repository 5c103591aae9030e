//! Application stage tracking.
//!
//! Stage events are the source of truth; the `jobs` table carries a
//! denormalized projection (`status`, `outcome`, `closed_at`) that the
//! engine re-derives from the full event history on every mutation.

pub mod engine;
pub mod error;
pub mod stage;

pub use engine::{StageEvent, StageEventPatch, TrackingEngine, TransitionRequest};
pub use error::TrackingError;
pub use stage::{Outcome, Stage, StageInput};
