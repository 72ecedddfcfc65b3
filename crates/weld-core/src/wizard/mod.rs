//! ELT sync setup wizard
//!
//! ## Flow
//!
//! 0. Create Connection Bridge
//! 1. Authorize Connection
//! 2. Create ELT Sync
//! 3. Add Streams (Tables) to Sync
//! 4. Start the Sync
//! 5. Monitor Sync Status
//!
//! Steps only see the state they declare; on success they emit a
//! [`StatePatch`] that the [`Wizard`] merges before advancing.

mod engine;
mod state;
mod steps;

pub use engine::{initial_index, ActiveStep, Wizard};
pub use state::{StateField, StatePatch, WizardState};
pub use steps::{StepDescriptor, StepId, STEPS};
