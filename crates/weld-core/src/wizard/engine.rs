//! Wizard sequencing
//!
//! States are step indices `0..N-1`. A step succeeding merges its patch into
//! the shared state and advances by one (clamped to the last step). Reset goes
//! back to step 0 with the seed state. The starting index is the furthest step
//! whose prerequisites the seed already satisfies.

use tracing::{info, warn};

use super::state::{StateField, StatePatch, WizardState};
use super::steps::{StepDescriptor, STEPS};

/// What occupies the current step's slot
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveStep<'a> {
    /// Prerequisites hold; the step may render
    Ready(&'a StepDescriptor),
    /// The index points at a step whose prerequisites no longer hold
    ///
    /// Only reachable if state is invalidated after advancing. The shell
    /// shows the missing fields and offers reset instead of rendering nothing.
    Blocked {
        step: &'a StepDescriptor,
        missing: Vec<StateField>,
    },
}

/// Step sequencing engine
#[derive(Debug, Clone)]
pub struct Wizard {
    steps: &'static [StepDescriptor],
    seed: WizardState,
    state: WizardState,
    current: usize,
}

impl Wizard {
    /// Wizard over the standard ELT sync flow
    pub fn new(seed: WizardState) -> Self {
        Self::with_steps(&STEPS, seed)
    }

    /// Wizard over a custom step list
    ///
    /// # Panics
    ///
    /// Panics if `steps` is empty.
    pub fn with_steps(steps: &'static [StepDescriptor], seed: WizardState) -> Self {
        assert!(!steps.is_empty(), "wizard needs at least one step");
        let current = initial_index(steps, &seed);
        info!(current, "wizard starting");
        Self {
            steps,
            state: seed.clone(),
            seed,
            current,
        }
    }

    pub fn steps(&self) -> &'static [StepDescriptor] {
        self.steps
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &'static StepDescriptor {
        &self.steps[self.current]
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Whether the step at `index` has been passed
    pub fn is_completed(&self, index: usize) -> bool {
        index < self.current
    }

    /// Whether the step at `index` should render right now
    pub fn is_rendered(&self, index: usize) -> bool {
        index == self.current && self.steps[index].is_ready(&self.state)
    }

    /// The current slot, ready or blocked
    pub fn active(&self) -> ActiveStep<'static> {
        let step = self.current_step();
        let missing = step.missing(&self.state);
        if missing.is_empty() {
            ActiveStep::Ready(step)
        } else {
            ActiveStep::Blocked { step, missing }
        }
    }

    /// Record success of the current step and move on
    ///
    /// Returns the new index. Never decreases and never passes the last step.
    pub fn complete(&mut self, patch: StatePatch) -> usize {
        self.state.merge(patch);
        let next = (self.current + 1).min(self.last_index());
        info!(from = self.current, to = next, "wizard step completed");
        self.current = next;

        if let ActiveStep::Blocked { step, missing } = self.active() {
            warn!(step = step.title, ?missing, "advanced to a step that is not ready");
        }
        self.current
    }

    /// Start over: step 0 with the seed state
    pub fn reset(&mut self) {
        info!("wizard reset");
        self.state = self.seed.clone();
        self.current = 0;
    }
}

/// Furthest step whose ready predicate holds for `state`, or 0
pub fn initial_index(steps: &[StepDescriptor], state: &WizardState) -> usize {
    steps
        .iter()
        .rposition(|step| step.is_ready(state))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ConnectionBridge, EltSync, SourceStream};
    use crate::wizard::steps::StepId;

    fn bridge() -> ConnectionBridge {
        ConnectionBridge {
            id: "br_1".to_string(),
            authorize_url: "https://example.com/auth".to_string(),
            created_at: None,
            expires_at: None,
        }
    }

    fn sync() -> EltSync {
        serde_json::from_value(serde_json::json!({"id": "s1"})).unwrap()
    }

    fn streams() -> Vec<SourceStream> {
        serde_json::from_value(serde_json::json!([{"id": "st1", "name": "orders"}])).unwrap()
    }

    #[test]
    fn test_empty_state_starts_at_zero() {
        let wizard = Wizard::new(WizardState::default());
        assert_eq!(wizard.current_index(), 0);
        assert_eq!(wizard.current_step().id, StepId::CreateConnectionBridge);
    }

    #[test]
    fn test_seeded_connection_starts_at_create_sync() {
        let wizard = Wizard::new(WizardState::seeded(Some("conn".to_string())));
        assert_eq!(wizard.current_index(), 2);
        assert_eq!(wizard.current_step().title, "Create ELT Sync");
    }

    #[test]
    fn test_initial_index_is_furthest_ready_step() {
        let state = WizardState {
            connection_bridge: Some(bridge()),
            ..WizardState::default()
        };
        assert_eq!(initial_index(&STEPS, &state), 1);

        let state = WizardState {
            elt_sync: Some(sync()),
            source_streams: Some(streams()),
            ..WizardState::default()
        };
        assert_eq!(initial_index(&STEPS, &state), 5);

        let state = WizardState {
            elt_sync: Some(sync()),
            ..WizardState::default()
        };
        assert_eq!(initial_index(&STEPS, &state), 3);
    }

    #[test]
    fn test_full_flow_advances_one_step_at_a_time() {
        let mut wizard = Wizard::new(WizardState::default());

        assert_eq!(wizard.complete(StatePatch::connection_bridge(bridge(), "pg")), 1);
        assert!(wizard.is_rendered(1));
        assert!(wizard.is_completed(0));

        assert_eq!(wizard.complete(StatePatch::connection_id("conn")), 2);
        assert_eq!(wizard.complete(StatePatch::elt_sync(sync())), 3);
        assert_eq!(wizard.complete(StatePatch::source_streams(streams())), 4);
        assert_eq!(wizard.complete(StatePatch::empty()), 5);
        assert!(matches!(wizard.active(), ActiveStep::Ready(step) if step.id == StepId::MonitorSync));
    }

    #[test]
    fn test_advance_clamps_at_last_step() {
        let seed = WizardState {
            elt_sync: Some(sync()),
            source_streams: Some(streams()),
            ..WizardState::default()
        };
        let mut wizard = Wizard::new(seed);
        assert_eq!(wizard.current_index(), 5);

        for _ in 0..3 {
            assert_eq!(wizard.complete(StatePatch::empty()), 5);
        }
    }

    #[test]
    fn test_advance_never_decreases() {
        let mut wizard = Wizard::new(WizardState::default());
        let mut previous = wizard.current_index();
        for _ in 0..10 {
            let next = wizard.complete(StatePatch::empty());
            assert!(next >= previous);
            assert!(next <= wizard.last_index());
            previous = next;
        }
    }

    #[test]
    fn test_reset_restores_seed() {
        let mut wizard = Wizard::new(WizardState::seeded(Some("seed".to_string())));
        wizard.complete(StatePatch::elt_sync(sync()));
        wizard.complete(StatePatch::connection_id("other"));

        wizard.reset();
        assert_eq!(wizard.current_index(), 0);
        assert_eq!(wizard.state(), &WizardState::seeded(Some("seed".to_string())));
    }

    #[test]
    fn test_only_current_ready_step_renders() {
        let wizard = Wizard::new(WizardState::default());
        assert!(wizard.is_rendered(0));
        for index in 1..wizard.steps().len() {
            assert!(!wizard.is_rendered(index));
        }
    }

    #[test]
    fn test_step_without_prerequisites_is_reported_blocked() {
        // Completing step 0 without emitting a bridge lands on a step whose
        // predicate fails; it must surface as blocked, never render.
        let mut wizard = Wizard::new(WizardState::default());
        wizard.complete(StatePatch::empty());

        assert_eq!(wizard.current_index(), 1);
        assert!(!wizard.is_rendered(1));
        match wizard.active() {
            ActiveStep::Blocked { step, missing } => {
                assert_eq!(step.id, StepId::AuthorizeConnection);
                assert_eq!(missing, vec![StateField::ConnectionBridge]);
            }
            other => panic!("expected blocked step, got {:?}", other),
        }

        // Reset is the recovery path
        wizard.reset();
        assert!(matches!(wizard.active(), ActiveStep::Ready(_)));
    }
}
