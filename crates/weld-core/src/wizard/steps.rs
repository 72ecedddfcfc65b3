//! Step descriptors
//!
//! The step list is fixed at compile time. Each step declares the state
//! fields it needs before it may render; readiness is a presence check only.

use super::state::{StateField, WizardState};

/// Identifies a wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    CreateConnectionBridge,
    AuthorizeConnection,
    CreateEltSync,
    AddSourceStreams,
    StartSync,
    MonitorSync,
}

/// Immutable description of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDescriptor {
    pub id: StepId,
    pub title: &'static str,
    /// Fields that must be present for the step to render
    pub requires: &'static [StateField],
}

impl StepDescriptor {
    /// Ready predicate
    pub fn is_ready(&self, state: &WizardState) -> bool {
        self.requires.iter().all(|field| state.has(*field))
    }

    /// Required fields currently absent
    pub fn missing(&self, state: &WizardState) -> Vec<StateField> {
        self.requires
            .iter()
            .copied()
            .filter(|field| !state.has(*field))
            .collect()
    }

    /// One-line result shown once the step is done
    pub fn summary(&self, state: &WizardState) -> Option<String> {
        match self.id {
            StepId::CreateConnectionBridge => state
                .connection_bridge
                .as_ref()
                .map(|bridge| format!("bridge {}", bridge.id)),
            StepId::AuthorizeConnection => state
                .connection_id
                .as_ref()
                .map(|id| format!("connection {}", id)),
            StepId::CreateEltSync => state
                .elt_sync
                .as_ref()
                .map(|sync| format!("sync {}", sync.id)),
            StepId::AddSourceStreams => state.source_streams.as_ref().map(|streams| {
                let names: Vec<&str> = streams.iter().map(|s| s.name.as_str()).collect();
                format!("{} streams ({})", streams.len(), names.join(", "))
            }),
            StepId::StartSync | StepId::MonitorSync => None,
        }
    }
}

/// The ELT sync setup flow, in order
pub const STEPS: [StepDescriptor; 6] = [
    StepDescriptor {
        id: StepId::CreateConnectionBridge,
        title: "Create Connection Bridge",
        requires: &[],
    },
    StepDescriptor {
        id: StepId::AuthorizeConnection,
        title: "Authorize Connection",
        requires: &[StateField::ConnectionBridge],
    },
    StepDescriptor {
        id: StepId::CreateEltSync,
        title: "Create ELT Sync",
        requires: &[StateField::ConnectionId],
    },
    StepDescriptor {
        id: StepId::AddSourceStreams,
        title: "Add Streams (Tables) to Sync",
        requires: &[StateField::EltSync],
    },
    StepDescriptor {
        id: StepId::StartSync,
        title: "Start the Sync",
        requires: &[StateField::SourceStreams, StateField::EltSync],
    },
    StepDescriptor {
        id: StepId::MonitorSync,
        title: "Monitor Sync Status",
        requires: &[StateField::SourceStreams, StateField::EltSync],
    },
];
