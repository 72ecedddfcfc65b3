//! Accumulated wizard state
//!
//! Each field is filled in by the step that produces it and never cleared on
//! its own; the whole state is replaced on reset.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::{ConnectionBridge, EltSync, SourceStream};

/// State shared by all wizard steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub integration_id: Option<String>,
    pub connection_id: Option<String>,
    pub connection_bridge: Option<ConnectionBridge>,
    pub elt_sync: Option<EltSync>,
    pub source_streams: Option<Vec<SourceStream>>,
}

/// Names of the state fields a step can require
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateField {
    IntegrationId,
    ConnectionId,
    ConnectionBridge,
    EltSync,
    SourceStreams,
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateField::IntegrationId => "integration",
            StateField::ConnectionId => "connection",
            StateField::ConnectionBridge => "connection bridge",
            StateField::EltSync => "ELT sync",
            StateField::SourceStreams => "source streams",
        };
        f.write_str(name)
    }
}

impl WizardState {
    /// Initial state, optionally seeded with a pre-configured connection
    pub fn seeded(connection_id: Option<String>) -> Self {
        Self {
            connection_id: connection_id.filter(|id| !id.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Whether `field` is populated
    pub fn has(&self, field: StateField) -> bool {
        match field {
            StateField::IntegrationId => self.integration_id.is_some(),
            StateField::ConnectionId => self.connection_id.is_some(),
            StateField::ConnectionBridge => self.connection_bridge.is_some(),
            StateField::EltSync => self.elt_sync.is_some(),
            StateField::SourceStreams => self.source_streams.is_some(),
        }
    }

    /// Shallow merge: fields present in `patch` overwrite, absent ones are kept
    pub fn merge(&mut self, patch: StatePatch) {
        if let Some(id) = patch.integration_id {
            self.integration_id = Some(id);
        }
        if let Some(id) = patch.connection_id {
            self.connection_id = Some(id);
        }
        if let Some(bridge) = patch.connection_bridge {
            self.connection_bridge = Some(bridge);
        }
        if let Some(sync) = patch.elt_sync {
            self.elt_sync = Some(sync);
        }
        if let Some(streams) = patch.source_streams {
            self.source_streams = Some(streams);
        }
    }
}

/// Partial state emitted by a step on success
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub integration_id: Option<String>,
    pub connection_id: Option<String>,
    pub connection_bridge: Option<ConnectionBridge>,
    pub elt_sync: Option<EltSync>,
    pub source_streams: Option<Vec<SourceStream>>,
}

impl StatePatch {
    /// Nothing to merge
    pub fn empty() -> Self {
        Self::default()
    }

    /// Output of "Create Connection Bridge"
    pub fn connection_bridge(bridge: ConnectionBridge, integration_id: impl Into<String>) -> Self {
        Self {
            connection_bridge: Some(bridge),
            integration_id: Some(integration_id.into()),
            ..Self::default()
        }
    }

    /// Output of "Authorize Connection"
    pub fn connection_id(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: Some(connection_id.into()),
            ..Self::default()
        }
    }

    /// Output of "Create ELT Sync"
    pub fn elt_sync(sync: EltSync) -> Self {
        Self {
            elt_sync: Some(sync),
            ..Self::default()
        }
    }

    /// Output of "Add Streams"
    pub fn source_streams(streams: Vec<SourceStream>) -> Self {
        Self {
            source_streams: Some(streams),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> ConnectionBridge {
        ConnectionBridge {
            id: "br_1".to_string(),
            authorize_url: "https://example.com/auth".to_string(),
            created_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_seeded_ignores_blank() {
        assert!(WizardState::seeded(Some("  ".to_string())).connection_id.is_none());
        let state = WizardState::seeded(Some("conn".to_string()));
        assert!(state.has(StateField::ConnectionId));
        assert!(!state.has(StateField::ConnectionBridge));
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut state = WizardState::seeded(Some("conn".to_string()));
        state.merge(StatePatch::connection_bridge(bridge(), "postgres"));

        assert_eq!(state.connection_id.as_deref(), Some("conn"));
        assert_eq!(state.integration_id.as_deref(), Some("postgres"));
        assert_eq!(state.connection_bridge.as_ref().unwrap().id, "br_1");
    }

    #[test]
    fn test_merge_overwrites_present_fields() {
        let mut state = WizardState::seeded(Some("old".to_string()));
        state.merge(StatePatch::connection_id("new"));
        assert_eq!(state.connection_id.as_deref(), Some("new"));
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut state = WizardState::seeded(Some("conn".to_string()));
        let before = state.clone();
        state.merge(StatePatch::empty());
        assert_eq!(state, before);
    }
}
