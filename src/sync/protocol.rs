//! Wire protocol between observers and the board relay.
//!
//! Events travel as JSON text frames shaped `{"event": ..., "data": ...}`.
//! The transport contract is ordered, at-least-once per connection,
//! best-effort across reconnects; a full-state fetch supersedes any gap.

use serde::{Deserialize, Serialize};

use crate::store::{BoardSnapshot, GridPatch, Instance, Panel};

/// Mutations and requests a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// No board id allocates a fresh, empty board.
    RequestFullState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        board_id: Option<String>,
    },
    CreateInstance {
        board_id: String,
        instance: Instance,
    },
    UpdateInstance {
        board_id: String,
        instance: Instance,
    },
    DeleteInstance {
        board_id: String,
        instance_id: String,
    },
    /// Replace a container's membership wholesale.
    UpdateContainer {
        board_id: String,
        container_id: String,
        items: Vec<String>,
    },
    UpdatePanel {
        board_id: String,
        panel: Panel,
    },
    AddPanel {
        board_id: String,
        panel: Panel,
    },
    UpdateGrid {
        board_id: String,
        grid: GridPatch,
    },
}

impl ClientEvent {
    /// The board a mutation is scoped to; `None` only for a fresh-board
    /// full-state request.
    pub fn board_id(&self) -> Option<&str> {
        match self {
            Self::RequestFullState { board_id } => board_id.as_deref(),
            Self::CreateInstance { board_id, .. }
            | Self::UpdateInstance { board_id, .. }
            | Self::DeleteInstance { board_id, .. }
            | Self::UpdateContainer { board_id, .. }
            | Self::UpdatePanel { board_id, .. }
            | Self::AddPanel { board_id, .. }
            | Self::UpdateGrid { board_id, .. } => Some(board_id),
        }
    }
}

/// Broadcasts and replies from the relay. Every observer of a board
/// receives the mutation broadcasts, the sender included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    FullState(BoardSnapshot),
    InstanceCreated {
        board_id: String,
        instance: Instance,
    },
    InstanceUpdated {
        board_id: String,
        instance: Instance,
    },
    InstanceDeleted {
        board_id: String,
        instance_id: String,
    },
    ContainerUpdated {
        board_id: String,
        container_id: String,
        items: Vec<String>,
    },
    PanelUpdated {
        board_id: String,
        panel: Panel,
    },
    GridUpdated {
        board_id: String,
        grid: GridPatch,
    },
    /// Diagnostic reply when a mutation was dropped (e.g. unknown board).
    BoardError {
        board_id: String,
        message: String,
    },
}

impl ServerEvent {
    /// The board an event concerns. Used by the relay to fan broadcasts
    /// out only to connections observing that board.
    pub fn board_id(&self) -> &str {
        match self {
            Self::FullState(snapshot) => &snapshot.board_id,
            Self::InstanceCreated { board_id, .. }
            | Self::InstanceUpdated { board_id, .. }
            | Self::InstanceDeleted { board_id, .. }
            | Self::ContainerUpdated { board_id, .. }
            | Self::PanelUpdated { board_id, .. }
            | Self::GridUpdated { board_id, .. }
            | Self::BoardError { board_id, .. } => board_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GridSpec, PanelKind};

    #[test]
    fn test_request_full_state_without_board_id() {
        let ev = ClientEvent::RequestFullState { board_id: None };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"event\":\"request_full_state\""));
        assert!(!json.contains("board_id"));

        let back: ClientEvent = serde_json::from_str("{\"event\":\"request_full_state\",\"data\":{}}").unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn test_update_container_serialization() {
        let ev = ClientEvent::UpdateContainer {
            board_id: "b1".to_string(),
            container_id: "taskbox-p1".to_string(),
            items: vec!["x".to_string(), "y".to_string()],
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"event\":\"update_container\""));
        assert!(json.contains("\"container_id\":\"taskbox-p1\""));
        assert!(json.contains("[\"x\",\"y\"]"));
    }

    #[test]
    fn test_client_event_board_id_accessor() {
        let ev = ClientEvent::DeleteInstance {
            board_id: "b1".to_string(),
            instance_id: "x".to_string(),
        };
        assert_eq!(ev.board_id(), Some("b1"));
        assert_eq!(
            ClientEvent::RequestFullState { board_id: None }.board_id(),
            None
        );
    }

    #[test]
    fn test_full_state_roundtrip() {
        let ev = ServerEvent::FullState(BoardSnapshot {
            board_id: "b1".to_string(),
            grid: GridSpec::new_default(),
            instances: vec![],
            containers: vec![],
            panels: vec![],
        });
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"event\":\"full_state\""));
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn test_panel_updated_serialization() {
        let ev = ServerEvent::PanelUpdated {
            board_id: "b1".to_string(),
            panel: Panel {
                id: "p1".to_string(),
                kind: PanelKind::Schedule,
                row: 1,
                col: 2,
                width: 1,
                height: 1,
                container_id: "taskbox-p1".to_string(),
            },
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"event\":\"panel_updated\""));
        assert!(json.contains("\"kind\":\"schedule\""));
    }

    #[test]
    fn test_grid_patch_on_wire_omits_absent_fields() {
        let ev = ClientEvent::UpdateGrid {
            board_id: "b1".to_string(),
            grid: GridPatch {
                col_sizes: Some(vec![1.0, 2.0]),
                ..GridPatch::default()
            },
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("col_sizes"));
        assert!(!json.contains("row_sizes"));
        assert!(!json.contains("\"name\""));
    }

    #[test]
    fn test_board_error_is_distinguishable() {
        let ev = ServerEvent::BoardError {
            board_id: "missing".to_string(),
            message: "Board missing not found".to_string(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"event\":\"board_error\""));
        match serde_json::from_str::<ServerEvent>(&json).unwrap() {
            ServerEvent::BoardError { board_id, .. } => assert_eq!(board_id, "missing"),
            other => panic!("Expected BoardError, got {:?}", other),
        }
    }
}
