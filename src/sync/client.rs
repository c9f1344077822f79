//! Optimistic sync client.
//!
//! Every local commit is applied to the local entity store immediately,
//! then emitted as a mutation event. While the transport is down, events
//! queue in FIFO order and flush in order on reconnect, followed by a
//! full-state request that supersedes any delivery gap. Inbound
//! broadcasts — the client's own echo included — are applied
//! unconditionally: last write wins, no merge, no causal vector.

use std::collections::VecDeque;

use crate::drag::ContainerCommit;
use crate::errors::SyncError;
use crate::store::{
    EntityStore, GridPatch, Instance, Panel, PanelKind, taskbox_container_id,
};

use super::protocol::{ClientEvent, ServerEvent};

/// One observer's view of a board plus its outbound event queue.
#[derive(Debug, Default)]
pub struct SyncClient {
    store: EntityStore,
    connected: bool,
    outbox: VecDeque<ClientEvent>,
}

impl SyncClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn board_id(&self) -> Option<&str> {
        self.store.board_id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    // ── Transport lifecycle ──────────────────────────────────────────

    /// Mark the transport up. Returns the events to send now: the queued
    /// backlog in original order, then a full-state request for the
    /// active board (convergence comes from the snapshot, not from
    /// buffered deltas).
    pub fn connect(&mut self) -> Vec<ClientEvent> {
        self.connected = true;
        let mut ready: Vec<ClientEvent> = self.outbox.drain(..).collect();
        ready.push(ClientEvent::RequestFullState {
            board_id: self.store.board_id.clone(),
        });
        ready
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Queue-or-pass-through: events emitted while disconnected buffer in
    /// FIFO order; a stalled gesture's commit survives transport loss.
    fn emit(&mut self, event: ClientEvent) -> Option<ClientEvent> {
        if self.connected {
            Some(event)
        } else {
            self.outbox.push_back(event);
            None
        }
    }

    fn board(&self) -> Result<String, SyncError> {
        self.store.board_id.clone().ok_or(SyncError::NoBoard)
    }

    // ── Local commits (optimistic apply + emit) ──────────────────────

    /// Apply a drag commit locally and emit one container replacement per
    /// changed container. Unaffected containers are not resent.
    pub fn commit_containers(
        &mut self,
        commit: &ContainerCommit,
    ) -> Result<Vec<ClientEvent>, SyncError> {
        let board_id = self.board()?;
        let mut ready = Vec::new();
        for change in &commit.changes {
            self.store
                .replace_container(&change.container_id, change.items.clone());
            let event = ClientEvent::UpdateContainer {
                board_id: board_id.clone(),
                container_id: change.container_id.clone(),
                items: change.items.clone(),
            };
            if let Some(ev) = self.emit(event) {
                ready.push(ev);
            }
        }
        Ok(ready)
    }

    /// Create an instance and append it to its host container.
    pub fn create_instance(
        &mut self,
        instance: Instance,
        host_container_id: &str,
    ) -> Result<Vec<ClientEvent>, SyncError> {
        let board_id = self.board()?;
        self.store.upsert_instance(instance.clone());
        let mut items = self.store.container(host_container_id).to_vec();
        items.push(instance.instance_id.clone());
        self.store.replace_container(host_container_id, items.clone());

        let events = [
            ClientEvent::CreateInstance {
                board_id: board_id.clone(),
                instance,
            },
            ClientEvent::UpdateContainer {
                board_id,
                container_id: host_container_id.to_string(),
                items,
            },
        ];
        Ok(events.into_iter().filter_map(|ev| self.emit(ev)).collect())
    }

    pub fn update_instance(&mut self, instance: Instance) -> Result<Vec<ClientEvent>, SyncError> {
        let board_id = self.board()?;
        self.store.upsert_instance(instance.clone());
        Ok(self
            .emit(ClientEvent::UpdateInstance { board_id, instance })
            .into_iter()
            .collect())
    }

    /// Delete an instance; removal cascades from every container locally
    /// and on the authority.
    pub fn delete_instance(&mut self, instance_id: &str) -> Result<Vec<ClientEvent>, SyncError> {
        let board_id = self.board()?;
        self.store.delete_instance(instance_id);
        Ok(self
            .emit(ClientEvent::DeleteInstance {
                board_id,
                instance_id: instance_id.to_string(),
            })
            .into_iter()
            .collect())
    }

    /// Allocate a panel in the next open cell along with its empty root
    /// container.
    pub fn add_panel(
        &mut self,
        panel_id: &str,
        kind: PanelKind,
    ) -> Result<Vec<ClientEvent>, SyncError> {
        let board_id = self.board()?;
        let grid = self
            .store
            .grid
            .as_ref()
            .ok_or(SyncError::NoBoard)?
            .clone();
        let (row, col) = self.store.next_open_cell(grid.rows, grid.cols);
        let container_id = taskbox_container_id(panel_id);
        let panel = Panel {
            id: panel_id.to_string(),
            kind,
            row,
            col,
            width: 1,
            height: 1,
            container_id: container_id.clone(),
        };

        self.store.upsert_panel(panel.clone());
        self.store.replace_container(&container_id, Vec::new());

        let events = [
            ClientEvent::AddPanel {
                board_id: board_id.clone(),
                panel,
            },
            ClientEvent::UpdateContainer {
                board_id,
                container_id,
                items: Vec::new(),
            },
        ];
        Ok(events.into_iter().filter_map(|ev| self.emit(ev)).collect())
    }

    /// Commit a released panel drag or resize.
    pub fn update_panel(&mut self, panel: Panel) -> Result<Vec<ClientEvent>, SyncError> {
        let board_id = self.board()?;
        self.store.upsert_panel(panel.clone());
        Ok(self
            .emit(ClientEvent::UpdatePanel { board_id, panel })
            .into_iter()
            .collect())
    }

    /// Commit a grid patch (track weights, dimensions, rename). Ignored
    /// until the grid has been hydrated.
    pub fn update_grid(&mut self, patch: GridPatch) -> Result<Vec<ClientEvent>, SyncError> {
        let board_id = self.board()?;
        if !self.store.merge_grid(&patch) {
            return Ok(Vec::new());
        }
        Ok(self
            .emit(ClientEvent::UpdateGrid {
                board_id,
                grid: patch,
            })
            .into_iter()
            .collect())
    }

    // ── Inbound broadcasts ───────────────────────────────────────────

    pub fn decode_inbound(text: &str) -> Result<ServerEvent, SyncError> {
        serde_json::from_str(text).map_err(SyncError::Decode)
    }

    /// Apply an inbound broadcast unconditionally. Receiving the client's
    /// own echo re-applies identical state, which is idempotent at
    /// container-replace granularity.
    pub fn apply_inbound(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::FullState(snapshot) => self.store.hydrate(snapshot),
            ServerEvent::InstanceCreated { instance, .. }
            | ServerEvent::InstanceUpdated { instance, .. } => {
                self.store.upsert_instance(instance);
            }
            ServerEvent::InstanceDeleted { instance_id, .. } => {
                self.store.delete_instance(&instance_id);
            }
            ServerEvent::ContainerUpdated {
                container_id, items, ..
            } => {
                self.store.replace_container(&container_id, items);
            }
            ServerEvent::PanelUpdated { panel, .. } => self.store.upsert_panel(panel),
            ServerEvent::GridUpdated { grid, .. } => {
                self.store.merge_grid(&grid);
            }
            ServerEvent::BoardError { board_id, message } => {
                tracing::warn!(board_id, message, "mutation dropped by authority");
            }
        }
    }
}
