//! The authoritative board state: per-board caches over the persistence
//! layer, plus the validate → apply → persist → broadcast pipeline every
//! inbound mutation runs through.

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::BoardError;
use crate::store::{EntityStore, GridSpec};
use crate::sync::{ClientEvent, ServerEvent};

use super::auth::Identity;
use super::db::BoardDb;

/// In-memory authoritative state for one board. The cache is the source of
/// truth while the process runs; the database trails it by one write.
struct BoardCache {
    owner_id: Option<String>,
    store: EntityStore,
}

/// What one inbound event produced: an optional direct reply to the sender
/// and an optional broadcast to every observer of the board (the sender
/// included).
#[derive(Debug, Default)]
pub struct HandleOutcome {
    pub reply: Option<ServerEvent>,
    pub broadcast: Option<ServerEvent>,
}

impl HandleOutcome {
    fn reply(event: ServerEvent) -> Self {
        Self {
            reply: Some(event),
            ..Self::default()
        }
    }

    fn broadcast(event: ServerEvent) -> Self {
        Self {
            broadcast: Some(event),
            ..Self::default()
        }
    }
}

pub struct BoardAuthority {
    db: BoardDb,
    boards: HashMap<String, BoardCache>,
}

impl BoardAuthority {
    pub fn new(db: BoardDb) -> Self {
        Self {
            db,
            boards: HashMap::new(),
        }
    }

    /// Run one client event through validate → apply → persist → broadcast.
    ///
    /// A mutation against an unknown board is dropped: the sender gets a
    /// diagnostic `board_error` reply and nothing is broadcast. Container
    /// updates that would nest an instance inside its own subtree are
    /// rejected the same way. Persistence
    /// failures surface as `Err` but leave the cache applied; the caller
    /// logs and keeps the connection alive.
    pub fn handle(
        &mut self,
        identity: &Identity,
        event: ClientEvent,
    ) -> Result<HandleOutcome, BoardError> {
        match event {
            ClientEvent::RequestFullState { board_id: None } => {
                let snapshot = self.create_board(identity)?;
                Ok(HandleOutcome::reply(ServerEvent::FullState(snapshot)))
            }
            ClientEvent::RequestFullState {
                board_id: Some(board_id),
            } => {
                if !self.ensure_cached(&board_id)? {
                    return Ok(Self::unknown_board(&board_id));
                }
                let cache = &self.boards[&board_id];
                Ok(HandleOutcome::reply(ServerEvent::FullState(
                    cache.store.snapshot(&board_id),
                )))
            }
            ClientEvent::CreateInstance { board_id, instance } => {
                let Some(cache) = self.cached_mut(&board_id)? else {
                    return Ok(Self::unknown_board(&board_id));
                };
                cache.store.upsert_instance(instance.clone());
                let owner = cache.owner_id.clone();
                self.db
                    .upsert_instance(&board_id, owner.as_deref(), &instance)
                    .map_err(BoardError::Database)?;
                Ok(HandleOutcome::broadcast(ServerEvent::InstanceCreated {
                    board_id,
                    instance,
                }))
            }
            ClientEvent::UpdateInstance { board_id, instance } => {
                let Some(cache) = self.cached_mut(&board_id)? else {
                    return Ok(Self::unknown_board(&board_id));
                };
                cache.store.upsert_instance(instance.clone());
                let owner = cache.owner_id.clone();
                self.db
                    .upsert_instance(&board_id, owner.as_deref(), &instance)
                    .map_err(BoardError::Database)?;
                Ok(HandleOutcome::broadcast(ServerEvent::InstanceUpdated {
                    board_id,
                    instance,
                }))
            }
            ClientEvent::DeleteInstance {
                board_id,
                instance_id,
            } => {
                let Some(cache) = self.cached_mut(&board_id)? else {
                    return Ok(Self::unknown_board(&board_id));
                };
                cache.store.delete_instance(&instance_id);
                // The cascade may have rewritten containers; persist every
                // one that still references nothing stale.
                let touched: Vec<(String, Vec<String>)> = cache
                    .store
                    .containers
                    .iter()
                    .map(|(id, items)| (id.clone(), items.clone()))
                    .collect();
                let owner = cache.owner_id.clone();
                self.db
                    .delete_instance(&board_id, &instance_id)
                    .map_err(BoardError::Database)?;
                for (container_id, items) in touched {
                    self.db
                        .upsert_container(&board_id, owner.as_deref(), &container_id, &items)
                        .map_err(BoardError::Database)?;
                }
                Ok(HandleOutcome::broadcast(ServerEvent::InstanceDeleted {
                    board_id,
                    instance_id,
                }))
            }
            ClientEvent::UpdateContainer {
                board_id,
                container_id,
                items,
            } => {
                let Some(cache) = self.cached_mut(&board_id)? else {
                    return Ok(Self::unknown_board(&board_id));
                };
                for id in &items {
                    if !cache.store.instances.contains_key(id) {
                        warn!(board_id, container_id, instance_id = %id,
                            "container update references unknown instance");
                    }
                    if cache.store.would_create_cycle(&container_id, id) {
                        warn!(board_id, container_id, instance_id = %id,
                            "container update would nest an instance inside itself");
                        return Ok(HandleOutcome::reply(ServerEvent::BoardError {
                            board_id: board_id.clone(),
                            message: format!(
                                "Placing {} in {} would create a containment cycle",
                                id, container_id
                            ),
                        }));
                    }
                }
                cache.store.replace_container(&container_id, items.clone());
                let owner = cache.owner_id.clone();
                self.db
                    .upsert_container(&board_id, owner.as_deref(), &container_id, &items)
                    .map_err(BoardError::Database)?;
                Ok(HandleOutcome::broadcast(ServerEvent::ContainerUpdated {
                    board_id,
                    container_id,
                    items,
                }))
            }
            ClientEvent::UpdatePanel { board_id, panel }
            | ClientEvent::AddPanel { board_id, panel } => {
                let Some(cache) = self.cached_mut(&board_id)? else {
                    return Ok(Self::unknown_board(&board_id));
                };
                cache.store.upsert_panel(panel.clone());
                let owner = cache.owner_id.clone();
                self.db
                    .upsert_panel(&board_id, owner.as_deref(), &panel)
                    .map_err(BoardError::Database)?;
                Ok(HandleOutcome::broadcast(ServerEvent::PanelUpdated {
                    board_id,
                    panel,
                }))
            }
            ClientEvent::UpdateGrid { board_id, grid } => {
                let Some(cache) = self.cached_mut(&board_id)? else {
                    return Ok(Self::unknown_board(&board_id));
                };
                if !cache.store.merge_grid(&grid) {
                    return Err(BoardError::GridNotHydrated { board_id });
                }
                let merged = cache
                    .store
                    .grid
                    .clone()
                    .ok_or_else(|| BoardError::GridNotHydrated {
                        board_id: board_id.clone(),
                    })?;
                let owner = cache.owner_id.clone();
                self.db
                    .upsert_grid(&board_id, owner.as_deref(), &merged)
                    .map_err(BoardError::Database)?;
                Ok(HandleOutcome::broadcast(ServerEvent::GridUpdated {
                    board_id,
                    grid,
                }))
            }
        }
    }

    fn unknown_board(board_id: &str) -> HandleOutcome {
        warn!(board_id, "dropping event for unknown board");
        HandleOutcome::reply(ServerEvent::BoardError {
            board_id: board_id.to_string(),
            message: format!("Board {} not found", board_id),
        })
    }

    /// Allocate a fresh board with the default 2×3 grid and persist it.
    fn create_board(
        &mut self,
        identity: &Identity,
    ) -> Result<crate::store::BoardSnapshot, BoardError> {
        let board_id = Uuid::new_v4().to_string();
        let mut store = EntityStore::new();
        store.board_id = Some(board_id.clone());
        store.grid = Some(GridSpec::new_default());
        let snapshot = store.snapshot(&board_id);

        self.db
            .upsert_grid(&board_id, identity.user_id.as_deref(), &GridSpec::new_default())
            .map_err(BoardError::Database)?;
        info!(board_id, "allocated new board");
        self.boards.insert(
            board_id,
            BoardCache {
                owner_id: identity.user_id.clone(),
                store,
            },
        );
        Ok(snapshot)
    }

    /// Make sure a board is in the cache, loading it from the database on
    /// first touch. Returns whether the board exists at all.
    fn ensure_cached(&mut self, board_id: &str) -> Result<bool, BoardError> {
        if self.boards.contains_key(board_id) {
            return Ok(true);
        }
        let Some(stored) = self
            .db
            .load_board(board_id)
            .map_err(BoardError::Database)?
        else {
            return Ok(false);
        };

        let mut store = EntityStore::new();
        store.hydrate(crate::store::BoardSnapshot {
            board_id: board_id.to_string(),
            grid: stored.grid,
            instances: stored.instances,
            containers: stored.containers,
            panels: stored.panels,
        });
        Self::audit_linkage(board_id, &store);
        info!(board_id, "board loaded into cache");
        self.boards.insert(
            board_id.to_string(),
            BoardCache {
                owner_id: stored.owner_id,
                store,
            },
        );
        Ok(true)
    }

    fn cached_mut(&mut self, board_id: &str) -> Result<Option<&mut BoardCache>, BoardError> {
        if !self.ensure_cached(board_id)? {
            return Ok(None);
        }
        Ok(self.boards.get_mut(board_id))
    }

    /// Log (never repair) dangling references and single-membership
    /// violations found in a freshly loaded board.
    fn audit_linkage(board_id: &str, store: &EntityStore) {
        for (container_id, items) in &store.containers {
            for id in items {
                if !store.instances.contains_key(id) {
                    warn!(board_id, container_id, instance_id = %id,
                        "stored container references missing instance");
                }
            }
        }
        for violation in store.membership_violations() {
            warn!(board_id, %violation, "stored board violates single membership");
        }
    }

    #[cfg(test)]
    fn board_store(&self, board_id: &str) -> Option<&EntityStore> {
        self.boards.get(board_id).map(|c| &c.store)
    }
}
