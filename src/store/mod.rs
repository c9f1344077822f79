//! Normalized in-memory entity store.
//!
//! One store per observer (owned by the sync client) and one per board on
//! the authoritative side. Pure data plus the small set of mutations the
//! wire protocol can express; no drag logic lives here.

mod models;

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

pub use models::{
    BoardSnapshot, Container, GridPatch, GridSpec, Instance, InstanceProps, Panel, PanelKind,
    child_container_id, child_container_owner, schedule_slot_ids, slot_container_id,
    taskbox_container_id,
};

/// Map of container id to its ordered member list.
pub type ContainerMap = HashMap<String, Vec<String>>;

/// Would inserting `instance_id` into `container_id` make some container
/// (directly or transitively) contain its own owning instance?
///
/// Containment edges are the `children-<owner>` adjacency: an owner
/// instance contains everything in its child container, recursively.
pub fn introduces_cycle(containers: &ContainerMap, container_id: &str, instance_id: &str) -> bool {
    let Some(owner) = child_container_owner(container_id) else {
        return false;
    };
    if owner == instance_id {
        return true;
    }
    // Cycle iff the destination's owner is already a descendant of the
    // subject: walk the subject's subtree through child containers.
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([instance_id.to_string()]);
    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let child_list = child_container_id(&current);
        for child in containers.get(&child_list).into_iter().flatten() {
            if child == owner {
                return true;
            }
            queue.push_back(child.clone());
        }
    }
    false
}

/// Normalized maps of everything scoped to one board.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub board_id: Option<String>,
    pub grid: Option<GridSpec>,
    pub instances: HashMap<String, Instance>,
    pub containers: ContainerMap,
    pub panels: Vec<Panel>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire store with a server snapshot.
    pub fn hydrate(&mut self, snapshot: BoardSnapshot) {
        self.board_id = Some(snapshot.board_id);
        self.grid = Some(snapshot.grid);
        self.instances = snapshot
            .instances
            .into_iter()
            .map(|i| (i.instance_id.clone(), i))
            .collect();
        self.containers = snapshot
            .containers
            .into_iter()
            .map(|c| (c.container_id, c.items))
            .collect();
        self.panels = snapshot.panels;
    }

    /// Export the store as a snapshot for one board.
    pub fn snapshot(&self, board_id: &str) -> BoardSnapshot {
        BoardSnapshot {
            board_id: board_id.to_string(),
            grid: self.grid.clone().unwrap_or_else(GridSpec::new_default),
            instances: self.instances.values().cloned().collect(),
            containers: self
                .containers
                .iter()
                .map(|(id, items)| Container {
                    container_id: id.clone(),
                    items: items.clone(),
                })
                .collect(),
            panels: self.panels.clone(),
        }
    }

    // ── Instances ────────────────────────────────────────────────────

    pub fn upsert_instance(&mut self, instance: Instance) {
        self.instances
            .insert(instance.instance_id.clone(), instance);
    }

    /// Delete an instance and cascade its removal from every container.
    pub fn delete_instance(&mut self, instance_id: &str) {
        self.instances.remove(instance_id);
        for items in self.containers.values_mut() {
            items.retain(|id| id != instance_id);
        }
    }

    // ── Containers ───────────────────────────────────────────────────

    /// Replace a container's membership wholesale. Containers are created
    /// lazily on first write.
    pub fn replace_container(&mut self, container_id: &str, items: Vec<String>) {
        self.containers.insert(container_id.to_string(), items);
    }

    pub fn container(&self, container_id: &str) -> &[String] {
        self.containers
            .get(container_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A container's members with dangling references filtered out.
    /// Dangling ids are tolerated (never fatal) but logged for diagnosis.
    pub fn visible_items(&self, container_id: &str) -> Vec<String> {
        let mut out = Vec::new();
        for id in self.container(container_id) {
            if self.instances.contains_key(id) {
                out.push(id.clone());
            } else {
                warn!(container_id, instance_id = %id, "container references missing instance");
            }
        }
        out
    }

    /// See [`introduces_cycle`], against this store's container map.
    pub fn would_create_cycle(&self, container_id: &str, instance_id: &str) -> bool {
        introduces_cycle(&self.containers, container_id, instance_id)
    }

    // ── Panels ───────────────────────────────────────────────────────

    pub fn panel(&self, panel_id: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == panel_id)
    }

    pub fn upsert_panel(&mut self, panel: Panel) {
        match self.panels.iter_mut().find(|p| p.id == panel.id) {
            Some(existing) => *existing = panel,
            None => self.panels.push(panel),
        }
    }

    pub fn delete_panel(&mut self, panel_id: &str) {
        if let Some(panel) = self.panel(panel_id).cloned() {
            self.containers.remove(&panel.container_id);
            self.panels.retain(|p| p.id != panel_id);
        }
    }

    /// First free (row, col) scanned row-major; falls back to the origin
    /// when the grid is full.
    pub fn next_open_cell(&self, rows: u32, cols: u32) -> (u32, u32) {
        let taken: HashSet<(u32, u32)> = self.panels.iter().map(|p| (p.row, p.col)).collect();
        for r in 0..rows {
            for c in 0..cols {
                if !taken.contains(&(r, c)) {
                    return (r, c);
                }
            }
        }
        (0, 0)
    }

    // ── Grid ─────────────────────────────────────────────────────────

    /// Merge a partial grid update. Rejected until the grid record has been
    /// hydrated; callers treat `false` as "ignore the patch". Dimensions
    /// are floored at one track per axis.
    pub fn merge_grid(&mut self, patch: &GridPatch) -> bool {
        match self.grid.as_mut() {
            Some(grid) => {
                patch.apply_to(grid);
                grid.rows = grid.rows.max(1);
                grid.cols = grid.cols.max(1);
                true
            }
            None => {
                warn!("grid update ignored: grid not hydrated yet");
                false
            }
        }
    }

    /// Check the single-membership invariant: every instance id appears in
    /// at most one container. Used by tests and the authority's audit.
    pub fn membership_violations(&self) -> Vec<String> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut violations = Vec::new();
        for (cid, items) in &self.containers {
            for id in items {
                if let Some(first) = seen.insert(id.as_str(), cid.as_str()) {
                    violations.push(format!("{} in both {} and {}", id, first, cid));
                }
            }
        }
        violations
    }
}
