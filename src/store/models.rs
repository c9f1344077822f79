use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Flags controlling how an instance behaves as a nesting parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceProps {
    /// Instance can be expanded to reveal a nested child list.
    #[serde(default)]
    pub parent: bool,
    /// The nested child list accepts drops and reordering.
    #[serde(default)]
    pub sortable: bool,
}

/// A single movable item. Owned by the entity store; referenced by id
/// from at most one container at any quiescent moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: String,
    pub label: String,
    #[serde(default)]
    pub props: InstanceProps,
}

impl Instance {
    pub fn new(instance_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            label: label.into(),
            props: InstanceProps::default(),
        }
    }
}

/// An ordered list of instance ids plus the key it lives under.
/// This is the wire/persistence shape; the entity store keeps containers
/// as a plain `container_id -> Vec<id>` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub container_id: String,
    pub items: Vec<String>,
}

/// Which visual/behavioral template a panel hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Taskbox,
    Schedule,
}

impl PanelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taskbox => "taskbox",
            Self::Schedule => "schedule",
        }
    }
}

impl std::fmt::Display for PanelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PanelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "taskbox" => Ok(Self::Taskbox),
            "schedule" => Ok(Self::Schedule),
            _ => Err(format!("Invalid panel kind: {}", s)),
        }
    }
}

/// A rectangular placement in the grid, hosting one root container.
/// `row`/`col` move on panel drags; `width`/`height` on resize gestures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub id: String,
    pub kind: PanelKind,
    pub row: u32,
    pub col: u32,
    pub width: u32,
    pub height: u32,
    pub container_id: String,
}

/// Grid descriptor: track counts plus proportional track weights.
/// Empty weight vectors mean "uniform"; see [`GridSpec::effective_row_sizes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    #[serde(default)]
    pub row_sizes: Vec<f64>,
    #[serde(default)]
    pub col_sizes: Vec<f64>,
    #[serde(default)]
    pub name: String,
}

impl GridSpec {
    /// The default layout for a freshly allocated board.
    pub fn new_default() -> Self {
        Self {
            rows: 2,
            cols: 3,
            row_sizes: Vec::new(),
            col_sizes: Vec::new(),
            name: String::new(),
        }
    }

    pub fn effective_row_sizes(&self) -> Vec<f64> {
        effective_sizes(&self.row_sizes, self.rows as usize)
    }

    pub fn effective_col_sizes(&self) -> Vec<f64> {
        effective_sizes(&self.col_sizes, self.cols as usize)
    }
}

fn effective_sizes(sizes: &[f64], count: usize) -> Vec<f64> {
    if sizes.is_empty() {
        vec![1.0; count]
    } else {
        sizes.to_vec()
    }
}

/// A partial grid update: only present fields are merged into the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_sizes: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col_sizes: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GridPatch {
    pub fn apply_to(&self, grid: &mut GridSpec) {
        if let Some(rows) = self.rows {
            grid.rows = rows;
        }
        if let Some(cols) = self.cols {
            grid.cols = cols;
        }
        if let Some(ref sizes) = self.row_sizes {
            grid.row_sizes = sizes.clone();
        }
        if let Some(ref sizes) = self.col_sizes {
            grid.col_sizes = sizes.clone();
        }
        if let Some(ref name) = self.name {
            grid.name = name.clone();
        }
    }
}

/// Everything one observer needs to render a board: the `full_state` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board_id: String,
    pub grid: GridSpec,
    pub instances: Vec<Instance>,
    pub containers: Vec<Container>,
    pub panels: Vec<Panel>,
}

// ── Container naming conventions ─────────────────────────────────────

/// Root container id for a taskbox panel.
pub fn taskbox_container_id(panel_id: &str) -> String {
    format!("taskbox-{}", panel_id)
}

/// Nested child list owned by an instance.
pub fn child_container_id(instance_id: &str) -> String {
    format!("children-{}", instance_id)
}

/// The owning instance id, if this container is a nested child list.
pub fn child_container_owner(container_id: &str) -> Option<&str> {
    container_id.strip_prefix("children-")
}

/// One schedule time slot: `<panelContainerId>-HH:MM`.
pub fn slot_container_id(panel_container_id: &str, hour: u8, minute: u8) -> String {
    format!("{}-{:02}:{:02}", panel_container_id, hour, minute)
}

/// All 48 half-hour slot ids for a schedule panel, in day order.
pub fn schedule_slot_ids(panel_container_id: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(48);
    for h in 0..24u8 {
        for m in [0u8, 30] {
            out.push(slot_container_id(panel_container_id, h, m));
        }
    }
    out
}
