//! Drag session state machine.
//!
//! Owns the lifecycle of one pointer gesture: `Idle` → `Active` →
//! (repeated) `Previewing` → `Committing` → `Idle`. The session snapshots
//! the authoritative container map exactly once on activation; every
//! preview is derived from that snapshot plus resolver output, never from
//! the live map, so a broadcast landing mid-gesture cannot make the
//! preview flicker.

use crate::store::{ContainerMap, EntityStore, introduces_cycle};

use super::commit::{ContainerCommit, reconcile_preview, reconcile_target};
use super::target::{TargetHit, TargetRole};

/// Lifecycle phase of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Active,
    Previewing,
    Committing,
}

impl DragPhase {
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Active | Self::Previewing)
    }
}

/// What the gesture is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Item,
    Panel,
}

/// Ephemeral state for one gesture. Never persisted, never shared between
/// observers; discarded unconditionally at gesture end.
#[derive(Debug, Clone)]
pub struct DragSession {
    phase: DragPhase,
    kind: DragKind,
    subject_id: String,
    origin_container_id: String,
    snapshot: ContainerMap,
    preview: Option<ContainerMap>,
    last_hit: Option<TargetHit>,
}

impl DragSession {
    /// Start an item drag: capture the subject, its origin container, and
    /// a one-time snapshot of the committed container map.
    pub fn begin_item(
        store: &EntityStore,
        subject_id: impl Into<String>,
        origin_container_id: impl Into<String>,
    ) -> Self {
        Self {
            phase: DragPhase::Active,
            kind: DragKind::Item,
            subject_id: subject_id.into(),
            origin_container_id: origin_container_id.into(),
            snapshot: store.containers.clone(),
            preview: None,
            last_hit: None,
        }
    }

    /// Start a panel drag. Panels never build a container preview; their
    /// placement commits through the grid placement resolver.
    pub fn begin_panel(subject_id: impl Into<String>) -> Self {
        Self {
            phase: DragPhase::Active,
            kind: DragKind::Panel,
            subject_id: subject_id.into(),
            origin_container_id: String::new(),
            snapshot: ContainerMap::new(),
            preview: None,
            last_hit: None,
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn kind(&self) -> DragKind {
        self.kind
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn origin_container_id(&self) -> &str {
        &self.origin_container_id
    }

    /// The live preview projection, if any. Rendering reads this instead
    /// of the committed map while the gesture is active.
    pub fn preview_containers(&self) -> Option<&ContainerMap> {
        self.preview.as_ref()
    }

    /// Hovering the subject over its own unchanged position: same
    /// container, over its own row, with no preview movement yet.
    fn is_self_hover(&self, hit: &TargetHit) -> bool {
        if self.preview.is_some() {
            return false;
        }
        let TargetRole::Item { instance_id } = &hit.target.role else {
            return false;
        };
        instance_id == &self.subject_id
            && hit.target.container_id.as_deref() == Some(self.origin_container_id.as_str())
    }

    /// Recompute the preview for a pointer-move over a resolved target.
    ///
    /// Working rule: start from the previous preview (or the activation
    /// snapshot), remove the subject from every container, then reinsert
    /// per target role. A concrete sibling is inserted at the slot the
    /// sibling held before removal. A hover over the subject's own
    /// unchanged position skips recomputation entirely.
    pub fn preview_over(&mut self, hit: &TargetHit) {
        if self.kind != DragKind::Item || !self.phase.is_dragging() {
            return;
        }
        if self.is_self_hover(hit) {
            return;
        }
        let Some(dest) = hit.target.container_id.clone() else {
            return;
        };

        let base = self.preview.as_ref().unwrap_or(&self.snapshot);
        // Sibling slot is taken before the subject is removed: dragging
        // down past a sibling lands after it, dragging up lands before.
        let sibling_slot = match &hit.target.role {
            TargetRole::Item { instance_id } => base
                .get(&dest)
                .and_then(|items| items.iter().position(|id| id == instance_id)),
            _ => None,
        };
        let mut next: ContainerMap = base
            .iter()
            .map(|(cid, items)| {
                (
                    cid.clone(),
                    items
                        .iter()
                        .filter(|id| **id != self.subject_id)
                        .cloned()
                        .collect(),
                )
            })
            .collect();
        let target_items = next.entry(dest).or_default();

        match &hit.target.role {
            TargetRole::TopSentinel => target_items.insert(0, self.subject_id.clone()),
            TargetRole::BottomSentinel | TargetRole::ListBody => {
                // List-body with no concrete sibling hit appends ("gap"),
                // avoiding visual thrash over densely packed rows.
                target_items.push(self.subject_id.clone())
            }
            TargetRole::Item { .. } => {
                let idx = sibling_slot
                    .unwrap_or(target_items.len())
                    .min(target_items.len());
                target_items.insert(idx, self.subject_id.clone());
            }
            TargetRole::GridCell { .. } => return,
        }

        self.preview = Some(next);
        self.last_hit = Some(hit.clone());
        self.phase = DragPhase::Previewing;
    }

    /// Release over a (possibly absent) final target. Consumes the session;
    /// the preview is discarded regardless of outcome.
    ///
    /// Returns `None` for cancellations: no valid target, a malformed
    /// preview with no resolvable destination, a destination that would
    /// nest the subject inside its own subtree, or a panel-drag session.
    pub fn release(
        mut self,
        final_hit: Option<&TargetHit>,
        committed: &ContainerMap,
    ) -> Option<ContainerCommit> {
        self.phase = DragPhase::Committing;
        if self.kind != DragKind::Item {
            return None;
        }

        let commit = if let Some(preview) = self.preview.as_ref() {
            reconcile_preview(
                &self.subject_id,
                &self.origin_container_id,
                preview,
                committed,
            )?
        } else {
            // Fallback: released without a preview (no pointer-move happened).
            let hit = final_hit.or(self.last_hit.as_ref())?;
            reconcile_target(&self.subject_id, &self.origin_container_id, hit, committed)?
        };

        // A child list must never transitively contain its own owner.
        if introduces_cycle(committed, &commit.final_container_id, &self.subject_id) {
            return None;
        }
        Some(commit)
    }

    /// Abort the gesture: the preview is discarded and no mutation occurs.
    pub fn cancel(self) {}
}
