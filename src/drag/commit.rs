//! Commit/reconciliation: turn the final preview projection (or, failing
//! that, the last resolver hit) into the minimal set of container
//! replacements for one released drag gesture.

use crate::store::ContainerMap;

use super::target::{TargetHit, TargetRole};

/// One container whose membership changed.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitChange {
    pub container_id: String,
    pub items: Vec<String>,
}

/// The resolved outcome of a released gesture. At most two containers are
/// touched: the origin and the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerCommit {
    pub subject_id: String,
    pub origin_container_id: String,
    pub final_container_id: String,
    pub final_index: usize,
    pub changes: Vec<CommitChange>,
}

/// Locate the subject inside a working copy of the container map.
/// The preview keeps the subject in exactly one container; scanning for it
/// preserves insertion-order fidelity even when the pointer ended over a
/// sentinel rather than a sibling.
pub fn find_subject(containers: &ContainerMap, subject_id: &str) -> Option<(String, usize)> {
    for (cid, items) in containers {
        if let Some(idx) = items.iter().position(|id| id == subject_id) {
            return Some((cid.clone(), idx));
        }
    }
    None
}

/// Preferred path: derive the commit from the final preview projection.
///
/// Returns `None` when the preview has no resolvable destination (the
/// gesture is then treated as a cancellation).
pub fn reconcile_preview(
    subject_id: &str,
    origin_container_id: &str,
    preview: &ContainerMap,
    committed: &ContainerMap,
) -> Option<ContainerCommit> {
    let (final_container_id, final_index) = find_subject(preview, subject_id)?;
    Some(build_commit(
        subject_id,
        origin_container_id,
        &final_container_id,
        final_index,
        committed,
    ))
}

/// Fallback path: no preview was ever computed (e.g. a release without an
/// intervening move). Derive destination and index from the resolver hit
/// alone, against the committed state.
pub fn reconcile_target(
    subject_id: &str,
    origin_container_id: &str,
    hit: &TargetHit,
    committed: &ContainerMap,
) -> Option<ContainerCommit> {
    let final_container_id = hit.target.container_id.clone()?;
    let remaining: Vec<&String> = committed
        .get(&final_container_id)
        .map(|items| items.iter().filter(|id| *id != subject_id).collect())
        .unwrap_or_default();

    let final_index = match &hit.target.role {
        TargetRole::TopSentinel => 0,
        TargetRole::BottomSentinel | TargetRole::ListBody => remaining.len(),
        TargetRole::Item { instance_id } => {
            // Released on its own row without ever moving: no-op.
            if instance_id == subject_id {
                return None;
            }
            // The sibling's slot before the subject is removed, so a drop
            // past a later sibling lands after it.
            committed
                .get(&final_container_id)
                .and_then(|items| items.iter().position(|id| id == instance_id))
                .unwrap_or(remaining.len())
        }
        TargetRole::GridCell { .. } => return None,
    };

    Some(build_commit(
        subject_id,
        origin_container_id,
        &final_container_id,
        final_index,
        committed,
    ))
}

/// Remove-before-insert against the committed state, emitting replacements
/// only for containers whose membership actually changed.
fn build_commit(
    subject_id: &str,
    origin_container_id: &str,
    final_container_id: &str,
    final_index: usize,
    committed: &ContainerMap,
) -> ContainerCommit {
    let mut changes = Vec::new();

    let strip = |container_id: &str| -> Vec<String> {
        committed
            .get(container_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|id| id.as_str() != subject_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut destination = strip(final_container_id);
    let insert_at = final_index.min(destination.len());
    destination.insert(insert_at, subject_id.to_string());

    if origin_container_id != final_container_id {
        let origin = strip(origin_container_id);
        if committed.get(origin_container_id) != Some(&origin) {
            changes.push(CommitChange {
                container_id: origin_container_id.to_string(),
                items: origin,
            });
        }
    }

    if committed.get(final_container_id) != Some(&destination) {
        changes.push(CommitChange {
            container_id: final_container_id.to_string(),
            items: destination,
        });
    }

    ContainerCommit {
        subject_id: subject_id.to_string(),
        origin_container_id: origin_container_id.to_string(),
        final_container_id: final_container_id.to_string(),
        final_index: insert_at,
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::geometry::Rect;
    use crate::drag::target::DropTarget;

    fn map(entries: &[(&str, &[&str])]) -> ContainerMap {
        entries
            .iter()
            .map(|(cid, items)| {
                (
                    cid.to_string(),
                    items.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    fn hit(container: &str, role: TargetRole) -> TargetHit {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        TargetHit {
            target: DropTarget {
                id: "t".to_string(),
                role,
                container_id: Some(container.to_string()),
                rect,
                scroll_bounds: None,
            },
            rect,
        }
    }

    #[test]
    fn test_same_list_reorder_from_preview() {
        // A = [x, y, z]; preview has x moved after z.
        let committed = map(&[("a", &["x", "y", "z"])]);
        let preview = map(&[("a", &["y", "z", "x"])]);
        let commit = reconcile_preview("x", "a", &preview, &committed).unwrap();

        assert_eq!(commit.final_container_id, "a");
        assert_eq!(commit.final_index, 2);
        assert_eq!(commit.changes.len(), 1);
        assert_eq!(commit.changes[0].items, ["y", "z", "x"]);
    }

    #[test]
    fn test_cross_container_move_touches_exactly_two() {
        let committed = map(&[("a", &["x", "y"]), ("b", &["z"]), ("c", &["w"])]);
        let preview = map(&[("a", &["y"]), ("b", &["z", "x"]), ("c", &["w"])]);
        let commit = reconcile_preview("x", "a", &preview, &committed).unwrap();

        assert_eq!(commit.changes.len(), 2);
        let a = commit.changes.iter().find(|c| c.container_id == "a").unwrap();
        let b = commit.changes.iter().find(|c| c.container_id == "b").unwrap();
        assert_eq!(a.items, ["y"]);
        assert_eq!(b.items, ["z", "x"]);
        assert!(!commit.changes.iter().any(|c| c.container_id == "c"));
    }

    #[test]
    fn test_preview_without_subject_is_unresolvable() {
        let committed = map(&[("a", &["x"])]);
        let preview = map(&[("a", &[])]);
        assert!(reconcile_preview("x", "a", &preview, &committed).is_none());
    }

    #[test]
    fn test_fallback_top_sentinel_inserts_at_zero() {
        let committed = map(&[("a", &["x"]), ("b", &["y", "z"])]);
        let commit =
            reconcile_target("x", "a", &hit("b", TargetRole::TopSentinel), &committed).unwrap();
        assert_eq!(commit.final_index, 0);
        let b = commit.changes.iter().find(|c| c.container_id == "b").unwrap();
        assert_eq!(b.items, ["x", "y", "z"]);
    }

    #[test]
    fn test_fallback_bottom_sentinel_appends() {
        let committed = map(&[("a", &["x"]), ("b", &[])]);
        let commit =
            reconcile_target("x", "a", &hit("b", TargetRole::BottomSentinel), &committed).unwrap();
        let a = commit.changes.iter().find(|c| c.container_id == "a").unwrap();
        let b = commit.changes.iter().find(|c| c.container_id == "b").unwrap();
        assert!(a.items.is_empty());
        assert_eq!(b.items, ["x"]);
    }

    #[test]
    fn test_fallback_sibling_slot_is_pre_removal() {
        let committed = map(&[("a", &["x", "y", "z"])]);
        // Dragging z up onto x lands before it.
        let commit = reconcile_target(
            "z",
            "a",
            &hit(
                "a",
                TargetRole::Item {
                    instance_id: "x".to_string(),
                },
            ),
            &committed,
        )
        .unwrap();
        assert_eq!(commit.changes[0].items, ["z", "x", "y"]);

        // Dragging x down onto z lands after it.
        let commit = reconcile_target(
            "x",
            "a",
            &hit(
                "a",
                TargetRole::Item {
                    instance_id: "z".to_string(),
                },
            ),
            &committed,
        )
        .unwrap();
        assert_eq!(commit.changes[0].items, ["y", "z", "x"]);
    }

    #[test]
    fn test_fallback_same_position_produces_no_changes() {
        // Dropping x on the top sentinel of its own list while already first.
        let committed = map(&[("a", &["x", "y"])]);
        let commit =
            reconcile_target("x", "a", &hit("a", TargetRole::TopSentinel), &committed).unwrap();
        assert!(commit.changes.is_empty());
    }

    #[test]
    fn test_fallback_drop_on_own_row_is_noop() {
        let committed = map(&[("a", &["x", "y"])]);
        let commit = reconcile_target(
            "x",
            "a",
            &hit(
                "a",
                TargetRole::Item {
                    instance_id: "x".to_string(),
                },
            ),
            &committed,
        );
        assert!(commit.is_none());
    }

    #[test]
    fn test_grid_cell_hit_never_commits_an_item() {
        let committed = map(&[("a", &["x"])]);
        let mut h = hit("a", TargetRole::GridCell { row: 0, col: 0 });
        h.target.container_id = None;
        assert!(reconcile_target("x", "a", &h, &committed).is_none());
    }

    #[test]
    fn test_lazy_destination_container() {
        // Destination container has never been written; created by commit.
        let committed = map(&[("a", &["x"])]);
        let commit =
            reconcile_target("x", "a", &hit("fresh", TargetRole::ListBody), &committed).unwrap();
        let fresh = commit
            .changes
            .iter()
            .find(|c| c.container_id == "fresh")
            .unwrap();
        assert_eq!(fresh.items, ["x"]);
    }
}
