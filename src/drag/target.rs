//! Target resolution: which registered drop targets a pointer sample can
//! legally land on for the subject being dragged, ranked by priority.

use super::geometry::{Point, Rect, ScrollBounds};

/// What kind of thing is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    /// A panel moving between grid cells.
    Panel,
    /// A list item moving within/between containers.
    Item,
}

/// The role a drop target plays for insertion semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetRole {
    /// "Before all items" strip at the head of a container.
    TopSentinel,
    /// "After all items" strip at the tail of a container.
    BottomSentinel,
    /// The list body itself; a hit here with no concrete sibling appends.
    ListBody,
    /// A concrete sibling item; insertion happens before it.
    Item { instance_id: String },
    /// One grid cell; only panels resolve here.
    GridCell { row: u32, col: u32 },
}

impl TargetRole {
    pub fn is_grid_cell(&self) -> bool {
        matches!(self, Self::GridCell { .. })
    }

    /// Item targets beat list bodies, list bodies beat sentinels; the
    /// sentinel strips are thin and rarely overlap anything else.
    fn rank(&self) -> u8 {
        match self {
            Self::Item { .. } => 0,
            Self::ListBody => 1,
            Self::TopSentinel | Self::BottomSentinel => 2,
            Self::GridCell { .. } => 3,
        }
    }
}

/// A registered droppable region.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub id: String,
    pub role: TargetRole,
    /// The container this target inserts into. `None` for grid cells.
    pub container_id: Option<String>,
    pub rect: Rect,
    /// Visible band of the enclosing scrollable panel, if any. Targets
    /// scrolled out of this band must not be hittable.
    pub scroll_bounds: Option<ScrollBounds>,
}

impl DropTarget {
    pub fn grid_cell(row: u32, col: u32, rect: Rect) -> Self {
        Self {
            id: format!("cell-{}-{}", row, col),
            role: TargetRole::GridCell { row, col },
            container_id: None,
            rect,
            scroll_bounds: None,
        }
    }
}

/// A resolved candidate: the target plus its clipped visible region.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetHit {
    pub target: DropTarget,
    pub rect: Rect,
}

fn is_valid(subject: SubjectKind, role: &TargetRole) -> bool {
    match subject {
        SubjectKind::Panel => role.is_grid_cell(),
        // Items can land anywhere except grid cells.
        SubjectKind::Item => !role.is_grid_cell(),
    }
}

/// Resolve the pointer against all registered targets.
///
/// Returns candidates ordered by priority: for panels the first matching
/// grid cell only (cells never overlap); for items concrete siblings first,
/// then list bodies, then sentinels, with remaining ties broken toward the
/// most specific (smallest) region.
pub fn resolve(subject: SubjectKind, pointer: Point, targets: &[DropTarget]) -> Vec<TargetHit> {
    let mut hits = Vec::new();

    for target in targets {
        if !is_valid(subject, &target.role) {
            continue;
        }

        let mut rect = target.rect;
        if let Some(bounds) = target.scroll_bounds {
            // Pointer outside the panel's visible band can never select
            // a target inside it.
            if pointer.y < bounds.top || pointer.y > bounds.bottom {
                continue;
            }
            match rect.clip_vertical(bounds.top, bounds.bottom) {
                Some(clipped) => rect = clipped,
                None => continue,
            }
        }

        if rect.contains(pointer) {
            hits.push(TargetHit {
                target: target.clone(),
                rect,
            });
        }
    }

    if subject == SubjectKind::Panel {
        // Grid cells never overlap: first hit wins.
        hits.truncate(1);
        return hits;
    }

    hits.sort_by(|a, b| {
        a.target
            .role
            .rank()
            .cmp(&b.target.role.rank())
            .then_with(|| a.rect.area().total_cmp(&b.rect.area()))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_target(id: &str, container: &str, rect: Rect) -> DropTarget {
        DropTarget {
            id: id.to_string(),
            role: TargetRole::Item {
                instance_id: id.to_string(),
            },
            container_id: Some(container.to_string()),
            rect,
            scroll_bounds: None,
        }
    }

    fn list_target(container: &str, rect: Rect) -> DropTarget {
        DropTarget {
            id: container.to_string(),
            role: TargetRole::ListBody,
            container_id: Some(container.to_string()),
            rect,
            scroll_bounds: None,
        }
    }

    fn sentinel(container: &str, role: TargetRole, rect: Rect) -> DropTarget {
        DropTarget {
            id: format!("{}-sentinel", container),
            role,
            container_id: Some(container.to_string()),
            rect,
            scroll_bounds: None,
        }
    }

    #[test]
    fn test_panel_only_resolves_grid_cells() {
        let targets = vec![
            list_target("a", Rect::new(0.0, 0.0, 100.0, 100.0)),
            DropTarget::grid_cell(0, 1, Rect::new(0.0, 0.0, 100.0, 100.0)),
        ];
        let hits = resolve(SubjectKind::Panel, Point::new(50.0, 50.0), &targets);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].target.role.is_grid_cell());
    }

    #[test]
    fn test_item_never_resolves_grid_cells() {
        let targets = vec![DropTarget::grid_cell(0, 0, Rect::new(0.0, 0.0, 100.0, 100.0))];
        let hits = resolve(SubjectKind::Item, Point::new(50.0, 50.0), &targets);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_concrete_item_beats_enclosing_list_body() {
        let targets = vec![
            list_target("a", Rect::new(0.0, 0.0, 100.0, 300.0)),
            item_target("x", "a", Rect::new(0.0, 40.0, 100.0, 70.0)),
        ];
        let hits = resolve(SubjectKind::Item, Point::new(50.0, 55.0), &targets);
        assert_eq!(hits.len(), 2);
        assert!(matches!(hits[0].target.role, TargetRole::Item { .. }));
        assert_eq!(hits[1].target.role, TargetRole::ListBody);
    }

    #[test]
    fn test_innermost_list_wins_tie() {
        // Nested child list inside the outer list body.
        let targets = vec![
            list_target("outer", Rect::new(0.0, 0.0, 100.0, 300.0)),
            list_target("children-x", Rect::new(10.0, 50.0, 90.0, 120.0)),
        ];
        let hits = resolve(SubjectKind::Item, Point::new(50.0, 60.0), &targets);
        assert_eq!(hits[0].target.id, "children-x");
    }

    #[test]
    fn test_scroll_clipping_excludes_hidden_targets() {
        let mut target = item_target("x", "a", Rect::new(0.0, 0.0, 100.0, 30.0));
        target.scroll_bounds = Some(ScrollBounds {
            top: 50.0,
            bottom: 200.0,
        });
        // Pointer at y=10 is over the item's unscrolled rect but above the
        // panel's visible band.
        let hits = resolve(SubjectKind::Item, Point::new(50.0, 10.0), &[target.clone()]);
        assert!(hits.is_empty());

        // Item fully above the visible band, pointer inside the band.
        let hits = resolve(SubjectKind::Item, Point::new(50.0, 60.0), &[target]);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_scroll_clipping_shrinks_partially_visible_target() {
        let mut target = list_target("a", Rect::new(0.0, 0.0, 100.0, 100.0));
        target.scroll_bounds = Some(ScrollBounds {
            top: 40.0,
            bottom: 200.0,
        });
        let hits = resolve(SubjectKind::Item, Point::new(50.0, 60.0), &[target]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rect.top, 40.0);
    }

    #[test]
    fn test_sentinels_rank_below_items_and_lists() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let targets = vec![
            sentinel("a", TargetRole::TopSentinel, rect),
            list_target("a", rect),
            item_target("x", "a", rect),
        ];
        let hits = resolve(SubjectKind::Item, Point::new(50.0, 50.0), &targets);
        assert!(matches!(hits[0].target.role, TargetRole::Item { .. }));
        assert_eq!(hits[1].target.role, TargetRole::ListBody);
        assert_eq!(hits[2].target.role, TargetRole::TopSentinel);
    }

    #[test]
    fn test_no_hits_outside_everything() {
        let targets = vec![list_target("a", Rect::new(0.0, 0.0, 100.0, 100.0))];
        let hits = resolve(SubjectKind::Item, Point::new(500.0, 500.0), &targets);
        assert!(hits.is_empty());
    }
}
