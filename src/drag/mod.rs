//! The drag-session reconciliation engine: target resolution, the
//! per-gesture state machine, the commit algorithm, and grid placement.

pub mod commit;
pub mod geometry;
pub mod placement;
pub mod session;
pub mod target;

pub use commit::{CommitChange, ContainerCommit};
pub use geometry::{Point, Rect, ScrollBounds};
pub use placement::{MIN_TRACK_WEIGHT, TrackResizeSession, cell_at, place_panel};
pub use session::{DragKind, DragPhase, DragSession};
pub use target::{DropTarget, SubjectKind, TargetHit, TargetRole, resolve};
