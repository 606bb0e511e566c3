//! Gesture → document mapping for the draggable parts of the flyer.
//!
//! The controller here only tracks who owns the pointer. Turning a gesture
//! into a new document is done by [`apply_change`], which the editor routes
//! through its single mutation path.

use egui::{Modifiers, Pos2, Vec2};
use std::ops::RangeInclusive;

use crate::document::{Placement, PostConfig, TILE_SCALE_MAX, TILE_SCALE_MIN};

/// Degrees per shift+wheel notch.
pub const ROTATION_STEP: f32 = 5.0;
/// Scale change per wheel delta unit.
pub const WHEEL_SCALE_SENSITIVITY: f32 = 0.001;

// ============================================================================
// TARGETS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DragTarget {
    Logo,
    Brand,
    Tagline,
    HeaderBackground,
    CtaBackground,
    /// Image inside grid tile `n`.
    Tile(usize),
}

impl DragTarget {
    pub fn supports_rotation(self) -> bool {
        matches!(self, DragTarget::Logo | DragTarget::Brand | DragTarget::Tagline)
    }

    /// Allowed scale for wheel zoom on this target.
    pub fn scale_range(self) -> RangeInclusive<f32> {
        match self {
            DragTarget::Logo => 0.05..=2.0,
            DragTarget::Brand | DragTarget::Tagline => 0.1..=5.0,
            DragTarget::Tile(_) => TILE_SCALE_MIN..=TILE_SCALE_MAX,
            DragTarget::HeaderBackground | DragTarget::CtaBackground => 0.1..=10.0,
        }
    }
}

/// One incremental edit to a target's placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformChange {
    /// Document-pixel offset.
    Translate(Vec2),
    /// Added to the current scale, then clamped to the target's range.
    Scale(f32),
    /// Added to the current rotation, in degrees.
    Rotate(f32),
}

/// Map a wheel event over `target` to a change.
///
/// Shift rotates targets that can rotate (down = clockwise); every other
/// wheel scales. A zero `delta_y` with shift held does nothing.
pub fn wheel_change(target: DragTarget, delta_y: f32, modifiers: Modifiers) -> Option<TransformChange> {
    if modifiers.shift && target.supports_rotation() {
        if delta_y > 0.0 {
            Some(TransformChange::Rotate(ROTATION_STEP))
        } else if delta_y < 0.0 {
            Some(TransformChange::Rotate(-ROTATION_STEP))
        } else {
            None
        }
    } else {
        Some(TransformChange::Scale(-delta_y * WHEEL_SCALE_SENSITIVITY))
    }
}

fn changed<P: Placement>(mut p: P, change: TransformChange, range: RangeInclusive<f32>) -> Option<P> {
    match change {
        TransformChange::Translate(delta) => Some(p.translated(delta)),
        TransformChange::Scale(delta) => {
            p.set_scale((p.scale() + delta).clamp(*range.start(), *range.end()));
            Some(p)
        }
        TransformChange::Rotate(delta) => {
            let current = p.rotation()?;
            p.set_rotation(current + delta);
            Some(p)
        }
    }
}

/// The document with `change` applied to `target`, or `None` when the
/// change has nothing to act on (rotation of a non-rotating target, a tile
/// index past the item list).
pub fn apply_change(doc: &PostConfig, target: DragTarget, change: TransformChange) -> Option<PostConfig> {
    let range = target.scale_range();
    let mut next = doc.clone();
    match target {
        DragTarget::Logo => next.logo_transform = changed(doc.logo_transform, change, range)?,
        DragTarget::Brand => next.brand_transform = changed(doc.brand_transform, change, range)?,
        DragTarget::Tagline => next.tagline_transform = changed(doc.tagline_transform, change, range)?,
        DragTarget::HeaderBackground => {
            next.header_background_transform = changed(doc.header_background_transform, change, range)?
        }
        DragTarget::CtaBackground => next.cta_bg_transform = changed(doc.cta_bg_transform, change, range)?,
        DragTarget::Tile(index) => {
            let item = next.grid_items.get_mut(index)?;
            item.image_transform = changed(item.image_transform, change, range)?;
        }
    }
    Some(next)
}

// ============================================================================
// DRAG SESSION
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragSession {
    pub target: DragTarget,
    pub pointer_id: u64,
    last_pos: Pos2,
    moved: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Result of one pointer move during a drag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragStep {
    pub target: DragTarget,
    /// Movement in document pixels.
    pub delta: Vec2,
    /// True for the first move of the gesture.
    pub first: bool,
}

/// Pointer ownership for element drags. The first press wins; everything
/// else is ignored until that pointer is released.
#[derive(Clone, Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn active_target(&self) -> Option<DragTarget> {
        match self.state {
            DragState::Dragging(session) => Some(session.target),
            DragState::Idle => None,
        }
    }

    pub fn press(&mut self, target: DragTarget, pointer_id: u64, pos: Pos2) -> bool {
        if let DragState::Dragging(_) = self.state {
            return false;
        }
        self.state = DragState::Dragging(DragSession { target, pointer_id, last_pos: pos, moved: false });
        true
    }

    /// Screen movement since the last event, divided by the view scale.
    pub fn drag_to(&mut self, pointer_id: u64, pos: Pos2, view_scale: f32) -> Option<DragStep> {
        let DragState::Dragging(session) = &mut self.state else {
            return None;
        };
        if session.pointer_id != pointer_id {
            return None;
        }
        let screen_delta = pos - session.last_pos;
        session.last_pos = pos;
        let first = !session.moved;
        session.moved = true;
        let scale = if view_scale > 0.0 { view_scale } else { 1.0 };
        Some(DragStep { target: session.target, delta: screen_delta / scale, first })
    }

    /// Pointer up or leave. Returns the target that was released.
    pub fn release(&mut self, pointer_id: u64) -> Option<DragTarget> {
        match self.state {
            DragState::Dragging(session) if session.pointer_id == pointer_id => {
                self.state = DragState::Idle;
                Some(session.target)
            }
            _ => None,
        }
    }

    /// Drop any session without asking which pointer owns it.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
