use egui::{Modifiers, Pos2, Vec2};

// ============================================================================
// VIEWPORT
// ============================================================================

pub const MIN_VIEW_SCALE: f32 = 0.1;
pub const MAX_VIEW_SCALE: f32 = 4.0;
/// Scale change per wheel delta unit.
pub const WHEEL_ZOOM_SENSITIVITY: f32 = 0.001;
/// Step used by the zoom buttons.
pub const ZOOM_STEP: f32 = 0.1;

/// Fit parameters, filled from `EditorSettings`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
    /// Pixels subtracted from the container on each axis before fitting.
    pub padding: f32,
    /// Upper bound on the fitted scale.
    pub max_scale: f32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { padding: 60.0, max_scale: 0.9 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PanSession {
    pointer_id: u64,
    last_pos: Pos2,
}

/// Pan/zoom camera over the rendered flyer. Pure view state: nothing here
/// touches the document or its history.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Vec2,
    pan: Option<PanSession>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { scale: 1.0, offset: Vec2::ZERO, pan: None }
    }
}

impl Viewport {
    /// Fit a `doc` sized page inside a `container` sized panel and recentre.
    pub fn fit_to_screen(&mut self, container: Vec2, doc: Vec2, opts: FitOptions) {
        if doc.x <= 0.0 || doc.y <= 0.0 {
            return;
        }
        let scale_x = (container.x - opts.padding) / doc.x;
        let scale_y = (container.y - opts.padding) / doc.y;
        let fitted = scale_x.min(scale_y).min(opts.max_scale);
        self.scale = fitted.clamp(MIN_VIEW_SCALE, MAX_VIEW_SCALE);
        self.offset = Vec2::ZERO;
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - ZOOM_STEP);
    }

    /// 100%. Pan is left where it is.
    pub fn reset_zoom(&mut self) {
        self.scale = 1.0;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.clamp(MIN_VIEW_SCALE, MAX_VIEW_SCALE);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    /// Start panning from a press on the canvas background. Ignored while
    /// another pan is in progress.
    pub fn begin_pan(&mut self, pointer_id: u64, pos: Pos2) -> bool {
        if self.pan.is_some() {
            return false;
        }
        self.pan = Some(PanSession { pointer_id, last_pos: pos });
        true
    }

    /// Follow the pointer. Screen deltas are applied as-is.
    pub fn pan_move(&mut self, pointer_id: u64, pos: Pos2) -> bool {
        match &mut self.pan {
            Some(session) if session.pointer_id == pointer_id => {
                let delta = pos - session.last_pos;
                session.last_pos = pos;
                self.offset += delta;
                true
            }
            _ => false,
        }
    }

    pub fn end_pan(&mut self, pointer_id: u64) {
        if self.pan.is_some_and(|s| s.pointer_id == pointer_id) {
            self.pan = None;
        }
    }

    /// Wheel over the canvas. Plain and ctrl/cmd wheel zoom; shift-only
    /// wheel is left for horizontal scrolling. Returns whether it zoomed.
    pub fn wheel(&mut self, delta_y: f32, modifiers: Modifiers) -> bool {
        if modifiers.ctrl || modifiers.command || !modifiers.shift {
            self.set_scale(self.scale - delta_y * WHEEL_ZOOM_SENSITIVITY);
            true
        } else {
            false
        }
    }
}
