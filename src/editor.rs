//! The editing session.
//!
//! `Editor` owns the history, the proposal overlay, the gesture and viewport
//! state, the autosave timer and the background job channel. Every change
//! to the document goes through [`Editor::commit`], which is also the only
//! place the read-only rule (a proposal is being previewed) is enforced.

use egui::{Modifiers, Pos2, Vec2};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::autosave::AutosaveTimer;
use crate::components::history::History;
use crate::components::interaction::{self, DragController, DragTarget, TransformChange};
use crate::components::proposal::ProposalOverlay;
use crate::components::viewport::Viewport;
use crate::document::{GRID_PRESETS, GridItem, LayoutType, PaletteSlot, PostConfig};
use crate::image_handle::ImageHandle;
use crate::io::{self, Persistence, SavedProject, StoreError};
use crate::logger;
use crate::ops::ai::{self, AiAdapter, AiError, AspectRatio, BackgroundStyle, DesignResult, ImageTool, MagicFill};
use crate::ops::export::{self, ExportError, ExportFormat, PageWriter, RasterRequest, Rasterizer};
use crate::ops::jobs::{BusyFlags, Completed, JobKind, JobPool};
use crate::settings::EditorSettings;

/// Panel size assumed until the host reports a real one.
const DEFAULT_CONTAINER: Vec2 = Vec2::new(1280.0, 720.0);

// ============================================================================
// NOTICES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user. Failures never leave the editor; they end up here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

// ============================================================================
// INPUT
// ============================================================================

/// What the pointer is over when an event arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    /// A draggable part of the flyer.
    Element(DragTarget),
    /// Empty canvas around (or behind) the flyer.
    Canvas,
    /// A scrollable side panel. Wheel events here belong to the panel.
    ScrollPanel,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown { pointer_id: u64, pos: Pos2, hit: HitTarget },
    PointerMove { pointer_id: u64, pos: Pos2 },
    PointerUp { pointer_id: u64 },
    PointerLeave { pointer_id: u64 },
    Wheel { delta_y: f32, hit: HitTarget, modifiers: Modifiers },
}

// ============================================================================
// STAGED RESULTS
// ============================================================================

/// An enhanced or background-removed photo waiting for the user's verdict.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTileImage {
    pub index: usize,
    pub tool: ImageTool,
    pub image: ImageHandle,
}

enum JobMessage {
    MagicFill { index: usize, result: Result<MagicFill, AiError> },
    ImageTool { index: usize, tool: ImageTool, result: Result<ImageHandle, AiError> },
    Design(Result<DesignResult, AiError>),
    Tagline(Result<String, AiError>),
    Header(Result<ImageHandle, AiError>),
    DraftSaved(Result<u64, StoreError>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CommitMode {
    /// New history entry.
    Push,
    /// Rewrite the current entry (continuing drag with coalescing on).
    Amend,
}

// ============================================================================
// EDITOR
// ============================================================================

pub struct Editor {
    history: History<PostConfig>,
    proposal: ProposalOverlay<PostConfig>,
    drag: DragController,
    viewport: Viewport,
    container: Vec2,
    settings: EditorSettings,

    store: Arc<dyn Persistence>,
    ai: Arc<dyn AiAdapter>,
    busy: BusyFlags,
    pool: JobPool,
    job_tx: Sender<Completed<JobMessage>>,
    job_rx: Receiver<Completed<JobMessage>>,
    in_flight: usize,

    autosave: AutosaveTimer,
    last_saved: Option<u64>,
    notices: Vec<Notice>,
    pending_tile_image: Option<PendingTileImage>,
    pending_header: Option<ImageHandle>,
}

impl Editor {
    /// Open a session. The saved draft, if any, becomes the starting
    /// document with nothing to undo; hydration never schedules a save.
    pub fn new(settings: EditorSettings, store: Arc<dyn Persistence>, ai: Arc<dyn AiAdapter>) -> Self {
        let mut notices = Vec::new();
        let mut last_saved = None;
        let initial = match store.get_draft() {
            Ok(Some(draft)) => match draft.config.validate() {
                Ok(()) => {
                    log_info!("Restored draft saved at {}", draft.timestamp);
                    last_saved = Some(draft.timestamp);
                    draft.config
                }
                Err(e) => {
                    log_warn!("Ignoring invalid draft: {}", e);
                    notices.push(Notice {
                        level: NoticeLevel::Warning,
                        message: format!("The saved draft could not be restored: {}", e),
                    });
                    PostConfig::default()
                }
            },
            Ok(None) => PostConfig::default(),
            Err(e) => {
                log_err!("Failed to read draft: {}", e);
                notices.push(Notice {
                    level: NoticeLevel::Warning,
                    message: format!("The saved draft could not be read: {}", e),
                });
                PostConfig::default()
            }
        };

        let (job_tx, job_rx) = mpsc::channel();
        let mut editor = Self {
            history: History::new(initial),
            proposal: ProposalOverlay::default(),
            drag: DragController::default(),
            viewport: Viewport::default(),
            container: DEFAULT_CONTAINER,
            autosave: AutosaveTimer::new(settings.autosave_delay()),
            settings,
            store,
            ai,
            busy: BusyFlags::default(),
            pool: JobPool::new(),
            job_tx,
            job_rx,
            in_flight: 0,
            last_saved,
            notices,
            pending_tile_image: None,
            pending_header: None,
        };
        editor.fit_to_screen();
        editor
    }

    // ------------------------------------------------------------------
    // State access
    // ------------------------------------------------------------------

    /// The document to render: the proposal while previewing, otherwise
    /// the history's present.
    pub fn document(&self) -> &PostConfig {
        self.proposal.candidate().unwrap_or_else(|| self.history.present())
    }

    /// The committed document, ignoring any proposal.
    pub fn committed(&self) -> &PostConfig {
        self.history.present()
    }

    pub fn history(&self) -> &History<PostConfig> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.is_read_only() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.is_read_only() && self.history.can_redo()
    }

    /// True while a proposal is shown. Every edit is refused.
    pub fn is_read_only(&self) -> bool {
        self.proposal.is_previewing()
    }

    pub fn is_previewing(&self) -> bool {
        self.proposal.is_previewing()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn is_busy(&self, kind: JobKind) -> bool {
        self.busy.is_busy(kind)
    }

    pub fn jobs_in_flight(&self) -> usize {
        self.in_flight
    }

    /// Unix ms of the last successful draft write.
    pub fn last_saved(&self) -> Option<u64> {
        self.last_saved
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn pending_tile_image(&self) -> Option<&PendingTileImage> {
        self.pending_tile_image.as_ref()
    }

    pub fn pending_header(&self) -> Option<&ImageHandle> {
        self.pending_header.as_ref()
    }

    pub fn drag_target(&self) -> Option<DragTarget> {
        self.drag.active_target()
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice { level, message: message.into() });
    }

    // ------------------------------------------------------------------
    // The mutation path
    // ------------------------------------------------------------------

    /// Route one edit into the history. `f` sees the present and returns
    /// the next document, or `None` to make no change. Returns whether an
    /// edit was recorded.
    fn commit_with(&mut self, mode: CommitMode, f: impl FnOnce(&PostConfig) -> Option<PostConfig>) -> bool {
        if self.is_read_only() {
            return false;
        }
        let Some(next) = f(self.history.present()) else {
            return false;
        };
        let rows_before = self.document().grid_rows;
        match mode {
            CommitMode::Push => self.history.set(next),
            CommitMode::Amend => self.history.replace_present(next),
        }
        self.after_change(rows_before);
        true
    }

    fn commit(&mut self, f: impl FnOnce(&PostConfig) -> Option<PostConfig>) -> bool {
        self.commit_with(CommitMode::Push, f)
    }

    fn after_change(&mut self, rows_before: usize) {
        if !self.is_read_only() {
            self.autosave.schedule(Instant::now());
        }
        if self.document().grid_rows != rows_before {
            self.fit_to_screen();
        }
    }

    /// General edit: replace the document with `f(present)`.
    pub fn edit(&mut self, f: impl FnOnce(&PostConfig) -> PostConfig) -> bool {
        self.commit(|doc| Some(f(doc)))
    }

    pub fn undo(&mut self) -> bool {
        if self.is_read_only() {
            return false;
        }
        let rows_before = self.document().grid_rows;
        let moved = self.history.undo();
        if moved {
            self.after_change(rows_before);
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        if self.is_read_only() {
            return false;
        }
        let rows_before = self.document().grid_rows;
        let moved = self.history.redo();
        if moved {
            self.after_change(rows_before);
        }
        moved
    }

    // ------------------------------------------------------------------
    // Field edits
    // ------------------------------------------------------------------

    pub fn set_brand_name(&mut self, name: &str) -> bool {
        self.edit(|doc| PostConfig { brand_name: name.to_string(), ..doc.clone() })
    }

    pub fn set_tagline_text(&mut self, text: &str) -> bool {
        self.edit(|doc| PostConfig { tagline_text: text.to_string(), ..doc.clone() })
    }

    pub fn set_cta(&mut self, text: &str) -> bool {
        self.edit(|doc| PostConfig { cta: text.to_string(), ..doc.clone() })
    }

    pub fn set_layout(&mut self, layout: LayoutType) -> bool {
        self.edit(|doc| PostConfig { layout, ..doc.clone() })
    }

    pub fn set_grid_size(&mut self, rows: usize, cols: usize) -> bool {
        self.edit(|doc| doc.with_grid_size(rows, cols))
    }

    /// Switch to one of the layout panel's grid shapes.
    pub fn apply_grid_preset(&mut self, preset: usize) -> bool {
        let Some(&(rows, cols)) = GRID_PRESETS.get(preset) else {
            return false;
        };
        self.set_grid_size(rows, cols)
    }

    pub fn select_tile(&mut self, index: usize) -> bool {
        self.edit(|doc| doc.with_selected_index(index))
    }

    pub fn select_previous_tile(&mut self) -> bool {
        self.edit(PostConfig::with_previous_selected)
    }

    pub fn select_next_tile(&mut self) -> bool {
        self.edit(PostConfig::with_next_selected)
    }

    pub fn set_palette_color(&mut self, slot: PaletteSlot, hex: &str) -> bool {
        self.edit(|doc| doc.with_palette_color(slot, hex))
    }

    /// Change the selected tile's text, prices, fonts or border.
    pub fn update_selected_item(&mut self, f: impl FnOnce(&mut GridItem)) -> bool {
        self.edit(|doc| doc.with_selected_item(f))
    }

    /// New photo for a tile. Any staged preview for that tile is dropped.
    pub fn set_tile_image(&mut self, index: usize, image: Option<ImageHandle>) -> bool {
        let changed = self.commit(|doc| (index < doc.grid_items.len()).then(|| doc.with_tile_image(index, image)));
        if changed && self.pending_tile_image.as_ref().is_some_and(|p| p.index == index) {
            self.pending_tile_image = None;
        }
        changed
    }

    pub fn set_logo(&mut self, logo: Option<ImageHandle>) -> bool {
        self.edit(|doc| doc.with_logo(logo))
    }

    /// A new CTA image starts centred at its natural size.
    pub fn set_cta_background(&mut self, image: Option<ImageHandle>) -> bool {
        self.edit(|doc| doc.with_cta_background(image))
    }

    pub fn remove_header_background(&mut self) -> bool {
        self.edit(PostConfig::without_header_background)
    }

    /// Back to the built-in default document, as one undoable edit.
    pub fn reset_to_default(&mut self) -> bool {
        let done = self.edit(|_| PostConfig::default());
        if done {
            log_info!("Document reset to defaults");
        }
        done
    }

    /// Replace the whole document (loading a project or a backup).
    pub fn load_document(&mut self, doc: PostConfig) -> bool {
        self.edit(|_| doc)
    }

    // ------------------------------------------------------------------
    // Staged images
    // ------------------------------------------------------------------

    /// Stage an uploaded or generated header image for review.
    pub fn stage_header(&mut self, image: ImageHandle) {
        self.pending_header = Some(image);
    }

    pub fn apply_pending_header(&mut self, also_cta: bool) -> bool {
        let Some(image) = self.pending_header.clone() else {
            return false;
        };
        let applied = self.edit(|doc| doc.with_header_background(image, also_cta));
        if applied {
            self.pending_header = None;
        }
        applied
    }

    pub fn discard_pending_header(&mut self) -> bool {
        self.pending_header.take().is_some()
    }

    /// Commit the staged tile preview. Only the photo changes; placement is
    /// kept.
    pub fn apply_tile_preview(&mut self) -> bool {
        let Some(pending) = self.pending_tile_image.clone() else {
            return false;
        };
        let applied = self.commit(|doc| {
            (pending.index < doc.grid_items.len())
                .then(|| doc.with_item(pending.index, |item| item.image = Some(pending.image.clone())))
        });
        if applied {
            self.pending_tile_image = None;
        }
        applied
    }

    pub fn discard_tile_preview(&mut self) -> bool {
        self.pending_tile_image.take().is_some()
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    /// Feed one pointer or wheel event. Returns whether the event was
    /// consumed (by a drag, a pan, or a zoom).
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { pointer_id, pos, hit } => match hit {
                HitTarget::Element(target) => {
                    if self.is_read_only() {
                        return false;
                    }
                    self.drag.press(target, pointer_id, pos)
                }
                HitTarget::Canvas => self.viewport.begin_pan(pointer_id, pos),
                HitTarget::ScrollPanel => false,
            },
            InputEvent::PointerMove { pointer_id, pos } => {
                if let Some(step) = self.drag.drag_to(pointer_id, pos, self.viewport.scale) {
                    let mode = if self.settings.coalesce_drag_history && !step.first {
                        CommitMode::Amend
                    } else {
                        CommitMode::Push
                    };
                    self.commit_with(mode, |doc| {
                        interaction::apply_change(doc, step.target, TransformChange::Translate(step.delta))
                    });
                    true
                } else {
                    self.viewport.pan_move(pointer_id, pos)
                }
            }
            InputEvent::PointerUp { pointer_id } | InputEvent::PointerLeave { pointer_id } => {
                let released = self.drag.release(pointer_id).is_some();
                let was_panning = self.viewport.is_panning();
                self.viewport.end_pan(pointer_id);
                released || (was_panning && !self.viewport.is_panning())
            }
            InputEvent::Wheel { delta_y, hit, modifiers } => match hit {
                // Element wheels never reach the viewport, even when refused.
                HitTarget::Element(target) => {
                    if let Some(change) = interaction::wheel_change(target, delta_y, modifiers) {
                        self.commit(|doc| interaction::apply_change(doc, target, change));
                    }
                    true
                }
                HitTarget::Canvas => self.viewport.wheel(delta_y, modifiers),
                HitTarget::ScrollPanel => false,
            },
        }
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    /// The host's canvas panel changed size. Refits.
    pub fn set_container_size(&mut self, size: Vec2) {
        self.container = size;
        self.fit_to_screen();
    }

    pub fn fit_to_screen(&mut self) {
        let (w, h) = self.document().dimensions();
        self.viewport
            .fit_to_screen(self.container, Vec2::new(w as f32, h as f32), self.settings.fit_options());
    }

    // ------------------------------------------------------------------
    // Proposal overlay
    // ------------------------------------------------------------------

    pub fn apply_proposal(&mut self) -> bool {
        let rows_before = self.document().grid_rows;
        if !self.proposal.apply(&mut self.history) {
            return false;
        }
        log_info!("Design proposal applied");
        self.after_change(rows_before);
        true
    }

    pub fn discard_proposal(&mut self) -> bool {
        let rows_before = self.document().grid_rows;
        if !self.proposal.discard() {
            return false;
        }
        log_info!("Design proposal discarded");
        // The committed document may have changed since the last save.
        self.after_change(rows_before);
        true
    }

    fn begin_proposal(&mut self, candidate: PostConfig) {
        let rows_before = self.document().grid_rows;
        self.proposal.begin(candidate);
        self.autosave.cancel();
        self.drag.cancel();
        if self.document().grid_rows != rows_before {
            self.fit_to_screen();
        }
        log_info!("Design proposal ready for preview");
    }

    /// Save the candidate as a named project. The preview stays open and the
    /// history is not touched.
    pub fn save_proposal_as_project(&mut self, name: &str) -> Result<Uuid, StoreError> {
        let Some(candidate) = self.proposal.candidate() else {
            return Err(StoreError::InvalidFormat("no proposal to save".into()));
        };
        let candidate = candidate.clone();
        self.save_named(name, &candidate)
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    fn save_named(&mut self, name: &str, doc: &PostConfig) -> Result<Uuid, StoreError> {
        match self.store.save_named_project(name, doc) {
            Ok(id) => {
                log_info!("Saved project '{}' ({})", name, id);
                self.notify(NoticeLevel::Info, "Project saved");
                Ok(id)
            }
            Err(e) => {
                log_err!("Saving project '{}' failed: {}", name, e);
                self.notify(NoticeLevel::Error, format!("Could not save the project: {}", e));
                Err(e)
            }
        }
    }

    /// Save the committed document under `name`.
    pub fn save_project(&mut self, name: &str) -> Result<Uuid, StoreError> {
        let doc = self.history.snapshot();
        self.save_named(name, &doc)
    }

    /// Save a restore point named after the current time.
    pub fn checkpoint(&mut self) -> Result<Uuid, StoreError> {
        let name = format!("RESTORE_POINT_{}", logger::clock_time());
        self.save_project(&name)
    }

    pub fn list_projects(&mut self) -> Vec<SavedProject> {
        match self.store.list_projects() {
            Ok(projects) => projects,
            Err(e) => {
                log_err!("Listing projects failed: {}", e);
                self.notify(NoticeLevel::Error, format!("Could not read saved projects: {}", e));
                Vec::new()
            }
        }
    }

    /// Load a saved project as an undoable edit.
    pub fn open_project(&mut self, id: Uuid) -> Result<bool, StoreError> {
        match self.store.load_project(id) {
            Ok(project) => {
                log_info!("Opening project '{}'", project.name);
                Ok(self.load_document(project.config))
            }
            Err(e) => {
                log_err!("Opening project {} failed: {}", id, e);
                self.notify(NoticeLevel::Error, format!("Could not open the project: {}", e));
                Err(e)
            }
        }
    }

    pub fn delete_project(&mut self, id: Uuid) -> Result<(), StoreError> {
        match self.store.delete_project(id) {
            Ok(()) => {
                log_info!("Deleted project {}", id);
                Ok(())
            }
            Err(e) => {
                log_err!("Deleting project {} failed: {}", id, e);
                self.notify(NoticeLevel::Error, format!("Could not delete the project: {}", e));
                Err(e)
            }
        }
    }

    /// Restore a JSON backup. A file that fails to parse or validate never
    /// reaches the history.
    pub fn import_backup(&mut self, bytes: &[u8]) -> Result<bool, StoreError> {
        match io::import_from_bytes(bytes) {
            Ok(doc) => {
                log_info!("Backup imported");
                Ok(self.load_document(doc))
            }
            Err(e) => {
                log_warn!("Backup rejected: {}", e);
                self.notify(NoticeLevel::Error, format!("The file is not a valid backup: {}", e));
                Err(e)
            }
        }
    }

    /// JSON backup of the committed document.
    pub fn export_backup(&self) -> Result<String, StoreError> {
        io::export_to_json(self.history.present())
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Rasterize and encode what is on screen. Runs to completion on the
    /// caller's thread; a second call while one is running is refused.
    pub fn export(
        &mut self,
        format: ExportFormat,
        rasterizer: &dyn Rasterizer,
        pages: Option<&dyn PageWriter>,
        content_height: Option<u32>,
    ) -> Result<Vec<u8>, ExportError> {
        let Some(_guard) = self.busy.flag(JobKind::Export).try_acquire() else {
            return Err(ExportError::Busy);
        };
        let ratio = match format {
            ExportFormat::Png => self.settings.png_pixel_ratio,
            ExportFormat::Pdf => self.settings.pdf_pixel_ratio,
        };
        let request = RasterRequest::for_document(self.document(), content_height, ratio);
        match export::render(self.document(), format, request, rasterizer, pages) {
            Ok(bytes) => {
                log_info!(
                    "Exported {} {}x{} @{} ({} bytes)",
                    format.extension(),
                    request.width,
                    request.height,
                    ratio,
                    bytes.len()
                );
                Ok(bytes)
            }
            Err(e) => {
                log_err!("Export failed: {}", e);
                self.notify(NoticeLevel::Error, format!("Export failed: {}", e));
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // AI requests
    // ------------------------------------------------------------------

    fn spawn_job<W, P>(&mut self, kind: JobKind, work: W, on_panic: P) -> bool
    where
        W: FnOnce() -> JobMessage + Send + 'static,
        P: FnOnce(String) -> JobMessage + Send + 'static,
    {
        let Some(guard) = self.busy.flag(kind).try_acquire() else {
            log_info!("{} already running, request ignored", kind.name());
            return false;
        };
        log_info!("Starting {}", kind.name());
        self.in_flight += 1;
        self.pool.spawn(kind, guard, self.job_tx.clone(), work, on_panic);
        true
    }

    fn selected_image(&mut self) -> Option<(usize, ImageHandle)> {
        let doc = self.history.present();
        let index = doc.selected_grid_index;
        match doc.grid_items.get(index).and_then(|item| item.image.clone()) {
            Some(image) => Some((index, image)),
            None => {
                self.notify(NoticeLevel::Warning, AiError::MissingImage.to_string());
                None
            }
        }
    }

    /// Read name and price off the selected tile's photo and swap in an
    /// enhanced copy. The result lands on the tile that was selected when
    /// the request was made.
    pub fn magic_fill(&mut self) -> bool {
        if self.is_read_only() || self.busy.is_busy(JobKind::MagicFill) {
            return false;
        }
        let Some((index, image)) = self.selected_image() else {
            return false;
        };
        let adapter = Arc::clone(&self.ai);
        self.spawn_job(
            JobKind::MagicFill,
            move || {
                let (fields, enhanced) = rayon::join(
                    || pollster::block_on(adapter.analyze_product(image.clone())),
                    || pollster::block_on(adapter.enhance_image(image.clone())),
                );
                let result = fields.and_then(|fields| enhanced.map(|image| MagicFill { fields, image }));
                JobMessage::MagicFill { index, result }
            },
            move |msg| JobMessage::MagicFill { index, result: Err(AiError::Panicked(msg)) },
        )
    }

    /// Stage an enhanced or background-removed copy of the selected photo.
    pub fn run_image_tool(&mut self, tool: ImageTool) -> bool {
        if self.is_read_only() || self.busy.is_busy(JobKind::ImageTool) {
            return false;
        }
        let Some((index, image)) = self.selected_image() else {
            return false;
        };
        let adapter = Arc::clone(&self.ai);
        self.spawn_job(
            JobKind::ImageTool,
            move || {
                let result = pollster::block_on(match tool {
                    ImageTool::Enhance => adapter.enhance_image(image),
                    ImageTool::RemoveBackground => adapter.remove_background(image),
                });
                JobMessage::ImageTool { index, tool, result }
            },
            move |msg| JobMessage::ImageTool { index, tool, result: Err(AiError::Panicked(msg)) },
        )
    }

    pub fn suggest_tagline(&mut self) -> bool {
        if self.is_read_only() {
            return false;
        }
        let brand = self.history.present().brand_name.clone();
        let adapter = Arc::clone(&self.ai);
        self.spawn_job(
            JobKind::Tagline,
            move || JobMessage::Tagline(pollster::block_on(adapter.generate_tagline(brand))),
            |msg| JobMessage::Tagline(Err(AiError::Panicked(msg))),
        )
    }

    /// Ask for a full design. On success the result is previewed, not
    /// committed.
    pub fn generate_design(&mut self, prompt: &str) -> bool {
        let prompt = prompt.trim();
        if self.is_read_only() || prompt.is_empty() {
            return false;
        }
        let prompt = prompt.to_string();
        let adapter = Arc::clone(&self.ai);
        self.spawn_job(
            JobKind::Design,
            move || {
                let result = pollster::block_on(adapter.generate_design(prompt)).map(|spec| {
                    let header =
                        pollster::block_on(adapter.generate_header_background(spec.header_prompt.clone()));
                    DesignResult { spec, header }
                });
                JobMessage::Design(result)
            },
            |msg| JobMessage::Design(Err(AiError::Panicked(msg))),
        )
    }

    /// Generate a header image; it is staged, not applied.
    pub fn generate_header(&mut self, theme: &str) -> bool {
        if self.is_read_only() {
            return false;
        }
        let theme = theme.to_string();
        let adapter = Arc::clone(&self.ai);
        self.spawn_job(
            JobKind::Header,
            move || JobMessage::Header(pollster::block_on(adapter.generate_header_background(theme))),
            |msg| JobMessage::Header(Err(AiError::Panicked(msg))),
        )
    }

    /// Generate a styled header background. A blank prompt asks for a
    /// generic offers backdrop. The image is staged like any other header.
    pub fn generate_background(&mut self, prompt: &str, style: BackgroundStyle) -> bool {
        if self.is_read_only() {
            return false;
        }
        let prompt = match prompt.trim() {
            "" => ai::DEFAULT_BACKGROUND_PROMPT.to_string(),
            text => text.to_string(),
        };
        let adapter = Arc::clone(&self.ai);
        self.spawn_job(
            JobKind::Header,
            move || {
                let result = pollster::block_on(adapter.generate_background(prompt, style, AspectRatio::Wide));
                JobMessage::Header(result)
            },
            |msg| JobMessage::Header(Err(AiError::Panicked(msg))),
        )
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Merge every finished job. Call once per frame.
    pub fn poll_jobs(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(done) = self.job_rx.try_recv() {
            self.finish_job(done);
            handled += 1;
        }
        handled
    }

    /// Block until nothing is in flight or `timeout` passes. Returns true
    /// if everything finished.
    pub fn wait_for_jobs(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.job_rx.recv_timeout(deadline - now) {
                Ok(done) => self.finish_job(done),
                Err(_) => return false,
            }
        }
        true
    }

    /// Autosave. Fires once the document has been quiet for the configured
    /// delay, never while a proposal is shown.
    pub fn tick(&mut self, now: Instant) {
        if self.is_read_only() || !self.autosave.take_due(now) {
            return;
        }
        let Some(guard) = self.busy.flag(JobKind::Autosave).try_acquire() else {
            // Previous write still running; try again after another delay.
            self.autosave.schedule(now);
            return;
        };
        let snapshot = self.history.snapshot();
        let store = Arc::clone(&self.store);
        self.in_flight += 1;
        self.pool.spawn(
            JobKind::Autosave,
            guard,
            self.job_tx.clone(),
            move || JobMessage::DraftSaved(store.save_draft(&snapshot)),
            |msg| JobMessage::DraftSaved(Err(StoreError::InvalidFormat(format!("autosave crashed: {}", msg)))),
        );
    }

    fn finish_job(&mut self, done: Completed<JobMessage>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let kind = done.kind;
        match done.message {
            JobMessage::MagicFill { index, result } => match result {
                Ok(fill) => {
                    if self.is_read_only() {
                        self.result_dropped(kind);
                    } else if self.commit(|doc| {
                        (index < doc.grid_items.len()).then(|| ai::merge_magic_fill(doc, index, &fill))
                    }) {
                        log_info!("Magic fill applied to tile {}", index);
                    } else {
                        self.result_stale(kind, index);
                    }
                }
                Err(e) => self.job_failed(kind, &e),
            },
            JobMessage::ImageTool { index, tool, result } => match result {
                Ok(image) => {
                    log_info!("{} preview ready for tile {}", tool.label(), index);
                    self.pending_tile_image = Some(PendingTileImage { index, tool, image });
                }
                Err(e) => self.job_failed(kind, &e),
            },
            JobMessage::Design(result) => match result {
                Ok(DesignResult { spec, header }) => {
                    let header = match header {
                        Ok(image) => Some(image),
                        Err(e) => {
                            log_warn!("Header generation failed, proposal has no header: {}", e);
                            self.notify(NoticeLevel::Warning, "The design was created without a header image");
                            None
                        }
                    };
                    let candidate = ai::build_proposal(self.history.present(), &spec, header.as_ref());
                    self.begin_proposal(candidate);
                }
                Err(e) => self.job_failed(kind, &e),
            },
            JobMessage::Tagline(result) => match result {
                Ok(text) => {
                    if !self.commit(|doc| Some(ai::merge_tagline(doc, &text))) {
                        self.result_dropped(kind);
                    }
                }
                Err(e) => self.job_failed(kind, &e),
            },
            JobMessage::Header(result) => match result {
                Ok(image) => {
                    log_info!("Header background ready for review");
                    self.pending_header = Some(image);
                }
                Err(e) => self.job_failed(kind, &e),
            },
            JobMessage::DraftSaved(result) => match result {
                Ok(timestamp) => {
                    log_info!("Draft saved");
                    self.last_saved = Some(timestamp);
                }
                Err(e) => {
                    log_err!("Autosave failed: {}", e);
                    self.notify(NoticeLevel::Error, format!("Autosave failed: {}", e));
                }
            },
        }
    }

    fn job_failed(&mut self, kind: JobKind, error: &AiError) {
        log_err!("{} failed: {}", kind.name(), error);
        self.notify(NoticeLevel::Error, format!("The {} request failed: {}", kind.name(), error));
    }

    fn result_stale(&mut self, kind: JobKind, index: usize) {
        log_warn!("{} result dropped: tile {} no longer exists", kind.name(), index);
        self.notify(
            NoticeLevel::Warning,
            format!("The {} result was not applied: tile {} no longer exists", kind.name(), index + 1),
        );
    }

    fn result_dropped(&mut self, kind: JobKind) {
        log_warn!("{} result dropped: document is read-only", kind.name());
        self.notify(
            NoticeLevel::Warning,
            format!("The {} result was not applied while a proposal is shown", kind.name()),
        );
    }
}
