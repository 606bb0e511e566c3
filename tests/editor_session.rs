use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use egui::{Modifiers, Pos2};
use flyerfe::components::interaction::DragTarget;
use flyerfe::document::{LayoutType, Palette, PostConfig};
use flyerfe::editor::{Editor, HitTarget, InputEvent, NoticeLevel};
use flyerfe::image_handle::ImageHandle;
use flyerfe::io::{self, MemoryStore, Persistence};
use flyerfe::ops::ai::{AiAdapter, AiError, AiFuture, AspectRatio, BackgroundStyle, DesignSpec, ImageTool, ProductFields};
use flyerfe::ops::jobs::JobKind;
use flyerfe::settings::EditorSettings;

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Scripted adapter
// ============================================================================

type BackgroundRequest = (String, BackgroundStyle, AspectRatio);

/// Answers every request from canned data. Tagline requests can be held
/// until the test releases them, to observe in-flight state.
struct ScriptedAi {
    fields: ProductFields,
    design: DesignSpec,
    header: Result<ImageHandle, AiError>,
    tagline_gate: Option<Arc<Mutex<Receiver<()>>>>,
    backgrounds: Arc<Mutex<Vec<BackgroundRequest>>>,
}

impl ScriptedAi {
    fn new() -> Self {
        Self {
            fields: ProductFields {
                product_name: "Ovo Trufado".into(),
                price: "R$ 49,90".into(),
                ..ProductFields::default()
            },
            design: DesignSpec {
                layout: LayoutType::Pastel,
                colors: Palette {
                    primary: "#6D28D9".into(),
                    secondary: "#FDF4FF".into(),
                    accent: "#F472B6".into(),
                    background: "#FFFFFF".into(),
                    tagline: "#FDE68A".into(),
                    brand: "#4C1D95".into(),
                },
                tagline_text: "PÁSCOA DOCE".into(),
                cta: "GARANTA O SEU".into(),
                background_prompt: String::new(),
                header_prompt: "easter eggs".into(),
            },
            header: Ok(image("HEADER")),
            tagline_gate: None,
            backgrounds: Arc::default(),
        }
    }

    fn gated(mut self) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.tagline_gate = Some(Arc::new(Mutex::new(rx)));
        (self, tx)
    }

    fn reply<T: Send + 'static>(&self, value: Result<T, AiError>) -> AiFuture<T> {
        Box::pin(std::future::ready(value))
    }
}

impl AiAdapter for ScriptedAi {
    fn analyze_product(&self, _image: ImageHandle) -> AiFuture<ProductFields> {
        self.reply(Ok(self.fields.clone()))
    }
    fn enhance_image(&self, _image: ImageHandle) -> AiFuture<ImageHandle> {
        self.reply(Ok(image("ENHANCED")))
    }
    fn remove_background(&self, _image: ImageHandle) -> AiFuture<ImageHandle> {
        self.reply(Ok(image("CUTOUT")))
    }
    fn generate_design(&self, _prompt: String) -> AiFuture<DesignSpec> {
        self.reply(Ok(self.design.clone()))
    }
    fn generate_background(&self, prompt: String, style: BackgroundStyle, aspect: AspectRatio) -> AiFuture<ImageHandle> {
        self.backgrounds.lock().unwrap().push((prompt, style, aspect));
        self.reply(self.header.clone())
    }
    fn generate_tagline(&self, brand_name: String) -> AiFuture<String> {
        let gate = self.tagline_gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.lock().unwrap().recv();
            }
            Ok(format!("{} NA PÁSCOA", brand_name))
        })
    }
}

fn image(tag: &str) -> ImageHandle {
    ImageHandle::from_data_url(format!("data:image/png;base64,{}", tag))
}

fn session_with(ai: ScriptedAi, store: Arc<MemoryStore>) -> Editor {
    Editor::new(EditorSettings::default(), store, Arc::new(ai))
}

fn session() -> (Editor, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (session_with(ScriptedAi::new(), Arc::clone(&store)), store)
}

/// Run a design request to completion so the editor is previewing.
fn preview(editor: &mut Editor) {
    assert!(editor.generate_design("páscoa"));
    assert!(editor.wait_for_jobs(WAIT));
    assert!(editor.is_previewing());
}

// ============================================================================
// History
// ============================================================================

#[test]
fn brand_edit_undo_redo() {
    let (mut editor, _) = session();
    assert_eq!(editor.document().brand_name, "CHOC-LAR");
    assert!(!editor.can_undo());

    assert!(editor.set_brand_name("TESTCO"));
    assert_eq!(editor.document().brand_name, "TESTCO");
    assert!(editor.can_undo());
    assert!(!editor.can_redo());

    assert!(editor.undo());
    assert_eq!(editor.document().brand_name, "CHOC-LAR");
    assert!(editor.can_redo());

    assert!(editor.redo());
    assert_eq!(editor.document().brand_name, "TESTCO");
    assert!(!editor.redo());
}

#[test]
fn new_edit_after_undo_drops_redo() {
    let (mut editor, _) = session();
    editor.set_cta("A");
    editor.set_cta("B");
    editor.undo();
    editor.set_cta("C");
    assert!(!editor.can_redo());
    assert!(editor.undo());
    assert_eq!(editor.document().cta, "A");
}

#[test]
fn reset_is_undoable() {
    let (mut editor, _) = session();
    editor.set_tagline_text("QUEIMA TOTAL");
    assert!(editor.reset_to_default());
    assert_eq!(editor.document(), &PostConfig::default());
    editor.undo();
    assert_eq!(editor.document().tagline_text, "QUEIMA TOTAL");
}

#[test]
fn palette_edit_drives_text_colours() {
    let (mut editor, _) = session();
    editor.set_palette_color(flyerfe::document::PaletteSlot::Brand, "#123456");
    assert_eq!(editor.document().colors.brand, "#123456");
    assert_eq!(editor.document().brand_color, "#123456");
    assert_eq!(editor.history().undo_count(), 1);
}

// ============================================================================
// Dimensions and viewport
// ============================================================================

#[test]
fn height_tracks_grid_rows_and_refits() {
    let (mut editor, _) = session();
    editor.set_container_size(egui::Vec2::new(1280.0, 2000.0));
    // 400 + 3*600 + 2*20 + 200
    assert_eq!(editor.document().dimensions(), (1080, 2440));
    let scale_at_three = editor.viewport().scale;

    editor.set_grid_size(5, 3);
    assert_eq!(editor.document().dimensions(), (1080, 3680));
    assert!(editor.viewport().scale < scale_at_three);
    assert_eq!(editor.document().grid_items.len(), 15);
}

#[test]
fn shrinking_the_grid_clamps_selection() {
    let (mut editor, _) = session();
    editor.select_tile(8);
    editor.set_grid_size(2, 2);
    assert_eq!(editor.document().selected_grid_index, 3);
    editor.select_next_tile();
    assert_eq!(editor.document().selected_grid_index, 3);
}

// ============================================================================
// Gestures
// ============================================================================

#[test]
fn wheel_scale_is_clamped() {
    let (mut editor, _) = session();
    let over_logo = HitTarget::Element(DragTarget::Logo);
    editor.handle_input(InputEvent::Wheel { delta_y: -100_000.0, hit: over_logo, modifiers: Modifiers::NONE });
    assert_eq!(editor.document().logo_transform.scale, 2.0);
    editor.handle_input(InputEvent::Wheel { delta_y: 100_000.0, hit: over_logo, modifiers: Modifiers::NONE });
    assert_eq!(editor.document().logo_transform.scale, 0.05);

    let over_tile = HitTarget::Element(DragTarget::Tile(0));
    editor.handle_input(InputEvent::Wheel { delta_y: -100_000.0, hit: over_tile, modifiers: Modifiers::NONE });
    assert_eq!(editor.document().grid_items[0].image_transform.scale, 5.0);
}

#[test]
fn shift_wheel_rotates_logo_but_not_tiles() {
    let (mut editor, _) = session();
    let shift = Modifiers { shift: true, ..Modifiers::NONE };
    editor.handle_input(InputEvent::Wheel { delta_y: 3.0, hit: HitTarget::Element(DragTarget::Logo), modifiers: shift });
    assert_eq!(editor.document().logo_transform.rotation, 5.0);
    editor.handle_input(InputEvent::Wheel { delta_y: 0.0, hit: HitTarget::Element(DragTarget::Logo), modifiers: shift });
    assert_eq!(editor.history().undo_count(), 1);

    // Tiles cannot rotate, so shift-wheel scales them instead.
    editor.handle_input(InputEvent::Wheel {
        delta_y: -100.0,
        hit: HitTarget::Element(DragTarget::Tile(2)),
        modifiers: shift,
    });
    assert!((editor.document().grid_items[2].image_transform.scale - 1.1).abs() < 1e-5);
}

// ============================================================================
// Proposal overlay
// ============================================================================

#[test]
fn proposal_is_read_only() {
    let (mut editor, _) = session();
    preview(&mut editor);
    let shown = editor.document().clone();
    assert_eq!(shown.layout, LayoutType::Pastel);
    assert_eq!(shown.tagline_color, "#6D28D9");
    assert_eq!(shown.tagline_bg_color, "#FDF4FF");
    assert_eq!(shown.header_background, Some(image("HEADER")));

    assert!(!editor.set_brand_name("NOPE"));
    editor.handle_input(InputEvent::PointerDown {
        pointer_id: 1,
        pos: Pos2::ZERO,
        hit: HitTarget::Element(DragTarget::Brand),
    });
    editor.handle_input(InputEvent::PointerMove { pointer_id: 1, pos: Pos2::new(50.0, 50.0) });
    editor.handle_input(InputEvent::PointerUp { pointer_id: 1 });
    editor.handle_input(InputEvent::Wheel {
        delta_y: -500.0,
        hit: HitTarget::Element(DragTarget::Logo),
        modifiers: Modifiers::NONE,
    });
    assert!(!editor.undo());
    assert!(!editor.magic_fill());

    assert_eq!(editor.document(), &shown);
    assert_eq!(editor.history().undo_count(), 0);
}

#[test]
fn apply_is_one_entry() {
    let (mut editor, _) = session();
    editor.set_brand_name("TESTCO");
    preview(&mut editor);
    assert!(editor.apply_proposal());
    assert!(!editor.is_previewing());
    assert_eq!(editor.history().undo_count(), 2);
    assert_eq!(editor.document().layout, LayoutType::Pastel);
    // Built on top of the edit made before the request.
    assert_eq!(editor.document().brand_name, "TESTCO");

    editor.undo();
    assert_eq!(editor.document().layout, LayoutType::Minimal);
    assert_eq!(editor.document().brand_name, "TESTCO");
}

#[test]
fn discard_leaves_history_alone() {
    let (mut editor, _) = session();
    editor.set_cta("COMPRE");
    let before = editor.committed().clone();
    preview(&mut editor);
    assert!(editor.discard_proposal());
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.history().undo_count(), 1);
    assert!(!editor.discard_proposal());
}

#[test]
fn header_failure_still_yields_proposal() {
    let store = Arc::new(MemoryStore::new());
    let ai = ScriptedAi { header: Err(AiError::Service("quota".into())), ..ScriptedAi::new() };
    let mut editor = session_with(ai, store);
    preview(&mut editor);
    assert!(editor.document().header_background.is_none());
    assert_eq!(editor.document().cta, "GARANTA O SEU");
    assert!(editor.notices().iter().any(|n| n.level == NoticeLevel::Warning));
}

#[test]
fn proposal_can_be_saved_without_applying() {
    let (mut editor, store) = session();
    preview(&mut editor);
    let id = editor.save_proposal_as_project("Páscoa").unwrap();
    assert!(editor.is_previewing());
    assert_eq!(editor.history().undo_count(), 0);
    let saved = store.load_project(id).unwrap();
    assert_eq!(saved.config.layout, LayoutType::Pastel);
}

// ============================================================================
// AI jobs
// ============================================================================

#[test]
fn magic_fill_targets_requested_tile() {
    let (mut editor, _) = session();
    editor.select_tile(2);
    editor.set_tile_image(2, Some(image("RAW")));
    assert!(editor.magic_fill());
    // Selection moves on while the request runs.
    editor.select_tile(5);
    assert!(editor.wait_for_jobs(WAIT));

    let item = &editor.document().grid_items[2];
    assert_eq!(item.product_name, "Ovo Trufado");
    assert_eq!(item.price, "R$ 49,90");
    assert_eq!(item.image, Some(image("ENHANCED")));
    assert_eq!(editor.document().grid_items[5].product_name, "Produto");
}

#[test]
fn busy_request_is_a_noop() {
    let (ai, release) = ScriptedAi::new().gated();
    let mut editor = session_with(ai, Arc::new(MemoryStore::new()));
    assert!(editor.suggest_tagline());
    assert!(editor.is_busy(JobKind::Tagline));
    assert!(!editor.suggest_tagline());
    assert_eq!(editor.jobs_in_flight(), 1);

    release.send(()).unwrap();
    assert!(editor.wait_for_jobs(WAIT));
    assert!(!editor.is_busy(JobKind::Tagline));
    assert_eq!(editor.document().tagline_text, "CHOC-LAR NA PÁSCOA");
    assert_eq!(editor.history().undo_count(), 1);
}

#[test]
fn styled_background_is_staged_as_header() {
    let ai = ScriptedAi::new();
    let requests = Arc::clone(&ai.backgrounds);
    let mut editor = session_with(ai, Arc::new(MemoryStore::new()));

    assert!(editor.generate_background("   ", BackgroundStyle::Gold));
    assert!(editor.is_busy(JobKind::Header));
    assert!(!editor.generate_header("natal"));
    assert!(editor.wait_for_jobs(WAIT));
    assert!(!editor.is_busy(JobKind::Header));

    assert_eq!(editor.pending_header(), Some(&image("HEADER")));
    assert_eq!(editor.history().undo_count(), 0);
    assert!(editor.generate_background("Páscoa", BackgroundStyle::ThreeD));
    assert!(editor.wait_for_jobs(WAIT));

    let requests = requests.lock().unwrap();
    assert_eq!(
        *requests,
        vec![
            ("Fundo para ofertas".to_string(), BackgroundStyle::Gold, AspectRatio::Wide),
            ("Páscoa".to_string(), BackgroundStyle::ThreeD, AspectRatio::Wide),
        ]
    );
    drop(requests);

    assert!(editor.apply_pending_header(false));
    assert_eq!(editor.document().header_background, Some(image("HEADER")));
}

#[test]
fn jobs_of_different_kinds_run_together() {
    let (ai, release) = ScriptedAi::new().gated();
    let mut editor = session_with(ai, Arc::new(MemoryStore::new()));
    assert!(editor.suggest_tagline());
    editor.set_tile_image(0, Some(image("RAW")));
    assert!(editor.magic_fill());
    assert!(editor.generate_header(""));

    // The parked tagline holds one worker; the others still finish.
    let deadline = Instant::now() + WAIT;
    while editor.jobs_in_flight() > 1 && Instant::now() < deadline {
        editor.poll_jobs();
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(editor.jobs_in_flight(), 1);
    assert!(editor.is_busy(JobKind::Tagline));
    assert_eq!(editor.document().grid_items[0].product_name, "Ovo Trufado");

    release.send(()).unwrap();
    assert!(editor.wait_for_jobs(WAIT));
}

#[test]
fn tile_preview_applies_image_only() {
    let (mut editor, _) = session();
    editor.set_tile_image(0, Some(image("RAW")));
    editor.handle_input(InputEvent::Wheel {
        delta_y: -200.0,
        hit: HitTarget::Element(DragTarget::Tile(0)),
        modifiers: Modifiers::NONE,
    });
    let placed = editor.document().grid_items[0].image_transform;

    assert!(editor.run_image_tool(ImageTool::RemoveBackground));
    assert!(editor.wait_for_jobs(WAIT));
    let pending = editor.pending_tile_image().unwrap();
    assert_eq!(pending.index, 0);
    assert_eq!(pending.image, image("CUTOUT"));
    let entries = editor.history().undo_count();

    assert!(editor.apply_tile_preview());
    assert_eq!(editor.history().undo_count(), entries + 1);
    assert_eq!(editor.document().grid_items[0].image, Some(image("CUTOUT")));
    assert_eq!(editor.document().grid_items[0].image_transform, placed);
    assert!(editor.pending_tile_image().is_none());
}

#[test]
fn job_result_during_preview_is_dropped() {
    let (ai, release) = ScriptedAi::new().gated();
    let mut editor = session_with(ai, Arc::new(MemoryStore::new()));
    assert!(editor.suggest_tagline());
    assert!(editor.generate_design("páscoa"));

    let deadline = Instant::now() + WAIT;
    while !editor.is_previewing() && Instant::now() < deadline {
        editor.poll_jobs();
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(editor.is_previewing());

    release.send(()).unwrap();
    assert!(editor.wait_for_jobs(WAIT));
    assert_eq!(editor.document().tagline_text, "PÁSCOA DOCE");
    assert_eq!(editor.history().undo_count(), 0);
    assert!(editor.notices().iter().any(|n| n.level == NoticeLevel::Warning));

    editor.discard_proposal();
    assert_eq!(editor.document().tagline_text, "FESTIVAL DE OFERTAS");
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn autosave_writes_draft_after_quiet_period() {
    let store = Arc::new(MemoryStore::new());
    let settings = EditorSettings { autosave_delay_ms: 0, ..EditorSettings::default() };
    let mut editor = Editor::new(settings, Arc::clone(&store) as Arc<dyn Persistence>, Arc::new(ScriptedAi::new()));
    assert!(!editor.autosave_pending());

    editor.set_brand_name("TESTCO");
    assert!(editor.autosave_pending());
    editor.tick(Instant::now());
    assert!(editor.wait_for_jobs(WAIT));

    let draft = store.get_draft().unwrap().unwrap();
    assert_eq!(draft.config.brand_name, "TESTCO");
    assert_eq!(editor.last_saved(), Some(draft.timestamp));
}

#[test]
fn autosave_skipped_while_previewing() {
    let store = Arc::new(MemoryStore::new());
    let settings = EditorSettings { autosave_delay_ms: 0, ..EditorSettings::default() };
    let mut editor = Editor::new(settings, Arc::clone(&store) as Arc<dyn Persistence>, Arc::new(ScriptedAi::new()));
    editor.set_brand_name("TESTCO");
    preview(&mut editor);
    editor.tick(Instant::now() + Duration::from_secs(60));
    assert_eq!(editor.jobs_in_flight(), 0);
    assert!(store.get_draft().unwrap().is_none());

    // Leaving the preview re-arms the save.
    editor.discard_proposal();
    editor.tick(Instant::now() + Duration::from_secs(60));
    assert!(editor.wait_for_jobs(WAIT));
    assert_eq!(store.get_draft().unwrap().unwrap().config.brand_name, "TESTCO");
}

#[test]
fn hydration_is_not_an_edit() {
    let saved = PostConfig { brand_name: "DRAFTCO".into(), ..PostConfig::default() };
    let store = Arc::new(MemoryStore::with_draft(saved, 1_700_000_000_000));
    let editor = session_with(ScriptedAi::new(), store);
    assert_eq!(editor.document().brand_name, "DRAFTCO");
    assert!(!editor.can_undo());
    assert!(!editor.autosave_pending());
    assert_eq!(editor.last_saved(), Some(1_700_000_000_000));
}

#[test]
fn invalid_draft_falls_back_to_default() {
    let broken = PostConfig { grid_rows: 0, ..PostConfig::default() };
    let store = Arc::new(MemoryStore::with_draft(broken, 1));
    let editor = session_with(ScriptedAi::new(), store);
    assert_eq!(editor.document(), &PostConfig::default());
    assert_eq!(editor.notices().len(), 1);
}

#[test]
fn corrupt_import_is_never_merged() {
    let (mut editor, _) = session();
    editor.set_brand_name("TESTCO");
    let before = editor.document().clone();

    assert!(editor.import_backup(b"{ not json").is_err());
    assert!(editor.import_backup(b"[]").is_err());
    assert!(editor.import_backup(br#"{"gridRows": 0}"#).is_err());
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.history().undo_count(), 1);
    assert_eq!(editor.notices().iter().filter(|n| n.level == NoticeLevel::Error).count(), 3);
}

#[test]
fn oversized_grid_import_is_rejected() {
    let (mut editor, _) = session();
    let before = editor.document().clone();
    let scale = editor.viewport().scale;

    assert!(editor.import_backup(br#"{"gridRows":10000000,"gridCols":1}"#).is_err());
    assert!(editor.import_backup(br#"{"gridRows":18446744073709551615,"gridCols":2}"#).is_err());
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.viewport().scale, scale);
    assert!(!editor.can_undo());
}

#[test]
fn backup_round_trip_is_one_edit() {
    let (mut source, _) = session();
    source.set_brand_name("BACKUPCO");
    source.set_grid_size(2, 2);
    let json = source.export_backup().unwrap();

    let (mut editor, _) = session();
    assert!(editor.import_backup(json.as_bytes()).unwrap());
    assert_eq!(editor.document().brand_name, "BACKUPCO");
    assert_eq!(editor.document().grid_rows, 2);
    assert_eq!(editor.history().undo_count(), 1);
    assert_eq!(io::import_from_bytes(json.as_bytes()).unwrap(), *editor.document());
}

#[test]
fn projects_save_open_delete() {
    let (mut editor, store) = session();
    editor.set_brand_name("FIRST");
    let first = editor.save_project("Primeiro").unwrap();
    let checkpoint = editor.checkpoint().unwrap();
    editor.set_brand_name("SECOND");

    let projects = editor.list_projects();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, checkpoint);
    assert!(projects[0].name.starts_with("RESTORE_POINT_"));

    assert!(editor.open_project(first).unwrap());
    assert_eq!(editor.document().brand_name, "FIRST");
    editor.undo();
    assert_eq!(editor.document().brand_name, "SECOND");

    editor.delete_project(first).unwrap();
    assert!(editor.delete_project(first).is_err());
    assert_eq!(store.list_projects().unwrap().len(), 1);
}
