// ============================================================================
// FlyerFE CLI — headless access to saved projects and JSON backups
// ============================================================================
//
// Usage examples:
//   flyerfe list
//   flyerfe info choclar_backup_1712345678901.json
//   flyerfe import "backups/*.json"
//   flyerfe export 6f1c...e2 -o pascoa.json
//   flyerfe set-image pascoa.json --tile 3 --image trufa.png
//   flyerfe config --set autosave_delay_ms=5000
//
// Everything runs synchronously on the current thread against the same
// store the editor uses.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::editor::Editor;
use crate::image_handle::ImageHandle;
use crate::io::{self, FileStore, MemoryStore, Persistence};
use crate::logger;
use crate::ops::ai::OfflineAdapter;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// FlyerFE headless project tool.
#[derive(Parser, Debug)]
#[command(
    name = "flyerfe",
    about = "FlyerFE headless project and backup tool",
    long_about = "Inspect, import and export flyer projects without opening the editor.\n\
                  Backups are the JSON files written by the editor's export button.\n\n\
                  Example:\n  \
                  flyerfe import \"backups/*.json\"\n  \
                  flyerfe export <ID> -o flyer.json"
)]
pub struct CliArgs {
    /// Directory holding the draft and saved projects. Defaults to the
    /// `data_dir` setting, then the platform data directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print per-file progress.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved projects, newest first.
    List,
    /// Summarise a JSON backup.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Import JSON backups as saved projects. Glob patterns accepted.
    Import {
        #[arg(required = true, num_args = 1.., value_name = "PATTERN")]
        inputs: Vec<String>,
    },
    /// Write a saved project as a JSON backup.
    Export {
        #[arg(value_name = "ID")]
        id: Uuid,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Delete a saved project.
    Delete {
        #[arg(value_name = "ID")]
        id: Uuid,
    },
    /// Put an image on one tile of a backup and write it back.
    SetImage {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Zero-based tile index.
        #[arg(long)]
        tile: usize,
        #[arg(long, value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Show the editor settings, or change them with --set.
    Config {
        #[arg(long = "set", value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one command and return an OS exit code.
/// `0` = everything succeeded, `1` = one or more items failed.
pub fn run(args: CliArgs, settings: EditorSettings) -> ExitCode {
    let data_dir = args.data_dir.clone().unwrap_or_else(|| settings.resolved_data_dir());
    let result = match args.command {
        Command::List => open_store(&data_dir).and_then(|store| list(&store)),
        Command::Info { file } => info(&file),
        Command::Import { inputs } => open_store(&data_dir).and_then(|store| import(&store, &inputs, args.verbose)),
        Command::Export { id, output } => open_store(&data_dir).and_then(|store| export(&store, id, output)),
        Command::Delete { id } => open_store(&data_dir).and_then(|store| delete(&store, id)),
        Command::SetImage { file, tile, image } => set_image(settings, &file, tile, &image),
        Command::Config { assignments } => config(&settings, &assignments),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            log_err!("CLI: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn open_store(dir: &Path) -> Result<FileStore, String> {
    FileStore::new(dir).map_err(|e| format!("cannot open project store at '{}': {}", dir.display(), e))
}

fn list(store: &dyn Persistence) -> Result<(), String> {
    let projects = store.list_projects().map_err(|e| e.to_string())?;
    if projects.is_empty() {
        println!("no saved projects");
        return Ok(());
    }
    for p in projects {
        println!("{}  {}  {}", p.id, logger::format_clock(p.last_modified / 1000), p.name);
    }
    Ok(())
}

fn info(file: &Path) -> Result<(), String> {
    let doc = io::import_from_file(file).map_err(|e| format!("'{}': {}", file.display(), e))?;
    let (w, h) = doc.dimensions();
    let images: Vec<&ImageHandle> = doc.visible_items().iter().filter_map(|item| item.image.as_ref()).collect();
    let image_bytes: usize = images.iter().map(|image| image.encoded_len()).sum();
    println!("layout:     {}", doc.layout.id());
    println!("brand:      {}", doc.brand_name);
    println!("grid:       {}x{} ({} visible tiles)", doc.grid_rows, doc.grid_cols, doc.visible_items().len());
    println!("dimensions: {}x{}", w, h);
    println!("images:     {}/{} ({} KB encoded)", images.len(), doc.visible_items().len(), image_bytes / 1024);
    for (i, item) in doc.visible_items().iter().enumerate() {
        let marker = if i == doc.selected_grid_index { '*' } else { ' ' };
        println!("  {}{:>2}  {:<28} {}", marker, i, item.product_name, item.price);
    }
    Ok(())
}

fn import(store: &dyn Persistence, patterns: &[String], verbose: bool) -> Result<(), String> {
    let inputs = resolve_inputs(patterns);
    if inputs.is_empty() {
        return Err("no input files matched the given pattern(s)".to_string());
    }

    let total = inputs.len();
    let mut failed = 0;
    for (idx, path) in inputs.iter().enumerate() {
        if verbose || total > 1 {
            println!("[{}/{}] {}", idx + 1, total, path.display());
        }
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        match io::import_from_file(path).and_then(|doc| store.save_named_project(&name, &doc)) {
            Ok(id) => {
                log_info!("CLI: imported '{}' as {}", path.display(), id);
                println!("  → {}", id);
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        Err(format!("{} of {} file(s) could not be imported", failed, total))
    } else {
        Ok(())
    }
}

fn export(store: &dyn Persistence, id: Uuid, output: Option<PathBuf>) -> Result<(), String> {
    let project = store.load_project(id).map_err(|e| e.to_string())?;
    let path = output.unwrap_or_else(|| PathBuf::from(io::backup_file_name()));
    io::export_to_file(&project.config, &path).map_err(|e| format!("'{}': {}", path.display(), e))?;
    println!("{} → {}", project.name, path.display());
    Ok(())
}

fn delete(store: &dyn Persistence, id: Uuid) -> Result<(), String> {
    store.delete_project(id).map_err(|e| e.to_string())?;
    println!("deleted {}", id);
    Ok(())
}

/// Runs through an editor session so the same rules apply as in the UI:
/// the backup is validated on the way in and the tile placement resets.
fn set_image(settings: EditorSettings, file: &Path, tile: usize, image: &Path) -> Result<(), String> {
    let bytes = std::fs::read(file).map_err(|e| format!("'{}': {}", file.display(), e))?;
    let handle = ImageHandle::from_file(image).map_err(|e| format!("'{}': {}", image.display(), e))?;

    let mut editor = Editor::new(settings, Arc::new(MemoryStore::new()), Arc::new(OfflineAdapter));
    editor.import_backup(&bytes).map_err(|e| format!("'{}': {}", file.display(), e))?;
    let tiles = editor.document().grid_items.len();
    if !editor.set_tile_image(tile, Some(handle)) {
        return Err(format!("tile {} is out of range (backup has {} tiles)", tile, tiles));
    }

    let json = editor.export_backup().map_err(|e| e.to_string())?;
    std::fs::write(file, json).map_err(|e| format!("'{}': {}", file.display(), e))?;
    println!("tile {} of '{}' updated", tile, file.display());
    Ok(())
}

/// Print the settings after applying `assignments`. Anything changed is
/// written back to the settings file.
fn config(settings: &EditorSettings, assignments: &[String]) -> Result<(), String> {
    let updated = apply_settings(settings, assignments)?;
    if !assignments.is_empty() {
        updated.save();
        log_info!("CLI: settings updated ({})", assignments.join(", "));
    }
    print!("{}", updated.to_config_string());
    Ok(())
}

/// Layer `KEY=VALUE` lines over `settings`. Keys must be ones the settings
/// file knows; values that do not parse fall back to the default.
fn apply_settings(settings: &EditorSettings, assignments: &[String]) -> Result<EditorSettings, String> {
    let mut content = settings.to_config_string();
    for assignment in assignments {
        let Some((key, _)) = assignment.split_once('=') else {
            return Err(format!("'{}' is not KEY=VALUE", assignment));
        };
        let known = content.lines().any(|line| line.split_once('=').is_some_and(|(k, _)| k == key.trim()));
        if !known {
            return Err(format!("unknown setting '{}'", key.trim()));
        }
        content.push_str(assignment);
        content.push('\n');
    }
    Ok(EditorSettings::parse(&content))
}

// ============================================================================
// Helpers
// ============================================================================

fn is_backup_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Expand each pattern (a literal path or a glob) into the backup files it
/// names, in order and without repeats. Non-JSON matches are skipped.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let candidates: Vec<PathBuf> = if Path::new(pattern).exists() {
            vec![PathBuf::from(pattern)]
        } else {
            match glob::glob(pattern) {
                Ok(paths) => paths.flatten().collect(),
                Err(e) => {
                    eprintln!("warning: invalid glob '{}': {}", pattern, e);
                    continue;
                }
            }
        };

        let backups: Vec<PathBuf> = candidates.into_iter().filter(|p| is_backup_file(p)).collect();
        if backups.is_empty() {
            eprintln!("warning: '{}' matched no .json backups", pattern);
        }
        for path in backups {
            if !found.contains(&path) {
                found.push(path);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PostConfig;

    #[test]
    fn parses_subcommands() {
        let args = CliArgs::try_parse_from(["flyerfe", "set-image", "a.json", "--tile", "2", "--image", "b.png"]).unwrap();
        match args.command {
            Command::SetImage { tile, .. } => assert_eq!(tile, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(CliArgs::try_parse_from(["flyerfe", "export", "not-a-uuid"]).is_err());
    }

    #[test]
    fn resolve_inputs_dedupes_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, "{}").unwrap();
        std::fs::write(&b, "{}").unwrap();
        let pattern = dir.path().join("*.json").to_string_lossy().into_owned();
        let literal = a.to_string_lossy().into_owned();

        let found = resolve_inputs(&[literal, pattern]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], a);
    }

    #[test]
    fn resolve_inputs_skips_non_json() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("flyer.JSON");
        let notes = dir.path().join("notes.txt");
        std::fs::write(&backup, "{}").unwrap();
        std::fs::write(&notes, "hello").unwrap();

        let everything = dir.path().join("*").to_string_lossy().into_owned();
        assert_eq!(resolve_inputs(&[everything]), vec![backup]);
        assert!(resolve_inputs(&[notes.to_string_lossy().into_owned()]).is_empty());
    }

    #[test]
    fn settings_assignments_layer_over_current() {
        let current = EditorSettings { fit_padding: 12.0, ..EditorSettings::default() };
        let updated = apply_settings(
            &current,
            &["autosave_delay_ms=5000".to_string(), "coalesce_drag_history=true".to_string()],
        )
        .unwrap();
        assert_eq!(updated.autosave_delay_ms, 5000);
        assert!(updated.coalesce_drag_history);
        assert_eq!(updated.fit_padding, 12.0);

        assert!(apply_settings(&current, &["colour=red".to_string()]).is_err());
        assert!(apply_settings(&current, &["autosave_delay_ms".to_string()]).is_err());
        assert_eq!(apply_settings(&current, &[]).unwrap(), current);
    }

    #[test]
    fn parses_config_assignments() {
        let args = CliArgs::try_parse_from(["flyerfe", "config", "--set", "fit_padding=10", "--set", "data_dir=/x"]).unwrap();
        match args.command {
            Command::Config { assignments } => assert_eq!(assignments, vec!["fit_padding=10", "data_dir=/x"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn import_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        io::export_to_file(&PostConfig::default(), &good).unwrap();
        std::fs::write(&bad, "[1, 2, 3]").unwrap();
        let store = MemoryStore::new();

        let patterns = vec![good.to_string_lossy().into_owned(), bad.to_string_lossy().into_owned()];
        assert!(import(&store, &patterns, false).is_err());
        let projects = store.list_projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "good");
    }

    #[test]
    fn set_image_rewrites_the_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("flyer.json");
        let png = dir.path().join("tile.png");
        io::export_to_file(&PostConfig::default(), &backup).unwrap();
        image::RgbaImage::new(2, 2).save(&png).unwrap();

        set_image(EditorSettings::default(), &backup, 4, &png).unwrap();
        let doc = io::import_from_file(&backup).unwrap();
        assert!(doc.grid_items[4].image.is_some());
        assert!(doc.grid_items[3].image.is_none());

        assert!(set_image(EditorSettings::default(), &backup, 99, &png).is_err());
    }
}
