use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{DocumentError, PostConfig};
use crate::logger;

// ============================================================================
// TYPES
// ============================================================================

/// A named, saved copy of a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProject {
    pub id: Uuid,
    pub name: String,
    /// Unix milliseconds.
    pub last_modified: u64,
    pub config: PostConfig,
}

/// The autosaved working copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub config: PostConfig,
    /// Unix milliseconds.
    pub timestamp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid store file: {0}")]
    InvalidFormat(String),
    #[error("not a valid backup: {0}")]
    CorruptImport(String),
    #[error("backup holds an invalid document: {0}")]
    InvalidDocument(#[from] DocumentError),
    #[error("no saved project with id {0}")]
    NotFound(Uuid),
}

/// Where drafts and named projects are kept. Methods take `&self` so a
/// store can be shared with background writers.
pub trait Persistence: Send + Sync {
    /// Overwrite the draft. Returns the timestamp written.
    fn save_draft(&self, doc: &PostConfig) -> Result<u64, StoreError>;
    fn get_draft(&self) -> Result<Option<Draft>, StoreError>;
    /// Save a new project at the front of the list. Blank names get a
    /// generated one.
    fn save_named_project(&self, name: &str, doc: &PostConfig) -> Result<Uuid, StoreError>;
    /// Newest first.
    fn list_projects(&self) -> Result<Vec<SavedProject>, StoreError>;
    fn delete_project(&self, id: Uuid) -> Result<(), StoreError>;

    fn load_project(&self, id: Uuid) -> Result<SavedProject, StoreError> {
        self.list_projects()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

fn project_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        format!("Projeto {}", logger::clock_time())
    } else {
        name.to_string()
    }
}

fn new_project(name: &str, doc: &PostConfig) -> SavedProject {
    SavedProject {
        id: Uuid::new_v4(),
        name: project_name(name),
        last_modified: logger::unix_millis(),
        config: doc.clone(),
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// Magic header for the draft file.
const DRAFT_MAGIC: &str = "FFD1";
/// Magic header for the project list file.
const PROJECTS_MAGIC: &str = "FFP1";

#[derive(Serialize, Deserialize)]
struct DraftFile {
    magic: String,
    draft: Draft,
}

#[derive(Serialize, Deserialize)]
struct ProjectsFile {
    magic: String,
    projects: Vec<SavedProject>,
}

/// bincode files under one directory: `draft.ffd` and `projects.ffp`.
pub struct FileStore {
    dir: PathBuf,
    /// Serialises read-modify-write of the project list.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, lock: Mutex::new(()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn draft_path(&self) -> PathBuf {
        self.dir.join("draft.ffd")
    }

    fn projects_path(&self) -> PathBuf {
        self.dir.join("projects.ffp")
    }

    fn read_projects(&self) -> Result<Vec<SavedProject>, StoreError> {
        let path = self.projects_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read(&path)?;
        check_magic(&raw, PROJECTS_MAGIC)?;
        let file: ProjectsFile = bincode::deserialize(&raw)?;
        Ok(file.projects)
    }

    fn write_projects(&self, projects: Vec<SavedProject>) -> Result<(), StoreError> {
        let file = ProjectsFile { magic: PROJECTS_MAGIC.to_string(), projects };
        write_atomic(&self.projects_path(), &file)
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, ()> {
        // Writes go through a rename, so a poisoned lock never guards a torn file.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// bincode puts an 8-byte length before the magic string.
fn check_magic(raw: &[u8], expected: &str) -> Result<(), StoreError> {
    if raw.len() < 12 {
        return Err(StoreError::InvalidFormat("file too small".into()));
    }
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != expected {
        return Err(StoreError::InvalidFormat(format!("unknown magic '{}'", magic)));
    }
    Ok(())
}

/// Write to a sibling temp file and rename over the target.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    drop(writer);
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl Persistence for FileStore {
    fn save_draft(&self, doc: &PostConfig) -> Result<u64, StoreError> {
        let timestamp = logger::unix_millis();
        let file = DraftFile {
            magic: DRAFT_MAGIC.to_string(),
            draft: Draft { config: doc.clone(), timestamp },
        };
        let _guard = self.locked();
        write_atomic(&self.draft_path(), &file)?;
        Ok(timestamp)
    }

    fn get_draft(&self) -> Result<Option<Draft>, StoreError> {
        let path = self.draft_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read(&path)?;
        check_magic(&raw, DRAFT_MAGIC)?;
        let file: DraftFile = bincode::deserialize(&raw)?;
        Ok(Some(file.draft))
    }

    fn save_named_project(&self, name: &str, doc: &PostConfig) -> Result<Uuid, StoreError> {
        let _guard = self.locked();
        let mut projects = self.read_projects()?;
        let project = new_project(name, doc);
        let id = project.id;
        projects.insert(0, project);
        self.write_projects(projects)?;
        Ok(id)
    }

    fn list_projects(&self) -> Result<Vec<SavedProject>, StoreError> {
        let _guard = self.locked();
        self.read_projects()
    }

    fn delete_project(&self, id: Uuid) -> Result<(), StoreError> {
        let _guard = self.locked();
        let mut projects = self.read_projects()?;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        if projects.len() == before {
            return Err(StoreError::NotFound(id));
        }
        self.write_projects(projects)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
struct MemoryState {
    draft: Option<Draft>,
    projects: Vec<SavedProject>,
}

/// Keeps everything in process memory. Used headless and in tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a draft, as if a previous session had saved one.
    pub fn with_draft(doc: PostConfig, timestamp: u64) -> Self {
        let store = Self::default();
        store.state().draft = Some(Draft { config: doc, timestamp });
        store
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Persistence for MemoryStore {
    fn save_draft(&self, doc: &PostConfig) -> Result<u64, StoreError> {
        let timestamp = logger::unix_millis();
        self.state().draft = Some(Draft { config: doc.clone(), timestamp });
        Ok(timestamp)
    }

    fn get_draft(&self) -> Result<Option<Draft>, StoreError> {
        Ok(self.state().draft.clone())
    }

    fn save_named_project(&self, name: &str, doc: &PostConfig) -> Result<Uuid, StoreError> {
        let project = new_project(name, doc);
        let id = project.id;
        self.state().projects.insert(0, project);
        Ok(id)
    }

    fn list_projects(&self) -> Result<Vec<SavedProject>, StoreError> {
        Ok(self.state().projects.clone())
    }

    fn delete_project(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.projects.len();
        state.projects.retain(|p| p.id != id);
        if state.projects.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

// ============================================================================
// JSON BACKUPS
// ============================================================================

/// Pretty JSON backup of a document, in the browser editor's format.
pub fn export_to_json(doc: &PostConfig) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

pub fn export_to_file(doc: &PostConfig, path: &Path) -> Result<(), StoreError> {
    std::fs::write(path, export_to_json(doc)?)?;
    Ok(())
}

/// Default backup file name: `choclar_backup_<unix ms>.json`.
pub fn backup_file_name() -> String {
    format!("choclar_backup_{}.json", logger::unix_millis())
}

/// Parse and validate a backup. Anything that is not a JSON object or that
/// fails validation is rejected whole.
pub fn import_from_bytes(bytes: &[u8]) -> Result<PostConfig, StoreError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| StoreError::CorruptImport(e.to_string()))?;
    if !value.is_object() {
        return Err(StoreError::CorruptImport("top level is not an object".into()));
    }
    let doc: PostConfig =
        serde_json::from_value(value).map_err(|e| StoreError::CorruptImport(e.to_string()))?;
    doc.validate()?;
    Ok(doc)
}

pub fn import_from_file(path: &Path) -> Result<PostConfig, StoreError> {
    import_from_bytes(&std::fs::read(path)?)
}
