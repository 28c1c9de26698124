use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::types::{Document, META_SOURCE};

/// Metadata key for the parent directory of a document, relative to the
/// directory it was loaded from.
pub const META_CATEGORY: &str = "category";

/// Load a single text file. The source id is the file name.
pub fn load_document(path: &Path) -> Result<Document> {
    let text = read_file_content(path)?;
    let source_id = path
        .file_name()
        .map_or_else(|| path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string());
    debug!(path = %path.display(), chars = text.len(), "loaded document");
    Ok(Document::new(source_id, text).with_metadata(META_SOURCE, path.to_string_lossy()))
}

impl Document {
    /// Read a UTF-8 text file into a document, see [`load_document`].
    pub fn from_path(path: &Path) -> Result<Self> {
        load_document(path)
    }
}

/// Load every `.txt` file under `root`, sorted by path. Source ids are paths
/// relative to `root` so files with the same name in different folders stay
/// distinct.
pub fn load_directory(root: &Path) -> Result<Vec<Document>> {
    let files = list_txt_files(root);
    let mut documents = Vec::with_capacity(files.len());
    for file_path in &files {
        let relative = file_path.strip_prefix(root).unwrap_or(file_path);
        let mut document = load_document(file_path)?;
        document.source_id = relative.to_string_lossy().to_string();
        document.metadata.insert(META_CATEGORY.to_string(), category_from_path(relative));
        documents.push(document);
    }
    info!(root = %root.display(), documents = documents.len(), "loaded directory");
    Ok(documents)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string())
        }
        Err(e) => Err(e.into()),
    }
}

fn category_from_path(relative: &Path) -> String {
    match relative.parent().and_then(Path::to_str) {
        Some(parent) if !parent.is_empty() => parent.to_string(),
        _ => "misc".to_string(),
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    txt_files
}
