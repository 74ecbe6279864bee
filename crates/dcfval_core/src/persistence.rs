//! Model document save/load and template lookup

use std::fs;
use std::path::Path;

use crate::error::PersistenceError;
use crate::model::{DocumentMetadata, FinancialModel, ModelDocument};

/// Write the model as a pretty-printed JSON document, stamped with a
/// `_metadata` block.
pub fn save_model(model: &FinancialModel, path: &Path) -> Result<(), PersistenceError> {
    let mut document = model.to_document();
    document.metadata = Some(DocumentMetadata::now());
    let json = serde_json::to_string_pretty(&document)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a model document. `_metadata`, `_comment` and any unknown fields
/// are ignored.
pub fn load_model(path: &Path) -> Result<FinancialModel, PersistenceError> {
    let json = fs::read_to_string(path)?;
    let document: ModelDocument = serde_json::from_str(&json)?;
    Ok(FinancialModel::from_document(document)?)
}

/// Names of the templates available in a directory: every parseable
/// `*.json` file, by stem, sorted. Unreadable files are skipped.
pub fn template_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                return None;
            }
            if let Err(e) = load_model(&path) {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable template");
                return None;
            }
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
        .collect();
    names.sort();
    names
}

/// Load the named template from a directory.
pub fn load_template(dir: &Path, name: &str) -> Result<FinancialModel, PersistenceError> {
    let path = dir.join(format!("{name}.json"));
    if !path.is_file() {
        return Err(PersistenceError::TemplateNotFound(name.to_string()));
    }
    load_model(&path)
}
