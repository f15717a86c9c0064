//! Read/write model files from disk.

use crate::schema::{self, ModelFile};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const FDGEN_DIR: &str = ".fdgen";
const MODEL_FILE: &str = "model.json";

/// Get the path to the fdgen directory for a given project root.
pub fn fdgen_dir(project_root: &Path) -> PathBuf {
    project_root.join(FDGEN_DIR)
}

/// Default model file location for a project root.
pub fn model_file(project_root: &Path) -> PathBuf {
    fdgen_dir(project_root).join(MODEL_FILE)
}

/// Check if a model file exists at the default location.
pub fn model_exists(project_root: &Path) -> bool {
    model_file(project_root).exists()
}

/// Load a model from an explicit path.
pub fn load_from(path: &Path) -> Result<ModelFile> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read model from {}", path.display()))?;
    schema::from_json(&json).with_context(|| format!("invalid model file {}", path.display()))
}

/// Load the model from the project's default location.
pub fn load(project_root: &Path) -> Result<ModelFile> {
    load_from(&model_file(project_root))
}

/// Save a model to an explicit path, creating its parent directory if needed.
pub fn save_to(path: &Path, model: &ModelFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create model directory {}", dir.display()))?;
    }

    let json = schema::to_json(model)?;
    fs::write(path, json).with_context(|| format!("failed to write model to {}", path.display()))?;

    Ok(())
}

/// Save a model to the project's default location, creating `.fdgen` if needed.
pub fn save(project_root: &Path, model: &ModelFile) -> Result<()> {
    save_to(&model_file(project_root), model)
}
