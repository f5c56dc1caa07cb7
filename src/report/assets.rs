//! Plot asset copying

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Image extensions copied into a report (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// True if `path` has a recognized image extension.
#[must_use]
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Copy image files directly inside `plots_dir` into `assets_dir`.
///
/// Files are copied in filename order and the copied names are returned in
/// that order. Nested directories are not descended into. `assets_dir` is
/// only created if there is something to copy.
///
/// # Errors
///
/// Returns an error if the plots directory cannot be listed or a copy fails.
pub fn copy_plot_assets(plots_dir: &Path, assets_dir: &Path) -> Result<Vec<String>> {
    if !plots_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut images: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(plots_dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_image(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) {
            images.push((name, path));
        }
    }
    images.sort_by(|a, b| a.0.cmp(&b.0));

    if !images.is_empty() {
        fs::create_dir_all(assets_dir)?;
    }
    for (name, src) in &images {
        fs::copy(src, assets_dir.join(name))?;
    }

    Ok(images.into_iter().map(|(name, _)| name).collect())
}
