//! # Sprite Manifest
//!
//! Maps sprite names to image paths for clients. The manifest is built once at
//! startup and sent with every `init` snapshot.

use crate::{SpriteManifest, TacticaResult};
use log::{debug, warn};
use std::fs;
use std::path::Path;

const SPRITE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Recursively scans `dir` for images.
///
/// Keys are file stems, values are paths relative to `public_root` with `/`
/// separators. When two files share a stem the one visited last wins.
pub fn scan_sprites(dir: &Path, public_root: &Path) -> TacticaResult<SpriteManifest> {
    let mut manifest = SpriteManifest::new();
    if !dir.is_dir() {
        warn!("Sprite directory {} does not exist", dir.display());
        return Ok(manifest);
    }
    visit(dir, public_root, &mut manifest)?;
    debug!("Found {} sprites under {}", manifest.len(), dir.display());
    Ok(manifest)
}

fn visit(dir: &Path, public_root: &Path, manifest: &mut SpriteManifest) -> TacticaResult<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter_map(|e| e.file_type().ok().map(|kind| (e.path(), kind)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, kind) in entries {
        // Symlinked directories are not followed, so link loops cannot recurse
        if kind.is_dir() {
            visit(&path, public_root, manifest)?;
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SPRITE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !is_image {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let relative = path.strip_prefix(public_root).unwrap_or(&path);
        let web_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        manifest.insert(stem.to_string(), web_path);
    }
    Ok(())
}
