use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use mapas_recon::config::SourcePatterns;
use mapas_recon::model::{ReconInput, SourceKind};

use crate::decode::read_file_as_utf8;
use crate::error::IoError;

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Assign the `.csv` files under `dir` (recursively) to logical sources by
/// file-name fragment.
///
/// Files are visited in sorted path order; when several match the same
/// source, the last one wins. A file whose name carries several fragments is
/// assigned to each of them.
pub fn locate_sources(
    dir: &Path,
    patterns: &SourcePatterns,
) -> Result<BTreeMap<SourceKind, PathBuf>, IoError> {
    if !dir.is_dir() {
        return Err(IoError::NotADirectory(dir.to_path_buf()));
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_csv(entry.path()) => {
                candidates.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable entry: {e}"),
        }
    }
    candidates.sort();

    let mut located = BTreeMap::new();
    for path in candidates {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };
        for kind in patterns.classify(&name) {
            if let Some(previous) = located.insert(kind, path.clone()) {
                debug!("{kind}: {} replaces {}", path.display(), previous.display());
            }
        }
    }

    Ok(located)
}

/// Locate and decode every recognized source under `dir`.
///
/// A located file that cannot be read is skipped with a warning, so the
/// pass still runs on whatever remains. An empty result is not an error here;
/// the engine rejects it.
pub fn discover_sources(dir: &Path, patterns: &SourcePatterns) -> Result<ReconInput, IoError> {
    let mut input = ReconInput::new();
    for (kind, path) in locate_sources(dir, patterns)? {
        match read_file_as_utf8(&path) {
            Ok(text) => {
                debug!("{kind}: loaded {}", path.display());
                input = input.with(kind, text);
            }
            Err(e) => warn!("{kind}: {e}"),
        }
    }
    Ok(input)
}
