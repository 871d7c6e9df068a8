//! Discovery - pairs media files with their sidecar JSON
//!
//! Traversal is depth-first with the entries of each directory sorted by
//! file name, so two runs over an unchanged tree yield the same pair list.

use log::{debug, warn};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{OrganizerConfig, SIDECAR_SUFFIX};
use crate::models::MediaSidecarPair;

/// Sidecar path for a media file: the full file name plus `.json`
pub fn sidecar_path_for(media_path: &Path) -> PathBuf {
    let mut name = OsString::from(media_path.as_os_str());
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Whether a path's extension marks it as a possible companion video
fn has_companion_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            OrganizerConfig::companion_extensions()
                .iter()
                .any(|c| e.eq_ignore_ascii_case(c))
        })
        .unwrap_or(false)
}

/// Existing companion videos next to a primary file
///
/// A companion is a sibling file with the primary's stem and a companion
/// extension in any letter case (`c.mov`, `c.MOV`, `c.Mov`). Results follow
/// the companion extension order, then file name.
pub fn find_companions(primary: &Path) -> Vec<PathBuf> {
    if has_companion_extension(primary) {
        return Vec::new();
    }
    let (Some(parent), Some(stem)) = (primary.parent(), primary.file_stem()) else {
        return Vec::new();
    };

    let entries = match fs::read_dir(parent) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("failed to list {:?}: {}", parent, e);
            return Vec::new();
        }
    };
    let mut siblings: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.file_stem() == Some(stem) && path.is_file())
        .collect();
    siblings.sort();

    let mut companions = Vec::new();
    for ext in OrganizerConfig::companion_extensions() {
        let matching = siblings.iter().filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        });
        companions.extend(matching.cloned());
    }
    companions
}

/// Recursively list media/sidecar pairs under `input_root`
///
/// A non-directory entry `f` is paired when `f.json` is an existing file.
/// With `keep_live_photo_videos`, every primary that is not itself a video
/// also emits its same-stem `.mp4`/`.mov` siblings, right after the primary,
/// borrowing the primary's sidecar. A companion that owns a sidecar is
/// emitted only once, as a primary.
pub fn discover_pairs(input_root: &Path, keep_live_photo_videos: bool) -> Vec<MediaSidecarPair> {
    let mut pairs = Vec::new();
    let mut emitted: HashSet<PathBuf> = HashSet::new();

    let walker = WalkDir::new(input_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("failed to list {:?}: {}", e.path(), e);
                continue;
            }
        };

        let path = entry.path();
        // Follows symlinks, so a link to a directory is still a directory
        if path.is_dir() {
            continue;
        }

        let sidecar = sidecar_path_for(path);
        if !sidecar.is_file() {
            continue;
        }

        if emitted.insert(path.to_path_buf()) {
            debug!("discovered {:?}", path);
            pairs.push(MediaSidecarPair::new(path, &sidecar));
        }

        if keep_live_photo_videos {
            for companion in find_companions(path) {
                if sidecar_path_for(&companion).is_file() {
                    continue;
                }
                if emitted.insert(companion.clone()) {
                    debug!("discovered live-photo video {:?}", companion);
                    pairs.push(MediaSidecarPair::new(companion, &sidecar));
                }
            }
        }
    }

    pairs
}
