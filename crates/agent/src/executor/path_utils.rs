//! Path validation for workspace-confined writes

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Longest accepted file name, in characters
pub const MAX_FILENAME_LEN: usize = 255;

/// Why a model-supplied file name was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathRejection {
    #[error("file name is empty")]
    Empty,

    #[error("file name exceeds {MAX_FILENAME_LEN} characters")]
    TooLong,

    #[error("illegal character {0:?} in file name")]
    IllegalCharacter(char),

    #[error("absolute paths are not allowed")]
    Absolute,

    #[error("relative component {0:?} is not allowed")]
    RelativeComponent(String),

    #[error("empty path component")]
    EmptyComponent,

    #[error("path resolves outside workspace {0}")]
    OutsideWorkspace(String),
}

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-' || c == '/'
}

/// Syntactic filename predicate. Touches no filesystem.
pub fn check_filename(name: &str) -> Result<(), PathRejection> {
    if name.is_empty() {
        return Err(PathRejection::Empty);
    }
    if name.chars().count() > MAX_FILENAME_LEN {
        return Err(PathRejection::TooLong);
    }
    if let Some(c) = name.chars().find(|&c| !is_allowed(c)) {
        return Err(PathRejection::IllegalCharacter(c));
    }
    if name.starts_with('/') {
        return Err(PathRejection::Absolute);
    }

    for part in name.split('/') {
        match part {
            "" => return Err(PathRejection::EmptyComponent),
            "." | ".." => return Err(PathRejection::RelativeComponent(part.to_string())),
            _ => {}
        }
    }

    Ok(())
}

/// Resolve a checked file name against the workspace.
///
/// The deepest existing ancestor of the target is canonicalized so a symlink
/// inside the workspace cannot redirect the write elsewhere. The workspace
/// root must exist.
pub async fn resolve_in_workspace(
    name: &str,
    workspace_root: &Path,
) -> Result<PathBuf, PathRejection> {
    check_filename(name)?;

    let outside = || PathRejection::OutsideWorkspace(workspace_root.display().to_string());

    let canonical_workspace = tokio::fs::canonicalize(workspace_root)
        .await
        .map_err(|_| outside())?;
    let target = canonical_workspace.join(name);

    // walk up until something exists on disk
    let mut existing = target.as_path();
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
    while tokio::fs::symlink_metadata(existing).await.is_err() {
        let Some(parent) = existing.parent() else {
            return Err(outside());
        };
        if let Some(file_name) = existing.file_name() {
            missing.push(file_name);
        }
        existing = parent;
    }

    // a dangling symlink fails here and is refused
    let mut resolved = tokio::fs::canonicalize(existing)
        .await
        .map_err(|_| outside())?;
    for part in missing.iter().rev() {
        resolved.push(part);
    }

    if !is_path_within_workspace(&resolved, &canonical_workspace) {
        return Err(outside());
    }

    Ok(resolved)
}

/// Check if a path is within the workspace
fn is_path_within_workspace(path: &Path, workspace: &Path) -> bool {
    let path_components: Vec<Component> = path.components().collect();
    let workspace_components: Vec<Component> = workspace.components().collect();

    if path_components.len() < workspace_components.len() {
        return false;
    }

    workspace_components
        .iter()
        .zip(path_components.iter())
        .all(|(w, p)| w == p)
}
