//! Location rewriting helpers for `normalize_paths`

use std::path::{Component, Path, PathBuf};

/// Lexically resolve `.` and `..` in an absolute path
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `path` joined onto the working directory if relative, with dots resolved
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(clean(path))
    } else {
        Ok(clean(&std::env::current_dir()?.join(path)))
    }
}

/// `path` expressed relative to `base`, both taken as absolute
pub fn relative_to(path: &Path, base: &Path) -> std::io::Result<PathBuf> {
    let path = absolute(path)?;
    let base = absolute(base)?;

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Ok(relative)
}

pub fn is_url(uri: &str) -> bool {
    uri.contains("://")
}

/// Absolute local paths become relative to `base`; relative paths are
/// assumed to already be relative to it and URLs are left alone.
pub fn portable_uri(uri: &str, base: &Path) -> std::io::Result<String> {
    if is_url(uri) || !Path::new(uri).is_absolute() {
        return Ok(uri.to_string());
    }
    Ok(relative_to(Path::new(uri), base)?.to_string_lossy().into_owned())
}

/// Ensure a block-compressed annotation location ends in `.gz`
pub fn with_gz_suffix(uri: &str) -> String {
    if uri.ends_with(".gz") {
        uri.to_string()
    } else {
        format!("{uri}.gz")
    }
}

/// Ensure a tabix index location ends in `.gz.tbi`
pub fn with_tbi_suffix(uri: &str) -> String {
    if uri.ends_with(".gz.tbi") {
        return uri.to_string();
    }
    let stem = uri.strip_suffix(".tbi").unwrap_or(uri);
    let stem = stem.strip_suffix(".gz").unwrap_or(stem);
    format!("{stem}.gz.tbi")
}
