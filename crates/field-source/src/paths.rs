//! Source descriptor handling: URLs, plain paths and wildcard patterns.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use plume_common::{PlumeError, PlumeResult};

/// Whether the descriptor is a remote address rather than a local path.
pub fn is_remote(descriptor: &str) -> bool {
    descriptor.starts_with("http://") || descriptor.starts_with("https://")
}

/// Whether the descriptor's file-name component contains `*` or `?`.
pub fn has_wildcard(descriptor: &str) -> bool {
    !is_remote(descriptor) && descriptor.contains(['*', '?'])
}

/// Expand a wildcard pattern into the sorted list of matching files.
///
/// Wildcards are only honoured in the final path component; the directory
/// part is taken literally.
pub fn expand_wildcard(pattern: &str) -> PlumeResult<Vec<PathBuf>> {
    let path = Path::new(pattern);
    let file_pattern = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PlumeError::invalid_parameter("ifile", format!("no file name in '{}'", pattern)))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if dir.to_string_lossy().contains(['*', '?']) {
        return Err(PlumeError::invalid_parameter(
            "ifile",
            format!("wildcards are only supported in the file name: '{}'", pattern),
        ));
    }

    let mut matches: Vec<PathBuf> = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| wildcard_match(file_pattern, name))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    matches.sort();

    debug!(pattern = pattern, matches = matches.len(), "Expanded wildcard source");
    if matches.is_empty() {
        return Err(PlumeError::DataUnavailable(format!(
            "no files match '{}'",
            pattern
        )));
    }
    Ok(matches)
}

/// Match `name` against a pattern where `*` matches any run of characters
/// and `?` matches exactly one.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if let Some((star_p, star_n)) = backtrack {
            pi = star_p + 1;
            ni = star_n + 1;
            backtrack = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}
