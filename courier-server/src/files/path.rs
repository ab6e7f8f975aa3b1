//! Sanitization of client-supplied relative paths
//!
//! Incoming paths are untrusted. They are reduced to at most one directory
//! level plus a file name, with every component that could escape the
//! archive root or confuse an extractor removed.

use std::collections::HashSet;

/// A cleaned entry path: an optional single directory and a file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedPath {
    dir: Option<String>,
    name: String,
}

impl SanitizedPath {
    /// Final path component
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.name
    }

    /// Whether the path keeps a directory prefix
    #[must_use]
    pub fn has_directory(&self) -> bool {
        self.dir.is_some()
    }

    /// Path as stored in the archive and manifest (`dir/name` or `name`)
    #[must_use]
    pub fn entry_path(&self) -> String {
        match &self.dir {
            Some(dir) => format!("{dir}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Clean a client-supplied relative path
///
/// - `\` is treated as a separator and leading separators are stripped
/// - `.`, `..`, empty and drive-prefix (`C:`) components are dropped
/// - control characters are removed
/// - the result is collapsed to `first_dir/file_name`
///
/// Returns `None` when nothing usable is left.
#[must_use]
pub fn sanitize_relative_path(raw: &str) -> Option<SanitizedPath> {
    let normalized = raw.replace('\\', "/");

    let components: Vec<String> = normalized
        .split('/')
        .map(strip_control_chars)
        .filter(|c| is_usable_component(c))
        .collect();

    let name = components.last()?.clone();
    let dir = if components.len() > 1 {
        Some(components[0].clone())
    } else {
        None
    };

    Some(SanitizedPath { dir, name })
}

fn strip_control_chars(component: &str) -> String {
    component.chars().filter(|c| !c.is_control()).collect()
}

fn is_usable_component(component: &str) -> bool {
    let trimmed = component.trim();
    !(trimmed.is_empty() || trimmed == "." || trimmed == ".." || is_drive_prefix(trimmed))
}

fn is_drive_prefix(component: &str) -> bool {
    let bytes = component.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Hands out unique entry paths for one archive
///
/// A repeated path becomes `name (2).ext`, `name (3).ext`, and so on.
/// Comparison is case-sensitive, matching tar semantics.
#[derive(Debug, Default)]
pub struct EntryNamer {
    taken: HashSet<String>,
}

impl EntryNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a unique entry path derived from `path`
    pub fn claim(&mut self, path: &SanitizedPath) -> String {
        let candidate = path.entry_path();
        if self.taken.insert(candidate.clone()) {
            return candidate;
        }

        let (stem, ext) = split_extension(&path.name);
        let mut n = 2u32;
        loop {
            let name = match ext {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            };
            let renamed = SanitizedPath {
                dir: path.dir.clone(),
                name,
            }
            .entry_path();
            if self.taken.insert(renamed.clone()) {
                return renamed;
            }
            n += 1;
        }
    }
}

/// Split `name.ext` at the last dot; a leading dot is not an extension
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}
