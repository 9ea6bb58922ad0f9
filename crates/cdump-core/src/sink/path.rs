use std::path::{Component, Path};

use uuid::Uuid;

/// Normalizes a logical entry path.
///
/// Leading and trailing whitespace is trimmed and only plain components are
/// kept, so the result is always relative and never escapes its root.
/// Returns `None` if nothing usable remains.
pub fn sanitize(path: &str) -> Option<String> {
    let parts: Vec<&str> = Path::new(path.trim())
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Fresh name for an entry whose requested path was blank.
pub fn placeholder_name() -> String {
    format!("unnamed-{}", Uuid::new_v4())
}
