use std::collections::HashSet;

use tracing::warn;

use crate::sink::{placeholder_name, sanitize};

/// Assigns every submitted entry a unique, sanitized path.
#[derive(Debug, Default)]
pub(super) struct EntryNames {
    seen: HashSet<String>,
}

impl EntryNames {
    pub(super) fn assign(&mut self, requested: &str) -> String {
        let base = sanitize(requested).unwrap_or_else(placeholder_name);
        if self.seen.insert(base.clone()) {
            return base;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}.{n}");
            if self.seen.insert(candidate.clone()) {
                warn!(target: "cdump.core.archive", requested = %base, renamed = %candidate, "duplicate entry renamed");
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_get_numeric_suffix() {
        let mut names = EntryNames::default();
        assert_eq!(names.assign("events.json"), "events.json");
        assert_eq!(names.assign("/events.json"), "events.json.1");
        assert_eq!(names.assign("events.json"), "events.json.2");
    }

    #[test]
    fn blank_names_get_placeholders() {
        let mut names = EntryNames::default();
        let a = names.assign("");
        let b = names.assign("  ");
        assert!(a.starts_with("unnamed-"));
        assert_ne!(a, b);
    }
}
