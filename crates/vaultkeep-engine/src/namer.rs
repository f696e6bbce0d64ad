//! Divergence copy naming for conflict-as-copy resolution
//!
//! Generates unique vault paths for divergence copies, following the pattern:
//! `name (sync conflict YYYY-MM-DD XXXXXXXX).ext`

use chrono::Utc;
use uuid::Uuid;

use vaultkeep_core::domain::newtypes::VaultPath;

/// Generates unique divergence copy paths
pub struct DivergenceNamer;

impl DivergenceNamer {
    /// Generates a divergence copy path in the same directory as the original
    ///
    /// Given "notes/report.md", produces something like:
    /// "notes/report (sync conflict 2026-08-26 a1b2c3d4).md"
    #[must_use]
    pub fn generate(original: &VaultPath) -> VaultPath {
        let name = Self::generate_name(original.file_name());
        let parent = original.parent();
        let full = if parent.is_empty() {
            name
        } else {
            format!("{parent}/{name}")
        };
        // The generated name only inserts safe ASCII into an already valid
        // path, so re-validation cannot fail.
        VaultPath::new(full).unwrap_or_else(|_| original.clone())
    }

    fn generate_name(original_name: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d");
        let short_uuid = &Uuid::new_v4().to_string()[..8];

        if let Some(dot_pos) = original_name.rfind('.') {
            let stem = &original_name[..dot_pos];
            let ext = &original_name[dot_pos..];
            format!("{stem} (sync conflict {timestamp} {short_uuid}){ext}")
        } else {
            format!("{original_name} (sync conflict {timestamp} {short_uuid})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> VaultPath {
        VaultPath::new(s).unwrap()
    }

    #[test]
    fn test_generate_with_extension() {
        let copy = DivergenceNamer::generate(&path("report.md"));
        assert!(copy.as_str().starts_with("report (sync conflict "));
        assert!(copy.as_str().ends_with(").md"));
    }

    #[test]
    fn test_generate_without_extension() {
        let copy = DivergenceNamer::generate(&path("Makefile"));
        assert!(copy.as_str().starts_with("Makefile (sync conflict "));
        assert!(copy.as_str().ends_with(')'));
    }

    #[test]
    fn test_generate_keeps_parent_directory() {
        let copy = DivergenceNamer::generate(&path("notes/daily/a.md"));
        assert_eq!(copy.parent(), "notes/daily");
        assert!(copy.file_name().starts_with("a (sync conflict "));
    }

    #[test]
    fn test_generate_with_multiple_dots() {
        let copy = DivergenceNamer::generate(&path("archive.tar.gz"));
        assert!(copy.as_str().ends_with(").gz"));
        assert!(copy.as_str().contains("archive.tar (sync conflict"));
    }

    #[test]
    fn test_uniqueness() {
        let a = DivergenceNamer::generate(&path("test.txt"));
        let b = DivergenceNamer::generate(&path("test.txt"));
        // UUIDs ensure different names
        assert_ne!(a, b);
    }
}
