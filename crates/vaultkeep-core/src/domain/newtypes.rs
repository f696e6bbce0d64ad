//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! values. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// VaultPath
// ============================================================================

/// A vault-relative file path
///
/// Always uses forward slashes, never starts with `/`, and never contains
/// `..` components or NUL bytes. The path is the unique identity of a local
/// file within the vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultPath(String);

impl VaultPath {
    /// Create a validated `VaultPath` from a string
    ///
    /// Backslashes are normalized to forward slashes so paths produced on
    /// different platforms compare equal.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let raw: String = path.into();
        let normalized = raw.replace('\\', "/");
        let trimmed = normalized.trim_matches('/');

        if trimmed.is_empty() {
            return Err(DomainError::InvalidPath("empty path".to_string()));
        }
        if trimmed.contains('\0') {
            return Err(DomainError::InvalidPath(format!(
                "path contains NUL byte: {trimmed:?}"
            )));
        }
        if trimmed.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return Err(DomainError::InvalidPath(format!(
                "path escapes the vault or has empty segments: {trimmed}"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The path as a `&str`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path component (file name)
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The file extension without the leading dot, if any
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(pos) if pos > 0 && pos + 1 < name.len() => Some(&name[pos + 1..]),
            _ => None,
        }
    }

    /// The parent directory portion, empty for root-level files
    #[must_use]
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[..pos],
            None => "",
        }
    }

    /// Resolve this relative path against an absolute vault root
    #[must_use]
    pub fn resolve(&self, root: &std::path::Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl Display for VaultPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VaultPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Alias
// ============================================================================

/// A storage-safe object-key stem derived from a [`VaultPath`]
///
/// Aliases only contain characters from `[a-z0-9._%-]`. They are produced by
/// [`alias::encode`](super::alias::encode) and are NOT reversible to the
/// original path; the sidecar carries the original path out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alias(String);

impl Alias {
    /// Create a validated `Alias` from a string
    pub fn new(alias: impl Into<String>) -> Result<Self, DomainError> {
        let raw: String = alias.into();
        if raw.is_empty() {
            return Err(DomainError::InvalidAlias("empty alias".to_string()));
        }
        if !raw.chars().all(Self::is_safe_char) {
            return Err(DomainError::InvalidAlias(format!(
                "alias contains unsafe characters: {raw}"
            )));
        }
        Ok(Self(raw))
    }

    /// Whether `c` belongs to the storage-safe alias character set
    #[must_use]
    pub fn is_safe_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-' | '%')
    }

    /// The alias as a `&str`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Alias {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Alias {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// SequenceTag
// ============================================================================

/// Logical timestamp distinguishing versions within a chain
///
/// Encoded as non-negative milliseconds since the Unix epoch. Upload tags
/// come from the file's modification time, so re-uploading unchanged
/// content hits the same key and equal tags mean "already synced".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceTag(i64);

impl SequenceTag {
    /// Create a tag from raw epoch milliseconds
    pub fn from_millis(millis: i64) -> Result<Self, DomainError> {
        if millis < 0 {
            return Err(DomainError::InvalidTag(format!(
                "negative sequence tag: {millis}"
            )));
        }
        Ok(Self(millis))
    }

    /// The current wall-clock time as a tag
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis().max(0))
    }

    /// Convert a `DateTime<Utc>` into a tag
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis().max(0))
    }

    /// Raw epoch milliseconds
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// The tag as a UTC timestamp
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

impl Display for SequenceTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SequenceTag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let millis: i64 = s
            .parse()
            .map_err(|e| DomainError::InvalidTag(format!("{s}: {e}")))?;
        Self::from_millis(millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // VaultPath
    // ------------------------------------------------------------------

    #[test]
    fn test_vault_path_valid() {
        let p = VaultPath::new("notes/daily/2026-08-26.md").unwrap();
        assert_eq!(p.as_str(), "notes/daily/2026-08-26.md");
        assert_eq!(p.file_name(), "2026-08-26.md");
        assert_eq!(p.extension(), Some("md"));
        assert_eq!(p.parent(), "notes/daily");
    }

    #[test]
    fn test_vault_path_strips_leading_slash() {
        let p = VaultPath::new("/notes/a.md").unwrap();
        assert_eq!(p.as_str(), "notes/a.md");
    }

    #[test]
    fn test_vault_path_normalizes_backslashes() {
        let p = VaultPath::new("notes\\a.md").unwrap();
        assert_eq!(p.as_str(), "notes/a.md");
    }

    #[test]
    fn test_vault_path_rejects_empty() {
        assert!(VaultPath::new("").is_err());
        assert!(VaultPath::new("///").is_err());
    }

    #[test]
    fn test_vault_path_rejects_escape() {
        assert!(VaultPath::new("../outside.md").is_err());
        assert!(VaultPath::new("a/../../b").is_err());
    }

    #[test]
    fn test_vault_path_root_level_file() {
        let p = VaultPath::new("README.md").unwrap();
        assert_eq!(p.file_name(), "README.md");
        assert_eq!(p.parent(), "");
    }

    #[test]
    fn test_vault_path_no_extension() {
        let p = VaultPath::new("Makefile").unwrap();
        assert_eq!(p.extension(), None);

        // Dotfiles have no extension either
        let p = VaultPath::new(".gitignore").unwrap();
        assert_eq!(p.extension(), None);
    }

    #[test]
    fn test_vault_path_resolve() {
        let p = VaultPath::new("a/b.txt").unwrap();
        let resolved = p.resolve(std::path::Path::new("/vault"));
        assert_eq!(resolved, PathBuf::from("/vault/a/b.txt"));
    }

    // ------------------------------------------------------------------
    // Alias
    // ------------------------------------------------------------------

    #[test]
    fn test_alias_valid() {
        let a = Alias::new("notes%2fdaily.md-1a2b3c4d").unwrap();
        assert_eq!(a.as_str(), "notes%2fdaily.md-1a2b3c4d");
    }

    #[test]
    fn test_alias_rejects_uppercase_and_spaces() {
        assert!(Alias::new("Notes").is_err());
        assert!(Alias::new("a b").is_err());
        assert!(Alias::new("").is_err());
    }

    // ------------------------------------------------------------------
    // SequenceTag
    // ------------------------------------------------------------------

    #[test]
    fn test_sequence_tag_ordering() {
        let a = SequenceTag::from_millis(10).unwrap();
        let b = SequenceTag::from_millis(20).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_sequence_tag_rejects_negative() {
        assert!(SequenceTag::from_millis(-1).is_err());
    }

    #[test]
    fn test_sequence_tag_datetime_roundtrip() {
        let tag = SequenceTag::from_millis(1_700_000_000_000).unwrap();
        let dt = tag.to_datetime();
        assert_eq!(SequenceTag::from_datetime(dt), tag);
    }

    #[test]
    fn test_sequence_tag_parse() {
        let tag: SequenceTag = "12345".parse().unwrap();
        assert_eq!(tag.as_millis(), 12345);
        assert!("abc".parse::<SequenceTag>().is_err());
        assert!("-5".parse::<SequenceTag>().is_err());
    }
}
