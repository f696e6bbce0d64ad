//! Remote version chains, sidecar metadata, and inventory snapshots
//!
//! The object store holds one **version chain** per alias. Each version is a
//! payload object plus a sidecar object:
//!
//! ```text
//! <alias>__<sequenceTag>.<ext>             payload bytes
//! <alias>__<sequenceTag>.<ext>.meta.json   provenance sidecar
//! ```
//!
//! This naming scheme is the wire contract with existing stored data and is
//! reproduced exactly. Keys that do not follow the convention are ignored by
//! the parsers rather than rejected as errors; they may belong to foreign
//! tooling sharing the bucket.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Alias, SequenceTag, VaultPath};

/// Suffix appended to a payload key to form its sidecar key
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Separator between the alias and the sequence tag in a payload key
pub const TAG_SEPARATOR: &str = "__";

/// Extension used when the original path has none
pub const DEFAULT_EXTENSION: &str = "dat";

// ============================================================================
// VaultFileRecord
// ============================================================================

/// Snapshot of one local file: its vault-relative path and mtime
///
/// Owned by the local vault; the engine only reads snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFileRecord {
    /// Vault-relative path, unique within the vault
    pub path: VaultPath,
    /// Last modification time reported by the filesystem
    pub modified: DateTime<Utc>,
}

// ============================================================================
// SidecarMetadata
// ============================================================================

/// Per-version provenance stored alongside each payload
///
/// Field names are part of the stored-data contract (camelCase JSON).
/// The `originalPath` is authoritative for materializing downloads; the
/// alias is never decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarMetadata {
    /// File name component of the original path
    pub original_name: String,
    /// Full vault-relative path at upload time
    pub original_path: VaultPath,
    /// Sequence tag of the version this sidecar describes
    pub time_stamp: SequenceTag,
}

impl SidecarMetadata {
    /// Build the sidecar for a version of `path` at `tag`
    #[must_use]
    pub fn for_version(path: &VaultPath, tag: SequenceTag) -> Self {
        Self {
            original_name: path.file_name().to_string(),
            original_path: path.clone(),
            time_stamp: tag,
        }
    }
}

// ============================================================================
// RemoteVersion and the key codec
// ============================================================================

/// One stored version within an alias's chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersion {
    /// The alias this version belongs to
    pub alias: Alias,
    /// Logical timestamp of this version
    pub sequence_tag: SequenceTag,
    /// Object key holding the payload bytes
    pub payload_key: String,
    /// Object key holding the provenance sidecar
    pub sidecar_key: String,
}

impl RemoteVersion {
    /// Compose a new version's keys for `alias` at `tag`
    #[must_use]
    pub fn compose(alias: &Alias, tag: SequenceTag, extension: &str) -> Self {
        let payload_key = payload_key(alias, tag, extension);
        let sidecar_key = sidecar_key_for(&payload_key);
        Self {
            alias: alias.clone(),
            sequence_tag: tag,
            payload_key,
            sidecar_key,
        }
    }

    /// Parse a listed object key back into a version
    ///
    /// Returns `None` for sidecar keys and for keys that do not follow the
    /// `alias__tag.ext` convention (foreign objects are skipped, not errors).
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if key.ends_with(SIDECAR_SUFFIX) {
            return None;
        }

        let sep = key.rfind(TAG_SEPARATOR)?;
        let alias = Alias::new(&key[..sep]).ok()?;

        let rest = &key[sep + TAG_SEPARATOR.len()..];
        // rest = "<tag>.<ext>"; the tag runs up to the first dot
        let dot = rest.find('.')?;
        let sequence_tag: SequenceTag = rest[..dot].parse().ok()?;
        if rest[dot + 1..].is_empty() {
            return None;
        }

        Some(Self {
            alias,
            sequence_tag,
            payload_key: key.to_string(),
            sidecar_key: sidecar_key_for(key),
        })
    }
}

/// Compose a payload key: `<alias>__<tag>.<ext>`
#[must_use]
pub fn payload_key(alias: &Alias, tag: SequenceTag, extension: &str) -> String {
    format!("{alias}{TAG_SEPARATOR}{tag}.{extension}")
}

/// Compose the sidecar key paired with `payload_key`
#[must_use]
pub fn sidecar_key_for(payload_key: &str) -> String {
    format!("{payload_key}{SIDECAR_SUFFIX}")
}

/// Storage-safe extension for a path, `"dat"` when absent
///
/// Extensions pass through the same character discipline as aliases so the
/// composed key stays parseable.
#[must_use]
pub fn extension_for(path: &VaultPath) -> String {
    let ext: String = path
        .extension()
        .unwrap_or(DEFAULT_EXTENSION)
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    if ext.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        ext
    }
}

// ============================================================================
// Inventories
// ============================================================================

/// Immutable snapshot of the local vault, keyed by alias
///
/// Built fresh each reconciliation pass; the engine computes diffs against
/// it and never mutates it in place.
#[derive(Debug, Clone, Default)]
pub struct LocalInventory {
    entries: BTreeMap<Alias, VaultFileRecord>,
}

impl LocalInventory {
    /// Build the snapshot from an enumeration of local files
    ///
    /// Aliases are injective over paths, so two records can only share an
    /// alias if the vault reported the same path twice; the later record
    /// wins in that case.
    #[must_use]
    pub fn build(records: impl IntoIterator<Item = VaultFileRecord>) -> Self {
        let mut entries = BTreeMap::new();
        for record in records {
            let alias = super::alias::encode(&record.path);
            entries.insert(alias, record);
        }
        Self { entries }
    }

    /// The record for `alias`, if present locally
    #[must_use]
    pub fn get(&self, alias: &Alias) -> Option<&VaultFileRecord> {
        self.entries.get(alias)
    }

    /// Whether the snapshot contains `alias`
    #[must_use]
    pub fn contains(&self, alias: &Alias) -> bool {
        self.entries.contains_key(alias)
    }

    /// Iterate aliases and records in stable (sorted) order
    pub fn iter(&self) -> impl Iterator<Item = (&Alias, &VaultFileRecord)> {
        self.entries.iter()
    }

    /// Number of local files in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable snapshot of the remote store: one version chain per alias
#[derive(Debug, Clone, Default)]
pub struct RemoteInventory {
    chains: BTreeMap<Alias, Vec<RemoteVersion>>,
}

impl RemoteInventory {
    /// Build the snapshot from a full key listing
    ///
    /// Sidecar keys and unparseable keys are skipped. Each chain is sorted
    /// by sequence tag descending (newest first); equal tags keep listing
    /// order, which is an accepted weak point of the format.
    #[must_use]
    pub fn build<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut chains: BTreeMap<Alias, Vec<RemoteVersion>> = BTreeMap::new();
        for key in keys {
            if let Some(version) = RemoteVersion::parse(key) {
                chains.entry(version.alias.clone()).or_default().push(version);
            }
        }
        for chain in chains.values_mut() {
            chain.sort_by(|a, b| b.sequence_tag.cmp(&a.sequence_tag));
        }
        Self { chains }
    }

    /// The newest version of `alias`, if any
    #[must_use]
    pub fn latest(&self, alias: &Alias) -> Option<&RemoteVersion> {
        self.chains.get(alias).and_then(|chain| chain.first())
    }

    /// The full chain for `alias`, newest first
    #[must_use]
    pub fn chain(&self, alias: &Alias) -> Option<&[RemoteVersion]> {
        self.chains.get(alias).map(Vec::as_slice)
    }

    /// Whether the snapshot contains `alias`
    #[must_use]
    pub fn contains(&self, alias: &Alias) -> bool {
        self.chains.contains_key(alias)
    }

    /// Iterate aliases and chains in stable (sorted) order
    pub fn iter(&self) -> impl Iterator<Item = (&Alias, &[RemoteVersion])> {
        self.chains.iter().map(|(a, c)| (a, c.as_slice()))
    }

    /// Number of distinct aliases in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alias::encode;

    fn tag(millis: i64) -> SequenceTag {
        SequenceTag::from_millis(millis).unwrap()
    }

    #[test]
    fn test_payload_key_format() {
        let alias = Alias::new("notes%2fa.md-1a2b3c4d").unwrap();
        let key = payload_key(&alias, tag(1700000000000), "md");
        assert_eq!(key, "notes%2fa.md-1a2b3c4d__1700000000000.md");
        assert_eq!(
            sidecar_key_for(&key),
            "notes%2fa.md-1a2b3c4d__1700000000000.md.meta.json"
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let alias = Alias::new("a.md-deadbeef").unwrap();
        let composed = RemoteVersion::compose(&alias, tag(42), "md");
        let parsed = RemoteVersion::parse(&composed.payload_key).unwrap();
        assert_eq!(parsed, composed);
    }

    #[test]
    fn test_parse_skips_sidecar_keys() {
        assert!(RemoteVersion::parse("a-deadbeef__42.md.meta.json").is_none());
    }

    #[test]
    fn test_parse_skips_foreign_keys() {
        assert!(RemoteVersion::parse("no-separator.md").is_none());
        assert!(RemoteVersion::parse("alias__notanumber.md").is_none());
        assert!(RemoteVersion::parse("alias__42").is_none()); // missing extension
        assert!(RemoteVersion::parse("alias__42.").is_none()); // empty extension
    }

    #[test]
    fn test_parse_alias_with_embedded_separator() {
        // An alias stem may itself contain "__"; the parser splits on the
        // last occurrence.
        let parsed = RemoteVersion::parse("weird__name-cafe0123__99.txt").unwrap();
        assert_eq!(parsed.alias.as_str(), "weird__name-cafe0123");
        assert_eq!(parsed.sequence_tag.as_millis(), 99);
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(&VaultPath::new("a.md").unwrap()), "md");
        assert_eq!(extension_for(&VaultPath::new("a.TXT").unwrap()), "txt");
        assert_eq!(extension_for(&VaultPath::new("Makefile").unwrap()), "dat");
        // Unsafe characters in an extension fall back to the default
        assert_eq!(extension_for(&VaultPath::new("a.!!").unwrap()), "dat");
    }

    #[test]
    fn test_sidecar_serialization_contract() {
        let path = VaultPath::new("notes/a.md").unwrap();
        let meta = SidecarMetadata::for_version(&path, tag(123));
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"originalName\":\"a.md\""));
        assert!(json.contains("\"originalPath\":\"notes/a.md\""));
        assert!(json.contains("\"timeStamp\":123"));

        let back: SidecarMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_local_inventory_build() {
        let now = Utc::now();
        let records = vec![
            VaultFileRecord {
                path: VaultPath::new("a.md").unwrap(),
                modified: now,
            },
            VaultFileRecord {
                path: VaultPath::new("b/c.md").unwrap(),
                modified: now,
            },
        ];
        let inv = LocalInventory::build(records);
        assert_eq!(inv.len(), 2);

        let alias = encode(&VaultPath::new("a.md").unwrap());
        assert!(inv.contains(&alias));
        assert_eq!(inv.get(&alias).unwrap().path.as_str(), "a.md");
    }

    #[test]
    fn test_remote_inventory_latest_is_max_tag() {
        let alias = Alias::new("x-00000000").unwrap();
        let keys = vec![
            payload_key(&alias, tag(10), "md"),
            payload_key(&alias, tag(30), "md"),
            payload_key(&alias, tag(20), "md"),
            // sidecars in the listing are ignored
            sidecar_key_for(&payload_key(&alias, tag(30), "md")),
        ];
        let inv = RemoteInventory::build(keys.iter().map(String::as_str));

        assert_eq!(inv.len(), 1);
        let latest = inv.latest(&alias).unwrap();
        assert_eq!(latest.sequence_tag.as_millis(), 30);

        let chain = inv.chain(&alias).unwrap();
        let tags: Vec<i64> = chain.iter().map(|v| v.sequence_tag.as_millis()).collect();
        assert_eq!(tags, vec![30, 20, 10]);
    }

    #[test]
    fn test_remote_inventory_ignores_foreign_objects() {
        let keys = ["random-object", "another.file", "x-00000000__5.md"];
        let inv = RemoteInventory::build(keys);
        assert_eq!(inv.len(), 1);
    }

}
