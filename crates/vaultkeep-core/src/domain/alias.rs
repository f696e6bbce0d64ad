//! Alias codec - deterministic path-to-key encoding
//!
//! Maps a [`VaultPath`] to a storage-safe [`Alias`] suitable for a flat
//! object-key namespace:
//!
//! 1. NFD-decompose and drop combining marks (diacritics fold to ASCII)
//! 2. lower-case ASCII letters
//! 3. percent-encode the reserved separators (`/`, space, `%`)
//! 4. drop every other character outside `[a-z0-9._-]`
//! 5. append `-` plus the first 8 hex digits of the SHA-256 of the exact
//!    original path
//!
//! Step 5 makes the codec injective in practice: folding and stripping are
//! lossy, so two distinct paths (`Résumé.md` / `resume.md`) could otherwise
//! collide on one alias. The suffix depends only on the original path, so
//! `encode` stays deterministic across calls and process restarts.
//!
//! The alias is never decoded back into a path; the sidecar carries the
//! original path out-of-band.

use percent_encoding::percent_encode_byte;
use sha2::{Digest, Sha256};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::newtypes::{Alias, VaultPath};

/// Number of hex digits in the disambiguation suffix
const HASH_SUFFIX_LEN: usize = 8;

/// Encode a vault path into its storage alias
///
/// Pure and total: degenerate inputs (paths that fold to nothing) still
/// yield a valid alias consisting of the hash suffix alone.
#[must_use]
pub fn encode(path: &VaultPath) -> Alias {
    let folded: String = path
        .as_str()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut stem = String::with_capacity(folded.len() + HASH_SUFFIX_LEN + 1);
    for ch in folded.chars() {
        let ch = ch.to_ascii_lowercase();
        match ch {
            'a'..='z' | '0'..='9' | '.' | '_' | '-' => stem.push(ch),
            '/' | ' ' | '%' => {
                let mut buf = [0u8; 4];
                for &b in ch.encode_utf8(&mut buf).as_bytes() {
                    stem.push_str(&percent_encode_byte(b).to_ascii_lowercase());
                }
            }
            // Everything else is lossy-stripped; the hash suffix keeps
            // distinct paths apart.
            _ => {}
        }
    }

    let digest = Sha256::digest(path.as_str().as_bytes());
    let mut suffix = String::with_capacity(HASH_SUFFIX_LEN);
    for byte in &digest[..HASH_SUFFIX_LEN / 2] {
        suffix.push_str(&format!("{byte:02x}"));
    }

    if !stem.is_empty() {
        stem.push('-');
    }
    stem.push_str(&suffix);

    Alias::new(stem).expect("encoder output is always within the safe set")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias_of(path: &str) -> String {
        encode(&VaultPath::new(path).unwrap()).as_str().to_string()
    }

    #[test]
    fn test_encode_is_deterministic() {
        let p = VaultPath::new("notes/Meeting Notes.md").unwrap();
        assert_eq!(encode(&p), encode(&p));
    }

    #[test]
    fn test_encode_folds_diacritics() {
        let a = alias_of("résumé.md");
        assert!(a.starts_with("resume.md-"), "got {a}");
    }

    #[test]
    fn test_encode_lowercases() {
        let a = alias_of("Notes/README.md");
        assert!(a.starts_with("notes%2freadme.md-"), "got {a}");
    }

    #[test]
    fn test_encode_percent_encodes_separators() {
        let a = alias_of("a/b c.md");
        assert!(a.starts_with("a%2fb%20c.md-"), "got {a}");
    }

    #[test]
    fn test_encode_strips_unsafe_characters() {
        let a = alias_of("emoji🎉!.md");
        assert!(a.starts_with("emoji.md-"), "got {a}");
    }

    #[test]
    fn test_encode_degenerate_input_still_valid() {
        // A path that folds to nothing leaves only the hash suffix
        let a = alias_of("🎉");
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_paths_never_collide() {
        // Lossy folding alone would collide these; the suffix keeps them apart
        assert_ne!(alias_of("Résumé.md"), alias_of("resume.md"));
        assert_ne!(alias_of("a b.md"), alias_of("a%20b.md"));
        assert_ne!(alias_of("x🎉.md"), alias_of("x.md"));
    }

    #[test]
    fn test_encode_output_is_storage_safe() {
        for path in ["Über Plan.md", "deep/Nested/Päth/file.TXT", "ファイル.md"] {
            let a = alias_of(path);
            assert!(a.chars().all(Alias::is_safe_char), "unsafe alias: {a}");
        }
    }
}
