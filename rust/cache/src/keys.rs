// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Namespace and entry key derivation.
//!
//! With the `digest` feature every key is a SHA-256 hex string. Without it
//! keys fall back to [`escape`]d literal strings, which keep distinct inputs
//! distinct.

use std::path::Path;

use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Key of the unnamed object of a file
pub const ROOT_OBJECT_KEY: &str = "root-object";

/// Key for an object: digest of its name, or [`ROOT_OBJECT_KEY`].
pub fn object_key(name: Option<&str>) -> String {
    match name {
        Some(name) => named_key(name),
        None => ROOT_OBJECT_KEY.to_string(),
    }
}

/// Namespace for a file, from its contents or its path string.
pub fn namespace_for_file(path: &Path, hash_contents: bool) -> Result<String> {
    if hash_contents {
        namespace_for_contents(path)
    } else {
        Ok(namespace_for_path(path))
    }
}

/// Namespace derived from the path
pub fn namespace_for_path(path: &Path) -> String {
    let bytes = path.as_os_str().as_encoded_bytes();
    #[cfg(feature = "digest")]
    {
        digest(bytes)
    }
    #[cfg(not(feature = "digest"))]
    {
        escape(bytes)
    }
}

/// Namespace derived from the file's bytes, streamed through the hasher
#[cfg(feature = "digest")]
pub fn namespace_for_contents(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Without a digest the contents cannot be summarized; use the path.
#[cfg(not(feature = "digest"))]
pub fn namespace_for_contents(path: &Path) -> Result<String> {
    Ok(namespace_for_path(path))
}

/// Generate a key from bytes (SHA256 hash).
#[cfg(feature = "digest")]
pub fn digest(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(feature = "digest")]
fn named_key(name: &str) -> String {
    digest(name.as_bytes())
}

// Prefixed so a literal name can never collide with ROOT_OBJECT_KEY.
#[cfg(not(feature = "digest"))]
fn named_key(name: &str) -> String {
    format!("o-{}", escape(name.as_bytes()))
}

/// Reversible encoding of arbitrary bytes into `[A-Za-z0-9_-]`.
///
/// ASCII alphanumerics and `-` pass through; every other byte, `_`
/// included, becomes `_` followed by two lowercase hex digits. Empty input
/// encodes as a lone `_`, which no escape sequence can produce.
pub fn escape(value: &[u8]) -> String {
    if value.is_empty() {
        return "_".to_string();
    }
    let mut escaped = String::with_capacity(value.len());
    for &byte in value {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            escaped.push(byte as char);
        } else {
            escaped.push('_');
            escaped.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
            escaped.push(HEX_DIGITS[usize::from(byte & 0x0f)] as char);
        }
    }
    escaped
}

/// Validate cache key to prevent path traversal
pub fn validate_key(key: &str) -> Result<()> {
    // Reject empty keys
    if key.is_empty() {
        return Err(Error::InvalidKey("cache key cannot be empty".to_string()));
    }
    // Only allow alphanumeric, hyphen, underscore (typical hash characters)
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidKey(format!("{:?} contains disallowed characters", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key() {
        assert_eq!(object_key(None), ROOT_OBJECT_KEY);
        assert_ne!(object_key(Some("root-object")), ROOT_OBJECT_KEY);
    }

    #[test]
    fn test_object_keys_are_stable_and_valid() {
        let a = object_key(Some("Cube.001"));
        assert_eq!(a, object_key(Some("Cube.001")));
        assert_ne!(a, object_key(Some("Cube.002")));
        assert!(validate_key(&a).is_ok());
    }

    #[test]
    fn test_names_differing_by_punctuation_get_distinct_keys() {
        let dotted = object_key(Some("Cube.001"));
        let underscored = object_key(Some("Cube_001"));
        assert_ne!(dotted, underscored);
        assert!(validate_key(&dotted).is_ok());
        assert!(validate_key(&underscored).is_ok());
        assert_ne!(object_key(Some("")), ROOT_OBJECT_KEY);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("abc-123_DEF").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("naïve").is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(b"/tmp/cube.obj"), "_2ftmp_2fcube_2eobj");
        assert_eq!(escape(b"a.b"), "a_2eb");
        assert_eq!(escape(b"a_b"), "a_5fb");
        assert_eq!(escape(b"a_2eb"), "a_5f2eb");
        assert_eq!(escape(b"models-01"), "models-01");
        assert_eq!(escape(b""), "_");
        assert!(validate_key(&escape("naïve".as_bytes())).is_ok());
    }

    #[test]
    fn test_path_namespace_is_valid_key() {
        let namespace = namespace_for_path(Path::new("/tmp/models/cube.obj"));
        assert!(validate_key(&namespace).is_ok());
        assert_ne!(namespace, namespace_for_path(Path::new("/tmp/models/sphere.obj")));
        assert_ne!(
            namespace_for_path(Path::new("/m/a.obj")),
            namespace_for_path(Path::new("/m/a_obj"))
        );
    }

    #[cfg(not(feature = "digest"))]
    #[test]
    fn test_literal_keys_keep_punctuation_apart() {
        assert_eq!(object_key(Some("Cube.001")), "o-Cube_2e001");
        assert_eq!(object_key(Some("Cube_001")), "o-Cube_5f001");
        assert_eq!(namespace_for_path(Path::new("/m/a.obj")), "_2fm_2fa_2eobj");
        assert_eq!(namespace_for_path(Path::new("/m/a_obj")), "_2fm_2fa_5fobj");
    }

    #[cfg(feature = "digest")]
    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
