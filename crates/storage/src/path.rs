//! Key validation.
//!
//! Every key in this system is generated from a capture date and a source
//! file name (`2021/2021-03-05/photo1.jpg`), so validation can be strict:
//! anything that tries to climb out of the backend root is a bug upstream,
//! not something to normalize away.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage key for security and correctness.
///
/// Rejects empty keys, rooted keys, parent-directory components, and NUL
/// bytes; `.` components and duplicate separators are normalized away.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use shoebox_storage::validate_path;
/// // Valid keys
/// assert!(validate_path("2021/2021-03-05/photo1.jpg").is_ok());
/// assert!(validate_path("years.json").is_ok());
/// // Invalid keys
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("2021/../2022/x.jpg").is_err());
/// assert!(validate_path("/absolute.jpg").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Keys get normalized
/// assert_eq!(
///     validate_path("2021//2021-03-05/./photo1.jpg/").unwrap(),
///     Path::new("2021/2021-03-05/photo1.jpg")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(segment) => {
                // NUL bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls. Reject them explicitly.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(segment);
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => {
                exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()))
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert_eq!(validate(Path::new("2021/2021-03-05/photo1.jpg")).unwrap(), Path::new("2021/2021-03-05/photo1.jpg"));
        assert_eq!(validate(Path::new("2021/dates.json")).unwrap(), Path::new("2021/dates.json"));
        assert_eq!(validate(Path::new("index.html")).unwrap(), Path::new("index.html"));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(validate(Path::new("2021//2021-03-05")).unwrap(), Path::new("2021/2021-03-05"));
        assert_eq!(validate(Path::new("./2021/./dates.json")).unwrap(), Path::new("2021/dates.json"));
        assert_eq!(validate(Path::new("2021/")).unwrap(), Path::new("2021"));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("2021/../2022/x.jpg")).is_err());
        // Even traversal that would stay inside the root is rejected;
        // generated keys never contain parent references.
        assert!(validate(Path::new("2021/2021-03-05/..")).is_err());
        assert!(validate(Path::new("..")).is_err());
    }

    #[test]
    fn test_rooted_rejected() {
        assert!(validate(Path::new("/index.html")).is_err());
        assert!(validate(Path::new("/")).is_err());
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("\0")).is_err());
    }

    #[test]
    fn test_empty_keys() {
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new(".")).is_err());
        assert!(validate(Path::new("./.")).is_err());
    }
}
