//! Relative path validation.
//!
//! Every path handed to a backend is relative to that backend's root. Book
//! metadata ends up in library paths, so a title like `../../etc/passwd`
//! must never reach the filesystem as-is.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Normalize a backend-relative path, rejecting anything that escapes the
/// root or resolves to nothing.
///
/// `.` segments, repeated separators and trailing slashes disappear. `..`
/// is fine as long as it never climbs above the root. Null bytes are
/// rejected; backslashes and non-UTF-8 bytes are left to the platform.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use libris_storage::validate_path;
///
/// assert!(validate_path("B/Dan_Brown/Dan_Brown-Inferno.epub").is_ok());
/// assert!(validate_path("incoming/../inferno.epub").is_ok());
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("incoming/./thrillers//inferno.epub/").unwrap(),
///     Path::new("incoming/thrillers/inferno.epub")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            // Null bytes survive `components()` on Unix but truncate paths in syscalls.
            Component::Normal(s) if s.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(s) => components.push(s),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                components.pop().ok_or_else(invalid)?;
            },
        }
    }
    match components.is_empty() {
        true => Err(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("B/Dan_Brown/Dan_Brown-Inferno.epub", "B/Dan_Brown/Dan_Brown-Inferno.epub")]
    #[case("inferno.epub", "inferno.epub")]
    #[case("/inferno.epub", "inferno.epub")]
    #[case("incoming//thrillers///inferno.epub", "incoming/thrillers/inferno.epub")]
    #[case("./incoming/./inferno.epub", "incoming/inferno.epub")]
    #[case("incoming/thrillers/", "incoming/thrillers")]
    #[case("incoming/thrillers/..", "incoming")]
    #[case("a/../b/../inferno.epub", "inferno.epub")]
    fn test_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case::escapes_root("../etc/passwd")]
    #[case::escapes_later("incoming/../../inferno.epub")]
    #[case::only_parents("../..")]
    #[case::null_byte("inferno\0.epub")]
    #[case::empty("")]
    #[case::only_dots("./.")]
    #[case::only_slashes("//")]
    fn test_invalid(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[cfg(windows)]
    #[test]
    fn test_backslashes_are_separators() {
        assert_eq!(validate("incoming\\inferno.epub").unwrap(), Path::new("incoming/inferno.epub"));
    }
}
