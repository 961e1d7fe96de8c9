/*!
Mapping of (store root, collection, identifier) to storage paths.

Layout:
- a whole collection lives at `<root>/<collection>`
- one record lives at `<root>/<collection>/<identifier>.json`

The collection name is lower-cased; nothing else is escaped, which is why
identifiers go through [`validate_identifier`] before they reach a path.
*/

use crate::{Result, StoreError};

/// Store root used when a store is built without an explicit name.
pub const DEFAULT_ROOT: &str = "xmari0";

/// File extension of a single-record document.
pub const RECORD_EXTENSION: &str = "json";

/// Resolve the storage path for a collection, or for one record in it.
///
/// Pure and deterministic: identical arguments always give the identical path.
///
/// # Example
/// ```rust
/// use shelf_core::path::resolve;
///
/// assert_eq!(resolve("app", "Message", None), "app/message");
/// assert_eq!(resolve("app", "Message", Some("42")), "app/message/42.json");
/// ```
pub fn resolve(root: &str, type_tag: &str, id: Option<&str>) -> String {
    let tag = type_tag.to_lowercase();
    match id {
        Some(id) => format!("{root}/{tag}/{id}.{RECORD_EXTENSION}"),
        None => format!("{root}/{tag}"),
    }
}

/// Reject identifiers that could escape their collection directory or hide in it.
///
/// Empty identifiers, identifiers starting with `.`, and identifiers containing
/// `/`, `\` or control characters are refused.
pub fn validate_identifier(id: &str) -> Result<()> {
    let hidden = id.is_empty() || id.starts_with('.');
    let forbidden = id.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if hidden || forbidden {
        return Err(StoreError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// Reject store roots that would not stay inside the storage base.
///
/// A root must be a non-empty relative `/`-separated path without empty,
/// `.` or `..` segments and without `\`.
///
/// # Example
/// ```rust
/// use shelf_core::path::validate_root;
///
/// assert!(validate_root("app/v2").is_ok());
/// assert!(validate_root("../elsewhere").is_err());
/// ```
pub fn validate_root(root: &str) -> Result<()> {
    if root.is_empty() {
        return Err(StoreError::validation("Store root must not be empty"));
    }
    if root.starts_with('/') || root.contains('\\') {
        return Err(StoreError::validation(format!(
            "Store root must be a relative '/'-separated path: {root}"
        )));
    }
    let bad_segment = |segment: &str| segment.is_empty() || segment == "." || segment == "..";
    if root.split('/').any(bad_segment) {
        return Err(StoreError::validation(format!(
            "Store root contains an empty or relative segment: {root}"
        )));
    }
    Ok(())
}

/// Recover the identifier from a record file name (`42.json` -> `42`).
pub fn identifier_from_file_name(name: &str) -> Option<&str> {
    name.strip_suffix(RECORD_EXTENSION)?
        .strip_suffix('.')
        .filter(|id| !id.is_empty())
}
