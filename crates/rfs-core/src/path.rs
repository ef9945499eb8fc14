//! Path tokenization.
//!
//! Paths are absolute, `/`-separated, with repeated separators collapsed.
//! The full-path and per-component ceilings are enforced here so the
//! traversal loop only ever sees valid components.

use rfs_error::{Result, RfsError};
use rfs_types::{NAME_MAX, PATH_MAX};

/// Split `path` into components.
///
/// `"/"` (and any all-separator path) yields an empty component list;
/// callers that special-case the root check for that before traversing.
pub(crate) fn split(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(RfsError::NoEntry);
    }
    if path.len() > PATH_MAX {
        return Err(RfsError::NameTooLong);
    }

    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    for component in &components {
        if component.len() > NAME_MAX {
            return Err(RfsError::NameTooLong);
        }
    }
    Ok(components)
}
