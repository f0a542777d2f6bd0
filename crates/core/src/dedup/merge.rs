//! Merging an incoming record into the existing duplicate it matched.

use crate::catalog::Tags;

/// Header of the section new biographical text is appended under.
pub const ADDITIONAL_INFO_HEADER: &str = "## Additional Information";

/// Merge `incoming` tags into `existing`. Existing values win on conflict.
///
/// Returns the merged set and the number of keys that were added.
pub fn merge_tags(existing: &Tags, incoming: &Tags) -> (Tags, u32) {
    let mut merged = existing.clone();
    let mut added = 0;
    for (key, value) in incoming {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
            added += 1;
        }
    }
    (merged, added)
}

/// Append new biographical text under an "additional information" section.
///
/// Returns `None` when the existing text already contains the new text or
/// there is nothing new to add.
pub fn merge_bio(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    let incoming = incoming.map(str::trim).filter(|s| !s.is_empty())?;

    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        None => Some(incoming.to_string()),
        Some(current) if current.contains(incoming) => None,
        Some(current) => Some(format!(
            "{}\n\n{}\n\n{}",
            current, ADDITIONAL_INFO_HEADER, incoming
        )),
    }
}
