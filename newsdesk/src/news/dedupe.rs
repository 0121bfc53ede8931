use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

use super::NewsItem;

/// Number of title characters that make up the fingerprint
pub const FINGERPRINT_CHARS: usize = 50;

/// Hash of the case-folded, trimmed first 50 characters of a title.
///
/// Distinct titles sharing a 50-char prefix collide; the later one is dropped.
pub fn title_fingerprint(title: &str) -> String {
    let normalized: String = title
        .trim()
        .to_lowercase()
        .chars()
        .take(FINGERPRINT_CHARS)
        .collect();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Keep the first occurrence of each fingerprint, preserving order.
pub fn dedupe(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::with_capacity(items.len());
    let before = items.len();

    let unique: Vec<NewsItem> = items
        .into_iter()
        .filter(|item| seen.insert(title_fingerprint(&item.title)))
        .collect();

    if unique.len() < before {
        debug!("dedupe dropped {} of {} items", before - unique.len(), before);
    }
    unique
}
