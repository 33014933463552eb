use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn stable_hash(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// First `len` characters of an id, with an ellipsis when truncated.
pub fn short_id(id: &str, len: usize) -> String {
    let mut chars = id.chars();
    let prefix = chars.by_ref().take(len).collect::<String>();
    if chars.next().is_some() {
        format!("{prefix}…")
    } else {
        prefix
    }
}

/// Index in `0..len` derived from the id; identical ids always land on the
/// same slot.
pub fn stable_index(id: &str, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (stable_hash(id) % len as u64) as usize
}
