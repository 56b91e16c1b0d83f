//! Path prefix matching.
//!
//! # Design Decisions
//! - Prefixes are compared byte-for-byte, case-sensitive, never normalized
//! - The longest matching prefix wins; that is the only ordering rule
//! - Linear scan over registered prefixes (clusters are few)

/// Return the longest entry of `prefixes` that `path` starts with.
pub fn longest_prefix<'a, I>(prefixes: I, path: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    prefixes
        .into_iter()
        .filter(|prefix| path.starts_with(prefix))
        .max_by_key(|prefix| prefix.len())
}
