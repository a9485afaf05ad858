//! Document model - pure mutation of the shared buffer
//!
//! Positions and lengths are measured in `char`s. Out-of-range values are
//! clamped to the buffer instead of being rejected, so every operation
//! produces a well-formed document.

use crate::types::{Change, Operation};

/// Apply one operation to `content`, returning the new buffer
pub fn apply_operation(content: &str, operation: &Operation) -> String {
    match operation {
        Operation::Insert { position, text } => splice(content, *position, 0, text),
        Operation::Delete { position, length } => splice(content, *position, *length, ""),
        Operation::Replace {
            position,
            text,
            length,
        } => splice(content, *position, *length, text),
    }
}

/// Fold a sequence of changes over a seed, in order
pub fn fold_changes<'a, I>(seed: &str, changes: I) -> String
where
    I: IntoIterator<Item = &'a Change>,
{
    changes
        .into_iter()
        .fold(seed.to_string(), |content, change| {
            apply_operation(&content, &change.operation)
        })
}

/// Number of chars in the buffer
pub fn char_len(content: &str) -> usize {
    content.chars().count()
}

/// content[..pos] + text + content[pos + remove..], with both ends clamped
fn splice(content: &str, position: usize, remove: usize, text: &str) -> String {
    let start = byte_offset(content, position);
    let end = byte_offset(content, position.saturating_add(remove));

    let mut out = String::with_capacity(content.len() - (end - start) + text.len());
    out.push_str(&content[..start]);
    out.push_str(text);
    out.push_str(&content[end..]);
    out
}

/// Byte index of the `chars`-th char, or the end of the buffer
fn byte_offset(content: &str, chars: usize) -> usize {
    content
        .char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(content.len())
}
