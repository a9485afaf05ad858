//! Edit operations and the immutable change records built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CollabError, CollabResult};

/// One edit against the flat document buffer
///
/// Offsets and lengths count Unicode scalar values (`char`s), not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Insert {
        position: usize,
        text: String,
    },
    Delete {
        position: usize,
        length: usize,
    },
    Replace {
        position: usize,
        text: String,
        length: usize,
    },
}

impl Operation {
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Operation::Insert {
            position,
            text: text.into(),
        }
    }

    pub fn delete(position: usize, length: usize) -> Self {
        Operation::Delete { position, length }
    }

    pub fn replace(position: usize, text: impl Into<String>, length: usize) -> Self {
        Operation::Replace {
            position,
            text: text.into(),
            length,
        }
    }

    /// Build an operation from loosely-typed transport fields
    ///
    /// Unknown kinds and missing payloads are rejected as `InvalidOperation`.
    pub fn from_parts(
        kind: &str,
        position: usize,
        text: Option<String>,
        length: Option<usize>,
    ) -> CollabResult<Self> {
        match kind {
            "insert" => {
                let text = text.ok_or_else(|| {
                    CollabError::InvalidOperation("insert requires text".to_string())
                })?;
                Ok(Operation::Insert { position, text })
            }
            "delete" => {
                let length = length.ok_or_else(|| {
                    CollabError::InvalidOperation("delete requires length".to_string())
                })?;
                Ok(Operation::Delete { position, length })
            }
            "replace" => match (text, length) {
                (Some(text), Some(length)) => Ok(Operation::Replace {
                    position,
                    text,
                    length,
                }),
                _ => Err(CollabError::InvalidOperation(
                    "replace requires text and length".to_string(),
                )),
            },
            other => Err(CollabError::InvalidOperation(format!(
                "unknown operation kind '{}'",
                other
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Delete { .. } => "delete",
            Operation::Replace { .. } => "replace",
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Operation::Insert { position, .. }
            | Operation::Delete { position, .. }
            | Operation::Replace { position, .. } => *position,
        }
    }
}

/// An applied operation, immutable once appended to a session's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: String,
    pub author_id: String,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
}

impl Change {
    pub fn new(author_id: impl Into<String>, operation: Operation, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: author_id.into(),
            timestamp,
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_valid() {
        let op = Operation::from_parts("insert", 3, Some("abc".into()), None).unwrap();
        assert_eq!(op, Operation::insert(3, "abc"));

        let op = Operation::from_parts("replace", 0, Some("x".into()), Some(2)).unwrap();
        assert_eq!(op.kind(), "replace");
        assert_eq!(op.position(), 0);
    }

    #[test]
    fn test_from_parts_rejects_malformed() {
        assert!(matches!(
            Operation::from_parts("rename", 0, None, None),
            Err(CollabError::InvalidOperation(_))
        ));
        assert!(Operation::from_parts("delete", 0, Some("x".into()), None).is_err());
        assert!(Operation::from_parts("replace", 0, None, Some(1)).is_err());
    }

    #[test]
    fn test_operation_wire_format() {
        let json = r#"{"type":"delete","position":4,"length":2}"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op, Operation::delete(4, 2));

        let json = serde_json::to_string(&Operation::insert(0, "hi")).unwrap();
        assert!(json.contains("\"type\":\"insert\""));
    }
}
