//! ============================================================================
//! Conversation Export - Parsing for bulk memory import
//! ============================================================================
//! Reads a chat export: a JSON array of conversations, each with an optional
//! `mapping` of message-id → message data. Text lives in
//! `message.content.parts`; every non-blank string part is one fragment.
//! Non-string parts, blank strings and conversations without a mapping are
//! skipped. Other fields (titles, authors, timestamps) are ignored.
//! ============================================================================

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Errors raised while reading an export document
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Export is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Export is not a valid conversation list: {0}")]
    Json(#[from] serde_json::Error),
}

/// A whole export file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ConversationExport {
    pub conversations: Vec<Conversation>,
}

/// One conversation in the export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Conversation {
    /// Message id → node, in document order
    #[serde(default)]
    pub mapping: Option<MessageMapping>,
}

/// The `mapping` object of a conversation. Entries keep the order they have
/// in the file; message ids are opaque and say nothing about turn order.
#[derive(Debug, Clone, Default)]
pub struct MessageMapping(pub Vec<(String, MessageNode)>);

impl MessageMapping {
    pub fn nodes(&self) -> impl Iterator<Item = &MessageNode> + '_ {
        self.0.iter().map(|(_, node)| node)
    }
}

impl<'de> Deserialize<'de> for MessageMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = MessageMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of message id to message node")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, MessageNode>()? {
                    entries.push(entry);
                }
                Ok(MessageMapping(entries))
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// A node in the mapping; root/system nodes carry no message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageNode {
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: Option<MessageContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageContent {
    /// Strings for text, objects for images/attachments
    #[serde(default)]
    pub parts: Option<Vec<Value>>,
}

impl ConversationExport {
    /// Parse an uploaded export
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConversationError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(serde_json::from_str(text)?)
    }

    /// All importable fragments, trimmed, in export order
    pub fn fragments(&self) -> impl Iterator<Item = &str> + '_ {
        self.conversations.iter().flat_map(|c| c.fragments())
    }

    /// Number of importable fragments
    pub fn count_fragments(&self) -> usize {
        self.conversations.iter().map(|c| c.fragments().count()).sum()
    }
}

impl Conversation {
    /// Importable fragments of this conversation
    pub fn fragments(&self) -> impl Iterator<Item = &str> + '_ {
        self.mapping
            .iter()
            .flat_map(|mapping| mapping.nodes())
            .filter_map(|node| node.message.as_ref()?.content.as_ref()?.parts.as_ref())
            .flatten()
            .filter_map(|part| part.as_str())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"[
        {
            "title": "Trip planning",
            "mapping": {
                "root": { "message": null, "parent": null, "children": ["a"] },
                "a": { "message": { "author": {"role": "user"},
                        "content": { "content_type": "text", "parts": ["  Plan a trip to Paris  "] } } },
                "b": { "message": { "content": { "parts": ["", "   ", {"asset": "img"}, 42, "Sure, here is a plan"] } } },
                "c": { "message": { "content": { "content_type": "code" } } },
                "d": {}
            }
        },
        { "title": "No mapping here" },
        { "mapping": { "x": { "message": { "content": { "parts": ["Second conversation"] } } } } }
    ]"#;

    #[test]
    fn test_fragments_skip_blank_and_non_strings() {
        let export = ConversationExport::from_slice(EXPORT.as_bytes()).unwrap();
        let fragments: Vec<&str> = export.fragments().collect();
        assert_eq!(
            fragments,
            vec!["Plan a trip to Paris", "Sure, here is a plan", "Second conversation"]
        );
        assert_eq!(export.count_fragments(), 3);
    }

    #[test]
    fn test_conversation_without_mapping_contributes_nothing() {
        let export = ConversationExport::from_slice(br#"[{"title": "empty"}, {}]"#).unwrap();
        assert_eq!(export.conversations.len(), 2);
        assert_eq!(export.count_fragments(), 0);
    }

    #[test]
    fn test_fragments_keep_document_order() {
        let export = ConversationExport::from_slice(
            br#"[{"mapping": {
                "z": {"message": {"content": {"parts": ["first"]}}},
                "a": {"message": {"content": {"parts": ["second"]}}},
                "m": {"message": {"content": {"parts": ["third"]}}}
            }}]"#,
        )
        .unwrap();
        let fragments: Vec<&str> = export.fragments().collect();
        assert_eq!(fragments, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unusual_titles_are_ignored() {
        let export = ConversationExport::from_slice(
            br#"[
                {"title": 5, "mapping": {"a": {"message": {"content": {"parts": ["hi"]}}}}},
                {"title": {"nested": true}, "mapping": null}
            ]"#,
        )
        .unwrap();
        assert_eq!(export.fragments().collect::<Vec<_>>(), vec!["hi"]);
    }

    #[test]
    fn test_mapping_must_be_an_object() {
        assert!(matches!(
            ConversationExport::from_slice(br#"[{"mapping": ["not", "a", "map"]}]"#),
            Err(ConversationError::Json(_))
        ));
    }

    #[test]
    fn test_empty_export() {
        let export = ConversationExport::from_slice(b"[]").unwrap();
        assert_eq!(export.count_fragments(), 0);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            ConversationExport::from_slice(b"{\"not\": \"a list\"}"),
            Err(ConversationError::Json(_))
        ));
        assert!(matches!(
            ConversationExport::from_slice(&[0xff, 0xfe, 0x00]),
            Err(ConversationError::Encoding(_))
        ));
    }
}
