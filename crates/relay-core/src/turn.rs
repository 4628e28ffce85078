//! Conversation turns in the upstream wire vocabulary.
//!
//! A turn is one role-tagged unit of conversation. Its parts serialize
//! exactly as the generative-content API expects them: `{"text": ...}` for
//! text fragments, `{"inlineData": {"mimeType": ..., "data": ...}}` for
//! base64-encoded binary fragments. The same types are used for the live
//! request body and for the persisted per-actor history blobs.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inline binary payload, base64-encoded and tagged with its MIME type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineBlob {
    pub mime_type: String,
    pub data: String,
}

/// One content fragment of a turn.
///
/// Untagged: the presence of `text` vs `inlineData` selects the variant,
/// matching the upstream JSON where parts carry exactly one of the two.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineBlob,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineBlob {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    /// The text of this part, if it is a text fragment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineData { .. } => None,
        }
    }
}

/// One role-tagged unit of conversation with its ordered content fragments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Single-text-part user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Single-text-part model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Concatenated text of all text fragments in this turn.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
