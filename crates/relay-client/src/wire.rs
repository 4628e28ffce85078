//! Request/response bodies as the upstream API serializes them.

use serde::{Deserialize, Serialize};

use relay_core::{DispatchError, Turn};

/// Body of a generation request: the full ordered turn sequence plus the
/// fixed safety block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Turn>,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// The fixed safety policy: every harm category the upstream knows, at
/// the least restrictive threshold. Not configurable per call.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
        "HARM_CATEGORY_HARASSMENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_NONE".to_string(),
    })
    .collect()
}

// Response records keep every level optional so shape problems surface as
// typed extraction errors rather than serde failures with opaque paths.

#[derive(Debug, Deserialize)]
struct ResponseRecord {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Parse a response body (a JSON array of records) and concatenate the
/// first candidate's first part's text across records, in record order.
///
/// Any missing step of the extraction path is a shape error naming the
/// record it failed in.
pub fn extract_text(body: &str) -> Result<String, DispatchError> {
    let records: Vec<ResponseRecord> =
        serde_json::from_str(body).map_err(|err| DispatchError::ResponseShape {
            detail: format!("invalid JSON: {err}"),
        })?;

    let mut reply = String::new();
    for (index, record) in records.iter().enumerate() {
        let text = record
            .candidates
            .as_deref()
            .and_then(<[Candidate]>::first)
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.as_deref())
            .and_then(<[CandidatePart]>::first)
            .and_then(|part| part.text.as_deref())
            .ok_or_else(|| DispatchError::ResponseShape {
                detail: format!("missing candidates[0].content.parts[0].text in record {index}"),
            })?;
        reply.push_str(text);
    }
    Ok(reply)
}
