//! Assembly of the outbound request body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use relay_core::{DispatchError, Part, Role, Turn};

use crate::attachment::Attachment;
use crate::wire::{GenerateRequest, default_safety_settings};

/// Build a generation request: one user turn from `text` plus an
/// inline-data part per attachment, appended after the prior history.
///
/// Empty text with no attachments is rejected before any I/O. An
/// attachment read failure aborts the build, so nothing is ever sent for
/// a request whose inputs could not be fetched.
pub async fn build_request(
    text: &str,
    attachments: &[Attachment],
    history: &[Turn],
) -> Result<GenerateRequest, DispatchError> {
    if text.trim().is_empty() && attachments.is_empty() {
        return Err(DispatchError::EmptyPrompt);
    }

    let mut parts = vec![Part::text(text)];
    for attachment in attachments {
        let bytes = attachment.read_bytes().await?;
        parts.push(Part::inline_data(attachment.mime_type(), STANDARD.encode(bytes)));
    }

    let mut contents = history.to_vec();
    contents.push(Turn::new(Role::User, parts));

    Ok(GenerateRequest {
        contents,
        safety_settings: default_safety_settings(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_only_request() {
        let request = build_request("hello", &[], &[]).await.unwrap();
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role, Role::User);
        assert_eq!(request.contents[0].parts, vec![Part::text("hello")]);
        assert_eq!(request.safety_settings.len(), 4);
    }

    #[tokio::test]
    async fn test_history_precedes_new_turn() {
        let history = vec![Turn::user("earlier"), Turn::model("reply")];
        let request = build_request("now", &[], &history).await.unwrap();

        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].text(), "earlier");
        assert_eq!(request.contents[1].text(), "reply");
        assert_eq!(request.contents[2].text(), "now");
    }

    #[tokio::test]
    async fn test_attachments_become_base64_inline_parts() {
        let attachment = Attachment::from_bytes("image/png", b"ABC".to_vec());
        let request = build_request("see", &[attachment], &[]).await.unwrap();

        let parts = &request.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], Part::text("see"));
        assert_eq!(parts[1], Part::inline_data("image/png", "QUJD"));
    }

    #[tokio::test]
    async fn test_attachment_order_preserved() {
        let attachments = vec![
            Attachment::from_bytes("image/png", b"A".to_vec()),
            Attachment::from_bytes("image/jpeg", b"B".to_vec()),
        ];
        let request = build_request("two", &attachments, &[]).await.unwrap();

        let parts = &request.contents[0].parts;
        assert_eq!(parts[1], Part::inline_data("image/png", "QQ=="));
        assert_eq!(parts[2], Part::inline_data("image/jpeg", "Qg=="));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        assert!(matches!(
            build_request("", &[], &[]).await.unwrap_err(),
            DispatchError::EmptyPrompt
        ));
        assert!(matches!(
            build_request("   ", &[], &[]).await.unwrap_err(),
            DispatchError::EmptyPrompt
        ));
    }

    #[tokio::test]
    async fn test_empty_text_with_attachment_allowed() {
        let attachment = Attachment::from_bytes("image/png", b"A".to_vec());
        let request = build_request("", &[attachment], &[]).await.unwrap();
        assert_eq!(request.contents[0].parts.len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_attachment_aborts_build() {
        let attachment = Attachment::from_path("image/png", "/no/such/file");
        let err = build_request("text", &[attachment], &[]).await.unwrap_err();
        assert!(matches!(err, DispatchError::AttachmentRead { .. }));
    }
}
