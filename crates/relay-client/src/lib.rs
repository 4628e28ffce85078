//! Outbound client for the generative-content API: payload assembly,
//! wire codec, and the credential-rotating request dispatcher.

pub mod attachment;
pub mod dispatcher;
pub mod payload;
pub mod wire;

pub use attachment::{Attachment, AttachmentSource};
pub use dispatcher::Dispatcher;
pub use payload::build_request;
pub use wire::{GenerateRequest, SafetySetting, extract_text};
