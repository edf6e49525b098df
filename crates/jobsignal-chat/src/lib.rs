//! Chat Provider external interface: inbound webhook parsing and
//! signature verification, outbound send, and the fixed message templates
//! rendered before every send.

pub mod inbound;
pub mod sender;
pub mod templates;

pub use inbound::{parse_webhook_payload, verify_challenge, verify_signature, InboundMessage, WebhookError};
pub use sender::{ChatSender, HttpChatSender};
pub use templates::{render_job_alert, render_preference_confirmation, render_reminder, render_welcome};
