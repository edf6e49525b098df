//! Inbound webhook parsing and auth. Grounded on the provider's
//! Messenger/WhatsApp-style envelope: `entry[].changes[].value.messages[]`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("missing signature header")]
    MissingSignature,
    #[error("malformed signature header")]
    MalformedSignature,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("invalid hmac key")]
    InvalidKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub from: String,
    pub text: String,
}

#[derive(Deserialize)]
struct Envelope {
    entry: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    changes: Vec<Change>,
}

#[derive(Deserialize)]
struct Change {
    field: String,
    value: ChangeValue,
}

#[derive(Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    from: String,
    text: WireText,
}

#[derive(Deserialize)]
struct WireText {
    body: String,
}

/// Parses the provider's webhook envelope into flat inbound
/// messages. Non-`messages` change fields (delivery receipts, etc.) are
/// silently skipped — only text messages drive the window state machine.
pub fn parse_webhook_payload(body: &[u8]) -> Result<Vec<InboundMessage>, WebhookError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidJson(e.to_string()))?;

    let mut messages = Vec::new();
    for entry in envelope.entry {
        for change in entry.changes {
            if change.field != "messages" {
                continue;
            }
            for m in change.value.messages {
                messages.push(InboundMessage {
                    from: m.from,
                    text: m.text.body,
                });
            }
        }
    }
    Ok(messages)
}

/// Verifies `X-Hub-Signature-256: sha256=<hex>` over the raw body. All POST
/// bodies are signature-verified with HMAC-SHA-256; mismatches return 401.
pub fn verify_signature(body: &[u8], signature_header: &str, secret: &str) -> Result<(), WebhookError> {
    let sig_hex = signature_header
        .strip_prefix("sha256=")
        .ok_or(WebhookError::MalformedSignature)?;
    let expected = hex::decode(sig_hex).map_err(|_| WebhookError::MalformedSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidKey)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| WebhookError::SignatureMismatch)
}

/// GET verification handshake: on `hub.verify_token` match, the caller
/// echoes `hub.challenge` with 200.
pub fn verify_challenge(mode: &str, verify_token: &str, expected_token: &str, challenge: &str) -> Option<String> {
    if mode == "subscribe" && verify_token == expected_token {
        Some(challenge.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_text_message_envelope() {
        let body = br#"{"entry":[{"changes":[{"field":"messages","value":{"messages":[
            {"from":"+2348012345678","text":{"body":"hello"}}
        ]}}]}]}"#;
        let messages = parse_webhook_payload(body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].from, "+2348012345678");
        assert_eq!(messages[0].text, "hello");
    }

    #[test]
    fn non_messages_change_fields_are_skipped() {
        let body = br#"{"entry":[{"changes":[{"field":"message_deliveries","value":{}}]}]}"#;
        let messages = parse_webhook_payload(body).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn valid_signature_verifies() {
        let body = b"{\"a\":1}";
        let secret = "shh";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        let header = format!("sha256={sig}");
        assert!(verify_signature(body, &header, secret).is_ok());
    }

    #[test]
    fn tampered_body_fails_verification() {
        let body = b"{\"a\":1}";
        let secret = "shh";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        let header = format!("sha256={sig}");
        assert!(verify_signature(b"{\"a\":2}", &header, secret).is_err());
    }

    #[test]
    fn challenge_echoes_only_on_token_match() {
        assert_eq!(
            verify_challenge("subscribe", "secret", "secret", "123"),
            Some("123".to_string())
        );
        assert_eq!(verify_challenge("subscribe", "wrong", "secret", "123"), None);
    }
}
