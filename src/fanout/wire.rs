//! JSON frames sent to socket subscribers.

use serde::Serialize;

/// A relayed chat message.
#[derive(Debug, Clone, Serialize)]
pub struct RelayFrame<'a> {
    #[serde(rename = "typeId")]
    pub type_id: u8,
    pub data: &'a str,
}

/// Announcement sent once per connection to prove the relay's identity.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationFrame<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub secret: &'a str,
}

impl<'a> VerificationFrame<'a> {
    pub fn new(secret: &'a str) -> Self {
        Self {
            kind: "verification",
            secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_relay_frame_shape() {
        let frame = serde_json::to_string(&RelayFrame {
            type_id: 1,
            data: "hello \"world\"",
        })
        .unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({ "typeId": 1, "data": "hello \"world\"" }));
    }

    #[test]
    fn test_verification_frame_shape() {
        let frame = serde_json::to_string(&VerificationFrame::new("s3cret")).unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({ "type": "verification", "secret": "s3cret" }));
    }
}
