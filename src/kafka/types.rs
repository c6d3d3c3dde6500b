use msgproc_error::DecodeError;
use serde::{Deserialize, Serialize};

/// Wire envelope carried on the relay topic.
///
/// Serialized as `{"msg": <content>, "msgID": <id>}`. The id always refers to
/// a row committed before the envelope was published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(rename = "msg")]
    pub content: String,

    #[serde(rename = "msgID")]
    pub id: i64,
}

impl MessageEnvelope {
    pub fn new(id: i64, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            id,
        }
    }

    /// Partition key; redeliveries of an id stay on one partition
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode and validate a consumed payload
    pub fn decode(payload: Option<&[u8]>) -> Result<Self, DecodeError> {
        let payload = match payload {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(DecodeError::EmptyPayload),
        };

        let envelope: MessageEnvelope = serde_json::from_slice(payload)?;
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.id <= 0 {
            return Err(DecodeError::Invalid(format!(
                "msgID must be positive, got {}",
                self.id
            )));
        }
        Ok(())
    }
}

/// Where the broker placed an acknowledged record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub partition: i32,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let envelope = MessageEnvelope::new(7, "  hello  ");
        let json: serde_json::Value = serde_json::from_slice(&envelope.encode().unwrap()).unwrap();

        assert_eq!(json["msg"], "  hello  ");
        assert_eq!(json["msgID"], 7);
        assert_eq!(envelope.key(), "7");
    }

    #[test]
    fn test_decode_accepts_producer_payload() {
        let envelope = MessageEnvelope::decode(Some(br#"{"msg":"hi","msgID":3}"#)).unwrap();
        assert_eq!(envelope, MessageEnvelope::new(3, "hi"));
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(matches!(
            MessageEnvelope::decode(None),
            Err(DecodeError::EmptyPayload)
        ));
        assert!(matches!(
            MessageEnvelope::decode(Some(b"")),
            Err(DecodeError::EmptyPayload)
        ));
        assert!(matches!(
            MessageEnvelope::decode(Some(b"not json")),
            Err(DecodeError::Malformed(_))
        ));
        // content missing
        assert!(matches!(
            MessageEnvelope::decode(Some(br#"{"msgID":3}"#)),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            MessageEnvelope::decode(Some(br#"{"msg":"hi","msgID":0}"#)),
            Err(DecodeError::Invalid(_))
        ));
    }
}
