//! JSON serialization for frames.

use super::types::{InboundFrame, OutboundFrame};

/// Serialize an outbound frame.
pub fn serialize_outbound(frame: &OutboundFrame) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}

/// Deserialize an inbound frame.
pub fn deserialize_inbound(text: &str) -> Result<InboundFrame, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::types::NotificationId;

    #[test]
    fn test_inbound_frames() {
        assert_eq!(
            deserialize_inbound(r#"{"type":"pong"}"#).unwrap(),
            InboundFrame::Pong
        );
        assert_eq!(
            deserialize_inbound(r#"{"type":"ping"}"#).unwrap(),
            InboundFrame::Ping
        );
        let id = NotificationId::new();
        let raw = format!(r#"{{"type":"mark_read","data":{{"id":"{id}"}}}}"#);
        assert_eq!(
            deserialize_inbound(&raw).unwrap(),
            InboundFrame::MarkRead { id }
        );
        assert!(deserialize_inbound(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_outbound_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&serialize_outbound(&OutboundFrame::ping()).unwrap()).unwrap();
        assert_eq!(json["type"], "ping");
        assert!(json["data"]["timestamp"].is_i64());
    }
}
