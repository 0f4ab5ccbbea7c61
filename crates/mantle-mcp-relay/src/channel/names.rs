//! Channel and store key naming.

use mantle_mcp_core::db::unix_millis;

/// Channel on which a session receives inbound calls.
pub fn request_channel(session_id: &str) -> String {
    format!("requests:{session_id}")
}

/// Channel carrying the one reply to a call.
pub fn response_channel(session_id: &str, request_id: &str) -> String {
    format!("responses:{session_id}:{request_id}")
}

/// Store key for one message on `channel`. The uuid suffix keeps two
/// messages published in the same millisecond apart.
pub fn message_key(channel: &str) -> String {
    format!(
        "message:{channel}:{}-{}",
        unix_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names() {
        assert_eq!(request_channel("s1"), "requests:s1");
        assert_eq!(response_channel("s1", "r1"), "responses:s1:r1");
    }

    #[test]
    fn message_keys_are_distinct() {
        let a = message_key("requests:s1");
        let b = message_key("requests:s1");
        assert!(a.starts_with("message:requests:s1:"));
        assert_ne!(a, b);
    }
}
