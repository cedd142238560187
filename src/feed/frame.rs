//! 导入 feed 帧解析
//!
//! 接受三种形状：
//! - `"<string>"`
//! - `{"status": "<string>", "notificationId"?: "<string>"}`
//! - `{"message": "<string>", "notificationId"?: "<string>"}`
//!
//! 无法解析为 JSON 的文本整体作为消息；其它 JSON 形状丢弃。

use serde_json::Value;

/// 解析后的 feed 通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPayload {
    pub message: String,
    pub notification_id: Option<String>,
}

/// 解析入站帧；返回 None 表示丢弃
pub fn parse_frame(text: &str) -> Option<FeedPayload> {
    if text.is_empty() {
        return None;
    }

    let data: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            return Some(FeedPayload {
                message: text.to_string(),
                notification_id: None,
            })
        }
    };

    if let Value::String(message) = data {
        return Some(FeedPayload {
            message,
            notification_id: None,
        });
    }

    let message = data
        .get("status")
        .and_then(Value::as_str)
        .or_else(|| data.get("message").and_then(Value::as_str))?;

    let notification_id = data
        .get("notificationId")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(FeedPayload {
        message: message.to_string(),
        notification_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_string() {
        assert_eq!(
            parse_frame(r#""import started""#),
            Some(FeedPayload {
                message: "import started".to_string(),
                notification_id: None
            })
        );
    }

    #[test]
    fn test_parse_status_object() {
        let payload = parse_frame(r#"{"status":"processing row 12"}"#).unwrap();
        assert_eq!(payload.message, "processing row 12");
        assert!(payload.notification_id.is_none());
    }

    #[test]
    fn test_status_takes_precedence_over_message() {
        let payload = parse_frame(r#"{"status":"s","message":"m","notificationId":"n1"}"#).unwrap();
        assert_eq!(payload.message, "s");
        assert_eq!(payload.notification_id, Some("n1".to_string()));
    }

    #[test]
    fn test_parse_message_object_with_id() {
        let payload = parse_frame(r#"{"message":"done","notificationId":"abc"}"#).unwrap();
        assert_eq!(payload.message, "done");
        assert_eq!(payload.notification_id, Some("abc".to_string()));
    }

    #[test]
    fn test_non_string_notification_id_ignored() {
        let payload = parse_frame(r#"{"message":"done","notificationId":42}"#).unwrap();
        assert!(payload.notification_id.is_none());
    }

    #[test]
    fn test_unaccepted_shapes_discarded() {
        assert_eq!(parse_frame(""), None);
        assert_eq!(parse_frame("42"), None);
        assert_eq!(parse_frame("null"), None);
        assert_eq!(parse_frame(r#"{"status": 3}"#), None);
        assert_eq!(parse_frame(r#"{"other":"x"}"#), None);
        assert_eq!(parse_frame(r#"["a"]"#), None);
    }

    #[test]
    fn test_invalid_json_becomes_message() {
        let payload = parse_frame("plain text update").unwrap();
        assert_eq!(payload.message, "plain text update");
        assert!(payload.notification_id.is_none());
    }
}
