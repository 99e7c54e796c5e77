//! Inbound WebSocket message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DEFAULT_GROUP;

/// Client message types
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Handshake assigning the connection to a group
    ClientReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_group: Option<String>,
    },

    /// Any other `type`; no protocol is defined for it
    #[serde(other)]
    Unknown,
}

/// What the listener should do with a text frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Join this group
    Ready { group: String },
    /// Well-formed JSON with no meaning here
    Ignored,
}

/// Parse a text frame
///
/// Only text that is not JSON at all is an error; any JSON that is not a
/// recognized handshake is [`Inbound::Ignored`].
pub fn parse_message(text: &str) -> Result<Inbound, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    Ok(match serde_json::from_value::<ClientMessage>(value) {
        Ok(ClientMessage::ClientReady { user_group }) => Inbound::Ready {
            group: user_group.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
        },
        Ok(ClientMessage::Unknown) | Err(_) => Inbound::Ignored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_with_group() {
        let msg = parse_message(r#"{"type":"client_ready","user_group":"g1"}"#).unwrap();
        assert_eq!(msg, Inbound::Ready { group: "g1".into() });
    }

    #[test]
    fn test_handshake_defaults_group() {
        for text in [
            r#"{"type":"client_ready"}"#,
            r#"{"type":"client_ready","user_group":null}"#,
        ] {
            assert_eq!(
                parse_message(text).unwrap(),
                Inbound::Ready { group: "default".into() },
                "{text}"
            );
        }
    }

    #[test]
    fn test_group_name_is_kept_literally() {
        let msg = parse_message(r#"{"type":"client_ready","user_group":"  "}"#).unwrap();
        assert_eq!(msg, Inbound::Ready { group: "  ".into() });

        let msg = parse_message(r#"{"type":"client_ready","user_group":" Ops "}"#).unwrap();
        assert_eq!(msg, Inbound::Ready { group: " Ops ".into() });
    }

    #[test]
    fn test_other_shapes_are_ignored() {
        for text in [
            r#"{"type":"ping"}"#,
            r#"{"hello":"world"}"#,
            r#"{"type":"client_ready","user_group":5}"#,
            r#"[1,2,3]"#,
            r#"42"#,
        ] {
            assert_eq!(parse_message(text).unwrap(), Inbound::Ignored, "{text}");
        }
    }

    #[test]
    fn test_non_json_is_error() {
        assert!(parse_message("not-json").is_err());
        assert!(parse_message("").is_err());
    }
}
