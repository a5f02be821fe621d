//! Turn-level streaming events.
//!
//! `TurnEvent` wraps the cumulative reply values of a [`ReplyStream`] into
//! events the gateway forwards to the browser over SSE.
//!
//! [`ReplyStream`]: crate::streamer::ReplyStream

use serde::{Deserialize, Serialize};

/// Events emitted while a turn is in flight.
///
/// - `text`: the whole reply received so far
/// - `done`: the turn finished and was committed
/// - `error`: the turn failed; nothing was committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Cumulative reply text, replacing whatever was shown before.
    Text { content: String },

    /// The stream is complete.
    Done { turn_id: String, reply: String },

    /// The turn failed with a displayable message.
    Error { message: String },
}

impl TurnEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_event_serializes_with_tag() {
        let event = TurnEvent::Text {
            content: "Hi there".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"text""#));
        assert!(json.contains(r#""content":"Hi there""#));
    }

    #[test]
    fn done_event_roundtrip() {
        let event = TurnEvent::Done {
            turn_id: "t-1".into(),
            reply: "ok".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: TurnEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            TurnEvent::Error {
                message: "x".into()
            }
            .event_type(),
            "error"
        );
        assert_eq!(
            TurnEvent::Text {
                content: String::new()
            }
            .event_type(),
            "text"
        );
    }
}
