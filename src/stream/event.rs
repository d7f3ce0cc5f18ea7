//! Streamed chat records.
//!
//! Each line of the chat body is one JSON object:
//! `{ "type": string, "delta"?: any, "section"?: string }`.
//! Known `type` tags map onto [`StreamEvent`] variants; anything else
//! becomes [`StreamEvent::Unknown`] so it can still be surfaced.

use serde::Deserialize;
use serde_json::Value;

/// Section name used by retrieval records that do not name one.
pub const DEFAULT_RETRIEVE_SECTION: &str = "retrieve";

/// Tags with a dedicated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RetrieveStart,
    RetrieveEnd,
    Thinking,
    Answer,
    Done,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::RetrieveStart,
        EventKind::RetrieveEnd,
        EventKind::Thinking,
        EventKind::Answer,
        EventKind::Done,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            EventKind::RetrieveStart => "retrieve_start",
            EventKind::RetrieveEnd => "retrieve_end",
            EventKind::Thinking => "thinking",
            EventKind::Answer => "answer",
            EventKind::Done => "done",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    RetrieveStart { section: String, payload: String },
    RetrieveEnd { section: String, payload: String },
    Thinking(String),
    Answer(String),
    Done,
    Unknown {
        kind: String,
        section: Option<String>,
        payload: String,
    },
}

impl StreamEvent {
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            StreamEvent::RetrieveStart { .. } => Some(EventKind::RetrieveStart),
            StreamEvent::RetrieveEnd { .. } => Some(EventKind::RetrieveEnd),
            StreamEvent::Thinking(_) => Some(EventKind::Thinking),
            StreamEvent::Answer(_) => Some(EventKind::Answer),
            StreamEvent::Done => Some(EventKind::Done),
            StreamEvent::Unknown { .. } => None,
        }
    }
}

/// Wire shape of one record.
#[derive(Deserialize, Debug)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Value,
    #[serde(default)]
    section: Option<String>,
}

/// Renders a `delta` payload as text: strings verbatim, `null` as empty,
/// anything else as compact JSON.
fn payload_text(delta: Value) -> String {
    match delta {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parses one framed line into an event.
pub fn parse_line(line: &str) -> Result<StreamEvent, serde_json::Error> {
    let record: RawRecord = serde_json::from_str(line)?;
    let payload = payload_text(record.delta);
    let section = record
        .section
        .filter(|s| !s.is_empty());

    let event = match EventKind::from_tag(&record.kind) {
        Some(EventKind::RetrieveStart) => StreamEvent::RetrieveStart {
            section: section.unwrap_or_else(|| DEFAULT_RETRIEVE_SECTION.to_string()),
            payload,
        },
        Some(EventKind::RetrieveEnd) => StreamEvent::RetrieveEnd {
            section: section.unwrap_or_else(|| DEFAULT_RETRIEVE_SECTION.to_string()),
            payload,
        },
        Some(EventKind::Thinking) => StreamEvent::Thinking(payload),
        Some(EventKind::Answer) => StreamEvent::Answer(payload),
        Some(EventKind::Done) => StreamEvent::Done,
        None => StreamEvent::Unknown {
            kind: record.kind,
            section,
            payload,
        },
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_round_trips_its_tag() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.tag()), Some(kind));
            let line = format!(r#"{{"type":"{}"}}"#, kind.tag());
            assert_eq!(parse_line(&line).unwrap().kind(), Some(kind));
        }
    }

    #[test]
    fn test_answer_and_thinking_payloads() {
        assert_eq!(
            parse_line(r#"{"type":"answer","delta":"Hello"}"#).unwrap(),
            StreamEvent::Answer("Hello".into())
        );
        assert_eq!(
            parse_line(r#"{"type":"thinking","delta":"hmm"}"#).unwrap(),
            StreamEvent::Thinking("hmm".into())
        );
    }

    #[test]
    fn test_retrieve_section_defaults() {
        assert_eq!(
            parse_line(r#"{"type":"retrieve_start","delta":"searching"}"#).unwrap(),
            StreamEvent::RetrieveStart {
                section: "retrieve".into(),
                payload: "searching".into()
            }
        );
        assert_eq!(
            parse_line(r#"{"type":"retrieve_end","section":"web","delta":null}"#).unwrap(),
            StreamEvent::RetrieveEnd {
                section: "web".into(),
                payload: String::new()
            }
        );
    }

    #[test]
    fn test_structured_delta_is_rendered_as_json() {
        let event = parse_line(r#"{"type":"retrieve_end","delta":{"hits":3}}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::RetrieveEnd {
                section: "retrieve".into(),
                payload: r#"{"hits":3}"#.into()
            }
        );
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let event = parse_line(r#"{"type":"rerank","delta":"top 5","section":"rank"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Unknown {
                kind: "rerank".into(),
                section: Some("rank".into()),
                payload: "top 5".into()
            }
        );
        assert_eq!(event.kind(), None);
    }

    #[test]
    fn test_malformed_lines_are_errors() {
        assert!(parse_line("{\"type\":\"ans").is_err());
        assert!(parse_line(r#"{"delta":"no type"}"#).is_err());
        assert!(parse_line("not json").is_err());
    }
}
