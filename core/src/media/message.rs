//! Tolerant reading and writing of cross-document frame messages.
//!
//! The embed's message contract is undocumented, so several shapes are
//! accepted for each logical signal and anything unrecognized is ignored.

use serde_json::{Map, Value, json};
use url::Url;

use crate::host::MessagePayload;
use crate::video::PlayerState;

/// A logical signal recovered from an inbound message
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FrameSignal {
    Ready,
    State(PlayerState),
    Time(f64),
}

const LABEL_KEYS: [&str; 5] = ["event", "type", "status", "state", "playerState"];
const TIME_KEYS: [&str; 4] = ["currentTime", "time", "position", "seconds"];
const NESTED_KEYS: [&str; 4] = ["info", "data", "value", "payload"];

/// Extract the signals carried by a payload. Malformed payloads yield none.
pub(crate) fn parse(payload: &MessagePayload) -> Vec<FrameSignal> {
    match payload {
        MessagePayload::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => interpret(&value),
            Err(_) => Vec::new(),
        },
        MessagePayload::Structured(value) => match value {
            // Some embeds double-encode
            Value::String(text) => parse(&MessagePayload::Text(text.clone())),
            value => interpret(value),
        },
    }
}

fn interpret(value: &Value) -> Vec<FrameSignal> {
    let Some(top) = value.as_object() else {
        return Vec::new();
    };

    let mut scopes = vec![top];
    scopes.extend(
        NESTED_KEYS
            .iter()
            .filter_map(|key| top.get(*key).and_then(Value::as_object)),
    );

    let mut ready = false;
    let mut state = None;
    let mut time = None;
    for scope in scopes {
        for key in LABEL_KEYS {
            match scope.get(key) {
                Some(Value::String(label)) => {
                    let label = label.to_ascii_lowercase();
                    if label == "ready" {
                        ready = true;
                    } else if state.is_none() {
                        state = state_from_label(&label);
                    }
                }
                Some(Value::Number(code)) if state.is_none() && key == "playerState" => {
                    state = code
                        .as_i64()
                        .and_then(|code| PlayerState::from_embed_code(code as i32));
                }
                _ => {}
            }
        }
        if time.is_none() {
            time = time_in(scope);
        }
    }

    let mut signals = Vec::new();
    if ready {
        signals.push(FrameSignal::Ready);
    }
    if let Some(state) = state {
        signals.push(FrameSignal::State(state));
    }
    if let Some(time) = time {
        signals.push(FrameSignal::Time(time));
    }
    signals
}

fn state_from_label(label: &str) -> Option<PlayerState> {
    match label {
        "playing" | "play" | "started" => Some(PlayerState::Playing),
        "paused" | "pause" => Some(PlayerState::Paused),
        "ended" | "finish" | "finished" => Some(PlayerState::Ended),
        "buffering" | "waiting" => Some(PlayerState::Buffering),
        "cued" => Some(PlayerState::Cued),
        _ => None,
    }
}

fn time_in(scope: &Map<String, Value>) -> Option<f64> {
    TIME_KEYS.iter().find_map(|key| {
        let seconds = match scope.get(*key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
    })
}

/// Outbound commands posted into the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FrameCommand {
    Play,
    Pause,
    Seek(f64),
}

impl FrameCommand {
    pub fn to_message(self) -> String {
        match self {
            Self::Play => json!({ "method": "play" }),
            Self::Pause => json!({ "method": "pause" }),
            Self::Seek(seconds) => json!({ "method": "seekTo", "value": seconds }),
        }
        .to_string()
    }
}

/// Same origin under URL rules: scheme, host and effective port. Input that
/// does not parse, or has an opaque origin, matches nothing.
pub(crate) fn origin_matches(actual: &str, expected: &str) -> bool {
    match (Url::parse(actual), Url::parse(expected)) {
        (Ok(actual), Ok(expected)) => {
            let expected = expected.origin();
            expected.is_tuple() && actual.origin() == expected
        }
        _ => false,
    }
}

/// The origin as a browser serializes it, or the input unchanged when it
/// is not a URL with a host
pub(crate) fn normalize_origin(raw: &str) -> String {
    match Url::parse(raw).map(|url| url.origin()) {
        Ok(origin) if origin.is_tuple() => origin.ascii_serialization(),
        _ => raw.to_string(),
    }
}

/// Frame address with the target resource encoded into its `url` parameter
pub(crate) fn frame_address(base: &str, target: &str) -> Result<String, url::ParseError> {
    let mut address = Url::parse(base)?;
    address.query_pairs_mut().append_pair("url", target);
    Ok(address.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(raw: &str) -> Vec<FrameSignal> {
        parse(&MessagePayload::Text(raw.to_string()))
    }

    #[test]
    fn test_not_json_is_ignored() {
        assert!(text("not json").is_empty());
        assert!(text("").is_empty());
        assert!(text("[1,2,3]").is_empty());
        assert!(parse(&MessagePayload::Structured(json!(42))).is_empty());
    }

    #[test]
    fn test_ready_shapes() {
        assert_eq!(text(r#"{"event":"ready"}"#), vec![FrameSignal::Ready]);
        assert_eq!(text(r#"{"type":"READY"}"#), vec![FrameSignal::Ready]);
        assert_eq!(
            parse(&MessagePayload::Structured(json!({"data": {"status": "ready"}}))),
            vec![FrameSignal::Ready]
        );
    }

    #[test]
    fn test_time_shapes() {
        assert_eq!(
            text(r#"{"event":"timeupdate","currentTime":12.5}"#),
            vec![FrameSignal::Time(12.5)]
        );
        assert_eq!(
            text(r#"{"event":"infoDelivery","info":{"currentTime":"41.0"}}"#),
            vec![FrameSignal::Time(41.0)]
        );
        assert_eq!(text(r#"{"position":-3}"#), Vec::new());
    }

    #[test]
    fn test_state_shapes() {
        assert_eq!(
            text(r#"{"event":"play"}"#),
            vec![FrameSignal::State(PlayerState::Playing)]
        );
        assert_eq!(
            text(r#"{"status":"paused","time":3}"#),
            vec![FrameSignal::State(PlayerState::Paused), FrameSignal::Time(3.0)]
        );
        assert_eq!(
            text(r#"{"info":{"playerState":0}}"#),
            vec![FrameSignal::State(PlayerState::Ended)]
        );
    }

    #[test]
    fn test_double_encoded_payload() {
        let payload = MessagePayload::Structured(Value::String(r#"{"event":"ended"}"#.to_string()));
        assert_eq!(parse(&payload), vec![FrameSignal::State(PlayerState::Ended)]);
    }

    #[test]
    fn test_unrecognized_shapes_are_ignored() {
        assert!(text(r#"{"event":"resize","width":640}"#).is_empty());
        assert!(text(r#"{"hello":"world"}"#).is_empty());
    }

    #[test]
    fn test_commands() {
        assert_eq!(FrameCommand::Play.to_message(), r#"{"method":"play"}"#);
        let seek: Value = serde_json::from_str(&FrameCommand::Seek(30.0).to_message()).unwrap();
        assert_eq!(seek, json!({"method": "seekTo", "value": 30.0}));
    }

    #[test]
    fn test_origin_matching() {
        assert!(origin_matches("https://app.veo.co", "https://app.veo.co/"));
        assert!(!origin_matches("https://evil.example", "https://app.veo.co"));
        assert!(!origin_matches("https://app.veo.co.evil.example", "https://app.veo.co"));
        assert!(!origin_matches("http://app.veo.co", "https://app.veo.co"));
        assert!(!origin_matches("https://app.veo.co:8443", "https://app.veo.co"));
        assert!(!origin_matches("", ""));
        assert!(!origin_matches("null", "https://app.veo.co"));
    }

    #[test]
    fn test_origin_matching_follows_url_rules() {
        assert!(origin_matches("https://app.veo.co", "https://App.Veo.co"));
        assert!(origin_matches("https://app.veo.co", "https://app.veo.co:443"));
        assert!(origin_matches("https://app.veo.co", "https://app.veo.co/embed/"));
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(normalize_origin("https://App.Veo.co:443/embed/"), "https://app.veo.co");
        assert_eq!(normalize_origin("not an origin"), "not an origin");
    }

    #[test]
    fn test_frame_address_encodes_target() {
        assert_eq!(
            frame_address("https://embed.example/watch", "https://cdn.example/m 1.mp4?a=b").unwrap(),
            "https://embed.example/watch?url=https%3A%2F%2Fcdn.example%2Fm+1.mp4%3Fa%3Db"
        );
        assert_eq!(
            frame_address("https://embed.example/watch?theme=dark", "abc").unwrap(),
            "https://embed.example/watch?theme=dark&url=abc"
        );
        assert!(frame_address("not a url", "abc").is_err());
    }
}
