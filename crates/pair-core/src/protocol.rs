use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::UserAnswers;
use crate::payload::PairPayloads;

/// Messages exchanged over the data channel, as `{kind, payload}` pairs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum PeerMessage {
    /// The sender's complete answers, sent once after local submission.
    #[serde(rename = "ANSWER_SUMMARY")]
    AnswerSummary(UserAnswers),

    /// "I have computed the pair result" echo carrying the bare resultId.
    #[serde(rename = "PAIR_RESULT")]
    PairResult(u32),

    /// Fully materialized presentation bundle for both viewers.
    #[serde(rename = "PAIR_RESULT_PAYLOAD")]
    PairResultPayload(Box<PairPayloads>),
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AnswerSummary(_) => "ANSWER_SUMMARY",
            Self::PairResult(_) => "PAIR_RESULT",
            Self::PairResultPayload(_) => "PAIR_RESULT_PAYLOAD",
        }
    }
}

/// Minimal shape check: a known `kind` with a payload of that kind's shape.
///
/// `ANSWER_SUMMARY` needs an object, `PAIR_RESULT` a number and
/// `PAIR_RESULT_PAYLOAD` an object holding both `A` and `B`.
pub fn is_peer_message(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let payload = obj.get("payload");
    match obj.get("kind").and_then(Value::as_str) {
        Some("ANSWER_SUMMARY") => payload.is_some_and(Value::is_object),
        Some("PAIR_RESULT") => payload.is_some_and(Value::is_number),
        Some("PAIR_RESULT_PAYLOAD") => payload
            .and_then(Value::as_object)
            .is_some_and(|p| p.contains_key("A") && p.contains_key("B")),
        _ => false,
    }
}

/// Validate and decode an inbound value. Anything that fails the shape check
/// or does not decode into its typed payload is refused with `None`.
pub fn parse_message(value: &Value) -> Option<PeerMessage> {
    if !is_peer_message(value) {
        tracing::debug!("dropping unrecognized peer message");
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed peer message body");
            None
        }
    }
}
