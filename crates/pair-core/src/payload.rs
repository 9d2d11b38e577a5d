//! Shapes that cross the URL boundary between the two sides.
//!
//! Field names follow the link format (`sid`, `keyQ`, `resultId`, ...), so a
//! payload encoded by one build decodes in another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::types::{DuoVariant, Role, SoloVariant, Viewer};

pub const PAYLOAD_VERSION: u8 = 1;

fn payload_version() -> u8 {
    PAYLOAD_VERSION
}

/// Invitation handed from the initiator to the joiner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitePayload {
    #[serde(default = "payload_version")]
    pub v: u8,
    pub role: Role,
    pub sid: SessionId,
    #[serde(rename = "keyQ", default, skip_serializing_if = "Option::is_none")]
    pub key_question: Option<u32>,
    #[serde(rename = "keyA", default, skip_serializing_if = "Option::is_none")]
    pub key_answer: Option<u8>,
    #[serde(rename = "typeHint", default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<u8>,
    #[serde(rename = "bonusQ", default, skip_serializing_if = "Option::is_none")]
    pub bonus_question: Option<String>,
    #[serde(rename = "bonusLabel", default, skip_serializing_if = "Option::is_none")]
    pub bonus_label: Option<String>,
    #[serde(rename = "bonusMin", default, skip_serializing_if = "Option::is_none")]
    pub bonus_min: Option<String>,
    #[serde(rename = "bonusMax", default, skip_serializing_if = "Option::is_none")]
    pub bonus_max: Option<String>,
}

impl InvitePayload {
    pub fn new(sid: SessionId) -> Self {
        Self {
            v: PAYLOAD_VERSION,
            role: Role::Owner,
            sid,
            key_question: None,
            key_answer: None,
            type_hint: None,
            bonus_question: None,
            bonus_label: None,
            bonus_min: None,
            bonus_max: None,
        }
    }

    /// The owner-defined bonus question, if one with visible text was set.
    pub fn bonus_text(&self) -> Option<&str> {
        self.bonus_question.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub question: String,
    pub my_answer: Option<u8>,
    pub partner_answer: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDetail {
    pub question: String,
    pub self_answer: Option<u8>,
    pub partner_answer: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusDetail {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_label: Option<String>,
    pub owner_answer: Option<u8>,
    pub partner_answer: Option<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSets {
    #[serde(rename = "self")]
    pub own: BTreeMap<u32, u8>,
    pub partner: BTreeMap<u32, u8>,
}

/// Ready-to-render pair result for one viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResultPayload {
    #[serde(default = "payload_version")]
    pub v: u8,
    pub sid: SessionId,
    pub view: Viewer,
    pub result_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duo_variant: Option<DuoVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solo_variant_self: Option<SoloVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solo_variant_partner: Option<SoloVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solo_avatar_self: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solo_avatar_partner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_detail: Option<KeyDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_detail: Option<BonusDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<AnswerSets>,
}

impl PairResultPayload {
    pub fn new(sid: SessionId, view: Viewer, result_id: u32) -> Self {
        Self {
            v: PAYLOAD_VERSION,
            sid,
            view,
            result_id,
            duo_variant: None,
            solo_variant_self: None,
            solo_variant_partner: None,
            solo_avatar_self: None,
            solo_avatar_partner: None,
            highlight: None,
            key_detail: None,
            bonus_detail: None,
            answers: None,
        }
    }
}

/// Both viewers' payloads, as carried by `PAIR_RESULT_PAYLOAD`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairPayloads {
    #[serde(rename = "A")]
    pub a: PairResultPayload,
    #[serde(rename = "B")]
    pub b: PairResultPayload,
}

impl PairPayloads {
    pub fn for_viewer(&self, viewer: Viewer) -> &PairResultPayload {
        match viewer {
            Viewer::A => &self.a,
            Viewer::B => &self.b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_uses_short_keys() {
        let mut invite = InvitePayload::new(SessionId::from_raw("test-session-id"));
        invite.key_question = Some(101);
        invite.key_answer = Some(1);
        invite.type_hint = Some(2);
        let json = serde_json::to_value(&invite).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"v": 1, "role": "owner", "sid": "test-session-id", "keyQ": 101, "keyA": 1, "typeHint": 2})
        );
    }

    #[test]
    fn invite_defaults_version_when_missing() {
        let invite: InvitePayload = serde_json::from_value(serde_json::json!({"role": "owner", "sid": "s"})).unwrap();
        assert_eq!(invite.v, PAYLOAD_VERSION);
        assert!(invite.bonus_text().is_none());
    }

    #[test]
    fn blank_bonus_question_is_ignored() {
        let mut invite = InvitePayload::new(SessionId::from_raw("s"));
        invite.bonus_question = Some("   ".into());
        assert!(invite.bonus_text().is_none());
        invite.bonus_question = Some(" Weekend plans? ".into());
        assert_eq!(invite.bonus_text(), Some("Weekend plans?"));
    }

    #[test]
    fn pair_result_payload_wire_names() {
        let mut payload = PairResultPayload::new(SessionId::from_raw("sid-123"), Viewer::B, 77);
        payload.answers = Some(AnswerSets {
            own: BTreeMap::from([(1, 1)]),
            partner: BTreeMap::from([(1, 2)]),
        });
        payload.highlight = Some(Highlight {
            question: "Q".into(),
            my_answer: Some(1),
            partner_answer: None,
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["view"], "B");
        assert_eq!(json["resultId"], 77);
        assert_eq!(json["answers"]["self"]["1"], 1);
        assert_eq!(json["highlight"]["myAnswer"], 1);
        assert!(json["highlight"]["partnerAnswer"].is_null());
        assert!(json.get("duoVariant").is_none());
    }

    #[test]
    fn pair_payloads_pick_viewer() {
        let sid = SessionId::from_raw("s");
        let payloads = PairPayloads {
            a: PairResultPayload::new(sid.clone(), Viewer::A, 1),
            b: PairResultPayload::new(sid, Viewer::B, 1),
        };
        assert_eq!(payloads.for_viewer(Viewer::B).view, Viewer::B);
        let json = serde_json::to_value(&payloads).unwrap();
        assert!(json.get("A").is_some() && json.get("B").is_some());
    }
}
