use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One participant's submitted answers.
///
/// `answers` maps question id to the selected option value. A map rather than
/// a sequence: presentation order is shuffled by the caller and must never
/// reach the scoring input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserAnswers {
    pub answers: BTreeMap<u32, u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_question_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_answer_value: Option<u8>,
    pub bonus_answer_value: Option<u8>,
}

impl UserAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, question_id: u32, value: u8) -> Self {
        self.answers.insert(question_id, value);
        self
    }

    pub fn key(mut self, question_id: u32, value: u8) -> Self {
        self.key_question_id = Some(question_id);
        self.key_answer_value = Some(value);
        self
    }

    pub fn bonus(mut self, value: u8) -> Self {
        self.bonus_answer_value = Some(value);
        self
    }

    pub fn selected(&self, question_id: u32) -> Option<u8> {
        self.answers.get(&question_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_wire_format() {
        let answers = UserAnswers::new().answer(1, 2).key(101, 1).bonus(4);
        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(json["answers"]["1"], 2);
        assert_eq!(json["keyQuestionId"], 101);
        assert_eq!(json["keyAnswerValue"], 1);
        assert_eq!(json["bonusAnswerValue"], 4);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let parsed: UserAnswers =
            serde_json::from_value(serde_json::json!({"answers": {}, "keyAnswerValue": 0, "keyQuestionId": 0}))
                .unwrap();
        assert!(parsed.answers.is_empty());
        assert_eq!(parsed.key_question_id, Some(0));
        assert_eq!(parsed.bonus_answer_value, None);
    }

    #[test]
    fn null_bonus_is_none() {
        let parsed: UserAnswers =
            serde_json::from_value(serde_json::json!({"answers": {"3": 5}, "bonusAnswerValue": null})).unwrap();
        assert_eq!(parsed.selected(3), Some(5));
        assert_eq!(parsed.bonus_answer_value, None);
    }
}
