//! Score vectors, personal classification and the packed pair result.
//!
//! resultId layout (layout version 1):
//!
//! | bits  | field                         |
//! |-------|-------------------------------|
//! | 0..=2 | type id of side A (1..=4)     |
//! | 3..=5 | type id of side B (1..=4)     |
//! | 6     | key question matched          |
//! | 7..=9 | layout version                |
//!
//! Every bit above 9 must be zero. Three-bit type fields leave room to detect
//! an out-of-range type instead of silently wrapping.

use pair_core::{DuoFamily, DuoVariant, PersonalType, ScoreVector, SoloVariant, UserAnswers, Viewer};

use crate::error::ResultIdError;
use crate::profiles::{personal_profile, PersonalTypeProfile};
use crate::questions;

pub const RESULT_LAYOUT_VERSION: u32 = 1;

const TYPE_BITS: u32 = 3;
const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;
const TYPE_B_SHIFT: u32 = TYPE_BITS;
const KEY_MATCH_BIT: u32 = 1 << (2 * TYPE_BITS);
const VERSION_SHIFT: u32 = 2 * TYPE_BITS + 1;
const VERSION_MASK: u32 = 0b111;
const USED_BITS: u32 = VERSION_SHIFT + 3;

/// Sum the deltas of every selected option. Unknown questions and option
/// values contribute nothing.
pub fn calculate_score_vector<'a, I>(answers: I) -> ScoreVector
where
    I: IntoIterator<Item = (&'a u32, &'a u8)>,
{
    let mut score = ScoreVector::default();
    for (&question_id, &value) in answers {
        let Some(option) = questions::question(question_id).and_then(|q| q.option(value)) else {
            tracing::trace!(question_id, value, "answer has no scored option");
            continue;
        };
        for &(axis, delta) in &option.score {
            score.add(axis, delta);
        }
    }
    score
}

/// The type whose axis carries the largest signed score. Ties go to the
/// lowest type id: safe harbor, free spirit, trailblazer, warm heart.
pub fn dominant_type(score: &ScoreVector) -> PersonalType {
    let mut best = PersonalType::SafeHarbor;
    for ty in PersonalType::ALL {
        if score.get(ty.axis()) > score.get(best.axis()) {
            best = ty;
        }
    }
    best
}

pub fn calculate_solo_variant(score: &ScoreVector) -> SoloVariant {
    let personal_type = dominant_type(score);
    let [first, second] = personal_type.residual_axes();
    SoloVariant {
        personal_type,
        first_positive: score.get(first) >= 0,
        second_positive: score.get(second) >= 0,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PersonalResult {
    pub personal_type: PersonalType,
    pub profile: &'static PersonalTypeProfile,
    pub score: ScoreVector,
}

impl PersonalResult {
    pub fn type_id(&self) -> u8 {
        self.personal_type.id()
    }

    pub fn solo_variant(&self) -> SoloVariant {
        calculate_solo_variant(&self.score)
    }
}

pub fn calculate_personal_result(answers: &UserAnswers) -> PersonalResult {
    let score = calculate_score_vector(&answers.answers);
    let personal_type = dominant_type(&score);
    PersonalResult {
        personal_type,
        profile: personal_profile(personal_type),
        score,
    }
}

/// Both sides answered the key question with the same value. When both also
/// name the key question, the ids have to agree too.
pub fn key_match(a: &UserAnswers, b: &UserAnswers) -> bool {
    let same_question = match (a.key_question_id, b.key_question_id) {
        (Some(qa), Some(qb)) => qa == qb,
        _ => true,
    };
    match (a.key_answer_value, b.key_answer_value) {
        (Some(va), Some(vb)) => same_question && va == vb,
        _ => false,
    }
}

pub fn duo_family(a: PersonalType, b: PersonalType) -> DuoFamily {
    let (axis_a, axis_b) = (a.axis(), b.axis());
    if axis_a == axis_b {
        DuoFamily::Sync
    } else if axis_a.opposite() == axis_b {
        DuoFamily::Contrast
    } else if axis_a.kindred() == axis_b {
        DuoFamily::Drift
    } else {
        DuoFamily::Complement
    }
}

pub fn classify_duo(a: PersonalType, b: PersonalType, key_match: bool) -> DuoVariant {
    DuoVariant::from_family(duo_family(a, b), key_match)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairResult {
    pub result_id: u32,
    pub type_a: PersonalType,
    pub type_b: PersonalType,
    pub key_match: bool,
}

impl PairResult {
    pub fn duo_variant(&self) -> DuoVariant {
        classify_duo(self.type_a, self.type_b, self.key_match)
    }
}

/// `answers_a` is always the initiator's side.
pub fn calculate_pair_result(answers_a: &UserAnswers, answers_b: &UserAnswers) -> PairResult {
    let type_a = calculate_personal_result(answers_a).personal_type;
    let type_b = calculate_personal_result(answers_b).personal_type;
    let key_match = key_match(answers_a, answers_b);
    PairResult {
        result_id: encode_result_id(type_a, type_b, key_match),
        type_a,
        type_b,
        key_match,
    }
}

pub fn encode_result_id(type_a: PersonalType, type_b: PersonalType, key_match: bool) -> u32 {
    let mut id = u32::from(type_a.id()) | (u32::from(type_b.id()) << TYPE_B_SHIFT);
    if key_match {
        id |= KEY_MATCH_BIT;
    }
    id | (RESULT_LAYOUT_VERSION << VERSION_SHIFT)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedResult {
    pub type_a: PersonalType,
    pub type_b: PersonalType,
    pub key_match: bool,
}

impl DecodedResult {
    pub fn duo_variant(&self) -> DuoVariant {
        classify_duo(self.type_a, self.type_b, self.key_match)
    }

    /// (own type, partner type) from one viewer's perspective.
    pub fn types_for(&self, viewer: Viewer) -> (PersonalType, PersonalType) {
        match viewer {
            Viewer::A => (self.type_a, self.type_b),
            Viewer::B => (self.type_b, self.type_a),
        }
    }
}

pub fn decode_result_id(result_id: u32) -> Result<DecodedResult, ResultIdError> {
    if result_id >> USED_BITS != 0 {
        return Err(ResultIdError::ReservedBits(result_id));
    }
    let version = (result_id >> VERSION_SHIFT) & VERSION_MASK;
    if version != RESULT_LAYOUT_VERSION {
        return Err(ResultIdError::UnsupportedVersion(version));
    }
    let side = |viewer: Viewer, value: u32| {
        u8::try_from(value)
            .ok()
            .and_then(PersonalType::from_id)
            .ok_or(ResultIdError::TypeOutOfRange { side: viewer, value })
    };
    Ok(DecodedResult {
        type_a: side(Viewer::A, result_id & TYPE_MASK)?,
        type_b: side(Viewer::B, (result_id >> TYPE_B_SHIFT) & TYPE_MASK)?,
        key_match: result_id & KEY_MATCH_BIT != 0,
    })
}
