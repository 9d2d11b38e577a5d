//! Deterministic scoring: answers to score vectors, personal and solo
//! classification, packed pair results and role-asymmetric pair views.
//!
//! Nothing here performs I/O or draws randomness during scoring. The only
//! randomized helper, [`questions::shuffled_base_questions`], affects
//! presentation order and never the values that are summed.

pub mod engine;
pub mod error;
pub mod profiles;
pub mod questions;
pub mod report;
pub mod view;

pub use engine::{
    calculate_pair_result, calculate_personal_result, calculate_score_vector, calculate_solo_variant,
    classify_duo, decode_result_id, encode_result_id, key_match, DecodedResult, PairResult, PersonalResult,
};
pub use error::ResultIdError;
pub use questions::{pick_followup_questions, Question};
pub use report::build_pair_payloads;
pub use view::{build_pair_view_from_result, PairView};
