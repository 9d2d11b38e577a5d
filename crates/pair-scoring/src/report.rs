//! Materializes the `{A, B}` pair result bundle the initiator hands over.

use pair_core::{
    payload::{AnswerSets, BonusDetail, Highlight, KeyDetail},
    InvitePayload, PairPayloads, PairResultPayload, UserAnswers, Viewer,
};

use crate::engine::{calculate_pair_result, calculate_personal_result};
use crate::profiles::solo_profile;
use crate::questions;

/// Scored question answered by both sides with the widest gap; ties go to the
/// lowest id. Returned as `(question id, owner value, guest value)`.
fn widest_gap(owner: &UserAnswers, guest: &UserAnswers) -> Option<(u32, u8, u8)> {
    owner
        .answers
        .iter()
        .filter(|(id, _)| questions::question(**id).is_some())
        .filter_map(|(&id, &mine)| guest.selected(id).map(|theirs| (id, mine, theirs)))
        .fold(None, |best: Option<(u32, u8, u8)>, candidate| {
            let gap = |(_, a, b): (u32, u8, u8)| a.abs_diff(b);
            match best {
                Some(current) if gap(current) >= gap(candidate) => Some(current),
                _ => Some(candidate),
            }
        })
}

fn key_question_id(invite: &InvitePayload, owner: &UserAnswers, guest: &UserAnswers) -> Option<u32> {
    owner
        .key_question_id
        .or(invite.key_question)
        .or(guest.key_question_id)
}

pub fn build_pair_payloads(invite: &InvitePayload, owner: &UserAnswers, guest: &UserAnswers) -> PairPayloads {
    let pair = calculate_pair_result(owner, guest);
    let owner_solo = calculate_personal_result(owner).solo_variant();
    let guest_solo = calculate_personal_result(guest).solo_variant();
    let gap = widest_gap(owner, guest);
    let key_question = key_question_id(invite, owner, guest).and_then(questions::key_question);
    // key detail shows exactly what the key match was computed from
    let owner_key = owner.key_answer_value;

    let bonus_detail = invite.bonus_text().map(|text| BonusDetail {
        question: text.to_string(),
        label: invite.bonus_label.clone(),
        min_label: invite.bonus_min.clone(),
        max_label: invite.bonus_max.clone(),
        owner_answer: owner.bonus_answer_value,
        partner_answer: guest.bonus_answer_value,
    });

    let build = |viewer: Viewer| {
        let ((own, own_solo, own_key), (partner, partner_solo, partner_key)) = match viewer {
            Viewer::A => ((owner, owner_solo, owner_key), (guest, guest_solo, guest.key_answer_value)),
            Viewer::B => ((guest, guest_solo, guest.key_answer_value), (owner, owner_solo, owner_key)),
        };

        let mut payload = PairResultPayload::new(invite.sid.clone(), viewer, pair.result_id);
        payload.duo_variant = Some(pair.duo_variant());
        payload.solo_variant_self = Some(own_solo);
        payload.solo_variant_partner = Some(partner_solo);
        payload.solo_avatar_self = Some(solo_profile(own_solo).avatar.to_string());
        payload.solo_avatar_partner = Some(solo_profile(partner_solo).avatar.to_string());
        payload.highlight = gap.and_then(|(id, owner_value, guest_value)| {
            let (mine, theirs) = match viewer {
                Viewer::A => (owner_value, guest_value),
                Viewer::B => (guest_value, owner_value),
            };
            questions::question(id).map(|q| Highlight {
                question: q.text.to_string(),
                my_answer: Some(mine),
                partner_answer: Some(theirs),
            })
        });
        payload.key_detail = key_question.map(|q| KeyDetail {
            question: q.text.to_string(),
            self_answer: own_key,
            partner_answer: partner_key,
        });
        payload.bonus_detail = bonus_detail.clone();
        payload.answers = Some(AnswerSets {
            own: own.answers.clone(),
            partner: partner.answers.clone(),
        });
        payload
    };

    tracing::debug!(result_id = pair.result_id, duo = %pair.duo_variant(), "built pair payloads");
    PairPayloads {
        a: build(Viewer::A),
        b: build(Viewer::B),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pair_core::{DuoVariant, SessionId};

    fn invite() -> InvitePayload {
        let mut invite = InvitePayload::new(SessionId::from_raw("sid-123"));
        invite.key_question = Some(101);
        invite.key_answer = Some(1);
        invite.bonus_question = Some("How spicy do you like food?".into());
        invite.bonus_min = Some("Mild".into());
        invite.bonus_max = Some("Fire".into());
        invite
    }

    fn owner() -> UserAnswers {
        UserAnswers::new().answer(1, 2).answer(6, 1).answer(3, 3).key(101, 1).bonus(4)
    }

    fn guest() -> UserAnswers {
        UserAnswers::new().answer(2, 1).answer(7, 2).answer(3, 3).answer(6, 5).key(101, 1).bonus(9)
    }

    #[test]
    fn both_views_share_result_and_variant() {
        let payloads = build_pair_payloads(&invite(), &owner(), &guest());
        assert_eq!(payloads.a.view, Viewer::A);
        assert_eq!(payloads.b.view, Viewer::B);
        assert_eq!(payloads.a.result_id, payloads.b.result_id);
        assert_eq!(payloads.a.duo_variant, Some(DuoVariant::ComplementActive));
        assert_eq!(payloads.a.duo_variant, payloads.b.duo_variant);
        assert_eq!(payloads.a.sid.as_str(), "sid-123");
    }

    #[test]
    fn self_and_partner_swap_between_views() {
        let payloads = build_pair_payloads(&invite(), &owner(), &guest());
        assert_eq!(payloads.a.solo_variant_self, payloads.b.solo_variant_partner);
        assert_eq!(payloads.a.solo_avatar_partner, payloads.b.solo_avatar_self);
        let a = payloads.a.answers.as_ref().unwrap();
        let b = payloads.b.answers.as_ref().unwrap();
        assert_eq!(a.own, b.partner);
        assert_eq!(a.own, owner().answers);
    }

    #[test]
    fn highlight_picks_widest_gap() {
        let payloads = build_pair_payloads(&invite(), &owner(), &guest());
        // shared answers: q3 (3 vs 3), q6 (1 vs 5)
        let a = payloads.a.highlight.unwrap();
        assert_eq!(a.question, questions::question(6).unwrap().text);
        assert_eq!((a.my_answer, a.partner_answer), (Some(1), Some(5)));
        let b = payloads.b.highlight.unwrap();
        assert_eq!((b.my_answer, b.partner_answer), (Some(5), Some(1)));
    }

    #[test]
    fn highlight_ties_go_to_lowest_id() {
        let owner = UserAnswers::new().answer(4, 1).answer(2, 1);
        let guest = UserAnswers::new().answer(4, 3).answer(2, 3);
        assert_eq!(widest_gap(&owner, &guest), Some((2, 1, 3)));
        assert_eq!(widest_gap(&owner, &UserAnswers::new()), None);
    }

    #[test]
    fn key_and_bonus_details() {
        let payloads = build_pair_payloads(&invite(), &owner(), &guest());
        let key = payloads.b.key_detail.unwrap();
        assert_eq!(key.question, questions::key_question(101).unwrap().text);
        assert_eq!((key.self_answer, key.partner_answer), (Some(1), Some(1)));

        let bonus_a = payloads.a.bonus_detail.unwrap();
        let bonus_b = payloads.b.bonus_detail.unwrap();
        assert_eq!(bonus_a, bonus_b);
        assert_eq!(bonus_a.owner_answer, Some(4));
        assert_eq!(bonus_a.partner_answer, Some(9));
        assert_eq!(bonus_a.min_label.as_deref(), Some("Mild"));
    }

    #[test]
    fn key_detail_agrees_with_key_match() {
        let owner = UserAnswers::new().answer(1, 2).answer(6, 1);
        let payloads = build_pair_payloads(&invite(), &owner, &guest());
        let decoded = crate::engine::decode_result_id(payloads.a.result_id).unwrap();
        assert!(!decoded.key_match);
        let key = payloads.a.key_detail.unwrap();
        assert_eq!(key.question, questions::key_question(101).unwrap().text);
        assert_eq!((key.self_answer, key.partner_answer), (None, Some(1)));
        let key_b = payloads.b.key_detail.unwrap();
        assert_eq!((key_b.self_answer, key_b.partner_answer), (Some(1), None));
    }

    #[test]
    fn no_bonus_without_question_text() {
        let mut invite = invite();
        invite.bonus_question = None;
        let payloads = build_pair_payloads(&invite, &owner(), &guest());
        assert!(payloads.a.bonus_detail.is_none());
    }
}
