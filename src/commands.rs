//! Offline commands: invites, scoring and result rendering.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use pair_core::{decode_payload, encode_payload, InvitePayload, PairResultPayload, SessionId, UserAnswers, Viewer};
use pair_scoring::profiles::{personal_profile, solo_profile};
use pair_scoring::questions::{key_question, shuffled_base_questions};
use pair_scoring::{
    build_pair_view_from_result, calculate_pair_result, calculate_personal_result, pick_followup_questions, PairView,
};

use crate::InviteArgs;

pub fn read_answers(path: &Path) -> Result<UserAnswers> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a valid answers file", path.display()))
}

pub fn build_invite(args: &InviteArgs) -> Result<InvitePayload> {
    if let Some(id) = args.key_question {
        let question = key_question(id).with_context(|| format!("unknown key question {id}"))?;
        if let Some(answer) = args.key_answer {
            anyhow::ensure!(
                question.options.iter().any(|(value, _)| *value == answer),
                "key question {id} has no option {answer}"
            );
        }
    }
    let sid = args.sid.clone().map(SessionId::from_raw).unwrap_or_default();
    let mut invite = InvitePayload::new(sid);
    invite.key_question = args.key_question;
    invite.key_answer = args.key_answer;
    invite.type_hint = args.type_hint;
    invite.bonus_question = args.bonus.clone();
    invite.bonus_label = args.bonus_label.clone();
    invite.bonus_min = args.bonus_min.clone();
    invite.bonus_max = args.bonus_max.clone();
    Ok(invite)
}

pub fn encode_invite(invite: &InvitePayload) -> Result<String> {
    encode_payload(invite).context("failed to encode invite")
}

pub fn decode_invite(encoded: &str) -> Result<InvitePayload> {
    decode_payload(encoded.trim()).context("invite link is not valid")
}

pub fn questions(followups_for: Option<&Path>, count: usize) -> Result<()> {
    let listed = match followups_for {
        Some(path) => {
            let answers = read_answers(path)?;
            pick_followup_questions(&calculate_personal_result(&answers).score, count)
        }
        None => shuffled_base_questions(&mut rand::thread_rng()),
    };
    for question in listed {
        println!("{:>3}  {}", question.id, question.text);
    }
    Ok(())
}

pub fn score(path: &Path) -> Result<()> {
    let answers = read_answers(path)?;
    let result = calculate_personal_result(&answers);
    let solo = result.solo_variant();
    let report = json!({
        "type": result.type_id(),
        "name": result.profile.name,
        "headline": result.profile.headline,
        "soloVariant": solo,
        "soloLabel": solo_profile(solo).label,
        "score": result.score,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn pair(a: &Path, b: &Path) -> Result<()> {
    let answers_a = read_answers(a)?;
    let answers_b = read_answers(b)?;
    let result = calculate_pair_result(&answers_a, &answers_b);
    let report = json!({
        "resultId": result.result_id,
        "duoVariant": result.duo_variant(),
        "keyMatch": result.key_match,
        "typeA": personal_profile(result.type_a).name,
        "typeB": personal_profile(result.type_b).name,
        "A": build_pair_view_from_result(result.result_id, Viewer::A)?,
        "B": build_pair_view_from_result(result.result_id, Viewer::B)?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn result(encoded: &str) -> Result<()> {
    let Some(payload) = decode_result(encoded) else {
        anyhow::bail!("no result found in this link");
    };
    let view = build_pair_view_from_result(payload.result_id, payload.view)
        .context("no result found in this link")?;
    print!("{}", render_result(&payload, &view));
    Ok(())
}

/// Decode a shared result, treating any corruption as "no result".
pub fn decode_result(encoded: &str) -> Option<PairResultPayload> {
    match decode_payload(encoded.trim()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!(error = %e, "undecodable result payload");
            None
        }
    }
}

pub fn render_result(payload: &PairResultPayload, view: &PairView) -> String {
    let mut out = format!("{}\n\n{}\n", view.title, view.message);
    if let (Some(own), Some(partner)) = (payload.solo_variant_self, payload.solo_variant_partner) {
        out.push_str(&format!(
            "\nYou: {}\nPartner: {}\n",
            solo_profile(own).label,
            solo_profile(partner).label
        ));
    }
    if let Some(highlight) = &payload.highlight {
        out.push_str(&format!(
            "\nWhere you differ most: {} (you {}, partner {})\n",
            highlight.question,
            answer_text(highlight.my_answer),
            answer_text(highlight.partner_answer)
        ));
    }
    if let Some(key) = &payload.key_detail {
        out.push_str(&format!(
            "\n{}\n  you: {}\n  partner: {}\n",
            key.question,
            answer_text(key.self_answer),
            answer_text(key.partner_answer)
        ));
    }
    if let Some(bonus) = &payload.bonus_detail {
        out.push_str(&format!(
            "\n{}\n  owner: {}\n  partner: {}\n",
            bonus.question,
            answer_text(bonus.owner_answer),
            answer_text(bonus.partner_answer)
        ));
    }
    if !view.tips.is_empty() {
        out.push('\n');
        for tip in &view.tips {
            out.push_str(&format!("- {tip}\n"));
        }
    }
    out
}

fn answer_text(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
