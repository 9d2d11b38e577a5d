use pair_core::Viewer;
use serde::Serialize;

use crate::engine::decode_result_id;
use crate::error::ResultIdError;
use crate::profiles::{duo_profile, personal_profile};

/// Rendered pair result for one side. Title and tips are shared; the message
/// is worded from the viewer's own perspective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PairView {
    pub title: String,
    pub message: String,
    pub tips: Vec<String>,
}

fn opener(viewer: Viewer) -> &'static str {
    match viewer {
        Viewer::A => "You sent the invite and your partner answered.",
        Viewer::B => "You answered their invite.",
    }
}

pub fn build_pair_view_from_result(result_id: u32, viewer: Viewer) -> Result<PairView, ResultIdError> {
    let decoded = decode_result_id(result_id)?;
    let (own, partner) = decoded.types_for(viewer);
    let duo = duo_profile(decoded.duo_variant());

    let types = if own == partner {
        format!("You are both a {}.", personal_profile(own).name)
    } else {
        format!(
            "You are a {} and your partner is a {}.",
            personal_profile(own).name,
            personal_profile(partner).name
        )
    };

    Ok(PairView {
        title: duo.title.to_string(),
        message: format!("{} {} {}", opener(viewer), types, duo.message),
        tips: duo.tips.iter().map(|t| t.to_string()).collect(),
    })
}
