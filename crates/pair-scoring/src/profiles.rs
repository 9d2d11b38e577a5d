//! Static display content. Looked up by id, never constructed at runtime.

use pair_core::{DuoVariant, PersonalType, SoloVariant};

#[derive(Debug)]
pub struct PersonalTypeProfile {
    pub personal_type: PersonalType,
    pub name: &'static str,
    pub headline: &'static str,
    pub avatar: &'static str,
    pub strengths: &'static [&'static str],
    pub caution: &'static str,
}

#[derive(Debug)]
pub struct SoloVariantProfile {
    pub label: &'static str,
    pub description: &'static str,
    pub avatar: &'static str,
}

#[derive(Debug)]
pub struct DuoVariantProfile {
    pub variant: DuoVariant,
    pub title: &'static str,
    pub message: &'static str,
    pub tips: &'static [&'static str],
}

static PERSONAL_TYPES: [PersonalTypeProfile; 4] = [
    PersonalTypeProfile {
        personal_type: PersonalType::SafeHarbor,
        name: "Safe Harbor",
        headline: "Steady, reassuring and in it for the long run.",
        avatar: "Lighthouse Keeper",
        strengths: &["Reliable", "Keeps promises", "Creates calm"],
        caution: "Silence can read as distance to you; say what you need.",
    },
    PersonalTypeProfile {
        personal_type: PersonalType::FreeSpirit,
        name: "Free Spirit",
        headline: "Loves closeness most when there is room to breathe.",
        avatar: "Wandering Cat",
        strengths: &["Independent", "Respects boundaries", "Brings fresh air"],
        caution: "Space can look like disinterest; explain your rhythm.",
    },
    PersonalTypeProfile {
        personal_type: PersonalType::Trailblazer,
        name: "Trailblazer",
        headline: "Takes the first step and plans the adventure.",
        avatar: "Captain",
        strengths: &["Decisive", "Proactive", "Energizing"],
        caution: "Check in before deciding for two.",
    },
    PersonalTypeProfile {
        personal_type: PersonalType::WarmHeart,
        name: "Warm Heart",
        headline: "Shows love through touch, words and little gestures.",
        avatar: "Teddy Bear",
        strengths: &["Expressive", "Affectionate", "Emotionally open"],
        caution: "Not everyone recharges through contact; ask first.",
    },
];

// Indexed by (type id - 1) * 4 + sign slot: pos-pos, pos-neg, neg-pos, neg-neg.
static SOLO_VARIANTS: [SoloVariantProfile; 16] = [
    SoloVariantProfile {
        label: "Gentle Anchor",
        description: "Warm and reassuring, yet happy to give each other room.",
        avatar: "Harbor Seal",
    },
    SoloVariantProfile {
        label: "Homebody Hugger",
        description: "Wants stability and plenty of closeness.",
        avatar: "Blanket Fort",
    },
    SoloVariantProfile {
        label: "Quiet Guardian",
        description: "Shows care through reliability more than words and values personal space.",
        avatar: "Night Owl",
    },
    SoloVariantProfile {
        label: "Loyal Shadow",
        description: "Prefers steady togetherness over grand gestures.",
        avatar: "Old Oak",
    },
    SoloVariantProfile {
        label: "Planned Explorer",
        description: "Leads the way but always keeps a home base.",
        avatar: "Compass",
    },
    SoloVariantProfile {
        label: "Solo Adventurer",
        description: "Takes the initiative and travels light.",
        avatar: "Paper Plane",
    },
    SoloVariantProfile {
        label: "Calm Orbit",
        description: "Goes with the flow while valuing a dependable rhythm.",
        avatar: "Moon",
    },
    SoloVariantProfile {
        label: "Drifting Cloud",
        description: "Easygoing and unbothered by routines.",
        avatar: "Cloud",
    },
    SoloVariantProfile {
        label: "Charming Captain",
        description: "Leads with warmth and respects independence.",
        avatar: "Sailboat",
    },
    SoloVariantProfile {
        label: "Devoted Leader",
        description: "Plans every date and wants to share all of it.",
        avatar: "Tour Guide",
    },
    SoloVariantProfile {
        label: "Cool Strategist",
        description: "Makes the plans, keeps feelings private and enjoys some space.",
        avatar: "Chess Knight",
    },
    SoloVariantProfile {
        label: "Steady Pilot",
        description: "Takes charge quietly and likes being side by side.",
        avatar: "Co-pilot",
    },
    SoloVariantProfile {
        label: "Sunny Planner",
        description: "Affectionate, proactive and happiest knowing what's next.",
        avatar: "Sunflower",
    },
    SoloVariantProfile {
        label: "Spontaneous Romantic",
        description: "Leads with hugs and surprise plans.",
        avatar: "Firework",
    },
    SoloVariantProfile {
        label: "Soft Nest",
        description: "Loves closeness and a comfortable routine.",
        avatar: "Kitten",
    },
    SoloVariantProfile {
        label: "Free Cuddler",
        description: "Affectionate and relaxed about the future.",
        avatar: "Otter",
    },
];

static DUO_VARIANTS: [DuoVariantProfile; 8] = [
    DuoVariantProfile {
        variant: DuoVariant::SyncStrong,
        title: "Perfect Echo",
        message: "You run on the same wavelength and even agree on what matters most.",
        tips: &[
            "Take turns leading so one voice doesn't set every plan.",
            "Try one thing neither of you would pick alone.",
        ],
    },
    DuoVariantProfile {
        variant: DuoVariant::SyncSoft,
        title: "Familiar Tune",
        message: "Your styles match closely, though you weigh the big question differently.",
        tips: &[
            "Talk the key question through before it comes up for real.",
            "Enjoy the ease, but keep asking each other new questions.",
        ],
    },
    DuoVariantProfile {
        variant: DuoVariant::ComplementActive,
        title: "Puzzle Pieces",
        message: "Your strengths fill each other's gaps and your priorities line up.",
        tips: &[
            "Name one thing you appreciate in the other's style.",
            "Split planning by strength instead of taking turns.",
        ],
    },
    DuoVariantProfile {
        variant: DuoVariant::ComplementGentle,
        title: "Quiet Fit",
        message: "You balance each other well; a different take on the key question needs gentle care.",
        tips: &[
            "Share why your answer to the key question matters to you.",
            "Agree on a small experiment rather than a fixed rule.",
        ],
    },
    DuoVariantProfile {
        variant: DuoVariant::ContrastExplore,
        title: "Spark and Stretch",
        message: "You pull in opposite directions yet agree on what counts, so there is plenty to learn from each other.",
        tips: &[
            "Treat your differences as a menu, not a verdict.",
            "Schedule both time together and time of your own.",
        ],
    },
    DuoVariantProfile {
        variant: DuoVariant::ContrastGuard,
        title: "Careful Crossing",
        message: "Your instincts differ and so do your priorities; go slowly and stay curious.",
        tips: &[
            "Ask before assuming the other feels the same way.",
            "Pick one recurring friction point and design a shared rule for it.",
        ],
    },
    DuoVariantProfile {
        variant: DuoVariant::DriftStable,
        title: "Side by Side",
        message: "You lean the same general way on different axes and share the core value.",
        tips: &[
            "Check in regularly so comfortable never turns into distant.",
            "Plan a date that stretches both of you.",
        ],
    },
    DuoVariantProfile {
        variant: DuoVariant::DriftBridge,
        title: "Parallel Paths",
        message: "Similar temperaments with different focal points and a different answer to what matters most.",
        tips: &[
            "Build a bridge: one shared ritual every week.",
            "Revisit the key question together in a month.",
        ],
    },
];

pub fn personal_profile(personal_type: PersonalType) -> &'static PersonalTypeProfile {
    &PERSONAL_TYPES[usize::from(personal_type.id() - 1)]
}

pub fn solo_profile(variant: SoloVariant) -> &'static SoloVariantProfile {
    let slot = match (variant.first_positive, variant.second_positive) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    };
    &SOLO_VARIANTS[usize::from(variant.personal_type.id() - 1) * 4 + slot]
}

pub fn duo_profile(variant: DuoVariant) -> &'static DuoVariantProfile {
    let index = DuoVariant::ALL
        .iter()
        .position(|v| *v == variant)
        .unwrap_or_default();
    &DUO_VARIANTS[index]
}
