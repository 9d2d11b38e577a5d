use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four compatibility dimensions accumulated from answer deltas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Distance,
    Initiative,
    Security,
    Affection,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Distance, Axis::Initiative, Axis::Security, Axis::Affection];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Initiative => "initiative",
            Self::Security => "security",
            Self::Affection => "affection",
        }
    }

    /// The axis that pulls the opposite way: closeness vs space, change vs stability.
    pub fn opposite(&self) -> Axis {
        match self {
            Self::Affection => Self::Distance,
            Self::Distance => Self::Affection,
            Self::Initiative => Self::Security,
            Self::Security => Self::Initiative,
        }
    }

    /// The axis sharing the same tendency (outgoing or grounding).
    pub fn kindred(&self) -> Axis {
        match self {
            Self::Initiative => Self::Affection,
            Self::Affection => Self::Initiative,
            Self::Security => Self::Distance,
            Self::Distance => Self::Security,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed sum of option deltas per axis. Unbounded; only sign and relative
/// magnitude carry meaning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreVector {
    pub distance: i32,
    pub initiative: i32,
    pub security: i32,
    pub affection: i32,
}

impl ScoreVector {
    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Distance => self.distance,
            Axis::Initiative => self.initiative,
            Axis::Security => self.security,
            Axis::Affection => self.affection,
        }
    }

    pub fn add(&mut self, axis: Axis, delta: i32) {
        let slot = match axis {
            Axis::Distance => &mut self.distance,
            Axis::Initiative => &mut self.initiative,
            Axis::Security => &mut self.security,
            Axis::Affection => &mut self.affection,
        };
        *slot += delta;
    }
}

/// Primary 4-way classification. The discriminant is the stable type id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PersonalType {
    SafeHarbor = 1,
    FreeSpirit = 2,
    Trailblazer = 3,
    WarmHeart = 4,
}

impl PersonalType {
    /// Ordered by type id, which is also the tie-break priority.
    pub const ALL: [PersonalType; 4] = [
        PersonalType::SafeHarbor,
        PersonalType::FreeSpirit,
        PersonalType::Trailblazer,
        PersonalType::WarmHeart,
    ];

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::SafeHarbor),
            2 => Some(Self::FreeSpirit),
            3 => Some(Self::Trailblazer),
            4 => Some(Self::WarmHeart),
            _ => None,
        }
    }

    /// The axis whose dominance selects this type.
    pub fn axis(&self) -> Axis {
        match self {
            Self::SafeHarbor => Axis::Security,
            Self::FreeSpirit => Axis::Distance,
            Self::Trailblazer => Axis::Initiative,
            Self::WarmHeart => Axis::Affection,
        }
    }

    pub fn from_axis(axis: Axis) -> Self {
        match axis {
            Axis::Security => Self::SafeHarbor,
            Axis::Distance => Self::FreeSpirit,
            Axis::Initiative => Self::Trailblazer,
            Axis::Affection => Self::WarmHeart,
        }
    }

    /// The two axes that refine this type into a solo variant, in sign order.
    pub fn residual_axes(&self) -> [Axis; 2] {
        match self.axis() {
            Axis::Affection | Axis::Distance => [Axis::Initiative, Axis::Security],
            Axis::Initiative | Axis::Security => [Axis::Affection, Axis::Distance],
        }
    }
}

impl Serialize for PersonalType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.id())
    }
}

impl<'de> Deserialize<'de> for PersonalType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = u8::deserialize(deserializer)?;
        Self::from_id(id).ok_or_else(|| serde::de::Error::custom(format!("unknown personal type {id}")))
    }
}

/// 16-way refinement: personal type plus the sign of its two residual axes.
/// Wire form is `"<type>-<pos|neg>-<pos|neg>"`, e.g. `"3-pos-neg"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SoloVariant {
    pub personal_type: PersonalType,
    pub first_positive: bool,
    pub second_positive: bool,
}

impl SoloVariant {
    pub fn all() -> impl Iterator<Item = SoloVariant> {
        PersonalType::ALL.into_iter().flat_map(|personal_type| {
            [(true, true), (true, false), (false, true), (false, false)]
                .into_iter()
                .map(move |(first_positive, second_positive)| SoloVariant {
                    personal_type,
                    first_positive,
                    second_positive,
                })
        })
    }
}

fn sign_label(positive: bool) -> &'static str {
    if positive {
        "pos"
    } else {
        "neg"
    }
}

impl fmt::Display for SoloVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.personal_type.id(),
            sign_label(self.first_positive),
            sign_label(self.second_positive)
        )
    }
}

impl FromStr for SoloVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let (Some(ty), Some(first), Some(second), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("malformed solo variant: {s}"));
        };
        let personal_type = ty
            .parse::<u8>()
            .ok()
            .and_then(PersonalType::from_id)
            .ok_or_else(|| format!("unknown personal type in solo variant: {s}"))?;
        let sign = |part: &str| match part {
            "pos" => Ok(true),
            "neg" => Ok(false),
            _ => Err(format!("malformed sign in solo variant: {s}")),
        };
        Ok(Self {
            personal_type,
            first_positive: sign(first)?,
            second_positive: sign(second)?,
        })
    }
}

impl TryFrom<String> for SoloVariant {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SoloVariant> for String {
    fn from(value: SoloVariant) -> Self {
        value.to_string()
    }
}

/// Relationship-dynamic family of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuoFamily {
    Sync,
    Complement,
    Contrast,
    Drift,
}

/// 8-way relationship classification: a family plus the key-question outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuoVariant {
    SyncStrong,
    SyncSoft,
    ComplementActive,
    ComplementGentle,
    ContrastExplore,
    ContrastGuard,
    DriftStable,
    DriftBridge,
}

impl DuoVariant {
    pub const ALL: [DuoVariant; 8] = [
        DuoVariant::SyncStrong,
        DuoVariant::SyncSoft,
        DuoVariant::ComplementActive,
        DuoVariant::ComplementGentle,
        DuoVariant::ContrastExplore,
        DuoVariant::ContrastGuard,
        DuoVariant::DriftStable,
        DuoVariant::DriftBridge,
    ];

    pub fn from_family(family: DuoFamily, key_match: bool) -> Self {
        match (family, key_match) {
            (DuoFamily::Sync, true) => Self::SyncStrong,
            (DuoFamily::Sync, false) => Self::SyncSoft,
            (DuoFamily::Complement, true) => Self::ComplementActive,
            (DuoFamily::Complement, false) => Self::ComplementGentle,
            (DuoFamily::Contrast, true) => Self::ContrastExplore,
            (DuoFamily::Contrast, false) => Self::ContrastGuard,
            (DuoFamily::Drift, true) => Self::DriftStable,
            (DuoFamily::Drift, false) => Self::DriftBridge,
        }
    }

    pub fn family(&self) -> DuoFamily {
        match self {
            Self::SyncStrong | Self::SyncSoft => DuoFamily::Sync,
            Self::ComplementActive | Self::ComplementGentle => DuoFamily::Complement,
            Self::ContrastExplore | Self::ContrastGuard => DuoFamily::Contrast,
            Self::DriftStable | Self::DriftBridge => DuoFamily::Drift,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncStrong => "sync-strong",
            Self::SyncSoft => "sync-soft",
            Self::ComplementActive => "complement-active",
            Self::ComplementGentle => "complement-gentle",
            Self::ContrastExplore => "contrast-explore",
            Self::ContrastGuard => "contrast-guard",
            Self::DriftStable => "drift-stable",
            Self::DriftBridge => "drift-bridge",
        }
    }
}

impl fmt::Display for DuoVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the session a participant plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Opens the session and listens.
    Owner,
    /// Receives the session id out of band and dials.
    Guest,
}

impl Role {
    pub fn viewer(&self) -> Viewer {
        match self {
            Self::Owner => Viewer::A,
            Self::Guest => Viewer::B,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Owner => "owner",
            Self::Guest => "guest",
        })
    }
}

/// Perspective tag for pair presentation. `A` is the initiator's answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Viewer {
    A,
    B,
}

impl Viewer {
    pub fn other(&self) -> Viewer {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}
