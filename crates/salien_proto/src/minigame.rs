//! Payload structures for the minigame endpoints.
//!
//! The service is loose about scalar encodings: ids and scores arrive as
//! strings in some payloads and numbers in others, so the id/score fields
//! deserialize through lenient adapters instead of failing the whole
//! response on a representation change.

use std::fmt;

use serde::{Deserialize, Deserializer};

pub const ZONE_KIND_ORDINARY: u8 = 3;
pub const ZONE_KIND_BOSS: u8 = 4;

/// Every JSON body is wrapped as `{"response": {...}}`; rejections usually
/// carry an empty object, which decodes to `response: None`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResponseEnvelope<T> {
    #[serde(default)]
    pub response: Option<T>,
}

/// Placeholder for operations whose success body carries nothing we use.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmptyBody {}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanetList {
    #[serde(default)]
    pub planets: Vec<Planet>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Planet {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub state: PlanetState,
    /// Present on GetPlanet detail responses, absent on GetPlanets summaries.
    #[serde(default)]
    pub zones: Vec<Zone>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanetState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub captured: bool,
    #[serde(default)]
    pub capture_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Zone {
    pub zone_position: u32,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub gameid: Option<String>,
    #[serde(default)]
    pub captured: bool,
    #[serde(default)]
    pub capture_progress: f64,
    #[serde(default)]
    pub difficulty: u8,
    #[serde(rename = "type", default = "default_zone_kind")]
    pub kind: u8,
    #[serde(default)]
    pub boss_active: bool,
}

fn default_zone_kind() -> u8 {
    ZONE_KIND_ORDINARY
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerInfo {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub score: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub next_level_score: u64,
    #[serde(default)]
    pub level: u32,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub active_planet: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub active_zone_game: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub active_zone_position: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub active_boss_game: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScoreBody {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub old_score: u64,
    #[serde(default)]
    pub old_level: u32,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub new_score: u64,
    #[serde(default)]
    pub new_level: u32,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub next_level_score: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ZoneJoinBody {
    #[serde(default)]
    pub zone_info: Option<Zone>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BossReportBody {
    #[serde(default)]
    pub boss_status: Option<BossStatus>,
    #[serde(default)]
    pub waiting_for_players: bool,
    #[serde(default)]
    pub game_over: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BossStatus {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub boss_hp: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub boss_max_hp: u64,
    #[serde(default)]
    pub players: Vec<BossPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BossPlayer {
    #[serde(default, rename = "persona_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub hp: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub xp_earned: u64,
}

/// Zone difficulty tier. Higher tiers pay exponentially more score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    /// Tiers in selection priority order, hardest first.
    pub const DESCENDING: [Difficulty; 3] = [Difficulty::High, Difficulty::Medium, Difficulty::Low];

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Difficulty::Low),
            2 => Some(Difficulty::Medium),
            3 => Some(Difficulty::High),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Difficulty::Low => 1,
            Difficulty::Medium => 2,
            Difficulty::High => 3,
        }
    }

    /// Score scaling: `2^(tier - 1)`.
    pub fn score_multiplier(self) -> u64 {
        1 << (self.raw() - 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Medium => "medium",
            Difficulty::High => "high",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(u64),
    Str(String),
}

impl NumOrStr {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            NumOrStr::Num(value) => Ok(value),
            NumOrStr::Str(text) => text
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("expected numeric string, got {text:?}"))),
        }
    }

    fn into_string(self) -> String {
        match self {
            NumOrStr::Num(value) => value.to_string(),
            NumOrStr::Str(text) => text,
        }
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    NumOrStr::deserialize(deserializer)?.into_u64()
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(NumOrStr::deserialize(deserializer)?.into_string())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    Ok(value.map(NumOrStr::into_string))
}

fn lenient_opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(raw) => {
            let wide = raw.into_u64::<D::Error>()?;
            u32::try_from(wide)
                .map(Some)
                .map_err(|_| serde::de::Error::custom("value exceeds u32 range"))
        }
    }
}
