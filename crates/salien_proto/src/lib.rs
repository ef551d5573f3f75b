//! Wire-level protocol types for the territory-control minigame service.
//!
//! Everything here mirrors what the service actually sends: the JSON
//! `{"response": ...}` envelope, planet/zone/player payloads with their
//! inconsistent string-or-number field encodings, and the out-of-band
//! numeric result code carried in response headers.

pub mod eresult;
pub mod minigame;

pub use eresult::EResult;
pub use minigame::{
    BossPlayer, BossReportBody, BossStatus, Difficulty, EmptyBody, Planet, PlanetList,
    PlanetState, PlayerInfo, ResponseEnvelope, ScoreBody, Zone, ZoneJoinBody, ZONE_KIND_BOSS,
    ZONE_KIND_ORDINARY,
};
