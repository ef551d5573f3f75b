//! Per-account identity and cached player progress.
//!
//! A session is owned by exactly one worker; nothing here is shared or
//! synchronized. The cached snapshot is only as fresh as the last
//! `refresh`/`apply_score` call, which is all the worker loop needs.

use std::fmt;

use salien_proto::{PlayerInfo, ScoreBody};

use crate::client::GameClient;
use crate::error::SwarmError;

pub const ACCESS_TOKEN_LEN: usize = 32;

/// Opaque credential for one account. Validated at parse time so a bad
/// token fails at startup instead of as an endless access-denied loop.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn parse(raw: &str) -> Result<Self, SwarmError> {
        let trimmed = raw.trim();
        if trimmed.len() != ACCESS_TOKEN_LEN {
            return Err(SwarmError::InvalidToken {
                reason: format!(
                    "expected {} characters, got {}",
                    ACCESS_TOKEN_LEN,
                    trimmed.len()
                ),
            });
        }
        if !trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(SwarmError::InvalidToken {
                reason: "token must be ASCII alphanumeric".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw credential, for request building only. Never log this.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\u{2026}", &self.0[..4])
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({}\u{2026})", &self.0[..4])
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    token: AccessToken,
    name: String,
    player: PlayerInfo,
}

impl Session {
    pub fn new(token: AccessToken, name: impl Into<String>) -> Self {
        Self {
            token,
            name: name.into(),
            player: PlayerInfo::default(),
        }
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn player(&self) -> &PlayerInfo {
        &self.player
    }

    /// Re-fetches the player snapshot. Returns false when the service
    /// rejected the call; the previous snapshot stays in place.
    pub fn refresh<C: GameClient>(&mut self, client: &C) -> bool {
        let response = client.player_info(&self.token);
        if !response.result.is_ok() {
            tracing::warn!(
                worker = %self.name,
                result = %response.result,
                message = response.error_message.as_deref().unwrap_or(""),
                "player info refresh rejected"
            );
            return false;
        }
        match response.body {
            Some(player) => {
                self.player = player;
                true
            }
            None => false,
        }
    }

    /// Folds an accepted score report into the snapshot without a
    /// round-trip.
    pub fn apply_score(&mut self, body: &ScoreBody) {
        self.player.score = body.new_score;
        self.player.level = body.new_level;
        self.player.next_level_score = body.next_level_score;
    }

    pub fn active_zone_matches(&self, zone_position: u32) -> bool {
        self.player.active_zone_position == Some(zone_position)
    }
}
