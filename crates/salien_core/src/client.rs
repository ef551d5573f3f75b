//! Thin request layer over the minigame service.
//!
//! The service always answers HTTP 200; the real verdict rides in the
//! `x-eresult` header with an optional `x-error_message`. Transport and
//! decode failures are retried here forever with a short delay, so callers
//! only ever see one fully-formed [`ApiResponse`] per logical call and never
//! a transport error. Application-level rejections are NOT retried — they
//! are returned for the caller to classify.

use std::time::Duration;

use serde::de::DeserializeOwned;

use salien_proto::{
    BossReportBody, EResult, EmptyBody, PlanetList, PlayerInfo, ResponseEnvelope, ScoreBody,
    ZoneJoinBody,
};

use crate::config::SwarmConfig;
use crate::error::SwarmError;
use crate::session::AccessToken;

pub const API_VERSION: &str = "v0001";
const TERRITORY_INTERFACE: &str = "ITerritoryControlMinigameService";
const MINIGAME_INTERFACE: &str = "IMiniGameService";

const RESULT_HEADER: &str = "x-eresult";
const ERROR_MESSAGE_HEADER: &str = "x-error_message";

const TRANSPORT_RETRY_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One fully-formed answer from the service: authoritative result code,
/// optional human-readable message, and the decoded body when one was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub result: EResult,
    pub error_message: Option<String>,
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(body: T) -> Self {
        Self {
            result: EResult::Ok,
            error_message: None,
            body: Some(body),
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            result: EResult::Ok,
            error_message: None,
            body: None,
        }
    }

    pub fn rejected(result: EResult, error_message: Option<String>) -> Self {
        Self {
            result,
            error_message,
            body: None,
        }
    }
}

/// Capability boundary to the remote service. Implementations must be safe
/// to share across the coordinator and all workers.
pub trait GameClient: Send + Sync {
    fn planets(&self) -> ApiResponse<PlanetList>;
    fn planet(&self, planet_id: &str) -> ApiResponse<PlanetList>;
    fn player_info(&self, token: &AccessToken) -> ApiResponse<PlayerInfo>;
    fn join_planet(&self, token: &AccessToken, planet_id: &str) -> ApiResponse<EmptyBody>;
    fn join_zone(&self, token: &AccessToken, zone_position: u32) -> ApiResponse<ZoneJoinBody>;
    fn join_boss_zone(&self, token: &AccessToken, zone_position: u32) -> ApiResponse<EmptyBody>;
    fn represent_clan(&self, token: &AccessToken, clan_id: &str) -> ApiResponse<EmptyBody>;
    fn report_score(&self, token: &AccessToken, score: u64) -> ApiResponse<ScoreBody>;
    fn report_boss_damage(
        &self,
        token: &AccessToken,
        damage_to_boss: u32,
        damage_taken: u32,
        use_heal: bool,
    ) -> ApiResponse<BossReportBody>;
    fn leave_instance(&self, token: &AccessToken, gameid: &str) -> ApiResponse<EmptyBody>;
}

#[derive(Debug, Clone)]
pub struct HttpGameClient {
    base_url: String,
    language: String,
    http: reqwest::blocking::Client,
}

impl HttpGameClient {
    pub fn new(config: &SwarmConfig) -> Result<Self, SwarmError> {
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://steamcommunity.com"));
        headers.insert(
            REFERER,
            HeaderValue::from_static("https://steamcommunity.com/saliengame/play"),
        );
        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/67.0.3396.87 Safari/537.36",
            )
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| SwarmError::BuildClient {
                message: err.to_string(),
            })?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            http,
        })
    }

    fn url(&self, interface: &str, method: &str) -> String {
        format!("{}/{}/{}/{}/", self.base_url, interface, method, API_VERSION)
    }

    fn get<T: DeserializeOwned>(
        &self,
        interface: &str,
        method: &str,
        params: &[(&str, String)],
    ) -> ApiResponse<T> {
        loop {
            let attempt = self
                .http
                .get(self.url(interface, method))
                .query(params)
                .send();
            match decode(attempt) {
                Ok(response) => return response,
                Err(reason) => retry_wait(method, &reason),
            }
        }
    }

    fn post<T: DeserializeOwned>(
        &self,
        interface: &str,
        method: &str,
        form: &[(&str, String)],
    ) -> ApiResponse<T> {
        loop {
            let attempt = self
                .http
                .post(self.url(interface, method))
                .form(form)
                .send();
            match decode(attempt) {
                Ok(response) => return response,
                Err(reason) => retry_wait(method, &reason),
            }
        }
    }
}

fn retry_wait(method: &str, reason: &str) {
    tracing::warn!(method, reason, "transport failure, retrying");
    std::thread::sleep(TRANSPORT_RETRY_DELAY);
}

/// Splits transport/decode failures (retried) from well-formed responses
/// (returned, whatever their result code). A missing `x-eresult` header
/// means the answer did not come from the service proper and is retried.
fn decode<T: DeserializeOwned>(
    attempt: Result<reqwest::blocking::Response, reqwest::Error>,
) -> Result<ApiResponse<T>, String> {
    let response = attempt.map_err(|err| err.to_string())?;
    let result = response
        .headers()
        .get(RESULT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|text| text.trim().parse::<u32>().ok())
        .map(EResult::from_code)
        .ok_or_else(|| format!("missing or malformed {RESULT_HEADER} header"))?;
    let error_message = response
        .headers()
        .get(ERROR_MESSAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let envelope: ResponseEnvelope<T> = response.json().map_err(|err| err.to_string())?;
    Ok(ApiResponse {
        result,
        error_message,
        body: envelope.response,
    })
}

impl GameClient for HttpGameClient {
    fn planets(&self) -> ApiResponse<PlanetList> {
        self.get(
            TERRITORY_INTERFACE,
            "GetPlanets",
            &[
                ("active_only", "1".to_string()),
                ("language", self.language.clone()),
            ],
        )
    }

    fn planet(&self, planet_id: &str) -> ApiResponse<PlanetList> {
        self.get(
            TERRITORY_INTERFACE,
            "GetPlanet",
            &[
                ("id", planet_id.to_string()),
                ("language", self.language.clone()),
            ],
        )
    }

    fn player_info(&self, token: &AccessToken) -> ApiResponse<PlayerInfo> {
        self.post(
            TERRITORY_INTERFACE,
            "GetPlayerInfo",
            &[("access_token", token.secret().to_string())],
        )
    }

    fn join_planet(&self, token: &AccessToken, planet_id: &str) -> ApiResponse<EmptyBody> {
        self.post(
            TERRITORY_INTERFACE,
            "JoinPlanet",
            &[
                ("id", planet_id.to_string()),
                ("access_token", token.secret().to_string()),
            ],
        )
    }

    fn join_zone(&self, token: &AccessToken, zone_position: u32) -> ApiResponse<ZoneJoinBody> {
        self.post(
            TERRITORY_INTERFACE,
            "JoinZone",
            &[
                ("zone_position", zone_position.to_string()),
                ("access_token", token.secret().to_string()),
            ],
        )
    }

    fn join_boss_zone(&self, token: &AccessToken, zone_position: u32) -> ApiResponse<EmptyBody> {
        self.post(
            TERRITORY_INTERFACE,
            "JoinBossZone",
            &[
                ("zone_position", zone_position.to_string()),
                ("access_token", token.secret().to_string()),
            ],
        )
    }

    fn represent_clan(&self, token: &AccessToken, clan_id: &str) -> ApiResponse<EmptyBody> {
        self.post(
            TERRITORY_INTERFACE,
            "RepresentClan",
            &[
                ("clanid", clan_id.to_string()),
                ("access_token", token.secret().to_string()),
            ],
        )
    }

    fn report_score(&self, token: &AccessToken, score: u64) -> ApiResponse<ScoreBody> {
        self.post(
            TERRITORY_INTERFACE,
            "ReportScore",
            &[
                ("access_token", token.secret().to_string()),
                ("score", score.to_string()),
                ("language", self.language.clone()),
            ],
        )
    }

    fn report_boss_damage(
        &self,
        token: &AccessToken,
        damage_to_boss: u32,
        damage_taken: u32,
        use_heal: bool,
    ) -> ApiResponse<BossReportBody> {
        self.post(
            TERRITORY_INTERFACE,
            "ReportBossDamage",
            &[
                ("access_token", token.secret().to_string()),
                ("use_heal_ability", (if use_heal { "1" } else { "0" }).to_string()),
                ("damage_to_boss", damage_to_boss.to_string()),
                ("damage_taken", damage_taken.to_string()),
            ],
        )
    }

    fn leave_instance(&self, token: &AccessToken, gameid: &str) -> ApiResponse<EmptyBody> {
        self.post(
            MINIGAME_INTERFACE,
            "LeaveGame",
            &[
                ("access_token", token.secret().to_string()),
                ("gameid", gameid.to_string()),
            ],
        )
    }
}
