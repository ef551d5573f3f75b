//! Scripted in-memory stand-in for the remote service, shared by the
//! coordinator and worker tests. Defaults behave like a cooperative
//! server; individual calls can be overridden with queued responses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use salien_proto::{
    BossReportBody, EmptyBody, Planet, PlanetList, PlanetState, PlayerInfo, ScoreBody, Zone,
    ZoneJoinBody, ZONE_KIND_BOSS, ZONE_KIND_ORDINARY,
};

use crate::client::{ApiResponse, GameClient};
use crate::session::AccessToken;

pub(crate) fn token(fill: char) -> AccessToken {
    AccessToken::parse(&fill.to_string().repeat(32)).expect("test token")
}

pub(crate) fn zone(position: u32, difficulty: u8, progress: f64, boss_active: bool) -> Zone {
    Zone {
        zone_position: position,
        gameid: Some(format!("game-{position}")),
        captured: false,
        capture_progress: progress,
        difficulty,
        kind: if boss_active {
            ZONE_KIND_BOSS
        } else {
            ZONE_KIND_ORDINARY
        },
        boss_active,
    }
}

pub(crate) fn planet(id: &str, name: &str, zones: &[Zone]) -> Planet {
    Planet {
        id: id.to_string(),
        state: PlanetState {
            name: name.to_string(),
            active: true,
            captured: false,
            capture_progress: 0.0,
        },
        zones: zones.to_vec(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BossReportRecord {
    pub damage_to_boss: u32,
    pub damage_taken: u32,
    pub use_heal: bool,
}

#[derive(Default)]
struct FakeState {
    planets: Vec<Planet>,
    player: PlayerInfo,
    /// When set, joins no longer update the reported active zone; the
    /// player stays wherever the test pinned it.
    pinned_zone: bool,
    joined_planets: Vec<String>,
    joined_zones: Vec<u32>,
    reported_scores: Vec<u64>,
    left_instances: Vec<String>,
    boss_reports: Vec<BossReportRecord>,
    script_player_info: VecDeque<ApiResponse<PlayerInfo>>,
    script_join_zone: VecDeque<ApiResponse<ZoneJoinBody>>,
    script_join_boss: VecDeque<ApiResponse<EmptyBody>>,
    script_report_score: VecDeque<ApiResponse<ScoreBody>>,
    script_boss_report: VecDeque<ApiResponse<BossReportBody>>,
}

pub(crate) struct FakeGameClient {
    state: Mutex<FakeState>,
    planet_list_calls: AtomicUsize,
    planet_detail_calls: AtomicUsize,
    detail_delay: Mutex<Duration>,
}

impl FakeGameClient {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            planet_list_calls: AtomicUsize::new(0),
            planet_detail_calls: AtomicUsize::new(0),
            detail_delay: Mutex::new(Duration::ZERO),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }

    pub(crate) fn set_planets(&self, planets: Vec<Planet>) {
        self.state().planets = planets;
    }

    pub(crate) fn set_player(&self, player: PlayerInfo) {
        self.state().player = player;
    }

    pub(crate) fn force_active_zone(&self, position: Option<u32>, gameid: Option<String>) {
        let mut state = self.state();
        state.player.active_zone_position = position;
        state.player.active_zone_game = gameid;
        state.pinned_zone = true;
    }

    pub(crate) fn set_detail_delay(&self, delay: Duration) {
        *self.detail_delay.lock().expect("delay lock") = delay;
    }

    pub(crate) fn reset_counters(&self) {
        self.planet_list_calls.store(0, Ordering::SeqCst);
        self.planet_detail_calls.store(0, Ordering::SeqCst);
    }

    pub(crate) fn planet_list_calls(&self) -> usize {
        self.planet_list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn planet_detail_calls(&self) -> usize {
        self.planet_detail_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn joined_planets(&self) -> Vec<String> {
        self.state().joined_planets.clone()
    }

    pub(crate) fn joined_zones(&self) -> Vec<u32> {
        self.state().joined_zones.clone()
    }

    pub(crate) fn reported_scores(&self) -> Vec<u64> {
        self.state().reported_scores.clone()
    }

    pub(crate) fn left_instances(&self) -> Vec<String> {
        self.state().left_instances.clone()
    }

    pub(crate) fn boss_reports(&self) -> Vec<BossReportRecord> {
        self.state().boss_reports.clone()
    }

    pub(crate) fn script_player_info(&self, response: ApiResponse<PlayerInfo>) {
        self.state().script_player_info.push_back(response);
    }

    pub(crate) fn script_join_zone(&self, response: ApiResponse<ZoneJoinBody>) {
        self.state().script_join_zone.push_back(response);
    }

    pub(crate) fn script_join_boss(&self, response: ApiResponse<EmptyBody>) {
        self.state().script_join_boss.push_back(response);
    }

    pub(crate) fn script_report_score(&self, response: ApiResponse<ScoreBody>) {
        self.state().script_report_score.push_back(response);
    }

    pub(crate) fn script_boss_report(&self, response: ApiResponse<BossReportBody>) {
        self.state().script_boss_report.push_back(response);
    }
}

impl GameClient for FakeGameClient {
    fn planets(&self) -> ApiResponse<PlanetList> {
        self.planet_list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        let summaries = state
            .planets
            .iter()
            .map(|planet| Planet {
                zones: Vec::new(),
                ..planet.clone()
            })
            .collect();
        ApiResponse::ok(PlanetList { planets: summaries })
    }

    fn planet(&self, planet_id: &str) -> ApiResponse<PlanetList> {
        self.planet_detail_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.detail_delay.lock().expect("delay lock");
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let state = self.state();
        let planets = state
            .planets
            .iter()
            .filter(|planet| planet.id == planet_id)
            .cloned()
            .collect();
        ApiResponse::ok(PlanetList { planets })
    }

    fn player_info(&self, _token: &AccessToken) -> ApiResponse<PlayerInfo> {
        let mut state = self.state();
        if let Some(scripted) = state.script_player_info.pop_front() {
            return scripted;
        }
        ApiResponse::ok(state.player.clone())
    }

    fn join_planet(&self, _token: &AccessToken, planet_id: &str) -> ApiResponse<EmptyBody> {
        let mut state = self.state();
        state.joined_planets.push(planet_id.to_string());
        state.player.active_planet = Some(planet_id.to_string());
        ApiResponse::ok(EmptyBody::default())
    }

    fn join_zone(&self, _token: &AccessToken, zone_position: u32) -> ApiResponse<ZoneJoinBody> {
        let mut state = self.state();
        state.joined_zones.push(zone_position);
        if let Some(scripted) = state.script_join_zone.pop_front() {
            return scripted;
        }
        let zone_info = state
            .planets
            .iter()
            .flat_map(|planet| planet.zones.iter())
            .find(|zone| zone.zone_position == zone_position)
            .cloned();
        if !state.pinned_zone {
            state.player.active_zone_position = Some(zone_position);
            state.player.active_zone_game = zone_info
                .as_ref()
                .and_then(|zone| zone.gameid.clone());
        }
        ApiResponse::ok(ZoneJoinBody { zone_info })
    }

    fn join_boss_zone(&self, _token: &AccessToken, zone_position: u32) -> ApiResponse<EmptyBody> {
        let mut state = self.state();
        state.joined_zones.push(zone_position);
        if let Some(scripted) = state.script_join_boss.pop_front() {
            return scripted;
        }
        ApiResponse::ok(EmptyBody::default())
    }

    fn represent_clan(&self, _token: &AccessToken, _clan_id: &str) -> ApiResponse<EmptyBody> {
        ApiResponse::ok(EmptyBody::default())
    }

    fn report_score(&self, _token: &AccessToken, score: u64) -> ApiResponse<ScoreBody> {
        let mut state = self.state();
        state.reported_scores.push(score);
        if let Some(scripted) = state.script_report_score.pop_front() {
            return scripted;
        }
        let old_score = state.player.score;
        state.player.score = old_score + score;
        ApiResponse::ok(ScoreBody {
            old_score,
            old_level: state.player.level,
            new_score: state.player.score,
            new_level: state.player.level,
            next_level_score: state.player.next_level_score,
        })
    }

    fn report_boss_damage(
        &self,
        _token: &AccessToken,
        damage_to_boss: u32,
        damage_taken: u32,
        use_heal: bool,
    ) -> ApiResponse<BossReportBody> {
        let mut state = self.state();
        state.boss_reports.push(BossReportRecord {
            damage_to_boss,
            damage_taken,
            use_heal,
        });
        if let Some(scripted) = state.script_boss_report.pop_front() {
            return scripted;
        }
        ApiResponse::ok(BossReportBody::default())
    }

    fn leave_instance(&self, _token: &AccessToken, gameid: &str) -> ApiResponse<EmptyBody> {
        let mut state = self.state();
        state.left_instances.push(gameid.to_string());
        if state.player.active_planet.as_deref() == Some(gameid) {
            state.player.active_planet = None;
        }
        if state.player.active_zone_game.as_deref() == Some(gameid) {
            state.player.active_zone_game = None;
            state.player.active_zone_position = None;
        }
        if state.player.active_boss_game.as_deref() == Some(gameid) {
            state.player.active_boss_game = None;
        }
        ApiResponse::ok(EmptyBody::default())
    }
}
