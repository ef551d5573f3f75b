//! Per-account worker: joins the published target, runs engagement rounds,
//! reports scores and reacts to authoritative rejections.
//!
//! Workers never talk to each other. The only cross-worker effects are
//! reading the coordinator's published target and asking it to revalidate;
//! everything else is the worker's own session against the service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

use salien_proto::{Difficulty, EResult};

use crate::client::GameClient;
use crate::config::SwarmConfig;
use crate::coordinator::CoordinatorHandle;
use crate::outcome::{
    classify_boss_join, classify_boss_report, classify_leave, classify_score, classify_zone_join,
    BossJoinOutcome, BossReportOutcome, LeaveOutcome, ScoreOutcome, ZoneJoinOutcome,
};
use crate::select::{Target, TargetKey};
use crate::session::Session;

/// Upper bound on any single sleep so shutdown is observed promptly.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// What one engagement round amounted to. Every variant is recoverable;
/// the worker loop just moves on to the next round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Nothing published yet; waited briefly.
    NoTarget,
    /// Full ordinary round, score accepted.
    Scored { points: u64 },
    /// The server moved us off the zone mid-window; no score reported.
    ZoneLost,
    /// An authoritative code said the target no longer matches reality;
    /// revalidation was requested.
    StaleTarget,
    /// A join was rejected for a reason that is not staleness.
    JoinRejected,
    /// The round completed but the report was not accepted.
    ReportRejected,
    /// Boss fight ran to its end.
    BossCleared,
    /// The player dropped out of the boss fight.
    Defeated,
    ShuttingDown,
}

/// Ordinary-round score: seconds of engagement times the per-second base
/// rate, doubled per difficulty tier above the lowest.
pub fn score_for_window(difficulty: Difficulty, window: Duration, base_rate: u64) -> u64 {
    window.as_secs() * base_rate * difficulty.score_multiplier()
}

enum Hold {
    Completed,
    MovedOff,
    Shutdown,
}

pub struct Worker<C> {
    session: Session,
    client: Arc<C>,
    coordinator: CoordinatorHandle<C>,
    config: SwarmConfig,
    shutdown: Arc<AtomicBool>,
    /// Key of the target last acted on, for change detection. Compared by
    /// ids, not snapshot contents.
    acted_on: Option<TargetKey>,
}

impl<C: GameClient> Worker<C> {
    pub fn new(
        session: Session,
        client: Arc<C>,
        coordinator: CoordinatorHandle<C>,
        config: SwarmConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session,
            client,
            coordinator,
            config,
            shutdown,
            acted_on: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until the shared shutdown flag flips.
    pub fn run(mut self) {
        if self.session.refresh(&*self.client) {
            let player = self.session.player();
            tracing::info!(
                worker = %self.session.name(),
                score = player.score,
                next_level_score = player.next_level_score,
                level = player.level,
                "worker online"
            );
        }
        self.recover_active_instances();
        if let Some(clan_id) = self.config.clan_id.clone() {
            self.represent_clan(&clan_id);
        }

        while !self.shutting_down() {
            match self.run_round() {
                RoundOutcome::ShuttingDown => break,
                // Session already updated from the report body.
                RoundOutcome::Scored { .. } => {}
                RoundOutcome::NoTarget => continue,
                _ => {
                    self.session.refresh(&*self.client);
                }
            }
        }
        tracing::info!(worker = %self.session.name(), "worker stopped");
    }

    /// One pass of the main loop; the separately testable unit.
    pub fn run_round(&mut self) -> RoundOutcome {
        let Some(target) = self.coordinator.current_target() else {
            tracing::debug!(worker = %self.session.name(), "no published target yet");
            if !self.pause(self.config.zone_poll_interval) {
                return RoundOutcome::ShuttingDown;
            }
            return RoundOutcome::NoTarget;
        };

        let key = target.key();
        if self.acted_on.as_ref() != Some(&key) {
            self.move_to_planet(&target);
            self.acted_on = Some(key);
        }

        if target.is_boss() {
            self.run_boss_round(&target)
        } else {
            self.run_ordinary_round(&target)
        }
    }

    /// Leaves whatever instances the service still has this session inside
    /// from a previous run. Leaving something we are not in is benign.
    fn recover_active_instances(&mut self) {
        let player = self.session.player().clone();
        for gameid in [
            player.active_boss_game,
            player.active_zone_game,
            player.active_planet,
        ]
        .into_iter()
        .flatten()
        {
            self.leave_instance(&gameid);
        }
        self.session.refresh(&*self.client);
    }

    fn represent_clan(&self, clan_id: &str) {
        let response = self.client.represent_clan(self.session.token(), clan_id);
        if response.result.is_ok() {
            tracing::info!(worker = %self.session.name(), clan = clan_id, "representing clan");
        } else {
            tracing::warn!(
                worker = %self.session.name(),
                clan = clan_id,
                result = %response.result,
                "clan representation rejected"
            );
        }
    }

    fn move_to_planet(&mut self, target: &Target) {
        let planet_id = target.planet().id.clone();
        let already_there = self
            .acted_on
            .as_ref()
            .is_some_and(|key| key.planet_id == planet_id);
        if already_there {
            return;
        }

        if let Some(active) = self.session.player().active_planet.clone() {
            if active != planet_id {
                self.leave_instance(&active);
            }
        }

        let response = self.client.join_planet(self.session.token(), &planet_id);
        match response.result {
            // Already being on the planet is as good as joining it.
            EResult::Ok | EResult::InvalidState => {
                tracing::info!(
                    worker = %self.session.name(),
                    planet = %planet_id,
                    name = %target.planet().name,
                    "joined planet"
                );
            }
            result => {
                tracing::warn!(
                    worker = %self.session.name(),
                    planet = %planet_id,
                    result = %result,
                    message = response.error_message.as_deref().unwrap_or(""),
                    "planet join rejected"
                );
            }
        }
    }

    fn run_ordinary_round(&mut self, target: &Target) -> RoundOutcome {
        let zone = target.zone();
        match classify_zone_join(self.client.join_zone(self.session.token(), zone.zone_position))
        {
            ZoneJoinOutcome::Joined(_) => {
                tracing::info!(
                    worker = %self.session.name(),
                    target = %target,
                    difficulty = zone.difficulty,
                    progress = zone.capture_progress,
                    "attacking zone"
                );
            }
            ZoneJoinOutcome::AlreadyInside => {
                tracing::debug!(worker = %self.session.name(), target = %target, "already inside zone");
            }
            ZoneJoinOutcome::Captured => {
                tracing::warn!(
                    worker = %self.session.name(),
                    target = %target,
                    "zone already captured, requesting revalidation"
                );
                self.coordinator.revalidate();
                return RoundOutcome::StaleTarget;
            }
            ZoneJoinOutcome::Rejected { result, message } => {
                tracing::warn!(
                    worker = %self.session.name(),
                    target = %target,
                    result = %result,
                    message = message.as_deref().unwrap_or(""),
                    "zone join rejected"
                );
                return RoundOutcome::JoinRejected;
            }
        }

        match self.hold_zone(zone.zone_position) {
            Hold::Shutdown => RoundOutcome::ShuttingDown,
            Hold::MovedOff => {
                tracing::warn!(
                    worker = %self.session.name(),
                    target = %target,
                    "moved off zone mid-window, aborting without score"
                );
                if let Some(gameid) = zone.gameid.clone() {
                    self.leave_instance(&gameid);
                }
                RoundOutcome::ZoneLost
            }
            Hold::Completed => self.report_round_score(target),
        }
    }

    /// Waits out the engagement window, checking at the poll cadence that
    /// the service still has us in the targeted zone.
    fn hold_zone(&mut self, zone_position: u32) -> Hold {
        let jitter_ms = self.config.window_jitter.as_millis() as u64;
        let jitter = Duration::from_millis(if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        });
        let deadline = Instant::now() + self.config.engagement_window + jitter;
        let mut next_poll = Instant::now() + self.config.zone_poll_interval;

        loop {
            if self.shutting_down() {
                return Hold::Shutdown;
            }
            let now = Instant::now();
            if now >= deadline {
                return Hold::Completed;
            }
            if now >= next_poll {
                next_poll = now + self.config.zone_poll_interval;
                if self.session.refresh(&*self.client)
                    && !self.session.active_zone_matches(zone_position)
                {
                    return Hold::MovedOff;
                }
            }
            let sleep_for = (deadline - now)
                .min(next_poll.saturating_duration_since(now))
                .min(SLEEP_SLICE);
            thread::sleep(sleep_for);
        }
    }

    fn report_round_score(&mut self, target: &Target) -> RoundOutcome {
        let difficulty = Difficulty::from_raw(target.zone().difficulty).unwrap_or(Difficulty::Low);
        let points = score_for_window(
            difficulty,
            self.config.engagement_window,
            self.config.base_score_rate,
        );
        match classify_score(self.client.report_score(self.session.token(), points)) {
            ScoreOutcome::Accepted(body) => {
                self.session.apply_score(&body);
                tracing::info!(
                    worker = %self.session.name(),
                    points,
                    score = body.new_score,
                    next_level_score = body.next_level_score,
                    level = body.new_level,
                    "score accepted"
                );
                RoundOutcome::Scored { points }
            }
            ScoreOutcome::TooEarly => {
                tracing::warn!(worker = %self.session.name(), "report sent too early");
                RoundOutcome::ReportRejected
            }
            ScoreOutcome::InvalidScore => {
                tracing::warn!(
                    worker = %self.session.name(),
                    points,
                    "score value rejected, check the score computation"
                );
                RoundOutcome::ReportRejected
            }
            ScoreOutcome::ZoneCaptured => {
                tracing::warn!(
                    worker = %self.session.name(),
                    target = %target,
                    "zone captured before the report landed, requesting revalidation"
                );
                self.coordinator.revalidate();
                RoundOutcome::StaleTarget
            }
            ScoreOutcome::Rejected { result, message } => {
                tracing::warn!(
                    worker = %self.session.name(),
                    result = %result,
                    message = message.as_deref().unwrap_or(""),
                    "score report rejected"
                );
                RoundOutcome::ReportRejected
            }
        }
    }

    fn run_boss_round(&mut self, target: &Target) -> RoundOutcome {
        let zone = target.zone();
        match classify_boss_join(
            self.client
                .join_boss_zone(self.session.token(), zone.zone_position),
        ) {
            BossJoinOutcome::Joined => {
                tracing::info!(worker = %self.session.name(), target = %target, "joined boss fight");
            }
            BossJoinOutcome::NotBossZone => {
                tracing::warn!(
                    worker = %self.session.name(),
                    target = %target,
                    "not a boss zone, requesting revalidation"
                );
                self.coordinator.revalidate();
                return RoundOutcome::StaleTarget;
            }
            BossJoinOutcome::Ended => {
                tracing::warn!(
                    worker = %self.session.name(),
                    target = %target,
                    "boss fight already over, requesting revalidation"
                );
                self.coordinator.revalidate();
                return RoundOutcome::StaleTarget;
            }
            BossJoinOutcome::Rejected { result, message } => {
                tracing::warn!(
                    worker = %self.session.name(),
                    target = %target,
                    result = %result,
                    message = message.as_deref().unwrap_or(""),
                    "boss join rejected"
                );
                return RoundOutcome::JoinRejected;
            }
        }

        let mut since_report = Duration::ZERO;
        let mut since_heal = Duration::ZERO;
        loop {
            if !self.pause(self.config.boss_tick) {
                return RoundOutcome::ShuttingDown;
            }
            since_report += self.config.boss_tick;
            since_heal += self.config.boss_tick;
            if since_report < self.config.boss_report_interval {
                continue;
            }
            since_report = Duration::ZERO;
            let use_heal = since_heal >= self.config.boss_heal_interval;
            if use_heal {
                since_heal = Duration::ZERO;
            }

            let response = self.client.report_boss_damage(
                self.session.token(),
                self.config.boss_damage_to_boss,
                self.config.boss_damage_taken,
                use_heal,
            );
            match classify_boss_report(response) {
                BossReportOutcome::Status(body) => {
                    if body.game_over {
                        let xp = body
                            .boss_status
                            .as_ref()
                            .and_then(|status| status.players.first())
                            .map(|player| player.xp_earned)
                            .unwrap_or(0);
                        tracing::info!(
                            worker = %self.session.name(),
                            target = %target,
                            xp_earned = xp,
                            "boss fight over, requesting revalidation"
                        );
                        self.coordinator.revalidate();
                        return RoundOutcome::BossCleared;
                    }
                    if body.waiting_for_players {
                        tracing::debug!(worker = %self.session.name(), "boss waiting for players");
                        continue;
                    }
                    match &body.boss_status {
                        Some(status) => tracing::debug!(
                            worker = %self.session.name(),
                            boss_hp = status.boss_hp,
                            boss_max_hp = status.boss_max_hp,
                            used_heal = use_heal,
                            "boss damage reported"
                        ),
                        None => tracing::debug!(worker = %self.session.name(), "no boss status yet"),
                    }
                }
                BossReportOutcome::Defeated => {
                    tracing::warn!(worker = %self.session.name(), "defeated in boss fight");
                    return RoundOutcome::Defeated;
                }
                BossReportOutcome::Rejected { result, message } => {
                    tracing::warn!(
                        worker = %self.session.name(),
                        result = %result,
                        message = message.as_deref().unwrap_or(""),
                        "boss report rejected"
                    );
                }
            }
        }
    }

    fn leave_instance(&self, gameid: &str) {
        match classify_leave(self.client.leave_instance(self.session.token(), gameid)) {
            LeaveOutcome::Left => {
                tracing::info!(worker = %self.session.name(), gameid, "left instance");
            }
            LeaveOutcome::NotInInstance => {
                tracing::debug!(worker = %self.session.name(), gameid, "not in instance, nothing to leave");
            }
            LeaveOutcome::Rejected { result, message } => {
                tracing::warn!(
                    worker = %self.session.name(),
                    gameid,
                    result = %result,
                    message = message.as_deref().unwrap_or(""),
                    "leave rejected"
                );
            }
        }
    }

    /// Sliced sleep; false means shutdown was requested.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.shutting_down() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
