//! Classification of service result codes into per-operation outcomes.
//!
//! The same numeric code means different things on different operations
//! (code 11 is "already inside" on JoinZone, "not a boss zone" on
//! JoinBossZone and "player defeated" on ReportBossDamage), so each
//! operation gets its own tagged outcome and callers branch on variants
//! instead of raw codes.

use salien_proto::{BossReportBody, EResult, EmptyBody, ScoreBody, Zone, ZoneJoinBody};

use crate::client::ApiResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneJoinOutcome {
    Joined(Option<Zone>),
    /// Benign: the session is already attacking this zone.
    AlreadyInside,
    /// The zone was captured underneath the published target.
    Captured,
    Rejected {
        result: EResult,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BossJoinOutcome {
    Joined,
    /// The published boss target does not match reality (wrong zone kind).
    NotBossZone,
    /// The boss instance already ended.
    Ended,
    Rejected {
        result: EResult,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left,
    /// Benign: the session was not in the instance to begin with.
    NotInInstance,
    Rejected {
        result: EResult,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Accepted(ScoreBody),
    /// Report arrived before the minimum round time; not a staleness signal.
    TooEarly,
    /// The score value itself was rejected; a bug signal on our side.
    InvalidScore,
    /// The zone ended or was captured before the report landed.
    ZoneCaptured,
    Rejected {
        result: EResult,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BossReportOutcome {
    /// Well-formed status; the caller inspects waiting/game-over/no-status.
    Status(BossReportBody),
    /// The player is out of the fight; the boss may still be up for others.
    Defeated,
    Rejected {
        result: EResult,
        message: Option<String>,
    },
}

pub fn classify_zone_join(response: ApiResponse<ZoneJoinBody>) -> ZoneJoinOutcome {
    match response.result {
        EResult::Ok => ZoneJoinOutcome::Joined(response.body.and_then(|body| body.zone_info)),
        EResult::InvalidState => ZoneJoinOutcome::AlreadyInside,
        EResult::Expired | EResult::ValueOutOfRange => ZoneJoinOutcome::Captured,
        result => ZoneJoinOutcome::Rejected {
            result,
            message: response.error_message,
        },
    }
}

pub fn classify_boss_join(response: ApiResponse<EmptyBody>) -> BossJoinOutcome {
    match response.result {
        EResult::Ok => BossJoinOutcome::Joined,
        EResult::InvalidState => BossJoinOutcome::NotBossZone,
        EResult::Expired | EResult::ValueOutOfRange => BossJoinOutcome::Ended,
        result => BossJoinOutcome::Rejected {
            result,
            message: response.error_message,
        },
    }
}

pub fn classify_leave(response: ApiResponse<EmptyBody>) -> LeaveOutcome {
    match response.result {
        EResult::Ok => LeaveOutcome::Left,
        EResult::InvalidState => LeaveOutcome::NotInInstance,
        result => LeaveOutcome::Rejected {
            result,
            message: response.error_message,
        },
    }
}

pub fn classify_score(response: ApiResponse<ScoreBody>) -> ScoreOutcome {
    match response.result {
        EResult::Ok => ScoreOutcome::Accepted(response.body.unwrap_or_default()),
        EResult::TimeNotSynced => ScoreOutcome::TooEarly,
        EResult::InvalidParam => ScoreOutcome::InvalidScore,
        EResult::Expired | EResult::ValueOutOfRange => ScoreOutcome::ZoneCaptured,
        result => ScoreOutcome::Rejected {
            result,
            message: response.error_message,
        },
    }
}

pub fn classify_boss_report(response: ApiResponse<BossReportBody>) -> BossReportOutcome {
    match response.result {
        EResult::Ok => BossReportOutcome::Status(response.body.unwrap_or_default()),
        EResult::InvalidState => BossReportOutcome::Defeated,
        result => BossReportOutcome::Rejected {
            result,
            message: response.error_message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected<T>(result: EResult) -> ApiResponse<T> {
        ApiResponse::rejected(result, Some("message".to_string()))
    }

    #[test]
    fn zone_join_classification() {
        let zone = Zone {
            zone_position: 3,
            gameid: Some("99".to_string()),
            captured: false,
            capture_progress: 0.2,
            difficulty: 2,
            kind: salien_proto::ZONE_KIND_ORDINARY,
            boss_active: false,
        };
        let joined = classify_zone_join(ApiResponse::ok(ZoneJoinBody {
            zone_info: Some(zone.clone()),
        }));
        assert_eq!(joined, ZoneJoinOutcome::Joined(Some(zone)));

        assert_eq!(
            classify_zone_join(rejected(EResult::InvalidState)),
            ZoneJoinOutcome::AlreadyInside
        );
        assert_eq!(
            classify_zone_join(rejected(EResult::Expired)),
            ZoneJoinOutcome::Captured
        );
        assert_eq!(
            classify_zone_join(rejected(EResult::ValueOutOfRange)),
            ZoneJoinOutcome::Captured
        );
        assert!(matches!(
            classify_zone_join(rejected(EResult::AccessDenied)),
            ZoneJoinOutcome::Rejected {
                result: EResult::AccessDenied,
                ..
            }
        ));
    }

    #[test]
    fn boss_join_classification() {
        assert_eq!(
            classify_boss_join(ApiResponse::ok(EmptyBody::default())),
            BossJoinOutcome::Joined
        );
        assert_eq!(
            classify_boss_join(rejected(EResult::InvalidState)),
            BossJoinOutcome::NotBossZone
        );
        assert_eq!(
            classify_boss_join(rejected(EResult::Expired)),
            BossJoinOutcome::Ended
        );
    }

    #[test]
    fn leave_on_absent_instance_is_success() {
        assert_eq!(
            classify_leave(rejected(EResult::InvalidState)),
            LeaveOutcome::NotInInstance
        );
        assert_eq!(
            classify_leave(ApiResponse::ok(EmptyBody::default())),
            LeaveOutcome::Left
        );
    }

    #[test]
    fn score_classification_covers_reaction_table() {
        let accepted = classify_score(ApiResponse::ok(ScoreBody {
            new_score: 1200,
            ..Default::default()
        }));
        assert!(matches!(
            accepted,
            ScoreOutcome::Accepted(ScoreBody {
                new_score: 1200,
                ..
            })
        ));
        assert_eq!(
            classify_score(rejected(EResult::TimeNotSynced)),
            ScoreOutcome::TooEarly
        );
        assert_eq!(
            classify_score(rejected(EResult::InvalidParam)),
            ScoreOutcome::InvalidScore
        );
        assert_eq!(
            classify_score(rejected(EResult::Expired)),
            ScoreOutcome::ZoneCaptured
        );
        assert_eq!(
            classify_score(rejected(EResult::ValueOutOfRange)),
            ScoreOutcome::ZoneCaptured
        );
        assert!(matches!(
            classify_score(rejected(EResult::Unknown(55))),
            ScoreOutcome::Rejected {
                result: EResult::Unknown(55),
                ..
            }
        ));
    }

    #[test]
    fn accepted_score_without_body_yields_defaults() {
        let outcome = classify_score(ApiResponse {
            result: EResult::Ok,
            error_message: None,
            body: None,
        });
        assert_eq!(outcome, ScoreOutcome::Accepted(ScoreBody::default()));
    }

    #[test]
    fn boss_report_classification() {
        let body = BossReportBody {
            game_over: true,
            ..Default::default()
        };
        assert_eq!(
            classify_boss_report(ApiResponse::ok(body.clone())),
            BossReportOutcome::Status(body)
        );
        assert_eq!(
            classify_boss_report(rejected(EResult::InvalidState)),
            BossReportOutcome::Defeated
        );
        assert!(matches!(
            classify_boss_report(rejected(EResult::Fail)),
            BossReportOutcome::Rejected { .. }
        ));
    }
}
