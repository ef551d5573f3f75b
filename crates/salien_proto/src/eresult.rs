//! Authoritative result codes returned by the service in the `x-eresult`
//! response header. The body's HTTP status is always 200; this code is the
//! real verdict on a request.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EResult {
    Ok,
    Fail,
    /// The session is in a state the operation does not apply to. What that
    /// means depends on the operation: on JoinZone it is "already inside",
    /// on JoinBossZone it is "not a boss zone", on ReportBossDamage it is
    /// "player no longer in the fight".
    InvalidState,
    AccessDenied,
    /// The joined instance no longer exists, i.e. the zone was captured
    /// underneath us.
    Expired,
    /// Report arrived too late, or the session is not attacking the zone it
    /// reported for.
    ValueOutOfRange,
    /// Malformed request parameter, notably an implausible score value.
    InvalidParam,
    /// Report arrived before the minimum elapsed round time.
    TimeNotSynced,
    Unknown(u32),
}

impl EResult {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => EResult::Ok,
            2 => EResult::Fail,
            11 => EResult::InvalidState,
            15 => EResult::AccessDenied,
            27 => EResult::Expired,
            42 => EResult::ValueOutOfRange,
            73 => EResult::InvalidParam,
            93 => EResult::TimeNotSynced,
            other => EResult::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            EResult::Ok => 1,
            EResult::Fail => 2,
            EResult::InvalidState => 11,
            EResult::AccessDenied => 15,
            EResult::Expired => 27,
            EResult::ValueOutOfRange => 42,
            EResult::InvalidParam => 73,
            EResult::TimeNotSynced => 93,
            EResult::Unknown(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == EResult::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EResult::Ok => "ok",
            EResult::Fail => "fail",
            EResult::InvalidState => "invalid_state",
            EResult::AccessDenied => "access_denied",
            EResult::Expired => "expired",
            EResult::ValueOutOfRange => "value_out_of_range",
            EResult::InvalidParam => "invalid_param",
            EResult::TimeNotSynced => "time_not_synced",
            EResult::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for EResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_roundtrip() {
        for code in [1_u32, 2, 11, 15, 27, 42, 73, 93] {
            assert_eq!(EResult::from_code(code).code(), code);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let result = EResult::from_code(4711);
        assert_eq!(result, EResult::Unknown(4711));
        assert_eq!(result.code(), 4711);
        assert!(!result.is_ok());
    }

    #[test]
    fn only_code_one_is_ok() {
        assert!(EResult::from_code(1).is_ok());
        assert!(!EResult::from_code(2).is_ok());
        assert!(!EResult::from_code(93).is_ok());
    }

    #[test]
    fn display_includes_numeric_code() {
        assert_eq!(EResult::Expired.to_string(), "expired (27)");
        assert_eq!(EResult::Unknown(99).to_string(), "unknown (99)");
    }
}
