use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status tag carried by an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Leave,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::Leave => "leave",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "late" => Some(Self::Late),
            "leave" => Some(Self::Leave),
            _ => None,
        }
    }
}

/// Punch state of one (user, date) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchState {
    /// No attendance record exists for the day.
    NoRecord,
    /// A record exists with punch-out unset.
    PunchedIn,
    /// A record exists with punch-out set. Terminal for the day.
    PunchedOut,
}

impl PunchState {
    /// Derive the state from the stored record shape, if any.
    /// `record` is (has punch-in, has punch-out).
    pub fn from_record(record: Option<(bool, bool)>) -> Self {
        match record {
            None => Self::NoRecord,
            Some((_, false)) => Self::PunchedIn,
            Some((_, true)) => Self::PunchedOut,
        }
    }

    /// Decide the transition the current state permits.
    pub fn next_action(self) -> Result<PunchAction, PunchError> {
        match self {
            Self::NoRecord => Ok(PunchAction::PunchIn),
            Self::PunchedIn => Ok(PunchAction::PunchOut),
            Self::PunchedOut => Err(PunchError::AlreadyComplete),
        }
    }
}

/// Transition chosen for a matched identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchAction {
    PunchIn,
    PunchOut,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PunchError {
    /// Both punches already recorded for the day; a business rejection,
    /// not a system fault.
    #[error("Attendance already recorded for today")]
    AlreadyComplete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_sequence() {
        assert_eq!(PunchState::NoRecord.next_action(), Ok(PunchAction::PunchIn));
        assert_eq!(PunchState::PunchedIn.next_action(), Ok(PunchAction::PunchOut));
        assert_eq!(
            PunchState::PunchedOut.next_action(),
            Err(PunchError::AlreadyComplete)
        );
    }

    #[test]
    fn test_state_from_record_shape() {
        assert_eq!(PunchState::from_record(None), PunchState::NoRecord);
        assert_eq!(PunchState::from_record(Some((true, false))), PunchState::PunchedIn);
        assert_eq!(PunchState::from_record(Some((true, true))), PunchState::PunchedOut);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
            AttendanceStatus::Leave,
        ] {
            assert_eq!(AttendanceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AttendanceStatus::parse("holiday"), None);
    }
}
