//! clockface-core — Face-descriptor matching and punch transitions.
//!
//! Pure data contracts and decision logic shared by the daemon and the
//! store: the validated 128-dimensional descriptor type, the
//! nearest-neighbour matcher, and the punch-in/punch-out state machine.
//! No I/O lives here.

pub mod descriptor;
pub mod matcher;
pub mod punch;

pub use descriptor::{Descriptor, DescriptorError, DESCRIPTOR_DIMENSIONS};
pub use matcher::{Candidate, MatchOutcome, Matcher, NearestMatcher, MATCH_THRESHOLD};
pub use punch::{AttendanceStatus, PunchAction, PunchError, PunchState};
