//! Attendance-marking orchestration: validate the probe descriptor, match
//! it against the scoped candidate set, then drive the punch state machine
//! against the store.

use chrono::{NaiveDate, NaiveDateTime};
use clockface_core::{
    Descriptor, DescriptorError, MatchOutcome, Matcher, NearestMatcher, PunchAction, PunchState,
};
use clockface_store::{MatchScope, Store, StoreError, User};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkError {
    #[error(transparent)]
    InvalidDescriptor(#[from] DescriptorError),
    /// No descriptors enrolled in the matching scope at all.
    #[error("no descriptors enrolled in scope")]
    NoEnrollment,
    /// Nearest candidate not under the threshold.
    #[error("no candidate within threshold (nearest {nearest:.4})")]
    NoMatch { nearest: f64 },
    /// Both punches already recorded for the day.
    #[error("attendance already complete for today")]
    AlreadyComplete,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Successful punch: who, which transition, when, and how near the match
/// was.
#[derive(Debug)]
pub struct PunchRecord {
    pub user: User,
    pub action: PunchAction,
    pub time: NaiveDateTime,
    pub distance: f64,
}

/// Match a raw probe vector and apply today's punch transition.
///
/// Validation happens before any store access. The punch step tolerates
/// losing a create race: a unique-index conflict is re-driven as a
/// punch-out attempt, so two concurrent first punches resolve to one
/// `PunchIn` and one `PunchOut`, never two records.
pub async fn mark_attendance(
    store: &Store,
    matcher: &NearestMatcher,
    scope: MatchScope,
    probe: Vec<f64>,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<PunchRecord, MarkError> {
    let probe = Descriptor::new(probe)?;

    let candidates = store.candidates(scope).await?;
    if candidates.is_empty() {
        return Err(MarkError::NoEnrollment);
    }

    let (user_id, distance) = match matcher.find_match(&probe, &candidates) {
        MatchOutcome::NoEnrollment => return Err(MarkError::NoEnrollment),
        MatchOutcome::NoMatch { nearest } => return Err(MarkError::NoMatch { nearest }),
        MatchOutcome::Match { user_id, distance } => (user_id, distance),
    };

    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or(StoreError::NotFound("matched user"))?;

    tracing::debug!(
        user_id,
        distance,
        candidates = candidates.len(),
        "descriptor matched"
    );

    let action = punch(store, user_id, today, now).await?;
    tracing::info!(user_id, ?action, %today, "attendance transition applied");

    Ok(PunchRecord {
        user,
        action,
        time: now,
        distance,
    })
}

/// One step of the per-day state machine: `NoRecord` → `PunchedIn` →
/// `PunchedOut` (terminal).
async fn punch(
    store: &Store,
    user_id: i64,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<PunchAction, MarkError> {
    let record = store.attendance_on(user_id, today).await?;
    let state =
        PunchState::from_record(record.map(|r| (r.punch_in_time.is_some(), r.punch_out_time.is_some())));

    match state.next_action() {
        Err(_) => Err(MarkError::AlreadyComplete),
        Ok(PunchAction::PunchIn) => match store.create_punch_in(user_id, today, now).await {
            Ok(_) => Ok(PunchAction::PunchIn),
            // Lost the create race: another request made today's record
            // between our read and insert. Retry as a punch-out.
            Err(StoreError::PunchInConflict { .. }) => punch_out(store, user_id, today, now).await,
            Err(e) => Err(e.into()),
        },
        Ok(PunchAction::PunchOut) => punch_out(store, user_id, today, now).await,
    }
}

async fn punch_out(
    store: &Store,
    user_id: i64,
    today: NaiveDate,
    now: NaiveDateTime,
) -> Result<PunchAction, MarkError> {
    if store.complete_punch_out(user_id, today, now).await? {
        Ok(PunchAction::PunchOut)
    } else {
        // The conditional update found no open record, so a concurrent
        // request already closed the day.
        Err(MarkError::AlreadyComplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockface_core::DESCRIPTOR_DIMENSIONS;
    use clockface_store::Role;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn vector(fill: f64) -> Vec<f64> {
        vec![fill; DESCRIPTOR_DIMENSIONS]
    }

    async fn seed(store: &Store, fill: f64) -> (i64, i64) {
        let now = at("2026-08-01 08:00:00");
        let company = store
            .create_company("Acme".into(), format!("acme-{fill}@test"), now)
            .await
            .unwrap();
        let (user, _) = store
            .create_user(
                company.id,
                "Ada".into(),
                format!("ada-{fill}@acme"),
                Role::Employee,
                None,
                now,
            )
            .await
            .unwrap();
        store
            .upsert_descriptor(
                user.id,
                company.id,
                &Descriptor::new(vector(fill)).unwrap(),
                now,
            )
            .await
            .unwrap();
        (company.id, user.id)
    }

    #[tokio::test]
    async fn test_exact_match_punches_in_with_distance_zero() {
        let store = Store::open_in_memory().await.unwrap();
        let (cid, uid) = seed(&store, 0.25).await;

        let record = mark_attendance(
            &store,
            &NearestMatcher::default(),
            MatchScope::Company(cid),
            vector(0.25),
            date("2026-08-21"),
            at("2026-08-21 09:00:00"),
        )
        .await
        .unwrap();

        assert_eq!(record.user.id, uid);
        assert_eq!(record.action, PunchAction::PunchIn);
        assert_eq!(record.distance, 0.0);
    }

    #[tokio::test]
    async fn test_wrong_length_rejected_before_store_access() {
        // No enrollment at all: a length error must win over NoEnrollment.
        let store = Store::open_in_memory().await.unwrap();
        let err = mark_attendance(
            &store,
            &NearestMatcher::default(),
            MatchScope::Company(1),
            vec![0.0; 127],
            date("2026-08-21"),
            at("2026-08-21 09:00:00"),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            MarkError::InvalidDescriptor(DescriptorError::WrongLength(127))
        ));
    }

    #[tokio::test]
    async fn test_empty_scope_is_no_enrollment() {
        let store = Store::open_in_memory().await.unwrap();
        let err = mark_attendance(
            &store,
            &NearestMatcher::default(),
            MatchScope::AllTenants,
            vector(0.0),
            date("2026-08-21"),
            at("2026-08-21 09:00:00"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MarkError::NoEnrollment));
    }

    #[tokio::test]
    async fn test_distant_probe_is_no_match() {
        let store = Store::open_in_memory().await.unwrap();
        let (cid, _) = seed(&store, 0.0).await;

        let err = mark_attendance(
            &store,
            &NearestMatcher::default(),
            MatchScope::Company(cid),
            vector(1.0), // distance sqrt(128) from the enrolled vector
            date("2026-08-21"),
            at("2026-08-21 09:00:00"),
        )
        .await
        .unwrap_err();
        match err {
            MarkError::NoMatch { nearest } => assert!(nearest > 0.6),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_day_sequence_in_out_complete() {
        let store = Store::open_in_memory().await.unwrap();
        let (cid, _) = seed(&store, 0.25).await;
        let matcher = NearestMatcher::default();
        let scope = MatchScope::Company(cid);
        let day = date("2026-08-21");

        let first = mark_attendance(&store, &matcher, scope, vector(0.25), day, at("2026-08-21 09:00:00"))
            .await
            .unwrap();
        assert_eq!(first.action, PunchAction::PunchIn);
        assert_eq!(first.time, at("2026-08-21 09:00:00"));

        let second = mark_attendance(&store, &matcher, scope, vector(0.25), day, at("2026-08-21 17:00:00"))
            .await
            .unwrap();
        assert_eq!(second.action, PunchAction::PunchOut);
        assert_eq!(second.time, at("2026-08-21 17:00:00"));

        let err = mark_attendance(&store, &matcher, scope, vector(0.25), day, at("2026-08-21 18:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarkError::AlreadyComplete));

        // A new day starts the machine over.
        let next_day = mark_attendance(
            &store,
            &matcher,
            scope,
            vector(0.25),
            date("2026-08-22"),
            at("2026-08-22 09:00:00"),
        )
        .await
        .unwrap();
        assert_eq!(next_day.action, PunchAction::PunchIn);
    }

    #[tokio::test]
    async fn test_matching_is_tenant_scoped() {
        let store = Store::open_in_memory().await.unwrap();
        let (acme, _) = seed(&store, 0.25).await;
        let (globex, globex_user) = seed(&store, 0.75).await;

        // Probe matches only the Globex enrollment; scoped to Acme it is a
        // NoMatch, not a cross-tenant hit.
        let err = mark_attendance(
            &store,
            &NearestMatcher::default(),
            MatchScope::Company(acme),
            vector(0.75),
            date("2026-08-21"),
            at("2026-08-21 09:00:00"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MarkError::NoMatch { .. }));

        let record = mark_attendance(
            &store,
            &NearestMatcher::default(),
            MatchScope::Company(globex),
            vector(0.75),
            date("2026-08-21"),
            at("2026-08-21 09:00:00"),
        )
        .await
        .unwrap();
        assert_eq!(record.user.id, globex_user);
    }

    #[tokio::test]
    async fn test_lost_create_race_resolves_to_punch_out() {
        let store = Store::open_in_memory().await.unwrap();
        let (_cid, uid) = seed(&store, 0.25).await;
        let day = date("2026-08-21");

        // Another request created today's record between this request's
        // read and its insert; the insert conflict must re-drive the call
        // as a punch-out, never surface as a storage error.
        store
            .create_punch_in(uid, day, at("2026-08-21 09:00:00"))
            .await
            .unwrap();
        let err = store
            .create_punch_in(uid, day, at("2026-08-21 09:00:01"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PunchInConflict { .. }));

        let action = punch(&store, uid, day, at("2026-08-21 09:00:01")).await.unwrap();
        assert_eq!(action, PunchAction::PunchOut);

        // And once the day is closed, any further attempt is terminal.
        let err = punch(&store, uid, day, at("2026-08-21 18:00:00")).await.unwrap_err();
        assert!(matches!(err, MarkError::AlreadyComplete));
    }

    #[tokio::test]
    async fn test_concurrent_first_punches_never_create_two_records() {
        let store = Store::open_in_memory().await.unwrap();
        let (cid, uid) = seed(&store, 0.25).await;
        let day = date("2026-08-21");
        let matcher = NearestMatcher::default();

        let a = mark_attendance(
            &store,
            &matcher,
            MatchScope::Company(cid),
            vector(0.25),
            day,
            at("2026-08-21 09:00:00"),
        );
        let b = mark_attendance(
            &store,
            &matcher,
            MatchScope::Company(cid),
            vector(0.25),
            day,
            at("2026-08-21 09:00:00"),
        );
        let (a, b) = tokio::join!(a, b);

        let mut actions: Vec<PunchAction> =
            [a, b].into_iter().map(|r| r.unwrap().action).collect();
        actions.sort_by_key(|a| *a == PunchAction::PunchOut);
        assert_eq!(actions, vec![PunchAction::PunchIn, PunchAction::PunchOut]);

        let record = store.attendance_on(uid, day).await.unwrap().unwrap();
        assert!(record.punch_in_time.is_some());
        assert!(record.punch_out_time.is_some());
    }
}
