use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),

    /// The `UNIQUE(user_id, date)` index rejected a punch-in insert:
    /// another request created the day's record first.
    #[error("attendance record already exists for user {user_id} on {date}")]
    PunchInConflict { user_id: i64, date: String },

    /// A stored descriptor failed re-validation on read. Enrollment
    /// validates every write, so this means the database was edited out
    /// of band. Internal invariant violation, not a user-facing condition.
    #[error("stored descriptor for user {user_id} is malformed: {detail}")]
    CorruptDescriptor { user_id: i64, detail: String },

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl StoreError {
    /// True when the underlying SQLite error is a constraint violation,
    /// e.g. an insert with an email that is already taken. Lets callers
    /// report a duplicate as a user error instead of a storage fault.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }

    /// Map a rusqlite error from an INSERT into the punch-in conflict
    /// variant when it is a uniqueness violation.
    pub(crate) fn from_punch_in_insert(
        err: rusqlite::Error,
        user_id: i64,
        date: &str,
    ) -> tokio_rusqlite::Error {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                // Re-wrapped by the caller; carry enough to recognize it.
                return tokio_rusqlite::Error::Other(Box::new(Self::PunchInConflict {
                    user_id,
                    date: date.to_string(),
                }));
            }
        }
        tokio_rusqlite::Error::Rusqlite(err)
    }

    /// Unwrap a conflict smuggled through the connection closure.
    pub(crate) fn from_call(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<StoreError>() {
                Ok(store_err) => *store_err,
                Err(other) => Self::Sqlite(tokio_rusqlite::Error::Other(other)),
            },
            other => Self::Sqlite(other),
        }
    }
}
