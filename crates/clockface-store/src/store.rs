use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use clockface_core::{AttendanceStatus, Candidate, Descriptor};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio_rusqlite::Connection;

use crate::error::StoreError;
use crate::models::{
    AttendanceListEntry, AttendanceRecord, Company, DescriptorRecord, MatchScope, Role, Shift,
    User,
};
use crate::schema::SCHEMA;

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Hash an API token for storage or lookup. Tokens are never stored in
/// plaintext.
pub fn hash_token(token: &str) -> String {
    hex(&Sha256::digest(token.as_bytes()))
}

fn mint_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex(&bytes)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn fmt_datetime(t: NaiveDateTime) -> String {
    t.format(DATETIME_FMT).to_string()
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_datetime(s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_status(s: &str) -> rusqlite::Result<AttendanceStatus> {
    AttendanceStatus::parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown attendance status: {s}").into(),
        )
    })
}

fn parse_role(s: &str) -> rusqlite::Result<Role> {
    Role::parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown role: {s}").into(),
        )
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        role: parse_role(&row.get::<_, String>(4)?)?,
        shift_id: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

fn row_to_attendance(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_date(&row.get::<_, String>(2)?)?,
        punch_in_time: row
            .get::<_, Option<String>>(3)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        punch_out_time: row
            .get::<_, Option<String>>(4)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        status: parse_status(&row.get::<_, String>(5)?)?,
    })
}

const USER_COLS: &str = "id, company_id, name, email, role, shift_id, created_at";
const ATTENDANCE_COLS: &str = "id, user_id, date, punch_in_time, punch_out_time, status";

/// Handle to the SQLite database, shared across request handlers.
///
/// All statements run on tokio-rusqlite's connection thread, so writes are
/// serialized; the uniqueness and conditional-update guarantees below are
/// what make concurrent punch requests safe.
#[derive(Clone)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(path.clone()).await?;
        tracing::info!(path = %path.display(), "database opened");
        Self::init(conn).await
    }

    /// In-memory database, used by tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Run an arbitrary statement. Test-only escape hatch for simulating
    /// out-of-band database edits.
    #[cfg(test)]
    pub(crate) async fn raw_execute(&self, sql: &str) -> Result<(), StoreError> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // ---- companies ----

    pub async fn create_company(
        &self,
        name: String,
        email: String,
        now: NaiveDateTime,
    ) -> Result<Company, StoreError> {
        let created = fmt_datetime(now);
        let company = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO companies (name, email, created_at) VALUES (?1, ?2, ?3)",
                    (&name, &email, &created),
                )?;
                Ok(Company {
                    id: conn.last_insert_rowid(),
                    name,
                    email,
                    created_at: parse_datetime(&created)?,
                })
            })
            .await?;
        Ok(company)
    }

    pub async fn company_by_id(&self, id: i64) -> Result<Option<Company>, StoreError> {
        let company = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT id, name, email, created_at FROM companies WHERE id = ?1")?;
                let mut rows = stmt.query_map([id], |row| {
                    Ok(Company {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        created_at: parse_datetime(&row.get::<_, String>(3)?)?,
                    })
                })?;
                rows.next().transpose().map_err(Into::into)
            })
            .await?;
        Ok(company)
    }

    // ---- users / tokens ----

    /// Create a user and mint its API token. The plaintext token is
    /// returned exactly once; only its hash is stored.
    pub async fn create_user(
        &self,
        company_id: i64,
        name: String,
        email: String,
        role: Role,
        shift_id: Option<i64>,
        now: NaiveDateTime,
    ) -> Result<(User, String), StoreError> {
        let created = fmt_datetime(now);
        let token = mint_token();
        let token_hash = hash_token(&token);
        let user = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO users (company_id, name, email, role, shift_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    (company_id, &name, &email, role.as_str(), shift_id, &created),
                )?;
                let id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO api_tokens (user_id, token_hash, created_at) VALUES (?1, ?2, ?3)",
                    (id, &token_hash, &created),
                )?;
                tx.commit()?;
                Ok(User {
                    id,
                    company_id,
                    name,
                    email,
                    role,
                    shift_id,
                    created_at: parse_datetime(&created)?,
                })
            })
            .await?;
        Ok((user, token))
    }

    pub async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {USER_COLS} FROM users WHERE id = ?1"))?;
                let mut rows = stmt.query_map([id], row_to_user)?;
                rows.next().transpose().map_err(Into::into)
            })
            .await?;
        Ok(user)
    }

    /// Users visible to the caller: one company's, or all of them
    /// (superadmin view).
    pub async fn list_users(&self, company_id: Option<i64>) -> Result<Vec<User>, StoreError> {
        let users = self
            .conn
            .call(move |conn| {
                let users = match company_id {
                    Some(cid) => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {USER_COLS} FROM users WHERE company_id = ?1 ORDER BY id"
                        ))?;
                        let rows = stmt.query_map([cid], row_to_user)?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()?
                    }
                    None => {
                        let mut stmt =
                            conn.prepare(&format!("SELECT {USER_COLS} FROM users ORDER BY id"))?;
                        let rows = stmt.query_map([], row_to_user)?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()?
                    }
                };
                Ok(users)
            })
            .await?;
        Ok(users)
    }

    /// Resolve a bearer token (by hash) to its user.
    pub async fn user_by_token_hash(&self, token_hash: String) -> Result<Option<User>, StoreError> {
        let user = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT u.id, u.company_id, u.name, u.email, u.role, u.shift_id, u.created_at
                     FROM users u JOIN api_tokens t ON t.user_id = u.id
                     WHERE t.token_hash = ?1",
                )?;
                let mut rows = stmt.query_map([token_hash], row_to_user)?;
                rows.next().transpose().map_err(Into::into)
            })
            .await?;
        Ok(user)
    }

    // ---- shifts ----

    pub async fn create_shift(
        &self,
        company_id: i64,
        name: String,
        start_time: String,
        end_time: String,
    ) -> Result<Shift, StoreError> {
        let shift = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO shifts (company_id, name, start_time, end_time)
                     VALUES (?1, ?2, ?3, ?4)",
                    (company_id, &name, &start_time, &end_time),
                )?;
                Ok(Shift {
                    id: conn.last_insert_rowid(),
                    company_id,
                    name,
                    start_time,
                    end_time,
                })
            })
            .await?;
        Ok(shift)
    }

    pub async fn list_shifts(&self, company_id: i64) -> Result<Vec<Shift>, StoreError> {
        let shifts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, company_id, name, start_time, end_time
                     FROM shifts WHERE company_id = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map([company_id], |row| {
                    Ok(Shift {
                        id: row.get(0)?,
                        company_id: row.get(1)?,
                        name: row.get(2)?,
                        start_time: row.get(3)?,
                        end_time: row.get(4)?,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(shifts)
    }

    // ---- face descriptors ----

    /// Insert or wholesale-replace the user's descriptor. Returns the
    /// stored metadata and whether a new row was created.
    pub async fn upsert_descriptor(
        &self,
        user_id: i64,
        company_id: i64,
        descriptor: &Descriptor,
        now: NaiveDateTime,
    ) -> Result<(DescriptorRecord, bool), StoreError> {
        let json = serde_json::to_string(descriptor.as_slice())
            .expect("a validated descriptor always serializes");
        let stamp = fmt_datetime(now);
        let record = self
            .conn
            .call(move |conn| {
                let existing: Option<(i64, String)> = conn
                    .query_row(
                        "SELECT id, created_at FROM face_descriptors WHERE user_id = ?1",
                        [user_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .map(Some)
                    .or_else(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;

                match existing {
                    Some((id, created_at)) => {
                        conn.execute(
                            "UPDATE face_descriptors
                             SET descriptor = ?1, updated_at = ?2 WHERE id = ?3",
                            (&json, &stamp, id),
                        )?;
                        Ok((
                            DescriptorRecord {
                                id,
                                user_id,
                                company_id,
                                created_at: parse_datetime(&created_at)?,
                                updated_at: parse_datetime(&stamp)?,
                            },
                            false,
                        ))
                    }
                    None => {
                        conn.execute(
                            "INSERT INTO face_descriptors
                             (user_id, company_id, descriptor, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?4)",
                            (user_id, company_id, &json, &stamp),
                        )?;
                        Ok((
                            DescriptorRecord {
                                id: conn.last_insert_rowid(),
                                user_id,
                                company_id,
                                created_at: parse_datetime(&stamp)?,
                                updated_at: parse_datetime(&stamp)?,
                            },
                            true,
                        ))
                    }
                }
            })
            .await?;
        Ok(record)
    }

    pub async fn descriptor_record(
        &self,
        user_id: i64,
    ) -> Result<Option<DescriptorRecord>, StoreError> {
        let record = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, company_id, created_at, updated_at
                     FROM face_descriptors WHERE user_id = ?1",
                )?;
                let mut rows = stmt.query_map([user_id], |row| {
                    Ok(DescriptorRecord {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        company_id: row.get(2)?,
                        created_at: parse_datetime(&row.get::<_, String>(3)?)?,
                        updated_at: parse_datetime(&row.get::<_, String>(4)?)?,
                    })
                })?;
                rows.next().transpose().map_err(Into::into)
            })
            .await?;
        Ok(record)
    }

    pub async fn delete_descriptor(&self, user_id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM face_descriptors WHERE user_id = ?1", [user_id])?;
                Ok(n > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// Matching candidate set for the given scope, ordered by ascending
    /// user id so matcher ties resolve deterministically.
    pub async fn candidates(&self, scope: MatchScope) -> Result<Vec<Candidate>, StoreError> {
        let raw: Vec<(i64, String)> = self
            .conn
            .call(move |conn| {
                let rows = match scope {
                    MatchScope::Company(cid) => {
                        let mut stmt = conn.prepare(
                            "SELECT user_id, descriptor FROM face_descriptors
                             WHERE company_id = ?1 ORDER BY user_id",
                        )?;
                        let rows = stmt.query_map([cid], |r| Ok((r.get(0)?, r.get(1)?)))?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()?
                    }
                    MatchScope::AllTenants => {
                        let mut stmt = conn.prepare(
                            "SELECT user_id, descriptor FROM face_descriptors ORDER BY user_id",
                        )?;
                        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
                        rows.collect::<rusqlite::Result<Vec<_>>>()?
                    }
                };
                Ok(rows)
            })
            .await?;

        raw.into_iter()
            .map(|(user_id, json)| {
                let values: Vec<f64> =
                    serde_json::from_str(&json).map_err(|e| StoreError::CorruptDescriptor {
                        user_id,
                        detail: e.to_string(),
                    })?;
                let descriptor =
                    Descriptor::new(values).map_err(|e| StoreError::CorruptDescriptor {
                        user_id,
                        detail: e.to_string(),
                    })?;
                Ok(Candidate {
                    user_id,
                    descriptor,
                })
            })
            .collect()
    }

    // ---- attendance ----

    pub async fn attendance_on(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let date = fmt_date(date);
        let record = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ATTENDANCE_COLS} FROM attendance WHERE user_id = ?1 AND date = ?2"
                ))?;
                let mut rows = stmt.query_map((user_id, &date), row_to_attendance)?;
                rows.next().transpose().map_err(Into::into)
            })
            .await?;
        Ok(record)
    }

    /// Create the day's record with punch-in set and status `present`.
    ///
    /// A concurrent create for the same (user, date) loses the race at the
    /// unique index and surfaces as [`StoreError::PunchInConflict`].
    pub async fn create_punch_in(
        &self,
        user_id: i64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, StoreError> {
        let date_s = fmt_date(date);
        let now_s = fmt_datetime(now);
        let record = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO attendance (user_id, date, punch_in_time, status)
                     VALUES (?1, ?2, ?3, 'present')",
                    (user_id, &date_s, &now_s),
                )
                .map_err(|e| StoreError::from_punch_in_insert(e, user_id, &date_s))?;
                Ok(AttendanceRecord {
                    id: conn.last_insert_rowid(),
                    user_id,
                    date: parse_date(&date_s)?,
                    punch_in_time: Some(parse_datetime(&now_s)?),
                    punch_out_time: None,
                    status: AttendanceStatus::Present,
                })
            })
            .await
            .map_err(StoreError::from_call)?;
        Ok(record)
    }

    /// Conditionally set punch-out on the day's record. Returns `false`
    /// when no row with punch-out unset exists, i.e. the record is already
    /// terminal (or absent).
    pub async fn complete_punch_out(
        &self,
        user_id: i64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let date_s = fmt_date(date);
        let now_s = fmt_datetime(now);
        let updated = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE attendance SET punch_out_time = ?1, status = 'present'
                     WHERE user_id = ?2 AND date = ?3 AND punch_out_time IS NULL",
                    (&now_s, user_id, &date_s),
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(updated)
    }

    /// One user's records in a date range (inclusive), oldest first.
    pub async fn attendance_for_user(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let from = fmt_date(from);
        let to = fmt_date(to);
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ATTENDANCE_COLS} FROM attendance
                     WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date"
                ))?;
                let rows = stmt.query_map((user_id, &from, &to), row_to_attendance)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(records)
    }

    /// A company's records in a date range joined with user names.
    pub async fn attendance_for_company(
        &self,
        company_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(AttendanceRecord, String)>, StoreError> {
        let from = fmt_date(from);
        let to = fmt_date(to);
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT a.id, a.user_id, a.date, a.punch_in_time, a.punch_out_time, a.status,
                            u.name
                     FROM attendance a JOIN users u ON u.id = a.user_id
                     WHERE u.company_id = ?1 AND a.date BETWEEN ?2 AND ?3
                     ORDER BY a.date, a.id",
                )?;
                let rows = stmt.query_map((company_id, &from, &to), |row| {
                    Ok((row_to_attendance(row)?, row.get::<_, String>(6)?))
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(records)
    }

    // ---- dashboard ----

    pub async fn count_users(&self, company_id: i64) -> Result<i64, StoreError> {
        let n = self
            .conn
            .call(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE company_id = ?1",
                    [company_id],
                    |row| row.get(0),
                )?)
            })
            .await?;
        Ok(n)
    }

    /// Number of the company's users marked present on a date.
    pub async fn count_present_on(
        &self,
        company_id: i64,
        date: NaiveDate,
    ) -> Result<i64, StoreError> {
        let date = fmt_date(date);
        let n = self
            .conn
            .call(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM attendance a JOIN users u ON u.id = a.user_id
                     WHERE u.company_id = ?1 AND a.date = ?2 AND a.status = 'present'",
                    (company_id, &date),
                    |row| row.get(0),
                )?)
            })
            .await?;
        Ok(n)
    }

    /// The company's attendance rows for one date, joined with user and
    /// shift display names.
    pub async fn attendance_list_on(
        &self,
        company_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceListEntry>, StoreError> {
        let date = fmt_date(date);
        let entries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT a.id, u.name, s.name, a.punch_in_time, a.punch_out_time, a.status
                     FROM attendance a
                     JOIN users u ON u.id = a.user_id
                     LEFT JOIN shifts s ON s.id = u.shift_id
                     WHERE u.company_id = ?1 AND a.date = ?2
                     ORDER BY a.id",
                )?;
                let rows = stmt.query_map((company_id, &date), |row| {
                    Ok(AttendanceListEntry {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        shift: row.get(2)?,
                        punch_in_time: row
                            .get::<_, Option<String>>(3)?
                            .map(|s| parse_datetime(&s))
                            .transpose()?,
                        punch_out_time: row
                            .get::<_, Option<String>>(4)?
                            .map(|s| parse_datetime(&s))
                            .transpose()?,
                        status: parse_status(&row.get::<_, String>(5)?)?,
                    })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(entries)
    }
}
