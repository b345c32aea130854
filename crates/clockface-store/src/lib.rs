//! clockface-store — SQLite persistence for tenants, users, descriptors
//! and attendance records.
//!
//! The store is the component that makes the punch state machine safe
//! under concurrency: record creation is guarded by a `UNIQUE(user_id,
//! date)` index and punch-out is a conditional update that only succeeds
//! while punch-out is unset.

pub mod error;
pub mod models;
mod schema;
mod store;

pub use error::StoreError;
pub use models::{
    AttendanceListEntry, AttendanceRecord, Company, DescriptorRecord, MatchScope, Role, Shift,
    User,
};
pub use store::{hash_token, Store};
