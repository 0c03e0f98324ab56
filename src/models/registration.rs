//! Self-service signups waiting for an administrator's decision.
//!
//! A signup lands in `user_registration_queue` as `pending`. An administrator either
//! approves it (a `users` row is created from the stored password hash) or rejects it.
//! Every decision is appended to `admin_approval_log`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::user::{Role, USERNAME_REGEX};

/// Estimated review time for each entry ahead in the queue, in hours.
pub const HOURS_PER_QUEUE_POSITION: i64 = 12;

/// Corresponds to the `registration_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Payload for `POST /api/auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Must be between 3 and 32 characters, alphanumeric, and can include underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
}

/// A row of `user_registration_queue`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationEntry {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub status: RegistrationStatus,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const REGISTRATION_COLUMNS: &str = "id, username, email, full_name, password_hash, status, \
     reviewed_by, reviewed_at, rejection_reason, created_at";

/// Where a signup stands, as reported to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_id: Uuid,
    pub status: RegistrationStatus,
    /// 1-based place in the pending queue. `None` once a decision was made.
    pub position: Option<i64>,
    pub estimated_wait_hours: Option<i64>,
    pub rejection_reason: Option<String>,
}

impl QueueStatus {
    /// Builds the status from the number of pending entries created before this one.
    pub fn new(entry: &RegistrationEntry, pending_ahead: i64) -> Self {
        let (position, estimated_wait_hours) = match entry.status {
            RegistrationStatus::Pending => {
                let position = pending_ahead.max(0) + 1;
                (Some(position), Some(position * HOURS_PER_QUEUE_POSITION))
            }
            _ => (None, None),
        };

        Self {
            queue_id: entry.id,
            status: entry.status,
            position,
            estimated_wait_hours,
            rejection_reason: entry.rejection_reason.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegistrationQuery {
    pub status: Option<RegistrationStatus>,
}

/// Payload for approving a signup. Defaults to the `user` role with no manager.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveInput {
    pub role: Option<Role>,
    pub manager_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectInput {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// A row of `admin_approval_log`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApprovalLogEntry {
    pub id: Uuid,
    pub queue_id: Uuid,
    pub admin_id: i32,
    pub admin_username: String,
    pub applicant_email: String,
    pub action: RegistrationStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
