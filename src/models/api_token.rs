//! API token model for authentication.
//!
//! Bearer tokens identify a marketplace user. They are stored in the database
//! as SHA-256 hashes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an API token record from the database.
///
/// # Database Table
///
/// Maps to the `api_tokens` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiToken {
    pub id: Uuid,

    /// User this token authenticates as
    pub user_id: Uuid,

    /// SHA-256 hash of the actual token (64 hex characters)
    pub token_hash: String,

    pub created_at: DateTime<Utc>,

    /// Inactive tokens are rejected during authentication
    pub is_active: bool,
}
