use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type CredentialId = i64;

/// One row of the `Login` table.
///
/// `id` is assigned by SQLite on insert; the insert path only accepts
/// `username` and `password`, so a caller can never choose it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Credential {
    pub id: CredentialId,
    pub username: String,
    pub password: String,
}
