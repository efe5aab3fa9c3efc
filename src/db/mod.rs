//! Database module: the credential table and the actor that owns it.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL and version stamp for the `Login` table
//! - `sqlite.rs`: the record store (insert / lookup by username)
//! - `actor.rs`: background actor serving storage requests

pub mod actor;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use actor::{DbActorHandle, spawn};
pub use models::{Credential, CredentialId};
pub use schema::SQLITE_INIT;
pub use sqlite::{LoginStorage, SqlitePool};
