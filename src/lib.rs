pub mod config;
pub mod db;
pub mod error;
pub mod observable;
pub mod repository;

pub use config::{Config, DatabaseConfig};
pub use db::{Credential, CredentialId};
pub use error::StorageError;
pub use observable::{Observable, Subscription};
pub use repository::{FetchState, LoginRepository, PendingSave};
