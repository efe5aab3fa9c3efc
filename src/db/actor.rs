use crate::config::DatabaseConfig;
use crate::db::models::{Credential, CredentialId};
use crate::db::sqlite::LoginStorage;
use crate::error::StorageError;

use ractor::{Actor, ActorId, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{debug, info, warn};

/// Storage requests handled by the database actor.
#[derive(Debug)]
pub enum DbActorMessage {
    /// Append a credential; replies with the assigned id.
    Insert(String, String, RpcReplyPort<Result<CredentialId, StorageError>>),
    /// Newest credential saved under the username, if any.
    FindByUsername(String, RpcReplyPort<Result<Option<Credential>, StorageError>>),
    /// All credentials saved under the username, oldest first.
    ListByUsername(String, RpcReplyPort<Result<Vec<Credential>, StorageError>>),
}

/// Handle for interacting with the database actor.
#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn insert(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<CredentialId, StorageError> {
        ractor::call!(
            self.actor,
            DbActorMessage::Insert,
            username.into(),
            password.into()
        )
        .map_err(|e| StorageError::Actor(format!("Insert RPC failed: {e}")))?
    }

    pub async fn find_by_username(
        &self,
        username: impl Into<String>,
    ) -> Result<Option<Credential>, StorageError> {
        ractor::call!(self.actor, DbActorMessage::FindByUsername, username.into())
            .map_err(|e| StorageError::Actor(format!("FindByUsername RPC failed: {e}")))?
    }

    pub async fn list_by_username(
        &self,
        username: impl Into<String>,
    ) -> Result<Vec<Credential>, StorageError> {
        ractor::call!(self.actor, DbActorMessage::ListByUsername, username.into())
            .map_err(|e| StorageError::Actor(format!("ListByUsername RPC failed: {e}")))?
    }

    /// Identity of the underlying actor; equal ids mean the same store.
    pub fn actor_id(&self) -> ActorId {
        self.actor.get_id()
    }

    /// Stop the actor; its connection pool is closed on the way out.
    pub fn shutdown(&self) {
        self.actor.stop(Some("shutdown requested".to_string()));
    }
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = LoginStorage;
    type Arguments = LoginStorage;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        storage: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!("DbActor started");
        Ok(storage)
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.close().await;
        debug!("DbActor stopped; pool closed");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::Insert(username, password, rp) => {
                let res = state.insert(&username, &password).await;
                if let Err(e) = &res {
                    warn!(username = %username, "insert failed: {}", e);
                }
                let _ = rp.send(res);
            }
            DbActorMessage::FindByUsername(username, rp) => {
                let res = state.find_by_username(&username).await;
                if let Err(e) = &res {
                    warn!(username = %username, "lookup failed: {}", e);
                }
                let _ = rp.send(res);
            }
            DbActorMessage::ListByUsername(username, rp) => {
                let _ = rp.send(state.list_by_username(&username).await);
            }
        }
        Ok(())
    }
}

/// Open the store described by `cfg` and hand it to a new database actor.
///
/// Open failures come back as their own `Io`/`Database` errors and no actor
/// is spawned.
pub async fn spawn(cfg: &DatabaseConfig) -> Result<DbActorHandle, StorageError> {
    let storage = LoginStorage::connect(cfg).await?;
    let (actor, _jh) = Actor::spawn(None, DbActor, storage)
        .await
        .map_err(|e| StorageError::Actor(format!("failed to spawn DbActor: {e}")))?;
    Ok(DbActorHandle { actor })
}
