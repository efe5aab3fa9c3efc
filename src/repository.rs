use crate::config::DatabaseConfig;
use crate::db::{self, Credential, CredentialId, DbActorHandle};
use crate::error::StorageError;
use crate::observable::Observable;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of the latest [`LoginRepository::fetch`].
#[derive(Debug, Clone)]
pub enum FetchState {
    /// Lookup dispatched, no answer yet.
    Pending,
    Found(Credential),
    NotFound,
    Failed(Arc<StorageError>),
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchState::Pending)
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            FetchState::Found(c) => Some(c),
            _ => None,
        }
    }
}

/// A save running in the background. Awaiting it is optional; dropping it
/// does not cancel the write.
pub struct PendingSave {
    task: JoinHandle<Result<CredentialId, StorageError>>,
}

impl PendingSave {
    /// Wait for the write to land and return the id it was given.
    pub async fn wait(self) -> Result<CredentialId, StorageError> {
        self.task.await?
    }
}

struct RepositoryInner {
    config: DatabaseConfig,
    /// Background context: storage work is spawned here whatever thread calls in.
    runtime: Handle,
    store: OnceCell<DbActorHandle>,
    result: Observable<FetchState>,
    generation: AtomicU64,
}

/// Entry point for saving and looking up credentials.
///
/// Build one per process and hand out clones; clones share the store handle
/// and the fetch result holder. The store itself is opened on first use.
/// `save` and `fetch` may be called from any thread, inside a runtime or not.
#[derive(Clone)]
pub struct LoginRepository {
    inner: Arc<RepositoryInner>,
}

impl LoginRepository {
    /// Bind to the Tokio runtime this is called from.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime; use [`LoginRepository::with_runtime`] there.
    pub fn new(config: DatabaseConfig) -> Self {
        Self::with_runtime(config, Handle::current())
    }

    pub fn with_runtime(config: DatabaseConfig, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                config,
                runtime,
                store: OnceCell::new(),
                result: Observable::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Open the store on the first call; later (and concurrent) calls get the
    /// same handle. A failed open leaves nothing behind, so the next call
    /// tries again.
    pub async fn initialize(&self) -> Result<&DbActorHandle, StorageError> {
        self.inner
            .store
            .get_or_try_init(|| async {
                info!(path = %self.inner.config.path().display(), "initializing credential store");
                db::spawn(&self.inner.config).await
            })
            .await
    }

    /// Submit a credential for storage. Returns immediately; the insert runs
    /// on a background task.
    pub fn save(&self, username: impl Into<String>, password: impl Into<String>) -> PendingSave {
        let username = username.into();
        let password = password.into();
        let repo = self.clone();

        let task = self.inner.runtime.spawn(async move {
            let res: Result<CredentialId, StorageError> = async {
                let store = repo.initialize().await?;
                store.insert(username.clone(), password).await
            }
            .await;
            match &res {
                Ok(id) => debug!(id, username = %username, "save completed"),
                Err(e) => warn!(username = %username, "save failed: {}", e),
            }
            res
        });

        PendingSave { task }
    }

    /// Look `username` up in the background and publish the outcome to the
    /// returned holder. Every call returns the same holder; a result from a
    /// fetch that has since been superseded is dropped.
    pub fn fetch(&self, username: impl Into<String>) -> Observable<FetchState> {
        let username = username.into();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.inner.result.clone();

        result.publish_if(FetchState::Pending, || self.is_current(generation));

        let repo = self.clone();
        self.inner.runtime.spawn(async move {
            let state = match repo.lookup(&username).await {
                Ok(Some(cred)) => FetchState::Found(cred),
                Ok(None) => FetchState::NotFound,
                Err(e) => {
                    warn!(username = %username, "fetch failed: {}", e);
                    FetchState::Failed(Arc::new(e))
                }
            };
            let published = repo
                .inner
                .result
                .publish_if(state, || repo.is_current(generation));
            if !published {
                debug!(username = %username, generation, "fetch superseded; result dropped");
            }
        });

        result
    }

    /// The holder `fetch` publishes to.
    pub fn result(&self) -> Observable<FetchState> {
        self.inner.result.clone()
    }

    /// Every credential saved under `username`, oldest first.
    pub async fn history(&self, username: &str) -> Result<Vec<Credential>, StorageError> {
        self.initialize().await?.list_by_username(username).await
    }

    /// Stop the store if it was ever opened.
    pub fn shutdown(&self) {
        if let Some(store) = self.inner.store.get() {
            store.shutdown();
        }
    }

    async fn lookup(&self, username: &str) -> Result<Option<Credential>, StorageError> {
        self.initialize().await?.find_by_username(username).await
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }
}
