use std::sync::Arc;

use crate::{
    api::RemoteClient,
    configuration::Config,
    error::Error,
    session::SessionManager,
    storage::SharedStore,
};

/// Everything a hook needs, handed down explicitly instead of living in a
/// global.
pub struct ClientContext {
    pub config: Config,
    pub store: SharedStore,
    pub remote: RemoteClient,
    pub session: Arc<SessionManager>,
}

pub type SharedClientContext = Arc<ClientContext>;

impl ClientContext {
    /// Builds the remote client and hydrates the session from `store`.
    #[tracing::instrument(name = "init client context", skip_all, fields(base_url = %config.api.base_url))]
    pub fn init(config: Config, store: SharedStore) -> Result<SharedClientContext, Error> {
        let remote = RemoteClient::new(&config.api)?;
        let session = Arc::new(SessionManager::hydrate(remote.clone(), store.clone()));

        tracing::info!(
            authenticated = session.is_authenticated(),
            "Client context ready"
        );

        Ok(Arc::new(ClientContext {
            config,
            store,
            remote,
            session,
        }))
    }

    /// Drops the in-memory session. Persisted state stays so the next
    /// `init` can hydrate it; use [`SessionManager::logout`] to clear it.
    pub fn teardown(&self) {
        self.session.forget();
    }
}
