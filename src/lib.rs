pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod notifications;
pub mod storage;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::AppResult;
use crate::http::ApiClient;
use crate::identity::{CredentialChannel, HttpAuthApi, SessionService, SessionStore};
use crate::notifications::HttpNotificationSource;
use crate::storage::{FileKv, SharedKv};

/// Everything a client shell needs, wired from one configuration.
pub struct Client {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub auth: HttpAuthApi,
    pub session: SessionService,
}

impl Client {
    /// Open file storage under `config.storage_dir` and wire the session service to the backend.
    pub fn open(config: ClientConfig) -> AppResult<Self> {
        let kv: SharedKv = Arc::new(FileKv::open(&config.storage_dir)?);
        Self::with_storage(config, kv)
    }

    pub fn with_storage(config: ClientConfig, kv: SharedKv) -> AppResult<Self> {
        let store = Arc::new(SessionStore::open(kv.clone(), config.store_options()));
        // requests read the token from the store, not from the raw credential slots
        let api = ApiClient::new(&config.api_base_url, store.clone())?;
        let auth = HttpAuthApi::new(api.clone());
        let mut session = SessionService::new(store, CredentialChannel::new(kv), Arc::new(auth.clone()))
            .with_routes(config.routes.clone());
        if let Some(interval) = config.notification_interval() {
            session = session.with_notifications(Arc::new(HttpNotificationSource::new(api.clone())), interval);
        }
        Ok(Self { config, api, auth, session })
    }
}
