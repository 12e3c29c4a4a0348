//! Flat credential slots read by request layers that cannot see the session store.
//!
//! `token`, `userId` and `roleId` duplicate what the session already holds. Only the session
//! service writes them, always together with the store, so the two never disagree while logged in.

use tracing::warn;

use crate::http::TokenSource;
use crate::storage::{SharedKv, StorageResult};

pub const TOKEN_KEY: &str = "token";
pub const USER_ID_KEY: &str = "userId";
pub const ROLE_ID_KEY: &str = "roleId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCredentials {
    pub token: String,
    pub user_id: String,
    /// Raw role ids of the last login, comma separated
    pub role_id: Option<String>,
}

#[derive(Clone)]
pub struct CredentialChannel {
    kv: SharedKv,
}

impl CredentialChannel {
    pub fn new(kv: SharedKv) -> Self { Self { kv } }

    fn slot(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(v) => v.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                warn!(target: "adopta::credentials", key, error = %e, "credential slot unreadable");
                None
            }
        }
    }

    /// The token/userId pair, only when both are present.
    pub fn read(&self) -> Option<LegacyCredentials> {
        let token = self.slot(TOKEN_KEY)?;
        let user_id = self.slot(USER_ID_KEY)?;
        Some(LegacyCredentials { token, user_id, role_id: self.slot(ROLE_ID_KEY) })
    }

    pub fn token(&self) -> Option<String> { self.slot(TOKEN_KEY) }

    pub fn write<S: AsRef<str>>(&self, token: &str, user_id: &str, raw_role_ids: &[S]) -> StorageResult<()> {
        let roles = raw_role_ids.iter().map(|r| r.as_ref().trim()).collect::<Vec<_>>().join(",");
        self.kv.set(TOKEN_KEY, token)?;
        self.kv.set(USER_ID_KEY, user_id)?;
        if roles.is_empty() { self.kv.remove(ROLE_ID_KEY) } else { self.kv.set(ROLE_ID_KEY, &roles) }
    }

    /// Remove all three slots. Attempts every slot even if one fails.
    pub fn purge(&self) -> StorageResult<()> {
        let mut first_err = None;
        for key in [TOKEN_KEY, USER_ID_KEY, ROLE_ID_KEY] {
            if let Err(e) = self.kv.remove(key) {
                first_err.get_or_insert(e);
            }
        }
        match first_err { Some(e) => Err(e), None => Ok(()) }
    }
}

impl TokenSource for CredentialChannel {
    fn bearer_token(&self) -> Option<String> { self.token() }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{KvBackend, MemoryKv};

    #[test]
    fn pair_required_for_read() {
        let kv = Arc::new(MemoryKv::new());
        let ch = CredentialChannel::new(kv.clone());
        assert!(ch.read().is_none());
        kv.set(TOKEN_KEY, "T").unwrap();
        assert!(ch.read().is_none());
        assert_eq!(ch.bearer_token().as_deref(), Some("T"));
        kv.set(USER_ID_KEY, "  ").unwrap();
        assert!(ch.read().is_none());
        kv.set(USER_ID_KEY, "7").unwrap();
        let creds = ch.read().unwrap();
        assert_eq!(creds.token, "T");
        assert_eq!(creds.user_id, "7");
        assert!(creds.role_id.is_none());
    }

    #[test]
    fn write_then_purge() {
        let kv = Arc::new(MemoryKv::new());
        let ch = CredentialChannel::new(kv.clone());
        ch.write("T", "7", &["2", "3"]).unwrap();
        assert_eq!(kv.get(ROLE_ID_KEY).unwrap().as_deref(), Some("2,3"));
        assert_eq!(ch.read().unwrap().role_id.as_deref(), Some("2,3"));
        ch.purge().unwrap();
        assert!(kv.is_empty());
        ch.purge().unwrap();
    }
}
