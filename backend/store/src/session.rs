//! Typed access to the wizard session and the provider credential.
//!
//! Both live in the same [`KeyValueStore`] under fixed keys with independent
//! lifecycles: clearing a session never touches the credential.

use std::sync::Arc;

use anyhow::{Context, Result};
use medlens_core::PersistedSession;
use tracing::{debug, warn};

use crate::store::KeyValueStore;

pub const SESSION_KEY: &str = "medlens.session";
pub const CREDENTIAL_KEY: &str = "medlens.credential";

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the in-progress session, if any.
    ///
    /// A record that no longer parses is logged and reported as absent so a bad
    /// write can never wedge the wizard.
    pub async fn load_session(&self) -> Result<Option<PersistedSession>> {
        let Some(raw) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted session");
                Ok(None)
            }
        }
    }

    pub async fn save_session(&self, session: &PersistedSession) -> Result<()> {
        let raw = serde_json::to_string(session).context("Failed to serialize session")?;
        self.store.put(SESSION_KEY, &raw).await?;
        debug!(session_id = %session.session_id, step_index = session.step_index, "Session persisted");
        Ok(())
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.store.delete(SESSION_KEY).await
    }

    /// The saved credential. Blank values count as not configured.
    pub async fn credential(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(CREDENTIAL_KEY)
            .await?
            .filter(|c| !c.trim().is_empty()))
    }

    pub async fn set_credential(&self, credential: &str) -> Result<()> {
        self.store.put(CREDENTIAL_KEY, credential.trim()).await
    }

    pub async fn clear_credential(&self) -> Result<()> {
        self.store.delete(CREDENTIAL_KEY).await
    }
}
