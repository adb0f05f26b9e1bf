//! Wiring from configuration to the runtime collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use medlens_config::MedLensConfig;
use medlens_lookup::OpenFdaClient;
use medlens_media::{ImageNormalizer, NormalizeOptions};
use medlens_store::{SessionStore, SqliteStore};
use medlens_wizard::{Finalizer, GuidancePipeline, LabelLookupPipeline, ResumePolicy, ScanWizard, VisionExtractorFactory};
use tracing::debug;

/// Environment fallback for the provider credential.
pub const API_KEY_ENV: &str = "MEDLENS_API_KEY";

pub struct AppContext {
    pub config: MedLensConfig,
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub sessions: SessionStore,
}

/// Resolve a possibly relative path against the config directory.
pub fn resolve_in(dir: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() { path } else { dir.join(path) }
}

impl AppContext {
    pub fn new(config: MedLensConfig, config_dir: PathBuf, config_path: PathBuf) -> Result<Self> {
        let db_path = resolve_in(&config_dir, &config.store_path());
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open local store at {}", db_path.display()))?;
        debug!(db = %db_path.display(), "Opened local store");
        Ok(Self { config, config_dir, config_path, sessions: SessionStore::new(Arc::new(store)) })
    }

    /// Credential used when none is saved in the store: config file, then environment.
    pub fn credential_fallback(&self) -> Option<String> {
        self.config
            .provider_api_key()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn lookup_client(&self) -> Result<OpenFdaClient> {
        Ok(OpenFdaClient::new(
            self.config.lookup_base_url(),
            Duration::from_secs(self.config.lookup_timeout_secs()),
        )?
        .with_api_key(self.config.lookup_api_key()))
    }

    fn finalizer(&self, variant: &str) -> Result<Arc<dyn Finalizer>> {
        let extractors = Arc::new(VisionExtractorFactory {
            kind: self.config.provider_kind(),
            model: self.config.provider_model(),
            base_url: self.config.provider_base_url(),
            timeout: Duration::from_secs(self.config.provider_timeout_secs()),
        });
        let language = self.config.language();
        let threshold = self.config.confidence_threshold();
        let finalizer: Arc<dyn Finalizer> = match variant {
            "guidance" => Arc::new(GuidancePipeline::new(extractors, language, threshold)),
            "label" => Arc::new(LabelLookupPipeline::new(
                extractors,
                Arc::new(self.lookup_client()?),
                language,
                threshold,
            )),
            other => anyhow::bail!("unknown scan variant '{other}'"),
        };
        Ok(finalizer)
    }

    /// Cold-start the wizard for `variant` (defaults to the configured one).
    pub async fn open_wizard(&self, variant: Option<&str>) -> Result<ScanWizard> {
        let variant = variant.map(str::to_string).unwrap_or_else(|| self.config.variant());
        let policy: ResumePolicy = self.config.resume_policy().parse()?;
        let acquirer = Arc::new(ImageNormalizer::new(NormalizeOptions {
            max_edge: self.config.max_edge(),
            quality: self.config.jpeg_quality(),
        }));
        let wizard = ScanWizard::open(
            self.config.steps(),
            policy,
            self.sessions.clone(),
            acquirer,
            self.finalizer(&variant)?,
        )
        .await?;
        Ok(wizard.with_credential_fallback(self.credential_fallback()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_store_path_lives_in_config_dir() {
        let dir = Path::new("/home/u/.medlens");
        assert_eq!(resolve_in(dir, "medlens.db"), dir.join("medlens.db"));
        assert_eq!(resolve_in(dir, "/tmp/x.db"), PathBuf::from("/tmp/x.db"));
    }

    #[tokio::test]
    async fn opens_wizard_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::new(MedLensConfig::default(), dir.path().to_path_buf(), dir.path().join("config.yaml"))
            .unwrap();
        let wizard = ctx.open_wizard(None).await.unwrap();
        assert_eq!(wizard.total_steps(), 2);
        assert_eq!(wizard.variant(), "label");
        assert!(ctx.open_wizard(Some("poster")).await.is_err());
    }
}
