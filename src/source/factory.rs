//! Source construction.
//!
//! Production code asks for the shared instance; tests build sources
//! directly or call [`reset_shared_source`] between cases.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use super::{ContentSource, FilesystemSource, RemoteSource};
use crate::config::{ContentConfig, ContentSourceConfig};
use crate::error::Result;

/// Process-wide source, built on first use
static SHARED_SOURCE: Mutex<Option<Arc<dyn ContentSource>>> = Mutex::new(None);

/// Build a source from its configuration
pub fn create_source(config: &ContentSourceConfig) -> Result<Arc<dyn ContentSource>> {
    let source: Arc<dyn ContentSource> = match config {
        ContentSourceConfig::Filesystem { base_path } => {
            info!("Using filesystem content source at {}", base_path.display());
            Arc::new(FilesystemSource::new(base_path))
        }
        ContentSourceConfig::Github {
            access_token,
            base_url,
            timeout,
            batch_size,
            batch_delay,
        } => {
            info!("Using github content source at {}", base_url);
            Arc::new(
                RemoteSource::new(base_url, access_token)?
                    .with_timeout(*timeout)
                    .with_batching(*batch_size, *batch_delay),
            )
        }
    };
    Ok(source)
}

/// Get the shared source, building it from `config` on first use.
///
/// Later calls return the same instance regardless of `config` until
/// [`reset_shared_source`] is called.
pub fn shared_source(config: &ContentConfig) -> Result<Arc<dyn ContentSource>> {
    let mut shared = SHARED_SOURCE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(source) = shared.as_ref() {
        return Ok(Arc::clone(source));
    }

    let source = create_source(&config.source)?;
    *shared = Some(Arc::clone(&source));
    Ok(source)
}

/// Drop the shared source so the next call rebuilds it
pub fn reset_shared_source() {
    SHARED_SOURCE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
}
