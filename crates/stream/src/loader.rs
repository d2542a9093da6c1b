use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tracing::{Instrument, debug, info, info_span, warn};
use worldhub_kernel::ProjectDefinition;

use crate::source::{DefinitionSource, LoadError};

/// Fan-out limits for a catalog load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum number of slugs probed/fetched at once.
    pub concurrency: usize,
    /// Upper bound on probe + fetch time for a single slug.
    pub timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: Duration::from_secs(5),
        }
    }
}

/// A catalog entry that could not be loaded.
#[derive(Debug)]
pub struct SkippedDefinition {
    pub slug: String,
    pub error: LoadError,
}

/// Outcome of loading a whole catalog.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully parsed definitions, in catalog order.
    pub definitions: Vec<ProjectDefinition>,
    /// Entries that were skipped, in catalog order.
    pub skipped: Vec<SkippedDefinition>,
}

/// Loads every definition named by a catalog of slugs.
pub struct DefinitionLoader {
    source: Arc<dyn DefinitionSource>,
    catalog: Vec<String>,
    config: LoaderConfig,
    fetches: AtomicUsize,
}

impl DefinitionLoader {
    pub fn new(source: Arc<dyn DefinitionSource>, catalog: Vec<String>, config: LoaderConfig) -> Self {
        Self {
            source,
            catalog,
            config,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Number of document fetches issued over this loader's lifetime.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Probe and fetch every slug with bounded, unordered concurrency.
    ///
    /// Failures are logged and reported, never returned as an error.
    pub async fn load_all(&self) -> LoadReport {
        let span = info_span!("load_definitions", catalog = self.catalog.len());
        async {
            let mut results: Vec<(usize, Result<ProjectDefinition, LoadError>)> =
                futures::stream::iter(self.catalog.clone().into_iter().enumerate())
                    .map(|(index, slug)| async move { (index, self.load_one(&slug).await) })
                    .buffer_unordered(self.config.concurrency.max(1))
                    .collect()
                    .await;
            results.sort_by_key(|(index, _)| *index);

            let mut report = LoadReport::default();
            for (index, result) in results {
                let slug = &self.catalog[index];
                match result {
                    Ok(definition) => {
                        debug!(%slug, id = %definition.id, "definition loaded");
                        report.definitions.push(definition);
                    }
                    Err(error) => {
                        warn!(%slug, %error, "skipping definition");
                        report.skipped.push(SkippedDefinition {
                            slug: slug.clone(),
                            error,
                        });
                    }
                }
            }
            info!(
                loaded = report.definitions.len(),
                skipped = report.skipped.len(),
                "definition catalog loaded"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn load_one(&self, slug: &str) -> Result<ProjectDefinition, LoadError> {
        validate_slug(slug)?;
        let bytes = tokio::time::timeout(self.config.timeout, async {
            if !self.source.exists(slug).await? {
                return Err(LoadError::NotFound(slug.to_string()));
            }
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.source.fetch(slug).await
        })
        .await
        .map_err(|_| LoadError::Timeout(slug.to_string()))??;

        ProjectDefinition::from_json(&bytes).map_err(|e| LoadError::Malformed {
            slug: slug.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Slugs are path segments: lowercase ASCII letters, digits, `-` and `_`.
fn validate_slug(slug: &str) -> Result<(), LoadError> {
    let valid = !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_'));
    if valid {
        Ok(())
    } else {
        Err(LoadError::InvalidSlug(slug.to_string()))
    }
}
