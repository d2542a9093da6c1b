use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

/// File name of a definition document inside its slug directory.
pub const DEFINITION_FILE: &str = "project.json";

/// Errors from probing or fetching a single definition document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("definition not found: {0}")]
    NotFound(String),
    #[error("invalid catalog slug {0:?}")]
    InvalidSlug(String),
    #[error("malformed definition {slug}: {reason}")]
    Malformed { slug: String, reason: String },
    #[error("timed out loading {0}")]
    Timeout(String),
    #[error("unexpected HTTP status {status} for {slug}")]
    Status { slug: String, status: u16 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Where definition documents come from, addressed by catalog slug.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Cheap existence probe for `slug`.
    async fn exists(&self, slug: &str) -> Result<bool, LoadError>;

    /// Fetch the raw document for `slug`.
    async fn fetch(&self, slug: &str) -> Result<Vec<u8>, LoadError>;
}

/// Definitions laid out on disk as `<root>/<slug>/project.json`.
#[derive(Debug, Clone)]
pub struct DirDefinitionSource {
    root: PathBuf,
}

impl DirDefinitionSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, slug: &str) -> PathBuf {
        self.root.join(slug).join(DEFINITION_FILE)
    }

    /// List the slugs of every subdirectory holding a definition, sorted.
    pub async fn discover_catalog(&self) -> Result<Vec<String>, LoadError> {
        let mut slugs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(slug) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if tokio::fs::try_exists(entry.path().join(DEFINITION_FILE)).await? {
                slugs.push(slug);
            }
        }
        slugs.sort();
        Ok(slugs)
    }
}

#[async_trait]
impl DefinitionSource for DirDefinitionSource {
    async fn exists(&self, slug: &str) -> Result<bool, LoadError> {
        Ok(tokio::fs::try_exists(self.path_for(slug)).await?)
    }

    async fn fetch(&self, slug: &str) -> Result<Vec<u8>, LoadError> {
        match tokio::fs::read(self.path_for(slug)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LoadError::NotFound(slug.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Definitions served over HTTP as `<base_url>/<slug>/project.json`.
///
/// Existence is probed with `HEAD`; the document is then fetched with `GET`.
#[derive(Debug, Clone)]
pub struct HttpDefinitionSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDefinitionSource {
    /// Build a source whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, slug: &str) -> String {
        format!("{}/{slug}/{DEFINITION_FILE}", self.base_url)
    }
}

#[async_trait]
impl DefinitionSource for HttpDefinitionSource {
    async fn exists(&self, slug: &str) -> Result<bool, LoadError> {
        let response = self.client.head(self.url_for(slug)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(LoadError::Status {
                slug: slug.to_string(),
                status: s.as_u16(),
            }),
        }
    }

    async fn fetch(&self, slug: &str) -> Result<Vec<u8>, LoadError> {
        let response = self.client.get(self.url_for(slug)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(LoadError::NotFound(slug.to_string())),
            s => Err(LoadError::Status {
                slug: slug.to_string(),
                status: s.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dir_source_probes_and_fetches() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("alpha")).unwrap();
        std::fs::write(tmp.path().join("alpha").join(DEFINITION_FILE), b"{}").unwrap();

        let source = DirDefinitionSource::new(tmp.path());
        assert!(source.exists("alpha").await.unwrap());
        assert!(!source.exists("beta").await.unwrap());
        assert_eq!(source.fetch("alpha").await.unwrap(), b"{}".to_vec());
        assert!(matches!(
            source.fetch("beta").await,
            Err(LoadError::NotFound(slug)) if slug == "beta"
        ));
    }

    #[tokio::test]
    async fn dir_source_discovers_sorted_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        for slug in ["zeta", "alpha"] {
            std::fs::create_dir_all(tmp.path().join(slug)).unwrap();
            std::fs::write(tmp.path().join(slug).join(DEFINITION_FILE), b"{}").unwrap();
        }
        std::fs::create_dir_all(tmp.path().join("empty")).unwrap();
        std::fs::write(tmp.path().join("stray.json"), b"{}").unwrap();

        let source = DirDefinitionSource::new(tmp.path());
        assert_eq!(source.discover_catalog().await.unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn http_urls_are_slug_addressed() {
        let source =
            HttpDefinitionSource::new("https://example.com/projects/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            source.url_for("tide"),
            "https://example.com/projects/tide/project.json"
        );
    }
}
