//! Upload collaborators for store snapshots.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::export::ExportError;
use crate::storage::Snapshot;

/// Default request timeout for HTTP uploads.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Extension of every exported file.
const EXPORT_EXTENSION: &str = ".csv";

/// Remote name for a snapshot taken at `at`: `<prefix>YYYY_MM_DD_HH-MM-SS.csv`.
pub fn export_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}{}{EXPORT_EXTENSION}", at.format("%Y_%m_%d_%H-%M-%S"))
}

/// Uploads the current store snapshot somewhere durable.
///
/// Implementations read the snapshot at call time and return the name the
/// remote side assigned to the upload.
#[async_trait::async_trait]
pub trait SnapshotUploader: Send + Sync + 'static {
    /// Short label for logs (e.g. "directory", "http").
    fn kind(&self) -> &str;

    async fn upload(&self, snapshot: &Snapshot) -> Result<String, ExportError>;
}

// =============================================================================
// Directory
// =============================================================================

/// Copies snapshots into a local (or mounted) directory.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    dir: PathBuf,
    prefix: String,
}

impl DirectoryUploader {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotUploader for DirectoryUploader {
    fn kind(&self) -> &str {
        "directory"
    }

    async fn upload(&self, snapshot: &Snapshot) -> Result<String, ExportError> {
        let name = export_name(&self.prefix, snapshot.taken_at());
        tokio::fs::create_dir_all(&self.dir).await?;

        match tokio::fs::copy(snapshot.path(), self.dir.join(&name)).await {
            Ok(bytes) => {
                tracing::debug!(name = %name, bytes, dir = %self.dir.display(), "Snapshot copied");
                Ok(name)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ExportError::MissingSnapshot(snapshot.path().to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// HTTP
// =============================================================================

/// `PUT`s snapshots to `<base_url>/<name>` as `text/csv`.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    prefix: String,
}

impl HttpUploader {
    /// Build an uploader with its own HTTP client.
    ///
    /// # Errors
    /// Returns `ExportError::Http` if the client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: Option<String>,
        prefix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
            prefix: prefix.into(),
        })
    }
}

#[async_trait::async_trait]
impl SnapshotUploader for HttpUploader {
    fn kind(&self) -> &str {
        "http"
    }

    async fn upload(&self, snapshot: &Snapshot) -> Result<String, ExportError> {
        let name = export_name(&self.prefix, snapshot.taken_at());
        let body = match snapshot.read_bytes().await {
            Ok(body) => body,
            Err(crate::storage::StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ExportError::MissingSnapshot(snapshot.path().to_path_buf()));
            }
            Err(e) => return Err(ExportError::Storage(e)),
        };

        let url = format!("{}/{}", self.base_url, name);
        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        tracing::debug!(name = %name, url = %url, status = status.as_u16(), "Snapshot uploaded");
        Ok(name)
    }
}
