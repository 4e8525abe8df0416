//! File import from Google Drive, Dropbox and plain URLs.

use async_trait::async_trait;
use chrono::Utc;
use shared::{ImportResult, ImportSource, ImportedFile};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RuntimeMode, ServicesConfig};
use crate::error::ServiceError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DROPBOX_DOWNLOAD_URL: &str = "https://content.dropboxapi.com/2/files/download";

/// Name given to a URL import whose URL has no usable last path segment.
pub const FALLBACK_FILE_NAME: &str = "imported_file";

#[async_trait]
pub trait FileSource: Send + Sync {
    async fn fetch_drive(
        &self,
        file_id: &str,
        access_token: &str,
    ) -> Result<ImportedFile, ServiceError>;
    async fn fetch_dropbox(&self, path: &str, access_token: &str)
        -> Result<ImportedFile, ServiceError>;
}

/// Waits a fixed latency, then reports a synthetic file.
#[derive(Debug, Clone)]
pub struct DemoFileSource {
    latency: Duration,
}

impl DemoFileSource {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    async fn simulate(&self, name: String, source: ImportSource) -> ImportedFile {
        tokio::time::sleep(self.latency).await;
        tracing::info!("[demo] imported {} from {:?}", name, source);
        ImportedFile {
            name,
            size: 1_048_576,
            mime_type: Some("application/pdf".to_string()),
            source,
            imported_at: Utc::now(),
            content: Vec::new(),
        }
    }
}

#[async_trait]
impl FileSource for DemoFileSource {
    async fn fetch_drive(
        &self,
        file_id: &str,
        _access_token: &str,
    ) -> Result<ImportedFile, ServiceError> {
        Ok(self
            .simulate(format!("drive-{}.pdf", file_id), ImportSource::GoogleDrive)
            .await)
    }

    async fn fetch_dropbox(
        &self,
        path: &str,
        _access_token: &str,
    ) -> Result<ImportedFile, ServiceError> {
        let name = last_segment(path).unwrap_or(FALLBACK_FILE_NAME).to_string();
        Ok(self.simulate(name, ImportSource::Dropbox).await)
    }
}

/// Downloads file content straight from the provider APIs.
pub struct LiveFileSource {
    transport: Arc<dyn Transport>,
}

impl LiveFileSource {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl FileSource for LiveFileSource {
    async fn fetch_drive(
        &self,
        file_id: &str,
        access_token: &str,
    ) -> Result<ImportedFile, ServiceError> {
        let url = format!("{}/{}?alt=media", DRIVE_FILES_URL, file_id);
        let req = HttpRequest::get(url).bearer(access_token);
        let resp = self.transport.send(req).await?.error_for_status()?;
        Ok(into_file(file_id.to_string(), ImportSource::GoogleDrive, resp))
    }

    async fn fetch_dropbox(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<ImportedFile, ServiceError> {
        let arg = serde_json::json!({ "path": path }).to_string();
        let req = HttpRequest::post(DROPBOX_DOWNLOAD_URL)
            .bearer(access_token)
            .header("Dropbox-API-Arg", arg);
        let resp = self.transport.send(req).await?.error_for_status()?;
        let name = last_segment(path).unwrap_or(FALLBACK_FILE_NAME).to_string();
        Ok(into_file(name, ImportSource::Dropbox, resp))
    }
}

#[derive(Clone)]
pub struct ImportService {
    source: Arc<dyn FileSource>,
    transport: Arc<dyn Transport>,
}

impl ImportService {
    pub fn new(config: &ServicesConfig, transport: Arc<dyn Transport>) -> Self {
        let source: Arc<dyn FileSource> = match config.mode {
            RuntimeMode::Demo => Arc::new(DemoFileSource::new(config.import_latency())),
            RuntimeMode::Live => Arc::new(LiveFileSource::new(transport.clone())),
        };
        Self { source, transport }
    }

    pub async fn import_from_drive(&self, file_id: &str, access_token: &str) -> ImportResult {
        into_result(self.source.fetch_drive(file_id, access_token).await, "Google Drive")
    }

    pub async fn import_from_dropbox(&self, path: &str, access_token: &str) -> ImportResult {
        into_result(self.source.fetch_dropbox(path, access_token).await, "Dropbox")
    }

    /// Download `url`. Always live, whatever the runtime mode.
    pub async fn import_from_url(&self, url: &str) -> ImportResult {
        into_result(self.fetch_url(url).await, "URL")
    }

    async fn fetch_url(&self, url: &str) -> Result<ImportedFile, ServiceError> {
        let parsed = url::Url::parse(url)?;
        let resp = self
            .transport
            .send(HttpRequest::get(parsed.as_str()))
            .await?
            .error_for_status()?;
        Ok(into_file(file_name_from_url(url), ImportSource::Url, resp))
    }
}

fn into_result(result: Result<ImportedFile, ServiceError>, provider: &str) -> ImportResult {
    match result {
        Ok(file) => {
            tracing::info!("Imported {} ({} bytes) from {}", file.name, file.size, provider);
            ImportResult::imported(file)
        }
        Err(e) => {
            tracing::warn!("Import from {} failed: {}", provider, e);
            ImportResult::failed(e)
        }
    }
}

fn into_file(name: String, source: ImportSource, resp: HttpResponse) -> ImportedFile {
    ImportedFile {
        name,
        size: resp.body.len() as u64,
        mime_type: resp.content_type,
        source,
        imported_at: Utc::now(),
        content: resp.body,
    }
}

fn last_segment(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|s| !s.is_empty())
}

/// Last path segment of `url`, or [`FALLBACK_FILE_NAME`].
pub fn file_name_from_url(url: &str) -> String {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.last().map(str::to_string)),
        Err(_) => last_segment(url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default())
            .map(str::to_string),
    };
    segment
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}
