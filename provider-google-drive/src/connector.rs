//! Google Drive API connector implementation
//!
//! Implements the `StorageProvider` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{DynAsyncRead, HttpClient, HttpMethod, HttpRequest};
use bridge_traits::storage::{RemoteFile, RemoteSource, SourceKind, StorageProvider};
use chrono::{DateTime, Utc};
use core_auth::{AccessTokenSource, StaticToken};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::GoogleDriveError;
use crate::types::{
    export_format_for, is_google_apps_type, AboutResponse, DriveFile, DrivesListResponse,
    FilesListResponse,
};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Maximum shared drives per page
const MAX_DRIVES_PAGE_SIZE: u32 = 100;

/// Fields to request for file resources
const FILE_FIELDS: &str =
    "id,name,mimeType,size,modifiedTime,md5Checksum,sha256Checksum,parents,trashed,resourceKey";

/// Query selecting everything the operator can pick from outside shared drives
const SOURCES_QUERY: &str = "trashed=false and ('root' in parents or sharedWithMe)";

/// Header carrying resource keys for link-shared items
const RESOURCE_KEY_HEADER: &str = "X-Goog-Drive-Resource-Keys";

/// Account the connector is acting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveAccount {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// Google Drive API connector
///
/// Implements `StorageProvider` for Google Drive API v3.
///
/// # Features
///
/// - Paginated listing of root items, shared items and shared drives
/// - Streaming downloads, with Workspace documents exported to Office formats
/// - Resource keys for link-shared files
/// - Rate-limit classification of error responses (no internal retry)
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::StorageProvider;
///
/// let manager = SessionEstablisher::new(http_client.clone(), clock).manage(&path).await?;
/// let connector = GoogleDriveConnector::with_token_source(http_client, Arc::new(manager));
/// let sources = connector.list_sources().await?;
/// ```
pub struct GoogleDriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Bearer tokens, fetched per request so a refreshed token is picked up
    tokens: Arc<dyn AccessTokenSource>,

    /// Per-request timeout
    request_timeout: Duration,

    api_base: String,
}

impl GoogleDriveConnector {
    /// Create a connector with a fixed access token
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `access_token` - OAuth 2.0 access token with the `drive` scope
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self::with_token_source(http_client, Arc::new(StaticToken::new(access_token)))
    }

    /// Create a connector that asks `tokens` for a bearer token on every call
    pub fn with_token_source(
        http_client: Arc<dyn HttpClient>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            http_client,
            tokens,
            request_timeout: Duration::from_secs(60),
            api_base: DRIVE_API_BASE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Parse RFC 3339 timestamp to Unix timestamp
    fn parse_timestamp(rfc3339: &str) -> Option<i64> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).timestamp())
    }

    /// Convert DriveFile to RemoteFile
    fn convert_file(drive_file: DriveFile) -> RemoteFile {
        let is_folder = drive_file.is_folder();
        let export_as = export_format_for(&drive_file.mime_type);
        let downloadable =
            !is_folder && (export_as.is_some() || !is_google_apps_type(&drive_file.mime_type));

        RemoteFile {
            id: drive_file.id,
            name: drive_file.name,
            size: drive_file.size.and_then(|s| s.parse().ok()),
            modified_at: drive_file
                .modified_time
                .as_deref()
                .and_then(Self::parse_timestamp),
            is_folder,
            parent_ids: drive_file.parents,
            md5_checksum: drive_file.md5_checksum,
            sha256_checksum: drive_file.sha256_checksum,
            resource_key: drive_file.resource_key,
            export_as,
            downloadable,
            mime_type: Some(drive_file.mime_type),
        }
    }

    /// Authorized request with the connector's timeout
    async fn request(&self, method: HttpMethod, url: String) -> Result<HttpRequest> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| BridgeError::Unauthorized(e.to_string()))?;

        Ok(HttpRequest::new(method, url)
            .bearer_token(&token)
            .timeout(self.request_timeout))
    }

    /// Execute a JSON API call, classifying error responses
    async fn get_json<T: DeserializeOwned>(&self, url: String, subject: &str) -> Result<T> {
        let request = self
            .request(HttpMethod::Get, url)
            .await?
            .header("Accept", "application/json");

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            debug!(status = response.status, "API request failed");
            return Err(GoogleDriveError::from_response(response.status, &response.body, subject).into());
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse response for {}: {}", subject, e))
                .into()
        })
    }

    /// One page of a files.list call
    async fn list_files_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<FilesListResponse> {
        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields={}&corpora=allDrives&includeItemsFromAllDrives=true&supportsAllDrives=true",
            self.api_base,
            urlencoding::encode(query),
            MAX_PAGE_SIZE,
            urlencoding::encode(&format!("nextPageToken,incompleteSearch,files({})", FILE_FIELDS)),
        );

        if let Some(page_token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(page_token)));
        }

        self.get_json(url, "files.list").await
    }

    /// Probe the account the token belongs to
    #[instrument(skip(self))]
    pub async fn about(&self) -> Result<DriveAccount> {
        let url = format!("{}/about?fields=user", self.api_base);
        let about: AboutResponse = self.get_json(url, "about").await?;

        Ok(DriveAccount {
            display_name: about.user.display_name,
            email: about.user.email_address,
        })
    }
}

#[async_trait]
impl StorageProvider for GoogleDriveConnector {
    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<RemoteSource>> {
        info!("Listing sources from Google Drive");

        let mut sources = Vec::new();

        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_files_page(SOURCES_QUERY, page_token.as_deref()).await?;

            for file in page.files {
                let kind = if file.is_folder() {
                    SourceKind::Folder
                } else {
                    SourceKind::File
                };
                let mut source = RemoteSource::new(kind, file.id, file.name);
                source.mime_type = Some(file.mime_type);
                sources.push(source);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!(
                "{}/drives?pageSize={}&fields={}",
                self.api_base,
                MAX_DRIVES_PAGE_SIZE,
                urlencoding::encode("nextPageToken,drives(id,name)"),
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let page: DrivesListResponse = self.get_json(url, "drives.list").await?;
            sources.extend(
                page.drives
                    .into_iter()
                    .map(|drive| RemoteSource::new(SourceKind::SharedDrive, drive.id, drive.name)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("Listed {} sources from Google Drive", sources.len());
        Ok(sources)
    }

    #[instrument(skip(self, cursor), fields(parent_id = %parent_id))]
    async fn list_children(
        &self,
        parent_id: &str,
        cursor: Option<String>,
    ) -> Result<(Vec<RemoteFile>, Option<String>)> {
        let query = format!(
            "'{}' in parents and trashed=false",
            parent_id.replace('\\', "\\\\").replace('\'', "\\'")
        );

        let page = self.list_files_page(&query, cursor.as_deref()).await?;
        let files: Vec<RemoteFile> = page.files.into_iter().map(Self::convert_file).collect();

        debug!(count = files.len(), more = page.next_page_token.is_some(), "Listed children");
        Ok((files, page.next_page_token))
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    async fn get_metadata(&self, file_id: &str) -> Result<RemoteFile> {
        let url = format!(
            "{}/files/{}?fields={}&supportsAllDrives=true",
            self.api_base,
            urlencoding::encode(file_id),
            urlencoding::encode(FILE_FIELDS)
        );

        let drive_file: DriveFile = self.get_json(url, file_id).await?;
        Ok(Self::convert_file(drive_file))
    }

    #[instrument(skip(self, file), fields(file_id = %file.id))]
    async fn open_download(&self, file: &RemoteFile) -> Result<Box<DynAsyncRead>> {
        if !file.downloadable {
            return Err(GoogleDriveError::NotDownloadable {
                name: file.name.clone(),
                mime_type: file.mime_type.clone().unwrap_or_default(),
            }
            .into());
        }

        let url = match &file.export_as {
            Some(format) => format!(
                "{}/files/{}/export?mimeType={}",
                self.api_base,
                urlencoding::encode(&file.id),
                urlencoding::encode(&format.mime_type)
            ),
            None => format!(
                "{}/files/{}?alt=media&supportsAllDrives=true",
                self.api_base,
                urlencoding::encode(&file.id)
            ),
        };

        let mut request = self.request(HttpMethod::Get, url).await?;
        if let Some(key) = &file.resource_key {
            request = request.header(RESOURCE_KEY_HEADER, format!("{}/{}", file.id, key));
        }

        debug!(export = file.export_as.is_some(), "Opening download");
        self.http_client
            .download_stream(request)
            .await
            .map_err(|e| GoogleDriveError::from_bridge(e, &file.id).into())
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    async fn delete(&self, file_id: &str) -> Result<()> {
        let url = format!(
            "{}/files/{}?supportsAllDrives=true",
            self.api_base,
            urlencoding::encode(file_id)
        );

        let response = self
            .http_client
            .execute(self.request(HttpMethod::Delete, url).await?)
            .await?;

        if !response.is_success() {
            return Err(GoogleDriveError::from_response(response.status, &response.body, file_id).into());
        }

        info!("Deleted remote item");
        Ok(())
    }
}
