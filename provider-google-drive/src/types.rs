//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses, plus the
//! MIME type table that decides how Google Workspace documents are exported.

use bridge_traits::storage::ExportFormat;
use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by all Drive-native (Workspace) types
pub const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";

/// Workspace types that can be exported, with their target format
const EXPORT_TABLE: &[(&str, &str, &str)] = &[
    (
        "application/vnd.google-apps.document",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    (
        "application/vnd.google-apps.spreadsheet",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    (
        "application/vnd.google-apps.presentation",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
];

/// Export format for a Workspace MIME type, if it has one
pub fn export_format_for(mime_type: &str) -> Option<ExportFormat> {
    EXPORT_TABLE
        .iter()
        .find(|(source, _, _)| *source == mime_type)
        .map(|(_, target, extension)| ExportFormat {
            mime_type: (*target).to_string(),
            extension: (*extension).to_string(),
        })
}

/// Whether the MIME type is Drive-native rather than uploaded bytes
pub fn is_google_apps_type(mime_type: &str) -> bool {
    mime_type.starts_with(GOOGLE_APPS_PREFIX)
}

/// Google Drive API file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID
    pub id: String,

    /// File name
    pub name: String,

    /// MIME type
    pub mime_type: String,

    /// File size in bytes (omitted for folders and Workspace documents)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Modification time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    /// MD5 checksum (binary content only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,

    /// SHA-256 checksum (binary content only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256_checksum: Option<String>,

    /// Parent folder IDs
    #[serde(default)]
    pub parents: Vec<String>,

    /// Whether file is trashed
    #[serde(default)]
    pub trashed: bool,

    /// Resource key for link-shared items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_key: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    /// List of files
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    pub next_page_token: Option<String>,

    /// Whether the result may be missing items
    #[serde(default)]
    pub incomplete_search: bool,
}

/// Shared drive resource
#[derive(Debug, Clone, Deserialize)]
pub struct SharedDrive {
    pub id: String,
    pub name: String,
}

/// Google Drive API drives.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/drives/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrivesListResponse {
    #[serde(default)]
    pub drives: Vec<SharedDrive>,

    pub next_page_token: Option<String>,
}

/// Google Drive API about.get response (user field only)
#[derive(Debug, Deserialize)]
pub struct AboutResponse {
    pub user: AboutUser,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutUser {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Error envelope returned by Google APIs
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorResponse {
    /// Parse an error body, if it is one
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    pub fn reasons(&self) -> impl Iterator<Item = &str> {
        self.error
            .errors
            .iter()
            .filter_map(|item| item.reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_drive_file() {
        let json = r#"{
            "id": "abc123",
            "name": "report.pdf",
            "mimeType": "application/pdf",
            "size": "1024",
            "modifiedTime": "2023-01-02T00:00:00.000Z",
            "md5Checksum": "d41d8cd98f00b204e9800998ecf8427e",
            "sha256Checksum": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            "parents": ["folder1"],
            "resourceKey": "0-abc",
            "trashed": false
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "abc123");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.size, Some("1024".to_string()));
        assert_eq!(file.resource_key.as_deref(), Some("0-abc"));
        assert!(file.sha256_checksum.is_some());
        assert!(!file.is_folder());
    }

    #[test]
    fn test_deserialize_minimal_file() {
        let json = r#"{"id": "d1", "name": "Docs", "mimeType": "application/vnd.google-apps.folder"}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert!(file.is_folder());
        assert!(file.parents.is_empty());
        assert!(file.modified_time.is_none());
    }

    #[test]
    fn test_deserialize_lists() {
        let files: FilesListResponse =
            serde_json::from_str(r#"{"nextPageToken": "token123"}"#).unwrap();
        assert!(files.files.is_empty());
        assert_eq!(files.next_page_token, Some("token123".to_string()));

        let drives: DrivesListResponse =
            serde_json::from_str(r#"{"drives": [{"id": "0AB", "name": "Team"}]}"#).unwrap();
        assert_eq!(drives.drives[0].name, "Team");
        assert!(drives.next_page_token.is_none());
    }

    #[test]
    fn test_export_table() {
        let docx = export_format_for("application/vnd.google-apps.document").unwrap();
        assert_eq!(docx.extension, "docx");
        assert_eq!(
            export_format_for("application/vnd.google-apps.spreadsheet")
                .unwrap()
                .extension,
            "xlsx"
        );
        assert_eq!(
            export_format_for("application/vnd.google-apps.presentation")
                .unwrap()
                .extension,
            "pptx"
        );
        assert!(export_format_for("application/vnd.google-apps.form").is_none());
        assert!(export_format_for("image/png").is_none());

        assert!(is_google_apps_type("application/vnd.google-apps.form"));
        assert!(!is_google_apps_type("image/png"));
    }

    #[test]
    fn test_api_error_reasons() {
        let body = br#"{
            "error": {
                "code": 403,
                "message": "User Rate Limit Exceeded",
                "errors": [{"domain": "usageLimits", "reason": "userRateLimitExceeded", "message": "User Rate Limit Exceeded"}]
            }
        }"#;

        let parsed = ApiErrorResponse::parse(body).unwrap();
        assert_eq!(parsed.error.code, Some(403));
        assert_eq!(parsed.reasons().collect::<Vec<_>>(), vec!["userRateLimitExceeded"]);
        assert!(ApiErrorResponse::parse(b"not json").is_none());
    }
}
