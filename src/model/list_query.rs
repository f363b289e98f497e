use serde::{Deserialize, Serialize};

/// Query parameters for the listing endpoints. `recursive` stays a string so
/// the handler can report a validation error instead of an extractor
/// rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub path: Option<String>,
    pub recursive: Option<String>,
}

/// Query parameters for the download endpoint.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadQuery {
    pub filepath: Option<String>,
}
