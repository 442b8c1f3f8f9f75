//! Job result types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Delivery record for one produced file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Uploaded object address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Standard base64 of the file contents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// Batch-mode response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub results: HashMap<String, JobResult>,
}
