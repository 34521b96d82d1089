//! Response envelope shared by every portal endpoint.

use serde::{Deserialize, Serialize};

/// `{ "success": bool, "data"?: T, "error"?: string }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }

    /// Convert into a `Result`, treating `success: false` as the error message.
    ///
    /// # Errors
    ///
    /// Returns the server message (or a generic one) when `success` is false
    /// or `data` is missing.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("response carried no data".to_owned()),
            (false, _) => Err(self.error.unwrap_or_else(|| "request failed".to_owned())),
        }
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
