use serde::{Deserialize, Serialize};

/// Lifecycle of a rectification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "PENDING")]
    Pending,

    #[serde(rename = "IN_PROGRESS")]
    InProgress,

    #[serde(rename = "DONE")]
    Done,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Done => "DONE",
        }
    }

    /// Unknown status text degrades to PENDING rather than failing a read.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "DONE" => RequestStatus::Done,
            "IN_PROGRESS" => RequestStatus::InProgress,
            _ => RequestStatus::Pending,
        }
    }
}

/// One stored rectification request, keyed by boleta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectificationRequest {
    pub boleta: String,
    pub codigo: String,
    pub dni: String,
    pub status: RequestStatus,
    pub message: Option<String>,

    /// The final chosen plan, stored as JSON once the request is DONE.
    #[serde(rename = "finalData")]
    pub final_data: Option<serde_json::Value>,

    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}
