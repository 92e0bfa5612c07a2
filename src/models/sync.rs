//! Outcome of a sync operation.
//!
//! `SyncResult` is the only thing the sync engine hands back to callers.
//! Every git or IO failure is translated into one of the `SyncCode` values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of sync outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncCode {
    FetchError,
    /// The remote could not be created or updated
    RemoteConfigError,
    /// Working tree is dirty and forced update is disabled
    NeedManualResolution,
    HeadMissing,
    ResetHead,
    FastForward,
    ForcedReset,
    /// Local history diverged from (or is ahead of) the remote
    NeedManualRebase,
    RemoteBranchMissing,
    SyncError,
}

impl SyncCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncCode::FetchError => "FETCH_ERROR",
            SyncCode::RemoteConfigError => "REMOTE_CONFIG_ERROR",
            SyncCode::NeedManualResolution => "NEED_MANUAL_RESOLUTION",
            SyncCode::HeadMissing => "HEAD_MISSING",
            SyncCode::ResetHead => "RESET_HEAD",
            SyncCode::FastForward => "FAST_FORWARD",
            SyncCode::ForcedReset => "FORCED_RESET",
            SyncCode::NeedManualRebase => "NEED_MANUAL_REBASE",
            SyncCode::RemoteBranchMissing => "REMOTE_BRANCH_MISSING",
            SyncCode::SyncError => "SYNC_ERROR",
        }
    }
}

impl fmt::Display for SyncCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub code: SyncCode,
    pub message: String,
    pub detail: Option<String>,
}

impl SyncResult {
    pub fn ok(code: SyncCode, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn fail(code: SyncCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Collapse to the `(success, message)` pair exposed to the UI.
    pub fn into_tuple(self) -> (bool, String) {
        (self.success, self.message)
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.code)?;
        if let Some(detail) = &self.detail {
            write!(f, " {}", detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_serializes_as_wire_name() {
        let json = serde_json::to_string(&SyncCode::NeedManualRebase).unwrap();
        assert_eq!(json, "\"NEED_MANUAL_REBASE\"");
        assert_eq!(SyncCode::NeedManualRebase.as_str(), "NEED_MANUAL_REBASE");
    }

    #[test]
    fn test_into_tuple_drops_code_and_detail() {
        let result = SyncResult::fail(SyncCode::HeadMissing, "Update failed").with_detail("HEAD missing");
        assert_eq!(result.to_string(), "Update failed [HEAD_MISSING] HEAD missing");
        assert_eq!(result.into_tuple(), (false, "Update failed".to_string()));
    }
}
