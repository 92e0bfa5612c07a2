use serde::{Deserialize, Serialize};

/// Newest stable and pre-release tags published on the remote.
///
/// `None` means no matching tag exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub latest_stable: Option<String>,
    pub latest_beta: Option<String>,
}
