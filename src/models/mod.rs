//! Data transfer objects returned by `GitService` and the status API.
//!
//! - `commit`: CommitRecord, CommitPage, VersionInfo
//! - `sync`: SyncResult and its closed SyncCode taxonomy
//! - `tags`: TagPair

pub mod commit;
pub mod sync;
pub mod tags;

pub use commit::*;
pub use sync::*;
pub use tags::*;
