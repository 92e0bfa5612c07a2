//! File content at any revision, read from the object database only.

use git2::Repository;
use std::path::Path;
use tracing::{debug, error};

use crate::error::{AppError, Result};
use crate::git::repository::GitService;

/// Decode file bytes: UTF-8 first, then GBK.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }
    encoding_rs::GBK
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Raw bytes of `path` in the commit `rev` resolves to (HEAD when `None`).
///
/// Reads objects only; the index and working tree are never touched.
pub fn blob_at(repo: &Repository, path: &str, rev: Option<&str>) -> Result<Option<Vec<u8>>> {
    let commit = match rev {
        None => repo.head()?.peel_to_commit()?,
        Some(rev) => repo.revparse_single(rev)?.peel_to_commit()?,
    };
    let tree = commit.tree()?;

    let entry = match tree.get_path(Path::new(path)) {
        Ok(entry) => entry,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let obj = entry.to_object(repo)?;
    let blob = obj
        .as_blob()
        .ok_or_else(|| AppError::PathNotFound(format!("{} is not a file", path)))?;
    Ok(Some(blob.content().to_vec()))
}

impl GitService {
    /// Content of `path` as committed at `rev` (HEAD when `None`).
    pub fn read_file_at(&mut self, path: &str, rev: Option<&str>) -> Option<String> {
        let bytes = match self.with_repo(|repo, _| blob_at(repo, path, rev)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(path, rev = rev.unwrap_or("HEAD"), "File not in tree");
                return None;
            }
            Err(e) => {
                error!(path, rev = rev.unwrap_or("HEAD"), error = %e, "Failed to read file from tree");
                return None;
            }
        };

        let text = decode_text(&bytes);
        if text.is_none() {
            error!(path, "Unable to decode file");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("配置 ok".as_bytes()).as_deref(), Some("配置 ok"));
    }

    #[test]
    fn test_decode_gbk_fallback() {
        let (bytes, _, _) = encoding_rs::GBK.encode("中文");
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(decode_text(&bytes).as_deref(), Some("中文"));
    }

    #[test]
    fn test_undecodable_bytes() {
        assert_eq!(decode_text(&[0x81, 0xff, 0xff]), None);
    }
}
