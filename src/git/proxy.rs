//! Transport proxy stored in the repository-local git config.
//!
//! Only the `Local` config level is ever written, so the user's global git
//! setup is never touched. Applying the proxy is best effort: errors are
//! logged and never abort a sync.

use git2::{ConfigLevel, ErrorCode, Repository};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::git::repository::GitService;

const PROXY_KEYS: [&str; 2] = ["http.proxy", "https.proxy"];

const PROXY_SCHEMES: [&str; 3] = ["http://", "https://", "socks5://"];

/// Normalized proxy address, `None` when no proxy is configured.
pub fn proxy_address(config: &SyncConfig) -> Option<String> {
    if !config.personal_proxy_enabled {
        return None;
    }

    let proxy = config.personal_proxy.trim();
    if proxy.is_empty() {
        return None;
    }

    if PROXY_SCHEMES.iter().any(|scheme| proxy.starts_with(scheme)) {
        return Some(proxy.to_string());
    }

    Some(format!("http://{}", proxy))
}

pub(crate) fn apply_proxy(repo: &Repository, config: &SyncConfig) {
    let proxy = proxy_address(config);
    if let Err(e) = write_proxy(repo, proxy.as_deref()) {
        warn!(error = %e, "Failed to apply proxy settings");
    }
}

fn write_proxy(repo: &Repository, proxy: Option<&str>) -> Result<()> {
    let mut cfg = repo.config()?.open_level(ConfigLevel::Local)?;

    match proxy {
        None => {
            for key in PROXY_KEYS {
                if let Err(e) = cfg.remove(key) {
                    if e.code() != ErrorCode::NotFound {
                        debug!(key, error = %e, "Could not remove proxy key");
                    }
                }
            }
        }
        Some(proxy) => {
            for key in PROXY_KEYS {
                cfg.set_str(key, proxy)?;
            }
        }
    }

    Ok(())
}

impl GitService {
    pub fn proxy_address(&self) -> Option<String> {
        proxy_address(&self.config)
    }

    /// Apply the configured proxy; `false` when there is no repository to configure.
    pub fn init_proxy(&mut self) -> bool {
        if !self.handle.exists() {
            warn!("No repository, proxy not applied");
            return false;
        }

        let config = &self.config;
        match self.handle.open(false) {
            Ok(repo) => {
                apply_proxy(repo, config);
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to initialize proxy");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_proxy(proxy: &str) -> SyncConfig {
        SyncConfig {
            personal_proxy_enabled: true,
            personal_proxy: proxy.to_string(),
            ..SyncConfig::default()
        }
    }

    fn local_value(repo: &Repository, key: &str) -> Option<String> {
        let cfg = repo.config().unwrap().open_level(ConfigLevel::Local).unwrap();
        cfg.get_string(key).ok()
    }

    #[test]
    fn test_bare_host_port_gets_http_scheme() {
        assert_eq!(
            proxy_address(&with_proxy("127.0.0.1:1080")).as_deref(),
            Some("http://127.0.0.1:1080")
        );
    }

    #[test]
    fn test_known_schemes_pass_through() {
        for proxy in ["socks5://host:1080", "http://host:8080", "https://host:8443"] {
            assert_eq!(proxy_address(&with_proxy(proxy)).as_deref(), Some(proxy));
        }
    }

    #[test]
    fn test_disabled_or_blank_proxy() {
        let mut config = with_proxy("127.0.0.1:1080");
        config.personal_proxy_enabled = false;
        assert_eq!(proxy_address(&config), None);

        assert_eq!(proxy_address(&with_proxy("  ")), None);
    }

    #[test]
    fn test_apply_then_clear_repository_config() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();

        apply_proxy(&repo, &with_proxy("127.0.0.1:1080"));
        assert_eq!(local_value(&repo, "http.proxy").as_deref(), Some("http://127.0.0.1:1080"));
        assert_eq!(local_value(&repo, "https.proxy").as_deref(), Some("http://127.0.0.1:1080"));

        // clearing twice exercises the missing-key path
        apply_proxy(&repo, &SyncConfig::default());
        apply_proxy(&repo, &SyncConfig::default());
        assert_eq!(local_value(&repo, "http.proxy"), None);
        assert_eq!(local_value(&repo, "https.proxy"), None);
    }

    #[test]
    fn test_init_proxy_requires_repository() {
        let tmp = TempDir::new().unwrap();
        let mut config = with_proxy("127.0.0.1:1080");
        config.work_dir = tmp.path().to_path_buf();
        let mut service = GitService::new(config);

        assert!(!service.init_proxy());

        let repo = Repository::init(tmp.path()).unwrap();
        assert!(service.init_proxy());
        assert_eq!(local_value(&repo, "http.proxy").as_deref(), Some("http://127.0.0.1:1080"));
    }
}
