// src/config.rs
use crate::domain::access::ManagerScope;
use crate::errors::ServerError;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file path.
    pub db_path: String,
    pub bind_addr: SocketAddr,
    /// Worker threads handed to the astra server.
    pub max_workers: usize,
    /// Which change requests change managers (and admins) can see.
    pub manager_scope: ManagerScope,
    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "change_tracker.sqlite3".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_workers: 8,
            manager_scope: ManagerScope::All,
            session_ttl_secs: 60 * 60 * 24 * 7,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `CRT_*` environment variables.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = lookup("CRT_DB_PATH").filter(|p| !p.trim().is_empty()) {
            cfg.db_path = path;
        }
        if let Some(addr) = lookup("CRT_BIND_ADDR") {
            cfg.bind_addr = addr
                .trim()
                .parse()
                .map_err(|e| ServerError::InvalidInput(format!("CRT_BIND_ADDR: {e}")))?;
        }
        if let Some(workers) = lookup("CRT_MAX_WORKERS") {
            let n: usize = workers
                .trim()
                .parse()
                .map_err(|e| ServerError::InvalidInput(format!("CRT_MAX_WORKERS: {e}")))?;
            if n == 0 {
                return Err(ServerError::InvalidInput(
                    "CRT_MAX_WORKERS must be at least 1".into(),
                ));
            }
            cfg.max_workers = n;
        }
        if let Some(scope) = lookup("CRT_MANAGER_SCOPE") {
            cfg.manager_scope = ManagerScope::parse(&scope)?;
        }
        if let Some(ttl) = lookup("CRT_SESSION_TTL_SECS") {
            cfg.session_ttl_secs = ttl
                .trim()
                .parse()
                .map_err(|e| ServerError::InvalidInput(format!("CRT_SESSION_TTL_SECS: {e}")))?;
        }

        Ok(cfg)
    }
}
