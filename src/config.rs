//! Runtime configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_DB_PATH: &str = "goaltrack.db";
pub const DEFAULT_ADDR: &str = "0.0.0.0:5876";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    /// Shared secret the identity-provider bridge presents when it hands over
    /// a signed-in identity. Sign-in is refused while unset.
    pub auth_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db_path = lookup("GOALTRACK_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let addr = lookup("GOALTRACK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid GOALTRACK_ADDR {addr:?}"))?;
        let auth_secret = lookup("AUTH_SECRET").filter(|secret| !secret.is_empty());

        Ok(Self {
            db_path,
            addr,
            auth_secret,
        })
    }
}
