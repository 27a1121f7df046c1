use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

const HOST_VAR: &str = "CAPTION_HOST";
const PORT_VAR: &str = "CAPTION_PORT";
const MAX_UPLOAD_VAR: &str = "CAPTION_MAX_UPLOAD_BYTES";

/// Process settings read once at startup.
///
/// The model identifier is not part of this: it is compiled in as
/// [`crate::MODEL_ID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` lifts the request body limit entirely.
    pub max_upload_bytes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_upload_bytes: None,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_VAR).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("{PORT_VAR} must be a port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let bind_addr = authority
            .parse::<SocketAddr>()
            .with_context(|| format!("{HOST_VAR} must be an IP address, got {host:?}"))?;

        let max_upload_bytes = match lookup(MAX_UPLOAD_VAR) {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("{MAX_UPLOAD_VAR} must be a byte count, got {raw:?}"))?,
            ),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            max_upload_bytes,
        })
    }
}
