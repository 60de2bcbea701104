use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub chunking: ChunkingConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_num_chunks: usize,
    pub max_num_chunks: usize,
    pub max_question_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:8000".to_string(),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            storage: StorageConfig {
                database_path: PathBuf::from("data/docqa.db"),
                upload_dir: PathBuf::from("media/documents"),
            },
            chunking: ChunkingConfig { max_chars: 300 },
            query: QueryConfig {
                default_num_chunks: 3,
                max_num_chunks: 10,
                max_question_chars: 1000,
            },
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `DOCQA_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("DOCQA_BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Some(bytes) = parse_var(&lookup, "DOCQA_MAX_UPLOAD_BYTES")? {
            config.server.max_upload_bytes = bytes;
        }
        if let Some(path) = lookup("DOCQA_DATABASE_PATH") {
            config.storage.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("DOCQA_UPLOAD_DIR") {
            config.storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(max_chars) = parse_var(&lookup, "DOCQA_CHUNK_MAX_CHARS")? {
            config.chunking.max_chars = max_chars;
        }
        if let Some(n) = parse_var(&lookup, "DOCQA_DEFAULT_NUM_CHUNKS")? {
            config.query.default_num_chunks = n;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chars == 0 {
            anyhow::bail!("DOCQA_CHUNK_MAX_CHARS must be greater than 0");
        }
        if !(1..=self.query.max_num_chunks).contains(&self.query.default_num_chunks) {
            anyhow::bail!(
                "DOCQA_DEFAULT_NUM_CHUNKS must be between 1 and {}",
                self.query.max_num_chunks
            );
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("DOCQA_MAX_UPLOAD_BYTES must be greater than 0");
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .context(format!("Invalid value for {key}: {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.chunking.max_chars, 300);
        assert_eq!(config.query.default_num_chunks, 3);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DOCQA_BIND_ADDR", "127.0.0.1:9000"),
            ("DOCQA_CHUNK_MAX_CHARS", " 500 "),
            ("DOCQA_UPLOAD_DIR", "/tmp/uploads"),
            ("DOCQA_DEFAULT_NUM_CHUNKS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.storage.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.query.default_num_chunks, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("DOCQA_CHUNK_MAX_CHARS", "lots")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("DOCQA_CHUNK_MAX_CHARS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("DOCQA_DEFAULT_NUM_CHUNKS", "11")])).is_err());
    }
}
