//! Server configuration from the environment.

use std::path::{Path, PathBuf};

use dnav_augment::config::CONFIG_FILE;

pub const DEFAULT_PORT: u16 = 3004;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port.
    pub port: u16,
    /// Holds `llm-config.json`.
    pub data_dir: PathBuf,
}

impl ServerConfig {
    /// `PORT` (default 3004) and the given data directory.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            port,
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn llm_config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }
}

/// `DNAV_DATA_DIR`, else `../data` next to the executable if present, else `./data`.
pub fn resolve_data_dir() -> PathBuf {
    std::env::var("DNAV_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_path() {
        let config = ServerConfig {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("/srv/dnav"),
        };
        assert_eq!(
            config.llm_config_file(),
            PathBuf::from("/srv/dnav/llm-config.json")
        );
    }
}
