//! Application directory paths for the MeiLin ambient host.
//!
//! Uses [`dirs`] for platform-appropriate locations:
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (logs) | `~/Library/Application Support/meilin/` | `~/.local/share/meilin/` |
//! | Config | `~/Library/Application Support/meilin/` | `~/.config/meilin/` |
//!
//! `MEILIN_DATA_DIR` and `MEILIN_CONFIG_DIR` override the respective roots.

use std::path::PathBuf;

/// Persistent data root. Holds rotated logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MEILIN_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("meilin"))
        .unwrap_or_else(|| PathBuf::from("/tmp/meilin-data"))
}

/// Directory holding `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MEILIN_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("meilin"))
        .unwrap_or_else(|| PathBuf::from("/tmp/meilin-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Host configuration file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_ends_with_config_toml() {
        let path = config_file();
        let s = path.to_string_lossy();
        assert!(s.ends_with("config.toml"), "config_file: {s}");
    }

    #[test]
    fn logs_dir_is_subpath_of_data_dir() {
        let logs = logs_dir();
        let data = data_dir();
        assert!(
            logs.starts_with(&data),
            "logs_dir ({}) should start with data_dir ({})",
            logs.display(),
            data.display()
        );
    }

    #[test]
    fn config_dir_is_nonempty() {
        assert!(!config_dir().as_os_str().is_empty());
    }
}
