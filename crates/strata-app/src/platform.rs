//! Directory resolution for config and log files.

use std::path::{Path, PathBuf};

use crate::error::AppError;

const APP_NAME: &str = "strata";

/// Where `config.ron` and log files live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppDirs {
    /// `config_override` if given, otherwise the OS configuration directory.
    pub fn resolve(config_override: Option<&Path>) -> Result<Self, AppError> {
        match config_override {
            Some(dir) => Ok(Self::with_config_dir(dir)),
            None => {
                let base = dirs::config_dir().ok_or(AppError::NoConfigDir)?;
                Ok(Self::with_config_dir(&base.join(APP_NAME)))
            }
        }
    }

    pub fn with_config_dir(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            log_dir: config_dir.join("logs"),
        }
    }

    pub fn create(&self) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let dirs = AppDirs::resolve(Some(Path::new("/tmp/strata-cfg"))).unwrap();
        assert_eq!(dirs.config_dir, PathBuf::from("/tmp/strata-cfg"));
        assert_eq!(dirs.log_dir, PathBuf::from("/tmp/strata-cfg/logs"));
    }

    #[test]
    fn test_create_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = AppDirs::with_config_dir(&tmp.path().join("cfg"));
        dirs.create().expect("create failed for temp root");
        assert!(dirs.config_dir.exists(), "config_dir was not created");
        assert!(dirs.log_dir.exists(), "log_dir was not created");
    }
}
