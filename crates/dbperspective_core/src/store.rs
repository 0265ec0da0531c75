use crate::PerspectiveConfig;
use crate::error::PerspectiveError;
use std::fs;
use std::path::{Path, PathBuf};

/// Named perspective configurations, one JSON file each.
pub struct PerspectiveStore {
    dir: PathBuf,
}

impl PerspectiveStore {
    pub fn new() -> Result<Self, PerspectiveError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            PerspectiveError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        Self::with_dir(config_dir.join("dbperspective").join("perspectives"))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self, PerspectiveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> Result<PathBuf, PerspectiveError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(PerspectiveError::InvalidConfig(format!(
                "invalid perspective name '{}'",
                name
            )));
        }

        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Loads a perspective; a missing file yields the default configuration.
    pub fn load(&self, name: &str) -> Result<PerspectiveConfig, PerspectiveError> {
        let path = self.path(name)?;
        if !path.exists() {
            return Ok(PerspectiveConfig::default());
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| PerspectiveError::InvalidConfig(e.to_string()))
    }

    pub fn save(&self, name: &str, config: &PerspectiveConfig) -> Result<(), PerspectiveError> {
        let path = self.path(name)?;
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| PerspectiveError::InvalidConfig(e.to_string()))?;

        fs::write(&path, content)?;
        log::info!("Saved perspective {} to {}", name, path.display());

        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<bool, PerspectiveError> {
        let path = self.path(name)?;
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)?;
        Ok(true)
    }

    /// Names of the stored perspectives, sorted.
    pub fn list(&self) -> Result<Vec<String>, PerspectiveError> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigPatch;

    #[test]
    fn test_missing_perspective_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PerspectiveStore::with_dir(dir.path()).unwrap();

        assert_eq!(store.load("orders").unwrap(), PerspectiveConfig::default());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_load_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = PerspectiveStore::with_dir(dir.path().join("nested")).unwrap();

        let config = PerspectiveConfig::default().apply(&ConfigPatch::AddParentFilter {
            unique_name: "customers::orders".to_string(),
        });
        store.save("customers", &config).unwrap();
        store.save("archive", &PerspectiveConfig::default()).unwrap();

        assert_eq!(store.load("customers").unwrap(), config);
        assert_eq!(store.list().unwrap(), vec!["archive", "customers"]);

        assert!(store.remove("archive").unwrap());
        assert!(!store.remove("archive").unwrap());
        assert_eq!(store.list().unwrap(), vec!["customers"]);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = PerspectiveStore::with_dir(dir.path()).unwrap();

        assert!(matches!(
            store.save("../escape", &PerspectiveConfig::default()),
            Err(PerspectiveError::InvalidConfig(_))
        ));
        assert!(store.load("").is_err());
    }

    #[test]
    fn test_corrupt_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = PerspectiveStore::with_dir(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        assert!(matches!(
            store.load("broken"),
            Err(PerspectiveError::InvalidConfig(_))
        ));
    }
}
