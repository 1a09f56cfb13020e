use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::clock::MILLIS_PER_DAY;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "PersonalOrganizer";
const APP_NAME: &str = "organizer";

pub const CONFIG_ENV: &str = "ORGANIZER_CONFIG";
pub const DATA_ENV: &str = "ORGANIZER_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths)?;
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub backup_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        Ok(Self::rooted(config_dir, config_file, data_root))
    }

    /// Lays out every derived path under an explicit config and data root.
    pub fn rooted(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("organizer.db"),
            backup_dir: data_dir.join("backups"),
            config_dir,
            config_file,
            data_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.backup_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageOptions,
    pub trash: TrashOptions,
    pub search: SearchOptions,
    pub backup: BackupOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.storage
            .resolve(paths)
            .context("resolving storage paths")?;
        if self.search.max_results == 0 {
            tracing::warn!("search.max_results of 0 would hide every match, using 10");
            self.search.max_results = SearchOptions::default().max_results;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    #[serde(skip)]
    pub backup_dir: PathBuf,
    pub wal_autocheckpoint: u32,
    /// Upper bound on the summed size of all stored values (0 = unlimited)
    pub quota_bytes: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            backup_dir: PathBuf::new(),
            wal_autocheckpoint: 1000,
            quota_bytes: 5 * 1024 * 1024,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
        if self.backup_dir.as_os_str().is_empty() {
            self.backup_dir = paths.backup_dir.clone();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrashOptions {
    /// Trashed items older than this are swept at startup (0 = keep until emptied)
    pub retention_days: u32,
    /// Refuse to drop trash items whose section is not recognised
    pub strict_restore: bool,
}

impl Default for TrashOptions {
    fn default() -> Self {
        Self {
            retention_days: 30,
            strict_restore: false,
        }
    }
}

impl TrashOptions {
    pub fn retention_millis(&self) -> Option<i64> {
        if self.retention_days == 0 {
            None
        } else {
            Some(i64::from(self.retention_days) * MILLIS_PER_DAY)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results: usize,
    pub context_graphemes: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            context_graphemes: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupOptions {
    pub pretty: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let config_dir = root.path().join("config");
        ConfigPaths::rooted(
            config_dir.clone(),
            config_dir.join("config.toml"),
            root.path().join("data"),
        )
    }

    #[test]
    fn first_run_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let loader = ConfigLoader::with_paths(paths.clone());

        let cfg = loader.load_or_init()?;
        assert!(paths.config_file.exists());
        assert_eq!(cfg.trash.retention_days, 30);
        assert_eq!(cfg.search.max_results, 10);
        assert_eq!(cfg.storage.database_path, paths.database_path);
        assert_eq!(cfg.storage.backup_dir, paths.backup_dir);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[trash]\nretention_days = 7\n\n[search]\nmax_results = 0\n",
        )?;

        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.trash.retention_days, 7);
        assert!(!cfg.trash.strict_restore);
        assert_eq!(cfg.search.max_results, 10);
        assert_eq!(cfg.storage.wal_autocheckpoint, 1000);
        Ok(())
    }

    #[test]
    fn zero_retention_disables_expiry() {
        let opts = TrashOptions {
            retention_days: 0,
            strict_restore: false,
        };
        assert_eq!(opts.retention_millis(), None);
        assert_eq!(
            TrashOptions::default().retention_millis(),
            Some(30 * MILLIS_PER_DAY)
        );
    }
}
