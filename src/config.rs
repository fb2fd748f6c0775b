//! Generator configuration from schemaforge.yaml
//!
//! Precedence when resolving: CLI flag > environment > config file > defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "schemaforge.yaml";
pub const DEFAULT_DECIMAL_PRECISION: u8 = 10;
pub const DEFAULT_DECIMAL_SCALE: u8 = 2;

const ENV_WORKERS: &str = "SCHEMAFORGE_WORKERS";
const ENV_TEMP_DIR: &str = "SCHEMAFORGE_TEMP_DIR";
const ENV_FK_SUFFIXES: &str = "SCHEMAFORGE_FK_SUFFIXES";

fn default_fk_suffixes() -> Vec<String> {
    vec!["_id".to_string()]
}

fn default_string_max_length() -> u32 {
    255
}

fn default_decimal_precision() -> u8 {
    DEFAULT_DECIMAL_PRECISION
}

fn default_decimal_scale() -> u8 {
    DEFAULT_DECIMAL_SCALE
}

/// Tunables for a generation run
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Field-name suffixes that mark a foreign key (e.g. "_id")
    #[serde(default = "default_fk_suffixes")]
    pub foreign_key_suffixes: Vec<String>,
    /// Render workers; 0 means available parallelism
    #[serde(default)]
    pub workers: usize,
    /// Implicit `max` rule and column length for string fields
    #[serde(default = "default_string_max_length")]
    pub string_max_length: u32,
    #[serde(default = "default_decimal_precision")]
    pub decimal_precision: u8,
    #[serde(default = "default_decimal_scale")]
    pub decimal_scale: u8,
    /// Where archives are staged before being handed out
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Directory of files layered over the built-in project skeleton
    #[serde(default)]
    pub skeleton_overlay: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            foreign_key_suffixes: default_fk_suffixes(),
            workers: 0,
            string_max_length: default_string_max_length(),
            decimal_precision: DEFAULT_DECIMAL_PRECISION,
            decimal_scale: DEFAULT_DECIMAL_SCALE,
            temp_dir: None,
            skeleton_overlay: None,
        }
    }
}

impl GeneratorConfig {
    /// Load generator configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

        let config: GeneratorConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration with precedence: CLI > environment > file > defaults
    ///
    /// When `config_path` is `None`, `schemaforge.yaml` in the working
    /// directory is used if present.
    pub fn resolve(config_path: Option<&Path>, cli_workers: Option<usize>) -> Result<Self, String> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;

        if let Some(workers) = cli_workers {
            config.workers = workers;
        }

        config.validate()?;
        Ok(config)
    }

    /// Override settings from environment variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = workers
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a number, got '{}'", ENV_WORKERS, workers))?;
            tracing::debug!(workers = self.workers, "worker count from environment");
        }

        if let Some(dir) = lookup(ENV_TEMP_DIR) {
            if !dir.trim().is_empty() {
                self.temp_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(suffixes) = lookup(ENV_FK_SUFFIXES) {
            self.foreign_key_suffixes = suffixes
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.foreign_key_suffixes.is_empty() {
            return Err("foreign_key_suffixes must not be empty".to_string());
        }
        for suffix in &self.foreign_key_suffixes {
            if suffix.len() < 2 || !suffix.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
                return Err(format!(
                    "foreign key suffix '{}' must be lowercase letters/underscores",
                    suffix
                ));
            }
        }
        if self.string_max_length == 0 {
            return Err("string_max_length must be positive".to_string());
        }
        if self.decimal_precision == 0 || self.decimal_precision > 65 || self.decimal_scale > self.decimal_precision {
            return Err(format!(
                "invalid decimal precision {} / scale {}",
                self.decimal_precision, self.decimal_scale
            ));
        }
        Ok(())
    }

    /// Worker count for `jobs` units of work
    pub fn worker_count(&self, jobs: usize) -> usize {
        let wanted = if self.workers == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            self.workers
        };
        wanted.min(jobs).max(1)
    }

    /// Read the skeleton overlay directory into memory, keyed by relative path
    pub fn load_overlay(&self) -> Result<BTreeMap<String, Vec<u8>>, String> {
        let mut files = BTreeMap::new();
        if let Some(ref root) = self.skeleton_overlay {
            if !root.is_dir() {
                return Err(format!("Skeleton overlay is not a directory: {}", root.display()));
            }
            collect_files(root, root, &mut files)?;
            tracing::debug!(files = files.len(), overlay = %root.display(), "loaded skeleton overlay");
        }
        Ok(files)
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) -> Result<(), String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read directory entry: {}", e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| format!("Failed to relativize {}: {}", path.display(), e))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = fs::read(&path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            files.insert(key, bytes);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.foreign_key_suffixes, vec!["_id".to_string()]);
        assert_eq!(config.string_max_length, 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config: GeneratorConfig = serde_yaml::from_str("workers: 3\nforeign_key_suffixes: [_id, _uuid]\n").unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.foreign_key_suffixes.len(), 2);
        assert_eq!(config.decimal_scale, DEFAULT_DECIMAL_SCALE);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(serde_yaml::from_str::<GeneratorConfig>("wokers: 3\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCHEMAFORGE_WORKERS", "4"),
            ("SCHEMAFORGE_FK_SUFFIXES", "_id, _ref"),
        ]
        .into_iter()
        .collect();

        let mut config = GeneratorConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.foreign_key_suffixes, vec!["_id".to_string(), "_ref".to_string()]);
    }

    #[test]
    fn test_env_bad_workers() {
        let mut config = GeneratorConfig::default();
        let result = config.apply_env(|key| (key == "SCHEMAFORGE_WORKERS").then(|| "many".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_worker_count_bounds() {
        let config = GeneratorConfig {
            workers: 8,
            ..Default::default()
        };
        assert_eq!(config.worker_count(3), 3);
        assert_eq!(config.worker_count(0), 1);
    }

    #[test]
    fn test_load_overlay() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/app.php"), "<?php return [];").unwrap();

        let config = GeneratorConfig {
            skeleton_overlay: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let files = config.load_overlay().unwrap();
        assert_eq!(files.get("config/app.php").map(Vec::as_slice), Some(&b"<?php return [];"[..]));
    }
}
