use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use serde::{Deserialize, Deserializer};

use crate::debug::context::{DEFAULT_COLS, DEFAULT_ROWS};
use crate::debug::DEFAULT_CHILD_BUDGET;
use crate::snapshot::Filters;

const APP_DIR: &str = "varscope";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub filters: Filters,
    pub preview: PreviewLimits,
    pub timeouts: Timeouts,
    pub debug: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreviewLimits {
    pub rows: usize,
    pub cols: usize,
    pub child_budget: usize,
}

impl Default for PreviewLimits {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            child_budget: DEFAULT_CHILD_BUDGET,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(deserialize_with = "duration")]
    pub handshake: Duration,
    #[serde(deserialize_with = "duration")]
    pub drain: Duration,
    #[serde(deserialize_with = "duration")]
    pub poll: Duration,
    #[serde(deserialize_with = "duration")]
    pub shell: Duration,
    #[serde(deserialize_with = "duration")]
    pub socket: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(5),
            drain: Duration::from_secs(5),
            poll: Duration::from_millis(500),
            shell: Duration::from_secs(5),
            socket: Duration::from_secs(2),
        }
    }
}

fn duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file: {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let config = match ext.as_str() {
            "toml" => toml::from_str(&text)
                .with_context(|| format!("invalid TOML config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .with_context(|| format!("invalid YAML config: {}", path.display()))?,
            "json" => serde_json::from_str(&text)
                .with_context(|| format!("invalid JSON config: {}", path.display()))?,
            other => return Err(anyhow!("unsupported config format '{other}': {}", path.display())),
        };
        Ok(config)
    }

    /// Loads `explicit` when given, else the per-user default file when it
    /// exists, else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, body: &str) -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
        file.write_all(body.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn toml_config_overrides_defaults() -> Result<()> {
        let file = write_temp(
            ".toml",
            r#"
debug = true

[filters]
hide_names = ["tmp*"]
max_repr = 80

[preview]
rows = 10

[timeouts]
shell = "750ms"
drain = "2s"
"#,
        )?;
        let config = BridgeConfig::load(file.path())?;
        assert!(config.debug);
        assert_eq!(config.filters.hide_names, Some(vec!["tmp*".to_string()]));
        assert_eq!(config.filters.hide_types, None);
        assert_eq!(config.filters.max_repr, 80);
        assert_eq!(config.preview.rows, 10);
        assert_eq!(config.preview.cols, DEFAULT_COLS);
        assert_eq!(config.timeouts.shell, Duration::from_millis(750));
        assert_eq!(config.timeouts.drain, Duration::from_secs(2));
        assert_eq!(config.timeouts.poll, Duration::from_millis(500));
        Ok(())
    }

    #[test]
    fn yaml_and_json_are_accepted() -> Result<()> {
        let yaml = write_temp(".yaml", "preview:\n  child_budget: 5\n")?;
        assert_eq!(BridgeConfig::load(yaml.path())?.preview.child_budget, 5);
        let json = write_temp(".json", r#"{"filters": {"hide_types": ["int"]}}"#)?;
        assert_eq!(
            BridgeConfig::load(json.path())?.filters.hide_types,
            Some(vec!["int".to_string()])
        );
        Ok(())
    }

    #[test]
    fn bad_durations_and_formats_are_rejected() -> Result<()> {
        let file = write_temp(".toml", "[timeouts]\nshell = \"soon\"\n")?;
        assert!(BridgeConfig::load(file.path()).is_err());
        let file = write_temp(".ini", "debug = true\n")?;
        let err = BridgeConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
        Ok(())
    }
}
