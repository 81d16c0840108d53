use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    #[serde(alias = "dataset")]
    pub data: Option<String>,
    pub base: Option<String>,
    pub delimiter: Option<String>,
    pub timeout: Option<u64>,
    pub page_size: Option<usize>,
    pub hidden_sections: Option<Vec<String>>,
    pub search_commentary: Option<bool>,
    pub debounce_ms: Option<u64>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
    pub offline: Option<bool>,
    pub cache_dir: Option<String>,
    pub cache_version: Option<String>,
    pub cache_assets: Option<Vec<String>>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

fn app_dir() -> Option<PathBuf> {
    Some(home_dir()?.join(".kuralview"))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(app_dir()?.join("config.yml"))
}

pub fn default_cache_dir() -> PathBuf {
    app_dir()
        .map(|dir| dir.join("cache"))
        .unwrap_or_else(|| PathBuf::from(".kuralview-cache"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn expand_tilde_string(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<ConfigFile>(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# kuralview config
#
# Location (default):
#   ~/.kuralview/config.yml

# Dataset: a file name resolved against `base`, a path, or a URL
data: thirukkural.csv
# base: https://example.com/thirukkural/
# delimiter: ","
timeout: 10

# View
page_size: 20
# hidden_sections: [mk, mv]
search_commentary: true
debounce_ms: 200

# Output (optional)
# output: ./kurals.json
# output_format: json
no_color: false

# Offline cache
offline: false
# cache_dir: ~/.kuralview/cache
cache_version: kuralview-v1
cache_assets:
  - thirukkural.csv
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
