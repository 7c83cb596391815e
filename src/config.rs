use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::menu::{icons, MenuSettings};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Menu file to use instead of the standard search locations.
    pub menu_file: Option<PathBuf>,

    pub use_menu_icons: bool,

    pub icon_theme: String,

    /// Roots searched for icon themes. Empty means the usual XDG locations.
    pub icon_dirs: Vec<PathBuf>,

    /// Terminal emulator used for entries that ask for one; run as `<terminal> -e <cmd>`.
    pub terminal: String,

    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            menu_file: None,
            use_menu_icons: true,
            icon_theme: "hicolor".to_string(),
            icon_dirs: Vec::new(),
            terminal: "xterm".to_string(),
            poll_interval_secs: 10,
        }
    }
}

impl Config {
    pub fn menu_settings(&self) -> MenuSettings {
        MenuSettings {
            use_icons: self.use_menu_icons,
            theme: self.icon_theme.clone(),
        }
    }

    pub fn icon_dirs(&self) -> Vec<PathBuf> {
        if self.icon_dirs.is_empty() {
            icons::default_icon_dirs()
        } else {
            self.icon_dirs.clone()
        }
    }

    /// Never zero, so the daemon loop cannot spin.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

pub fn load_optional() -> Result<Option<Config>> {
    let Some(path) = resolve_config_path() else {
        return Ok(None);
    };
    load_from(&path)
}

/// Falls back to defaults when no config file exists.
pub fn load_or_default() -> Result<Config> {
    Ok(load_optional()?.unwrap_or_default())
}

pub fn load_from(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg: Config =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("DESKMENU_CONFIG") {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }

    let local = PathBuf::from("deskmenu.json");
    if local.exists() {
        return Some(local);
    }

    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join("deskmenu").join("config.json"));
    }

    if let Some(home) = env::var_os("HOME") {
        return Some(PathBuf::from(home).join(".config").join("deskmenu").join("config.json"));
    }

    None
}
