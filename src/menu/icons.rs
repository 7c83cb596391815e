use std::{
    env,
    path::{Path, PathBuf},
};

use super::item::{FallbackIcon, Icon, IconHandle};

const SIZES: &[&str] = &["48x48", "32x32", "24x24", "22x22", "16x16", "scalable"];
const CATEGORIES: &[&str] = &[
    "apps",
    "actions",
    "places",
    "categories",
    "devices",
    "status",
    "mimetypes",
];
const EXTENSIONS: &[&str] = &["png", "svg", "xpm"];

/// Turns an icon name into something that can be drawn next to a menu item.
pub trait IconResolver {
    /// `None` means no icon at all; a miss that should still show the shared
    /// placeholder returns `IconHandle::Borrowed`.
    fn resolve(&self, theme: &str, name: &str) -> Option<IconHandle>;
}

/// Looks icons up in freedesktop-style theme directories.
#[derive(Debug, Clone)]
pub struct ThemeIconResolver {
    dirs: Vec<PathBuf>,
}

impl ThemeIconResolver {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    fn find(&self, theme: &str, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.is_absolute() {
            return direct.is_file().then(|| direct.to_path_buf());
        }

        for theme in [theme, "hicolor"] {
            for dir in &self.dirs {
                let root = dir.join(theme);
                if !root.is_dir() {
                    continue;
                }
                for size in SIZES {
                    for category in CATEGORIES {
                        if let Some(found) = with_extension(&root.join(size).join(category), name) {
                            return Some(found);
                        }
                    }
                }
            }
        }

        self.dirs.iter().find_map(|dir| with_extension(dir, name))
    }
}

impl Default for ThemeIconResolver {
    fn default() -> Self {
        Self::new(default_icon_dirs())
    }
}

impl IconResolver for ThemeIconResolver {
    fn resolve(&self, theme: &str, name: &str) -> Option<IconHandle> {
        if name.trim().is_empty() {
            return None;
        }
        Some(match self.find(theme, name) {
            Some(file) => IconHandle::Owned(Icon {
                name: name.to_string(),
                file,
            }),
            None => IconHandle::Borrowed(FallbackIcon),
        })
    }
}

fn with_extension(dir: &Path, name: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|p| p.is_file())
}

pub fn default_icon_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = env::var_os("HOME") {
        dirs.push(PathBuf::from(&home).join(".icons"));
        if env::var_os("XDG_DATA_HOME").is_none() {
            dirs.push(PathBuf::from(&home).join(".local/share/icons"));
        }
    }
    if let Some(data) = env::var_os("XDG_DATA_HOME") {
        dirs.push(PathBuf::from(data).join("icons"));
    }
    dirs.push(PathBuf::from("/usr/share/icons"));
    dirs.push(PathBuf::from("/usr/share/pixmaps"));
    dirs
}
