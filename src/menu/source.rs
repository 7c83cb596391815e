use std::{
    env, fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use super::item::{EntryKind, ParsedEntry, SourceRef};

const MAX_INCLUDE_DEPTH: usize = 8;

/// Where menu entries come from.
pub trait MenuSource {
    /// Finds the file to read right now. The answer may change between calls,
    /// e.g. when the user's own menu file is created or deleted.
    fn resolve(&mut self) -> Option<PathBuf>;

    /// Reads `path` into a flat, ordered entry list.
    fn parse(&mut self, path: &Path) -> Result<Vec<ParsedEntry>>;

    /// True once any file read by the last `parse` changed on disk.
    fn needs_update(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct MenuFile {
    #[serde(default)]
    items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Node {
    App {
        name: String,
        cmd: String,
        #[serde(default)]
        icon: Option<String>,
        #[serde(default)]
        term: bool,
    },
    Menu {
        name: String,
        #[serde(default)]
        icon: Option<String>,
        #[serde(default)]
        items: Vec<Node>,
    },
    Separator,
    Title {
        name: String,
    },
    Builtin {
        name: String,
        cmd: String,
        #[serde(default)]
        icon: Option<String>,
    },
    Include {
        src: String,
    },
}

/// Menu source backed by JSON menu files with `include` support.
#[derive(Debug)]
pub struct JsonMenuSource {
    explicit: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    stamps: Vec<(PathBuf, Option<SystemTime>)>,
}

impl JsonMenuSource {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self::with_search_paths(explicit, default_menu_paths())
    }

    pub fn with_search_paths(explicit: Option<PathBuf>, search_paths: Vec<PathBuf>) -> Self {
        Self {
            explicit,
            search_paths,
            stamps: Vec::new(),
        }
    }

    fn read_file(&mut self, path: &Path) -> Result<MenuFile> {
        self.stamps.push((path.to_path_buf(), modified(path)));
        let bytes = fs::read(path).with_context(|| format!("reading menu {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parsing menu {}", path.display()))
    }

    fn flatten(&mut self, file: &Path, nodes: &[Node], cx: &mut FlattenCx) {
        for node in nodes {
            let origin = SourceRef {
                file: file.to_path_buf(),
                index: cx.next_index(file),
            };
            match node {
                Node::App {
                    name,
                    cmd,
                    icon,
                    term,
                } => cx.push(ParsedEntry {
                    kind: EntryKind::App,
                    path: cx.child_path(name),
                    command: Some(cmd.clone()),
                    icon: icon.clone(),
                    terminal: *term,
                    origin,
                }),
                Node::Menu { name, icon, items } => {
                    let path = cx.child_path(name);
                    cx.push(ParsedEntry {
                        kind: EntryKind::Submenu,
                        path: path.clone(),
                        command: None,
                        icon: icon.clone(),
                        terminal: false,
                        origin,
                    });
                    let outer = std::mem::replace(&mut cx.prefix, path);
                    self.flatten(file, items, cx);
                    cx.prefix = outer;
                }
                Node::Separator => {
                    let label = format!("#sep{}", origin.index);
                    cx.push(ParsedEntry {
                        kind: EntryKind::Separator,
                        path: cx.child_path(&label),
                        command: None,
                        icon: None,
                        terminal: false,
                        origin,
                    });
                }
                Node::Title { name } => cx.push(ParsedEntry {
                    kind: EntryKind::Title,
                    path: cx.child_path(name),
                    command: None,
                    icon: None,
                    terminal: false,
                    origin,
                }),
                Node::Builtin { name, cmd, icon } => cx.push(ParsedEntry {
                    kind: EntryKind::Builtin,
                    path: cx.child_path(name),
                    command: Some(cmd.clone()),
                    icon: icon.clone(),
                    terminal: false,
                    origin,
                }),
                Node::Include { src } => {
                    let target = resolve_include(file, src);
                    cx.push(ParsedEntry {
                        kind: EntryKind::Include,
                        path: cx.child_path(&format!("#include{}", origin.index)),
                        command: Some(target.display().to_string()),
                        icon: None,
                        terminal: false,
                        origin,
                    });
                    self.include(&target, cx);
                }
            }
        }
    }

    fn include(&mut self, target: &Path, cx: &mut FlattenCx) {
        if cx.stack.len() >= MAX_INCLUDE_DEPTH {
            warn!(file = %target.display(), "menu includes nested too deeply; skipping");
            return;
        }
        if cx.stack.iter().any(|p| p == target) {
            warn!(file = %target.display(), "menu include cycle; skipping");
            return;
        }

        match self.read_file(target) {
            Ok(menu) => {
                cx.stack.push(target.to_path_buf());
                self.flatten(target, &menu.items, cx);
                cx.stack.pop();
            }
            Err(err) => warn!("skipping menu include: {err:#}"),
        }
    }
}

impl MenuSource for JsonMenuSource {
    fn resolve(&mut self) -> Option<PathBuf> {
        if let Some(path) = self.explicit.as_ref().filter(|p| p.is_file()) {
            return Some(path.clone());
        }
        self.search_paths.iter().find(|p| p.is_file()).cloned()
    }

    fn parse(&mut self, path: &Path) -> Result<Vec<ParsedEntry>> {
        self.stamps.clear();
        let menu = self.read_file(path)?;

        let mut cx = FlattenCx {
            prefix: String::new(),
            stack: vec![path.to_path_buf()],
            counters: Vec::new(),
            out: Vec::new(),
        };
        self.flatten(path, &menu.items, &mut cx);
        debug!(file = %path.display(), entries = cx.out.len(), "parsed menu");
        Ok(cx.out)
    }

    fn needs_update(&self) -> bool {
        self.stamps
            .iter()
            .any(|(path, stamp)| modified(path) != *stamp)
    }
}

struct FlattenCx {
    prefix: String,
    stack: Vec<PathBuf>,
    counters: Vec<(PathBuf, usize)>,
    out: Vec<ParsedEntry>,
}

impl FlattenCx {
    fn child_path(&self, name: &str) -> String {
        format!("{}/{}", self.prefix, name.replace('/', "\u{2215}"))
    }

    fn next_index(&mut self, file: &Path) -> usize {
        if let Some((_, n)) = self.counters.iter_mut().find(|(p, _)| p == file) {
            *n += 1;
            return *n;
        }
        self.counters.push((file.to_path_buf(), 0));
        0
    }

    fn push(&mut self, entry: ParsedEntry) {
        self.out.push(entry);
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn resolve_include(including: &Path, src: &str) -> PathBuf {
    if let Some(rest) = src.strip_prefix("~/") {
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    let src = Path::new(src);
    if src.is_absolute() {
        return src.to_path_buf();
    }
    including
        .parent()
        .map(|dir| dir.join(src))
        .unwrap_or_else(|| src.to_path_buf())
}

/// User menu first, then the system-wide one.
pub fn default_menu_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(xdg).join("deskmenu").join("menu.json"));
    }
    if let Some(home) = env::var_os("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("deskmenu")
                .join("menu.json"),
        );
    }
    paths.push(PathBuf::from("/etc/xdg/deskmenu/menu.json"));
    paths
}
