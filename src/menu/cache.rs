use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
    time::Instant,
};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, error, info};

use super::icons::IconResolver;
use super::item::{MenuItem, SourceRef};
use super::render::{render_policy, Activation, RenderSpec, WidgetStyle};
use super::source::MenuSource;
use crate::launch::Launcher;

pub type MenuHandle = Rc<BuiltMenu>;

#[derive(Debug, Clone)]
pub struct MenuSettings {
    pub use_icons: bool,
    pub theme: String,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            use_icons: true,
            theme: "hicolor".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Empty,
    Built,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Launched,
    EditModeToggled { edit_mode: bool },
    EditEntry(SourceRef),
    Quit,
}

#[derive(Debug, Clone)]
pub struct MenuNode {
    pub spec: RenderSpec,
    pub item: usize,
}

/// One fully constructed menu: the parsed snapshot plus its rendered nodes.
///
/// Nodes only refer to items of their own snapshot, so dropping an old
/// `BuiltMenu` can never leave a node pointing at freed data.
#[derive(Debug)]
pub struct BuiltMenu {
    generation: u64,
    built_at: Instant,
    edit_mode: bool,
    source: PathBuf,
    items: Vec<MenuItem>,
    nodes: Vec<MenuNode>,
    index: HashMap<String, usize>,
}

impl BuiltMenu {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn nodes(&self) -> &[MenuNode] {
        &self.nodes
    }

    /// Finds the node for `key`, the entry's own menu path. Edit-mode
    /// separators share a label but keep distinct keys.
    pub fn lookup(&self, key: &str) -> Option<&MenuNode> {
        self.index.get(key).map(|&idx| &self.nodes[idx])
    }

    pub fn item_for(&self, node: &MenuNode) -> &MenuItem {
        &self.items[node.item]
    }
}

impl fmt::Display for BuiltMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            let path = &node.spec.display_path;
            let depth = path.matches('/').count().saturating_sub(1);
            let label = path.rsplit('/').next().unwrap_or(path);
            write!(f, "{:indent$}", "", indent = depth * 2)?;
            match node.spec.style {
                WidgetStyle::Separator => writeln!(f, "--------")?,
                WidgetStyle::Branch => writeln!(f, "{label}/")?,
                WidgetStyle::Title => writeln!(f, "[{label}]")?,
                WidgetStyle::ImageItem | WidgetStyle::Item => {
                    let has_icon = self.items[node.item]
                        .icon
                        .as_ref()
                        .is_some_and(|icon| icon.is_owned());
                    let marker = if has_icon { "* " } else { "" };
                    match &node.spec.activation {
                        Activation::Exec(cmd) => writeln!(f, "{marker}{label}  ({cmd})")?,
                        Activation::TermExec(cmd) => {
                            writeln!(f, "{marker}{label}  (terminal: {cmd})")?
                        }
                        Activation::Builtin(name) => writeln!(f, "{marker}{label}  <{name}>")?,
                        Activation::Edit(_) if node.spec.key != *path => {
                            writeln!(f, "{label}  [{}]", node.spec.key)?
                        }
                        Activation::Edit(_) | Activation::None => writeln!(f, "{label}")?,
                    }
                }
            }
        }
        Ok(())
    }
}

/// True when the cached menu has to be rebuilt before it is shown.
pub fn is_stale(
    built_at: Option<Instant>,
    source_changed: bool,
    external_change_at: Option<Instant>,
) -> bool {
    let Some(built_at) = built_at else {
        return true;
    };
    source_changed || external_change_at.is_some_and(|changed| changed > built_at)
}

/// Owns the current desktop menu and decides when it is out of date.
///
/// Staleness is polled: nothing is pushed, every `request_menu` compares the
/// source and theme signals against the last build.
pub struct MenuCache {
    source: Box<dyn MenuSource>,
    icons: Box<dyn IconResolver>,
    settings: MenuSettings,
    source_path: Option<PathBuf>,
    last_theme_change: Option<Instant>,
    cached: Option<MenuHandle>,
    edit_mode: bool,
    forced: bool,
    generation: u64,
}

impl MenuCache {
    pub fn new(
        source: Box<dyn MenuSource>,
        icons: Box<dyn IconResolver>,
        settings: MenuSettings,
    ) -> Self {
        Self {
            source,
            icons,
            settings,
            source_path: None,
            last_theme_change: None,
            cached: None,
            edit_mode: false,
            forced: false,
            generation: 0,
        }
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn theme(&self) -> &str {
        &self.settings.theme
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn cached(&self) -> Option<MenuHandle> {
        self.cached.clone()
    }

    pub fn status(&self) -> CacheStatus {
        match &self.cached {
            None => CacheStatus::Empty,
            Some(menu) => {
                let source_changed = self.forced || self.source.needs_update();
                if is_stale(Some(menu.built_at), source_changed, self.last_theme_change) {
                    CacheStatus::Stale
                } else {
                    CacheStatus::Built
                }
            }
        }
    }

    /// Records an icon theme change; the next request rebuilds.
    pub fn theme_changed(&mut self, theme: &str, now: Instant) {
        debug!(theme, "icon theme changed");
        self.settings.theme = theme.to_string();
        self.last_theme_change = Some(now);
    }

    /// Marks the menu stale without discarding it.
    pub fn force_reload(&mut self) {
        self.forced = true;
    }

    pub fn request_menu(&mut self) -> Option<MenuHandle> {
        self.request_menu_at(Instant::now())
    }

    /// Returns the current menu, rebuilding first if it is stale.
    ///
    /// A failed rebuild is logged and the previous menu (if any) is kept.
    pub fn request_menu_at(&mut self, now: Instant) -> Option<MenuHandle> {
        if self.status() != CacheStatus::Built {
            if let Err(err) = self.rebuild(now) {
                error!("menu rebuild failed: {err:#}");
            }
        }
        self.cached.clone()
    }

    /// Unconditionally re-reads the source and swaps in a new menu.
    pub fn rebuild(&mut self, now: Instant) -> Result<MenuHandle> {
        self.forced = false;

        let path = self
            .source
            .resolve()
            .ok_or_else(|| anyhow!("no menu source file found"))?;
        self.source_path = Some(path.clone());

        let entries = self
            .source
            .parse(&path)
            .with_context(|| format!("reading menu source {}", path.display()))?;
        if entries.is_empty() {
            bail!("menu source {} yielded no entries", path.display());
        }

        let mut items = Vec::with_capacity(entries.len());
        let mut nodes = Vec::with_capacity(entries.len());
        let mut index = HashMap::new();
        for entry in entries {
            let Some(mut item) = MenuItem::from_entry(entry) else {
                debug!("dropping incomplete menu entry");
                continue;
            };
            let Some(spec) = render_policy(&item, self.edit_mode, self.settings.use_icons) else {
                items.push(item);
                continue;
            };

            if let Some(name) = spec.icon_ref.as_deref() {
                item.icon = self.icons.resolve(&self.settings.theme, name);
            }

            index.entry(spec.key.clone()).or_insert(nodes.len());
            nodes.push(MenuNode {
                spec,
                item: items.len(),
            });
            items.push(item);
        }

        self.generation += 1;
        let menu = Rc::new(BuiltMenu {
            generation: self.generation,
            built_at: now,
            edit_mode: self.edit_mode,
            source: path,
            items,
            nodes,
            index,
        });
        // The previous menu is released only here, after the new one is complete.
        self.cached = Some(Rc::clone(&menu));

        info!(
            generation = menu.generation,
            entries = menu.nodes.len(),
            edit_mode = menu.edit_mode,
            source = %menu.source.display(),
            "menu rebuilt"
        );
        Ok(menu)
    }

    /// Switches edit mode, throwing the current menu away and rebuilding.
    pub fn set_edit_mode(&mut self, edit_mode: bool, now: Instant) -> Option<MenuHandle> {
        self.edit_mode = edit_mode;
        self.cached = None;
        if let Err(err) = self.rebuild(now) {
            error!("menu rebuild failed: {err:#}");
        }
        self.cached.clone()
    }

    pub fn toggle_edit_mode(&mut self, now: Instant) -> Option<MenuHandle> {
        self.set_edit_mode(!self.edit_mode, now)
    }

    /// Runs whatever is attached to the entry with menu path `key`.
    pub fn activate(&mut self, key: &str, launcher: &dyn Launcher) -> Result<Outcome> {
        let Some(menu) = self.cached.clone() else {
            return Ok(Outcome::Ignored);
        };
        let Some(node) = menu.lookup(key) else {
            debug!(key, "no menu entry at path");
            return Ok(Outcome::Ignored);
        };

        let outcome = match &node.spec.activation {
            Activation::None => Outcome::Ignored,
            Activation::Exec(cmd) => {
                launcher
                    .launch(cmd, false)
                    .with_context(|| format!("launch '{cmd}'"))?;
                Outcome::Launched
            }
            Activation::TermExec(cmd) => {
                launcher
                    .launch(cmd, true)
                    .with_context(|| format!("launch '{cmd}' in terminal"))?;
                Outcome::Launched
            }
            Activation::Builtin(name) => self.dispatch_builtin(name),
            Activation::Edit(origin) => {
                let origin = origin.clone();
                self.set_edit_mode(false, Instant::now());
                Outcome::EditEntry(origin)
            }
        };
        Ok(outcome)
    }

    fn dispatch_builtin(&mut self, name: &str) -> Outcome {
        debug!(builtin = name, "dispatching builtin");
        match name {
            "edit" => {
                self.toggle_edit_mode(Instant::now());
                Outcome::EditModeToggled {
                    edit_mode: self.edit_mode,
                }
            }
            "quit" => Outcome::Quit,
            _ => Outcome::Ignored,
        }
    }
}
