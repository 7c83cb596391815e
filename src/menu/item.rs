use std::path::PathBuf;

/// Opaque pointer back into the menu source, handed to the editor when an
/// entry is picked in edit mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub file: PathBuf,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    App,
    Separator,
    Submenu,
    Title,
    Builtin,
    Include,
}

/// One entry as reported by a menu source, before it is typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub kind: EntryKind,
    pub path: String,
    pub command: Option<String>,
    pub icon: Option<String>,
    pub terminal: bool,
    pub origin: SourceRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    App {
        command: String,
        icon: Option<String>,
        terminal: bool,
    },
    Separator,
    Submenu {
        icon: Option<String>,
    },
    Title,
    Builtin {
        action: String,
        icon: Option<String>,
    },
    Include {
        source: String,
    },
}

/// Rendered icon owned by a single menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub name: String,
    pub file: PathBuf,
}

/// Shared placeholder icon. Items only ever borrow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackIcon;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconHandle {
    Owned(Icon),
    Borrowed(FallbackIcon),
}

impl IconHandle {
    pub fn is_owned(&self) -> bool {
        matches!(self, IconHandle::Owned(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub path: String,
    pub kind: ItemKind,
    pub origin: SourceRef,
    pub icon: Option<IconHandle>,
}

impl MenuItem {
    /// Types a parsed entry. Entries missing a field their kind requires are
    /// dropped (`None`) rather than failing the whole menu.
    pub fn from_entry(entry: ParsedEntry) -> Option<Self> {
        let ParsedEntry {
            kind,
            path,
            command,
            icon,
            terminal,
            origin,
        } = entry;

        let kind = match kind {
            EntryKind::App => ItemKind::App {
                command: command?,
                icon,
                terminal,
            },
            EntryKind::Separator => ItemKind::Separator,
            EntryKind::Submenu => ItemKind::Submenu { icon },
            EntryKind::Title => ItemKind::Title,
            EntryKind::Builtin => ItemKind::Builtin {
                action: command?,
                icon,
            },
            EntryKind::Include => ItemKind::Include { source: command? },
        };

        Some(Self {
            path,
            kind,
            origin,
            icon: None,
        })
    }

    pub fn label(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn icon_name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::App { icon, .. }
            | ItemKind::Submenu { icon }
            | ItemKind::Builtin { icon, .. } => icon.as_deref(),
            ItemKind::Separator | ItemKind::Title | ItemKind::Include { .. } => None,
        }
    }
}

/// Directory part of a menu path; `/` for top-level entries.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}
