use anyhow::Result;
use clap::ValueEnum;
use tracing::debug;

/// Longest window title shown before it gets cut.
pub const MAX_LABEL_CHARS: usize = 20;

pub type WindowId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub index: usize,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub name: String,
    /// `None` for windows pinned to every workspace.
    pub workspace: Option<usize>,
    pub minimized: bool,
    pub sticky: bool,
    pub skip_list: bool,
}

/// What the window manager reports right now. Windows are bottom to top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WmState {
    pub workspaces: Vec<Workspace>,
    pub active: Option<usize>,
    pub stacked: Vec<WindowInfo>,
}

pub trait WindowManager {
    fn wm_state(&self) -> Result<WmState>;
    fn activate_window(&self, id: WindowId) -> Result<()>;
    fn activate_workspace(&self, index: usize) -> Result<()>;
    /// Asks the window manager for `count` workspaces. Not validated here.
    fn set_workspace_count(&self, count: u32) -> Result<()>;
}

/// Wheel direction over the desktop. Up and left go back a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowListEntry {
    WorkspaceHeader {
        markup: String,
        index: usize,
        active: bool,
    },
    Separator,
    Window {
        label: String,
        id: WindowId,
        dimmed: bool,
    },
    AddWorkspace {
        count: u32,
    },
    DeleteWorkspace {
        count: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowListAction {
    ActivateWorkspace(usize),
    ActivateWindow(WindowId),
    SetWorkspaceCount(u32),
}

impl WindowListEntry {
    pub fn action(&self) -> Option<WindowListAction> {
        match self {
            WindowListEntry::WorkspaceHeader { active: true, .. } => None,
            WindowListEntry::WorkspaceHeader { index, .. } => {
                Some(WindowListAction::ActivateWorkspace(*index))
            }
            WindowListEntry::Separator => None,
            WindowListEntry::Window { id, .. } => Some(WindowListAction::ActivateWindow(*id)),
            WindowListEntry::AddWorkspace { count } | WindowListEntry::DeleteWorkspace { count } => {
                Some(WindowListAction::SetWorkspaceCount(*count))
            }
        }
    }

    pub fn plain_label(&self) -> String {
        match self {
            WindowListEntry::WorkspaceHeader { markup, .. } => markup.clone(),
            WindowListEntry::Separator => "--------".to_string(),
            WindowListEntry::Window { label, dimmed, .. } => {
                if *dimmed {
                    format!("  {label}")
                } else {
                    format!("> {label}")
                }
            }
            WindowListEntry::AddWorkspace { .. } => "Add workspace".to_string(),
            WindowListEntry::DeleteWorkspace { .. } => "Delete workspace".to_string(),
        }
    }
}

/// Builds a fresh window list. Never cached: the result describes the
/// window manager at this instant only.
pub fn assemble(state: &WmState) -> Vec<WindowListEntry> {
    let mut workspaces = state.workspaces.iter().collect::<Vec<_>>();
    workspaces.sort_by_key(|ws| ws.index);

    let mut entries = Vec::new();
    for ws in &workspaces {
        let active = state.active == Some(ws.index);
        entries.push(WindowListEntry::WorkspaceHeader {
            markup: workspace_markup(ws),
            index: ws.index,
            active,
        });
        entries.push(WindowListEntry::Separator);

        for win in &state.stacked {
            // Sticky windows have no workspace of their own; list them once, under the active one.
            let on_this = win.workspace == Some(ws.index) || (active && win.sticky);
            if !on_this || win.skip_list {
                continue;
            }
            entries.push(WindowListEntry::Window {
                label: window_label(win),
                id: win.id,
                dimmed: !active,
            });
        }
        entries.push(WindowListEntry::Separator);
    }

    let count = u32::try_from(workspaces.len()).unwrap_or(u32::MAX);
    entries.push(WindowListEntry::AddWorkspace {
        count: count.saturating_add(1),
    });
    entries.push(WindowListEntry::DeleteWorkspace {
        count: count.saturating_sub(1),
    });
    entries
}

pub fn perform<W>(wm: &W, action: WindowListAction) -> Result<()>
where
    W: WindowManager + ?Sized,
{
    match action {
        WindowListAction::ActivateWorkspace(index) => wm.activate_workspace(index),
        WindowListAction::ActivateWindow(id) => wm.activate_window(id),
        WindowListAction::SetWorkspaceCount(count) => wm.set_workspace_count(count),
    }
}

/// Reads every window in `ids`, dropping the ones that fail. A client can
/// vanish between listing and reading its properties.
pub fn readable_windows<I, F>(ids: I, mut read: F) -> Vec<WindowInfo>
where
    I: IntoIterator<Item = WindowId>,
    F: FnMut(WindowId) -> Result<WindowInfo>,
{
    ids.into_iter()
        .filter_map(|id| match read(id) {
            Ok(info) => Some(info),
            Err(err) => {
                debug!(window = id, "skipping unreadable window: {err:#}");
                None
            }
        })
        .collect()
}

/// Workspace a wheel step lands on, wrapping at both ends. `None` when
/// there is nowhere to go.
pub fn scroll_target(state: &WmState, direction: ScrollDirection) -> Option<usize> {
    let count = state.workspaces.len();
    let active = state.active?;
    if count <= 1 || active >= count {
        return None;
    }
    let target = match direction {
        ScrollDirection::Up | ScrollDirection::Left => (active + count - 1) % count,
        ScrollDirection::Down | ScrollDirection::Right => (active + 1) % count,
    };
    Some(target)
}

/// Switches workspace for one wheel step. Returns the workspace asked for.
pub fn scroll<W>(wm: &W, direction: ScrollDirection) -> Result<Option<usize>>
where
    W: WindowManager + ?Sized,
{
    let state = wm.wm_state()?;
    let Some(target) = scroll_target(&state, direction) else {
        debug!(?direction, "no workspace to scroll to");
        return Ok(None);
    };
    perform(wm, WindowListAction::ActivateWorkspace(target))?;
    Ok(Some(target))
}

pub fn window_label(win: &WindowInfo) -> String {
    let mut label = if win.name.chars().count() > MAX_LABEL_CHARS {
        let mut cut = win.name.chars().take(MAX_LABEL_CHARS).collect::<String>();
        cut.push_str(" ...");
        cut
    } else {
        win.name.clone()
    };
    if win.minimized {
        label = format!("[{label}]");
    }
    label
}

fn workspace_markup(ws: &Workspace) -> String {
    match ws.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => format!("<i>{}</i>", escape_markup(name)),
        None => format!("<i>{}</i>", ws.index + 1),
    }
}

pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
