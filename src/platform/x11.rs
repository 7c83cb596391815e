use anyhow::{anyhow, Context, Result};
use tracing::{debug, trace};
use x11rb::{
    connection::Connection,
    protocol::{
        xproto::{
            self, AtomEnum, ClientMessageEvent, ConnectionExt as _, CreateWindowAux, EventMask,
            GrabMode, WindowClass,
        },
        Event,
    },
    rust_connection::RustConnection,
    COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME, NONE,
};

use super::Backend;
use crate::control::Payload;
use crate::grab::{GrabStatus, InputGrab};
use crate::session::{self, SessionBus};
use crate::windowlist::{self, WindowId, WindowInfo, WindowManager, WmState, Workspace};

/// `_NET_WM_DESKTOP` value for windows on every workspace.
const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// Upper bound on property reads, in 32-bit units.
const PROPERTY_LEN: u32 = 4096;

/// Source indication for `_NET_ACTIVE_WINDOW`: a pager or similar tool.
const SOURCE_PAGER: u32 = 2;

x11rb::atom_manager! {
    Atoms: AtomsCookie {
        UTF8_STRING,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_DESKTOP_NAMES,
        _NET_CURRENT_DESKTOP,
        _NET_CLIENT_LIST_STACKING,
        _NET_ACTIVE_WINDOW,
        _NET_WM_NAME,
        _NET_WM_DESKTOP,
        _NET_WM_STATE,
        _NET_WM_STATE_HIDDEN,
        _NET_WM_STATE_STICKY,
        _NET_WM_STATE_SKIP_TASKBAR,
    }
}

pub struct X11Backend {
    conn: RustConnection,
    screen: usize,
    root: xproto::Window,
    atoms: Atoms,
}

impl X11Backend {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("connect to X display")?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|s| s.root)
            .ok_or_else(|| anyhow!("X server has no screen {screen_num}"))?;
        let screen = session::current_screen();
        let atoms = Atoms::new(&conn)
            .context("intern atoms")?
            .reply()
            .context("intern atoms")?;
        debug!(screen, root, "connected to X display");
        Ok(Self {
            conn,
            screen,
            root,
            atoms,
        })
    }

    fn intern(&self, name: &str) -> Result<xproto::Atom> {
        let atom = self
            .conn
            .intern_atom(false, name.as_bytes())?
            .reply()
            .with_context(|| format!("intern atom {name}"))?
            .atom;
        Ok(atom)
    }

    /// A 1x1 input-only window that is never mapped.
    fn hidden_window(&self) -> Result<xproto::Window> {
        let win = self.conn.generate_id()?;
        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            win,
            self.root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            COPY_FROM_PARENT,
            &CreateWindowAux::new(),
        )?;
        Ok(win)
    }

    fn cardinals(
        &self,
        window: xproto::Window,
        property: xproto::Atom,
        kind: impl Into<xproto::Atom>,
    ) -> Result<Vec<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, kind, 0, PROPERTY_LEN)?
            .reply()?;
        Ok(reply.value32().map(|v| v.collect()).unwrap_or_default())
    }

    fn cardinal(&self, window: xproto::Window, property: xproto::Atom) -> Result<Option<u32>> {
        Ok(self
            .cardinals(window, property, AtomEnum::CARDINAL)?
            .first()
            .copied())
    }

    fn text(
        &self,
        window: xproto::Window,
        property: impl Into<xproto::Atom>,
        kind: impl Into<xproto::Atom>,
    ) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window, property, kind, 0, PROPERTY_LEN)?
            .reply()?;
        if reply.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }

    fn window_name(&self, window: xproto::Window) -> Result<String> {
        if let Some(name) = self.text(window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING)? {
            return Ok(name);
        }
        Ok(self
            .text(window, AtomEnum::WM_NAME, AtomEnum::STRING)?
            .unwrap_or_default())
    }

    fn window_info(&self, window: xproto::Window) -> Result<WindowInfo> {
        let desktop = self.cardinal(window, self.atoms._NET_WM_DESKTOP)?;
        let state = self.cardinals(window, self.atoms._NET_WM_STATE, AtomEnum::ATOM)?;
        let sticky =
            desktop == Some(ALL_DESKTOPS) || state.contains(&self.atoms._NET_WM_STATE_STICKY);
        Ok(WindowInfo {
            id: window,
            name: self.window_name(window)?,
            workspace: if sticky {
                None
            } else {
                desktop.map(|d| d as usize)
            },
            minimized: state.contains(&self.atoms._NET_WM_STATE_HIDDEN),
            sticky,
            skip_list: state.contains(&self.atoms._NET_WM_STATE_SKIP_TASKBAR),
        })
    }

    /// EWMH request to the window manager, which listens on the root window.
    fn root_message(&self, window: xproto::Window, kind: xproto::Atom, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, kind, data);
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        self.conn.flush()?;
        Ok(())
    }
}

impl WindowManager for X11Backend {
    fn wm_state(&self) -> Result<WmState> {
        let count = self
            .cardinal(self.root, self.atoms._NET_NUMBER_OF_DESKTOPS)?
            .unwrap_or(1) as usize;
        let names = self
            .text(self.root, self.atoms._NET_DESKTOP_NAMES, self.atoms.UTF8_STRING)?
            .unwrap_or_default();
        let mut names = names.split('\0');
        let workspaces = (0..count)
            .map(|index| Workspace {
                index,
                name: names.next().filter(|n| !n.is_empty()).map(str::to_string),
            })
            .collect();

        let active = self
            .cardinal(self.root, self.atoms._NET_CURRENT_DESKTOP)?
            .map(|d| d as usize);

        let clients = self
            .cardinals(self.root, self.atoms._NET_CLIENT_LIST_STACKING, AtomEnum::WINDOW)
            .context("read client list")?;
        let stacked = windowlist::readable_windows(clients, |win| self.window_info(win));

        Ok(WmState {
            workspaces,
            active,
            stacked,
        })
    }

    fn activate_window(&self, id: WindowId) -> Result<()> {
        self.root_message(
            id,
            self.atoms._NET_ACTIVE_WINDOW,
            [SOURCE_PAGER, CURRENT_TIME, 0, 0, 0],
        )
    }

    fn activate_workspace(&self, index: usize) -> Result<()> {
        let index = u32::try_from(index).context("workspace index out of range")?;
        self.root_message(
            self.root,
            self.atoms._NET_CURRENT_DESKTOP,
            [index, CURRENT_TIME, 0, 0, 0],
        )
    }

    fn set_workspace_count(&self, count: u32) -> Result<()> {
        self.root_message(
            self.root,
            self.atoms._NET_NUMBER_OF_DESKTOPS,
            [count, 0, 0, 0, 0],
        )
    }
}

impl InputGrab for X11Backend {
    fn grab_pointer(&self, window: WindowId, time: u32) -> Result<GrabStatus> {
        let reply = self
            .conn
            .grab_pointer(
                true,
                window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                time,
            )?
            .reply()?;
        Ok(grab_status(reply.status))
    }

    fn grab_keyboard(&self, window: WindowId, time: u32) -> Result<GrabStatus> {
        let reply = self
            .conn
            .grab_keyboard(true, window, time, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(grab_status(reply.status))
    }

    fn ungrab_pointer(&self, time: u32) -> Result<()> {
        self.conn.ungrab_pointer(time)?;
        self.conn.flush()?;
        Ok(())
    }

    fn ungrab_keyboard(&self, time: u32) -> Result<()> {
        self.conn.ungrab_keyboard(time)?;
        self.conn.flush()?;
        Ok(())
    }
}

fn grab_status(status: xproto::GrabStatus) -> GrabStatus {
    match status {
        xproto::GrabStatus::SUCCESS => GrabStatus::Success,
        xproto::GrabStatus::ALREADY_GRABBED => GrabStatus::AlreadyGrabbed,
        xproto::GrabStatus::INVALID_TIME => GrabStatus::InvalidTime,
        xproto::GrabStatus::NOT_VIEWABLE => GrabStatus::NotViewable,
        xproto::GrabStatus::FROZEN => GrabStatus::Frozen,
        _ => GrabStatus::Failed,
    }
}

impl SessionBus for X11Backend {
    fn selection_owner(&self, name: &str) -> Result<Option<WindowId>> {
        let selection = self.intern(name)?;
        let owner = self.conn.get_selection_owner(selection)?.reply()?.owner;
        Ok((owner != NONE).then_some(owner))
    }

    fn claim_selection(&self, name: &str) -> Result<WindowId> {
        let selection = self.intern(name)?;
        let win = self.hidden_window()?;
        self.conn.set_selection_owner(win, selection, CURRENT_TIME)?;
        let owner = self.conn.get_selection_owner(selection)?.reply()?.owner;
        if owner != win {
            return Err(anyhow!("another client took {name} first"));
        }
        debug!(selection = name, window = win, "claimed selection");
        Ok(win)
    }

    fn send_client_message(&self, target: WindowId, payload: Payload) -> Result<()> {
        // The message names a window of our own as its origin.
        let origin = self.hidden_window()?;
        let event = ClientMessageEvent::new(8, origin, AtomEnum::STRING, payload);
        self.conn.send_event(false, target, EventMask::NO_EVENT, event)?;
        self.conn.destroy_window(origin)?;
        self.conn.flush()?;
        Ok(())
    }
}

impl Backend for X11Backend {
    fn screen(&self) -> usize {
        self.screen
    }

    fn root_window(&self) -> WindowId {
        self.root
    }

    fn poll_control_message(&self) -> Result<Option<Payload>> {
        while let Some(event) = self.conn.poll_for_event()? {
            match event {
                Event::ClientMessage(msg)
                    if msg.format == 8 && msg.type_ == u32::from(AtomEnum::STRING) =>
                {
                    return Ok(Some(msg.data.as_data8()));
                }
                other => trace!(?other, "ignoring X event"),
            }
        }
        Ok(None)
    }
}
