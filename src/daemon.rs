use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::config::{self, Config};
use crate::control::{self, ControlCommand};
use crate::grab;
use crate::menu::{JsonMenuSource, MenuCache, ThemeIconResolver};
use crate::platform::Backend;
use crate::session;
use crate::windowlist::{self, WindowId};

/// How often the selection window is checked for control messages.
const CONTROL_POLL: Duration = Duration::from_millis(50);

/// Grab timestamp meaning "now" to the display server.
const CURRENT_TIME: u32 = 0;

/// Long-running instance that owns the desktop selection for one screen.
pub struct Daemon {
    backend: Box<dyn Backend>,
    cache: MenuCache,
    config: Config,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DaemonUpdate {
    pub quit: bool,
    /// Text of the popup that would be shown, if any.
    pub popup: Option<String>,
}

impl Daemon {
    pub fn new(backend: Box<dyn Backend>, config: Config) -> Self {
        let cache = menu_cache(&config);
        Self::with_cache(backend, cache, config)
    }

    pub fn with_cache(backend: Box<dyn Backend>, cache: MenuCache, config: Config) -> Self {
        Self {
            backend,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &MenuCache {
        &self.cache
    }

    /// Takes the desktop selection unless another instance already holds it.
    pub fn claim(&self) -> Result<WindowId> {
        let screen = self.backend.screen();
        if let Some(owner) = session::is_already_running(&*self.backend, screen)? {
            bail!("deskmenu is already running on screen {screen} (window {owner:#x})");
        }
        self.backend
            .claim_selection(&session::selection_name(screen))
            .context("claim desktop selection")
    }

    /// Periodic housekeeping: pick up config edits and keep the menu warm.
    pub fn tick(&mut self, config: Config) {
        self.apply_config(config);
        if self.cache.request_menu().is_none() {
            debug!("no desktop menu available yet");
        }
    }

    fn apply_config(&mut self, config: Config) {
        if config == self.config {
            return;
        }

        let source_changed = config.menu_file != self.config.menu_file
            || config.icon_dirs != self.config.icon_dirs
            || config.use_menu_icons != self.config.use_menu_icons;
        let mut config = config;
        if source_changed {
            let mut fresh = menu_cache(&config);
            if fresh.request_menu().is_some() {
                info!("menu settings changed, switched to a fresh menu cache");
                self.cache = fresh;
                self.config = config;
                return;
            }
            warn!("new menu settings give no menu, keeping the current one");
            // Keep the old source settings so the switch is retried next tick.
            config.menu_file = self.config.menu_file.clone();
            config.icon_dirs = self.config.icon_dirs.clone();
            config.use_menu_icons = self.config.use_menu_icons;
        }
        if config.icon_theme != self.config.icon_theme {
            self.cache.theme_changed(&config.icon_theme, Instant::now());
        }
        self.config = config;
    }

    pub fn handle(&mut self, cmd: ControlCommand) -> DaemonUpdate {
        debug!(command = cmd.as_str(), "control message");
        match cmd {
            ControlCommand::Reload => {
                self.cache.force_reload();
                self.cache.request_menu();
                DaemonUpdate::default()
            }
            ControlCommand::Quit => DaemonUpdate {
                quit: true,
                ..Default::default()
            },
            ControlCommand::Menu => DaemonUpdate {
                popup: self.popup_menu(),
                ..Default::default()
            },
            ControlCommand::Windowlist => DaemonUpdate {
                popup: self
                    .popup_window_list()
                    .unwrap_or_else(|err| {
                        warn!("window list unavailable: {err:#}");
                        None
                    }),
                ..Default::default()
            },
        }
    }

    fn grab_input(&self) -> bool {
        let root = self.backend.root_window();
        grab::acquire_exclusive_input(&*self.backend, root, CURRENT_TIME)
    }

    fn popup_menu(&mut self) -> Option<String> {
        let menu = self.cache.request_menu()?;
        if !self.grab_input() {
            return None;
        }
        let text = menu.to_string();
        info!(generation = menu.generation(), "desktop menu\n{text}");
        Some(text)
    }

    fn popup_window_list(&mut self) -> Result<Option<String>> {
        let state = self.backend.wm_state().context("read window manager state")?;
        if !self.grab_input() {
            return Ok(None);
        }
        let text = windowlist::assemble(&state)
            .iter()
            .map(|entry| entry.plain_label())
            .collect::<Vec<_>>()
            .join("\n");
        info!("window list\n{text}");
        Ok(Some(text))
    }

    /// Drains pending control messages; `true` once a quit was requested.
    pub fn drain_control(&mut self) -> Result<bool> {
        while let Some(payload) = self.backend.poll_control_message()? {
            let Some(cmd) = control::decode(&payload) else {
                debug!(
                    message = control::payload_text(&payload).unwrap_or("<binary>"),
                    "ignoring unknown control message"
                );
                continue;
            };
            if self.handle(cmd).quit {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn run(&mut self) -> Result<()> {
        let window = self.claim()?;
        info!(screen = self.backend.screen(), window, "deskmenu running");

        let mut next_tick = Instant::now();
        loop {
            let now = Instant::now();
            if now >= next_tick {
                let config = config::load_or_default().unwrap_or_else(|err| {
                    warn!("keeping previous config: {err:#}");
                    self.config.clone()
                });
                self.tick(config);
                next_tick = now + self.config.poll_interval();
            }

            if self.drain_control()? {
                info!("quit requested");
                return Ok(());
            }
            thread::sleep(CONTROL_POLL);
        }
    }
}

pub fn menu_cache(config: &Config) -> MenuCache {
    let icon_dirs = config.icon_dirs();
    MenuCache::new(
        Box::new(JsonMenuSource::new(config.menu_file.clone())),
        Box::new(ThemeIconResolver::new(icon_dirs)),
        config.menu_settings(),
    )
}
