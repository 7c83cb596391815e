use std::{path::PathBuf, time::Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use deskmenu::{
    backdrop::{self, DecodableImage, RandomRotation},
    config,
    control::ControlCommand,
    daemon::{self, Daemon},
    launch::ShellLauncher,
    menu::Outcome,
    platform, session,
    windowlist::{self, ScrollDirection},
};

#[derive(Parser, Debug)]
#[command(name = "deskmenu", version, about = "X11 desktop root menu and window list")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Builds the desktop menu and prints it as a tree.
    Menu {
        /// Show the menu in edit mode: every entry opens its source location.
        #[arg(long)]
        edit: bool,
        /// Activates the entry with this menu path (e.g. "/Apps/Terminal").
        #[arg(long, value_name = "PATH")]
        activate: Option<String>,
    },
    /// Prints the window list of the running window manager.
    Windows {
        /// Performs the action of the entry at this 0-based position.
        #[arg(long, value_name = "N", conflicts_with = "scroll")]
        select: Option<usize>,
        /// Switches workspace as one mouse wheel step would, wrapping at the ends.
        #[arg(long, value_enum, value_name = "DIRECTION")]
        scroll: Option<ScrollDirection>,
    },
    /// Picks the next backdrop from the directory of the current one.
    Backdrop {
        #[arg(value_enum)]
        mode: BackdropMode,
        /// Currently shown backdrop file.
        current: PathBuf,
    },
    /// Exits 0 if another instance owns this screen, 1 otherwise.
    IsRunning,
    /// Sends a control message to the running instance.
    Send {
        #[arg(value_enum)]
        command: ControlCommand,
    },
    /// Runs in the background, owning the desktop selection for this screen.
    Run,
    /// Prints the config path that would be used (if any).
    ConfigPath,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackdropMode {
    Next,
    Random,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DESKMENU_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Menu { edit, activate } => {
            let cfg = config::load_or_default()?;
            let mut cache = daemon::menu_cache(&cfg);
            if edit {
                cache.set_edit_mode(true, Instant::now());
            }
            let menu = cache
                .request_menu()
                .context("no desktop menu could be built")?;

            match activate {
                None => print!("{menu}"),
                Some(path) => {
                    let launcher = ShellLauncher::new(cfg.terminal.clone());
                    match cache.activate(&path, &launcher)? {
                        Outcome::Ignored => bail!("nothing to activate at '{path}'"),
                        Outcome::Launched => {}
                        Outcome::EditModeToggled { edit_mode } => {
                            println!("edit mode {}", if edit_mode { "on" } else { "off" });
                        }
                        Outcome::EditEntry(origin) => {
                            println!("{}#{}", origin.file.display(), origin.index);
                        }
                        Outcome::Quit => println!("quit"),
                    }
                }
            }
        }
        Command::Windows {
            scroll: Some(direction),
            ..
        } => {
            let backend = platform::backend()?;
            if let Some(index) =
                windowlist::scroll(&*backend, direction).context("switch workspace")?
            {
                println!("workspace {index}");
            }
        }
        Command::Windows { select, .. } => {
            let backend = platform::backend()?;
            let state = backend.wm_state().context("read window manager state")?;
            let entries = windowlist::assemble(&state);
            match select {
                None => {
                    for (i, entry) in entries.iter().enumerate() {
                        println!("[{i}] {}", entry.plain_label());
                    }
                }
                Some(i) => {
                    let entry = entries
                        .get(i)
                        .with_context(|| format!("no window list entry {i}"))?;
                    let Some(action) = entry.action() else {
                        bail!("entry {i} is not selectable");
                    };
                    windowlist::perform(&*backend, action)
                        .with_context(|| format!("perform {action:?}"))?;
                }
            }
        }
        Command::Backdrop { mode, current } => {
            let chosen = match mode {
                BackdropMode::Next => backdrop::choose_next(&current, &DecodableImage),
                BackdropMode::Random => RandomRotation::new().choose(&current, &DecodableImage),
            };
            let Some(chosen) = chosen else {
                bail!("no usable backdrop next to {}", current.display());
            };
            println!("{}", chosen.display());
        }
        Command::IsRunning => {
            let backend = platform::backend()?;
            match session::is_already_running(&*backend, backend.screen())? {
                Some(owner) => println!("{owner:#x}"),
                None => std::process::exit(1),
            }
        }
        Command::Send { command } => {
            let backend = platform::backend()?;
            let Some(owner) = session::is_already_running(&*backend, backend.screen())? else {
                bail!("deskmenu is not running on screen {}", backend.screen());
            };
            session::send_control_message(&*backend, owner, command.as_str())?;
        }
        Command::Run => {
            let backend = platform::backend()?;
            let cfg = config::load_or_default()?;
            Daemon::new(backend, cfg).run()?;
        }
        Command::ConfigPath => {
            if let Some(path) = config::resolve_config_path() {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
