use std::{
    process::{Command, Stdio},
    thread,
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub trait Launcher {
    fn launch(&self, command: &str, terminal: bool) -> Result<()>;
}

/// Runs menu commands through `sh -c`, or `<terminal> -e` for terminal entries.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    terminal: String,
}

impl ShellLauncher {
    pub fn new(terminal: impl Into<String>) -> Self {
        Self {
            terminal: terminal.into(),
        }
    }

    fn command_for(&self, command: &str, terminal: bool) -> Command {
        let mut cmd = if terminal {
            let mut cmd = Command::new(&self.terminal);
            cmd.arg("-e").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        };
        cmd.stdin(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so the child outlives us and ignores our signals.
            cmd.process_group(0);
        }
        cmd
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str, terminal: bool) -> Result<()> {
        let mut child = self
            .command_for(command, terminal)
            .spawn()
            .with_context(|| format!("spawning '{command}'"))?;
        debug!(command, terminal, pid = child.id(), "launched");

        // Reap in the background so finished children do not linger as zombies.
        let command = command.to_string();
        thread::spawn(move || {
            if let Err(err) = child.wait() {
                warn!(command, "waiting for child failed: {err}");
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_entries_go_through_the_terminal() {
        let launcher = ShellLauncher::new("xterm");
        let cmd = launcher.command_for("top", true);
        assert_eq!(cmd.get_program(), "xterm");
        let args = cmd.get_args().collect::<Vec<_>>();
        assert_eq!(args, vec!["-e", "top"]);

        let cmd = launcher.command_for("echo hi", false);
        assert_eq!(cmd.get_program(), "sh");
        let args = cmd.get_args().collect::<Vec<_>>();
        assert_eq!(args, vec!["-c", "echo hi"]);
    }

    #[cfg(unix)]
    #[test]
    fn launching_true_succeeds() {
        ShellLauncher::new("xterm").launch("true", false).unwrap();
    }
}
