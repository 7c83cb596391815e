use anyhow::{bail, Result};
use clap::ValueEnum;

/// Size of an 8-bit client message payload.
pub const PAYLOAD_LEN: usize = 20;

pub type Payload = [u8; PAYLOAD_LEN];

/// Requests one instance can send to the one owning the desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ControlCommand {
    /// Pop up the desktop menu.
    Menu,
    /// Pop up the window list.
    Windowlist,
    /// Rebuild the desktop menu from its source.
    Reload,
    /// Shut the running instance down.
    Quit,
}

impl ControlCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlCommand::Menu => "menu",
            ControlCommand::Windowlist => "windowlist",
            ControlCommand::Reload => "reload",
            ControlCommand::Quit => "quit",
        }
    }
}

/// Packs `msg` into a NUL-terminated client message payload.
pub fn encode(msg: &str) -> Result<Payload> {
    let bytes = msg.as_bytes();
    if bytes.len() >= PAYLOAD_LEN {
        bail!("control message '{msg}' is longer than {} bytes", PAYLOAD_LEN - 1);
    }
    if bytes.contains(&0) {
        bail!("control message must not contain NUL bytes");
    }
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..bytes.len()].copy_from_slice(bytes);
    Ok(payload)
}

/// Text up to the first NUL; `None` if that is not UTF-8.
pub fn payload_text(payload: &[u8]) -> Option<&str> {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    std::str::from_utf8(&payload[..end]).ok()
}

pub fn decode(payload: &[u8]) -> Option<ControlCommand> {
    match payload_text(payload)? {
        "menu" => Some(ControlCommand::Menu),
        "windowlist" => Some(ControlCommand::Windowlist),
        "reload" => Some(ControlCommand::Reload),
        "quit" => Some(ControlCommand::Quit),
        _ => None,
    }
}
