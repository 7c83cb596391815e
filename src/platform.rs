use anyhow::Result;

use crate::control::Payload;
use crate::grab::InputGrab;
use crate::session::SessionBus;
use crate::windowlist::{WindowId, WindowManager};

/// Everything the daemon needs from the display server.
pub trait Backend: WindowManager + InputGrab + SessionBus {
    /// Screen this connection talks to; selects the per-screen selection.
    fn screen(&self) -> usize;

    fn root_window(&self) -> WindowId;

    /// Next control message addressed to a window we own, without blocking.
    fn poll_control_message(&self) -> Result<Option<Payload>>;
}

#[cfg(target_os = "linux")]
mod x11;

pub fn backend() -> Result<Box<dyn Backend>> {
    #[cfg(target_os = "linux")]
    {
        return Ok(Box::new(x11::X11Backend::connect()?));
    }

    #[cfg(not(target_os = "linux"))]
    {
        use anyhow::bail;
        bail!("Unsupported OS (only X11 desktops on Linux are supported).");
    }
}
