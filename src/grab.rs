use std::{thread, time::Duration};

use anyhow::Result;
use tracing::{trace, warn};

use crate::windowlist::WindowId;

pub const GRAB_ATTEMPTS: u32 = 2500;
pub const GRAB_RETRY_DELAY: Duration = Duration::from_micros(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabStatus {
    Success,
    AlreadyGrabbed,
    InvalidTime,
    NotViewable,
    Frozen,
    /// The request itself failed (e.g. the connection broke).
    Failed,
}

impl GrabStatus {
    /// Retrying cannot fix these.
    fn is_final_failure(self) -> bool {
        matches!(self, GrabStatus::InvalidTime | GrabStatus::Failed)
    }
}

pub trait InputGrab {
    fn grab_pointer(&self, window: WindowId, time: u32) -> Result<GrabStatus>;
    fn grab_keyboard(&self, window: WindowId, time: u32) -> Result<GrabStatus>;
    fn ungrab_pointer(&self, time: u32) -> Result<()>;
    fn ungrab_keyboard(&self, time: u32) -> Result<()>;
}

/// Checks that pointer and keyboard can both be grabbed before a popup is
/// shown, retrying while another client still holds them.
///
/// Whatever was grabbed is released again before returning; holding the grab
/// for the popup is the caller's job.
pub fn acquire_exclusive_input<G>(grab: &G, window: WindowId, time: u32) -> bool
where
    G: InputGrab + ?Sized,
{
    acquire_with_delay(grab, window, time, GRAB_RETRY_DELAY)
}

pub(crate) fn acquire_with_delay<G>(grab: &G, window: WindowId, time: u32, delay: Duration) -> bool
where
    G: InputGrab + ?Sized,
{
    let pointer_grab = || status(grab.grab_pointer(window, time));
    let keyboard_grab = || status(grab.grab_keyboard(window, time));

    let mut pointer = pointer_grab();
    let mut keyboard = keyboard_grab();
    let mut attempt = 0;

    while pointer != GrabStatus::Success || keyboard != GrabStatus::Success {
        if attempt == GRAB_ATTEMPTS || pointer.is_final_failure() || keyboard.is_final_failure() {
            break;
        }
        attempt += 1;
        trace!(?pointer, ?keyboard, attempt, "grab not available yet");

        thread::sleep(delay);
        if pointer != GrabStatus::Success {
            pointer = pointer_grab();
        }
        if keyboard != GrabStatus::Success {
            keyboard = keyboard_grab();
        }
    }

    if pointer == GrabStatus::Success {
        if let Err(err) = grab.ungrab_pointer(time) {
            warn!("releasing pointer grab failed: {err:#}");
        }
    }
    if keyboard == GrabStatus::Success {
        if let Err(err) = grab.ungrab_keyboard(time) {
            warn!("releasing keyboard grab failed: {err:#}");
        }
    }

    let acquired = pointer == GrabStatus::Success && keyboard == GrabStatus::Success;
    if !acquired {
        warn!(?pointer, ?keyboard, attempts = attempt, "could not acquire input grab");
    }
    acquired
}

fn status(result: Result<GrabStatus>) -> GrabStatus {
    result.unwrap_or_else(|err| {
        warn!("grab request failed: {err:#}");
        GrabStatus::Failed
    })
}
