use std::env;

use anyhow::{Context, Result};
use tracing::debug;

use crate::control;
use crate::windowlist::WindowId;

const SELECTION_PREFIX: &str = "DESKMENU_SELECTION_";

/// Selection ownership and client messages, the pieces of the display
/// protocol used to find and talk to another running instance.
pub trait SessionBus {
    /// Window currently owning selection `name`, if any.
    fn selection_owner(&self, name: &str) -> Result<Option<WindowId>>;

    /// Takes selection `name` for a window of our own and returns that window.
    fn claim_selection(&self, name: &str) -> Result<WindowId>;

    /// Delivers an 8-bit `STRING` client message to `target` and flushes.
    fn send_client_message(&self, target: WindowId, payload: control::Payload) -> Result<()>;
}

/// Screen number from an X display name such as `:0.1` or `host:10.2`.
/// Anything unparseable means screen 0.
pub fn screen_from_display(display: Option<&str>) -> usize {
    display
        .and_then(|d| d.rsplit_once(':'))
        .and_then(|(_, rest)| rest.split_once('.'))
        .and_then(|(_, screen)| screen.parse().ok())
        .unwrap_or(0)
}

pub fn current_screen() -> usize {
    screen_from_display(env::var("DISPLAY").ok().as_deref())
}

pub fn selection_name(screen: usize) -> String {
    format!("{SELECTION_PREFIX}{screen}")
}

/// Owner of the desktop selection for `screen`, if another instance holds it.
///
/// Only looks; claiming is a separate step.
pub fn is_already_running<B>(bus: &B, screen: usize) -> Result<Option<WindowId>>
where
    B: SessionBus + ?Sized,
{
    let name = selection_name(screen);
    let owner = bus
        .selection_owner(&name)
        .with_context(|| format!("query owner of {name}"))?;
    debug!(selection = %name, ?owner, "checked for running instance");
    Ok(owner)
}

/// Fire-and-forget: there is no reply or delivery confirmation.
pub fn send_control_message<B>(bus: &B, target: WindowId, message: &str) -> Result<()>
where
    B: SessionBus + ?Sized,
{
    let payload = control::encode(message)?;
    bus.send_client_message(target, payload)
        .with_context(|| format!("send '{message}' to window {target:#x}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn screen_numbers() {
        assert_eq!(screen_from_display(Some(":0")), 0);
        assert_eq!(screen_from_display(Some(":0.1")), 1);
        assert_eq!(screen_from_display(Some("localhost:10.2")), 2);
        assert_eq!(screen_from_display(Some("host.example.org:0")), 0);
        assert_eq!(screen_from_display(Some(":1.x")), 0);
        assert_eq!(screen_from_display(Some("garbage")), 0);
        assert_eq!(screen_from_display(None), 0);
        assert_eq!(selection_name(0), "DESKMENU_SELECTION_0");
        assert_eq!(selection_name(3), "DESKMENU_SELECTION_3");
    }

    #[derive(Default)]
    struct FakeBus {
        owners: RefCell<Vec<(String, WindowId)>>,
        sent: RefCell<Vec<(WindowId, control::Payload)>>,
    }

    impl SessionBus for FakeBus {
        fn selection_owner(&self, name: &str) -> Result<Option<WindowId>> {
            Ok(self
                .owners
                .borrow()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, w)| *w))
        }

        fn claim_selection(&self, name: &str) -> Result<WindowId> {
            self.owners.borrow_mut().push((name.to_string(), 0x400001));
            Ok(0x400001)
        }

        fn send_client_message(&self, target: WindowId, payload: control::Payload) -> Result<()> {
            self.sent.borrow_mut().push((target, payload));
            Ok(())
        }
    }

    #[test]
    fn detection_is_per_screen_and_does_not_claim() {
        let bus = FakeBus::default();
        assert_eq!(is_already_running(&bus, 0).unwrap(), None);
        assert!(bus.owners.borrow().is_empty());

        let win = bus.claim_selection(&selection_name(0)).unwrap();
        assert_eq!(is_already_running(&bus, 0).unwrap(), Some(win));
        assert_eq!(is_already_running(&bus, 1).unwrap(), None);
    }

    #[test]
    fn messages_are_encoded() {
        let bus = FakeBus::default();
        send_control_message(&bus, 7, "reload").unwrap();
        let sent = bus.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 7);
        assert_eq!(control::decode(&sent[0].1), Some(control::ControlCommand::Reload));

        assert!(send_control_message(&bus, 7, "a message that is far too long").is_err());
    }
}
