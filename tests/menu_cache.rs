use std::{
    cell::RefCell,
    fs::{self, File},
    path::{Path, PathBuf},
    rc::Rc,
    time::{Duration, Instant, SystemTime},
};

use anyhow::Result;
use deskmenu::{
    launch::Launcher,
    menu::{
        Activation, CacheStatus, JsonMenuSource, MenuCache, MenuSettings, Outcome,
        ThemeIconResolver, WidgetStyle,
    },
};
use tempfile::TempDir;

const MENU: &str = r#"{
    "items": [
        {"type": "title", "name": "Desktop"},
        {"type": "app", "name": "Terminal", "cmd": "xterm", "icon": "terminal"},
        {"type": "menu", "name": "Apps", "items": [
            {"type": "app", "name": "Top", "cmd": "top", "term": true},
            {"type": "separator"}
        ]},
        {"type": "include", "src": "extra.json"},
        {"type": "separator"},
        {"type": "builtin", "name": "Edit menu", "cmd": "edit"},
        {"type": "builtin", "name": "Quit", "cmd": "quit"}
    ]
}"#;

const EXTRA: &str = r#"{"items": [{"type": "app", "name": "Files", "cmd": "thunar"}]}"#;

#[derive(Default)]
struct Recorder {
    launched: RefCell<Vec<(String, bool)>>,
}

impl Launcher for Recorder {
    fn launch(&self, command: &str, terminal: bool) -> Result<()> {
        self.launched
            .borrow_mut()
            .push((command.to_string(), terminal));
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    menu: PathBuf,
    cache: MenuCache,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let menu = dir.path().join("menu.json");
    fs::write(&menu, MENU).unwrap();
    fs::write(dir.path().join("extra.json"), EXTRA).unwrap();

    let icons = dir.path().join("icons");
    fs::create_dir_all(icons.join("hicolor/48x48/apps")).unwrap();
    fs::write(icons.join("hicolor/48x48/apps/terminal.png"), b"png").unwrap();

    let cache = MenuCache::new(
        Box::new(JsonMenuSource::with_search_paths(Some(menu.clone()), Vec::new())),
        Box::new(ThemeIconResolver::new(vec![icons])),
        MenuSettings::default(),
    );
    Fixture { dir, menu, cache }
}

/// Moves the file's mtime forward so the change is visible on coarse clocks.
fn touch(path: &Path) {
    let later = SystemTime::now() + Duration::from_secs(5);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(later)
        .unwrap();
}

#[test]
fn builds_once_and_reuses_until_the_source_changes() {
    let mut fx = fixture();
    assert_eq!(fx.cache.status(), CacheStatus::Empty);

    let first = fx.cache.request_menu().unwrap();
    assert_eq!(fx.cache.status(), CacheStatus::Built);
    assert_eq!(fx.cache.source_path(), Some(fx.menu.as_path()));
    assert!(Rc::ptr_eq(&first, &fx.cache.request_menu().unwrap()));

    touch(&fx.dir.path().join("extra.json"));
    assert_eq!(fx.cache.status(), CacheStatus::Stale);
    let second = fx.cache.request_menu().unwrap();
    assert!(!Rc::ptr_eq(&first, &second));
    assert!(second.generation() > first.generation());

    // Handles given out earlier stay usable after a rebuild.
    assert!(first.lookup("/Terminal").is_some());
}

#[test]
fn normal_mode_layout() {
    let mut fx = fixture();
    let menu = fx.cache.request_menu().unwrap();

    let styles = menu
        .nodes()
        .iter()
        .map(|n| (n.spec.display_path.as_str(), n.spec.style))
        .collect::<Vec<_>>();
    assert_eq!(
        styles,
        vec![
            ("/Desktop", WidgetStyle::Title),
            ("/Terminal", WidgetStyle::ImageItem),
            ("/Apps", WidgetStyle::Branch),
            ("/Apps/Top", WidgetStyle::ImageItem),
            ("/Apps/#sep4", WidgetStyle::Separator),
            ("/Files", WidgetStyle::ImageItem),
            ("/#sep6", WidgetStyle::Separator),
            ("/Edit menu", WidgetStyle::ImageItem),
            ("/Quit", WidgetStyle::ImageItem),
        ]
    );

    let terminal = menu.lookup("/Terminal").unwrap();
    assert!(menu
        .item_for(terminal)
        .icon
        .as_ref()
        .is_some_and(|icon| icon.is_owned()));
    assert_eq!(
        menu.lookup("/Apps/Top").unwrap().spec.activation,
        Activation::TermExec("top".to_string())
    );
}

#[test]
fn activation_launches_and_dispatches_builtins() {
    let mut fx = fixture();
    fx.cache.request_menu().unwrap();
    let launcher = Recorder::default();

    assert_eq!(
        fx.cache.activate("/Terminal", &launcher).unwrap(),
        Outcome::Launched
    );
    assert_eq!(
        fx.cache.activate("/Apps/Top", &launcher).unwrap(),
        Outcome::Launched
    );
    assert_eq!(
        *launcher.launched.borrow(),
        vec![("xterm".to_string(), false), ("top".to_string(), true)]
    );

    assert_eq!(fx.cache.activate("/Quit", &launcher).unwrap(), Outcome::Quit);
    assert_eq!(
        fx.cache.activate("/Nowhere", &launcher).unwrap(),
        Outcome::Ignored
    );
}

#[test]
fn edit_mode_round_trip() {
    let mut fx = fixture();
    fx.cache.request_menu().unwrap();
    let launcher = Recorder::default();

    assert_eq!(
        fx.cache.activate("/Edit menu", &launcher).unwrap(),
        Outcome::EditModeToggled { edit_mode: true }
    );
    let editing = fx.cache.cached().unwrap();
    assert!(editing.edit_mode());
    assert!(editing
        .nodes()
        .iter()
        .all(|n| matches!(n.spec.activation, Activation::Edit(_))));
    let sep = editing.lookup("/Apps/#sep4").unwrap();
    assert_eq!(sep.spec.display_path, "/Apps/--- separator ---");
    // The include line has an origin but no widget in either mode.
    assert!(editing.nodes().iter().all(|n| !n.spec.key.contains("#include")));
    assert_eq!(
        fx.cache.activate("/#include5", &launcher).unwrap(),
        Outcome::Ignored
    );
    assert!(fx.cache.edit_mode());

    let outcome = fx.cache.activate("/Files", &launcher).unwrap();
    let Outcome::EditEntry(origin) = outcome else {
        panic!("expected an edit request, got {outcome:?}");
    };
    assert_eq!(origin.file, fx.dir.path().join("extra.json"));
    assert_eq!(origin.index, 0);

    assert!(!fx.cache.edit_mode());
    assert!(!fx.cache.cached().unwrap().edit_mode());
    assert!(launcher.launched.borrow().is_empty());
}

#[test]
fn broken_source_keeps_the_last_good_menu() {
    let mut fx = fixture();
    let good = fx.cache.request_menu().unwrap();

    fs::write(&fx.menu, "{ broken").unwrap();
    touch(&fx.menu);
    let still = fx.cache.request_menu().unwrap();
    assert!(Rc::ptr_eq(&good, &still));

    fs::write(&fx.menu, r#"{"items": []}"#).unwrap();
    touch(&fx.menu);
    assert!(fx.cache.rebuild(Instant::now()).is_err());
    assert!(Rc::ptr_eq(&good, &fx.cache.cached().unwrap()));
}

#[test]
fn theme_change_forces_rebuild() {
    let mut fx = fixture();
    let first = fx.cache.request_menu().unwrap();
    fx.cache
        .theme_changed("Adwaita", first.built_at() + Duration::from_millis(1));
    assert_eq!(fx.cache.status(), CacheStatus::Stale);
    let second = fx.cache.request_menu().unwrap();
    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(fx.cache.theme(), "Adwaita");
}
