use super::item::{parent_path, ItemKind, MenuItem, SourceRef};

pub const SEPARATOR_LABEL: &str = "--- separator ---";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetStyle {
    /// Item that can carry an icon.
    ImageItem,
    Item,
    Separator,
    Branch,
    Title,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    None,
    Exec(String),
    TermExec(String),
    Builtin(String),
    Edit(SourceRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSpec {
    /// The entry's own menu path; unique per entry even where labels repeat.
    pub key: String,
    pub display_path: String,
    pub icon_ref: Option<String>,
    pub style: WidgetStyle,
    pub activation: Activation,
}

/// How `item` shows up in the menu. `None` for entries that are never drawn.
///
/// Edit mode keeps the same item list but turns every entry into something
/// clickable that opens the editor, separators included.
pub fn render_policy(item: &MenuItem, edit_mode: bool, use_icons: bool) -> Option<RenderSpec> {
    if edit_mode {
        return edit_policy(item);
    }

    let image_style = if use_icons {
        WidgetStyle::ImageItem
    } else {
        WidgetStyle::Item
    };
    let icon_ref = |icon: &Option<String>| if use_icons { icon.clone() } else { None };

    let (style, activation, icon_ref) = match &item.kind {
        ItemKind::App {
            command,
            icon,
            terminal,
        } => {
            let activation = if *terminal {
                Activation::TermExec(command.clone())
            } else {
                Activation::Exec(command.clone())
            };
            (image_style, activation, icon_ref(icon))
        }
        ItemKind::Builtin { action, icon } => (
            image_style,
            Activation::Builtin(action.clone()),
            icon_ref(icon),
        ),
        ItemKind::Separator => (WidgetStyle::Separator, Activation::None, None),
        ItemKind::Submenu { .. } => (WidgetStyle::Branch, Activation::None, None),
        ItemKind::Title => (WidgetStyle::Title, Activation::None, None),
        ItemKind::Include { .. } => return None,
    };

    Some(RenderSpec {
        key: item.path.clone(),
        display_path: item.path.clone(),
        icon_ref,
        style,
        activation,
    })
}

fn edit_policy(item: &MenuItem) -> Option<RenderSpec> {
    let edit = Activation::Edit(item.origin.clone());
    let (display_path, style) = match &item.kind {
        ItemKind::Include { .. } => return None,
        ItemKind::Submenu { .. } => (item.path.clone(), WidgetStyle::Branch),
        ItemKind::Separator => (separator_placeholder(&item.path), WidgetStyle::Item),
        ItemKind::App { .. } | ItemKind::Title | ItemKind::Builtin { .. } => {
            (item.path.clone(), WidgetStyle::Item)
        }
    };

    Some(RenderSpec {
        key: item.path.clone(),
        display_path,
        icon_ref: None,
        style,
        activation: edit,
    })
}

fn separator_placeholder(path: &str) -> String {
    match parent_path(path) {
        "/" => format!("/{SEPARATOR_LABEL}"),
        parent => format!("{parent}/{SEPARATOR_LABEL}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn item(path: &str, kind: ItemKind) -> MenuItem {
        MenuItem {
            path: path.to_string(),
            kind,
            origin: SourceRef {
                file: PathBuf::from("/menu.json"),
                index: 3,
            },
            icon: None,
        }
    }

    fn app(terminal: bool) -> MenuItem {
        item(
            "/Apps/Editor",
            ItemKind::App {
                command: "vim".into(),
                icon: Some("accessories-text-editor".into()),
                terminal,
            },
        )
    }

    #[test]
    fn normal_app_executes() {
        let spec = render_policy(&app(false), false, true).unwrap();
        assert_eq!(spec.style, WidgetStyle::ImageItem);
        assert_eq!(spec.activation, Activation::Exec("vim".into()));
        assert_eq!(spec.icon_ref.as_deref(), Some("accessories-text-editor"));

        let spec = render_policy(&app(true), false, false).unwrap();
        assert_eq!(spec.style, WidgetStyle::Item);
        assert_eq!(spec.activation, Activation::TermExec("vim".into()));
        assert_eq!(spec.icon_ref, None);
    }

    #[test]
    fn normal_structure_items_have_no_handler() {
        let sep = render_policy(&item("/Apps/s1", ItemKind::Separator), false, true).unwrap();
        assert_eq!(sep.style, WidgetStyle::Separator);
        assert_eq!(sep.activation, Activation::None);

        let sub = item("/Apps", ItemKind::Submenu { icon: Some("folder".into()) });
        let sub = render_policy(&sub, false, true).unwrap();
        assert_eq!(sub.style, WidgetStyle::Branch);
        assert_eq!(sub.activation, Activation::None);
        assert_eq!(sub.icon_ref, None);

        let title = render_policy(&item("/Desktop", ItemKind::Title), false, true).unwrap();
        assert_eq!(title.style, WidgetStyle::Title);
    }

    #[test]
    fn builtins_dispatch_by_name() {
        let quit = item(
            "/Quit",
            ItemKind::Builtin {
                action: "quit".into(),
                icon: None,
            },
        );
        let spec = render_policy(&quit, false, true).unwrap();
        assert_eq!(spec.activation, Activation::Builtin("quit".into()));
    }

    #[test]
    fn includes_are_never_drawn() {
        let inc = item("/inc", ItemKind::Include { source: "more.json".into() });
        assert!(render_policy(&inc, false, true).is_none());
        assert!(render_policy(&inc, true, true).is_none());
    }

    #[test]
    fn edit_mode_makes_everything_editable() {
        let origin = app(false).origin;
        for it in [
            app(false),
            item("/Desktop", ItemKind::Title),
            item(
                "/Edit",
                ItemKind::Builtin {
                    action: "edit".into(),
                    icon: None,
                },
            ),
        ] {
            let spec = render_policy(&it, true, true).unwrap();
            assert_eq!(spec.style, WidgetStyle::Item);
            assert_eq!(spec.activation, Activation::Edit(origin.clone()));
            assert_eq!(spec.icon_ref, None);
            assert_eq!(spec.display_path, it.path);
        }

        let sub = item("/Apps", ItemKind::Submenu { icon: None });
        let spec = render_policy(&sub, true, true).unwrap();
        assert_eq!(spec.style, WidgetStyle::Branch);
        assert_eq!(spec.activation, Activation::Edit(origin));
    }

    #[test]
    fn edit_mode_exposes_separators_under_parent() {
        let nested = render_policy(&item("/Apps/sep#2", ItemKind::Separator), true, true).unwrap();
        assert_eq!(nested.display_path, "/Apps/--- separator ---");
        assert_eq!(nested.key, "/Apps/sep#2");
        assert_eq!(nested.style, WidgetStyle::Item);

        let top = render_policy(&item("/sep#0", ItemKind::Separator), true, true).unwrap();
        assert_eq!(top.display_path, "/--- separator ---");
    }
}
