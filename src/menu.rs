//! The desktop root menu: parsed entries, how they are drawn, and the cache
//! that keeps the built menu in step with its source file and icon theme.

pub mod cache;
pub mod icons;
pub mod item;
pub mod render;
pub mod source;

pub use cache::{BuiltMenu, CacheStatus, MenuCache, MenuHandle, MenuSettings, Outcome};
pub use icons::{IconResolver, ThemeIconResolver};
pub use item::{EntryKind, IconHandle, ItemKind, MenuItem, ParsedEntry, SourceRef};
pub use render::{render_policy, Activation, RenderSpec, WidgetStyle};
pub use source::{JsonMenuSource, MenuSource};
