//! Typed identifiers of path-valued manifest fields.

use std::fmt;

/// Identifies one path-valued location inside a [`crate::Manifest`].
///
/// The set of path-valued fields is finite, so every owner of a source
/// reference is one of these variants rather than a free-form key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldId {
    /// `background.service_worker`
    ServiceWorker,
    /// `content_scripts[script].js[index]` (renamed from `ts` during extraction).
    ContentScriptJs { script: usize, index: usize },
    /// `content_scripts[script].css[index]`
    ContentScriptCss { script: usize, index: usize },
    /// `action.default_popup`
    Popup,
    /// `options_page`
    OptionsPage,
    /// `options_ui.page`
    OptionsUiPage,
    /// `icons.<size>`, or the plain `icons` string when `size` is `None`.
    Icon { size: Option<String> },
    /// `action.default_icon.<size>`, or the plain string form when `size` is `None`.
    ActionIcon { size: Option<String> },
}

impl FieldId {
    /// Returns true for fields whose value is an HTML document.
    pub fn is_html(&self) -> bool {
        matches!(
            self,
            FieldId::Popup | FieldId::OptionsPage | FieldId::OptionsUiPage
        )
    }

    /// Returns true for icon fields.
    pub fn is_icon(&self) -> bool {
        matches!(self, FieldId::Icon { .. } | FieldId::ActionIcon { .. })
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldId::ServiceWorker => write!(f, "background.service_worker"),
            FieldId::ContentScriptJs { script, index } => {
                write!(f, "content_scripts[{}].js[{}]", script, index)
            }
            FieldId::ContentScriptCss { script, index } => {
                write!(f, "content_scripts[{}].css[{}]", script, index)
            }
            FieldId::Popup => write!(f, "action.default_popup"),
            FieldId::OptionsPage => write!(f, "options_page"),
            FieldId::OptionsUiPage => write!(f, "options_ui.page"),
            FieldId::Icon { size: Some(size) } => write!(f, "icons.{}", size),
            FieldId::Icon { size: None } => write!(f, "icons"),
            FieldId::ActionIcon { size: Some(size) } => write!(f, "action.default_icon.{}", size),
            FieldId::ActionIcon { size: None } => write!(f, "action.default_icon"),
        }
    }
}
