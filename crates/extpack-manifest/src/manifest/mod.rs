//! The manifest model.
//!
//! Only the path-valued fields are typed. Everything else is carried through
//! untouched in `extra` maps, in its input order, so a manifest without
//! path-valued fields serializes back to what was read.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::ManifestError;
use crate::field::FieldId;

#[cfg(test)]
mod tests;

/// Manifest version injected when the source omits it.
pub const DEFAULT_MANIFEST_VERSION: u32 = 3;

/// Value of `background.type` for bundled service workers.
pub const MODULE_WORKER_TYPE: &str = "module";

fn default_manifest_version() -> u32 {
    DEFAULT_MANIFEST_VERSION
}

/// A browser extension manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version.
    #[serde(default = "default_manifest_version")]
    pub manifest_version: u32,

    /// Background service worker declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,

    /// Content script declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_scripts: Option<Vec<ContentScript>>,

    /// Toolbar action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    /// Legacy options page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_page: Option<String>,

    /// Embedded options page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_ui: Option<OptionsUi>,

    /// Extension icons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<IconSet>,

    /// All other manifest keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `background` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_worker: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub worker_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One `content_scripts` entry.
///
/// `ts` is the pre-bundle spelling of `js`; extraction folds it into `js`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentScript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `action` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_popup: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<IconSet>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `options_ui` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsUi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Icons are either a single path or a map from pixel size to path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IconSet {
    Single(String),
    Sized(IndexMap<String, String>),
}

impl IconSet {
    fn field_ids(&self, make: fn(Option<String>) -> FieldId) -> Vec<FieldId> {
        match self {
            IconSet::Single(_) => vec![make(None)],
            IconSet::Sized(map) => map.keys().map(|size| make(Some(size.clone()))).collect(),
        }
    }

    fn get(&self, size: Option<&str>) -> Option<&str> {
        match (self, size) {
            (IconSet::Single(path), None) => Some(path.as_str()),
            (IconSet::Sized(map), Some(size)) => map.get(size).map(String::as_str),
            _ => None,
        }
    }

    fn set(&mut self, size: Option<&str>, value: String) -> bool {
        match (self, size) {
            (IconSet::Single(path), None) => {
                *path = value;
                true
            }
            (IconSet::Sized(map), Some(size)) => match map.get_mut(size) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl Manifest {
    /// Creates an empty manifest with the default version.
    pub fn new() -> Self {
        Self {
            manifest_version: DEFAULT_MANIFEST_VERSION,
            background: None,
            content_scripts: None,
            action: None,
            options_page: None,
            options_ui: None,
            icons: None,
            extra: Map::new(),
        }
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parses a manifest from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Reads and parses a manifest source file.
    ///
    /// Every call reads the file again; callers that need to observe edits
    /// must not cache the result.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serializes the manifest to a compact JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the manifest with 2-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Marks an existing background section as an ES module worker.
    pub fn mark_module_worker(&mut self) {
        if let Some(background) = self.background.as_mut() {
            background.worker_type = Some(MODULE_WORKER_TYPE.to_string());
        }
    }

    /// Replaces the background section with a module worker at `path`.
    pub fn set_service_worker(&mut self, path: impl Into<String>) {
        self.background = Some(Background {
            service_worker: Some(path.into()),
            worker_type: Some(MODULE_WORKER_TYPE.to_string()),
            extra: Map::new(),
        });
    }

    /// Returns the declared service worker path, if any.
    pub fn service_worker(&self) -> Option<&str> {
        self.background
            .as_ref()
            .and_then(|b| b.service_worker.as_deref())
    }

    /// Folds every content script's `ts` list into its `js` list.
    ///
    /// Existing `js` entries keep their position; `ts` entries follow them.
    /// Afterwards no content script carries a `ts` key.
    pub fn rename_script_fields(&mut self) {
        for script in self.content_scripts.iter_mut().flatten() {
            if let Some(ts) = script.ts.take() {
                script.js.get_or_insert_with(Vec::new).extend(ts);
            }
        }
    }

    /// Lists every path-valued field present, in extraction precedence.
    ///
    /// Order: service worker, content scripts (array order, `js` then `css`;
    /// `ts` entries are listed as the `js` slots they fold into), popup,
    /// options page, options UI page, icons, action icons.
    pub fn path_fields(&self) -> Vec<FieldId> {
        let mut fields = Vec::new();

        if self.service_worker().is_some() {
            fields.push(FieldId::ServiceWorker);
        }

        for (script, entry) in self.content_scripts.iter().flatten().enumerate() {
            let js_len = entry.js.as_ref().map_or(0, Vec::len)
                + entry.ts.as_ref().map_or(0, Vec::len);
            for index in 0..js_len {
                fields.push(FieldId::ContentScriptJs { script, index });
            }
            for index in 0..entry.css.as_ref().map_or(0, Vec::len) {
                fields.push(FieldId::ContentScriptCss { script, index });
            }
        }

        if self
            .action
            .as_ref()
            .and_then(|a| a.default_popup.as_ref())
            .is_some()
        {
            fields.push(FieldId::Popup);
        }
        if self.options_page.is_some() {
            fields.push(FieldId::OptionsPage);
        }
        if self
            .options_ui
            .as_ref()
            .and_then(|o| o.page.as_ref())
            .is_some()
        {
            fields.push(FieldId::OptionsUiPage);
        }

        if let Some(icons) = &self.icons {
            fields.extend(icons.field_ids(|size| FieldId::Icon { size }));
        }
        if let Some(icons) = self.action.as_ref().and_then(|a| a.default_icon.as_ref()) {
            fields.extend(icons.field_ids(|size| FieldId::ActionIcon { size }));
        }

        fields
    }

    /// Reads the value of a path-valued field.
    pub fn get(&self, field: &FieldId) -> Option<&str> {
        match field {
            FieldId::ServiceWorker => self.service_worker(),
            FieldId::ContentScriptJs { script, index } => self
                .content_script(*script)?
                .js
                .as_ref()?
                .get(*index)
                .map(String::as_str),
            FieldId::ContentScriptCss { script, index } => self
                .content_script(*script)?
                .css
                .as_ref()?
                .get(*index)
                .map(String::as_str),
            FieldId::Popup => self.action.as_ref()?.default_popup.as_deref(),
            FieldId::OptionsPage => self.options_page.as_deref(),
            FieldId::OptionsUiPage => self.options_ui.as_ref()?.page.as_deref(),
            FieldId::Icon { size } => self.icons.as_ref()?.get(size.as_deref()),
            FieldId::ActionIcon { size } => self
                .action
                .as_ref()?
                .default_icon
                .as_ref()?
                .get(size.as_deref()),
        }
    }

    /// Overwrites the value of an existing path-valued field.
    ///
    /// Returns false if the field is not present; fields are never created.
    pub fn set(&mut self, field: &FieldId, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = match field {
            FieldId::ServiceWorker => self
                .background
                .as_mut()
                .and_then(|b| b.service_worker.as_mut()),
            FieldId::ContentScriptJs { script, index } => self
                .content_scripts
                .as_mut()
                .and_then(|c| c.get_mut(*script))
                .and_then(|s| s.js.as_mut())
                .and_then(|js| js.get_mut(*index)),
            FieldId::ContentScriptCss { script, index } => self
                .content_scripts
                .as_mut()
                .and_then(|c| c.get_mut(*script))
                .and_then(|s| s.css.as_mut())
                .and_then(|css| css.get_mut(*index)),
            FieldId::Popup => self
                .action
                .as_mut()
                .and_then(|a| a.default_popup.as_mut()),
            FieldId::OptionsPage => self.options_page.as_mut(),
            FieldId::OptionsUiPage => self.options_ui.as_mut().and_then(|o| o.page.as_mut()),
            FieldId::Icon { size } => {
                return match self.icons.as_mut() {
                    Some(icons) => icons.set(size.as_deref(), value),
                    None => false,
                };
            }
            FieldId::ActionIcon { size } => {
                return match self.action.as_mut().and_then(|a| a.default_icon.as_mut()) {
                    Some(icons) => icons.set(size.as_deref(), value),
                    None => false,
                };
            }
        };

        match slot {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn content_script(&self, index: usize) -> Option<&ContentScript> {
        self.content_scripts.as_ref()?.get(index)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}
