//! Source path to output path registry.

use std::collections::HashMap;

use crate::paths::to_posix;

/// Maps original source paths to output-relative paths.
///
/// One registry belongs to one pipeline run. Keys are stored in forward-slash
/// form, so lookups are insensitive to the host separator. The first mapping
/// recorded for a key wins: a file is bundled or copied once, and every field
/// referencing it resolves to the same output.
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
    entries: HashMap<String, String>,
}

impl PathRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `source -> output` unless `source` is already registered.
    ///
    /// Returns the output path now associated with `source`.
    pub fn insert(&mut self, source: &str, output: impl Into<String>) -> &str {
        self.entries
            .entry(to_posix(source))
            .or_insert_with(|| to_posix(&output.into()))
            .as_str()
    }

    /// Registers several addressable forms of one source file.
    pub fn insert_aliases<I, S>(&mut self, forms: I, output: &str)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for form in forms {
            self.insert(form.as_ref(), output);
        }
    }

    /// Looks up the output path for a source path.
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(&to_posix(source)).map(String::as_str)
    }

    /// Returns true if `source` has been resolved.
    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(&to_posix(source))
    }

    /// Number of registered forms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all `(source, output)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mapping_wins() {
        let mut registry = PathRegistry::new();
        assert_eq!(registry.insert("/p/src/a.ts", "a.js"), "a.js");
        assert_eq!(registry.insert("/p/src/a.ts", "a-2.js"), "a.js");
        assert_eq!(registry.get("/p/src/a.ts"), Some("a.js"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_ignores_separator_style() {
        let mut registry = PathRegistry::new();
        registry.insert(r"C:\p\public\icon.png", r"public\icon.png");
        assert_eq!(registry.get("C:/p/public/icon.png"), Some("public/icon.png"));
        assert!(registry.contains(r"C:\p\public\icon.png"));
    }

    #[test]
    fn test_aliases_share_output() {
        let mut registry = PathRegistry::new();
        registry.insert_aliases(["/p/public/16.png", "public/16.png"], "public/16.png");
        assert_eq!(registry.get("/p/public/16.png"), Some("public/16.png"));
        assert_eq!(registry.get("public/16.png"), Some("public/16.png"));
        assert!(!registry.is_empty());
    }
}
