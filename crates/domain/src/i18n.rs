//! Localized text maps (language code -> text).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A map from language code ("en", "ru", ...) to localized text for one field.
///
/// Ordering is stable (BTreeMap) so serialized payloads round-trip exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, lang: impl Into<String>, text: impl Into<String>) {
        self.0.insert(lang.into(), text.into());
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Languages from `required` that are absent or map to blank text.
    pub fn missing_languages<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|lang| {
                self.get(lang)
                    .map(|text| text.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(String::as_str)
            .collect()
    }

    /// Any entry whose text is blank after trimming.
    pub fn blank_entries(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Preferred display text: `lang` first, then "en", then any entry.
    pub fn display(&self, lang: &str) -> Option<&str> {
        self.get(lang)
            .or_else(|| self.get("en"))
            .or_else(|| self.0.values().next().map(String::as_str))
    }
}

impl<const N: usize> From<[(&str, &str); N]> for LocalizedText {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut map = Self::new();
        for (lang, text) in pairs {
            map.insert(lang, text);
        }
        map
    }
}
