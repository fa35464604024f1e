//! Catalog lookup with `{{var}}` substitution.
//!
//! Each language ships one JSON catalog compiled into the binary:
//!
//! ```text
//! {
//!   "common":    { "dbmeter": { "peak": "Peak", … }, … },
//!   "exercises": { "lip_trills": { "name": …, "instructions": …,
//!                                  "dos": [ … ], "donts": [ … ] }, … }
//! }
//! ```
//!
//! Keys are dotted paths.  A key starting with `exercises.` is looked up in
//! the `exercises` section, anything else in `common`.  A key that does not
//! resolve to a string comes back unchanged, so a missing translation shows
//! up on screen as its key.

use serde_json::Value;

use super::Language;
use crate::store::{KeyValueStore, SharedStore, StoreError, LANGUAGE_KEY};

const EXERCISES_PREFIX: &str = "exercises.";

/// Shown while an exercise has no instructions in the active catalog.
pub const INSTRUCTIONS_PLACEHOLDER: &str = "Instructions loading...";

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The parsed translation tables of one language.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    common: Value,
    exercises: Value,
}

impl Catalog {
    /// Parse a catalog document.  Malformed JSON yields an empty catalog.
    pub fn parse(source: &str) -> Self {
        match serde_json::from_str::<Value>(source) {
            Ok(mut doc) => {
                let mut section = |name: &str| doc.get_mut(name).map(Value::take).unwrap_or_default();
                Self {
                    common: section("common"),
                    exercises: section("exercises"),
                }
            }
            Err(e) => {
                log::error!("Translation catalog is not valid JSON: {e}");
                Self::default()
            }
        }
    }

    /// The bundled catalog for `language`.
    pub fn bundled(language: Language) -> Self {
        Self::parse(match language {
            Language::En => include_str!("../../locales/en.json"),
            Language::Et => include_str!("../../locales/et.json"),
        })
    }

    /// Walk a dotted key to its node, if any.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let (root, path) = match key.strip_prefix(EXERCISES_PREFIX) {
            Some(rest) => (&self.exercises, rest),
            None => (&self.common, key),
        };
        path.split('.')
            .try_fold(root, |node, part| node.get(part))
    }
}

/// Replace every `{{name}}` placeholder with its value.
pub fn interpolate(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_owned(), |text, (name, value)| {
        text.replace(&format!("{{{{{name}}}}}"), value)
    })
}

// ---------------------------------------------------------------------------
// ExerciseContent
// ---------------------------------------------------------------------------

/// Localized text of one exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseContent {
    pub name: String,
    pub instructions: String,
    pub dos: Vec<String>,
    pub donts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// The active language, its catalog, and the store the choice lives in.
pub struct Translator {
    language: Language,
    catalog: Catalog,
    store: SharedStore,
}

impl Translator {
    /// Pick the language (`forced`, then the saved choice, then the system
    /// locale, then English) and load its catalog.
    pub fn new(store: SharedStore, forced: Option<&str>) -> Self {
        let saved = store.get(LANGUAGE_KEY);
        let preferred = forced.or(saved.as_deref());
        let language = Language::resolve(preferred, Language::system_locale().as_deref());
        log::info!("Interface language: {}", language.code());
        Self {
            language,
            catalog: Catalog::bundled(language),
            store,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Switch language and remember the choice.
    ///
    /// The switch takes effect even when persisting fails.
    pub fn set_language(&mut self, language: Language) -> Result<(), StoreError> {
        if language != self.language {
            log::info!("Switching language to {}", language.code());
            self.language = language;
            self.catalog = Catalog::bundled(language);
        }
        self.store.set(LANGUAGE_KEY, language.code())
    }

    /// Translate `key`; a miss returns the key.
    pub fn t(&self, key: &str) -> String {
        match self.catalog.lookup(key) {
            Some(Value::String(s)) => s.clone(),
            _ => {
                log::debug!("Missing translation for '{key}' ({})", self.language.code());
                key.to_owned()
            }
        }
    }

    /// Translate `key` and fill in `{{name}}` placeholders.
    pub fn t_with(&self, key: &str, vars: &[(&str, &str)]) -> String {
        interpolate(&self.t(key), vars)
    }

    /// The string items of a list-valued key, or empty.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.catalog.lookup(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Name, instructions and do/don't lists for an exercise id.
    pub fn exercise_content(&self, id: &str) -> ExerciseContent {
        let text = |field: &str| match self.catalog.lookup(&format!("{EXERCISES_PREFIX}{id}.{field}")) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        ExerciseContent {
            name: text("name").unwrap_or_else(|| id.to_owned()),
            instructions: text("instructions")
                .unwrap_or_else(|| INSTRUCTIONS_PLACEHOLDER.to_owned()),
            dos: self.list(&format!("{EXERCISES_PREFIX}{id}.dos")),
            donts: self.list(&format!("{EXERCISES_PREFIX}{id}.donts")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::routine::ROUTINES;
    use crate::store::MemoryStore;

    fn english() -> Translator {
        Translator::new(MemoryStore::shared(), Some("en"))
    }

    fn leaf_keys(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    leaf_keys(v, &format!("{prefix}.{k}"), out);
                }
            }
            _ => {
                out.insert(prefix.to_owned());
            }
        }
    }

    #[test]
    fn common_keys_resolve() {
        let t = english();
        assert_eq!(t.t("dbmeter.peak"), "Peak");
        assert_eq!(t.t("breathing.inhale"), "Inhale");
    }

    #[test]
    fn missing_key_returns_key() {
        let t = english();
        assert_eq!(t.t("dbmeter.nope"), "dbmeter.nope");
        assert_eq!(t.t(""), "");
        // Non-leaf nodes are not strings.
        assert_eq!(t.t("dbmeter"), "dbmeter");
    }

    #[test]
    fn exercises_prefix_reads_exercise_section() {
        let t = english();
        assert_eq!(t.t("exercises.lip_trills.name"), "Lip Trills");
        assert_eq!(t.t("lip_trills.name"), "lip_trills.name");
    }

    #[test]
    fn placeholders_are_filled() {
        let t = english();
        assert_eq!(
            t.t_with("timer.step_of", &[("current", "2"), ("total", "8")]),
            "Step 2 of 8"
        );
        assert_eq!(interpolate("{{a}} and {{a}}", &[("a", "x")]), "x and x");
        assert_eq!(interpolate("{{missing}}", &[]), "{{missing}}");
    }

    #[test]
    fn forced_language_wins_over_saved() {
        let store = MemoryStore::shared();
        store.set(LANGUAGE_KEY, "en").unwrap();
        let t = Translator::new(store, Some("et"));
        assert_eq!(t.language(), Language::Et);
        assert_eq!(t.t("breathing.inhale"), "Sisse");
    }

    #[test]
    fn saved_language_is_used() {
        let store = MemoryStore::shared();
        store.set(LANGUAGE_KEY, "et").unwrap();
        assert_eq!(Translator::new(store, None).language(), Language::Et);
    }

    #[test]
    fn set_language_persists_and_reloads() {
        let store = MemoryStore::shared();
        let mut t = Translator::new(store.clone(), Some("en"));
        t.set_language(Language::Et).unwrap();
        assert_eq!(store.get(LANGUAGE_KEY).as_deref(), Some("et"));
        assert_eq!(t.t("dbmeter.peak"), "Tipp");
        assert_eq!(Translator::new(store, None).language(), Language::Et);
    }

    #[test]
    fn exercise_content_with_fallbacks() {
        let t = english();
        let c = t.exercise_content("lip_trills");
        assert_eq!(c.name, "Lip Trills");
        assert_eq!(c.dos.len(), 2);
        assert_eq!(c.donts.len(), 2);

        let unknown = t.exercise_content("handstand");
        assert_eq!(unknown.name, "handstand");
        assert_eq!(unknown.instructions, INSTRUCTIONS_PLACEHOLDER);
        assert!(unknown.dos.is_empty());
        assert!(unknown.donts.is_empty());
    }

    #[test]
    fn every_catalog_exercise_has_content() {
        for language in Language::ALL {
            let t = Translator::new(MemoryStore::shared(), Some(language.code()));
            for exercise in ROUTINES.iter().flat_map(|r| r.exercises.iter()) {
                let c = t.exercise_content(exercise.id);
                assert_ne!(c.name, exercise.id, "{} in {}", exercise.id, language.code());
                assert_ne!(c.instructions, INSTRUCTIONS_PLACEHOLDER);
                assert!(!c.dos.is_empty());
            }
        }
    }

    #[test]
    fn catalogs_share_key_sets() {
        let keys = |src: &str| {
            let doc: Value = serde_json::from_str(src).unwrap();
            let mut out = BTreeSet::new();
            leaf_keys(&doc, "", &mut out);
            out
        };
        assert_eq!(
            keys(include_str!("../../locales/en.json")),
            keys(include_str!("../../locales/et.json"))
        );
    }

    #[test]
    fn malformed_catalog_is_empty() {
        let c = Catalog::parse("{ not json");
        assert!(c.lookup("dbmeter.peak").is_none());
    }
}
