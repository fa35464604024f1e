//! Supported interface languages and how the active one is chosen.
//!
//! ```text
//! saved choice ──▶ system locale ──▶ English
//! ```

use std::env;
use std::fmt;

/// An interface language with a bundled catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    Et,
}

impl Language {
    /// Every supported language, in menu order.
    pub const ALL: [Language; 2] = [Language::En, Language::Et];

    pub const DEFAULT: Language = Language::En;

    /// Two-letter code used for persistence.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Et => "et",
        }
    }

    /// The language's own name for itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Et => "Eesti",
        }
    }

    /// Parse a code or locale tag such as `et`, `et-EE` or `et_EE.UTF-8`.
    ///
    /// Only the primary subtag is considered; matching ignores case.
    pub fn from_code(code: &str) -> Option<Language> {
        let primary = code
            .trim()
            .split(|c: char| c == '-' || c == '_' || c == '.' || c == '@')
            .next()
            .unwrap_or_default();
        Language::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(primary))
    }

    /// Pick the active language: a valid saved code wins, then a supported
    /// system locale, then [`Language::DEFAULT`].
    pub fn resolve(saved: Option<&str>, system: Option<&str>) -> Language {
        saved
            .and_then(Language::from_code)
            .or_else(|| system.and_then(Language::from_code))
            .unwrap_or(Language::DEFAULT)
    }

    /// The locale tag from the environment (`LC_ALL`, `LC_MESSAGES`, `LANG`).
    pub fn system_locale() -> Option<String> {
        first_locale(["LC_ALL", "LC_MESSAGES", "LANG"].map(|k| env::var(k).ok()))
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::DEFAULT
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native_name())
    }
}

/// First non-empty locale value; `C` and `POSIX` carry no language.
fn first_locale<I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    values
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .filter(|v| v != "C" && v != "POSIX" && !v.starts_with("C."))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_and_locale_tags() {
        assert_eq!(Language::from_code("et"), Some(Language::Et));
        assert_eq!(Language::from_code("ET"), Some(Language::Et));
        assert_eq!(Language::from_code("et-EE"), Some(Language::Et));
        assert_eq!(Language::from_code("et_EE.UTF-8"), Some(Language::Et));
        assert_eq!(Language::from_code("en_GB"), Some(Language::En));
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::from_code(""), None);
    }

    #[test]
    fn saved_choice_wins() {
        assert_eq!(Language::resolve(Some("et"), Some("en_US")), Language::Et);
    }

    #[test]
    fn invalid_saved_choice_falls_through_to_system() {
        assert_eq!(Language::resolve(Some("xx"), Some("et_EE")), Language::Et);
        assert_eq!(Language::resolve(None, Some("et")), Language::Et);
    }

    #[test]
    fn unsupported_everything_defaults_to_english() {
        assert_eq!(Language::resolve(None, None), Language::En);
        assert_eq!(Language::resolve(Some("de"), Some("fr_FR")), Language::En);
    }

    #[test]
    fn locale_lookup_skips_empty_and_c() {
        let pick = |v: [Option<&str>; 3]| first_locale(v.map(|s| s.map(String::from)));
        assert_eq!(pick([None, Some(""), Some("et_EE.UTF-8")]), Some("et_EE.UTF-8".into()));
        assert_eq!(pick([Some("C"), None, Some("et")]), None);
        assert_eq!(pick([None, None, None]), None);
    }

    #[test]
    fn codes_and_names() {
        assert_eq!(Language::Et.code(), "et");
        assert_eq!(Language::Et.to_string(), "Eesti");
        assert_eq!(Language::default(), Language::En);
    }
}
