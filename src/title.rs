//! Display-title selection for catalog entries
//!
//! Series and groups come back from the server with a `name` plus a list of
//! localized titles. The title shown to the user is chosen by walking a
//! fallback chain from the preferred language and type down to `name`.

use serde::Deserialize;

/// Names that describe an episode-type listing rather than a series
const TYPE_LIST_NAMES: &[&str] = &[
    "ova", "ovas", "episode", "episodes", "special", "specials", "parody", "parodies", "credit",
    "credits", "trailer", "trailers", "other", "others",
];

/// A JSON node carrying a server name and optional localized titles
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitledNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub titles: Option<Vec<TitleTag>>,
}

/// One localized title as sent by the server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleTag {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Language", default)]
    pub language: String,
    #[serde(rename = "Type", default)]
    pub title_type: String,
}

/// User preferences for title display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePreference {
    /// Preferred language code, e.g. `en`
    pub language: String,
    /// Preferred title type, e.g. `official`
    pub title_type: String,
    /// Always show the server's own name
    pub use_server_title: bool,
}

impl Default for TitlePreference {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            title_type: "official".to_string(),
            use_server_title: false,
        }
    }
}

/// Whether `name` is an episode-type listing such as "Specials"
pub fn is_type_list(name: &str) -> bool {
    let lower = name.to_lowercase();
    TYPE_LIST_NAMES.contains(&lower.as_str())
}

/// Finds the first non-empty title in `lang` whose type matches `title_type`.
///
/// A `title_type` starting with `!` matches every type except the named one.
/// Comparisons ignore case.
pub fn match_title<'a>(titles: &'a [TitleTag], lang: &str, title_type: &str) -> Option<&'a str> {
    let (exclude, wanted) = match title_type.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, title_type),
    };

    titles
        .iter()
        .filter(|tag| !tag.title.is_empty())
        .filter(|tag| tag.language.eq_ignore_ascii_case(lang))
        .find(|tag| tag.title_type.eq_ignore_ascii_case(wanted) != exclude)
        .map(|tag| tag.title.as_str())
}

/// Picks the display title for `node`.
///
/// Order: preferred language and type, then any non-short title in the
/// preferred language, then the romaji (`x-jat`) main title, then `name`.
pub fn select_title(node: &TitledNode, preference: &TitlePreference) -> String {
    let titles = match &node.titles {
        Some(titles) if !preference.use_server_title => titles,
        _ => return node.name.clone(),
    };

    if is_type_list(&node.name) {
        return node.name.clone();
    }

    match_title(titles, &preference.language, &preference.title_type)
        .or_else(|| match_title(titles, &preference.language, "!short"))
        .or_else(|| match_title(titles, "x-jat", "main"))
        .map(str::to_string)
        .unwrap_or_else(|| node.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIES_JSON: &str = r#"{
        "name": "Shinseiki Evangelion",
        "titles": [
            {"Title": "Shinseiki Evangelion", "Language": "x-jat", "Type": "main"},
            {"Title": "Eva", "Language": "en", "Type": "short"},
            {"Title": "Neon Genesis Evangelion", "Language": "EN", "Type": "Official"},
            {"Title": "NGE", "Language": "en", "Type": "synonym"},
            {"Title": "", "Language": "de", "Type": "official"},
            {"Title": "Evangelion (de)", "Language": "de", "Type": "synonym"}
        ]
    }"#;

    fn series() -> TitledNode {
        serde_json::from_str(SERIES_JSON).expect("Fixture should parse")
    }

    fn preference(language: &str, title_type: &str) -> TitlePreference {
        TitlePreference {
            language: language.to_string(),
            title_type: title_type.to_string(),
            use_server_title: false,
        }
    }

    #[test]
    fn test_preferred_language_and_type_wins() {
        assert_eq!(
            select_title(&series(), &preference("en", "official")),
            "Neon Genesis Evangelion"
        );
    }

    #[test]
    fn test_falls_back_to_non_short_title_in_language() {
        assert_eq!(
            select_title(&series(), &preference("de", "official")),
            "Evangelion (de)",
            "Empty official title is skipped"
        );
    }

    #[test]
    fn test_falls_back_to_romaji_main_title() {
        assert_eq!(
            select_title(&series(), &preference("fr", "official")),
            "Shinseiki Evangelion"
        );
    }

    #[test]
    fn test_falls_back_to_name_without_titles() {
        let node = TitledNode {
            name: "Group A".to_string(),
            titles: None,
        };

        assert_eq!(select_title(&node, &TitlePreference::default()), "Group A");
    }

    #[test]
    fn test_falls_back_to_name_when_nothing_matches() {
        let node = TitledNode {
            name: "Server Name".to_string(),
            titles: Some(vec![TitleTag {
                title: "Titre".to_string(),
                language: "fr".to_string(),
                title_type: "short".to_string(),
            }]),
        };

        assert_eq!(select_title(&node, &TitlePreference::default()), "Server Name");
    }

    #[test]
    fn test_server_title_preference_returns_name() {
        let pref = TitlePreference {
            use_server_title: true,
            ..TitlePreference::default()
        };

        assert_eq!(select_title(&series(), &pref), "Shinseiki Evangelion");
    }

    #[test]
    fn test_type_list_names_are_kept() {
        let node = TitledNode {
            name: "Specials".to_string(),
            titles: Some(vec![TitleTag {
                title: "Something Else".to_string(),
                language: "en".to_string(),
                title_type: "official".to_string(),
            }]),
        };

        assert_eq!(select_title(&node, &TitlePreference::default()), "Specials");
    }

    #[test]
    fn test_is_type_list() {
        assert!(is_type_list("OVA"));
        assert!(is_type_list("episodes"));
        assert!(is_type_list("Credits"));
        assert!(!is_type_list("Cowboy Bebop"));
    }

    #[test]
    fn test_match_title_exclusion() {
        let node = series();
        let titles = node.titles.as_deref().unwrap();

        assert_eq!(match_title(titles, "en", "short"), Some("Eva"));
        assert_eq!(match_title(titles, "en", "!short"), Some("Neon Genesis Evangelion"));
        assert_eq!(match_title(titles, "ja", "main"), None);
    }
}
