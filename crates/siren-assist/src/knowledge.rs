//! The static emergency knowledge base.
//!
//! A category → (key → context) map loaded from JSON. Lookup is a simple
//! keyword match: the query is lower-cased and each key (underscores read
//! as spaces) is tested as a substring, walking categories in a fixed
//! priority order. The first hit supplies the context string prepended to
//! the chat-completion prompt; no hit means no context, which is fine.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::AssistError;

/// Category priority, most specific service first.
pub const CATEGORY_PRIORITY: [&str; 5] = [
    "Ambulance Related Queries",
    "Fire Brigade Related Queries",
    "Police Related Queries",
    "Miscellaneous Serious Emergency Questions",
    "General Emergency Questions",
];

/// The loaded knowledge base.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
    categories: BTreeMap<String, BTreeMap<String, String>>,
}

impl KnowledgeBase {
    /// Parses a knowledge base from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, AssistError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a knowledge base from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, AssistError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Loads the knowledge base shipped with the crate.
    pub fn builtin() -> Result<Self, AssistError> {
        Self::from_json_str(include_str!("../data/knowledge_base.json"))
    }

    /// Returns the number of entries across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Returns true when no entries are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the context for a query, honoring category priority.
    #[must_use]
    pub fn context_for(&self, query: &str) -> Option<&str> {
        let clean_query = query.to_lowercase();

        for category in CATEGORY_PRIORITY {
            let Some(entries) = self.categories.get(category) else {
                continue;
            };
            for (key, context) in entries {
                let search_term = key.to_lowercase().replace('_', " ");
                if clean_query.contains(&search_term) {
                    tracing::debug!(category, key, "knowledge base match");
                    return Some(context);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KnowledgeBase {
        KnowledgeBase::from_json_str(
            r#"{
                "Ambulance Related Queries": {
                    "book_an_ambulance": "ambulance context"
                },
                "Police Related Queries": {
                    "report_a_theft": "police context"
                },
                "General Emergency Questions": {
                    "ambulance": "general ambulance context",
                    "emergency_number": "general context"
                }
            }"#,
        )
        .expect("sample parses")
    }

    #[test]
    fn keys_match_with_underscores_as_spaces() {
        let kb = sample();
        assert_eq!(
            kb.context_for("How do I book an ambulance quickly?"),
            Some("ambulance context")
        );
        assert_eq!(
            kb.context_for("what is the EMERGENCY NUMBER here"),
            Some("general context")
        );
    }

    #[test]
    fn category_priority_wins_over_later_matches() {
        let kb = sample();
        // "book an ambulance" matches both the ambulance category and the
        // general "ambulance" key; the ambulance category is checked first.
        assert_eq!(
            kb.context_for("please book an ambulance"),
            Some("ambulance context")
        );
    }

    #[test]
    fn no_match_yields_no_context() {
        let kb = sample();
        assert_eq!(kb.context_for("what is the weather like"), None);
    }

    #[test]
    fn builtin_knowledge_base_parses_and_covers_all_categories() {
        let kb = KnowledgeBase::builtin().expect("builtin parses");
        assert!(!kb.is_empty());
        assert!(kb.context_for("how do I book an ambulance").is_some());
        assert!(kb.context_for("there is a fire in my building").is_some());
    }
}
