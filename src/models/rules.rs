// Rule-based classifiers
//
// Keyword triggers are case-sensitive regular expressions, optionally anchored
// at a word start. A document is positive when any trigger matches; the
// metadata then lists every trigger that fired and the character spans it
// matched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::contract::{Classifier, Metadata, ModelKind};
use super::keywords::KeywordDictionary;
use super::registry::ModelImplementation;
use crate::config::Config;
use crate::errors::{AnalyticsError, Result};
use crate::taxonomy::Sdg;

/// Compiled trigger set
#[derive(Debug, Clone)]
pub struct KeywordRules {
    keywords: Vec<String>,
    word_start: bool,
    patterns: Vec<Regex>,
}

impl KeywordRules {
    /// Each keyword is searched verbatim
    pub fn new(keywords: Vec<String>) -> Result<Self> {
        Self::compile(keywords, false)
    }

    /// Each keyword only matches where a word starts (`\b{keyword}`)
    pub fn word_start(keywords: Vec<String>) -> Result<Self> {
        Self::compile(keywords, true)
    }

    fn compile(keywords: Vec<String>, word_start: bool) -> Result<Self> {
        let patterns = keywords
            .iter()
            .map(|keyword| {
                if word_start {
                    Regex::new(&format!(r"\b{}", keyword))
                } else {
                    Regex::new(keyword)
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            keywords,
            word_start,
            patterns,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// 1 plus `keyword_matches`/`spans` when any trigger fires, else 0 and no metadata
    pub fn evaluate(&self, text: &str) -> (u8, Metadata) {
        let mut matched = Vec::new();
        let mut spans = Vec::new();

        for (keyword, pattern) in self.keywords.iter().zip(&self.patterns) {
            let mut fired = false;
            for m in pattern.find_iter(text) {
                fired = true;
                let start = text[..m.start()].chars().count();
                let end = start + m.as_str().chars().count();
                spans.push(json!([start, end, keyword]));
            }
            if fired {
                matched.push(Value::String(keyword.clone()));
            }
        }

        if matched.is_empty() {
            return (0, Metadata::new());
        }

        let mut metadata = Metadata::new();
        metadata.insert("keyword_matches".to_string(), Value::Array(matched));
        metadata.insert("spans".to_string(), Value::Array(spans));
        (1, metadata)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RulesState {
    keywords: Vec<String>,
    #[serde(default)]
    word_start: bool,
}

fn rules_from_state(state: Value) -> Result<KeywordRules> {
    let state: RulesState = serde_json::from_value(state)
        .map_err(|e| AnalyticsError::Training(format!("invalid rules state: {}", e)))?;
    KeywordRules::compile(state.keywords, state.word_start)
}

fn rules_state(rules: &KeywordRules) -> Result<Value> {
    Ok(json!({ "keywords": rules.keywords(), "word_start": rules.word_start }))
}

/// Keyword dictionary matcher: the triggers are the dictionary's keywords for
/// the bound category
#[derive(Debug)]
pub struct KeywordDictionaryModel {
    rules: KeywordRules,
}

impl Classifier for KeywordDictionaryModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Rules
    }

    fn evaluate_rules(&self, text: &str) -> Result<(u8, Metadata)> {
        Ok(self.rules.evaluate(text))
    }

    fn state(&self) -> Result<Value> {
        rules_state(&self.rules)
    }
}

impl ModelImplementation for KeywordDictionaryModel {
    const NAME: &'static str = "keyword_dictionary";

    fn create(category: Sdg, config: &Config) -> Result<Self> {
        let path = config.models.keywords_path.as_ref().ok_or_else(|| {
            AnalyticsError::Config("models.keywords_path is not set".to_string())
        })?;
        let dictionary = KeywordDictionary::load(path)?;
        Ok(Self {
            rules: KeywordRules::new(dictionary.keywords(category))?,
        })
    }

    fn restore(_category: Sdg, state: Value) -> Result<Self> {
        Ok(Self {
            rules: rules_from_state(state)?,
        })
    }
}

const SUSTAIN_TRIGGER: &str = "sustain*";

/// Single `sustain*` trigger for No Poverty, anchored at a word start; never
/// fires for other categories
#[derive(Debug)]
pub struct StarsSustainModel {
    rules: KeywordRules,
}

impl Classifier for StarsSustainModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Rules
    }

    fn evaluate_rules(&self, text: &str) -> Result<(u8, Metadata)> {
        let (label, mut metadata) = self.rules.evaluate(text);
        if label == 1 {
            metadata.insert("sustainability_focused".to_string(), Value::Bool(true));
        }
        Ok((label, metadata))
    }

    fn state(&self) -> Result<Value> {
        rules_state(&self.rules)
    }
}

impl ModelImplementation for StarsSustainModel {
    const NAME: &'static str = "stars_sustain";

    fn create(category: Sdg, _config: &Config) -> Result<Self> {
        let keywords = match category {
            Sdg::NoPoverty => vec![SUSTAIN_TRIGGER.to_string()],
            _ => Vec::new(),
        };
        Ok(Self {
            rules: KeywordRules::word_start(keywords)?,
        })
    }

    fn restore(_category: Sdg, state: Value) -> Result<Self> {
        Ok(Self {
            rules: rules_from_state(state)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelRegistry;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sustain_trigger() {
        let rules = KeywordRules::new(vec!["sustain*".to_string()]).unwrap();

        let (label, metadata) = rules.evaluate("This course is about sustainable development.");
        assert_eq!(label, 1);
        assert_eq!(metadata["keyword_matches"], json!(["sustain*"]));
        assert_eq!(metadata["spans"], json!([[21, 28, "sustain*"]]));

        let (label, metadata) = rules.evaluate("This course is about accounting.");
        assert_eq!(label, 0);
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_spans_are_character_offsets() {
        let rules = KeywordRules::new(vec!["énergie".to_string()]).unwrap();
        let (_, metadata) = rules.evaluate("Écologie et énergie");
        assert_eq!(metadata["spans"], json!([[12, 19, "énergie"]]));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let rules = KeywordRules::new(vec!["poverty".to_string()]).unwrap();
        assert_eq!(rules.evaluate("urban poverty").0, 1);
        assert_eq!(rules.evaluate("Urban POVERTY").0, 0);
    }

    #[test]
    fn test_stars_sustain_needs_word_start() {
        let model = StarsSustainModel::create(Sdg::NoPoverty, &Config::default()).unwrap();

        let (label, metadata) = model
            .evaluate_rules("Critique of unsustainable growth models")
            .unwrap();
        assert_eq!(label, 0);
        assert!(metadata.is_empty());

        assert_eq!(model.evaluate_rules("SUSTAINABLE design").unwrap().0, 0);
        assert_eq!(model.evaluate_rules("sustainable design").unwrap().0, 1);
        assert_eq!(model.evaluate_rules("(sustainability)").unwrap().0, 1);
    }

    #[test]
    fn test_word_start_survives_restore() {
        let model = StarsSustainModel::create(Sdg::NoPoverty, &Config::default()).unwrap();
        let restored = StarsSustainModel::restore(Sdg::NoPoverty, model.state().unwrap()).unwrap();
        assert_eq!(restored.evaluate_rules("unsustainable").unwrap().0, 0);
        assert_eq!(restored.evaluate_rules("sustainable").unwrap().0, 1);
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let err = KeywordRules::new(vec!["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Pattern(_)));
    }

    #[test]
    fn test_stars_sustain_only_fires_for_no_poverty() {
        let config = Config::default();
        let text = "Courses on sustainability in engineering";

        let bound = StarsSustainModel::create(Sdg::NoPoverty, &config).unwrap();
        let (label, metadata) = bound.evaluate_rules(text).unwrap();
        assert_eq!(label, 1);
        assert_eq!(metadata["sustainability_focused"], json!(true));

        let other = StarsSustainModel::create(Sdg::ClimateAction, &config).unwrap();
        assert_eq!(other.evaluate_rules(text).unwrap().0, 0);
    }

    #[test]
    fn test_keyword_dictionary_requires_path() {
        let err = KeywordDictionaryModel::create(Sdg::CleanWater, &Config::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_keyword_dictionary_round_trip() {
        let dir = TempDir::new().unwrap();
        let keywords = dir.path().join("keywords.json");
        fs::write(
            &keywords,
            r#"[{"SDG": "SDG 6", "Keywords": "water, sanitation"}]"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.models.keywords_path = Some(keywords);

        let registry = ModelRegistry::with_builtin();
        let mut model = registry
            .create("keyword_dictionary", Sdg::CleanWater, &config)
            .unwrap();
        model.train(&[], &[]).unwrap();

        let artifact = dir.path().join("SDG 6__keyword_dictionary.json");
        model.persist(&artifact).unwrap();
        let restored = registry.restore(&artifact).unwrap();

        let text = "Drinking water treatment and sanitation systems";
        let prediction = restored.predict(text).unwrap();
        assert_eq!(prediction, model.predict(text).unwrap());
        assert_eq!(prediction.prediction, 1);
        assert_eq!(
            prediction.metadata["keyword_matches"],
            json!(["water", "sanitation"])
        );
    }
}
