//! Tiered keyword classification of candidate posts.
//!
//! Matching is case-insensitive against the tables in [`ClassifierRules`].
//! Exclusion phrases match anywhere in the text, so `"fuck"` also catches
//! `"fucking"`. Inclusion phrases, topic keywords and restricted subjects only
//! match whole words (a trailing plural `s` is allowed), so `"just"` does not fire
//! on `"adjust"` and `"actor"` does not fire on `"risk factor"`.
//!
//! Exclusions always win over inclusion tiers, and tiers are tried from the
//! highest priority down; the first match decides.

use log::debug;

/// Reason string for a post rejected by the exclusion list.
pub const REASON_BLACKLISTED: &str = "blacklisted";
/// Reason string for a post that matched no inclusion tier.
pub const REASON_NO_TOPICAL_MATCH: &str = "no topical match";

/// Outcome of classifying one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub accepted: bool,
    /// Higher means more urgent; 0 for rejected posts.
    pub priority: u8,
    /// Name of the rule that fired.
    pub reason: String,
}

impl ClassificationResult {
    fn rejected(reason: &str) -> Self {
        ClassificationResult {
            accepted: false,
            priority: 0,
            reason: reason.to_string(),
        }
    }
}

/// How a tier decides it matches.
#[derive(Debug, Clone)]
pub enum TierMatch {
    /// Any phrase appears.
    AnyPhrase(Vec<String>),
    /// Any phrase appears together with any topic keyword.
    WithTopic(Vec<String>),
}

/// One inclusion tier.
#[derive(Debug, Clone)]
pub struct Tier {
    pub priority: u8,
    pub name: String,
    pub rule: TierMatch,
}

/// The rule tables the classifier runs on. All phrases are stored lower-cased.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    pub blacklist: Vec<String>,
    pub topic_keywords: Vec<String>,
    /// Sorted by descending priority.
    pub tiers: Vec<Tier>,
    pub restricted_subjects: Vec<String>,
}

fn lowered(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| p.to_lowercase()).collect()
}

const BLACKLIST: &[&str] = &[
    // abuse and profanity
    "you are a cancer", "low iq", "bitch", "fuck", "shove it", "horse mommy", "motherfucker",
    "brain dead", "dipshit", "retard", "dumbass", "cunt",
    // hate speech and inflammatory topics
    "racist", "black people", "nazis", "jews", "israel", "hamas", "muslims", "zionist",
    "verwoed", "tereblanch",
    // politics
    "trump", "biden", "maga", "democrats", "republicans", "election",
    // unrelated uses of the word
    "cancer culture", "cancel culture", "zodiac", "horoscope", "cancer season", "crypto",
];

const SURVIVOR_PHRASES: &[&str] = &[
    "cancer survivor", "i beat cancer", "she beat cancer", "he beat cancer", "cancer free",
    "cancer-free", "in remission", "years ago", "anniversary", "survivorship",
];

const TOPIC_KEYWORDS: &[&str] = &[
    "cancer", "chemo", "chemotherapy", "radiation", "tumor", "tumour", "oncologist", "oncology",
    "metastatic", "malignant", "biopsy", "leukemia", "lymphoma", "carcinoma", "immunotherapy",
];

const JUST_HAPPENED: &[&str] = &[
    "just diagnosed", "just got diagnosed", "diagnosed today", "diagnosed yesterday",
    "results came back", "scan came back", "biopsy came back", "just found out",
    "got the call", "it's malignant", "its malignant",
];

const FIRST_PERSON: &[&str] = &[
    "i have cancer", "i've got cancer", "i was diagnosed", "i am in chemo", "i'm in chemo",
    "i'm on chemo", "i am on chemo", "starting chemo", "my chemo", "my tumor", "my tumour",
    "my cancer", "my oncologist", "my radiation", "my scan", "my biopsy",
];

const FAMILY: &[&str] = &[
    "my mom", "my mum", "my mother", "my dad", "my father", "my sister", "my brother",
    "my wife", "my husband", "my partner", "my son", "my daughter", "my friend",
    "my best friend", "my grandma", "my grandmother", "my grandpa", "my grandfather",
    "my aunt", "my uncle", "my cousin",
];

const RECENCY: &[&str] = &[
    "today", "yesterday", "tonight", "this morning", "last night", "this week", "recently",
    "right now", "just",
];

const RESTRICTED_SUBJECTS: &[&str] = &[
    "trump", "biden", "elon", "kardashian", "taylor swift", "celebrity", "president",
    "prime minister", "actor", "musician", "foxnews", "cnn", "@realdonaldtrump", "@potus",
    "@foxnews",
];

impl Default for ClassifierRules {
    fn default() -> Self {
        let mut tiers = vec![
            Tier {
                priority: 10,
                name: "just happened".to_string(),
                rule: TierMatch::AnyPhrase(lowered(JUST_HAPPENED)),
            },
            Tier {
                priority: 8,
                name: "first-person state".to_string(),
                rule: TierMatch::AnyPhrase(lowered(FIRST_PERSON)),
            },
            Tier {
                priority: 6,
                name: "family, recent".to_string(),
                rule: TierMatch::WithTopic(lowered(FAMILY)),
            },
            Tier {
                priority: 5,
                name: "time-qualified".to_string(),
                rule: TierMatch::WithTopic(lowered(RECENCY)),
            },
            Tier {
                priority: 3,
                name: "generic topical".to_string(),
                rule: TierMatch::AnyPhrase(lowered(TOPIC_KEYWORDS)),
            },
        ];
        tiers.sort_by(|a, b| b.priority.cmp(&a.priority));

        ClassifierRules {
            blacklist: lowered(BLACKLIST),
            topic_keywords: lowered(TOPIC_KEYWORDS),
            tiers,
            restricted_subjects: lowered(RESTRICTED_SUBJECTS),
        }
    }
}

impl ClassifierRules {
    /// Default tables plus survivor-story phrases on the exclusion list, so only
    /// recent diagnoses get through.
    pub fn recent_diagnosis_only() -> Self {
        let mut rules = Self::default();
        rules.blacklist.extend(lowered(SURVIVOR_PHRASES));
        rules
    }
}

/// Pure classifier over a fixed rule set.
#[derive(Debug, Clone, Default)]
pub struct ContentClassifier {
    rules: ClassifierRules,
}

impl ContentClassifier {
    pub fn new(mut rules: ClassifierRules) -> Self {
        rules.tiers.sort_by(|a, b| b.priority.cmp(&a.priority));
        ContentClassifier { rules }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Classifies `text`: exclusion list first, then tiers from highest priority.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let text = text.to_lowercase();

        if let Some(hit) = first_substring(&text, &self.rules.blacklist) {
            debug!("Excluded by blacklisted phrase '{}'", hit);
            return ClassificationResult::rejected(REASON_BLACKLISTED);
        }

        let has_topic = first_match(&text, &self.rules.topic_keywords).is_some();
        for tier in &self.rules.tiers {
            let matched = match &tier.rule {
                TierMatch::AnyPhrase(phrases) => first_match(&text, phrases).is_some(),
                TierMatch::WithTopic(phrases) => {
                    has_topic && first_match(&text, phrases).is_some()
                }
            };
            if matched {
                return ClassificationResult {
                    accepted: true,
                    priority: tier.priority,
                    reason: tier.name.clone(),
                };
            }
        }

        ClassificationResult::rejected(REASON_NO_TOPICAL_MATCH)
    }

    /// `true` when `text` names a public figure or brand on the restricted list.
    pub fn mentions_restricted_subject(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        first_match(&text, &self.rules.restricted_subjects).is_some()
    }
}

fn first_substring<'a>(text: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases
        .iter()
        .find(|p| text.contains(p.as_str()))
        .map(String::as_str)
}

fn first_match<'a>(text: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases
        .iter()
        .find(|p| contains_words(text, p))
        .map(String::as_str)
}

/// `true` when `phrase` occurs in `text` bounded by non-alphanumeric characters.
/// One `s` directly after the phrase is skipped before the boundary test.
pub fn contains_words(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let mut rest = text[start + matched.len()..].chars();
        let after = match rest.next() {
            Some('s') => rest.next(),
            other => other,
        };
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
