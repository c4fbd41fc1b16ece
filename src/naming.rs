//! Wire naming: case transform and pluralization.
//!
//! All naming goes through an immutable [`NamingConfig`]. Record types get
//! their resource type name from `pluralize(jsonify(TypeName))`, fields get
//! their wire name from `jsonify(field_name)`.
//!
//! | Input | `jsonify` | `pluralize` |
//! |-------|-----------|-------------|
//! | `SimplePost` | `simplePost` | `simplePosts` |
//! | `Category` | `category` | `categories` |
//! | `HTTPRequest` | `httpRequest` | `httpRequests` |
//! | `user_id` | `userID` | |

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

/// Initialisms kept upper-case after the first word of a snake_case name.
const DEFAULT_INITIALISMS: &[&str] = &[
    "ACL", "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID",
    "IP", "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SQL", "SSH", "TCP", "TLS",
    "TTL", "UDP", "UI", "UID", "UUID", "URI", "URL", "UTF8", "VM", "XML", "XMPP", "XSRF", "XSS",
];

const DEFAULT_IRREGULAR: &[(&str, &str)] = &[
    ("category", "categories"),
    ("child", "children"),
    ("criterion", "criteria"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("half", "halves"),
    ("index", "indices"),
    ("knife", "knives"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("man", "men"),
    ("matrix", "matrices"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("person", "people"),
    ("quiz", "quizzes"),
    ("tooth", "teeth"),
    ("vertex", "vertices"),
    ("wife", "wives"),
    ("woman", "women"),
];

const DEFAULT_UNCOUNTABLE: &[&str] = &[
    "data",
    "deer",
    "equipment",
    "feedback",
    "fish",
    "information",
    "media",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "software",
    "species",
];

/// Naming tables used by the type inspector.
///
/// Constructed once and never mutated afterwards; the `with_*` methods
/// consume and return the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    /// Stored upper-case.
    initialisms: BTreeSet<String>,
    /// Lower-case singular → lower-case plural.
    irregular: BTreeMap<String, String>,
    /// Stored lower-case.
    uncountable: BTreeSet<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            initialisms: DEFAULT_INITIALISMS.iter().map(|s| s.to_string()).collect(),
            irregular: DEFAULT_IRREGULAR
                .iter()
                .map(|(s, p)| (s.to_string(), p.to_string()))
                .collect(),
            uncountable: DEFAULT_UNCOUNTABLE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Additions to the default naming tables, as read from a JSON file.
///
/// ```json
/// {
///   "initialisms": ["SKU"],
///   "irregular": { "cactus": "cacti" },
///   "uncountable": ["furniture"]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingOverrides {
    pub initialisms: Vec<String>,
    pub irregular: BTreeMap<String, String>,
    pub uncountable: Vec<String>,
}

impl NamingConfig {
    /// Add an initialism (case-insensitive).
    pub fn with_initialism(mut self, initialism: &str) -> Self {
        self.initialisms.insert(initialism.to_uppercase());
        self
    }

    /// Add an irregular singular/plural pair (case-insensitive).
    pub fn with_irregular(mut self, singular: &str, plural: &str) -> Self {
        self.irregular
            .insert(singular.to_lowercase(), plural.to_lowercase());
        self
    }

    /// Add a noun whose plural equals its singular.
    pub fn with_uncountable(mut self, word: &str) -> Self {
        self.uncountable.insert(word.to_lowercase());
        self
    }

    /// Default tables extended with `overrides`.
    pub fn with_overrides(self, overrides: NamingOverrides) -> Self {
        let mut config = self;
        for initialism in &overrides.initialisms {
            config = config.with_initialism(initialism);
        }
        for (singular, plural) in &overrides.irregular {
            config = config.with_irregular(singular, plural);
        }
        for word in &overrides.uncountable {
            config = config.with_uncountable(word);
        }
        config
    }

    /// Parse naming overrides from a JSON string and apply them to the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the string isn't a valid overrides object.
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let overrides: NamingOverrides = serde_json::from_str(content)?;
        Ok(Self::default().with_overrides(overrides))
    }

    pub fn is_initialism(&self, word: &str) -> bool {
        self.initialisms.contains(&word.to_uppercase())
    }

    /// Convert a Rust type or field name into its wire form.
    pub fn jsonify(&self, name: &str) -> String {
        if name.contains('_') {
            return self.camelize_snake(name);
        }
        if name.is_empty() || self.is_initialism(name) {
            return name.to_lowercase();
        }

        let chars: Vec<char> = name.chars().collect();
        let run = chars.iter().take_while(|c| c.is_uppercase()).count();
        let cut = match run {
            0 => return name.to_string(),
            n if n == chars.len() => n,
            // "HTTPRequest": the last capital of the run starts the next word
            n if chars[n].is_lowercase() && n > 1 => n - 1,
            n if chars[n].is_lowercase() => 1,
            n => n,
        };

        let mut out: String = chars[..cut].iter().flat_map(|c| c.to_lowercase()).collect();
        out.extend(&chars[cut..]);
        out
    }

    fn camelize_snake(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for (i, part) in name.split('_').filter(|p| !p.is_empty()).enumerate() {
            if i == 0 {
                out.push_str(&self.jsonify(part));
            } else if self.is_initialism(part) {
                out.push_str(&part.to_uppercase());
            } else {
                out.push_str(&capitalize(part));
            }
        }
        out
    }

    /// Pluralize the last camel-case word of `name`.
    pub fn pluralize(&self, name: &str) -> String {
        let split = name
            .char_indices()
            .filter(|(_, c)| c.is_uppercase())
            .map(|(i, _)| i)
            .last()
            .unwrap_or(0);
        let (head, tail) = name.split_at(split);
        format!("{}{}", head, self.pluralize_word(tail))
    }

    /// True if `name` is its own plural. Relationship names for which this
    /// holds are treated as to-many.
    pub fn is_plural(&self, name: &str) -> bool {
        self.pluralize(name) == name
    }

    /// Resource type name for a Rust type name: `SimplePost` → `simplePosts`.
    pub fn resource_type_name(&self, type_name: &str) -> String {
        self.pluralize(&self.jsonify(type_name))
    }

    fn pluralize_word(&self, word: &str) -> String {
        if word.is_empty() {
            return String::new();
        }

        let lower = word.to_lowercase();
        if self.uncountable.contains(&lower) || self.irregular.values().any(|p| *p == lower) {
            return word.to_string();
        }

        let plural = match self.irregular.get(&lower) {
            Some(plural) => plural.clone(),
            None => regular_plural(&lower),
        };

        if word.starts_with(|c: char| c.is_uppercase()) {
            capitalize(&plural)
        } else {
            plural
        }
    }
}

fn regular_plural(word: &str) -> String {
    if word.ends_with("ss") || word.ends_with("us") {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix("is") {
        return format!("{}es", stem);
    }
    if word.ends_with('s') {
        // Already plural
        return word.to_string();
    }
    if word.ends_with('x') || word.ends_with('z') || word.ends_with("ch") || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.is_empty() && !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
