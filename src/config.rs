//! Engine configuration.
//!
//! An [`EngineConfig`] is an immutable value passed to each engine at
//! construction time; there is no ambient global state. It deserializes
//! from TOML or JSON so applications can keep it in their config files.

use serde::Deserialize;
use serde::de::Deserializer;

/// Search-mode flags recognized by the search compiler.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Wrap the whole keyword once in wildcards (`%kw%`).
    pub smart: bool,
    pub case_insensitive: bool,
    /// Interleave a wildcard between every keyword character (`%a%b%`).
    pub use_wildcards: bool,
    /// Split the keyword on whitespace; every term must match.
    pub multi_term: bool,
    /// Anchor at the start (`kw%`). Wins over `smart`.
    pub starts_with: bool,
    /// Strip combining diacritics from both sides before comparing.
    pub ignore_accents: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            smart: true,
            case_insensitive: true,
            use_wildcards: false,
            multi_term: true,
            starts_with: false,
            ignore_accents: false,
        }
    }
}

/// Search/order eligibility whitelist: everything, or a fixed set.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Whitelist {
    Wildcard(String),
    Names(Vec<String>),
}

impl Default for Whitelist {
    fn default() -> Self {
        Whitelist::Wildcard("*".into())
    }
}

impl Whitelist {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Whitelist::Wildcard(w) => w == "*",
            Whitelist::Names(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Column eligibility policy.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ColumnPolicy {
    /// Columns never searched or ordered, whatever the request says.
    pub blacklist: Vec<String>,
    /// `"*"` or the set of columns eligible for search/order.
    pub whitelist: Whitelist,
}

/// What to do when a backend execution error reaches the `make()` boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Re-throw so the caller's own error handling reports it.
    Throw,
    /// Embed the exception message in the envelope's `error` field.
    #[default]
    Echo,
    /// Embed this fixed message instead of the exception's.
    Message(String),
}

impl<'de> Deserialize<'de> for ErrorPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            None => ErrorPolicy::Echo,
            Some("throw") => ErrorPolicy::Throw,
            Some(msg) => ErrorPolicy::Message(msg.to_owned()),
        })
    }
}

fn default_index_column() -> String {
    "DT_RowIndex".into()
}

/// Per-engine configuration. One value per engine, fixed for its lifetime.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub columns: ColumnPolicy,
    /// Name of the synthetic row-index column, when one is requested.
    pub index_column: String,
    pub error: ErrorPolicy,
    /// Dialect template for null-last ordering, e.g. `"%s %s NULLS LAST"`.
    /// The first `%s` receives the column, the second the direction.
    pub nulls_last_sql: Option<String>,
    /// Attach executed queries and the raw input to the response.
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            columns: ColumnPolicy::default(),
            index_column: default_index_column(),
            error: ErrorPolicy::default(),
            nulls_last_sql: None,
            debug: false,
        }
    }
}
