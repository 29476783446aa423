//! The search compiler.
//!
//! Turns a raw keyword plus search-mode flags into either an in-memory
//! predicate or a dialect-aware SQL fragment. Both paths share the same
//! keyword shaping, so the same [`SearchSpec`] selects the same logical rows
//! whichever engine runs it.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::SearchConfig;
use crate::dialect::Dialect;
use crate::error::{GridError, Result};
use crate::sql::Sql;

/// Search-mode flags for one compilation, derived once per request from
/// configuration plus per-invocation overrides.
#[derive(Clone, Debug)]
pub struct SearchSpec {
    pub keyword: String,
    pub case_insensitive: bool,
    pub smart: bool,
    pub use_wildcards: bool,
    pub starts_with: bool,
    pub multi_term: bool,
    pub ignore_accents: bool,
    pub is_regex: bool,
}

impl SearchSpec {
    pub fn new(config: &SearchConfig, keyword: impl Into<String>, is_regex: bool) -> Self {
        Self {
            keyword: keyword.into(),
            case_insensitive: config.case_insensitive,
            smart: config.smart,
            use_wildcards: config.use_wildcards,
            starts_with: config.starts_with,
            multi_term: config.multi_term,
            ignore_accents: config.ignore_accents,
            is_regex,
        }
    }

    /// Per-invocation smart-wildcard override.
    pub fn smart(mut self, on: bool) -> Self {
        self.smart = on;
        self
    }

    /// The terms to match. Multi-term mode splits on whitespace with AND
    /// semantics across terms; regex keywords are never split.
    pub fn terms(&self) -> Vec<&str> {
        if self.multi_term && !self.is_regex {
            self.keyword.split_whitespace().collect()
        } else {
            vec![self.keyword.trim()]
        }
    }
}

/// Strips combining diacritics after Unicode decomposition, so `"São"`
/// compares equal to `"Sao"`.
pub fn strip_accents(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Folds a value the way the spec's flags ask: accents first, then case.
pub fn fold(value: &str, spec: &SearchSpec) -> String {
    let value = if spec.ignore_accents {
        strip_accents(value)
    } else {
        value.to_owned()
    };
    if spec.case_insensitive {
        value.to_lowercase()
    } else {
        value
    }
}

/// Shapes one term into its LIKE pattern: wildcards interleaved per
/// character, anchored at the start, or wrapped once.
pub fn shape_like(term: &str, spec: &SearchSpec) -> String {
    let term = fold(term, spec);
    if spec.use_wildcards {
        let mut shaped = String::with_capacity(term.len() * 2 + 1);
        shaped.push('%');
        for c in term.chars() {
            shaped.push(c);
            shaped.push('%');
        }
        shaped
    } else if spec.starts_with {
        format!("{term}%")
    } else if spec.smart {
        format!("%{term}%")
    } else {
        term
    }
}

/// Translates a LIKE pattern into an anchored regex, for the in-memory path.
fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// A compiled single-term predicate for the in-memory engine.
#[derive(Debug)]
pub struct TermMatcher {
    re: Regex,
    fold_accents: bool,
    fold_case: bool,
}

impl TermMatcher {
    /// Compiles one term. A malformed user regex is a recoverable request
    /// error, not an engine fault.
    pub fn compile(term: &str, spec: &SearchSpec) -> Result<Self> {
        if spec.is_regex {
            let pattern = if spec.ignore_accents {
                strip_accents(term)
            } else {
                term.to_owned()
            };
            let pattern = if spec.case_insensitive {
                format!("(?i){pattern}")
            } else {
                pattern
            };
            let re = Regex::new(&pattern)
                .map_err(|e| GridError::BadRequest(format!("invalid search regex: {e}")))?;
            Ok(Self {
                re,
                fold_accents: spec.ignore_accents,
                fold_case: false,
            })
        } else {
            let re = Regex::new(&like_to_regex(&shape_like(term, spec)))
                .map_err(|e| GridError::BadRequest(format!("invalid search keyword: {e}")))?;
            Ok(Self {
                re,
                fold_accents: spec.ignore_accents,
                fold_case: spec.case_insensitive,
            })
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        let value = if self.fold_accents {
            strip_accents(value)
        } else {
            value.to_owned()
        };
        let value = if self.fold_case {
            value.to_lowercase()
        } else {
            value
        };
        self.re.is_match(&value)
    }
}

/// Compiles every term of the spec into in-memory matchers.
pub fn matchers(spec: &SearchSpec) -> Result<Vec<TermMatcher>> {
    spec.terms()
        .into_iter()
        .map(|t| TermMatcher::compile(t, spec))
        .collect()
}

/// The column expression a LIKE comparison operates on: cast to text where
/// the dialect requires it, unaccented on dialects that can, lowered when
/// case-insensitive.
fn column_expr(column: Sql, spec: &SearchSpec, dialect: Dialect) -> Sql {
    let mut expr = column;
    if let Some((open, close)) = dialect.text_cast() {
        expr = Sql::raw(open).append(expr).append_raw(close);
    }
    if spec.ignore_accents && dialect == Dialect::Postgres {
        expr = Sql::raw("unaccent(").append(expr).append_raw(")");
    }
    if spec.case_insensitive {
        expr = Sql::raw("LOWER(").append(expr).append_raw(")");
    }
    expr
}

/// Compiles one term against one column for the SQL engines.
pub fn compile_column(column: Sql, term: &str, spec: &SearchSpec, dialect: Dialect) -> Sql {
    if spec.is_regex {
        regex_fragment(column, term, spec, dialect)
    } else {
        column_expr(column, spec, dialect)
            .append_raw(" LIKE ")
            .push_param(shape_like(term, spec))
    }
}

/// The dialect-specific regex predicate.
fn regex_fragment(column: Sql, pattern: &str, spec: &SearchSpec, dialect: Dialect) -> Sql {
    match dialect {
        Dialect::Oracle | Dialect::Firebird => {
            let mode = if spec.case_insensitive { "i" } else { "c" };
            Sql::raw("REGEXP_LIKE(")
                .append(column)
                .append_raw(", ")
                .push_param(pattern)
                .append_raw(format!(", '{mode}')"))
        }
        Dialect::Postgres => {
            let op = if spec.case_insensitive { " ~* " } else { " ~ " };
            column.append_raw(op).push_param(pattern)
        }
        Dialect::MySql | Dialect::Sqlite => {
            if spec.case_insensitive {
                Sql::raw("LOWER(")
                    .append(column)
                    .append_raw(") REGEXP ")
                    .push_param(pattern.to_lowercase())
            } else {
                column.append_raw(" REGEXP ").push_param(pattern)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(keyword: &str) -> SearchSpec {
        SearchSpec::new(&SearchConfig::default(), keyword, false)
    }

    #[test]
    fn smart_wraps_once() {
        assert_eq!(shape_like("rio", &spec("rio")), "%rio%");
    }

    #[test]
    fn wildcards_interleave() {
        let mut s = spec("ab");
        s.use_wildcards = true;
        assert_eq!(shape_like("ab", &s), "%a%b%");
    }

    #[test]
    fn starts_with_beats_smart() {
        let mut s = spec("rio");
        s.starts_with = true;
        assert_eq!(shape_like("rio", &s), "rio%");
    }

    #[test]
    fn accent_insensitive_matching() {
        let mut s = spec("sao");
        s.ignore_accents = true;
        let m = TermMatcher::compile("sao", &s).unwrap();
        assert!(m.matches("São Paulo"));

        let s = spec("sao");
        let m = TermMatcher::compile("sao", &s).unwrap();
        assert!(!m.matches("São Paulo"));
    }

    #[test]
    fn multi_term_splits_except_for_regex() {
        let s = spec("new york");
        assert_eq!(s.terms(), vec!["new", "york"]);

        let mut s = spec("new (york|jersey)");
        s.is_regex = true;
        assert_eq!(s.terms(), vec!["new (york|jersey)"]);
    }

    #[test]
    fn like_fragment_per_dialect() {
        let s = spec("rio");
        let sql = compile_column(Sql::ident("name"), "rio", &s, Dialect::Sqlite);
        let (text, params) = sql.render(Dialect::Sqlite);
        assert_eq!(text, r#"LOWER("name") LIKE ?"#);
        assert_eq!(params, vec![serde_json::Value::from("%rio%")]);

        let sql = compile_column(Sql::ident("name"), "rio", &s, Dialect::Postgres);
        let (text, _) = sql.render(Dialect::Postgres);
        assert_eq!(text, r#"LOWER(CAST("name" AS TEXT)) LIKE $1"#);
    }

    #[test]
    fn regex_fragment_per_dialect() {
        let mut s = spec("^rio");
        s.is_regex = true;

        let (text, _) =
            compile_column(Sql::ident("name"), "^Rio", &s, Dialect::Postgres).render(Dialect::Postgres);
        assert_eq!(text, r#""name" ~* $1"#);

        let (text, params) =
            compile_column(Sql::ident("name"), "^Rio", &s, Dialect::MySql).render(Dialect::MySql);
        assert_eq!(text, "LOWER(`name`) REGEXP ?");
        assert_eq!(params, vec![serde_json::Value::from("^rio")]);

        let (text, _) =
            compile_column(Sql::ident("name"), "^Rio", &s, Dialect::Oracle).render(Dialect::Oracle);
        assert_eq!(text, r#"REGEXP_LIKE("name", ?, 'i')"#);
    }

    #[test]
    fn bad_regex_is_recoverable() {
        let mut s = spec("(");
        s.is_regex = true;
        let err = TermMatcher::compile("(", &s).unwrap_err();
        assert!(err.is_recoverable());
    }
}
