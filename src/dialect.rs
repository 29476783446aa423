//! SQL dialect selection and the per-dialect rendering quirks the engines
//! care about: placeholder style, identifier quoting, text casting and the
//! regex predicate construct.

use std::borrow::Cow;

use compact_str::CompactString;

/// The SQL dialect a query is rendered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    MySql,
    Oracle,
    Firebird,
}

impl Dialect {
    /// Renders a placeholder for this dialect with the given 1-based index.
    ///
    /// Returns `Cow::Borrowed("?")` for SQLite/MySQL (zero allocation),
    /// `Cow::Owned` for PostgreSQL numbered placeholders.
    #[inline]
    pub fn render_placeholder(&self, index: usize) -> Cow<'static, str> {
        match self {
            Dialect::Postgres => Cow::Owned(format!("${index}")),
            _ => Cow::Borrowed("?"),
        }
    }

    /// Writes a quoted identifier into `buf`.
    ///
    /// Dotted names are quoted part by part (`"users"."name"`); a `*` part is
    /// left bare so `t.*` renders as expected.
    pub fn write_ident(&self, ident: &str, buf: &mut CompactString) {
        let quote = match self {
            Dialect::MySql => '`',
            _ => '"',
        };
        for (i, part) in ident.split('.').enumerate() {
            if i > 0 {
                buf.push('.');
            }
            if part == "*" {
                buf.push('*');
            } else {
                buf.push(quote);
                buf.push_str(part);
                buf.push(quote);
            }
        }
    }

    /// The cast-to-text wrapper for LIKE comparisons against non-text
    /// columns, or `None` when the dialect compares loosely on its own.
    pub fn text_cast(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Dialect::Postgres => Some(("CAST(", " AS TEXT)")),
            Dialect::MySql => Some(("CAST(", " AS CHAR)")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_per_dialect() {
        assert_eq!(Dialect::Sqlite.render_placeholder(1), "?");
        assert_eq!(Dialect::MySql.render_placeholder(3), "?");
        assert_eq!(Dialect::Postgres.render_placeholder(2), "$2");
    }

    #[test]
    fn ident_quoting() {
        let mut buf = CompactString::default();
        Dialect::Postgres.write_ident("users.name", &mut buf);
        assert_eq!(buf, r#""users"."name""#);

        let mut buf = CompactString::default();
        Dialect::MySql.write_ident("users.*", &mut buf);
        assert_eq!(buf, "`users`.*");
    }
}
