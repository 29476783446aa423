//! Chunk-based SQL fragment type with bind parameters.
//!
//! A [`Sql`] value keeps SQL text and the parameters to be bound side by
//! side, so fragments can be composed freely and rendered once, with the
//! placeholder style of the target [`Dialect`].

use compact_str::{CompactString, ToCompactString};
use serde_json::Value;
use smallvec::{SmallVec, smallvec};

use crate::dialect::Dialect;

/// A part of an SQL statement.
#[derive(Clone, Debug)]
pub enum SqlChunk {
    /// Literal SQL text, emitted as-is.
    Text(CompactString),
    /// An identifier, quoted per dialect. Dotted names quote part by part.
    Ident(CompactString),
    /// A bind parameter rendered as a placeholder.
    Param(Value),
    /// A nested fragment wrapped in parentheses.
    Subquery(Box<Sql>),
}

/// An SQL statement or fragment with parameters.
#[derive(Clone, Debug, Default)]
pub struct Sql {
    pub chunks: SmallVec<[SqlChunk; 4]>,
}

impl Sql {
    /// Creates a new empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a fragment from a raw string. The string is treated as
    /// literal SQL text, not a parameter.
    pub fn raw(text: impl AsRef<str>) -> Self {
        Self {
            chunks: smallvec![SqlChunk::Text(text.as_ref().to_compact_string())],
        }
    }

    /// Creates a fragment holding a quoted identifier.
    pub fn ident(name: impl AsRef<str>) -> Self {
        Self {
            chunks: smallvec![SqlChunk::Ident(name.as_ref().to_compact_string())],
        }
    }

    /// Creates a fragment representing a single bind parameter.
    pub fn param(value: impl Into<Value>) -> Self {
        Self {
            chunks: smallvec![SqlChunk::Param(value.into())],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Appends another fragment, consuming both.
    pub fn append(mut self, other: Sql) -> Self {
        self.chunks.extend(other.chunks);
        self
    }

    /// Appends literal text.
    pub fn append_raw(mut self, text: impl AsRef<str>) -> Self {
        self.chunks
            .push(SqlChunk::Text(text.as_ref().to_compact_string()));
        self
    }

    /// Appends a bind parameter.
    pub fn push_param(mut self, value: impl Into<Value>) -> Self {
        self.chunks.push(SqlChunk::Param(value.into()));
        self
    }

    /// Wraps this fragment in parentheses.
    pub fn subquery(self) -> Self {
        Self {
            chunks: smallvec![SqlChunk::Subquery(Box::new(self))],
        }
    }

    /// Joins fragments with a literal separator, skipping empty ones.
    pub fn join_with(parts: impl IntoIterator<Item = Sql>, sep: &str) -> Self {
        let mut out = Sql::empty();
        for part in parts {
            if part.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out = out.append_raw(sep);
            }
            out = out.append(part);
        }
        out
    }

    /// Renders the fragment to SQL text plus bind values, using the
    /// placeholder style of `dialect`. Parameter order matches chunk order.
    pub fn render(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut buf = CompactString::default();
        let mut params = Vec::new();
        self.write(dialect, &mut buf, &mut params);
        (buf.into_string(), params)
    }

    fn write(&self, dialect: Dialect, buf: &mut CompactString, params: &mut Vec<Value>) {
        for chunk in &self.chunks {
            match chunk {
                SqlChunk::Text(text) => buf.push_str(text),
                SqlChunk::Ident(name) => dialect.write_ident(name, buf),
                SqlChunk::Param(value) => {
                    params.push(value.clone());
                    buf.push_str(&dialect.render_placeholder(params.len()));
                }
                SqlChunk::Subquery(sql) => {
                    buf.push('(');
                    sql.write(dialect, buf, params);
                    buf.push(')');
                }
            }
        }
    }
}
