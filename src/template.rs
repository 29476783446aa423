//! Template rendering seam.
//!
//! Computed columns and row templates can be declared as template strings;
//! rendering them against a row is delegated to a [`TemplateRenderer`] so
//! applications can plug in their own template engine. The built-in
//! [`SimpleRenderer`] substitutes `{field}` placeholders, with dotted paths
//! reaching into nested objects.

use crate::error::{GridError, Result};
use crate::helpers::{RowMap, value_at_path, value_to_plain};

/// Renders a template string against a row context.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, row: &RowMap) -> Result<String>;
}

/// `{field}` substitution. Unknown fields render empty; an unclosed brace
/// is a template error.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleRenderer;

impl TemplateRenderer for SimpleRenderer {
    fn render(&self, template: &str, row: &RowMap) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                GridError::Template(format!("unclosed placeholder in {template:?}"))
            })?;
            let path = &after[..close];
            if let Some(value) = value_at_path(row, path) {
                out.push_str(&value_to_plain(value));
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
