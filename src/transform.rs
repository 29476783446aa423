//! The per-row transformation pipeline.
//!
//! Applied to each raw row in fixed order: computed columns at their
//! declared positions, edited-column overrides, the reserved row-template
//! keys, excess-column removal, recursive HTML escaping, and finally the
//! keyed-or-positional output shape. The reserved keys are always emitted
//! keyed, even when the rest of the row is flattened.

use serde_json::{Map, Value};

use crate::column::{ColumnRegistry, ROW_ATTR, ROW_CLASS, ROW_DATA, ROW_ID};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::helpers::RowMap;
use crate::template::TemplateRenderer;

pub struct RowTransformer<'a> {
    registry: &'a ColumnRegistry,
    config: &'a EngineConfig,
    renderer: &'a dyn TemplateRenderer,
    start: usize,
    keyed: bool,
}

impl<'a> RowTransformer<'a> {
    pub fn new(
        registry: &'a ColumnRegistry,
        config: &'a EngineConfig,
        renderer: &'a dyn TemplateRenderer,
        start: usize,
        keyed: bool,
    ) -> Self {
        Self {
            registry,
            config,
            renderer,
            start,
            keyed,
        }
    }

    pub fn transform(&self, rows: Vec<RowMap>) -> Result<Vec<Value>> {
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| self.transform_row(row, i))
            .collect()
    }

    /// A template or callback failure aborts the whole request; a partially
    /// rendered grid is worse than a visible error.
    fn transform_row(&self, mut row: RowMap, index: usize) -> Result<Value> {
        for column in self.registry.computed_columns() {
            let value = column.content.resolve(&row, self.renderer)?;
            match column.position {
                Some(position) => insert_at(&mut row, position, column.name.clone(), value),
                None => {
                    row.insert(column.name.clone(), value);
                }
            }
        }

        if self.registry.with_index {
            row.insert(
                self.config.index_column.clone(),
                Value::from(self.start + index),
            );
        }

        for (name, content) in self.registry.edited_columns() {
            let value = content.resolve(&row, self.renderer)?;
            row.insert(name.clone(), value);
        }

        let reserved = self.resolve_templates(&row)?;

        let excess: Vec<String> = row
            .keys()
            .filter(|k| self.registry.is_excess(k))
            .cloned()
            .collect();
        for name in excess {
            row.shift_remove(&name);
        }

        let escaped: RowMap = row
            .into_iter()
            .map(|(name, value)| {
                if self.registry.is_raw(&name) {
                    (name, value)
                } else {
                    (name, escape_value(value))
                }
            })
            .collect();

        let mut out = if self.keyed {
            escaped
        } else {
            // positional flattening: values keyed by their index so the
            // reserved keys below can ride along
            escaped
                .into_iter()
                .enumerate()
                .map(|(i, (_, value))| (i.to_string(), value))
                .collect()
        };
        for (key, value) in reserved {
            out.insert(key, value);
        }
        Ok(Value::Object(out))
    }

    fn resolve_templates(&self, row: &RowMap) -> Result<Vec<(String, Value)>> {
        let templates = &self.registry.templates;
        let mut reserved = Vec::new();
        if let Some(content) = &templates.id {
            reserved.push((ROW_ID.to_owned(), content.resolve(row, self.renderer)?));
        }
        if let Some(content) = &templates.class {
            reserved.push((ROW_CLASS.to_owned(), content.resolve(row, self.renderer)?));
        }
        if !templates.data.is_empty() {
            let mut data = Map::new();
            for (name, content) in &templates.data {
                data.insert(name.clone(), content.resolve(row, self.renderer)?);
            }
            reserved.push((ROW_DATA.to_owned(), Value::Object(data)));
        }
        if !templates.attr.is_empty() {
            let mut attr = Map::new();
            for (name, content) in &templates.attr {
                attr.insert(name.clone(), content.resolve(row, self.renderer)?);
            }
            reserved.push((ROW_ATTR.to_owned(), Value::Object(attr)));
        }
        Ok(reserved)
    }
}

/// Rebuilds the map with `key` at `position`, clamped to the end.
fn insert_at(row: &mut RowMap, position: usize, key: String, value: Value) {
    let mut entries: Vec<(String, Value)> = std::mem::take(row).into_iter().collect();
    let position = position.min(entries.len());
    entries.insert(position, (key, value));
    *row = entries.into_iter().collect();
}

/// HTML-escapes every string leaf, recursively through nested structures.
fn escape_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(html_escape::encode_safe(&s).into_owned()),
        Value::Array(items) => Value::Array(items.into_iter().map(escape_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, escape_value(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnContent;
    use crate::template::SimpleRenderer;
    use serde_json::json;

    fn row() -> RowMap {
        serde_json::from_value(json!({ "id": 1, "name": "Ada" })).unwrap()
    }

    fn transform_one(registry: &ColumnRegistry, keyed: bool, row: RowMap) -> Value {
        let config = EngineConfig::default();
        RowTransformer::new(registry, &config, &SimpleRenderer, 0, keyed)
            .transform(vec![row])
            .unwrap()
            .remove(0)
    }

    #[test]
    fn computed_column_at_position() {
        let registry = ColumnRegistry::default().add_column_at(
            "badge",
            ColumnContent::template("user-{id}"),
            1,
        );
        let out = transform_one(&registry, true, row());
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["id", "badge", "name"]);
        assert_eq!(out["badge"], json!("user-1"));
    }

    #[test]
    fn positional_output_keeps_reserved_keys_keyed() {
        let registry = ColumnRegistry::default().row_id(ColumnContent::template("row-{id}"));
        let out = transform_one(&registry, false, row());
        assert_eq!(out["0"], json!(1));
        assert_eq!(out["1"], json!("Ada"));
        assert_eq!(out["DT_RowId"], json!("row-1"));
    }

    #[test]
    fn escapes_unless_declared_raw() {
        let mut r = row();
        r.insert("html".into(), json!("<b>x</b>"));
        r.insert("script".into(), json!("<script>alert(1)</script>"));
        let registry = ColumnRegistry::default().raw_columns(["html"]);
        let out = transform_one(&registry, true, r);
        assert_eq!(out["html"], json!("<b>x</b>"));
        assert_eq!(
            out["script"],
            json!("&lt;script&gt;alert(1)&lt;/script&gt;")
        );
    }

    #[test]
    fn excess_columns_are_dropped_after_templates_resolve() {
        let registry = ColumnRegistry::default()
            .row_class(ColumnContent::template("cls-{name}"))
            .remove_columns(["name"]);
        let out = transform_one(&registry, true, row());
        assert!(out.get("name").is_none());
        // the template still saw the column before removal
        assert_eq!(out["DT_RowClass"], json!("cls-Ada"));
    }

    #[test]
    fn callback_failure_aborts() {
        let registry = ColumnRegistry::default().add_column(
            "boom",
            ColumnContent::callback(|_| Err(crate::error::GridError::Template("boom".into()))),
        );
        let config = EngineConfig::default();
        let result = RowTransformer::new(&registry, &config, &SimpleRenderer, 0, true)
            .transform(vec![row()]);
        assert!(result.is_err());
    }
}
