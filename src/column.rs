//! Declared column behaviors: computed and edited columns, eligibility,
//! escaping policy, custom filter/order overrides and row-level templates.
//!
//! A [`ColumnRegistry`] is populated at query-setup time and read-only while
//! the engine runs.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use serde_json::Value;

use crate::config::ColumnPolicy;
use crate::error::Result;
use crate::helpers::RowMap;
use crate::request::SortDirection;
use crate::sql::Sql;
use crate::template::TemplateRenderer;

/// Reserved row-template keys. Never positionally flattened.
pub const ROW_ID: &str = "DT_RowId";
pub const ROW_CLASS: &str = "DT_RowClass";
pub const ROW_DATA: &str = "DT_RowData";
pub const ROW_ATTR: &str = "DT_RowAttr";

/// How a declared column's content is produced for a row.
#[derive(Clone)]
pub enum ColumnContent {
    /// A caller-supplied function over the row.
    Callback(Arc<dyn Fn(&RowMap) -> Result<Value> + Send + Sync>),
    /// A template string rendered against the row's field values.
    Template(String),
}

impl ColumnContent {
    pub fn callback(f: impl Fn(&RowMap) -> Result<Value> + Send + Sync + 'static) -> Self {
        ColumnContent::Callback(Arc::new(f))
    }

    pub fn template(template: impl Into<String>) -> Self {
        ColumnContent::Template(template.into())
    }

    /// Resolves the content for one row. Template strings go through the
    /// renderer; failures abort the request.
    pub fn resolve(&self, row: &RowMap, renderer: &dyn TemplateRenderer) -> Result<Value> {
        match self {
            ColumnContent::Callback(f) => f(row),
            ColumnContent::Template(t) => renderer.render(t, row).map(Value::String),
        }
    }
}

impl fmt::Debug for ColumnContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnContent::Callback(_) => f.write_str("Callback(..)"),
            ColumnContent::Template(t) => f.debug_tuple("Template").field(t).finish(),
        }
    }
}

/// A computed column and where it lands in the output row.
#[derive(Clone, Debug)]
pub struct ComputedColumn {
    pub name: String,
    pub content: ColumnContent,
    /// Insertion position among the row's columns; `None` appends at the end.
    pub position: Option<usize>,
}

/// Custom per-column filter: compiles the keyword into a predicate fragment
/// that replaces the default search compilation for that column.
pub type FilterHandler = Arc<dyn Fn(&str) -> Sql + Send + Sync>;

/// Custom per-column order: produces the ORDER BY fragment for a direction.
pub type OrderHandler = Arc<dyn Fn(SortDirection) -> Sql + Send + Sync>;

/// Row-level templates: identity, class and the two keyed extras.
#[derive(Clone, Debug, Default)]
pub struct RowTemplates {
    pub id: Option<ColumnContent>,
    pub class: Option<ColumnContent>,
    pub data: Vec<(String, ColumnContent)>,
    pub attr: Vec<(String, ColumnContent)>,
}

impl RowTemplates {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.class.is_none() && self.data.is_empty() && self.attr.is_empty()
    }
}

/// Declared column behaviors for one engine run.
#[derive(Clone, Default)]
pub struct ColumnRegistry {
    policy: ColumnPolicy,
    computed: Vec<ComputedColumn>,
    edited: Vec<(String, ColumnContent)>,
    excess: Vec<String>,
    raw: Vec<String>,
    filters: HashMap<String, FilterHandler>,
    orders: HashMap<String, OrderHandler>,
    pub templates: RowTemplates,
    /// Attach the synthetic row-index column to every row.
    pub with_index: bool,
}

impl ColumnRegistry {
    pub fn new(policy: ColumnPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Declares a computed column, appended after the source columns.
    pub fn add_column(mut self, name: impl Into<String>, content: ColumnContent) -> Self {
        self.computed.push(ComputedColumn {
            name: name.into(),
            content,
            position: None,
        });
        self
    }

    /// Declares a computed column inserted at `position` in the output row.
    pub fn add_column_at(
        mut self,
        name: impl Into<String>,
        content: ColumnContent,
        position: usize,
    ) -> Self {
        self.computed.push(ComputedColumn {
            name: name.into(),
            content,
            position: Some(position),
        });
        self
    }

    /// Overrides an existing column's value.
    pub fn edit_column(mut self, name: impl Into<String>, content: ColumnContent) -> Self {
        self.edited.push((name.into(), content));
        self
    }

    /// Drops columns from the output entirely.
    pub fn remove_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excess.extend(names.into_iter().map(Into::into));
        self
    }

    /// Exempts columns from HTML escaping.
    pub fn raw_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replaces default search compilation for a column.
    pub fn filter_column(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&str) -> Sql + Send + Sync + 'static,
    ) -> Self {
        self.filters.insert(name.into(), Arc::new(handler));
        self
    }

    /// Replaces default order compilation for a column.
    pub fn order_column(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(SortDirection) -> Sql + Send + Sync + 'static,
    ) -> Self {
        self.orders.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn row_id(mut self, content: ColumnContent) -> Self {
        self.templates.id = Some(content);
        self
    }

    pub fn row_class(mut self, content: ColumnContent) -> Self {
        self.templates.class = Some(content);
        self
    }

    pub fn row_data(mut self, name: impl Into<String>, content: ColumnContent) -> Self {
        self.templates.data.push((name.into(), content));
        self
    }

    pub fn row_attr(mut self, name: impl Into<String>, content: ColumnContent) -> Self {
        self.templates.attr.push((name.into(), content));
        self
    }

    pub fn index_column(mut self) -> Self {
        self.with_index = true;
        self
    }

    /// Whether a column may be searched: eligible per the policy and not a
    /// purely computed output column.
    pub fn is_searchable(&self, name: &str) -> bool {
        self.is_eligible(name) && !self.is_computed(name)
    }

    pub fn is_orderable(&self, name: &str) -> bool {
        self.is_eligible(name) && (!self.is_computed(name) || self.orders.contains_key(name))
    }

    fn is_eligible(&self, name: &str) -> bool {
        self.policy.whitelist.allows(name) && !self.policy.blacklist.iter().any(|b| b == name)
    }

    fn is_computed(&self, name: &str) -> bool {
        self.computed.iter().any(|c| c.name == name)
    }

    pub fn is_raw(&self, name: &str) -> bool {
        self.raw.iter().any(|r| r == name)
    }

    pub fn is_excess(&self, name: &str) -> bool {
        self.excess.iter().any(|e| e == name)
    }

    pub fn filter_for(&self, name: &str) -> Option<&FilterHandler> {
        self.filters.get(name)
    }

    pub fn order_for(&self, name: &str) -> Option<&OrderHandler> {
        self.orders.get(name)
    }

    /// Computed columns in application order: positioned ones first, by
    /// position, then appended ones in registration order.
    pub fn computed_columns(&self) -> impl Iterator<Item = &ComputedColumn> {
        self.computed.iter()
    }

    pub fn edited_columns(&self) -> impl Iterator<Item = &(String, ColumnContent)> {
        self.edited.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Whitelist;

    #[test]
    fn eligibility_follows_policy_and_computed_set() {
        let policy = ColumnPolicy {
            blacklist: vec!["password".into()],
            whitelist: Whitelist::default(),
        };
        let registry = ColumnRegistry::new(policy)
            .add_column("action", ColumnContent::template("<a href=\"/{id}\">edit</a>"))
            .order_column("action", |dir| {
                Sql::ident("id").append_raw(" ").append_raw(dir.as_sql())
            });

        assert!(registry.is_searchable("name"));
        assert!(!registry.is_searchable("password"));
        // computed columns have no physical backing to search
        assert!(!registry.is_searchable("action"));
        // but an order override makes them orderable
        assert!(registry.is_orderable("action"));
    }

    #[test]
    fn raw_and_excess_lookups() {
        let registry = ColumnRegistry::default()
            .raw_columns(["html"])
            .remove_columns(["secret"]);
        assert!(registry.is_raw("html"));
        assert!(!registry.is_raw("name"));
        assert!(registry.is_excess("secret"));
    }
}
