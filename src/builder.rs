//! An exclusively-owned select-query value.
//!
//! The SQL engines mutate one [`SelectQuery`] per request: counting clones
//! it, search appends WHERE conjuncts, relation resolution adds joins
//! (deduplicated by target table), ordering and paging append their clauses.
//! Rendering goes through the [`Sql`](crate::sql::Sql) fragment type.

use hashbrown::HashSet;

use crate::relation::{JoinSpec, JoinType};
use crate::sql::Sql;

/// One JOIN clause, tagged by target table for deduplication.
#[derive(Clone, Debug)]
pub struct JoinClause {
    pub kind: JoinType,
    pub table: String,
    pub on: Sql,
}

/// A plain select description: table, select list, joins, conjuncts,
/// grouping, ordering, set operations and the page window.
#[derive(Clone, Debug)]
pub struct SelectQuery {
    table: String,
    selects: Vec<Sql>,
    joins: Vec<JoinClause>,
    wheres: Vec<Sql>,
    group_by: Vec<Sql>,
    having: Option<Sql>,
    order_by: Vec<Sql>,
    distinct: bool,
    unions: Vec<SelectQuery>,
    limit: Option<i64>,
    offset: Option<usize>,
    joined: HashSet<String>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        let mut joined = HashSet::new();
        joined.insert(table.clone());
        Self {
            table,
            selects: Vec::new(),
            joins: Vec::new(),
            wheres: Vec::new(),
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            distinct: false,
            unions: Vec::new(),
            limit: None,
            offset: None,
            joined,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Selects named columns. Without any, the query selects `*`.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selects
            .extend(columns.into_iter().map(|c| Sql::ident(c.as_ref())));
        self
    }

    /// Selects a raw fragment (expressions, aliases).
    pub fn select_raw(mut self, fragment: Sql) -> Self {
        self.selects.push(fragment);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Appends a WHERE conjunct. OR-chains are composed by the caller and
    /// passed as one parenthesized fragment.
    pub fn and_where(&mut self, predicate: Sql) {
        if !predicate.is_empty() {
            self.wheres.push(predicate);
        }
    }

    /// Whether a join to `table` already exists (the base table counts).
    pub fn has_join(&self, table: &str) -> bool {
        self.joined.contains(table)
    }

    /// Adds a synthesized join unless its target table is already joined.
    /// Returns whether the join was actually added.
    pub fn add_join(&mut self, spec: JoinSpec) -> bool {
        if self.has_join(&spec.table) {
            return false;
        }
        let on = Sql::ident(&spec.first)
            .append_raw(" = ")
            .append(Sql::ident(&spec.second));
        self.push_join(spec.kind, spec.table, on);
        true
    }

    /// Adds a join with an explicit ON fragment, deduplicated by table.
    pub fn join(&mut self, kind: JoinType, table: impl Into<String>, on: Sql) -> bool {
        let table = table.into();
        if self.has_join(&table) {
            return false;
        }
        self.push_join(kind, table, on);
        true
    }

    fn push_join(&mut self, kind: JoinType, table: String, on: Sql) {
        self.joined.insert(table.clone());
        self.joins.push(JoinClause { kind, table, on });
    }

    pub fn group_by(mut self, column: impl AsRef<str>) -> Self {
        self.group_by.push(Sql::ident(column.as_ref()));
        self
    }

    pub fn having(mut self, predicate: Sql) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn order_by(&mut self, fragment: Sql) {
        self.order_by.push(fragment);
    }

    pub fn union(mut self, other: SelectQuery) -> Self {
        self.unions.push(other);
        self
    }

    pub fn limit(&mut self, limit: i64) {
        self.limit = Some(limit);
    }

    pub fn offset(&mut self, offset: usize) {
        self.offset = Some(offset);
    }

    /// The single complexity rule: a query is complex when any of
    /// UNION / HAVING / DISTINCT / ORDER BY / GROUP BY is present. Complex
    /// queries are counted by wrapping the whole query as a subquery so
    /// grouping semantics are respected.
    pub fn is_complex(&self) -> bool {
        self.distinct
            || !self.unions.is_empty()
            || self.having.is_some()
            || !self.group_by.is_empty()
            || !self.order_by.is_empty()
    }

    /// Renders the full select.
    pub fn to_sql(&self) -> Sql {
        let mut sql = Sql::raw("SELECT ");
        if self.distinct {
            sql = sql.append_raw("DISTINCT ");
        }
        sql = if self.selects.is_empty() {
            sql.append_raw("*")
        } else {
            sql.append(Sql::join_with(self.selects.iter().cloned(), ", "))
        };
        sql = sql.append_raw(" FROM ").append(Sql::ident(&self.table));

        for join in &self.joins {
            sql = sql
                .append_raw(format!(" {} ", join.kind.as_sql()))
                .append(Sql::ident(&join.table))
                .append_raw(" ON ")
                .append(join.on.clone());
        }
        if !self.wheres.is_empty() {
            sql = sql
                .append_raw(" WHERE ")
                .append(Sql::join_with(self.wheres.iter().cloned(), " AND "));
        }
        if !self.group_by.is_empty() {
            sql = sql
                .append_raw(" GROUP BY ")
                .append(Sql::join_with(self.group_by.iter().cloned(), ", "));
        }
        if let Some(having) = &self.having {
            sql = sql.append_raw(" HAVING ").append(having.clone());
        }
        for union in &self.unions {
            sql = sql.append_raw(" UNION ").append(union.to_sql());
        }
        if !self.order_by.is_empty() {
            sql = sql
                .append_raw(" ORDER BY ")
                .append(Sql::join_with(self.order_by.iter().cloned(), ", "));
        }
        if let Some(limit) = self.limit {
            sql = sql.append_raw(format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql = sql.append_raw(format!(" OFFSET {offset}"));
        }
        sql
    }

    /// Renders the count form of this query without mutating it.
    ///
    /// Simple queries get their select list replaced by a constant `1`
    /// before counting; complex ones are wrapped whole so GROUP BY /
    /// HAVING / DISTINCT semantics are respected.
    pub fn count_sql(&self) -> Sql {
        let complex = self.is_complex();
        let mut inner = self.clone();
        inner.limit = None;
        inner.offset = None;
        inner.order_by.clear();
        if !complex {
            inner.selects = vec![Sql::raw("1")];
        }
        Sql::raw("SELECT COUNT(*) AS aggregate FROM ")
            .append(inner.to_sql().subquery())
            .append_raw(" count_row_table")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn renders_a_full_select() {
        let mut query = SelectQuery::new("users").select(["id", "users.name"]);
        query.and_where(Sql::ident("active").append_raw(" = ").push_param(true));
        query.order_by(Sql::ident("users.name").append_raw(" ASC"));
        query.limit(10);
        query.offset(20);

        let (text, params) = query.to_sql().render(Dialect::Sqlite);
        assert_eq!(
            text,
            r#"SELECT "id", "users"."name" FROM "users" WHERE "active" = ? ORDER BY "users"."name" ASC LIMIT 10 OFFSET 20"#
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn join_dedup_by_target_table() {
        let mut query = SelectQuery::new("users");
        let spec = JoinSpec {
            kind: JoinType::Left,
            table: "cities".into(),
            first: "users.city_id".into(),
            second: "cities.id".into(),
        };
        assert!(query.add_join(spec.clone()));
        assert!(!query.add_join(spec));
        assert!(!query.add_join(JoinSpec {
            kind: JoinType::Inner,
            table: "users".into(),
            first: "x".into(),
            second: "y".into(),
        }));

        let (text, _) = query.to_sql().render(Dialect::Sqlite);
        assert_eq!(text.matches("JOIN").count(), 1);
    }

    #[test]
    fn simple_count_replaces_the_select_list() {
        let mut query = SelectQuery::new("users").select(["id", "name"]);
        query.and_where(Sql::ident("active").append_raw(" = ").push_param(true));
        let (text, _) = query.count_sql().render(Dialect::Sqlite);
        assert_eq!(
            text,
            r#"SELECT COUNT(*) AS aggregate FROM (SELECT 1 FROM "users" WHERE "active" = ?) count_row_table"#
        );
    }

    #[test]
    fn complex_count_preserves_the_select_list() {
        let query = SelectQuery::new("orders")
            .select_raw(Sql::raw("customer_id, SUM(total) AS total"))
            .group_by("customer_id");
        let (text, _) = query.count_sql().render(Dialect::Sqlite);
        assert_eq!(
            text,
            r#"SELECT COUNT(*) AS aggregate FROM (SELECT customer_id, SUM(total) AS total FROM "orders" GROUP BY "customer_id") count_row_table"#
        );
    }

    #[test]
    fn counting_does_not_mutate_the_query() {
        let mut query = SelectQuery::new("users").select(["id"]);
        query.limit(5);
        let before = query.to_sql().render(Dialect::Sqlite).0;
        let _ = query.count_sql();
        assert_eq!(query.to_sql().render(Dialect::Sqlite).0, before);
    }

    #[test]
    fn order_by_makes_a_query_complex() {
        let mut query = SelectQuery::new("users");
        assert!(!query.is_complex());
        query.order_by(Sql::ident("name").append_raw(" ASC"));
        assert!(query.is_complex());
    }
}
