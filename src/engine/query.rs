//! The flat SQL engine: count, filter, order and page a select query
//! against a storage backend reached through [`QueryExecutor`].

use crate::builder::SelectQuery;
use crate::column::ColumnRegistry;
use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::error::{GridError, Result};
use crate::helpers::RowMap;
use crate::relation::RelationGraph;
use crate::request::{RequestDescriptor, SortDirection};
use crate::search::{self, SearchSpec};
use crate::sql::Sql;
use crate::template::{SimpleRenderer, TemplateRenderer};

use super::{Engine, QueryExecutor};

/// Engine over a single-table (or already-joined, non-relational) select.
///
/// Owns its query value exclusively for the duration of one `make()`;
/// counting operates on clones so the query is never contaminated across
/// steps.
pub struct QueryEngine<E: QueryExecutor> {
    query: SelectQuery,
    executor: E,
    dialect: Dialect,
    request: RequestDescriptor,
    config: EngineConfig,
    registry: ColumnRegistry,
    renderer: Box<dyn TemplateRenderer>,
    graph: Option<RelationGraph>,
    filter_applied: bool,
    queries: Vec<String>,
    nulls_last: bool,
    limit_hook: Option<Box<dyn Fn(&mut SelectQuery) + Send + Sync>>,
}

impl<E: QueryExecutor> QueryEngine<E> {
    pub fn new(
        query: SelectQuery,
        dialect: Dialect,
        executor: E,
        request: RequestDescriptor,
        config: EngineConfig,
    ) -> Self {
        let registry = ColumnRegistry::new(config.columns.clone());
        Self {
            query,
            executor,
            dialect,
            request,
            config,
            registry,
            renderer: Box::new(SimpleRenderer),
            graph: None,
            filter_applied: false,
            queries: Vec::new(),
            nulls_last: false,
            limit_hook: None,
        }
    }

    pub fn with_registry(mut self, registry: ColumnRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Rewrites ordering clauses through the configured `nulls_last_sql`
    /// template so null values sort last regardless of direction.
    pub fn nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self
    }

    /// Deep-offset mode: the hook applies a caller-supplied predicate and
    /// pagination then limits without an offset.
    pub fn limit_with(mut self, hook: impl Fn(&mut SelectQuery) + Send + Sync + 'static) -> Self {
        self.limit_hook = Some(Box::new(hook));
        self
    }

    pub(crate) fn with_relations(mut self, graph: RelationGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// The current query state, mainly for inspection in tests.
    pub fn select_query(&self) -> &SelectQuery {
        &self.query
    }

    /// Maps a logical column name to a physically addressable fragment.
    ///
    /// With a relation graph attached, dotted names resolve through it and
    /// the synthesized joins land on the query (idempotently); anything
    /// else is treated as a literal, possibly already-qualified column.
    fn resolve_column(&mut self, name: &str) -> Result<Sql> {
        if name.contains('.')
            && let Some(graph) = &self.graph
            && let Some(resolved) = graph.resolve(name)?
        {
            let qualified = resolved.qualified();
            for join in resolved.joins {
                self.query.add_join(join);
            }
            return Ok(Sql::ident(qualified));
        }
        Ok(Sql::ident(name))
    }

    fn run_count(&mut self, query: &SelectQuery) -> Result<u64> {
        let (text, params) = query.count_sql().render(self.dialect);
        tracing::debug!(sql = %text, "count query");
        self.queries.push(text.clone());
        let rows = self.executor.fetch(&text, &params)?;
        let value = rows
            .first()
            .and_then(|row| row.values().next())
            .ok_or_else(|| GridError::Execution("count query returned no rows".into()))?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f as u64))
            .ok_or_else(|| GridError::Execution(format!("unexpected count value: {value}")))
    }

    /// Request columns eligible for searching.
    fn searchable_names(&self) -> Vec<String> {
        self.request
            .searchable_columns()
            .map(|(_, c)| c.column_name().to_owned())
            .filter(|name| {
                self.registry.is_searchable(name) || self.registry.filter_for(name).is_some()
            })
            .collect()
    }
}

impl<E: QueryExecutor> Engine for QueryEngine<E> {
    fn total_count(&mut self) -> Result<u64> {
        let base = self.query.clone();
        self.run_count(&base)
    }

    fn filtered_count(&mut self) -> Result<u64> {
        let filtered = self.query.clone();
        self.run_count(&filtered)
    }

    /// One OR-chain across all searchable columns per term; terms combine
    /// with AND.
    fn global_search(&mut self) -> Result<()> {
        let Some(keyword) = self.request.keyword().map(str::to_owned) else {
            return Ok(());
        };
        let spec = SearchSpec::new(&self.config.search, keyword, self.request.search.regex);
        let columns = self.searchable_names();
        if columns.is_empty() {
            return Ok(());
        }

        for term in spec.terms() {
            let mut parts = Vec::with_capacity(columns.len());
            for name in &columns {
                if let Some(handler) = self.registry.filter_for(name).cloned() {
                    parts.push(handler(term));
                } else {
                    let column = self.resolve_column(name)?;
                    parts.push(search::compile_column(column, term, &spec, self.dialect));
                }
            }
            let chain = Sql::join_with(parts, " OR ");
            if !chain.is_empty() {
                self.query.and_where(chain.subquery());
                self.filter_applied = true;
            }
        }
        Ok(())
    }

    fn column_search(&mut self) -> Result<()> {
        let searches: Vec<(String, String, bool)> = self
            .request
            .searchable_columns()
            .filter_map(|(_, c)| {
                c.keyword()
                    .map(|kw| (c.column_name().to_owned(), kw.to_owned(), c.search.regex))
            })
            .filter(|(name, _, _)| {
                self.registry.is_searchable(name) || self.registry.filter_for(name).is_some()
            })
            .collect();

        for (name, keyword, is_regex) in searches {
            let predicate = if let Some(handler) = self.registry.filter_for(&name).cloned() {
                handler(&keyword)
            } else {
                let mut spec = SearchSpec::new(&self.config.search, keyword.clone(), is_regex);
                spec.multi_term = false;
                let column = self.resolve_column(&name)?;
                search::compile_column(column, &keyword, &spec, self.dialect)
            };
            self.query.and_where(predicate.subquery());
            self.filter_applied = true;
        }
        Ok(())
    }

    fn ordering(&mut self) -> Result<()> {
        let orders: Vec<(String, SortDirection)> = self
            .request
            .orders()
            .map(|(c, dir)| (c.column_name().to_owned(), dir))
            .filter(|(name, _)| self.registry.is_orderable(name))
            .collect();

        for (name, direction) in orders {
            if let Some(handler) = self.registry.order_for(&name).cloned() {
                let fragment = handler(direction);
                self.query.order_by(fragment);
                continue;
            }
            let column = self.resolve_column(&name)?;
            let clause = match (self.nulls_last, &self.config.nulls_last_sql) {
                (true, Some(template)) => {
                    nulls_last_clause(template, column, direction.as_sql())
                }
                _ => column.append_raw(format!(" {}", direction.as_sql())),
            };
            self.query.order_by(clause);
        }
        Ok(())
    }

    fn paginate(&mut self) -> Result<()> {
        if !self.request.is_paging() {
            return Ok(());
        }
        if let Some(hook) = self.limit_hook.take() {
            hook(&mut self.query);
            self.query.limit(self.request.length);
        } else {
            self.query.limit(self.request.length);
            self.query.offset(self.request.start);
        }
        Ok(())
    }

    fn results(&mut self) -> Result<Vec<RowMap>> {
        let (text, params) = self.query.to_sql().render(self.dialect);
        tracing::debug!(sql = %text, "results query");
        self.queries.push(text.clone());
        self.executor.fetch(&text, &params)
    }

    fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    fn renderer(&self) -> &dyn TemplateRenderer {
        self.renderer.as_ref()
    }

    fn filter_applied(&self) -> bool {
        self.filter_applied
    }

    fn executed_queries(&self) -> Vec<String> {
        self.queries.clone()
    }
}

/// Substitutes the column and direction into a `%s`-style null-ordering
/// template (e.g. `"%s %s NULLS LAST"` or `"ISNULL(%s), %s %s"` shapes).
fn nulls_last_clause(template: &str, column: Sql, direction: &str) -> Sql {
    let mut parts = template.split("%s");
    let mut sql = Sql::raw(parts.next().unwrap_or_default());
    let Some(after_column) = parts.next() else {
        return column;
    };
    sql = sql.append(column).append_raw(after_column);
    if let Some(after_direction) = parts.next() {
        sql = sql.append_raw(direction).append_raw(after_direction);
    }
    for rest in parts {
        sql = sql.append_raw(rest);
    }
    sql
}
