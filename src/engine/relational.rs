//! The object-relational engine: the flat SQL engine plus relation-aware
//! column resolution.
//!
//! Any dotted logical column declared in the relation graph is resolved
//! to a physically joinable column before search and ordering touch it;
//! the synthesized joins land on the base query, deduplicated by target
//! table.

use crate::builder::SelectQuery;
use crate::column::ColumnRegistry;
use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::helpers::RowMap;
use crate::relation::RelationGraph;
use crate::request::RequestDescriptor;
use crate::template::TemplateRenderer;

use super::{Engine, QueryEngine, QueryExecutor};

/// Engine over a select spanning eager-loaded relations.
pub struct RelationalEngine<E: QueryExecutor> {
    inner: QueryEngine<E>,
}

impl<E: QueryExecutor> RelationalEngine<E> {
    pub fn new(
        query: SelectQuery,
        dialect: Dialect,
        executor: E,
        request: RequestDescriptor,
        config: EngineConfig,
        graph: RelationGraph,
    ) -> Self {
        Self {
            inner: QueryEngine::new(query, dialect, executor, request, config)
                .with_relations(graph),
        }
    }

    pub fn with_registry(mut self, registry: ColumnRegistry) -> Self {
        self.inner = self.inner.with_registry(registry);
        self
    }

    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.inner = self.inner.with_renderer(renderer);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.inner = self.inner.nulls_last();
        self
    }

    pub fn select_query(&self) -> &SelectQuery {
        self.inner.select_query()
    }
}

impl<E: QueryExecutor> Engine for RelationalEngine<E> {
    fn total_count(&mut self) -> Result<u64> {
        self.inner.total_count()
    }

    fn filtered_count(&mut self) -> Result<u64> {
        self.inner.filtered_count()
    }

    fn global_search(&mut self) -> Result<()> {
        self.inner.global_search()
    }

    fn column_search(&mut self) -> Result<()> {
        self.inner.column_search()
    }

    fn ordering(&mut self) -> Result<()> {
        self.inner.ordering()
    }

    fn paginate(&mut self) -> Result<()> {
        self.inner.paginate()
    }

    fn results(&mut self) -> Result<Vec<RowMap>> {
        self.inner.results()
    }

    fn request(&self) -> &RequestDescriptor {
        self.inner.request()
    }

    fn config(&self) -> &EngineConfig {
        self.inner.config()
    }

    fn registry(&self) -> &ColumnRegistry {
        self.inner.registry()
    }

    fn renderer(&self) -> &dyn TemplateRenderer {
        self.inner.renderer()
    }

    fn filter_applied(&self) -> bool {
        self.inner.filter_applied()
    }

    fn executed_queries(&self) -> Vec<String> {
        self.inner.executed_queries()
    }
}
