//! The in-memory engine: filter, order and page an already-materialized
//! record sequence.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

use crate::column::ColumnRegistry;
use crate::config::EngineConfig;
use crate::error::{GridError, Result};
use crate::helpers::{RowMap, natural_cmp, natural_str_cmp, value_at_path, value_to_plain};
use crate::request::{RequestDescriptor, SortDirection};
use crate::search::{self, SearchSpec, TermMatcher};
use crate::template::{SimpleRenderer, TemplateRenderer};

use super::Engine;

/// Engine over a materialized row sequence.
pub struct MemoryEngine {
    rows: Vec<RowMap>,
    request: RequestDescriptor,
    config: EngineConfig,
    registry: ColumnRegistry,
    renderer: Box<dyn TemplateRenderer>,
    filter_applied: bool,
    /// Total supplied by the caller when the source was pre-paginated
    /// upstream; filtering and paging are skipped entirely then.
    total_override: Option<u64>,
}

impl MemoryEngine {
    pub fn new(rows: Vec<RowMap>, request: RequestDescriptor, config: EngineConfig) -> Self {
        let registry = ColumnRegistry::new(config.columns.clone());
        Self {
            rows,
            request,
            config,
            registry,
            renderer: Box::new(SimpleRenderer),
            filter_applied: false,
            total_override: None,
        }
    }

    /// Coerces arbitrary serializable records into row maps.
    pub fn from_records<T, I>(
        records: I,
        request: RequestDescriptor,
        config: EngineConfig,
    ) -> Result<Self>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let rows = records
            .into_iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(map) => Ok(map),
                other => Err(GridError::BadRequest(format!(
                    "record did not serialize to an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rows, request, config))
    }

    pub fn with_registry(mut self, registry: ColumnRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Declares the source pre-paginated upstream with this true total;
    /// engine-level filtering and paging become no-ops.
    pub fn pre_counted(mut self, total: u64) -> Self {
        self.total_override = Some(total);
        self
    }

    fn searchable_names(&self) -> Vec<String> {
        self.request
            .searchable_columns()
            .map(|(_, c)| c.column_name().to_owned())
            .filter(|name| self.registry.is_searchable(name))
            .collect()
    }

    fn cell(row: &RowMap, name: &str) -> String {
        value_at_path(row, name).map(value_to_plain).unwrap_or_default()
    }

    /// Every term must match at least one column.
    fn retain_matching(&mut self, columns: &[String], matchers: &[TermMatcher]) {
        self.rows.retain(|row| {
            matchers.iter().all(|matcher| {
                columns
                    .iter()
                    .any(|name| matcher.matches(&Self::cell(row, name)))
            })
        });
    }

    fn compare_cells(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::String(x), Value::String(y)) => {
                let flags = &self.config.search;
                let fold = |s: &str| {
                    let s = if flags.ignore_accents {
                        search::strip_accents(s)
                    } else {
                        s.to_owned()
                    };
                    if flags.case_insensitive {
                        s.to_lowercase()
                    } else {
                        s
                    }
                };
                natural_str_cmp(&fold(x), &fold(y))
            }
            _ => natural_cmp(a, b),
        }
    }
}

impl Engine for MemoryEngine {
    fn total_count(&mut self) -> Result<u64> {
        Ok(self
            .total_override
            .unwrap_or(self.rows.len() as u64))
    }

    fn filtered_count(&mut self) -> Result<u64> {
        Ok(match self.total_override {
            Some(total) => total,
            None => self.rows.len() as u64,
        })
    }

    fn global_search(&mut self) -> Result<()> {
        if self.total_override.is_some() {
            return Ok(());
        }
        let Some(keyword) = self.request.keyword() else {
            return Ok(());
        };
        let spec = SearchSpec::new(&self.config.search, keyword, self.request.search.regex);
        let matchers = search::matchers(&spec)?;
        let columns = self.searchable_names();
        if columns.is_empty() {
            return Ok(());
        }
        self.retain_matching(&columns, &matchers);
        self.filter_applied = true;
        Ok(())
    }

    fn column_search(&mut self) -> Result<()> {
        if self.total_override.is_some() {
            return Ok(());
        }
        let searches: Vec<(String, String, bool)> = self
            .request
            .searchable_columns()
            .filter_map(|(_, c)| {
                c.keyword()
                    .map(|kw| (c.column_name().to_owned(), kw.to_owned(), c.search.regex))
            })
            .filter(|(name, _, _)| self.registry.is_searchable(name))
            .collect();

        for (name, keyword, is_regex) in searches {
            let mut spec = SearchSpec::new(&self.config.search, keyword, is_regex);
            spec.multi_term = false;
            let matchers = search::matchers(&spec)?;
            self.retain_matching(std::slice::from_ref(&name), &matchers);
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

        // later instructions first, so the primary key wins the final pass;
        // descending reverses the ascending sort instead of using a second
        // comparator
        for (name, direction) in orders.into_iter().rev() {
            let mut rows = std::mem::take(&mut self.rows);
            rows.sort_by(|a, b| {
                let left = value_at_path(a, &name).unwrap_or(&Value::Null);
                let right = value_at_path(b, &name).unwrap_or(&Value::Null);
                self.compare_cells(left, right)
            });
            if direction == SortDirection::Desc {
                rows.reverse();
            }
            self.rows = rows;
        }
        Ok(())
    }

    fn paginate(&mut self) -> Result<()> {
        if self.total_override.is_some() || !self.request.is_paging() {
            return Ok(());
        }
        let start = self.request.start.min(self.rows.len());
        let end = start
            .saturating_add(self.request.length as usize)
            .min(self.rows.len());
        self.rows = self.rows.drain(start..end).collect();
        Ok(())
    }

    fn results(&mut self) -> Result<Vec<RowMap>> {
        Ok(std::mem::take(&mut self.rows))
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
}
