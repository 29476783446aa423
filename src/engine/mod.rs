//! The per-source-kind engines and the shared `make()` orchestration.
//!
//! Every engine implements the same contract: total count, global search,
//! per-column search, filtered count, ordering, pagination, fetch. The
//! orchestration runs those steps in order, hands the raw rows to the row
//! transformer, and converts any failure per the configured error policy —
//! a raw fault never propagates past [`make`] unless the policy says so.

mod memory;
mod query;
mod relational;

pub use memory::MemoryEngine;
pub use query::QueryEngine;
pub use relational::RelationalEngine;

use serde_json::Value;

use crate::column::ColumnRegistry;
use crate::config::{EngineConfig, ErrorPolicy};
use crate::error::Result;
use crate::helpers::RowMap;
use crate::request::RequestDescriptor;
use crate::response::ResponseEnvelope;
use crate::template::TemplateRenderer;
use crate::transform::RowTransformer;

/// The storage seam for the SQL engines: run a rendered query, get rows
/// back as ordered column-name-to-value maps.
///
/// The engine treats the executor as exclusively owned for the duration of
/// one `make()` invocation.
pub trait QueryExecutor {
    fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<RowMap>>;
}

/// The shared engine contract.
pub trait Engine {
    /// Count before any filtering. Computed once, first.
    fn total_count(&mut self) -> Result<u64>;
    /// Count after the search predicates were applied.
    fn filtered_count(&mut self) -> Result<u64>;
    fn global_search(&mut self) -> Result<()>;
    fn column_search(&mut self) -> Result<()>;
    fn ordering(&mut self) -> Result<()>;
    fn paginate(&mut self) -> Result<()>;
    fn results(&mut self) -> Result<Vec<RowMap>>;

    fn request(&self) -> &RequestDescriptor;
    fn config(&self) -> &EngineConfig;
    fn registry(&self) -> &ColumnRegistry;
    fn renderer(&self) -> &dyn TemplateRenderer;
    /// Whether any filter predicate was actually applied. Tracked as a
    /// flag so an unfiltered request skips the second count query.
    fn filter_applied(&self) -> bool;
    /// Rendered queries executed so far, for the debug block.
    fn executed_queries(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Runs the full pipeline and assembles the envelope.
///
/// `keyed` selects the output row shape: column-keyed objects, or
/// positional values (with the reserved row keys still emitted keyed).
///
/// Failure handling: recoverable request errors always come back as a
/// structured `error` in a well-formed envelope; anything else follows the
/// configured [`ErrorPolicy`] — `Throw` is the only path that returns `Err`.
pub fn make<E: Engine>(engine: &mut E, keyed: bool) -> Result<ResponseEnvelope> {
    let draw = engine.request().draw;
    match process(engine, keyed) {
        Ok(envelope) => Ok(envelope),
        Err(err) if err.is_recoverable() => {
            tracing::debug!(error = %err, "recoverable request error");
            Ok(ResponseEnvelope::failure(draw, err.to_string()))
        }
        Err(err) => {
            tracing::error!(error = %err, "engine failure");
            match &engine.config().error {
                ErrorPolicy::Throw => Err(err),
                ErrorPolicy::Echo => Ok(ResponseEnvelope::failure(draw, err.to_string())),
                ErrorPolicy::Message(message) => {
                    Ok(ResponseEnvelope::failure(draw, message.clone()))
                }
            }
        }
    }
}

fn process<E: Engine>(engine: &mut E, keyed: bool) -> Result<ResponseEnvelope> {
    let records_total = engine.total_count()?;
    engine.global_search()?;
    engine.column_search()?;
    let records_filtered = if engine.filter_applied() {
        engine.filtered_count()?
    } else {
        records_total
    };
    engine.ordering()?;
    engine.paginate()?;
    let raw_rows = engine.results()?;

    let transformer = RowTransformer::new(
        engine.registry(),
        engine.config(),
        engine.renderer(),
        engine.request().start,
        keyed,
    );
    let data = transformer.transform(raw_rows)?;

    let mut envelope =
        ResponseEnvelope::new(engine.request().draw, records_total, records_filtered, data);
    if engine.config().debug {
        envelope.queries = Some(engine.executed_queries());
        envelope.input = Some(serde_json::to_value(engine.request())?);
    }
    Ok(envelope)
}
