//! The parsed, immutable view of an inbound grid request.
//!
//! The wire shape follows the common grid protocol: a draw token, a page
//! window, one global search field and per-column entries addressed
//! positionally by the `order` instructions.

use serde::{Deserialize, Serialize};

/// Sort direction for one order instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A search field: the keyword plus whether it is a regular expression.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchField {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub regex: bool,
}

/// One per-column entry of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnEntry {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub orderable: bool,
    #[serde(default)]
    pub search: SearchField,
}

impl ColumnEntry {
    /// The logical column name: `name` when present, else the `data` key.
    pub fn column_name(&self) -> &str {
        if self.name.is_empty() {
            &self.data
        } else {
            &self.name
        }
    }

    /// The per-column search keyword, trimmed, if any.
    pub fn keyword(&self) -> Option<&str> {
        let kw = self.search.value.trim();
        (!kw.is_empty()).then_some(kw)
    }
}

/// One `(columnIndex, direction)` sort instruction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OrderInstruction {
    pub column: usize,
    #[serde(default)]
    pub dir: SortDirection,
}

fn default_true() -> bool {
    true
}

fn default_length() -> i64 {
    -1
}

/// Parsed request parameters. Built once per request and read-only after.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestDescriptor {
    #[serde(default)]
    pub draw: u64,
    #[serde(default)]
    pub start: usize,
    /// Page size; `-1` means no paging.
    #[serde(default = "default_length")]
    pub length: i64,
    #[serde(default)]
    pub search: SearchField,
    #[serde(default)]
    pub order: Vec<OrderInstruction>,
    #[serde(default)]
    pub columns: Vec<ColumnEntry>,
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self {
            draw: 0,
            start: 0,
            length: default_length(),
            search: SearchField::default(),
            order: Vec::new(),
            columns: Vec::new(),
        }
    }
}

impl RequestDescriptor {
    /// The trimmed global keyword, if the request carries one.
    pub fn keyword(&self) -> Option<&str> {
        let kw = self.search.value.trim();
        (!kw.is_empty()).then_some(kw)
    }

    pub fn is_paging(&self) -> bool {
        self.length != -1
    }

    /// Columns flagged searchable by the client, with their positions.
    pub fn searchable_columns(&self) -> impl Iterator<Item = (usize, &ColumnEntry)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.searchable && !c.column_name().is_empty())
    }

    /// Valid order instructions. Out-of-range column indexes are skipped,
    /// not treated as errors.
    pub fn orders(&self) -> impl Iterator<Item = (&ColumnEntry, SortDirection)> {
        self.order.iter().filter_map(|o| {
            self.columns
                .get(o.column)
                .filter(|c| c.orderable)
                .map(|c| (c, o.dir))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_shape() {
        let request: RequestDescriptor = serde_json::from_value(serde_json::json!({
            "draw": 3,
            "start": 20,
            "length": 10,
            "search": { "value": "rio", "regex": false },
            "order": [ { "column": 1, "dir": "desc" }, { "column": 9 } ],
            "columns": [
                { "data": "id", "searchable": false },
                { "data": "name", "name": "cities.name" },
            ]
        }))
        .unwrap();

        assert_eq!(request.draw, 3);
        assert_eq!(request.keyword(), Some("rio"));
        assert_eq!(request.searchable_columns().count(), 1);

        // out-of-range order index is dropped
        let orders: Vec<_> = request.orders().collect();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].0.column_name(), "cities.name");
        assert_eq!(orders[0].1, SortDirection::Desc);
    }

    #[test]
    fn unpaged_by_default() {
        let request = RequestDescriptor::default();
        assert!(!request.is_paging());
        assert_eq!(request.keyword(), None);
    }
}
