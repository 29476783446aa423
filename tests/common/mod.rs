//! Shared fixtures: a seeded in-memory SQLite database, a rusqlite-backed
//! executor, and request builders.

#![allow(dead_code)]

use gridquery::prelude::*;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Map, Value, json};

const SCHEMA: &str = r#"
CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE cities (id INTEGER PRIMARY KEY, name TEXT NOT NULL, country_id INTEGER);
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    age INTEGER,
    city_id INTEGER
);
CREATE TABLE roles (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE role_user (user_id INTEGER, role_id INTEGER);
CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT NOT NULL);

INSERT INTO countries VALUES (1, 'Brazil'), (2, 'Portugal');
INSERT INTO cities VALUES
    (1, 'São Paulo', 1),
    (2, 'Rio', 1),
    (3, 'Lisbon', 2);
INSERT INTO users VALUES
    (1, 'Ada Lovelace', 'ada@calc.dev', 36, 3),
    (2, 'Grace Hopper', 'grace@navy.mil', 45, 2),
    (3, 'Alan Turing', NULL, 41, 3),
    (4, 'Barbara Liskov', 'barbara@mit.edu', NULL, 1),
    (5, 'Edsger Dijkstra', 'edsger@ewd.nl', NULL, 1);
INSERT INTO roles VALUES (1, 'admin'), (2, 'editor');
INSERT INTO role_user VALUES (1, 1), (2, 2), (3, 2);
INSERT INTO posts VALUES
    (1, 1, 'Notes on the analytical engine'),
    (2, 2, 'Compilers from scratch'),
    (3, 3, 'On computable numbers');
"#;

/// `QueryExecutor` over a rusqlite connection.
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    pub fn seeded() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(SCHEMA).expect("seed schema");
        Self { conn }
    }
}

impl QueryExecutor for SqliteExecutor {
    fn fetch(&mut self, sql: &str, params: &[Value]) -> gridquery::Result<Vec<RowMap>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| GridError::Execution(e.to_string()))?;
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(bind_value)))
            .map_err(|e| GridError::Execution(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| GridError::Execution(e.to_string()))? {
            let mut map = Map::new();
            for (i, name) in names.iter().enumerate() {
                let value = row
                    .get_ref(i)
                    .map_err(|e| GridError::Execution(e.to_string()))?;
                map.insert(name.clone(), json_value(value));
            }
            out.push(map);
        }
        Ok(out)
    }
}

fn bind_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                rusqlite::types::Value::Integer(i)
            } else {
                rusqlite::types::Value::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        other => rusqlite::types::Value::Text(other.to_string()),
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

/// Builds a request over named columns with a global keyword, sort
/// instructions and a page window.
pub fn request(
    columns: &[&str],
    keyword: &str,
    order: &[(usize, &str)],
    start: usize,
    length: i64,
) -> RequestDescriptor {
    let columns: Vec<Value> = columns.iter().map(|c| json!({ "data": c })).collect();
    let order: Vec<Value> = order
        .iter()
        .map(|(column, dir)| json!({ "column": column, "dir": dir }))
        .collect();
    serde_json::from_value(json!({
        "draw": 1,
        "start": start,
        "length": length,
        "search": { "value": keyword, "regex": false },
        "order": order,
        "columns": columns,
    }))
    .expect("request fixture")
}

/// Adds a per-column search value to one column of a request.
pub fn with_column_search(
    mut request: RequestDescriptor,
    index: usize,
    keyword: &str,
) -> RequestDescriptor {
    request.columns[index].search.value = keyword.to_owned();
    request
}

/// The city rows used by the in-memory tests, mirroring the `cities` table.
pub fn city_rows() -> Vec<RowMap> {
    [
        json!({ "id": 1, "name": "São Paulo", "country_id": 1 }),
        json!({ "id": 2, "name": "Rio", "country_id": 1 }),
        json!({ "id": 3, "name": "Lisbon", "country_id": 2 }),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect()
}

/// Extracts a column from every data row of a keyed envelope.
pub fn column_values(envelope: &ResponseEnvelope, name: &str) -> Vec<Value> {
    envelope.data.iter().map(|row| row[name].clone()).collect()
}
