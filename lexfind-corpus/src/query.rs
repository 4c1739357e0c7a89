//! Compiled query types and alias resolution
//!
//! The engine compiles predicate sequences down to a [`CompiledQuery`]; the
//! store executes it. Parameter values travel separately from the query text
//! so they are bound, never interpolated.

use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A bound SQL parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Text(String),
    Int(i64),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            SqlValue::Int(i) => Ok(ToSqlOutput::from(*i)),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Int(i)
    }
}

/// A compiled, parameterized storage query.
///
/// Opaque to callers: the only supported operations are execution and
/// plan explanation through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// One row returned by query execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// Normalizes a raw name (school, practice area) to its canonical form.
pub trait AliasResolver: Send + Sync {
    /// Returns the canonical form, or the input unchanged when no mapping
    /// exists.
    fn normalize(&self, raw: &str) -> String;
}

/// Resolver with no mappings; every input comes back unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAliases;

impl AliasResolver for NoAliases {
    fn normalize(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// In-memory alias table, usually loaded from the store's alias tables.
///
/// Lookups are case-insensitive on the alias side; canonical names are also
/// self-mapped so already-normalized inputs pass through.
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias for a canonical name.
    pub fn insert(&mut self, alias: impl Into<String>, normalized: impl Into<String>) {
        let normalized = normalized.into();
        self.map
            .insert(alias.into().trim().to_lowercase(), normalized.clone());
        self.map
            .insert(normalized.trim().to_lowercase(), normalized);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl AliasResolver for AliasTable {
    fn normalize(&self, raw: &str) -> String {
        self.map
            .get(&raw.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_table_maps_alias() {
        let mut table = AliasTable::new();
        table.insert("yale law school", "Yale");

        assert_eq!(table.normalize("Yale Law School"), "Yale");
        assert_eq!(table.normalize("  yale law school "), "Yale");
    }

    #[test]
    fn test_alias_table_self_maps_canonical() {
        let mut table = AliasTable::new();
        table.insert("yale law school", "Yale");

        assert_eq!(table.normalize("yale"), "Yale");
    }

    #[test]
    fn test_alias_table_falls_back_to_input() {
        let table = AliasTable::new();
        assert_eq!(table.normalize("Unknown School"), "Unknown School");
    }

    #[test]
    fn test_no_aliases_identity() {
        assert_eq!(NoAliases.normalize("anything"), "anything");
    }

    #[test]
    fn test_sql_value_conversions() {
        assert_eq!(SqlValue::from("x"), SqlValue::Text("x".to_string()));
        assert_eq!(SqlValue::from(2015i64), SqlValue::Int(2015));
    }
}
