use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

/// A mapping from column name to value. Rows are immutable for readers
/// but can be built incrementally with [`RowBuilder`].
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        assert_eq!(columns.len(), values.len(), "row arity mismatch");
        Row { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Builds a mapping view, used by Selection/Projection to evaluate
    /// expressions against a row without repeated linear scans.
    pub fn as_map(&self) -> HashMap<&str, &Value> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.values.iter())
            .collect()
    }
}

/// Incrementally builds a [`Row`] before it's published to readers.
pub struct RowBuilder {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl RowBuilder {
    pub fn new() -> Self {
        RowBuilder { columns: Vec::new(), values: Vec::new() }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) -> &mut Self {
        self.columns.push(column.into());
        self.values.push(value);
        self
    }

    pub fn build(self) -> Row {
        Row::new(Arc::from(self.columns.into_boxed_slice()), self.values)
    }
}

impl Default for RowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_roundtrips_through_get() {
        let mut b = RowBuilder::new();
        b.push("id", Value::Int(1)).push("name", Value::String("a".into()));
        let row = b.build();
        assert_eq!(row.get("name"), Some(&Value::String("a".into())));
        assert_eq!(row.len(), 2);
    }
}
