use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::err::{CResult, GatewayError};
use crate::schema::column::Column;

pub type TableRef = Arc<Table>;

/// An ordered list of column descriptors describing a table's shape.
/// Invariant: at most one auto-increment column (checked at construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> CResult<Self> {
        let auto_increment_count = columns.iter().filter(|c| c.auto_increment).count();
        if auto_increment_count > 1 {
            return Err(GatewayError::Configuration(
                "a table may declare at most one AUTO_INCREMENT column".into(),
            ));
        }
        Ok(Table { name: name.into(), columns })
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    pub fn auto_increment_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.auto_increment)
    }

    pub fn unique_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.unique || c.primary_key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ColumnType;

    #[test]
    fn rejects_two_auto_increment_columns() {
        let cols = vec![
            Column::new("a", ColumnType::Int).auto_increment(),
            Column::new("b", ColumnType::Int).auto_increment(),
        ];
        assert!(Table::new("t", cols).is_err());
    }
}
