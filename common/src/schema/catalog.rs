use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::err::{CResult, GatewayError};
use crate::schema::table::{Table, TableRef};

pub type CatalogRef = Arc<Catalog>;
pub type DataSourceRef = CatalogRef;

/// Maps a lock-acquisition failure into a [`GatewayError`] instead of
/// unwrapping and panicking a whole session over a poisoned lock.
macro_rules! read_lock {
    ($lock:expr) => {
        $lock
            .read()
            .map_err(|_| GatewayError::Execution("catalog lock poisoned".into()))
    };
}

macro_rules! write_lock {
    ($lock:expr) => {
        $lock
            .write()
            .map_err(|_| GatewayError::Execution("catalog lock poisoned".into()))
    };
}

/// One named data source as seen by the planner/catalog: its table
/// definitions, protected by a reader/writer lock held for the duration
/// of each operation (reads concurrent, mutations exclusive), per the
/// concurrency model.
#[derive(Debug)]
pub struct Catalog {
    pub name: String,
    tables: RwLock<HashMap<String, TableRef>>,
}

impl Catalog {
    pub fn new(name: impl Into<String>) -> Self {
        Catalog { name: name.into(), tables: RwLock::new(HashMap::new()) }
    }

    pub fn create_table(&self, table: Table) -> CResult<()> {
        let mut tables = write_lock!(self.tables)?;
        if tables.contains_key(&table.name) {
            return Err(GatewayError::Configuration(format!(
                "table '{}' already exists",
                table.name
            )));
        }
        tables.insert(table.name.clone(), Arc::new(table));
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> CResult<()> {
        let mut tables = write_lock!(self.tables)?;
        if tables.remove(name).is_none() {
            return Err(GatewayError::UnknownTable(name.to_string()));
        }
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> CResult<Option<TableRef>> {
        let tables = read_lock!(self.tables)?;
        Ok(tables.get(name).cloned())
    }

    pub fn table(&self, name: &str) -> CResult<TableRef> {
        self.get_table(name)?.ok_or_else(|| GatewayError::UnknownTable(name.to_string()))
    }

    pub fn table_names(&self) -> CResult<Vec<String>> {
        let tables = read_lock!(self.tables)?;
        Ok(tables.keys().cloned().collect())
    }
}

/// The top-level registry of named data sources, loaded once at startup
/// from the data-source definitions array and referenced by every
/// session. Replaces the teacher's process-wide static `Metadata`
/// instance with an explicitly-constructed, explicitly-owned object per
/// the "global mutable catalog" redesign note.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    catalogs: RwLock<HashMap<String, CatalogRef>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, catalog: Catalog) -> CResult<CatalogRef> {
        let catalog = Arc::new(catalog);
        let mut catalogs = write_lock!(self.catalogs)?;
        catalogs.insert(catalog.name.clone(), catalog.clone());
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> CResult<Option<CatalogRef>> {
        let catalogs = read_lock!(self.catalogs)?;
        Ok(catalogs.get(name).cloned())
    }

    pub fn names(&self) -> CResult<Vec<String>> {
        let catalogs = read_lock!(self.catalogs)?;
        Ok(catalogs.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::Column;
    use crate::value::ColumnType;

    #[test]
    fn register_and_lookup_table() {
        let registry = CatalogRegistry::new();
        let catalog = registry.register(Catalog::new("main")).unwrap();
        let table = Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap();
        catalog.create_table(table).unwrap();

        let found = registry.get("main").unwrap().unwrap();
        assert!(found.table("t").is_ok());
        assert!(found.table("missing").is_err());
    }

    #[test]
    fn create_table_rejects_duplicate_name() {
        let catalog = Catalog::new("main");
        let table = Table::new("t", vec![Column::new("id", ColumnType::Int)]).unwrap();
        catalog.create_table(table.clone()).unwrap();
        assert!(catalog.create_table(table).is_err());
    }
}
