use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of the data-source definitions JSON array: `{type, name,
/// host?, port?, username?, password?, database, writable, options?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceDef {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_definition() {
        let json = r#"{"type":"memory","name":"main","database":"main","writable":true}"#;
        let def: DataSourceDef = serde_json::from_str(json).unwrap();
        assert_eq!(def.kind, "memory");
        assert!(def.writable);
        assert!(def.options.is_empty());
    }
}
