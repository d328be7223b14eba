use serde::{Deserialize, Serialize};

/// The JSON configuration file's core-consumed key subset (listen
/// host/port, enabled data-source types, MVCC thresholds, paging budget,
/// session timeouts, slow-query threshold, optimizer-enable flag). The
/// full file may carry additional keys for the external collaborators
/// (auth backend, HTTP side-channel, ...); the core ignores those.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen_host: String,
    pub listen_port: u16,
    pub server_version: String,

    pub enabled_data_source_types: Vec<String>,

    /// Transaction id wrap threshold, per the `Transaction` data model.
    pub mvcc_wrap_threshold: u32,
    /// Byte budget the paging subsystem caps in-memory materialisation
    /// at before spilling column batches to a temporary directory.
    pub paging_budget_bytes: u64,

    pub session_max_age_secs: u64,
    pub query_timeout_millis: Option<u64>,
    pub slow_query_threshold_millis: u64,

    pub optimizer_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 3306,
            server_version: "8.0.34-gateway".to_string(),
            enabled_data_source_types: vec!["memory".to_string()],
            mvcc_wrap_threshold: u32::MAX - 1,
            paging_budget_bytes: 256 * 1024 * 1024,
            session_max_age_secs: 8 * 60 * 60,
            query_timeout_millis: None,
            slow_query_threshold_millis: 1_000,
            optimizer_enabled: true,
        }
    }
}

impl GatewayConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

/// The embed-mode entry point's config struct: `{cache enabled/size/TTL,
/// logger, debug mode, query timeout, optimizer enabled}`.
#[derive(Debug, Clone)]
pub struct EmbedConfig {
    pub cache_enabled: bool,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
    pub debug: bool,
    pub query_timeout_millis: Option<u64>,
    pub optimizer_enabled: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfig {
            cache_enabled: true,
            cache_size: 1024,
            cache_ttl_secs: 300,
            debug: false,
            query_timeout_millis: None,
            optimizer_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_addr() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:3306");
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let cfg = GatewayConfig::from_json(r#"{"listen_port": 4406}"#).unwrap();
        assert_eq!(cfg.listen_port, 4406);
        assert_eq!(cfg.listen_host, "0.0.0.0");
    }
}
