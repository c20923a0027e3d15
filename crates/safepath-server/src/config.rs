//! Server configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub incident_csv: String,
    pub street_graph_path: Option<String>,
    pub grid_cache_max_entries: usize,
    pub grid_cache_max_age_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SAFEPATH_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            incident_csv: env::var("SAFEPATH_INCIDENT_CSV")
                .unwrap_or_else(|_| "data/incidents.csv".to_string()),
            street_graph_path: env::var("SAFEPATH_STREET_GRAPH").ok(),
            grid_cache_max_entries: env::var("SAFEPATH_GRID_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
            grid_cache_max_age_secs: env::var("SAFEPATH_GRID_CACHE_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(900),
        }
    }
}
