use std::env;

use crate::fetcher::{DEFAULT_IV_URL, DEFAULT_RADIUS_DEGREES};

#[derive(Debug, Clone)]
pub struct Config {
    pub iv_url: String,
    pub radius_degrees: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            iv_url: env::var("NWIS_IV_URL").unwrap_or_else(|_| DEFAULT_IV_URL.to_string()),
            radius_degrees: env::var("SEARCH_RADIUS_DEGREES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RADIUS_DEGREES),
        }
    }
}
