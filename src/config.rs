use std::env;

use crate::engine::matching::{MatchParams, MatchWeights};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub expiry_sweep_interval_ms: u64,
    pub engine: EngineSettings,
}

/// The subset of configuration the engine worker and its state carry.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub settle_queue_size: usize,
    pub event_buffer_size: usize,
    pub proxy_max_iterations: u32,
    pub match_params: MatchParams,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settle_queue_size: 1024,
            event_buffer_size: 1024,
            proxy_max_iterations: 25,
            match_params: MatchParams::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let match_params = MatchParams {
            weights: MatchWeights {
                route: parse_or_default("MATCH_WEIGHT_ROUTE", 30.0)?,
                capacity: parse_or_default("MATCH_WEIGHT_CAPACITY", 30.0)?,
                vehicle: parse_or_default("MATCH_WEIGHT_VEHICLE", 20.0)?,
                reliability: parse_or_default("MATCH_WEIGHT_RELIABILITY", 20.0)?,
            },
            partial_vehicle_score: parse_or_default("PARTIAL_VEHICLE_SCORE", 50.0)?,
            route_falloff_km: parse_or_default("ROUTE_FALLOFF_KM", 500.0)?,
        };
        match_params.weights.validate().map_err(AppError::from)?;

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            expiry_sweep_interval_ms: parse_or_default("EXPIRY_SWEEP_INTERVAL_MS", 1000)?,
            engine: EngineSettings {
                settle_queue_size: parse_or_default("SETTLE_QUEUE_SIZE", 1024)?,
                event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
                proxy_max_iterations: parse_or_default("PROXY_MAX_ITERATIONS", 25)?,
                match_params,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
