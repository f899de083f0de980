pub mod booster;
pub mod collector;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod explore;
pub mod export;
pub mod features;
pub mod game_log;
pub mod http_cache;
pub mod http_client;
pub mod inference;
pub mod logging;
pub mod nba_stats;
pub mod rate_limit;
pub mod roster;
pub mod store;
