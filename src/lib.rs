// =============================================================================
// Payment Risk Engine — library root
// =============================================================================
//
// `main.rs` is a thin binary wrapper around this library so that the
// `tests/` integration suite (and, eventually, any embedding host) can drive
// the pipeline's public surface without going through the Kafka/HTTP process
// entry point.
// =============================================================================

pub mod alert_publisher;
pub mod alert_summary;
pub mod api;
pub mod app_state;
pub mod error;
pub mod link_store;
pub mod recent_alerts;
pub mod risk_engine;
pub mod runtime_config;
pub mod stream_consumer;
pub mod types;
pub mod webhook_dispatcher;
pub mod window_aggregator;
