pub mod config;
pub mod engine;
pub mod market_data;
pub mod monitor;
pub mod notify;
pub mod persist;
pub mod telemetry;

#[cfg(test)]
mod test_http;
