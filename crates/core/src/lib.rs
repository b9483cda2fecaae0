pub mod aim;
pub mod channel;
pub mod config;
#[cfg(feature = "debug-capture")]
pub mod diag;
pub mod engine;
pub mod extract;
pub mod hsv;
pub mod listener;
pub mod logger;
pub mod platform;
pub mod roi;
pub mod segment;
pub mod sleep;
pub mod trigger;
pub mod types;
