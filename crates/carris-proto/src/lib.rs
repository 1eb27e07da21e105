pub mod arrivals;
pub mod client;
pub mod config;
pub mod error;
pub mod insight;
pub mod model;
pub mod platform;
pub mod time;
