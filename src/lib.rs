pub mod aggregator;
pub mod channel;
pub mod config;
pub mod error;
pub mod fetch;
pub mod live;
pub mod model;
pub mod parser;
pub mod session;
pub mod trend;
pub mod window;
