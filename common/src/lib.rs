pub mod config;
pub mod error;
pub mod plot;
pub mod series;
pub mod util;
