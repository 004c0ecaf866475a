pub mod config;
pub mod hours;
