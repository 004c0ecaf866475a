pub mod config;
pub mod email;
pub mod payload;
pub mod policy;
pub mod reconcile;
pub mod week;
