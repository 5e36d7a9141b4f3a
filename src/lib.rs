pub mod audit;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod validate;
