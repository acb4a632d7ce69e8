pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod identity;
pub mod io;
pub mod storage;

pub use domain::*;
pub use storage::DocumentStore;
