pub mod config;
pub mod errors;
pub mod filters;
pub mod mastery;
pub mod models;
pub mod repo;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod streak;

pub use config::*;
pub use errors::*;
pub use filters::*;
pub use mastery::*;
pub use models::*;
pub use repo::*;
pub use scheduler::*;
pub use service::*;
pub use stats::*;
pub use streak::*;
