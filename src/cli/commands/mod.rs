//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::{router, run_serve};
