pub mod config;
pub mod logging;

pub mod deliver;
pub mod fetch;
pub mod job;
pub mod name;
pub mod retry;
pub mod runner;
