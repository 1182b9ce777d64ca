pub mod config;
pub mod logging;

pub mod job;
pub mod merge;
pub mod pipeline;
pub mod planner;
pub mod remote;
pub mod scheduler;
pub mod url_model;
pub mod worker;
