// Library for tests to access modules

pub mod config;
pub mod detector;
pub mod error;
pub mod matcher;
pub mod models;
pub mod netinfo_repo;
pub mod orchestrator;
pub mod platform;
pub mod privilege;
pub mod speed;
pub mod upstream;
