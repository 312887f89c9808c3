pub mod action;
pub mod case;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod env_api;
pub mod error;
pub mod harness;
pub mod logger;
pub mod middleware;
pub mod mock;
pub mod recovery;
pub mod registry;
pub mod report;
pub mod runner;
