pub mod archive;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod season;
pub mod supervisor;
pub mod terminal;
pub mod weather;
