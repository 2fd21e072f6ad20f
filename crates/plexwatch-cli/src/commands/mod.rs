pub mod clear;
pub mod config;
pub mod daemon;
pub mod prompts;
pub mod runner;
pub mod scan;
pub mod status;
