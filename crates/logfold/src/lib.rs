// Module structure for the logfold line merger.

// Core pipeline
pub mod event;
pub mod merge;
pub mod pattern;
pub mod reader;

// Collaborators
pub mod cli;
pub mod config;
pub mod runtime;
pub mod sink;
