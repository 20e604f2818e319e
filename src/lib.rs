pub mod application;
pub mod archive;
pub mod commands;
pub mod error;
pub mod gallery;
pub mod package;
pub mod runtime;
pub mod store;
