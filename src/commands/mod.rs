//! CLI commands. Each builds on a [`Config`] and prints user-facing results.

pub mod config;
mod list;
mod package;
mod publish;
mod publishers;
mod unpublish;

pub use config::Config;
pub use list::list;
pub use package::package;
pub use publish::{PublishRequest, publish};
pub use publishers::{login, logout, ls_publishers};
pub use unpublish::unpublish;
