mod manifest;
pub mod version;

pub use manifest::{MANIFEST_FILE, Manifest, validate_extension_name, validate_publisher};
pub use version::{BumpDirective, resolve_version};
