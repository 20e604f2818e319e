//! Package archives: building them and reading the manifest back out.

mod pack;
mod zip;

pub use pack::{PackOptions, PackageResult, Packager, ZipPackager, rewrite_relative_links};
pub use self::zip::{ARCHIVE_MANIFEST_PATH, extract_manifest};

#[cfg(test)]
pub use pack::MockPackager;
