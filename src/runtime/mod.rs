//! System boundary used by every operation: files, archives on disk,
//! temporary paths, directories and terminal prompts.
//!
//! Pipeline code only sees [`Runtime`], so tests swap in `MockRuntime`.
//!
//! - `env`: home and working directories
//! - `fs`: file reads and writes, directory listing, temp paths
//! - `user`: prompts

mod env;
mod fs;
mod user;

use anyhow::Result;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

/// A reader that supports random access, as required by zip central directory parsing.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    /// Set the file mode. Unix only; a no-op elsewhere.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Open a file for seekable reading. Archives are read through this without
    /// loading them into memory.
    fn open(&self, path: &Path) -> Result<Box<dyn ReadSeek>>;

    /// Allocate a unique, persisted file path in the system temp directory.
    /// The file is not removed when the process exits.
    fn temp_file_path(&self, suffix: &str) -> Result<PathBuf>;

    // Directories
    fn home_dir(&self) -> Option<PathBuf>;
    fn current_dir(&self) -> Result<PathBuf>;

    // User interaction
    /// Print a prompt and return the line the user typed, trimmed.
    fn prompt(&self, prompt: &str) -> Result<String>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.set_permissions_impl(path, mode)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ReadSeek>> {
        self.open_impl(path)
    }

    fn temp_file_path(&self, suffix: &str) -> Result<PathBuf> {
        self.temp_file_path_impl(suffix)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir_impl()
    }

    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    fn prompt(&self, prompt: &str) -> Result<String> {
        self.prompt_impl(prompt)
    }
}
