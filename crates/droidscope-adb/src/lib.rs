//! adb integration for droidscope
//!
//! This crate locates the `adb` executable and spawns the `logcat`
//! subprocess. Discovery is an explicit, injectable service so that tests
//! and embedders can substitute their own lookup.

mod discovery;
mod spawn;

use std::path::PathBuf;

use thiserror::Error;

pub use discovery::{Discovery, SdkFinder, ToolFinder};
pub use spawn::{logcat_command, spawn_logcat};

/// Errors that may occur while locating or launching adb.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("`{name}` executable not found (checked ANDROID_HOME, ANDROID_SDK_ROOT and PATH)")]
    ToolNotFound { name: String },
    #[error("`{binary}` could not be spawned: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
