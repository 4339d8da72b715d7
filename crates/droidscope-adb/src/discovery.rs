use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::AdbError;

/// A resolved executable plus the environment it should run with.
#[derive(Clone, Debug)]
pub struct Discovery {
    pub path: PathBuf,
    pub env: Vec<(String, String)>,
}

/// Maps a command name to an executable location.
pub trait ToolFinder: Send + Sync {
    fn find(&self, name: &str) -> Result<Discovery, AdbError>;
}

/// Locates SDK tools under the usual environment roots, falling back to PATH.
///
/// Results are memoized for the lifetime of the finder; a tool that appears
/// on PATH mid-session is picked up on the next fresh finder, not here.
#[derive(Default)]
pub struct SdkFinder {
    cache: Mutex<HashMap<String, Discovery>>,
}

/// Environment variables that may point at an Android SDK root.
const SDK_ROOT_VARS: [&str; 2] = ["ANDROID_HOME", "ANDROID_SDK_ROOT"];

impl SdkFinder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToolFinder for SdkFinder {
    fn find(&self, name: &str) -> Result<Discovery, AdbError> {
        if let Some(hit) = self.cache.lock().get(name) {
            return Ok(hit.clone());
        }

        let found = locate(name)?;
        tracing::debug!(tool = name, path = %found.path.display(), "tool located");
        self.cache
            .lock()
            .insert(name.to_string(), found.clone());
        Ok(found)
    }
}

fn locate(name: &str) -> Result<Discovery, AdbError> {
    let binary = format!("{name}{}", env::consts::EXE_SUFFIX);

    for root_var in SDK_ROOT_VARS {
        if let Ok(root) = env::var(root_var) {
            let candidate = Path::new(&root).join("platform-tools").join(&binary);
            if is_executable(&candidate) {
                return Ok(Discovery {
                    path: candidate,
                    env: vec![(root_var.to_string(), root)],
                });
            }
        }
    }

    if let Some(path_var) = env::var_os("PATH") {
        for dir in env::split_paths(&path_var) {
            let candidate = dir.join(&binary);
            if is_executable(&candidate) {
                return Ok(Discovery {
                    path: candidate,
                    env: Vec::new(),
                });
            }
        }
    }

    Err(AdbError::ToolNotFound {
        name: name.to_string(),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
