//! Where `wss` looks for its config file and writes its activity log.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Directory name used under the XDG-style config and data roots.
const APP_DIR: &str = "wss";

/// `$HOME`, or `/tmp` (with a stderr warning) on hosts that do not set it.
pub fn home_dir() -> PathBuf {
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home);
    }
    eprintln!("[WSS-CONFIG] WARNING: HOME not set, falling back to /tmp");
    PathBuf::from("/tmp")
}

/// `~/.config/wss`, honoring `XDG_CONFIG_HOME` when set.
pub fn config_dir() -> PathBuf {
    env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map_or_else(|| home_dir().join(".config"), PathBuf::from)
        .join(APP_DIR)
}

/// `~/.local/share/wss`, honoring `XDG_DATA_HOME` when set.
pub fn data_dir() -> PathBuf {
    env::var_os("XDG_DATA_HOME")
        .filter(|v| !v.is_empty())
        .map_or_else(|| home_dir().join(".local").join("share"), PathBuf::from)
        .join(APP_DIR)
}

/// Make `path` absolute for log and script locations.
///
/// Paths that exist go through `canonicalize`. Missing ones (a log file not yet
/// created) are joined onto the working directory and cleaned lexically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let joined = match env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };
    std::fs::canonicalize(&joined).unwrap_or_else(|_| normalize_syntactic(&joined))
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    path.components()
        .fold(Vec::<Component<'_>>::new(), |mut kept, part| {
            match part {
                Component::CurDir => {}
                Component::ParentDir => {
                    if matches!(kept.last(), Some(Component::Normal(_))) {
                        kept.pop();
                    }
                }
                other => kept.push(other),
            }
            kept
        })
        .into_iter()
        .collect()
}
