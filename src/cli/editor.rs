use std::env;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

const DEFAULT_EDITOR: &str = "vi";

/// $VISUAL, then $EDITOR, then vi
pub fn editor() -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| String::from(DEFAULT_EDITOR))
}

pub fn edit(path: &Path) -> Result<()> {
    edit_with(&editor(), path)
}

/// Run `editor path` through the shell, so editors with flags (`code --wait`) work
pub fn edit_with(editor: &str, path: &Path) -> Result<()> {
    debug!("Editing {} with {}", path.display(), editor);
    let status = Command::new("/bin/sh")
        .arg("-c")
        .arg(format!("{} \"$1\"", editor))
        .arg(editor)
        .arg(path)
        .status()
        .map_err(|err| Error::Editor {
            editor: editor.to_string(),
            reason: err.to_string(),
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Editor {
            editor: editor.to_string(),
            reason: format!("exited with {}", status),
        })
    }
}
