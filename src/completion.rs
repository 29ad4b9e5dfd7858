use crate::config::CliArgs;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const BIN_NAME: &str = "kcq";

pub fn generate(shell: Shell, out: &mut dyn Write) {
    let mut cmd = CliArgs::command();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, out);
}

/// Writes `_kcq` into `dir` unless it is already there.
pub fn ensure_zsh_completion(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let path = dir.join(format!("_{}", BIN_NAME));
    if path.exists() {
        return Ok(None);
    }

    let mut script = Vec::new();
    generate(Shell::Zsh, &mut script);

    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, script)?;
    info!(path = %path.display(), "wrote zsh completion");

    Ok(Some(path))
}
