//! Thin wrapper over the local `git` binary
//!
//! The local sync and restore paths drive the working copy through git
//! subprocesses. This module keeps the invocation plumbing in one place:
//! capturing output, flattening it into loggable text, and redacting the
//! access token that the push URL embeds.

use std::path::Path;
use tokio::process::Command;

use crate::error::Result;

/// Captured result of one git invocation
#[derive(Debug)]
pub(crate) struct GitOutput {
    /// Whether the command exited successfully
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl GitOutput {
    /// Combined output for diagnostics
    pub fn text(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }

    /// Check whether either stream mentions a marker phrase
    pub fn mentions(&self, phrase: &str) -> bool {
        self.stdout.contains(phrase) || self.stderr.contains(phrase)
    }
}

/// Run git with the given arguments inside a working directory
pub(crate) async fn run(workdir: &Path, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(workdir)
        .args(args)
        .output()
        .await?;
    Ok(GitOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Strip an embedded secret from diagnostic text
///
/// Git error messages echo the remote URL, which carries the access token.
pub(crate) fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "***")
    }
}
