use std::path::Path;
use std::process::Command;

/// Commit hash of the git checkout containing `dir`.
///
/// `None` when git is not installed or `dir` is outside a repository.
pub fn commit_hash(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!("No git checkout around {}", dir.display());
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}
