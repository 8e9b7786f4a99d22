//! Atomic placement of rendered artifacts under the output directory.

use crate::render::Artifact;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Write every file of `artifact` under `out_dir` and return the final paths.
///
/// All files are staged as temp files next to their targets first; only when
/// every one of them is written and synced are they renamed into place. If a
/// rename fails, the files already moved are put back to their previous
/// contents (or removed if they did not exist), so a backend never sees a mix
/// of old and new files.
pub fn write_artifact(out_dir: &Path, artifact: &Artifact) -> crate::Result<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(artifact.files.len());
    for file in &artifact.files {
        let target = out_dir.join(&file.path);
        let dir = target
            .parent()
            .with_context(|| format!("{} has no parent directory", target.display()))?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(file.contents.as_bytes())
            .with_context(|| format!("failed to write {}", target.display()))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("failed to sync {}", target.display()))?;
        set_readable(&tmp)?;
        debug!(path = %target.display(), bytes = file.contents.len(), "staged");
        staged.push((tmp, target));
    }

    let mut placed: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());
    for (tmp, target) in staged {
        let result = previous_contents(&target).and_then(|previous| {
            tmp.persist(&target)
                .with_context(|| format!("failed to move {} into place", target.display()))?;
            Ok(previous)
        });
        match result {
            Ok(previous) => placed.push((target, previous)),
            Err(err) => {
                roll_back(&placed);
                return Err(err);
            }
        }
    }

    let written: Vec<PathBuf> = placed.into_iter().map(|(target, _)| target).collect();
    info!(backend = artifact.backend, files = written.len(), "wrote artifact");
    Ok(written)
}

fn previous_contents(target: &Path) -> crate::Result<Option<Vec<u8>>> {
    match std::fs::read(target) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", target.display())),
    }
}

fn roll_back(placed: &[(PathBuf, Option<Vec<u8>>)]) {
    for (target, previous) in placed.iter().rev() {
        let restored = match previous {
            Some(bytes) => std::fs::write(target, bytes),
            None => std::fs::remove_file(target),
        };
        match restored {
            Ok(()) => debug!(path = %target.display(), "rolled back"),
            Err(e) => warn!(path = %target.display(), "rollback failed: {e}"),
        }
    }
}

#[cfg(unix)]
fn set_readable(tmp: &NamedTempFile) -> crate::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tmp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
        .with_context(|| format!("failed to set permissions on {}", tmp.path().display()))
}

#[cfg(not(unix))]
fn set_readable(_: &NamedTempFile) -> crate::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Section;
    use crate::render::ArtifactFile;
    use tempfile::TempDir;

    fn artifact(files: &[(&str, &str)]) -> Artifact {
        Artifact {
            backend: "test",
            section: Section::Logging,
            files: files
                .iter()
                .map(|(path, contents)| ArtifactFile {
                    path: PathBuf::from(path),
                    contents: contents.to_string(),
                })
                .collect(),
            names: Vec::new(),
        }
    }

    #[test]
    fn writes_nested_files() {
        let dir = TempDir::new().unwrap();
        let written =
            write_artifact(dir.path(), &artifact(&[("a/one.conf", "1"), ("a/two.conf", "2")]))
                .unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read_to_string(dir.path().join("a/one.conf")).unwrap(), "1");
        assert_eq!(std::fs::read_to_string(dir.path().join("a/two.conf")).unwrap(), "2");
    }

    #[test]
    fn overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        write_artifact(dir.path(), &artifact(&[("x/f.yaml", "old")])).unwrap();
        write_artifact(dir.path(), &artifact(&[("x/f.yaml", "new")])).unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("x/f.yaml")).unwrap(), "new");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("x"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("f.yaml")]);
    }

    #[test]
    fn failed_rename_restores_earlier_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.conf"), "old main").unwrap();
        // a directory where the second file should go makes its rename fail
        std::fs::create_dir(dir.path().join("parser.conf")).unwrap();
        std::fs::write(dir.path().join("parser.conf/keep"), "").unwrap();

        let result = write_artifact(
            dir.path(),
            &artifact(&[("main.conf", "new main"), ("parser.conf", "new parser")]),
        );
        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.conf")).unwrap(),
            "old main"
        );

        let mut entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                std::ffi::OsString::from("main.conf"),
                std::ffi::OsString::from("parser.conf")
            ]
        );
    }

    #[test]
    fn failed_rename_removes_files_that_were_new() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("parser.conf")).unwrap();
        std::fs::write(dir.path().join("parser.conf/keep"), "").unwrap();

        let result = write_artifact(
            dir.path(),
            &artifact(&[("main.conf", "new main"), ("parser.conf", "new parser")]),
        );
        assert!(result.is_err());
        assert!(!dir.path().join("main.conf").exists());
        assert!(dir.path().join("parser.conf").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        write_artifact(dir.path(), &artifact(&[("f.conf", "x")])).unwrap();
        let mode = std::fs::metadata(dir.path().join("f.conf"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
