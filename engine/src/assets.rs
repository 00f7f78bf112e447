use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no `assets` directory found in any parent of the working or executable directory")]
    NotFound,
}

/// Walks upward from `start`, returning the first subdirectory literally
/// named `name`. The filesystem root itself is never checked; the walk ends
/// once it runs out of parents.
pub fn find_dir_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    let mut dir = start;
    while let Some(parent) = dir.parent() {
        let candidate = dir.join(name);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = parent;
    }
    None
}

/// Locates the `assets` directory, trying the working directory first and the
/// executable's directory second. The result is computed once at startup and
/// handed to whoever needs it.
pub fn locate_assets() -> Result<PathBuf, AssetError> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(found) = find_dir_upwards(&cwd, "assets") {
            return Ok(found);
        }
    }

    // The working directory may be unrelated to the install location, e.g.
    // when launched from a desktop shortcut. Retry from the binary itself.
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(found) = find_dir_upwards(dir, "assets") {
                return Ok(found);
            }
        }
    }

    Err(AssetError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir() -> PathBuf {
        let unique = format!(
            "engine-assets-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let dir = env::temp_dir().join(unique);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finds_assets_from_any_descendant() {
        let root = scratch_dir();
        let assets = root.join("project").join("assets");
        let deep = root.join("project").join("src").join("nested");
        fs::create_dir_all(&assets).unwrap();
        fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_dir_upwards(&deep, "assets").as_deref(), Some(&*assets));
        assert_eq!(
            find_dir_upwards(&root.join("project"), "assets").as_deref(),
            Some(&*assets)
        );

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_directory_is_not_found() {
        let root = scratch_dir();
        let deep = root.join("a").join("b");
        fs::create_dir_all(&deep).unwrap();

        // A name no ancestor can plausibly contain, so the walk runs all the
        // way to the filesystem root.
        let name = format!("no-such-dir-{}", std::process::id());
        assert_eq!(find_dir_upwards(&deep, &name), None);

        fs::remove_dir_all(&root).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn the_walk_stops_before_the_filesystem_root() {
        // `/tmp` exists on unix, so a walk that checked the root itself
        // would return it.
        assert_eq!(find_dir_upwards(Path::new("/"), "tmp"), None);
    }

    #[test]
    fn a_file_named_assets_does_not_count() {
        let root = scratch_dir();
        let deep = root.join("tree").join("leaf");
        fs::create_dir_all(&deep).unwrap();
        let name = format!("assets-file-{}", std::process::id());
        fs::write(root.join("tree").join(&name), b"not a directory").unwrap();

        assert_eq!(find_dir_upwards(&deep, &name), None);

        fs::remove_dir_all(&root).unwrap();
    }
}
