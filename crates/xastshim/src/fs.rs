use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use anyhow::Context;
use ignore::WalkBuilder;

/// Expands the given paths into the XML files they refer to. Directories are walked
/// recursively for `.svg` and `.xml` files in name order, skipping hidden and ignored files.
pub fn load_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = vec![];
    for path in paths {
        let metadata =
            std::fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
        if metadata.is_file() {
            files.push(path.clone());
            continue;
        }
        walk_dir(path, &mut files);
    }
    Ok(files)
}

fn walk_dir(path: &Path, files: &mut Vec<PathBuf>) {
    for entry in WalkBuilder::new(path)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("skipping entry of {}: {err}", path.display());
                continue;
            }
        };
        if entry.file_type().is_none_or(|file_type| !file_type.is_file()) {
            continue;
        }
        let entry = entry.into_path();
        if is_xml(&entry) {
            files.push(entry);
        }
    }
}

fn is_xml(path: &Path) -> bool {
    matches!(path.extension().and_then(OsStr::to_str), Some("svg" | "xml"))
}

#[test]
fn is_xml_by_extension() {
    assert!(is_xml(Path::new("a/b.svg")));
    assert!(is_xml(Path::new("b.xml")));
    assert!(!is_xml(Path::new("b.svg.txt")));
    assert!(!is_xml(Path::new("svg")));
}

#[test]
#[cfg(unix)]
fn load_files_survives_symlink_loop() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("xastshim-walk-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("nested"))?;
    std::fs::write(dir.join("x.svg"), "<svg/>")?;
    std::fs::write(dir.join("nested/y.xml"), "<svg/>")?;
    std::fs::write(dir.join("notes.txt"), "")?;
    std::os::unix::fs::symlink(&dir, dir.join("loop"))?;

    let files = load_files(std::slice::from_ref(&dir));
    std::fs::remove_dir_all(&dir)?;

    assert_eq!(files?, vec![dir.join("nested/y.xml"), dir.join("x.svg")]);
    Ok(())
}
