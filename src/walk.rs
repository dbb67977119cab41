// Directory walker: depth-first enumeration of file paths under one or
// more roots, files visited before subdirectories at every level,
// siblings in alphabetical order. Regular files and directories only;
// anything else (sockets, fifos, device nodes) is silently skipped.
// A `stat` failure anywhere aborts the whole walk.

use std::path::{Path, PathBuf};

use crate::error::WalkError;

/// One node of the walked tree: either a file, or a directory holding its
/// already-sorted, already-filtered children.
#[derive(Debug)]
pub enum Entry {
    File(PathBuf),
    Dir(Vec<Entry>),
}

/// Walk every root and assemble a synthetic top-level directory whose
/// children are the per-root subtrees, mirroring `dir_tree_multi`'s
/// false-root wrapper. A root path that is neither a regular file nor a
/// directory is silently dropped rather than propagated as the original's
/// unchecked pointer would be.
pub fn build(roots: &[PathBuf]) -> Result<Entry, WalkError> {
    let mut children = Vec::with_capacity(roots.len());
    for root in roots {
        if let Some(entry) = build_one(root)? {
            children.push(entry);
        }
    }
    Ok(Entry::Dir(children))
}

fn build_one(path: &Path) -> Result<Option<Entry>, WalkError> {
    let meta = std::fs::metadata(path).map_err(|source| WalkError::Stat {
        path: path.to_path_buf(),
        source,
    })?;

    if meta.is_dir() {
        let mut names: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|source| WalkError::ReadDir {
                path: path.to_path_buf(),
                source,
            })?
            .map(|r| {
                r.map(|e| e.path()).map_err(|source| WalkError::ReadDir {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        names.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut children = Vec::with_capacity(names.len());
        for child_path in &names {
            if let Some(child) = build_one(child_path)? {
                children.push(child);
            }
        }
        Ok(Some(Entry::Dir(children)))
    } else if meta.is_file() {
        Ok(Some(Entry::File(path.to_path_buf())))
    } else {
        Ok(None)
    }
}

impl Entry {
    /// Visit every file under this entry, files at a level before any of
    /// that level's subdirectories, mirroring `dir_tree_search_dir`'s
    /// two-pass-per-directory order. `visit` is called once per file path
    /// in that order; the first `Err` it returns stops the walk.
    pub fn visit_files<E>(
        &self,
        visit: &mut impl FnMut(&Path) -> Result<(), E>,
    ) -> Result<(), E> {
        if let Entry::Dir(children) = self {
            for child in children {
                if let Entry::File(path) = child {
                    visit(path)?;
                }
            }
            for child in children {
                if matches!(child, Entry::Dir(_)) {
                    child.visit_files(visit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn collect(entry: &Entry) -> Vec<PathBuf> {
        let mut out = Vec::new();
        entry
            .visit_files::<std::convert::Infallible>(&mut |p| {
                out.push(p.to_path_buf());
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn files_before_subdirectories_and_alphabetical() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("b.txt"), b"b").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("c.txt"), b"c").unwrap();

        let tree = build(&[root.to_path_buf()]).unwrap();
        let files = collect(&tree);
        assert_eq!(
            files,
            vec![
                root.join("a.txt"),
                root.join("b.txt"),
                root.join("sub").join("c.txt"),
            ]
        );
    }

    #[test]
    fn nested_directories_depth_first_each_fully_before_next_sibling() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("x")).unwrap();
        fs::create_dir(root.join("x").join("deep")).unwrap();
        fs::write(root.join("x").join("deep").join("z.txt"), b"z").unwrap();
        fs::write(root.join("x").join("m.txt"), b"m").unwrap();
        fs::create_dir(root.join("y")).unwrap();
        fs::write(root.join("y").join("n.txt"), b"n").unwrap();

        let tree = build(&[root.to_path_buf()]).unwrap();
        let files = collect(&tree);
        assert_eq!(
            files,
            vec![
                root.join("x").join("m.txt"),
                root.join("x").join("deep").join("z.txt"),
                root.join("y").join("n.txt"),
            ]
        );
    }

    #[test]
    fn missing_root_errors() {
        let err = build(&[PathBuf::from("/nonexistent/path/for/birch/tests")]);
        assert!(err.is_err());
    }

    #[test]
    fn a_bare_file_root_is_visited_directly() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("only.bin");
        fs::write(&file, b"x").unwrap();
        let tree = build(&[file.clone()]).unwrap();
        assert_eq!(collect(&tree), vec![file]);
    }
}
