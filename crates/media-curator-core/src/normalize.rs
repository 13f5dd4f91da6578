//! Zero-pad the engagement field so that a plain lexical listing sorts by likes.

use log::info;

use crate::config::Config;
use crate::discovery::CorpusSnapshot;
use crate::error::{Error, Result};
use crate::filename::{self, digit_width};
use crate::logging::log_fs_modification;
use crate::store::FileStore;
use crate::types::{Mutation, Operation, OperationReport};

/// Rename every decodable file so its engagement has as many digits as the largest one
pub fn normalize_likes(
    store: &dyn FileStore,
    snapshot: &CorpusSnapshot,
    _config: &Config,
) -> Result<OperationReport> {
    let mut report = OperationReport::new(Operation::NormalizeLikes);

    let mut decoded = Vec::with_capacity(snapshot.len());
    for path in &snapshot.items {
        match filename::decode(path) {
            Ok(fields) => decoded.push((path, fields)),
            Err(e) => report.skip(path, &e),
        }
    }

    let Some(max) = decoded.iter().map(|(_, f)| f.engagement).max() else {
        return Ok(report);
    };
    let width = digit_width(max);

    for (path, fields) in decoded {
        let name = filename::encode_padded(&fields, width);
        let target = path.with_file_name(&name);
        if &target == path {
            report.processed += 1;
            continue;
        }

        if store.exists(&target) {
            let e = Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            ));
            report.skip(path, &e);
            continue;
        }

        match store.rename(path, &target) {
            Ok(()) => {
                log_fs_modification("rename", path, Some(&name));
                report.processed += 1;
                report.applied.push(Mutation::Rename {
                    from: path.clone(),
                    to: target,
                });
            }
            Err(e) => report.skip(path, &e),
        }
    }

    info!(
        "Padded likes to {} digits in {}: {} renamed",
        width,
        snapshot.root.display(),
        report.applied.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use std::path::{Path, PathBuf};

    fn corpus(names: &[&str]) -> (MemoryStore, PathBuf) {
        let store = MemoryStore::new();
        let root = PathBuf::from("/corpus");
        for name in names {
            store.insert_bytes(root.join(name), name.as_bytes().to_vec());
        }
        (store, root)
    }

    fn run(store: &MemoryStore, root: &Path) -> OperationReport {
        let snapshot = CorpusSnapshot::scan(store, root).unwrap();
        normalize_likes(store, &snapshot, &Config::default()).unwrap()
    }

    #[test]
    fn test_pads_to_widest_count() {
        let (store, root) = corpus(&[
            "a_5_2021-01-01_x.jpg",
            "a_1234_2021-01-02_y.jpg",
            "a_77_2021-01-03_z.png",
        ]);

        let report = run(&store, &root);

        assert_eq!(report.processed, 3);
        assert_eq!(report.applied.len(), 2);
        assert_eq!(
            store.files_in(&root),
            vec![
                root.join("a_0005_2021-01-01_x.jpg"),
                root.join("a_0077_2021-01-03_z.png"),
                root.join("a_1234_2021-01-02_y.jpg"),
            ]
        );
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let (store, root) = corpus(&["a_5_2021-01-01_x.jpg", "a_120_2021-01-02_y.jpg"]);

        run(&store, &root);
        let first = store.files_in(&root);
        let report = run(&store, &root);

        assert!(report.applied.is_empty());
        assert_eq!(report.processed, 2);
        assert_eq!(store.files_in(&root), first);
    }

    #[test]
    fn test_existing_target_is_not_overwritten() {
        let (store, root) = corpus(&[
            "a_5_2021-01-01_x.jpg",
            "a_05_2021-01-01_x.jpg",
            "a_10_2021-01-02_y.jpg",
        ]);

        let report = run(&store, &root);

        assert_eq!(report.skipped_count(ErrorKind::Io), 1);
        assert_eq!(report.skipped[0].path, root.join("a_5_2021-01-01_x.jpg"));
        assert!(store.exists(&root.join("a_5_2021-01-01_x.jpg")));
        assert!(store.exists(&root.join("a_05_2021-01-01_x.jpg")));
    }

    #[test]
    fn test_malformed_names_are_skipped() {
        let (store, root) = corpus(&["a_5_2021-01-01_x.jpg", "a_5_2021-13-01_x.jpg"]);

        let report = run(&store, &root);

        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped_count(ErrorKind::Format), 1);
        assert!(store.exists(&root.join("a_5_2021-13-01_x.jpg")));
    }
}
