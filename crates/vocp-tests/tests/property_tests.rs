//! Property tests for whole-tree copies
//!
//! Random trees are seeded into an in-memory node store and copied between
//! containers, checking structure, filtering and the aggregate exit status.

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use vocp_config::RetryConfig;
use vocp_engine::{CopyEngine, EngineBuilder};
use vocp_storage::{MemoryNodeStore, Storage};
use vocp_tests::test_utils::{memory_storage, remote_tree, seed_store, sources};
use vocp_types::{errno, CopyOptions, Error};

const FILTER_PATTERNS: [&str; 4] = ["fits", ".txt", "da/", "fb"];

fn relative_file() -> impl Strategy<Value = String> {
    (
        prop::option::of("d[ab]"),
        prop::option::of("d[ab]"),
        "f[a-c]{1,2}\\.(fits|txt)",
    )
        .prop_map(|(outer, inner, name)| {
            outer
                .into_iter()
                .chain(inner)
                .chain(std::iter::once(name))
                .collect::<Vec<_>>()
                .join("/")
        })
}

fn tree() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(relative_file(), 1..12)
}

fn patterns() -> impl Strategy<Value = Option<String>> {
    prop::option::of(
        prop::sample::subsequence(FILTER_PATTERNS.to_vec(), 1..=2).prop_map(|p| p.join(",")),
    )
}

fn seeded(files: &BTreeSet<String>) -> (Arc<MemoryNodeStore>, Storage) {
    let (store, storage) = memory_storage();
    store.add_dir("vos:src").unwrap();
    store.add_dir("vos:dst").unwrap();
    let contents: Vec<(&str, &[u8])> = files
        .iter()
        .map(|path| (path.as_str(), path.as_bytes()))
        .collect();
    seed_store(&store, "vos:src", &contents).unwrap();
    (store, storage)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn files_only(entries: Vec<String>) -> BTreeSet<String> {
    entries
        .into_iter()
        .filter(|entry| !entry.ends_with('/'))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_tree_copy_reproduces_structure(files in tree()) {
        let (store, storage) = seeded(&files);
        let engine = CopyEngine::new(storage, CopyOptions::new());

        let (result, source_tree, copied_tree) = block_on(async {
            let result = engine.copy(&sources(&["vos:src"]), "vos:dst").await.unwrap();
            (
                result,
                remote_tree(store.as_ref(), "vos:src").await.unwrap(),
                remote_tree(store.as_ref(), "vos:dst/src").await.unwrap(),
            )
        });

        prop_assert!(result.is_clean());
        prop_assert_eq!(&copied_tree, &source_tree);
        prop_assert_eq!(result.stats.files_copied, files.len() as u64);
        for path in &files {
            let copied = store.read_file(&format!("vos:dst/src/{path}"));
            prop_assert_eq!(copied.as_deref(), Some(path.as_bytes()));
        }
    }

    #[test]
    fn prop_include_overrides_exclude(
        files in tree(),
        include in patterns(),
        exclude in patterns(),
    ) {
        let (store, storage) = seeded(&files);
        let mut options = CopyOptions::new();
        if let Some(include) = &include {
            options = options.include(include);
        }
        if let Some(exclude) = &exclude {
            options = options.exclude(exclude);
        }
        let engine = CopyEngine::new(storage, options);

        let (result, copied) = block_on(async {
            let result = engine.copy(&sources(&["vos:src"]), "vos:dst").await.unwrap();
            (result, remote_tree(store.as_ref(), "vos:dst/src").await.unwrap())
        });

        let matches = |list: &Option<String>, destination: &str| {
            list.as_deref()
                .map(|l| l.split(',').any(|p| destination.contains(p)))
        };
        let expected: BTreeSet<String> = files
            .iter()
            .filter(|path| {
                let destination = format!("vos:dst/src/{path}");
                match matches(&include, &destination) {
                    Some(included) => included,
                    None => !matches(&exclude, &destination).unwrap_or(false),
                }
            })
            .cloned()
            .collect();

        prop_assert_eq!(files_only(copied), expected.clone());
        prop_assert_eq!(result.stats.files_skipped, (files.len() - expected.len()) as u64);
        prop_assert!(result.is_clean());
    }

    #[test]
    fn prop_exit_status_sums_skipped_errors(
        failures in prop::collection::btree_map(
            relative_file(),
            prop::sample::select(vec![errno::EREMOTE, errno::EACCES, 28, 0]),
            1..10,
        ),
    ) {
        let files: BTreeSet<String> = failures.keys().cloned().collect();
        let (store, storage) = seeded(&files);
        for (path, &code) in &failures {
            let source = format!("vos:src/{path}");
            match code {
                0 => {}
                errno::EACCES => store.fail_always(&source, Error::PermissionDenied { path: source.clone() }),
                errno::EREMOTE => store.fail_always(&source, Error::RemoteFailure { message: "server error".to_string() }),
                other => store.fail_always(&source, Error::io("No space left on device", other)),
            }
        }
        let engine = EngineBuilder::new(storage)
            .with_options(CopyOptions::new().ignore_errors(true))
            .with_retry_config(RetryConfig { max_ignored_retries: 0, retry_wait_secs: 0 })
            .build();

        let result = block_on(engine.copy(&sources(&["vos:src"]), "vos:dst")).unwrap();

        let expected: i32 = failures.values().sum();
        let failed = failures.values().filter(|&&code| code != 0).count() as u64;
        prop_assert_eq!(result.exit_code, expected);
        prop_assert_eq!(result.stats.files_skipped, failed);
        prop_assert_eq!(result.stats.files_copied, files.len() as u64 - failed);
    }
}
