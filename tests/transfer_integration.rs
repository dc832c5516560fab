//! Integration tests for copy, move, and delete.
//!
//! These tests drive the public engine API against real scratch trees and
//! watch the progress register from a second thread, the way a UI would.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tempfile::TempDir;
use transfer_core::{
    EngineConfig, LogSink, ProtectedPaths, TransferEngine, TransferError, TransferSignal,
};

fn dir_arg(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}/", path.display()))
}

/// Builds a tree with files, an empty file, and empty subdirectories.
fn build_tree(root: &Path) {
    fs::create_dir_all(root.join("config/nested/deeper")).unwrap();
    fs::create_dir_all(root.join("empty_dir/also_empty")).unwrap();
    fs::write(root.join("top.bin"), vec![7_u8; 40_000]).unwrap();
    fs::write(root.join("zero.txt"), b"").unwrap();
    fs::write(root.join("config/settings.ini"), b"[main]\nkey=value\n").unwrap();
    fs::write(root.join("config/nested/deeper/leaf.dat"), vec![1_u8; 3_333]).unwrap();
}

/// Asserts `copy` mirrors `original`: same directories, same file bytes.
fn assert_same_tree(original: &Path, copy: &Path) {
    let mut pending = vec![PathBuf::new()];
    while let Some(relative) = pending.pop() {
        for entry in fs::read_dir(original.join(&relative)).unwrap() {
            let entry = entry.unwrap();
            let child = relative.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                assert!(copy.join(&child).is_dir(), "missing dir {}", child.display());
                pending.push(child);
            } else {
                assert_eq!(
                    fs::read(original.join(&child)).unwrap(),
                    fs::read(copy.join(&child)).unwrap(),
                    "content differs for {}",
                    child.display()
                );
            }
        }
    }
}

#[test]
fn test_copy_tree_then_delete_tree_round_trip() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    let dst = dir.path().join("dst");
    build_tree(&src);

    let engine = TransferEngine::default();
    let signal = TransferSignal::new();
    let summary = engine
        .copy_file_or_directory(&dir_arg(&src), &dir_arg(&dst), &signal, &LogSink::none())
        .unwrap();

    assert_eq!(summary.files, 4);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.bytes, 40_000 + 17 + 3_333);
    assert_eq!(signal.percent(), 100);
    assert_same_tree(&src, &dst);
    assert!(dst.join("empty_dir/also_empty").is_dir());

    engine
        .delete_file_or_directory(&dir_arg(&dst), &signal, &LogSink::none())
        .unwrap();
    assert!(!dst.exists());
    assert!(src.join("top.bin").exists());
}

#[test]
fn test_copy_tree_progress_never_decreases() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    for i in 0..20 {
        fs::write(src.join(format!("f{i:02}.bin")), vec![i as u8; 50_000]).unwrap();
    }

    let engine = TransferEngine::new(
        EngineConfig {
            copy_buffer_size: 512,
            ..EngineConfig::default()
        },
        ProtectedPaths::default(),
    );
    let signal = Arc::new(TransferSignal::new());
    let done = Arc::new(AtomicBool::new(false));

    let monitor = {
        let signal = Arc::clone(&signal);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut samples = Vec::new();
            while !done.load(Ordering::SeqCst) {
                samples.push(signal.percent());
                thread::yield_now();
            }
            samples.push(signal.percent());
            samples
        })
    };

    engine
        .copy_tree(&src, &dir.path().join("dst"), &signal, &LogSink::none())
        .unwrap();
    done.store(true, Ordering::SeqCst);
    let samples = monitor.join().unwrap();

    assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]), "progress went backwards");
    assert_eq!(samples.last(), Some(&100));
}

#[test]
fn test_abort_mid_copy_leaves_no_partial_file() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("big.bin");
    let dst = dir.path().join("out/big.bin");
    fs::write(&src, vec![0xAB_u8; 16 * 1024 * 1024]).unwrap();

    let engine = TransferEngine::new(
        EngineConfig {
            copy_buffer_size: 64,
            ..EngineConfig::default()
        },
        ProtectedPaths::default(),
    );
    let signal = Arc::new(TransferSignal::new());

    let aborter = {
        let signal = Arc::clone(&signal);
        thread::spawn(move || {
            loop {
                let percent = signal.percent();
                if (1..100).contains(&percent) {
                    signal.request_abort();
                    return true;
                }
                if percent == 100 || percent < 0 {
                    return false;
                }
                thread::yield_now();
            }
        })
    };

    let result = engine.copy_file(&src, &dst, &signal, &LogSink::none());
    let aborted = aborter.join().unwrap();

    assert!(aborted, "copy finished before the abort could land");
    assert!(matches!(result, Err(TransferError::Interrupted)));
    assert!(fs::metadata(&dst).is_err(), "partial destination left behind");
    assert!(!signal.is_abort_requested(), "abort flag must be consumed");
    assert_eq!(signal.percent(), -1);
}

#[test]
fn test_move_directory_moves_both_files_and_removes_source() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    fs::create_dir_all(&a).unwrap();
    fs::write(a.join("one.txt"), b"1").unwrap();
    fs::write(a.join("two.txt"), b"2").unwrap();

    let signal = TransferSignal::new();
    TransferEngine::default()
        .move_file_or_directory(
            &dir_arg(&a),
            &dir_arg(&dir.path().join("b")),
            &signal,
            &LogSink::none(),
        )
        .unwrap();

    assert!(!a.exists());
    assert_eq!(fs::read(dir.path().join("b/one.txt")).unwrap(), b"1");
    assert_eq!(fs::read(dir.path().join("b/two.txt")).unwrap(), b"2");
    assert_eq!(signal.percent(), 100);
}

#[test]
fn test_move_single_file_leaves_siblings_untouched() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    fs::create_dir_all(&a).unwrap();
    fs::write(a.join("f.txt"), b"f").unwrap();
    fs::write(a.join("g.txt"), b"g").unwrap();

    let signal = TransferSignal::new();
    TransferEngine::default()
        .move_file_or_directory(
            &a.join("f.txt"),
            &dir.path().join("b/f.txt"),
            &signal,
            &LogSink::none(),
        )
        .unwrap();

    assert!(!a.join("f.txt").exists());
    assert!(a.join("g.txt").exists());
    assert_eq!(fs::read(dir.path().join("b/f.txt")).unwrap(), b"f");
}

#[test]
fn test_copy_writes_batched_source_and_destination_logs() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.txt"), b"a").unwrap();
    fs::write(src.join("b.txt"), b"b").unwrap();
    let sink = LogSink::none()
        .with_source(dir.path().join("logs/source.log"))
        .with_destination(dir.path().join("logs/destination.log"));

    let signal = TransferSignal::new();
    TransferEngine::default()
        .copy_tree(&src, &dir.path().join("dst"), &signal, &sink)
        .unwrap();

    let mut sources: Vec<String> = fs::read_to_string(dir.path().join("logs/source.log"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    sources.sort();
    assert_eq!(
        sources,
        vec![
            src.join("a.txt").display().to_string(),
            src.join("b.txt").display().to_string()
        ]
    );
    let destinations = fs::read_to_string(dir.path().join("logs/destination.log")).unwrap();
    assert_eq!(destinations.lines().count(), 2);
}

#[test]
fn test_copy_missing_source_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let signal = TransferSignal::new();
    let result = TransferEngine::default().copy_file_or_directory(
        &dir.path().join("missing.bin"),
        &dir.path().join("out.bin"),
        &signal,
        &LogSink::none(),
    );

    assert!(matches!(result, Err(TransferError::NotFound { .. })));
    assert_eq!(signal.percent(), -1);
    assert!(!dir.path().join("out.bin").exists());
}
