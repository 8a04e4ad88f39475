use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use tempfile::tempdir;

use photo_tidy_core::hasher::content_hash;
use photo_tidy_core::storage::Database;
use photo_tidy_core::{Error, Reconciler, SilentReporter};

fn write(path: &Path, data: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn jpeg(payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE1];
    data.extend_from_slice(payload);
    data
}

/// archive/
///   2023/06/alice/Recents/20230601-123045123.jpg
///   2023/06/bob/Birthday/20230603-101010000.jpg   (same bytes as alice's)
///   2023/07/alice/Recents/20230704-090000000.png
///   2023/07/alice/Recents/.DS_Store               hidden
///   notes.txt                                     unsupported
fn sample_archive(root: &Path) {
    write(
        &root.join("2023/06/alice/Recents/20230601-123045123.jpg"),
        &jpeg(b"sunset"),
    );
    write(
        &root.join("2023/06/bob/Birthday/20230603-101010000.jpg"),
        &jpeg(b"sunset"),
    );
    write(
        &root.join("2023/07/alice/Recents/20230704-090000000.png"),
        b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRpixels",
    );
    write(&root.join("2023/07/alice/Recents/.DS_Store"), &jpeg(b"junk"));
    write(&root.join("notes.txt"), b"not media");
}

#[test]
fn test_reconcile_records_relative_paths() {
    let archive = tempdir().unwrap();
    let work = tempdir().unwrap();
    sample_archive(archive.path());
    let db_file = work.path().join("index.db");

    let report = Reconciler::new(archive.path(), &db_file)
        .with_workers(2)
        .reconcile(&SilentReporter)
        .unwrap();

    assert_eq!(report.discovered, 4);
    assert_eq!(report.unsupported, 1);
    assert_eq!(report.hashed, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.already_recorded, 1);

    let db = Database::open_existing(&db_file).unwrap();
    assert_eq!(db.count_hashes().unwrap(), 2);

    let png = content_hash(&archive.path().join("2023/07/alice/Recents/20230704-090000000.png"))
        .unwrap();
    assert_eq!(
        db.find_by_hash(&png).unwrap().unwrap().filepath,
        "2023/07/alice/Recents/20230704-090000000.png"
    );

    let sunset = content_hash(&archive.path().join("2023/06/alice/Recents/20230601-123045123.jpg"))
        .unwrap();
    let recorded = db.find_by_hash(&sunset).unwrap().unwrap().filepath;
    assert!(
        recorded == "2023/06/alice/Recents/20230601-123045123.jpg"
            || recorded == "2023/06/bob/Birthday/20230603-101010000.jpg"
    );
}

#[test]
fn test_reconcile_twice_records_nothing_new() {
    let archive = tempdir().unwrap();
    let work = tempdir().unwrap();
    sample_archive(archive.path());
    let db_file = work.path().join("index.db");

    Reconciler::new(archive.path(), &db_file)
        .reconcile(&SilentReporter)
        .unwrap();
    let second = Reconciler::new(archive.path(), &db_file)
        .reconcile(&SilentReporter)
        .unwrap();

    assert_eq!(second.inserted, 0);
    assert_eq!(second.already_recorded, 3);
}

#[test]
fn test_reconcile_missing_destination_is_error() {
    let work = tempdir().unwrap();
    let result = Reconciler::new(work.path().join("gone"), work.path().join("index.db"))
        .reconcile(&SilentReporter);
    assert!(result.is_err());
}

#[test]
fn test_reconcile_cancelled() {
    let archive = tempdir().unwrap();
    let work = tempdir().unwrap();
    sample_archive(archive.path());

    let reconciler = Reconciler::new(archive.path(), work.path().join("index.db"));
    reconciler.cancel_token().store(true, Ordering::SeqCst);
    assert!(matches!(
        reconciler.reconcile(&SilentReporter),
        Err(Error::Cancelled)
    ));
}
