use tempfile::tempdir;

use photo_tidy_core::storage::models::HashEntry;
use photo_tidy_core::storage::{Database, InsertOutcome, SCHEMA_VERSION};

#[test]
fn test_insert_and_find_hash() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(
        db.insert_hash("2023/06/alice/Recents/20230601-123045123.jpg", "abc123")
            .unwrap(),
        InsertOutcome::Inserted
    );

    let entry = db.find_by_hash("abc123").unwrap().unwrap();
    assert_eq!(
        entry,
        HashEntry {
            id: entry.id,
            filepath: "2023/06/alice/Recents/20230601-123045123.jpg".to_string(),
            hash: "abc123".to_string(),
        }
    );
    assert!(db.contains_hash("abc123").unwrap());
    assert!(!db.contains_hash("def456").unwrap());
    assert!(db.find_by_hash("def456").unwrap().is_none());
}

#[test]
fn test_duplicate_hash_is_already_recorded() {
    let db = Database::open_in_memory().unwrap();
    db.insert_hash("a.jpg", "samehash").unwrap();

    assert_eq!(
        db.insert_hash("b.jpg", "samehash").unwrap(),
        InsertOutcome::AlreadyRecorded
    );
    assert_eq!(db.count_hashes().unwrap(), 1);
    // The first path recorded for a hash wins.
    assert_eq!(db.find_by_hash("samehash").unwrap().unwrap().filepath, "a.jpg");
}

#[test]
fn test_same_path_different_hashes() {
    let db = Database::open_in_memory().unwrap();
    db.insert_hash("a.jpg", "v1").unwrap();
    db.insert_hash("a.jpg", "v2").unwrap();
    assert_eq!(db.count_hashes().unwrap(), 2);
}

#[test]
fn test_open_sets_schema_version() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    let db = Database::open(&path).unwrap();
    assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    db.insert_hash("x.jpg", "h").unwrap();
    drop(db);

    // Reopening migrates nothing and keeps the data.
    let db = Database::open(&path).unwrap();
    assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    assert_eq!(db.count_hashes().unwrap(), 1);
}

#[test]
fn test_open_existing_requires_initialized_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    assert!(Database::open_existing(&path).is_err());
    assert!(!path.exists());

    // A bare SQLite file with no schema is rejected too.
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (x INTEGER);")
        .unwrap();
    let err = Database::open_existing(&path).err().unwrap();
    assert!(err.to_string().contains("init"));

    drop(Database::open(&path).unwrap());
    let db = Database::open_existing(&path).unwrap();
    assert_eq!(db.count_hashes().unwrap(), 0);
}

#[test]
fn test_hash_column_is_unique() {
    let db = Database::open_in_memory().unwrap();
    let unique: i64 = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM pragma_index_list('hashes') WHERE \"unique\" = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(unique, 1);
}
