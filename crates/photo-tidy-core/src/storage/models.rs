/// One row of the `hashes` table: a file under the archive root and its
/// content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub id: i64,
    /// Path relative to the archive root.
    pub filepath: String,
    pub hash: String,
}
