pub mod models;
mod queries;
mod sqlite;

pub use self::queries::InsertOutcome;
pub use self::sqlite::{Database, SCHEMA_VERSION};
