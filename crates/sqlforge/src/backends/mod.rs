//! Backend bindings, one per feature.

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlConnectionManager, MySqlDriver};
#[cfg(feature = "postgres")]
pub use postgres::{PgConnectionManager, PgDriver};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnectionManager;
