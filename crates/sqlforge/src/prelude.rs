//! Convenient imports for typical `sqlforge` usage.
//!
//! ```ignore
//! use sqlforge::prelude::*;
//! ```

pub use crate::{
    BuiltQuery, ConnectionManager, DatabaseConfig, DatabaseKind, Direction, ForgeError,
    ForgeOptions, ForgeResult, Op, Placeholder, QueryBuild, QueryBuilder, QueryForge, QueryResult,
    Record, Value, record,
};
