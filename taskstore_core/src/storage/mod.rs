pub mod engine;
pub mod schema;

// Re-export main types for convenience
pub use engine::open_connection;
pub use schema::{
    Column, MAX_TABLE_ATTEMPTS, TableCheck, TableSchema, check_table, quote_ident, resolve_table,
    table_name_for_session,
};
