//! Persistence for task-execution records: one SQLite table per store, with
//! codecs for structured columns, schema-drift handling and Mongo-style
//! filters compiled to parameterized predicates.

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod flush;
pub mod storage;
pub mod store;
pub mod types;

pub use codec::Codec;
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use filter::{Filter, Operand, Predicate, Test};
pub use flush::FlushClock;
pub use store::TaskStore;
pub use types::field::{Field, FieldKind};
pub use types::value::{Datum, Document, Value};
pub use types::{Record, empty_record};
