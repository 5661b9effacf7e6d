//! Storage layer: JSON fixtures, DuckDB (feature `duckdb`), and Parquet I/O.

mod error;
pub use error::StoreError;

pub mod memory;
pub use memory::MemoryStore;

pub mod parquet_io;
pub use parquet_io::{read_parquet, write_parquet};

pub mod records;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;
