//! Parquet files for exported training datasets and bulk record import.

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;

/// Read every batch from a Parquet file.
///
/// The embedded Arrow schema (including field metadata) is restored.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    info!(rows, path = %path.display(), "read parquet");
    Ok(batches)
}

/// Write batches to a new Parquet file. All batches must share a schema.
pub fn write_parquet(path: &Path, batches: &[RecordBatch]) -> Result<(), StoreError> {
    let first = batches.first().ok_or(StoreError::NoResults)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, first.schema(), None)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    info!(rows, path = %path.display(), "wrote parquet");
    Ok(())
}
