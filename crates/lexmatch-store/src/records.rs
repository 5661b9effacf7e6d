//! Decode lawyer and case rows from Arrow RecordBatches.
//!
//! Used for batches returned by `DuckStore::query_arrow()` and by
//! [`read_parquet`](crate::read_parquet). Integer columns may be any of
//! Int32/Int64/UInt32/UInt64; specialization columns may be a string list or
//! a single comma-separated string.

use arrow::array::{
    Array, BooleanArray, Int32Array, Int64Array, LargeListArray, LargeStringArray, ListArray,
    StringArray, UInt32Array, UInt64Array,
};
use arrow::record_batch::RecordBatch;
use lexmatch_core::{CaseRecord, CaseStatus, LawyerRecord};

use crate::StoreError;

/// Build lawyer records from batches with columns `id`, `name`,
/// `experience`, `cases_handled`, `specializations`, `credentials_verified`.
/// Only `id` is required.
pub fn lawyers_from_batches(batches: &[RecordBatch]) -> Result<Vec<LawyerRecord>, StoreError> {
    let mut out = Vec::new();
    for batch in batches {
        for row in 0..batch.num_rows() {
            out.push(lawyer_at(batch, row, "id")?);
        }
    }
    Ok(out)
}

/// Build case records from batches with columns `id`, `case_type`,
/// `urgency`, `status`, `lawyer_id`. Only `id` is required.
pub fn cases_from_batches(batches: &[RecordBatch]) -> Result<Vec<CaseRecord>, StoreError> {
    let mut out = Vec::new();
    for batch in batches {
        for row in 0..batch.num_rows() {
            out.push(case_at(batch, row, "id")?);
        }
    }
    Ok(out)
}

/// Build `(case, lawyer)` pairs from a joined result.
///
/// Expects `case_id` plus the case columns, and `lawyer_id` plus the lawyer
/// columns, as produced by the closed-case join in `DuckStore`.
pub fn assignments_from_batches(
    batches: &[RecordBatch],
) -> Result<Vec<(CaseRecord, LawyerRecord)>, StoreError> {
    let mut out = Vec::new();
    for batch in batches {
        for row in 0..batch.num_rows() {
            let case = case_at(batch, row, "case_id")?;
            let lawyer = lawyer_at(batch, row, "lawyer_id")?;
            out.push((case, lawyer));
        }
    }
    Ok(out)
}

fn lawyer_at(batch: &RecordBatch, row: usize, id_column: &'static str) -> Result<LawyerRecord, StoreError> {
    Ok(LawyerRecord {
        id: required_i64(batch, id_column, row)?,
        name: optional(batch, "name", row, get_string).unwrap_or_default(),
        experience: optional(batch, "experience", row, get_string),
        cases_handled: optional(batch, "cases_handled", row, get_i64)
            .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX)),
        specializations: optional(batch, "specializations", row, get_string_list)
            .unwrap_or_default(),
        credentials_verified: optional(batch, "credentials_verified", row, get_bool),
    })
}

fn case_at(batch: &RecordBatch, row: usize, id_column: &'static str) -> Result<CaseRecord, StoreError> {
    Ok(CaseRecord {
        id: required_i64(batch, id_column, row)?,
        case_type: optional(batch, "case_type", row, get_string),
        urgency: optional(batch, "urgency", row, get_string),
        status: optional(batch, "status", row, get_string)
            .and_then(|s| CaseStatus::parse(&s))
            .unwrap_or_default(),
        lawyer_id: optional(batch, "lawyer_id", row, get_i64),
    })
}

fn required_i64(batch: &RecordBatch, column: &'static str, row: usize) -> Result<i64, StoreError> {
    let col = batch
        .column_by_name(column)
        .ok_or(StoreError::MissingColumn(column))?;
    get_i64(col.as_ref(), row).ok_or(StoreError::NullValue { column, row })
}

fn optional<T>(
    batch: &RecordBatch,
    column: &str,
    row: usize,
    get: fn(&dyn Array, usize) -> Option<T>,
) -> Option<T> {
    batch
        .column_by_name(column)
        .and_then(|col| get(col.as_ref(), row))
}

// ── Arrow extraction helpers ──

/// Extract a string value (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

fn get_i64(col: &dyn Array, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        return Some(a.value(row));
    }
    if let Some(a) = any.downcast_ref::<Int32Array>() {
        return Some(i64::from(a.value(row)));
    }
    if let Some(a) = any.downcast_ref::<UInt32Array>() {
        return Some(i64::from(a.value(row)));
    }
    any.downcast_ref::<UInt64Array>()
        .map(|a| i64::try_from(a.value(row)).unwrap_or(i64::MAX))
}

fn get_bool(col: &dyn Array, row: usize) -> Option<bool> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<BooleanArray>()
        .map(|a| a.value(row))
}

/// Extract a list of strings from a List, LargeList, or comma-separated
/// string column.
fn get_string_list(col: &dyn Array, row: usize) -> Option<Vec<String>> {
    if col.is_null(row) {
        return None;
    }
    if let Some(list) = col.as_any().downcast_ref::<ListArray>() {
        return Some(strings_from_array(list.value(row).as_ref()));
    }
    if let Some(list) = col.as_any().downcast_ref::<LargeListArray>() {
        return Some(strings_from_array(list.value(row).as_ref()));
    }
    get_string(col, row).map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
}

fn strings_from_array(arr: &dyn Array) -> Vec<String> {
    let mut out = Vec::with_capacity(arr.len());
    if let Some(a) = arr.as_any().downcast_ref::<StringArray>() {
        for i in 0..a.len() {
            if !a.is_null(i) {
                out.push(a.value(i).to_string());
            }
        }
    } else if let Some(a) = arr.as_any().downcast_ref::<LargeStringArray>() {
        for i in 0..a.len() {
            if !a.is_null(i) {
                out.push(a.value(i).to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ListBuilder, StringBuilder};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn lawyer_batch() -> RecordBatch {
        let mut specs = ListBuilder::new(StringBuilder::new());
        specs.values().append_value("Criminal");
        specs.values().append_value("Civil");
        specs.append(true);
        specs.append(false);

        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("experience", DataType::Utf8, true),
            Field::new("cases_handled", DataType::Int32, true),
            Field::new(
                "specializations",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                true,
            ),
            Field::new("credentials_verified", DataType::Boolean, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("A. Counsel"), None])),
                Arc::new(StringArray::from(vec![Some("12 years"), None])),
                Arc::new(Int32Array::from(vec![Some(120), None])),
                Arc::new(specs.finish()),
                Arc::new(BooleanArray::from(vec![Some(true), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn decodes_lawyers() {
        let lawyers = lawyers_from_batches(&[lawyer_batch()]).unwrap();
        assert_eq!(lawyers.len(), 2);

        let a = &lawyers[0];
        assert_eq!(a.id, 1);
        assert_eq!(a.name, "A. Counsel");
        assert_eq!(a.experience.as_deref(), Some("12 years"));
        assert_eq!(a.cases_handled, Some(120));
        assert_eq!(a.specializations, vec!["Criminal", "Civil"]);
        assert_eq!(a.credentials_verified, Some(true));

        let b = &lawyers[1];
        assert_eq!(b.id, 2);
        assert!(b.name.is_empty());
        assert_eq!(b.experience, None);
        assert_eq!(b.cases_handled, None);
        assert!(b.specializations.is_empty());
        assert_eq!(b.credentials_verified, None);
    }

    #[test]
    fn comma_separated_specializations() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("specializations", DataType::Utf8, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from(vec![7])),
                Arc::new(StringArray::from(vec!["Family, Labor,,"])),
            ],
        )
        .unwrap();
        let lawyers = lawyers_from_batches(&[batch]).unwrap();
        assert_eq!(lawyers[0].id, 7);
        assert_eq!(lawyers[0].specializations, vec!["Family", "Labor"]);
    }

    #[test]
    fn missing_id_column_errors() {
        let schema = Schema::new(vec![Field::new("name", DataType::Utf8, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec!["x"]))],
        )
        .unwrap();
        let err = lawyers_from_batches(&[batch]).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn("id")));
    }

    #[test]
    fn null_id_errors() {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64, true)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Int64Array::from(vec![Some(1), None]))],
        )
        .unwrap();
        let err = lawyers_from_batches(&[batch]).unwrap_err();
        assert!(matches!(err, StoreError::NullValue { column: "id", row: 1 }));
    }

    #[test]
    fn decodes_cases_with_status() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("case_type", DataType::Utf8, true),
            Field::new("status", DataType::Utf8, true),
            Field::new("lawyer_id", DataType::Int64, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![10, 11])),
                Arc::new(StringArray::from(vec![Some("Family"), None])),
                Arc::new(StringArray::from(vec![Some("closed"), Some("weird")])),
                Arc::new(Int64Array::from(vec![Some(3), None])),
            ],
        )
        .unwrap();
        let cases = cases_from_batches(&[batch]).unwrap();
        assert_eq!(cases[0].status, CaseStatus::Completed);
        assert_eq!(cases[0].lawyer_id, Some(3));
        assert_eq!(cases[1].status, CaseStatus::Pending);
        assert_eq!(cases[1].case_type, None);
    }

    #[test]
    fn decodes_joined_assignments() {
        let schema = Schema::new(vec![
            Field::new("case_id", DataType::Int64, false),
            Field::new("case_type", DataType::Utf8, true),
            Field::new("urgency", DataType::Utf8, true),
            Field::new("status", DataType::Utf8, true),
            Field::new("lawyer_id", DataType::Int64, false),
            Field::new("experience", DataType::Utf8, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![10])),
                Arc::new(StringArray::from(vec!["CRIMINAL"])),
                Arc::new(StringArray::from(vec!["HIGH"])),
                Arc::new(StringArray::from(vec!["COMPLETED"])),
                Arc::new(Int64Array::from(vec![4])),
                Arc::new(StringArray::from(vec!["9 years"])),
            ],
        )
        .unwrap();
        let pairs = assignments_from_batches(&[batch]).unwrap();
        assert_eq!(pairs.len(), 1);
        let (case, lawyer) = &pairs[0];
        assert_eq!(case.id, 10);
        assert_eq!(case.lawyer_id, Some(4));
        assert_eq!(lawyer.id, 4);
        assert_eq!(lawyer.experience.as_deref(), Some("9 years"));
    }
}
