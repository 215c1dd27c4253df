//! Parquet rendering of enriched rows.
//!
//! Encodes one Arrow `RecordBatch` with `ArrowWriter`, Snappy compressed.
//! Schema follows the published column order:
//!
//! | column            | Arrow type                  |
//! |-------------------|-----------------------------|
//! | RowNo             | Int64                       |
//! | carried columns   | from the column's values    |
//! | AsOfDate          | Timestamp(Microsecond)      |
//! | ProcessIdentifier | Utf8                        |
//! | Rowhash           | Int64                       |
//!
//! A carried column with no present value is written as an all-null Utf8.

use std::io::Write;
use std::sync::Arc;

use arrow_array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray,
    TimestampMicrosecondArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::PublishResult;
use crate::models::{cell_text, columns, PrimitiveType};
use crate::transform::enrich::{EnrichedDataset, CARRIED_COLUMNS};

/// Arrow schema of the published layout.
pub fn output_schema(dataset: &EnrichedDataset) -> SchemaRef {
    let mut fields = Vec::with_capacity(columns::OUTPUT.len());
    fields.push(Field::new(columns::ROW_NO, DataType::Int64, false));
    for (column, ty) in CARRIED_COLUMNS.iter().zip(&dataset.carried_types) {
        fields.push(Field::new(*column, arrow_type(*ty), true));
    }
    fields.push(Field::new(
        columns::AS_OF_DATE,
        DataType::Timestamp(TimeUnit::Microsecond, None),
        false,
    ));
    fields.push(Field::new(columns::PROCESS_IDENTIFIER, DataType::Utf8, false));
    fields.push(Field::new(columns::ROW_HASH, DataType::Int64, false));

    Arc::new(Schema::new(fields))
}

fn arrow_type(ty: Option<PrimitiveType>) -> DataType {
    match ty {
        Some(PrimitiveType::Int) => DataType::Int64,
        Some(PrimitiveType::Float) => DataType::Float64,
        Some(PrimitiveType::Bool) => DataType::Boolean,
        Some(PrimitiveType::Str) | None => DataType::Utf8,
    }
}

/// Build the record batch for `dataset`.
pub fn to_record_batch(dataset: &EnrichedDataset) -> PublishResult<RecordBatch> {
    let schema = output_schema(dataset);
    let rows = &dataset.rows;

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns::OUTPUT.len());
    arrays.push(Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.row_no))));

    for (i, ty) in dataset.carried_types.iter().enumerate() {
        let values = rows.iter().map(|r| r.carried[i].as_ref());
        let array: ArrayRef = match ty {
            Some(PrimitiveType::Int) => Arc::new(Int64Array::from(
                values.map(|v| v.and_then(|v| v.as_i64())).collect::<Vec<_>>(),
            )),
            Some(PrimitiveType::Float) => Arc::new(Float64Array::from(
                values.map(|v| v.and_then(|v| v.as_f64())).collect::<Vec<_>>(),
            )),
            Some(PrimitiveType::Bool) => Arc::new(BooleanArray::from(
                values.map(|v| v.and_then(|v| v.as_bool())).collect::<Vec<_>>(),
            )),
            Some(PrimitiveType::Str) | None => Arc::new(StringArray::from(
                values.map(|v| v.map(cell_text)).collect::<Vec<_>>(),
            )),
        };
        arrays.push(array);
    }

    let as_of = dataset.as_of_date.and_utc().timestamp_micros();
    arrays.push(Arc::new(TimestampMicrosecondArray::from(vec![as_of; rows.len()])));
    arrays.push(Arc::new(StringArray::from_iter_values(
        rows.iter().map(|r| r.process_identifier),
    )));
    arrays.push(Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.rowhash))));

    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Write `dataset` as a single-row-group Parquet file to `writer`.
pub fn write_parquet<W: Write + Send>(writer: W, dataset: &EnrichedDataset) -> PublishResult<()> {
    let batch = to_record_batch(dataset)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(writer, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}
