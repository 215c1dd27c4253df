//! CSV rendering of enriched rows.
//!
//! Header row in the published column order, no index column. Absent values
//! are empty fields, floats keep a fractional part, and AsOfDate is written
//! as `YYYY-MM-DD HH:MM:SS.ffffff`.

use std::io::Write;

use crate::error::PublishResult;
use crate::models::{cell_text, columns};
use crate::transform::enrich::{EnrichedDataset, EnrichedRow};

/// Timestamp layout of the AsOfDate column.
pub const AS_OF_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Write `dataset` as CSV to `writer`.
pub fn write_csv<W: Write>(writer: W, dataset: &EnrichedDataset) -> PublishResult<()> {
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(columns::OUTPUT)?;
    for row in &dataset.rows {
        csv.write_record(render_row(row))?;
    }
    csv.flush().map_err(csv::Error::from)?;

    Ok(())
}

/// Render one row as CSV fields.
fn render_row(row: &EnrichedRow) -> Vec<String> {
    let mut fields = Vec::with_capacity(columns::OUTPUT.len());
    fields.push(row.row_no.to_string());
    fields.extend(
        row.carried
            .iter()
            .map(|v| v.as_ref().map(cell_text).unwrap_or_default()),
    );
    fields.push(row.as_of_date.format(AS_OF_DATE_FORMAT).to_string());
    fields.push(row.process_identifier.to_string());
    fields.push(row.rowhash.to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dataset;
    use crate::transform::enrich::enrich;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_csv_layout() {
        let row = json!({ "Deal Name": "Alpha, Inc", "D1": 12.0, "D5": 3, "Country": "USA", "Currency": "USD", "Company": "FB", "Country name": "United States" });
        let ds = Dataset::new(
            ["Deal Name", "D1", "D5", "Country", "Currency", "Company", "Country name"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vec![row.as_object().unwrap().clone()],
        );
        let as_of = NaiveDate::from_ymd_opt(2021, 9, 10)
            .unwrap()
            .and_hms_micro_opt(14, 5, 9, 42)
            .unwrap();
        let enriched = enrich(&ds, as_of);

        let mut buf = Vec::new();
        write_csv(&mut buf, &enriched).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "RowNo,Deal Name,D1,D2,D3,D4,D5,Active Flag,Country,Currency,Company,Country name,AsOfDate,ProcessIdentifier,Rowhash"
        );
        let expected_prefix =
            "0,\"Alpha, Inc\",12.0,,,,3,,USA,USD,FB,United States,2021-09-10 14:05:09.000042,ICG,";
        let data = lines.next().unwrap();
        assert!(data.starts_with(expected_prefix), "{data}");
        assert_eq!(
            data.rsplit(',').next().unwrap(),
            enriched.rows[0].rowhash.to_string()
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty_dataset_writes_header_only() {
        let ds = Dataset::new(vec!["D1".into()], vec![]);
        let as_of = NaiveDate::from_ymd_opt(2021, 9, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut buf = Vec::new();
        write_csv(&mut buf, &enrich(&ds, as_of)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
