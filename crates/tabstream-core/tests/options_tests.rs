use tabstream_core::pipeline::MetricsSnapshot;
use tabstream_core::{ColumnType, ColumnarOptions, CsvOptions, SheetSelector, XlsxOptions};

#[test]
fn csv_options_deserialize_with_defaults() {
    let options: CsvOptions =
        serde_json::from_str(r#"{"delimiter": 59, "batch_size": 500}"#).expect("parse options");
    assert_eq!(options.delimiter, b';');
    assert_eq!(options.batch_size, 500);
    assert_eq!(options.quote, b'"');
    assert!(options.has_header);
    assert_eq!(options.max_queue_batches, 2);
}

#[test]
fn out_of_range_knobs_are_clamped() {
    let options = CsvOptions {
        batch_size: 0,
        max_queue_batches: 10_000,
        ..CsvOptions::default()
    }
    .normalized();
    assert_eq!(options.batch_size, 1);
    assert_eq!(options.max_queue_batches, 256);
}

#[test]
fn column_types_use_lowercase_names() {
    let options: ColumnarOptions = serde_json::from_str(
        r#"{"schema": {"id": "int64", "score": "float64", "ok": "bool"}, "trim": true}"#,
    )
    .expect("parse options");
    assert_eq!(options.schema["id"], ColumnType::Int64);
    assert_eq!(options.schema["score"], ColumnType::Float64);
    assert_eq!(options.schema["ok"], ColumnType::Bool);
    assert!(options.trim);
    assert_eq!(
        options.null_values,
        vec![String::new(), "null".to_owned(), "NULL".to_owned()]
    );
}

#[test]
fn sheet_selector_accepts_index_or_name() {
    let by_index: XlsxOptions = serde_json::from_str(r#"{"sheet": 2}"#).expect("parse options");
    assert_eq!(by_index.sheet, SheetSelector::Index(2));

    let by_name: XlsxOptions =
        serde_json::from_str(r#"{"sheet": "Summary"}"#).expect("parse options");
    assert_eq!(by_name.sheet, SheetSelector::Name("Summary".to_owned()));
}

#[test]
fn metrics_snapshot_round_trips_through_json() {
    let snapshot = MetricsSnapshot {
        bytes_read: 1024,
        rows_parsed: 10,
        batches_emitted: 1,
        ..MetricsSnapshot::default()
    };
    let encoded = serde_json::to_string(&snapshot).expect("encode snapshot");
    let decoded: MetricsSnapshot = serde_json::from_str(&encoded).expect("decode snapshot");
    assert_eq!(decoded, snapshot);
}
