//! Integration test: clean → select target → train → store → predict

use lumina::error::LuminaError;
use lumina::pipeline::AnalyticsPipeline;
use lumina::preprocessing::{select_target, DataCleaner};
use lumina::store::ModelStore;
use lumina::table::{Column, ColumnData, RawTable, Record, Scalar};
use lumina::training::{train, TaskType};
use std::collections::HashSet;
use std::sync::Arc;

fn num(v: f64) -> Scalar {
    Scalar::Number(v)
}

fn text(s: &str) -> Scalar {
    Scalar::Text(s.to_string())
}

fn pipeline() -> (tempfile::TempDir, AnalyticsPipeline) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ModelStore::open(dir.path()).unwrap());
    (dir, AnalyticsPipeline::new(store))
}

/// Three features and a target with far larger variance
fn regression_table(n: usize) -> RawTable {
    let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..n).map(|i| ((i * 3) % 7) as f64).collect();
    let c: Vec<f64> = (0..n).map(|i| ((i * 5) % 13) as f64).collect();
    let y: Vec<f64> = (0..n).map(|i| 100.0 * i as f64 + ((i * 3) % 7) as f64).collect();
    RawTable::new(vec![
        Column::numeric("a", &a),
        Column::numeric("b", &b),
        Column::numeric("c", &c),
        Column::numeric("y", &y),
    ])
    .unwrap()
}

fn messy_table() -> RawTable {
    RawTable::from_rows(
        &["price", "qty", "city", "flag"],
        vec![
            vec![num(10.0), text(" 3 "), text(" NY "), Scalar::Bool(true)],
            vec![Scalar::Missing, text("4"), text("LA"), Scalar::Bool(false)],
            vec![num(30.0), Scalar::Missing, Scalar::Missing, Scalar::Bool(true)],
            vec![num(10.0), text(" 3 "), text(" NY "), Scalar::Bool(true)],
            vec![text("1,000"), text("7"), text("SF"), Scalar::Missing],
            vec![num(55.5), text("n/a"), text("NY"), Scalar::Bool(false)],
        ],
    )
    .unwrap()
}

fn assert_clean_invariants(table: &lumina::table::CleanTable) {
    let mut seen = HashSet::new();
    for row in 0..table.height() {
        let key: Vec<String> = table.columns().iter().map(|c| format!("{:?}", c.data.key(row))).collect();
        assert!(seen.insert(key), "duplicate row {}", row);
    }
    for column in table.columns() {
        match &column.data {
            ColumnData::Numeric(values) => assert!(values.iter().all(|v| v.is_finite())),
            ColumnData::Categorical(values) => assert!(values.iter().all(|v| !v.is_missing())),
        }
    }
}

#[test]
fn test_clean_is_idempotent() {
    let cleaner = DataCleaner::new();
    let once = cleaner.clean(&messy_table());
    let twice = cleaner.clean(&once.to_raw());
    assert_eq!(once, twice);
}

#[test]
fn test_clean_output_has_no_duplicates_or_missing() {
    let cleaned = DataCleaner::new().clean(&messy_table());
    assert!(cleaned.height() > 0);
    assert_clean_invariants(&cleaned);
}

#[test]
fn test_mean_fill_example() {
    let raw = RawTable::from_rows(
        &["v", "k"],
        vec![
            vec![num(10.0), text("a")],
            vec![Scalar::Missing, text("b")],
            vec![num(30.0), text("c")],
        ],
    )
    .unwrap();
    let cleaned = DataCleaner::new().clean(&raw);
    assert_eq!(cleaned.column("v").unwrap().as_numeric(), Some(&[10.0, 20.0, 30.0][..]));
}

#[test]
fn test_variance_tie_keeps_first_column() {
    let raw = RawTable::new(vec![
        Column::numeric("x", &[1.0, 2.0, 3.0]),
        Column::numeric("y", &[3.0, 2.0, 1.0]),
    ])
    .unwrap();
    let cleaned = DataCleaner::new().clean(&raw);
    let selection = select_target(&cleaned).unwrap();
    assert_eq!(selection.target, "x");
    assert_eq!(selection.features, vec!["y".to_string()]);
}

#[test]
fn test_small_dataset_reports_insufficient_data() {
    let raw = RawTable::from_rows(
        &["age", "income", "city"],
        vec![
            vec![num(25.0), num(50000.0), text("NY")],
            vec![num(30.0), num(60000.0), text("LA")],
            vec![num(25.0), num(50000.0), text("NY")],
        ],
    )
    .unwrap();
    let cleaned = DataCleaner::new().clean(&raw);
    assert_eq!(cleaned.height(), 2);
    assert_eq!(select_target(&cleaned).unwrap().target, "income");
    assert!(matches!(train(&cleaned), Err(LuminaError::InsufficientData(_))));
}

#[test]
fn test_training_is_deterministic() {
    let cleaned = DataCleaner::new().clean(&regression_table(40));
    let (first, score_a) = train(&cleaned).unwrap();
    let (second, score_b) = train(&cleaned).unwrap();
    assert_eq!(score_a, score_b);
    assert_eq!(first.feature_schema, second.feature_schema);
    assert_eq!(first.n_train, second.n_train);
    assert_eq!(first.n_test, 8);
}

#[test]
fn test_analyze_then_predict_with_partial_record() {
    let (_dir, pipeline) = pipeline();
    let outcome = pipeline.analyze(&regression_table(40), None).unwrap();

    assert_eq!(outcome.model.target, "y");
    assert_eq!(outcome.model.task_type, TaskType::Regression);
    assert_eq!(outcome.model.features, vec!["a", "b", "c"]);
    assert_eq!(outcome.insights.model_score, Some(outcome.model.score));

    let predictions = pipeline.predict(&[Record::new().with("a", 1.0)]).unwrap();
    assert_eq!(predictions.len(), 1);
    assert!(matches!(predictions[0], Scalar::Number(v) if v.is_finite()));
}

#[test]
fn test_predict_ignores_extra_columns_and_bad_cells() {
    let (_dir, pipeline) = pipeline();
    pipeline.analyze(&regression_table(40), None).unwrap();

    let aligned = pipeline
        .predict(&[Record::new().with("a", 10.0).with("b", 0.0).with("c", 0.0)])
        .unwrap();
    let noisy = pipeline
        .predict(&[Record::new()
            .with("c", 0.0)
            .with("unused", "whatever")
            .with("b", "not a number")
            .with("a", "10")])
        .unwrap();
    assert_eq!(aligned, noisy);
}

#[test]
fn test_predict_empty_input() {
    let (_dir, pipeline) = pipeline();
    pipeline.analyze(&regression_table(20), None).unwrap();
    assert!(matches!(pipeline.predict(&[]), Err(LuminaError::EmptyInput)));
}

#[test]
fn test_predict_before_training() {
    let (_dir, pipeline) = pipeline();
    let result = pipeline.predict(&[Record::new().with("a", 1.0)]);
    assert!(matches!(result, Err(LuminaError::NoModelAvailable)));
}

#[test]
fn test_failed_training_keeps_previous_model() {
    let (_dir, pipeline) = pipeline();
    pipeline.analyze(&regression_table(30), None).unwrap();

    let tiny = RawTable::new(vec![
        Column::numeric("age", &[25.0, 30.0]),
        Column::numeric("income", &[50000.0, 60000.0]),
    ])
    .unwrap();
    assert!(pipeline.analyze(&tiny, None).is_err());

    assert_eq!(pipeline.current_model().unwrap().target, "y");
}

#[test]
fn test_explicit_categorical_target() {
    let n = 30;
    let size: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let label: Vec<&str> = (0..n).map(|i| if i < 15 { "small" } else { "large" }).collect();
    let raw = RawTable::new(vec![Column::numeric("size", &size), Column::text("label", &label)]).unwrap();

    let (_dir, pipeline) = pipeline();
    let outcome = pipeline.analyze(&raw, Some("label")).unwrap();
    assert_eq!(outcome.model.task_type, TaskType::Classification);

    let predictions = pipeline
        .predict(&[Record::new().with("size", 1.0), Record::new().with("size", 28.0)])
        .unwrap();
    assert_eq!(predictions, vec![text("small"), text("large")]);
}

#[test]
fn test_unknown_explicit_target() {
    let (_dir, pipeline) = pipeline();
    let result = pipeline.analyze(&regression_table(20), Some("missing"));
    assert!(matches!(result, Err(LuminaError::TargetNotFound(_))));
}
