//! Lumina CLI Module
//!
//! Runs the analytics pipeline offline: cleaning, training, prediction and
//! column statistics on local files, plus the HTTP server.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::AnalyticsPipeline;
use crate::store::ModelStore;
use crate::table::{RawTable, Record};
use crate::training::{TaskType, TrainingConfig};
use crate::utils::data_loader::{DataLoader, TableFormat};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.4}", x)).unwrap_or_else(|| "-".to_string())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lumina")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tabular data analytics: cleaning, target inference, training and prediction")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server port (defaults to API_PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host (defaults to API_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
    },

    /// Clean a data file and write it back in the same format
    Clean {
        /// Input data file (CSV, TSV, JSON, JSON lines, Parquet or Excel)
        #[arg(short, long)]
        data: PathBuf,

        /// Output file (defaults to cleaned_<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clean, analyze and train a model, replacing the stored one
    Train {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column (inferred from variance when omitted)
        #[arg(short, long)]
        target: Option<String>,

        /// Model store directory
        #[arg(long, default_value = "./models")]
        models_dir: PathBuf,

        /// Fraction of rows held out for scoring
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Number of trees in the regression forest
        #[arg(long, default_value = "100")]
        n_estimators: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Predict every row of a data file with the stored model
    Predict {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Model store directory
        #[arg(long, default_value = "./models")]
        models_dir: PathBuf,

        /// Write predictions as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show per-column descriptive statistics of a data file
    Describe {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn open_pipeline(models_dir: &Path) -> anyhow::Result<AnalyticsPipeline> {
    let store = ModelStore::open(models_dir)?;
    Ok(AnalyticsPipeline::new(Arc::new(store)))
}

fn load_table(path: &Path) -> anyhow::Result<(RawTable, TableFormat)> {
    let format = TableFormat::from_path(path)?;
    step_run("Loading data");
    let start = Instant::now();
    let raw = DataLoader::new().load(path, format)?;
    step_done(&format!("{} rows × {} cols in {:?}", raw.height(), raw.width(), start.elapsed()));
    Ok((raw, format))
}

/// One record per row, keyed by column name
pub fn table_to_records(table: &RawTable) -> Vec<Record> {
    (0..table.height())
        .map(|row| {
            let mut record = Record::new();
            for column in table.columns() {
                record.insert(column.name.clone(), column.values[row].clone());
            }
            record
        })
        .collect()
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_clean(data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Clean");

    let (raw, format) = load_table(data_path)?;

    step_run("Cleaning");
    let (clean, report) = crate::preprocessing::DataCleaner::new().clean_with_report(&raw);
    step_done(&format!("{:.1}ms", report.elapsed_ms));

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let name = data_path.file_name().and_then(|n| n.to_str()).unwrap_or("data.csv");
            data_path.with_file_name(format!("cleaned_{}", name))
        }
    };

    step_run(&format!("Saving → {}", output.display()));
    let bytes = crate::utils::DataSaver::to_bytes(&clean, format)?;
    std::fs::write(&output, bytes)?;
    step_done(&format!("{} rows × {} cols", clean.height(), clean.width()));

    println!();
    println!("  {:<20} {}", muted("Duplicates removed"), report.duplicates_removed);
    println!("  {:<20} {}", muted("Cells filled"), report.cells_filled);
    println!("  {:<20} {}", muted("Cells coerced"), report.cells_coerced);
    for dropped in &report.dropped_columns {
        println!("  {:<20} {} {}", muted("Dropped"), dropped.name.white(), dim(&format!("({:?})", dropped.reason)));
    }
    println!();
    Ok(())
}

pub fn cmd_train(
    data_path: &Path,
    target: Option<&str>,
    models_dir: &Path,
    test_size: f64,
    n_estimators: usize,
    seed: u64,
) -> anyhow::Result<()> {
    section("Train");

    let (raw, _) = load_table(data_path)?;

    let config = TrainingConfig::new()
        .with_test_size(test_size)
        .with_n_estimators(n_estimators)
        .with_random_state(seed);
    let pipeline = open_pipeline(models_dir)?.with_training_config(config);

    step_run("Cleaning, analyzing and training");
    let start = Instant::now();
    let outcome = pipeline.analyze(&raw, target)?;
    step_done(&format!("{:?}", start.elapsed()));

    let model = &outcome.model;
    let metric_name = match model.task_type {
        TaskType::Regression => "R²",
        TaskType::Classification => "Accuracy",
    };

    println!();
    println!("  {:<16} {}", muted("Target"), model.target.cyan());
    println!("  {:<16} {:?}", muted("Task"), model.task_type);
    println!("  {:<16} {}", muted("Features"), model.features.join(", "));
    println!("  {:<16} {} / {}", muted("Train / test"), model.n_train, model.n_test);
    println!("  {:<16} {}", muted(metric_name), format!("{:.4}", model.score).white().bold());
    if let Some(rmse) = model.metrics.rmse {
        println!("  {:<16} {:.4}", muted("RMSE"), rmse);
    }
    println!("  {:<16} {}", muted("Time"), format!("{:.3}s", model.metrics.training_time_secs).white());
    println!("  {:<16} {}", muted("Saved to"), pipeline.store().path().display());

    if !model.feature_importances.is_empty() {
        section("Feature importance");
        let mut ranked = model.feature_importances.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (name, importance) in ranked.iter().take(10) {
            println!("  {:<24} {:>8.4}", name, importance);
        }
    }

    println!();
    Ok(())
}

pub fn cmd_predict(data_path: &Path, models_dir: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    let (raw, _) = load_table(data_path)?;
    let records = table_to_records(&raw);
    let pipeline = open_pipeline(models_dir)?;

    step_run("Predicting");
    let start = Instant::now();
    let predictions = pipeline.predict(&records)?;
    step_done(&format!("{} rows in {:?}", predictions.len(), start.elapsed()));

    match output {
        Some(path) => {
            let values: Vec<serde_json::Value> = predictions.iter().map(|p| p.to_json()).collect();
            let body = serde_json::json!({ "predictions": values });
            std::fs::write(path, serde_json::to_vec_pretty(&body)?)?;
            println!("  {} {}", ok("wrote"), path.display());
        }
        None => {
            println!();
            println!("  {:>6} {}", muted("Row"), muted("Prediction"));
            println!("  {}", dim(&"─".repeat(30)));
            for (i, prediction) in predictions.iter().enumerate() {
                println!("  {:>6} {}", i, prediction);
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_describe(data_path: &Path) -> anyhow::Result<()> {
    section("Describe");

    let (raw, _) = load_table(data_path)?;
    let summaries = crate::analysis::describe(&raw);

    println!();
    println!(
        "  {:<18} {:<12} {:>6} {:>10} {:>10} {:>10} {:>10}",
        muted("Column"), muted("Kind"), muted("Count"), muted("Mean"), muted("Std"), muted("Min"), muted("Max")
    );
    println!("  {}", dim(&"─".repeat(82)));

    for summary in &summaries {
        let kind = format!("{:?}", summary.kind);
        match summary.mean {
            Some(_) => println!(
                "  {:<18} {:<12} {:>6} {:>10} {:>10} {:>10} {:>10}",
                summary.column, kind.truecolor(140, 140, 140), summary.count,
                fmt_opt(summary.mean), fmt_opt(summary.std), fmt_opt(summary.min), fmt_opt(summary.max)
            ),
            None => {
                let top = summary.top.as_ref().map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:<18} {:<12} {:>6} {} {} {} {}",
                    summary.column, kind.truecolor(140, 140, 140), summary.count,
                    muted("unique"), summary.unique.unwrap_or(0),
                    muted("top"), top
                );
            }
        }
    }

    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Lumina".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("API    ", &format!("http://{}:{}/api", config.host, config.port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", config.host, config.port)));
    line_box(&kv("Models ", &config.models_dir.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}
