//! Data loading utilities
//!
//! Reads delimited text, JSON records, Parquet and Excel workbooks into a
//! [`RawTable`], and writes a [`CleanTable`] back out in the same format.

use crate::error::{LuminaError, Result};
use crate::table::{CleanTable, Column as TableColumn, ColumnData, RawTable, Scalar};
use calamine::{Data, Reader, Xlsx};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Supported table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
    Parquet,
    Excel,
}

impl TableFormat {
    /// Detect the format from a file name or path
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Some(TableFormat::Csv)
        } else if lower.ends_with(".tsv") || lower.ends_with(".tab") {
            Some(TableFormat::Tsv)
        } else if lower.ends_with(".json") {
            Some(TableFormat::Json)
        } else if lower.ends_with(".jsonl") || lower.ends_with(".ndjson") {
            Some(TableFormat::JsonLines)
        } else if lower.ends_with(".parquet") || lower.ends_with(".pq") {
            Some(TableFormat::Parquet)
        } else if lower.ends_with(".xlsx") {
            Some(TableFormat::Excel)
        } else {
            None
        }
    }

    /// Detect the format from a path, failing for unknown extensions
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.to_string_lossy();
        Self::from_file_name(&name).ok_or_else(|| LuminaError::UnsupportedFormat(name.to_string()))
    }

    /// Canonical file extension (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Tsv => "tsv",
            TableFormat::Json => "json",
            TableFormat::JsonLines => "jsonl",
            TableFormat::Parquet => "parquet",
            TableFormat::Excel => "xlsx",
        }
    }

    /// MIME type used when returning a file of this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            TableFormat::Csv => "text/csv",
            TableFormat::Tsv => "text/tab-separated-values",
            TableFormat::Json => "application/json",
            TableFormat::JsonLines => "application/x-ndjson",
            TableFormat::Parquet => "application/vnd.apache.parquet",
            TableFormat::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Data loader for the supported formats
pub struct DataLoader {
    /// Rows used by polars for schema inference (None = every row)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self { infer_schema_length: None }
    }

    /// Set the number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows.max(1));
        self
    }

    /// Detect the format from the extension and load
    pub fn load_auto(&self, path: &Path) -> Result<RawTable> {
        let format = TableFormat::from_path(path)?;
        self.load(path, format)
    }

    /// Load a file in the given format
    pub fn load(&self, path: &Path, format: TableFormat) -> Result<RawTable> {
        let table = match format {
            TableFormat::Csv => dataframe_to_raw(&self.read_delimited(path, b',')?)?,
            TableFormat::Tsv => dataframe_to_raw(&self.read_delimited(path, b'\t')?)?,
            TableFormat::Json => dataframe_to_raw(&read_json(path, JsonFormat::Json)?)?,
            TableFormat::JsonLines => dataframe_to_raw(&read_json(path, JsonFormat::JsonLines)?)?,
            TableFormat::Parquet => {
                let file = File::open(path).map_err(|e| LuminaError::UnreadableFile(e.to_string()))?;
                dataframe_to_raw(&ParquetReader::new(file).finish()?)?
            }
            TableFormat::Excel => read_excel(path)?,
        };
        debug!(
            path = %path.display(),
            ?format,
            rows = table.height(),
            columns = table.width(),
            "Loaded table"
        );
        Ok(table)
    }

    /// Read delimited text; a cell that does not fit the inferred dtype
    /// triggers a second read with every column as text, typing is then left
    /// to the cleaner
    fn read_delimited(&self, path: &Path, separator: u8) -> Result<DataFrame> {
        match read_csv(path, separator, self.infer_schema_length) {
            Ok(df) => Ok(df),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Typed read failed, reading columns as text");
                Ok(read_csv(path, separator, Some(0))?)
            }
        }
    }
}

fn read_csv(path: &Path, separator: u8, infer_schema_length: Option<usize>) -> PolarsResult<DataFrame> {
    let parse_opts = CsvParseOptions::default().with_separator(separator);
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_schema_length)
        .with_parse_options(parse_opts)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

fn read_json(path: &Path, format: JsonFormat) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| LuminaError::UnreadableFile(e.to_string()))?;
    // Scan every record so a late mixed-type value widens the column to text
    let df = JsonReader::new(file)
        .with_json_format(format)
        .infer_schema_len(None)
        .finish()?;
    Ok(df)
}

/// Convert a polars frame into a raw table, cell by cell
pub fn dataframe_to_raw(df: &DataFrame) -> Result<RawTable> {
    let height = df.height();
    let mut columns = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        let mut values = Vec::with_capacity(height);
        for i in 0..height {
            values.push(any_value_to_scalar(col.get(i)?));
        }
        columns.push(TableColumn::new(col.name().to_string(), values));
    }
    RawTable::new(columns)
}

fn any_value_to_scalar(value: AnyValue<'_>) -> Scalar {
    match value {
        AnyValue::Null => Scalar::Missing,
        AnyValue::Boolean(b) => Scalar::Bool(b),
        AnyValue::String(s) => Scalar::Text(s.to_string()),
        AnyValue::StringOwned(s) => Scalar::Text(s.to_string()),
        AnyValue::Float64(v) if v.is_nan() => Scalar::Missing,
        AnyValue::Float64(v) => Scalar::Number(v),
        AnyValue::Float32(v) if v.is_nan() => Scalar::Missing,
        AnyValue::Float32(v) => Scalar::Number(v as f64),
        AnyValue::Int32(v) => Scalar::Number(v as f64),
        AnyValue::Int64(v) => Scalar::Number(v as f64),
        AnyValue::UInt32(v) => Scalar::Number(v as f64),
        AnyValue::UInt64(v) => Scalar::Number(v as f64),
        // Dates, times and narrower integer types keep their display form
        other => Scalar::Text(other.to_string()),
    }
}

fn read_excel(path: &Path) -> Result<RawTable> {
    let mut workbook: Xlsx<_> =
        calamine::open_workbook(path).map_err(|e: calamine::XlsxError| LuminaError::UnreadableFile(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LuminaError::UnreadableFile("workbook has no worksheets".to_string()))?
        .map_err(|e| LuminaError::UnreadableFile(e.to_string()))?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| c.to_string()).collect(),
        None => return Ok(RawTable::default()),
    };
    let names = unique_header_names(&header);

    let mut columns: Vec<TableColumn> = names.into_iter().map(|n| TableColumn::new(n, Vec::new())).collect();
    for row in rows {
        for (idx, col) in columns.iter_mut().enumerate() {
            let cell = row.get(idx).map(excel_cell_to_scalar).unwrap_or(Scalar::Missing);
            col.values.push(cell);
        }
    }
    RawTable::new(columns)
}

fn excel_cell_to_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty | Data::Error(_) => Scalar::Missing,
        Data::Int(v) => Scalar::Number(*v as f64),
        Data::Float(v) => Scalar::Number(*v),
        Data::Bool(b) => Scalar::Bool(*b),
        Data::String(s) if s.is_empty() => Scalar::Missing,
        Data::String(s) => Scalar::Text(s.clone()),
        other => Scalar::Text(other.to_string()),
    }
}

/// Fill blank header cells and suffix repeated names (`a`, `a.1`, `a.2`)
fn unique_header_names(header: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (idx, raw) in header.iter().enumerate() {
        let base = if raw.trim().is_empty() {
            format!("column_{}", idx)
        } else {
            raw.trim().to_string()
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

/// Serialize cleaned tables
pub struct DataSaver;

impl DataSaver {
    /// Encode a table in the given format
    pub fn to_bytes(table: &CleanTable, format: TableFormat) -> Result<Vec<u8>> {
        let mut df = clean_to_dataframe(table)?;
        let mut buf: Vec<u8> = Vec::new();
        let written = match format {
            TableFormat::Csv => CsvWriter::new(&mut buf).finish(&mut df),
            TableFormat::Tsv => CsvWriter::new(&mut buf).with_separator(b'\t').finish(&mut df),
            TableFormat::Json => JsonWriter::new(&mut buf)
                .with_json_format(JsonFormat::Json)
                .finish(&mut df),
            TableFormat::JsonLines => JsonWriter::new(&mut buf)
                .with_json_format(JsonFormat::JsonLines)
                .finish(&mut df),
            TableFormat::Parquet => ParquetWriter::new(&mut buf).finish(&mut df).map(|_| ()),
            TableFormat::Excel => return write_excel(table),
        };
        written.map_err(write_error)?;
        Ok(buf)
    }

    /// Write a table to a file, format taken from the extension
    pub fn save(table: &CleanTable, path: &Path) -> Result<()> {
        let format = TableFormat::from_path(path)?;
        let bytes = Self::to_bytes(table, format)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Build a polars frame from a cleaned table
pub fn clean_to_dataframe(table: &CleanTable) -> Result<DataFrame> {
    let columns: Vec<Column> = table
        .columns()
        .iter()
        .map(|c| match &c.data {
            ColumnData::Numeric(values) => Column::new(c.name.as_str().into(), values.as_slice()),
            ColumnData::Categorical(values) => categorical_to_column(&c.name, values),
        })
        .collect();
    DataFrame::new(columns).map_err(write_error)
}

/// Polars failures on the write path are serialization errors, not bad input
fn write_error(err: PolarsError) -> LuminaError {
    LuminaError::SerializationError(err.to_string())
}

fn categorical_to_column(name: &str, values: &[Scalar]) -> Column {
    let all_bool = values.iter().all(|v| matches!(v, Scalar::Bool(_) | Scalar::Missing));
    if all_bool && !values.is_empty() {
        let bools: Vec<Option<bool>> = values
            .iter()
            .map(|v| match v {
                Scalar::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), bools);
    }
    let texts: Vec<Option<String>> = values
        .iter()
        .map(|v| if v.is_missing() { None } else { Some(v.to_string()) })
        .collect();
    Column::new(name.into(), texts)
}

fn write_excel(table: &CleanTable) -> Result<Vec<u8>> {
    let xlsx_err = |e: rust_xlsxwriter::XlsxError| LuminaError::SerializationError(e.to_string());
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();

    for (c, col) in table.columns().iter().enumerate() {
        let c = c as u16;
        sheet.write_string(0, c, col.name.as_str()).map_err(xlsx_err)?;
        for r in 0..table.height() {
            let row = (r + 1) as u32;
            match col.data.cell(r) {
                Scalar::Number(v) => {
                    sheet.write_number(row, c, v).map_err(xlsx_err)?;
                }
                Scalar::Text(s) => {
                    sheet.write_string(row, c, s).map_err(xlsx_err)?;
                }
                Scalar::Bool(b) => {
                    sheet.write_boolean(row, c, b).map_err(xlsx_err)?;
                }
                Scalar::Missing => {}
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}
