use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray,
    ListArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{IsothermRef, IsothermType, PressureGrid, RawDataset, RawMeasurement};

/// Scalar columns every format must provide, besides the `loading` list.
const SCALAR_COLUMNS: [&str; 6] = [
    "material",
    "adsorbate",
    "temperature",
    "type",
    "henry",
    "isotherm",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a measurement table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – `loading` as a List<Float64> column (recommended)
/// * `.json`    – `[{ "material": ..., "loading": [...], ... }, ...]`
/// * `.csv`     – `loading` holds semicolon-separated floats
///
/// Missing numbers (`null`, empty CSV tokens, null list items) become NaN.
pub fn load_file(path: &Path, grid: PressureGrid) -> Result<RawDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let measurements = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    log::info!(
        "Loaded {} measurements from {}",
        measurements.len(),
        path.display()
    );
    Ok(RawDataset::from_measurements(measurements, grid))
}

fn parse_kind(s: &str, row: usize) -> Result<IsothermType> {
    s.parse::<IsothermType>()
        .map_err(|e| anyhow::anyhow!("Row {row}: {e}"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "material": "ZIF-8",
///     "adsorbate": "propane",
///     "temperature": 303.0,
///     "type": "exp",
///     "henry": 1.7,
///     "loading": [0.0, 0.8, null, ...],
///     "isotherm": "10.1021-abc.isotherm3"
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<RawMeasurement>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            let text_field = |key: &str| {
                obj.get(key)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .with_context(|| format!("Row {i}: missing or invalid '{key}'"))
            };
            let temperature = obj
                .get("temperature")
                .and_then(|v| v.as_f64())
                .with_context(|| format!("Row {i}: missing or invalid 'temperature'"))?;

            Ok::<_, anyhow::Error>(RawMeasurement {
                material: text_field("material")?,
                adsorbate: text_field("adsorbate")?,
                temperature,
                kind: parse_kind(&text_field("type")?, i)?,
                henry: json_to_f64(obj.get("henry"), i, "henry")?,
                loading: json_array_to_f64(obj.get("loading"), i, "loading")?,
                isotherm: IsothermRef(text_field("isotherm")?),
            })
        })
        .collect()
}

/// A number, or NaN for `null` / absent.
fn json_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<f64> {
    match val {
        None | Some(JsonValue::Null) => Ok(f64::NAN),
        Some(v) => v
            .as_f64()
            .with_context(|| format!("Row {row}: '{col}' is not a number")),
    }
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| json_to_f64(Some(v), row, &format!("{col}[{j}]")))
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names.
/// `loading` contains semicolon-separated floats, an empty token is missing:
///   `"0.0;0.81;;1.52"`
fn load_csv(path: &Path) -> Result<Vec<RawMeasurement>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let [material_idx, adsorbate_idx, temperature_idx, type_idx, henry_idx, isotherm_idx] = [
        idx(SCALAR_COLUMNS[0])?,
        idx(SCALAR_COLUMNS[1])?,
        idx(SCALAR_COLUMNS[2])?,
        idx(SCALAR_COLUMNS[3])?,
        idx(SCALAR_COLUMNS[4])?,
        idx(SCALAR_COLUMNS[5])?,
    ];
    let loading_idx = idx("loading")?;

    let mut measurements = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let temperature = field(temperature_idx)
            .parse::<f64>()
            .with_context(|| format!("CSV row {row_no}: invalid temperature"))?;

        measurements.push(RawMeasurement {
            material: field(material_idx).to_string(),
            adsorbate: field(adsorbate_idx).to_string(),
            temperature,
            kind: parse_kind(field(type_idx), row_no)?,
            henry: parse_optional_float(field(henry_idx), row_no, "henry")?,
            loading: parse_semicolon_floats(field(loading_idx), row_no, "loading")?,
            isotherm: IsothermRef(field(isotherm_idx).to_string()),
        });
    }

    Ok(measurements)
}

fn parse_optional_float(tok: &str, row: usize, col: &str) -> Result<f64> {
    let tok = tok.trim();
    if tok.is_empty() {
        return Ok(f64::NAN);
    }
    tok.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{tok}' is not a number"))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| parse_optional_float(tok, row, &format!("{col}[{j}]")))
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of measurements.
///
/// Expected schema:
/// - `loading`: List<Float64> or LargeList<Float64>, one entry per pressure bucket
/// - `material`, `adsorbate`, `type`, `isotherm`: Utf8 / LargeUtf8
/// - `temperature`, `henry`: Float64, Float32, Int32 or Int64 (nulls are missing)
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Vec<RawMeasurement>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut measurements = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|i| batch.column(i))
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };

        let material = column("material")?;
        let adsorbate = column("adsorbate")?;
        let temperature = column("temperature")?;
        let kind = column("type")?;
        let henry = column("henry")?;
        let loading = column("loading")?;
        let isotherm = column("isotherm")?;

        for row in 0..batch.num_rows() {
            let temperature = extract_f64(temperature, row)
                .with_context(|| format!("Row {row}: failed to read 'temperature'"))?;
            if temperature.is_nan() {
                bail!("Row {row}: 'temperature' is null");
            }
            measurements.push(RawMeasurement {
                material: extract_string(material, row)
                    .with_context(|| format!("Row {row}: failed to read 'material'"))?,
                adsorbate: extract_string(adsorbate, row)
                    .with_context(|| format!("Row {row}: failed to read 'adsorbate'"))?,
                temperature,
                kind: parse_kind(&extract_string(kind, row)?, row)?,
                henry: extract_f64(henry, row)
                    .with_context(|| format!("Row {row}: failed to read 'henry'"))?,
                loading: extract_f64_list(loading, row)
                    .with_context(|| format!("Row {row}: failed to read 'loading'"))?,
                isotherm: IsothermRef(
                    extract_string(isotherm, row)
                        .with_context(|| format!("Row {row}: failed to read 'isotherm'"))?,
                ),
            });
        }
    }

    Ok(measurements)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
/// A null list is an empty vector, null items are NaN.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        return Ok(Vec::new());
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.map(f64::from).unwrap_or(f64::NAN)).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a numeric cell as `f64`; null is NaN.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if col.is_null(row) {
        return Ok(f64::NAN);
    }
    let value = match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .value(row),
        DataType::Float32 => f64::from(
            col.as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?
                .value(row),
        ),
        DataType::Int32 => f64::from(
            col.as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?
                .value(row),
        ),
        DataType::Int64 => {
            col.as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?
                .value(row) as f64
        }
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(value)
}

/// Extract a text cell from a Utf8 or LargeUtf8 column.
fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in text column");
    }
    match col.data_type() {
        DataType::Utf8 => Ok(col
            .as_any()
            .downcast_ref::<StringArray>()
            .context("expected StringArray")?
            .value(row)
            .to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected a text column, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::array::{ArrayRef, Float64Builder, ListBuilder};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_json_records_with_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "data.json",
            r#"[
                {"material": "ZIF-8", "adsorbate": "propane", "temperature": 303,
                 "type": "exp", "henry": null, "loading": [0.0, 1.5, null],
                 "isotherm": "iso-1"}
            ]"#,
        );
        let dataset = load_file(&path, PressureGrid::default()).unwrap();
        assert_eq!(dataset.len(), 1);
        let m = &dataset.measurements[0];
        assert_eq!(m.material, "ZIF-8");
        assert_eq!(m.kind, IsothermType::Experimental);
        assert!(m.henry.is_nan());
        assert_eq!(m.loading.len(), 3);
        assert!(m.loading[2].is_nan());
        assert_eq!(m.isotherm, IsothermRef("iso-1".into()));
        assert!(dataset.adsorbates.contains("propane"));
    }

    #[test]
    fn loads_csv_with_semicolon_loadings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "data.csv",
            "material,adsorbate,temperature,type,henry,loading,isotherm\n\
             ZIF-8,propene,298.0,simulated,2.5,0.0;1.0;;3.0,iso-2\n",
        );
        let dataset = load_file(&path, PressureGrid::default()).unwrap();
        let m = &dataset.measurements[0];
        assert_eq!(m.kind, IsothermType::Simulated);
        assert_eq!(m.henry, 2.5);
        assert_eq!(m.loading.len(), 4);
        assert!(m.loading[2].is_nan());
        assert_eq!(m.loading[3], 3.0);
    }

    fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) {
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn parquet_columns() -> Vec<(&'static str, ArrayRef)> {
        let mut loading = ListBuilder::new(Float64Builder::new());
        loading.values().append_value(0.0);
        loading.values().append_null();
        loading.values().append_value(2.0);
        loading.append(true);
        loading.append(false);

        vec![
            ("material", Arc::new(StringArray::from(vec!["ZIF-8", "ZIF-8"])) as ArrayRef),
            ("adsorbate", Arc::new(StringArray::from(vec!["propane", "propene"])) as ArrayRef),
            ("temperature", Arc::new(Float64Array::from(vec![303.0, 298.0])) as ArrayRef),
            ("type", Arc::new(StringArray::from(vec!["experimental", "sim"])) as ArrayRef),
            ("henry", Arc::new(Float64Array::from(vec![None, Some(2.0)])) as ArrayRef),
            ("loading", Arc::new(loading.finish()) as ArrayRef),
            ("isotherm", Arc::new(StringArray::from(vec!["iso-1", "iso-2"])) as ArrayRef),
        ]
    }

    #[test]
    fn loads_parquet_with_null_henry_and_list_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.parquet");
        write_parquet(&path, parquet_columns());

        let dataset = load_file(&path, PressureGrid::default()).unwrap();
        assert_eq!(dataset.len(), 2);

        let first = &dataset.measurements[0];
        assert_eq!(first.adsorbate, "propane");
        assert_eq!(first.kind, IsothermType::Experimental);
        assert!(first.henry.is_nan());
        assert_eq!(first.loading.len(), 3);
        assert_eq!(first.loading[0], 0.0);
        assert!(first.loading[1].is_nan());
        assert_eq!(first.loading[2], 2.0);
        assert_eq!(first.isotherm, IsothermRef("iso-1".into()));

        let second = &dataset.measurements[1];
        assert_eq!(second.kind, IsothermType::Simulated);
        assert_eq!(second.temperature, 298.0);
        assert_eq!(second.henry, 2.0);
        // A null list is a measurement without any bucket.
        assert!(second.loading.is_empty());
        assert!(second.loading_at(0).is_nan());
    }

    #[test]
    fn parquet_without_isotherm_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.pq");
        let columns = parquet_columns()
            .into_iter()
            .filter(|(name, _)| *name != "isotherm")
            .collect();
        write_parquet(&path, columns);

        let err = load_file(&path, PressureGrid::default()).unwrap_err();
        assert!(format!("{err:#}").contains("'isotherm'"), "{err:#}");
    }

    #[test]
    fn rejects_unknown_extensions_and_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "data.txt", "");
        assert!(load_file(&path, PressureGrid::default()).is_err());

        let path = write(
            &dir,
            "bad.csv",
            "material,adsorbate,temperature,type,henry,loading,isotherm\n\
             ZIF-8,propene,hot,simulated,2.5,0.0,iso-2\n",
        );
        assert!(load_file(&path, PressureGrid::default()).is_err());
    }
}
