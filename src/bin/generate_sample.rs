use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::json;

use rusty_sorbent::PressureGrid;

/// Langmuir uptake `q_max · b · p / (1 + b · p)`.
fn langmuir(p: f64, q_max: f64, b: f64) -> f64 {
    q_max * b * p / (1.0 + b * p)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Column buffers for the measurement table.
#[derive(Default)]
struct Table {
    material: Vec<String>,
    adsorbate: Vec<String>,
    temperature: Vec<f64>,
    kind: Vec<&'static str>,
    henry: Vec<Option<f64>>,
    loading: Vec<Vec<Option<f64>>>,
    isotherm: Vec<String>,
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let grid = PressureGrid::default();
    let out_dir = Path::new("sample_data");
    let iso_dir = out_dir.join("isotherms");
    std::fs::create_dir_all(&iso_dir).context("creating output directory")?;

    // (adsorbate, affinity scale, capacity scale)
    let adsorbates = [
        ("propane", 1.0, 1.0),
        ("propene", 1.6, 1.1),
        ("ethane", 0.5, 1.3),
        ("ethene", 0.8, 1.4),
    ];
    let temperatures = [293.0_f64, 303.0, 313.0];
    let kinds = ["experimental", "simulated"];

    let mut table = Table::default();
    let mut written_docs = 0usize;

    for m in 0..40 {
        let material = format!("MOF-{m:03}");
        let base_q = rng.range(1.0, 8.0);
        let base_b = rng.range(0.2, 5.0);

        for &(adsorbate, affinity, capacity) in &adsorbates {
            // Not every material was measured with every gas.
            if rng.next_f64() < 0.15 {
                continue;
            }
            for &temperature in &temperatures {
                let n_repeats = 1 + (rng.next_u64() % 4) as usize;
                for r in 0..n_repeats {
                    let kind = kinds[(rng.next_u64() % 2) as usize];
                    let thermal = (-(temperature - 303.0) / 40.0).exp();
                    let b = base_b * affinity * thermal * rng.gauss(1.0, 0.05).max(0.5);
                    let q_max = base_q * capacity;
                    // Roughly one repeat in twenty is a wild outlier.
                    let outlier = if rng.next_f64() < 0.05 { 4.0 } else { 1.0 };

                    let points: Vec<(f64, f64)> = (0..grid.len())
                        .map(|i| {
                            let p = grid.pressure(i);
                            let q = langmuir(p, q_max, b) * outlier + rng.gauss(0.0, 0.02);
                            (p, q.max(0.0))
                        })
                        .collect();
                    let loading: Vec<Option<f64>> = points
                        .iter()
                        .map(|&(_, q)| (rng.next_f64() > 0.05).then_some(q))
                        .collect();
                    let henry = (rng.next_f64() > 0.05).then_some(q_max * b * outlier);

                    let reference = format!("{material}-{adsorbate}-{temperature}-{r}");
                    // A few references point at documents that were never stored.
                    if rng.next_f64() > 0.1 {
                        let doc = json!({
                            "filename": reference,
                            "DOI": format!("10.5555/sample.{m}.{r}"),
                            "temperature": temperature,
                            "isotherm_data": points
                                .iter()
                                .map(|&(p, q)| json!({"pressure": p, "total_adsorption": q}))
                                .collect::<Vec<_>>(),
                        });
                        let path = iso_dir.join(format!("{reference}.json"));
                        std::fs::write(&path, serde_json::to_vec_pretty(&doc)?)
                            .with_context(|| format!("writing {}", path.display()))?;
                        written_docs += 1;
                    }

                    table.material.push(material.clone());
                    table.adsorbate.push(adsorbate.to_string());
                    table.temperature.push(temperature);
                    table.kind.push(kind);
                    table.henry.push(henry);
                    table.loading.push(loading);
                    table.isotherm.push(reference);
                }
            }
        }
    }

    // Build Arrow arrays
    let mut loading_builder = ListBuilder::new(Float64Builder::new());
    for row in &table.loading {
        let values = loading_builder.values();
        for &v in row {
            values.append_option(v);
        }
        loading_builder.append(true);
    }
    let loading_array = loading_builder.finish();

    let strings = |col: &[String]| StringArray::from(col.iter().map(|s| s.as_str()).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("material", DataType::Utf8, false),
        Field::new("adsorbate", DataType::Utf8, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("henry", DataType::Float64, true),
        Field::new(
            "loading",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("isotherm", DataType::Utf8, false),
    ]));

    let n_rows = table.material.len();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(strings(&table.material)),
            Arc::new(strings(&table.adsorbate)),
            Arc::new(Float64Array::from(table.temperature)),
            Arc::new(StringArray::from(table.kind)),
            Arc::new(Float64Array::from(table.henry)),
            Arc::new(loading_array),
            Arc::new(strings(&table.isotherm)),
        ],
    )
    .context("building record batch")?;

    // Write Parquet
    let output_path = out_dir.join("measurements.parquet");
    let file = std::fs::File::create(&output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {n_rows} measurements ({} pressure buckets each) to {} and {written_docs} isotherm documents to {}",
        grid.len(),
        output_path.display(),
        iso_dir.display()
    );
    Ok(())
}
