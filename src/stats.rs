use serde::Serialize;

/// Robust summary of the samples for one (material, column) pair.
///
/// `count` is the number of non-missing samples *before* outlier rejection;
/// `median` and `error` describe the samples that survived it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerMaterialStat {
    pub count: usize,
    pub median: f64,
    pub error: f64,
}

impl PerMaterialStat {
    pub const EMPTY: PerMaterialStat = PerMaterialStat {
        count: 0,
        median: f64::NAN,
        error: 0.0,
    };
}

/// Below this many samples no outlier rejection is attempted.
const MIN_SAMPLES_FOR_REJECTION: usize = 5;
const IQR_FENCE: f64 = 1.5;

/// Outlier-robust (count, median, error) of `samples`. NaN entries are missing.
pub fn stats<I>(samples: I) -> PerMaterialStat
where
    I: IntoIterator<Item = f64>,
{
    let mut values: Vec<f64> = samples.into_iter().filter(|v| !v.is_nan()).collect();
    values.sort_by(f64::total_cmp);
    let count = values.len();

    match count {
        0 => PerMaterialStat::EMPTY,
        1 => PerMaterialStat {
            count,
            median: values[0],
            error: 0.0,
        },
        n if n < MIN_SAMPLES_FOR_REJECTION => PerMaterialStat {
            count,
            median: sorted_median(&values),
            error: population_std(&values),
        },
        _ => {
            let q1 = percentile(&values, 0.25);
            let q3 = percentile(&values, 0.75);
            let iqr = q3 - q1;
            let (low, high) = (q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr);
            let kept: Vec<f64> = values
                .into_iter()
                .filter(|v| (low..=high).contains(v))
                .collect();
            PerMaterialStat {
                count,
                median: sorted_median(&kept),
                error: population_std(&kept),
            }
        }
    }
}

/// Linear-interpolation percentile of already sorted samples, `q` in `[0, 1]`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

fn sorted_median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn empty_and_all_missing_give_nan_median() {
        let s = stats(Vec::<f64>::new());
        assert_eq!(s.count, 0);
        assert!(s.median.is_nan());
        assert_eq!(s.error, 0.0);

        let s = stats([f64::NAN, f64::NAN]);
        assert_eq!(s.count, 0);
        assert!(s.median.is_nan());
        assert_eq!(s.error, 0.0);
    }

    #[test]
    fn single_sample_has_zero_error() {
        let s = stats([f64::NAN, 3.5]);
        assert_eq!(s.count, 1);
        assert_eq!(s.median, 3.5);
        assert_eq!(s.error, 0.0);
    }

    #[test]
    fn small_sets_are_not_trimmed() {
        // 100 would be an outlier, but four samples are never trimmed.
        let s = stats([1.0, 2.0, 3.0, 100.0]);
        assert_eq!(s.count, 4);
        assert!(close(s.median, 2.5));
        let mean = 106.0 / 4.0;
        let var = [1.0, 2.0, 3.0, 100.0]
            .iter()
            .map(|v: &f64| (v - mean).powi(2))
            .sum::<f64>()
            / 4.0;
        assert!(close(s.error, var.sqrt()));
    }

    #[test]
    fn two_samples_use_population_std() {
        let s = stats([1.0, 3.0]);
        assert!(close(s.median, 2.0));
        assert!(close(s.error, 1.0));
    }

    #[test]
    fn outlier_is_rejected_above_four_samples() {
        assert!(close(percentile(&[1.0, 2.0, 3.0, 4.0, 100.0], 0.25), 2.0));
        assert!(close(percentile(&[1.0, 2.0, 3.0, 4.0, 100.0], 0.75), 4.0));

        let s = stats([100.0, 1.0, 3.0, 2.0, 4.0]);
        // Count reflects the samples before rejection.
        assert_eq!(s.count, 5);
        assert!(close(s.median, 2.5));
        assert!(close(s.error, 1.25f64.sqrt()));
    }

    #[test]
    fn fence_bounds_are_inclusive() {
        // Q1 = 2, Q3 = 4, upper fence = 7: a sample sitting on it survives.
        let s = stats([1.0, 2.0, 3.0, 4.0, 7.0]);
        assert!(close(s.median, 3.0));
        assert!(s.error > 1.5);
    }

    #[test]
    fn order_of_samples_does_not_matter() {
        let a = stats([5.0, 1.0, 9.0, 2.0, 2.5, 3.0, f64::NAN]);
        let b = stats([3.0, f64::NAN, 2.5, 2.0, 9.0, 1.0, 5.0]);
        assert_eq!(a, b);
    }
}
