/// Mean and population standard deviation of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub std: f64,
}

impl Stats {
    /// `None` for an empty slice: there is no mean to report.
    pub fn of(values: &[f64]) -> Option<Stats> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Stats { mean, std: var.sqrt() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_has_no_stats() {
        assert_eq!(Stats::of(&[]), None);
    }

    #[test]
    fn constant_sample_has_zero_std() {
        let s = Stats::of(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(s, Stats { mean: 1.0, std: 0.0 });
    }

    #[test]
    fn population_std() {
        let s = Stats::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_abs_diff_eq!(s.mean, 5.0);
        assert_abs_diff_eq!(s.std, 2.0);
    }
}
