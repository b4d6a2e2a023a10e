use crate::error::{Result, RspError};
use serde::{Deserialize, Serialize};

/// Benjamini-Hochberg false discovery rate correction
///
/// For the p-value at ascending rank `k` (1-based) out of `N`:
///
/// ```text
/// q_raw(k) = p(k) * N / k
/// q(N)     = q_raw(N)
/// q(k)     = min(q_raw(k), q(k + 1))
/// ```
///
/// and every q-value is clipped to `1.0`. The result is aligned index-for-index
/// with the input.
///
/// # Ties
/// Ranks come from a stable sort, so equal p-values are ranked in input order.
/// The step-up minimum gives tied p-values identical q-values regardless, but
/// the stable order keeps the intermediate arithmetic reproducible.
///
/// # Errors
/// * [`RspError::EmptyInput`] if `pvalues` is empty
/// * [`RspError::InvalidPValue`] for the first value outside `[0, 1]` (NaN included).
///   Values are never clamped.
pub fn bh_fdr(pvalues: &[f64]) -> Result<Vec<f64>> {
    validate_pvalues(pvalues)?;

    let n = pvalues.len();
    let n_f64 = n as f64;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));

    let mut qvalues = vec![0.0; n];
    let mut running_min = f64::INFINITY;
    for (position, &index) in order.iter().enumerate().rev() {
        let rank = (position + 1) as f64;
        let raw = pvalues[index] * n_f64 / rank;
        running_min = running_min.min(raw);
        qvalues[index] = running_min.min(1.0);
    }

    Ok(qvalues)
}

/// Check that every p-value lies in `[0, 1]`
pub fn validate_pvalues(pvalues: &[f64]) -> Result<()> {
    if pvalues.is_empty() {
        return Err(RspError::empty("no p-values to correct"));
    }
    match pvalues
        .iter()
        .position(|p| !(0.0..=1.0).contains(p))
    {
        Some(index) => Err(RspError::InvalidPValue {
            index,
            value: pvalues[index],
        }),
        None => Ok(()),
    }
}

/// Raw p-values together with their BH-adjusted q-values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FdrResult {
    /// Original p-values, in input order
    pub p_values: Vec<f64>,
    /// Adjusted q-values, aligned with `p_values`
    pub q_values: Vec<f64>,
}

impl FdrResult {
    /// Number of tests
    pub fn n_tests(&self) -> usize {
        self.p_values.len()
    }

    /// Count of q-values strictly below `alpha`
    pub fn n_significant(&self, alpha: f64) -> usize {
        self.q_values.iter().filter(|&&q| q < alpha).count()
    }

    /// Input indices whose q-value is strictly below `alpha`
    pub fn significant_indices(&self, alpha: f64) -> Vec<usize> {
        self.q_values
            .iter()
            .enumerate()
            .filter(|&(_, &q)| q < alpha)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Run [`bh_fdr`] and keep the raw p-values alongside the result
pub fn correct(pvalues: &[f64]) -> Result<FdrResult> {
    let q_values = bh_fdr(pvalues)?;
    Ok(FdrResult {
        p_values: pvalues.to_vec(),
        q_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_pvalue() {
        assert_eq!(bh_fdr(&[0.05]).unwrap(), vec![0.05]);
    }

    #[test]
    fn test_unsorted_input() {
        let q = bh_fdr(&[0.01, 0.04, 0.03, 0.005]).unwrap();
        let expected = [0.02, 0.04, 0.04, 0.02];
        for (got, want) in q.iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_step_up_lowers_earlier_ranks() {
        // raw: 0.01*3/1 = 0.03, 0.02*3/2 = 0.03, 0.021*3/3 = 0.021
        let q = bh_fdr(&[0.01, 0.02, 0.021]).unwrap();
        for value in &q {
            assert_relative_eq!(*value, 0.021, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clipped_to_one() {
        // raw for the smallest: 0.6 * 2 / 1 = 1.2, step-up brings it to 0.9
        let q = bh_fdr(&[0.6, 0.9]).unwrap();
        assert_relative_eq!(q[0], 0.9);
        assert_relative_eq!(q[1], 0.9);

        let q = bh_fdr(&[0.7, 0.8, 1.0, 0.9]).unwrap();
        assert!(q.iter().all(|&v| v <= 1.0));
        assert_eq!(q[2], 1.0);
    }

    #[test]
    fn test_all_equal() {
        assert_eq!(bh_fdr(&[1.0, 1.0, 1.0]).unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(bh_fdr(&[0.0, 0.0]).unwrap(), vec![0.0, 0.0]);
        let q = bh_fdr(&[0.2; 5]).unwrap();
        assert!(q.iter().all(|&v| v == 0.2));
    }

    #[test]
    fn test_ties_share_qvalue() {
        let q = bh_fdr(&[0.03, 0.01, 0.03, 0.5, 0.03]).unwrap();
        assert_eq!(q[0], q[2]);
        assert_eq!(q[2], q[4]);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = bh_fdr(&[0.1, 1.2, -0.1]).unwrap_err();
        assert!(matches!(err, RspError::InvalidPValue { index: 1, value } if value == 1.2));

        let err = bh_fdr(&[0.1, f64::NAN]).unwrap_err();
        assert!(matches!(err, RspError::InvalidPValue { index: 1, .. }));

        let err = bh_fdr(&[-0.0001]).unwrap_err();
        assert!(matches!(err, RspError::InvalidPValue { index: 0, .. }));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(bh_fdr(&[]).unwrap_err(), RspError::EmptyInput(_)));
    }

    #[test]
    fn test_fdr_result_helpers() {
        let result = correct(&[0.001, 0.2, 0.01, 0.8]).unwrap();
        assert_eq!(result.n_tests(), 4);
        assert_eq!(result.n_significant(0.05), 2);
        assert_eq!(result.significant_indices(0.05), vec![0, 2]);
    }
}
