use crate::error::{Result, RspError};

fn check_aligned(curve: &[f64], reference: &[f64]) -> Result<()> {
    if curve.is_empty() {
        return Err(RspError::empty("curve has no values"));
    }
    if curve.len() != reference.len() {
        return Err(RspError::dimension(
            "reference curve length",
            curve.len(),
            reference.len(),
        ));
    }
    Ok(())
}

/// Root-mean-square deviation between two curves sampled on the same angle grid
///
/// RMSD = sqrt(mean((curve - reference)^2))
pub fn compute_rmsd(curve: &[f64], reference: &[f64]) -> Result<f64> {
    check_aligned(curve, reference)?;

    let sum_sq: f64 = curve
        .iter()
        .zip(reference)
        .map(|(a, b)| (a - b).powi(2))
        .sum();

    Ok((sum_sq / curve.len() as f64).sqrt())
}

/// Fraction of grid angles where `curve` lies strictly above `reference`
pub fn coverage(curve: &[f64], reference: &[f64]) -> Result<f64> {
    check_aligned(curve, reference)?;

    let above = curve
        .iter()
        .zip(reference)
        .filter(|&(a, b)| a > b)
        .count();

    Ok(above as f64 / curve.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rmsd_identical_is_zero() {
        let curve = vec![0.1, 0.5, 0.2];
        assert_eq!(compute_rmsd(&curve, &curve).unwrap(), 0.0);
    }

    #[test]
    fn test_rmsd_known_value() {
        // differences 1, -1, 1, -1 -> mean square 1
        let rmsd = compute_rmsd(&[1.0, 0.0, 1.0, 0.0], &[0.0, 1.0, 0.0, 1.0]).unwrap();
        assert_relative_eq!(rmsd, 1.0);

        let rmsd = compute_rmsd(&[3.0, 0.0], &[0.0, 0.0]).unwrap();
        assert_relative_eq!(rmsd, (4.5f64).sqrt());
    }

    #[test]
    fn test_rmsd_length_mismatch() {
        let err = compute_rmsd(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, RspError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_coverage() {
        let cov = coverage(&[0.2, 0.1, 0.5, 0.5], &[0.1, 0.1, 0.4, 0.6]).unwrap();
        assert_relative_eq!(cov, 0.5);
        assert!(coverage(&[], &[]).is_err());
    }
}
