//! Radial spatial profile (RSP) analysis for single-cell embeddings
//!
//! This crate implements the angular statistics behind RSP curves and the
//! multiple-testing correction applied to them. It works with any data
//! structure that implements [`EmbeddingData`].
//!
//! # Quick Start
//!
//! ```no_run
//! use spatialrsp::{RspConfig, RspMode, angles_from_points, bh_fdr, compute_rsp};
//!
//! let background = [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
//! let foreground = [[1.0, 0.1], [0.9, -0.1]];
//!
//! let bg_angles = angles_from_points(&background, [0.0, 0.0])?;
//! let fg_angles = angles_from_points(&foreground, [0.0, 0.0])?;
//!
//! let config = RspConfig {
//!     resolution: 180,
//!     mode: RspMode::Absolute,
//!     ..Default::default()
//! };
//! let curves = compute_rsp(&bg_angles, &[("cluster 1", fg_angles)], &config)?;
//! for (label, rmsd) in curves.rmsd_against_expected()? {
//!     println!("{label}: RMSD {rmsd:.3}");
//! }
//!
//! let q = bh_fdr(&[0.01, 0.04, 0.03, 0.005])?;
//! assert_eq!(q.len(), 4);
//! # Ok::<(), spatialrsp::RspError>(())
//! ```
//!
//! # Annotated matrices
//!
//! With the default `anndata` feature, `rsp_anndata::AnnotatedMatrix` implements
//! [`EmbeddingData`], so a dataset loaded from `.h5ad` or CSV can be split by a
//! metadata column and analysed directly:
//!
//! ```rust,no_run
//! use rsp_anndata::{LoadOptions, load_data};
//! use spatialrsp::{
//!     EmbeddingData, RspConfig, angular_significance, cartesian_to_polar, centroid,
//!     compute_rsp, split_by_label,
//! };
//!
//! let adata = load_data("data/kpmp_sn.h5ad", &LoadOptions::default())?;
//! let umap = adata.embedding_2d("X_umap")?;
//! let vantage = centroid(umap.view())?;
//!
//! let background = cartesian_to_polar(umap.view(), &vantage)?.angles;
//! let groups = split_by_label(&adata, "X_umap", "cell_type", &["podocyte"])?;
//! let foregrounds = groups
//!     .iter()
//!     .map(|(label, coords)| Ok((label.clone(), cartesian_to_polar(coords.view(), &vantage)?.angles)))
//!     .collect::<spatialrsp::Result<Vec<_>>>()?;
//!
//! let config = RspConfig::default();
//! let curves = compute_rsp(&background, &foregrounds, &config)?;
//! let significance = angular_significance(&background, &foregrounds[0].1, &config)?;
//! println!("{} angles enriched", significance.n_significant(0.05));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod embedding;
pub mod error;
pub mod rsp;
pub mod stats;
pub mod transform;

pub use embedding::{
    EmbeddingData, PointTable, StateEmbedding, centroid, first_two_dims,
    load_coords_and_angles, split_by_label,
};
pub use error::{Result, RspError};
pub use rsp::{ForegroundCurve, RspConfig, RspCurves, RspMode, angle_grid, compute_rsp};
pub use stats::{
    FdrResult, angular_pvalues, angular_significance, bh_fdr, binomial_two_sided,
    compute_rmsd, correct, coverage,
};
pub use transform::{PolarCoords, angles_from_points, cartesian_to_polar, polar_from_points};

#[cfg(feature = "anndata")]
mod anndata_impl {
    use super::*;
    use ndarray::Array2;
    use rsp_anndata::AnnotatedMatrix;

    impl EmbeddingData for AnnotatedMatrix {
        fn n_obs(&self) -> usize {
            AnnotatedMatrix::n_obs(self)
        }

        fn embedding_keys(&self) -> Vec<String> {
            self.obsm_keys()
        }

        fn embedding_2d(&self, key: &str) -> Result<Array2<f64>> {
            let embedding = self
                .obsm(key)
                .ok_or_else(|| RspError::EmbeddingNotFound(key.to_string()))?;
            first_two_dims(embedding.view(), key)
        }

        fn obs_labels(&self, column: &str) -> Result<Vec<String>> {
            if !self.has_obs_column(column) {
                return Err(RspError::LabelNotFound(column.to_string()));
            }
            self.obs_column_strings(column)
                .map_err(|e| RspError::DataError(format!("{:#}", e)))
        }
    }

}
