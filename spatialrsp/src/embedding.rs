use crate::error::{Result, RspError};
use crate::transform::{PolarCoords, cartesian_to_polar};
use ndarray::{Array2, ArrayView2, Axis, s};
use serde::Serialize;
use std::collections::BTreeMap;

/// Access to 2D embeddings and per-observation labels
///
/// Implement this on an annotated-matrix type to run RSP analyses on it directly.
/// With the default `anndata` feature it is implemented for
/// `rsp_anndata::AnnotatedMatrix`; [`PointTable`] is a minimal in-memory implementation.
///
/// # Example Implementation
///
/// ```rust
/// use ndarray::Array2;
/// use spatialrsp::{EmbeddingData, Result, RspError};
///
/// struct Cells {
///     umap: Array2<f64>,
///     cell_type: Vec<String>,
/// }
///
/// impl EmbeddingData for Cells {
///     fn n_obs(&self) -> usize {
///         self.umap.nrows()
///     }
///
///     fn embedding_keys(&self) -> Vec<String> {
///         vec!["X_umap".to_string()]
///     }
///
///     fn embedding_2d(&self, key: &str) -> Result<Array2<f64>> {
///         if key != "X_umap" {
///             return Err(RspError::EmbeddingNotFound(key.to_string()));
///         }
///         Ok(self.umap.clone())
///     }
///
///     fn obs_labels(&self, column: &str) -> Result<Vec<String>> {
///         match column {
///             "cell_type" => Ok(self.cell_type.clone()),
///             _ => Err(RspError::LabelNotFound(column.to_string())),
///         }
///     }
/// }
/// ```
pub trait EmbeddingData {
    fn n_obs(&self) -> usize;
    fn embedding_keys(&self) -> Vec<String>;

    /// First two dimensions of the embedding stored under `key`, one row per observation
    fn embedding_2d(&self, key: &str) -> Result<Array2<f64>>;

    /// String form of an observation metadata column
    fn obs_labels(&self, column: &str) -> Result<Vec<String>>;
}

/// First two columns of an embedding matrix as an owned `n x 2` array
pub fn first_two_dims(embedding: ArrayView2<'_, f64>, key: &str) -> Result<Array2<f64>> {
    if embedding.ncols() < 2 {
        return Err(RspError::dimension(
            format!("embedding '{}' columns", key),
            2,
            embedding.ncols(),
        ));
    }
    Ok(embedding.slice(s![.., ..2]).to_owned())
}

/// In-memory coordinates with optional label columns
#[derive(Debug, Clone)]
pub struct PointTable {
    key: String,
    coords: Array2<f64>,
    labels: BTreeMap<String, Vec<String>>,
}

impl PointTable {
    pub fn new(key: impl Into<String>, coords: Array2<f64>) -> Result<Self> {
        let key = key.into();
        if coords.ncols() < 2 {
            return Err(RspError::dimension(
                format!("embedding '{}' columns", key),
                2,
                coords.ncols(),
            ));
        }
        Ok(Self {
            key,
            coords,
            labels: BTreeMap::new(),
        })
    }

    pub fn from_points(key: impl Into<String>, points: &[[f64; 2]]) -> Result<Self> {
        let coords = Array2::from_shape_vec((points.len(), 2), points.as_flattened().to_vec())
            .map_err(|e| RspError::DataError(format!("Failed to build coordinates: {}", e)))?;
        Self::new(key, coords)
    }

    /// Attach a label column; its length must match the number of points
    pub fn with_labels(mut self, column: impl Into<String>, labels: Vec<String>) -> Result<Self> {
        let column = column.into();
        if labels.len() != self.coords.nrows() {
            return Err(RspError::dimension(
                format!("label column '{}'", column),
                self.coords.nrows(),
                labels.len(),
            ));
        }
        self.labels.insert(column, labels);
        Ok(self)
    }
}

impl EmbeddingData for PointTable {
    fn n_obs(&self) -> usize {
        self.coords.nrows()
    }

    fn embedding_keys(&self) -> Vec<String> {
        vec![self.key.clone()]
    }

    fn embedding_2d(&self, key: &str) -> Result<Array2<f64>> {
        if key != self.key {
            return Err(RspError::EmbeddingNotFound(key.to_string()));
        }
        first_two_dims(self.coords.view(), key)
    }

    fn obs_labels(&self, column: &str) -> Result<Vec<String>> {
        self.labels
            .get(column)
            .cloned()
            .ok_or_else(|| RspError::LabelNotFound(column.to_string()))
    }
}

/// Coordinates and polar angles of one dataset around a vantage point
#[derive(Debug, Clone, Serialize)]
pub struct StateEmbedding {
    pub coords: Array2<f64>,
    pub polar: PolarCoords,
}

/// Extract 2D coordinates and polar coordinates for several datasets at once
///
/// Each dataset is keyed by its state name (e.g. a condition or disease state); the
/// result is ordered by state name.
pub fn load_coords_and_angles<S, D>(
    datasets: &[(S, &D)],
    vantage: [f64; 2],
    key: &str,
) -> Result<BTreeMap<String, StateEmbedding>>
where
    S: AsRef<str>,
    D: EmbeddingData + ?Sized,
{
    let mut states = BTreeMap::new();
    for (state, data) in datasets {
        let coords = data.embedding_2d(key)?;
        let polar = cartesian_to_polar(coords.view(), &vantage)?;
        tracing::debug!(
            "state '{}': {} observations from '{}'",
            state.as_ref(),
            polar.len(),
            key
        );
        states.insert(state.as_ref().to_string(), StateEmbedding { coords, polar });
    }
    Ok(states)
}

/// Coordinates of the observations carrying each requested label, in request order
///
/// # Errors
/// * [`RspError::LabelNotFound`] if the column is missing
/// * [`RspError::EmptyInput`] if a requested label matches no observation
pub fn split_by_label<D, S>(
    data: &D,
    key: &str,
    column: &str,
    labels: &[S],
) -> Result<Vec<(String, Array2<f64>)>>
where
    D: EmbeddingData + ?Sized,
    S: AsRef<str>,
{
    let coords = data.embedding_2d(key)?;
    let obs_labels = data.obs_labels(column)?;
    if obs_labels.len() != coords.nrows() {
        return Err(RspError::dimension(
            format!("label column '{}'", column),
            coords.nrows(),
            obs_labels.len(),
        ));
    }

    labels
        .iter()
        .map(|label| {
            let label = label.as_ref();
            let rows: Vec<usize> = obs_labels
                .iter()
                .enumerate()
                .filter(|&(_, l)| l == label)
                .map(|(i, _)| i)
                .collect();
            if rows.is_empty() {
                return Err(RspError::empty(format!(
                    "no observations with {} = '{}'",
                    column, label
                )));
            }
            Ok((label.to_string(), coords.select(Axis(0), &rows)))
        })
        .collect()
}

/// Mean of an `n x 2` point set, the default vantage point
pub fn centroid(points: ArrayView2<'_, f64>) -> Result<[f64; 2]> {
    if points.ncols() != 2 {
        return Err(RspError::dimension("point set columns", 2, points.ncols()));
    }
    let mean = points
        .mean_axis(Axis(0))
        .ok_or_else(|| RspError::empty("cannot take the centroid of an empty point set"))?;
    Ok([mean[0], mean[1]])
}
