use crate::sparse::CsrMatrix;
use anyhow::{Result, anyhow};
use itertools::Itertools;
use ndarray::{Array2, Axis};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Expression values, observations x variables
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Dense(Array2<f32>),
    Sparse(CsrMatrix),
}

impl Expression {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Expression::Dense(x) => x.dim(),
            Expression::Sparse(x) => x.shape(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Expression::Sparse(_))
    }

    pub fn to_dense(&self) -> Array2<f32> {
        match self {
            Expression::Dense(x) => x.clone(),
            Expression::Sparse(x) => x.to_dense(),
        }
    }

    pub fn column(&self, col: usize) -> Vec<f32> {
        match self {
            Expression::Dense(x) => x.column(col).to_vec(),
            Expression::Sparse(x) => x.column(col),
        }
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        match self {
            Expression::Dense(x) => Expression::Dense(x.select(Axis(0), rows)),
            Expression::Sparse(x) => Expression::Sparse(x.select_rows(rows)),
        }
    }
}

/// An annotated data matrix: expression values with observation and variable metadata
///
/// Observations are cells (rows of `X`), variables are genes (columns of `X`).
/// `obs` and `var` hold one row per observation / variable; their names live in
/// `obs_names` / `var_names` rather than in a table column. `obsm` holds named
/// per-observation matrices such as `X_umap`.
#[derive(Debug, Clone)]
pub struct AnnotatedMatrix {
    x: Expression,
    obs_names: Vec<String>,
    var_names: Vec<String>,
    obs: DataFrame,
    var: DataFrame,
    obsm: BTreeMap<String, Array2<f64>>,
    var_lookup: FxHashMap<String, usize>,
}

impl AnnotatedMatrix {
    /// Start building a matrix of the given shape
    ///
    /// Unset parts default to: all-zero sparse `X`, names `"0", "1", ...`, empty
    /// metadata tables and no embeddings.
    pub fn builder(n_obs: usize, n_vars: usize) -> AnnotatedMatrixBuilder {
        AnnotatedMatrixBuilder {
            n_obs,
            n_vars,
            x: None,
            obs_names: None,
            var_names: None,
            obs: DataFrame::empty(),
            var: DataFrame::empty(),
            obsm: BTreeMap::new(),
        }
    }

    pub fn new(x: Expression, obs_names: Vec<String>, var_names: Vec<String>) -> Result<Self> {
        let (n_obs, n_vars) = x.shape();
        Self::builder(n_obs, n_vars)
            .x(x)
            .obs_names(obs_names)
            .var_names(var_names)
            .build()
    }

    pub fn n_obs(&self) -> usize {
        self.obs_names.len()
    }

    pub fn n_vars(&self) -> usize {
        self.var_names.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_obs(), self.n_vars())
    }

    pub fn x(&self) -> &Expression {
        &self.x
    }

    pub fn obs_names(&self) -> &[String] {
        &self.obs_names
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    pub fn obs(&self) -> &DataFrame {
        &self.obs
    }

    pub fn var(&self) -> &DataFrame {
        &self.var
    }

    pub fn obsm(&self, key: &str) -> Option<&Array2<f64>> {
        self.obsm.get(key)
    }

    pub fn obsm_keys(&self) -> Vec<String> {
        self.obsm.keys().cloned().collect()
    }

    pub fn obsm_iter(&self) -> impl Iterator<Item = (&String, &Array2<f64>)> {
        self.obsm.iter()
    }

    /// Add or replace an embedding; it must have one row per observation
    pub fn insert_obsm(&mut self, key: impl Into<String>, embedding: Array2<f64>) -> Result<()> {
        let key = key.into();
        if embedding.nrows() != self.n_obs() {
            return Err(anyhow!(
                "obsm '{}' has {} rows, expected {}",
                key,
                embedding.nrows(),
                self.n_obs()
            ));
        }
        self.obsm.insert(key, embedding);
        Ok(())
    }

    pub fn has_obs_column(&self, name: &str) -> bool {
        self.obs.column(name).is_ok()
    }

    /// An `obs` column rendered as strings; nulls become empty strings
    pub fn obs_column_strings(&self, name: &str) -> Result<Vec<String>> {
        let column = self.obs.column(name).map_err(|_| {
            anyhow!(
                "obs column '{}' not found (available: {})",
                name,
                self.obs.get_column_names().iter().join(", ")
            )
        })?;
        let strings = column
            .cast(&DataType::String)
            .map_err(|e| anyhow!("Failed to cast obs column '{}' to strings: {}", name, e))?;
        let values = strings
            .str()
            .map_err(|e| anyhow!("obs column '{}' is not a string column: {}", name, e))?
            .into_iter()
            .map(|value| value.unwrap_or_default().to_string())
            .collect();
        Ok(values)
    }

    /// Position of a variable by name
    pub fn var_index(&self, gene: &str) -> Option<usize> {
        self.var_lookup.get(gene).copied()
    }

    /// Expression of one variable across all observations
    pub fn expression(&self, gene: &str) -> Result<Vec<f32>> {
        let col = self
            .var_index(gene)
            .ok_or_else(|| anyhow!("Variable not found: {}", gene))?;
        Ok(self.x.column(col))
    }

    /// Keep the observations where `mask` is `true`
    pub fn subset_obs(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.n_obs() {
            return Err(anyhow!(
                "Mask length {} doesn't match observation count {}",
                mask.len(),
                self.n_obs()
            ));
        }
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();

        let obs = if self.obs.width() == 0 {
            DataFrame::empty()
        } else {
            let mask = BooleanChunked::from_slice("mask".into(), mask);
            self.obs
                .filter(&mask)
                .map_err(|e| anyhow!("Failed to filter obs table: {}", e))?
        };

        Ok(Self {
            x: self.x.select_rows(&rows),
            obs_names: rows.iter().map(|&i| self.obs_names[i].clone()).collect(),
            var_names: self.var_names.clone(),
            obs,
            var: self.var.clone(),
            obsm: self
                .obsm
                .iter()
                .map(|(k, v)| (k.clone(), v.select(Axis(0), &rows)))
                .collect(),
            var_lookup: self.var_lookup.clone(),
        })
    }

    pub fn to_dense(mut self) -> Self {
        if let Expression::Sparse(csr) = &self.x {
            self.x = Expression::Dense(csr.to_dense());
        }
        self
    }

    pub fn to_sparse(mut self) -> Self {
        if let Expression::Dense(dense) = &self.x {
            self.x = Expression::Sparse(CsrMatrix::from_dense(dense));
        }
        self
    }
}

/// Builder for [`AnnotatedMatrix`]; every part is checked against the declared shape
#[derive(Debug, Clone)]
pub struct AnnotatedMatrixBuilder {
    n_obs: usize,
    n_vars: usize,
    x: Option<Expression>,
    obs_names: Option<Vec<String>>,
    var_names: Option<Vec<String>>,
    obs: DataFrame,
    var: DataFrame,
    obsm: BTreeMap<String, Array2<f64>>,
}

impl AnnotatedMatrixBuilder {
    pub fn x(mut self, x: Expression) -> Self {
        self.x = Some(x);
        self
    }

    pub fn obs_names(mut self, names: Vec<String>) -> Self {
        self.obs_names = Some(names);
        self
    }

    pub fn var_names(mut self, names: Vec<String>) -> Self {
        self.var_names = Some(names);
        self
    }

    pub fn obs(mut self, obs: DataFrame) -> Self {
        self.obs = obs;
        self
    }

    pub fn var(mut self, var: DataFrame) -> Self {
        self.var = var;
        self
    }

    pub fn obsm(mut self, key: impl Into<String>, embedding: Array2<f64>) -> Self {
        self.obsm.insert(key.into(), embedding);
        self
    }

    pub fn build(self) -> Result<AnnotatedMatrix> {
        let (n_obs, n_vars) = (self.n_obs, self.n_vars);

        let x = self
            .x
            .unwrap_or_else(|| Expression::Sparse(CsrMatrix::zeros(n_obs, n_vars)));
        if x.shape() != (n_obs, n_vars) {
            return Err(anyhow!(
                "X has shape {:?}, expected ({}, {})",
                x.shape(),
                n_obs,
                n_vars
            ));
        }

        let obs_names = self
            .obs_names
            .unwrap_or_else(|| (0..n_obs).map(|i| i.to_string()).collect());
        let var_names = self
            .var_names
            .unwrap_or_else(|| (0..n_vars).map(|i| i.to_string()).collect());
        check_len("obs_names", obs_names.len(), n_obs)?;
        check_len("var_names", var_names.len(), n_vars)?;

        if self.obs.width() > 0 {
            check_len("obs table", self.obs.height(), n_obs)?;
        }
        if self.var.width() > 0 {
            check_len("var table", self.var.height(), n_vars)?;
        }
        for (key, embedding) in &self.obsm {
            check_len(&format!("obsm '{}'", key), embedding.nrows(), n_obs)?;
        }

        let mut var_lookup = FxHashMap::default();
        for (i, name) in var_names.iter().enumerate() {
            if var_lookup.insert(name.clone(), i).is_some() {
                tracing::warn!("Duplicate variable name '{}'; lookups use the last one", name);
            }
        }

        Ok(AnnotatedMatrix {
            x,
            obs_names,
            var_names,
            obs: self.obs,
            var: self.var,
            obsm: self.obsm,
            var_lookup,
        })
    }
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(anyhow!("{} has {} rows, expected {}", what, actual, expected));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> AnnotatedMatrix {
        let x = array![[1.0f32, 0.0], [0.0, 2.0], [3.0, 0.0]];
        AnnotatedMatrix::builder(3, 2)
            .x(Expression::Dense(x))
            .obs_names(vec!["c1".into(), "c2".into(), "c3".into()])
            .var_names(vec!["CD3E".into(), "MS4A1".into()])
            .obs(df!("cell_type" => ["T", "B", "T"], "n_genes" => [10i64, 20, 30]).unwrap())
            .obsm("X_umap", array![[0.0, 1.0], [1.0, 0.0], [2.0, 2.0]])
            .build()
            .unwrap()
    }

    #[test]
    fn test_accessors() {
        let adata = sample();
        assert_eq!(adata.shape(), (3, 2));
        assert_eq!(adata.obsm_keys(), vec!["X_umap".to_string()]);
        assert_eq!(adata.expression("MS4A1").unwrap(), vec![0.0, 2.0, 0.0]);
        assert!(adata.expression("GAPDH").is_err());
        assert_eq!(adata.obs_column_strings("n_genes").unwrap(), vec!["10", "20", "30"]);
        assert!(adata.obs_column_strings("batch").is_err());
    }

    #[test]
    fn test_default_parts() {
        let adata = AnnotatedMatrix::builder(2, 3).build().unwrap();
        assert!(adata.x().is_sparse());
        assert_eq!(adata.obs_names(), &["0", "1"]);
        assert_eq!(adata.var_names().len(), 3);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let result = AnnotatedMatrix::builder(2, 2)
            .obsm("X_umap", Array2::zeros((3, 2)))
            .build();
        assert!(result.is_err());

        let result = AnnotatedMatrix::builder(2, 2)
            .obs(df!("a" => [1, 2, 3]).unwrap())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_subset_obs() {
        let subset = sample().subset_obs(&[true, false, true]).unwrap();
        assert_eq!(subset.obs_names(), &["c1", "c3"]);
        assert_eq!(subset.obs_column_strings("cell_type").unwrap(), vec!["T", "T"]);
        assert_eq!(subset.obsm("X_umap").unwrap(), &array![[0.0, 1.0], [2.0, 2.0]]);
        assert_eq!(subset.expression("CD3E").unwrap(), vec![1.0, 3.0]);
        assert!(sample().subset_obs(&[true]).is_err());
    }

    #[test]
    fn test_dense_sparse_conversion() {
        let dense = sample();
        let before = dense.x().to_dense();
        let sparse = dense.to_sparse();
        assert!(sparse.x().is_sparse());
        let back = sparse.to_dense();
        assert_eq!(back.x().to_dense(), before);
    }
}
