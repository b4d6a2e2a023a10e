//! `.h5ad` reader and writer
//!
//! Layout: `X` is a dense dataset or a `csr_matrix`/`csc_matrix` group, `obs` and
//! `var` are dataframe groups (one dataset per column plus an index dataset), and
//! `obsm` is a group of per-observation matrices. `varm`, `layers` and `uns` are
//! not read.
//!
//! Requires the `h5ad` feature and a system HDF5 library.

use crate::io::Compression;
use crate::matrix::{AnnotatedMatrix, Expression};
use crate::sparse::CsrMatrix;
use anyhow::{Context, Result, anyhow};
use hdf5::types::{VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File, Group, H5Type};
use ndarray::{Array, Array1, Dimension};
use polars::prelude::*;
use std::path::Path;
use std::str::FromStr;

fn h5err(e: hdf5::Error) -> anyhow::Error {
    anyhow!("HDF5 error: {}", e)
}

/// Write a string scalar attribute on a group or dataset.
/// Group and Dataset reach `new_attr` through different Deref chains, hence the macro.
macro_rules! write_attr_str {
    ($loc:expr, $key:expr, $val:expr) => {{
        VarLenUnicode::from_str($val)
            .map_err(|e| anyhow!("Invalid attribute value '{}': {}", $val, e))
            .and_then(|s| {
                $loc.new_attr::<VarLenUnicode>()
                    .create($key)
                    .and_then(|attr| attr.write_scalar(&s))
                    .map_err(h5err)
            })
    }};
}

/// Read an `.h5ad` file
pub fn read_h5ad(path: impl AsRef<Path>) -> Result<AnnotatedMatrix> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(h5err)
        .with_context(|| format!("Cannot open h5ad file {}", path.display()))?;

    let x = read_x(&file)?;
    let (n_obs, n_vars) = x.shape();
    tracing::debug!("X: {} x {} ({})", n_obs, n_vars, if x.is_sparse() { "sparse" } else { "dense" });

    let (obs_names, obs) = read_dataframe(&file, "obs", n_obs)?;
    let (var_names, var) = read_dataframe(&file, "var", n_vars)?;

    let mut builder = AnnotatedMatrix::builder(n_obs, n_vars)
        .x(x)
        .obs_names(obs_names)
        .var_names(var_names)
        .obs(obs)
        .var(var);

    if file.link_exists("obsm") {
        let group = file.group("obsm").map_err(h5err)?;
        for name in group.member_names().map_err(h5err)? {
            match group.dataset(&name).and_then(|ds| ds.read_2d::<f64>()) {
                Ok(embedding) => builder = builder.obsm(name, embedding),
                Err(e) => tracing::debug!("Skipping obsm '{}': {}", name, e),
            }
        }
    }

    let matrix = builder.build()?;
    tracing::info!(
        "Read {} observations x {} variables, obsm keys [{}]",
        matrix.n_obs(),
        matrix.n_vars(),
        matrix.obsm_keys().join(", ")
    );
    Ok(matrix)
}

/// Write an `.h5ad` file
///
/// `X` and `obsm` datasets are compressed; metadata columns are written as plain
/// string or float arrays.
pub fn write_h5ad(
    matrix: &AnnotatedMatrix,
    path: impl AsRef<Path>,
    compression: Compression,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(h5err)
        .with_context(|| format!("Cannot create h5ad file {}", path.display()))?;
    write_attr_str!(file, "encoding-type", "anndata")?;
    write_attr_str!(file, "encoding-version", "0.1.0")?;

    write_x(&file, matrix.x(), compression)?;
    write_dataframe(&file, "obs", matrix.obs_names(), matrix.obs())?;
    write_dataframe(&file, "var", matrix.var_names(), matrix.var())?;

    let obsm = file.create_group("obsm").map_err(h5err)?;
    write_attr_str!(obsm, "encoding-type", "dict")?;
    write_attr_str!(obsm, "encoding-version", "0.1.0")?;
    for (key, embedding) in matrix.obsm_iter() {
        let ds = write_array(&obsm, key, embedding, compression)?;
        write_attr_str!(ds, "encoding-type", "array")?;
        write_attr_str!(ds, "encoding-version", "0.2.0")?;
    }

    Ok(())
}

fn read_encoding_type(loc: &hdf5::Location) -> Option<String> {
    loc.attr("encoding-type")
        .ok()
        .and_then(|a| a.read_scalar::<VarLenUnicode>().ok())
        .map(|s| s.as_str().to_string())
}

fn read_x(file: &File) -> Result<Expression> {
    if let Ok(ds) = file.dataset("X") {
        let dense = ds.read_2d::<f32>().map_err(h5err)?;
        return Ok(Expression::Dense(dense));
    }

    let group = file
        .group("X")
        .map_err(|_| anyhow!("no X dataset or group found"))?;
    let encoding = read_encoding_type(&group);

    let data = group
        .dataset("data")
        .and_then(|ds| ds.read_raw::<f32>())
        .map_err(h5err)?;
    let indices = read_usize(&group, "indices")?;
    let indptr = read_usize(&group, "indptr")?;
    let shape = group
        .attr("shape")
        .and_then(|a| a.read_raw::<i64>())
        .map_err(h5err)?;
    if shape.len() != 2 || shape.iter().any(|&d| d < 0) {
        return Err(anyhow!("invalid sparse X shape attribute {:?}", shape));
    }
    let (n_rows, n_cols) = (shape[0] as usize, shape[1] as usize);

    let csr = match encoding.as_deref() {
        Some("csr_matrix") | None => CsrMatrix::from_csr(n_rows, n_cols, indptr, indices, data)?,
        Some("csc_matrix") => CsrMatrix::from_csc(n_rows, n_cols, &indptr, &indices, &data)?,
        Some(other) => return Err(anyhow!("unsupported X encoding-type: {}", other)),
    };
    Ok(Expression::Sparse(csr))
}

fn read_usize(group: &Group, name: &str) -> Result<Vec<usize>> {
    let raw = group
        .dataset(name)
        .and_then(|ds| ds.read_raw::<i64>())
        .map_err(h5err)?;
    raw.into_iter()
        .map(|v| usize::try_from(v).map_err(|_| anyhow!("negative value {} in {}", v, name)))
        .collect()
}

fn read_strings(ds: &Dataset) -> Result<Vec<String>> {
    if let Ok(values) = ds.read_raw::<VarLenUnicode>() {
        return Ok(values.iter().map(|s| s.as_str().to_string()).collect());
    }
    ds.read_raw::<VarLenAscii>()
        .map(|values| values.iter().map(|s| s.as_str().to_string()).collect())
        .map_err(h5err)
}

fn read_string_attr_array(group: &Group, name: &str) -> Option<Vec<String>> {
    let attr = group.attr(name).ok()?;
    if let Ok(values) = attr.read_raw::<VarLenUnicode>() {
        return Some(values.iter().map(|s| s.as_str().to_string()).collect());
    }
    attr.read_scalar::<VarLenUnicode>()
        .ok()
        .map(|s| vec![s.as_str().to_string()])
}

/// Names and metadata columns of an `obs`/`var` dataframe group
fn read_dataframe(file: &File, name: &str, expected: usize) -> Result<(Vec<String>, DataFrame)> {
    let default_names = || (0..expected).map(|i| i.to_string()).collect::<Vec<_>>();
    if !file.link_exists(name) {
        return Ok((default_names(), DataFrame::empty()));
    }
    let group = file.group(name).map_err(h5err)?;

    let index_name = read_string_attr_array(&group, "_index")
        .and_then(|names| names.into_iter().next())
        .unwrap_or_else(|| "_index".to_string());
    let names = match group.dataset(&index_name) {
        Ok(ds) => read_strings(&ds)?,
        Err(_) => default_names(),
    };

    let order = read_string_attr_array(&group, "column-order").unwrap_or_else(|| {
        group
            .member_names()
            .unwrap_or_default()
            .into_iter()
            .filter(|member| member != &index_name && member != "__categories")
            .collect()
    });

    let mut columns = Vec::with_capacity(order.len());
    for column in order.iter().filter(|c| !c.is_empty()) {
        match read_column(&group, column) {
            Ok(Some(series)) if series.len() == expected => columns.push(series.into_column()),
            Ok(Some(series)) => tracing::warn!(
                "Skipping {} column '{}': {} values, expected {}",
                name,
                column,
                series.len(),
                expected
            ),
            Ok(None) => tracing::debug!("Skipping {} column '{}': unsupported encoding", name, column),
            Err(e) => tracing::debug!("Skipping {} column '{}': {:#}", name, column, e),
        }
    }

    let df = if columns.is_empty() {
        DataFrame::empty()
    } else {
        DataFrame::new(columns).map_err(|e| anyhow!("Failed to assemble {} table: {}", name, e))?
    };
    Ok((names, df))
}

fn decode_categorical(codes: Vec<i64>, categories: &[String], name: &str) -> Series {
    let values: Vec<Option<String>> = codes
        .into_iter()
        .map(|code| {
            usize::try_from(code)
                .ok()
                .and_then(|i| categories.get(i).cloned())
        })
        .collect();
    Series::new(name.into(), values)
}

fn read_column(group: &Group, name: &str) -> Result<Option<Series>> {
    if let Ok(sub) = group.group(name) {
        // anndata >= 0.8 categorical: {categories, codes}
        if read_encoding_type(&sub).as_deref() != Some("categorical") {
            return Ok(None);
        }
        let categories = read_strings(&sub.dataset("categories").map_err(h5err)?)?;
        let codes = sub
            .dataset("codes")
            .and_then(|ds| ds.read_raw::<i64>())
            .map_err(h5err)?;
        return Ok(Some(decode_categorical(codes, &categories, name)));
    }

    let ds = group.dataset(name).map_err(h5err)?;

    // legacy categorical: codes here, categories under __categories/<name>
    if let Ok(legacy) = group.group("__categories")
        && let Ok(cats) = legacy.dataset(name)
    {
        let categories = read_strings(&cats)?;
        let codes = ds.read_raw::<i64>().map_err(h5err)?;
        return Ok(Some(decode_categorical(codes, &categories, name)));
    }

    if let Ok(strings) = read_strings(&ds) {
        return Ok(Some(Series::new(name.into(), strings)));
    }
    if let Ok(values) = ds.read_raw::<f64>() {
        return Ok(Some(Series::new(name.into(), values)));
    }
    if let Ok(values) = ds.read_raw::<bool>() {
        return Ok(Some(Series::new(name.into(), values)));
    }
    Ok(None)
}

fn to_varlen(values: &[String]) -> Result<Array1<VarLenUnicode>> {
    values
        .iter()
        .map(|s| {
            VarLenUnicode::from_str(s).map_err(|e| anyhow!("Invalid string '{}': {}", s, e))
        })
        .collect::<Result<Vec<_>>>()
        .map(Array1::from)
}

fn write_array<T: H5Type, D: Dimension>(
    group: &Group,
    name: &str,
    data: &Array<T, D>,
    compression: Compression,
) -> Result<Dataset> {
    let builder = group.new_dataset_builder().with_data(data);
    // empty datasets cannot be chunked, so they are never filtered
    let builder = match compression {
        _ if data.is_empty() => builder,
        Compression::Lzf => builder.lzf(),
        Compression::Gzip(level) => builder.deflate(level),
        Compression::None => builder,
    };
    builder.create(name).map_err(h5err)
}

fn write_x(file: &File, x: &Expression, compression: Compression) -> Result<()> {
    match x {
        Expression::Dense(dense) => {
            let ds = write_array(file, "X", dense, compression)?;
            write_attr_str!(ds, "encoding-type", "array")?;
            write_attr_str!(ds, "encoding-version", "0.2.0")?;
        }
        Expression::Sparse(csr) => {
            let (n_rows, n_cols) = csr.shape();
            let group = file.create_group("X").map_err(h5err)?;
            write_attr_str!(group, "encoding-type", "csr_matrix")?;
            write_attr_str!(group, "encoding-version", "0.1.0")?;
            group
                .new_attr_builder()
                .with_data(&ndarray::arr1(&[n_rows as i64, n_cols as i64]))
                .create("shape")
                .map_err(h5err)?;

            let data = Array1::from(csr.data().to_vec());
            let indices: Array1<i64> = csr.indices().iter().map(|&v| v as i64).collect();
            let indptr: Array1<i64> = csr.indptr().iter().map(|&v| v as i64).collect();
            write_array(&group, "data", &data, compression)?;
            write_array(&group, "indices", &indices, compression)?;
            write_array(&group, "indptr", &indptr, Compression::None)?;
        }
    }
    Ok(())
}

fn write_dataframe(file: &File, name: &str, index: &[String], df: &DataFrame) -> Result<()> {
    let group = file.create_group(name).map_err(h5err)?;
    write_attr_str!(group, "encoding-type", "dataframe")?;
    write_attr_str!(group, "encoding-version", "0.2.0")?;
    write_attr_str!(group, "_index", "_index")?;

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    group
        .new_attr_builder()
        .with_data(&to_varlen(&column_names)?)
        .create("column-order")
        .map_err(h5err)?;

    let ds = group
        .new_dataset_builder()
        .with_data(&to_varlen(index)?)
        .create("_index")
        .map_err(h5err)?;
    write_attr_str!(ds, "encoding-type", "string-array")?;
    write_attr_str!(ds, "encoding-version", "0.2.0")?;

    for column in df.get_columns() {
        let column_name = column.name().to_string();
        if column.dtype().is_primitive_numeric() || column.dtype().is_bool() {
            let values: Array1<f64> = column
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            let ds = group
                .new_dataset_builder()
                .with_data(&values)
                .create(column_name.as_str())
                .map_err(h5err)?;
            write_attr_str!(ds, "encoding-type", "array")?;
            write_attr_str!(ds, "encoding-version", "0.2.0")?;
        } else {
            let values: Vec<String> = column
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|v| v.unwrap_or_default().to_string())
                .collect();
            let ds = group
                .new_dataset_builder()
                .with_data(&to_varlen(&values)?)
                .create(column_name.as_str())
                .map_err(h5err)?;
            write_attr_str!(ds, "encoding-type", "string-array")?;
            write_attr_str!(ds, "encoding-version", "0.2.0")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn temp_path() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.h5ad");
        (dir, path)
    }

    fn sample(sparse: bool) -> AnnotatedMatrix {
        let x = array![[1.0f32, 0.0, 2.0], [0.0, 3.0, 0.0]];
        let x = if sparse {
            Expression::Sparse(CsrMatrix::from_dense(&x))
        } else {
            Expression::Dense(x)
        };
        AnnotatedMatrix::builder(2, 3)
            .x(x)
            .obs_names(vec!["c1".into(), "c2".into()])
            .var_names(vec!["g1".into(), "g2".into(), "g3".into()])
            .obs(df!("cell_type" => ["T", "B"], "score" => [0.5, 1.5]).unwrap())
            .obsm("X_umap", array![[0.0, 1.0], [2.0, 3.0]])
            .build()
            .unwrap()
    }

    #[test]
    fn test_round_trip_sparse_lzf() {
        let (_dir, path) = temp_path();
        write_h5ad(&sample(true), &path, Compression::Lzf).unwrap();

        let loaded = read_h5ad(&path).unwrap();
        assert_eq!(loaded.shape(), (2, 3));
        assert!(loaded.x().is_sparse());
        assert_eq!(loaded.obs_names(), &["c1", "c2"]);
        assert_eq!(loaded.var_names(), &["g1", "g2", "g3"]);
        assert_eq!(loaded.expression("g3").unwrap(), vec![2.0, 0.0]);
        assert_eq!(loaded.obs_column_strings("cell_type").unwrap(), vec!["T", "B"]);
        assert_eq!(loaded.obsm("X_umap").unwrap(), &array![[0.0, 1.0], [2.0, 3.0]]);
    }

    #[test]
    fn test_round_trip_dense_gzip() {
        let (_dir, path) = temp_path();
        write_h5ad(&sample(false), &path, Compression::Gzip(6)).unwrap();

        let loaded = read_h5ad(&path).unwrap();
        assert!(!loaded.x().is_sparse());
        assert_eq!(loaded.x().to_dense()[[1, 1]], 3.0);
        assert_eq!(loaded.obs_column_strings("score").unwrap(), vec!["0.5", "1.5"]);
    }

    #[test]
    fn test_missing_file() {
        assert!(read_h5ad("/nonexistent/file.h5ad").is_err());
    }
}
