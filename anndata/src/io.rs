use crate::matrix::{AnnotatedMatrix, Expression};
use crate::sparse::CsrMatrix;
use anyhow::{Context, Result, anyhow};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Options for [`load_data`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Field separator of delimited text input
    pub sep: u8,
    /// Column holding the variable (gene) names
    pub index_col: usize,
    /// Store `X` in CSR form
    pub sparse_output: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sep: b'\t',
            index_col: 0,
            sparse_output: true,
        }
    }
}

/// Options for [`load_cell_table`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableOptions {
    pub sep: u8,
    pub x_column: String,
    pub y_column: String,
    /// `obsm` key the coordinates are stored under
    pub key: String,
    /// Column to use as observation names; row numbers when unset
    pub index_column: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            sep: b',',
            x_column: "x".to_string(),
            y_column: "y".to_string(),
            key: "spatial".to_string(),
            index_column: None,
        }
    }
}

/// HDF5 dataset compression used by [`save_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    #[default]
    Lzf,
    /// Deflate with a level in `0..=9`
    Gzip(u8),
    None,
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    /// Accepts `lzf`, `gzip`, `gzip:<level>` and `none`
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.split_once(':') {
            None => match lower.as_str() {
                "lzf" => Ok(Compression::Lzf),
                "gzip" => Ok(Compression::Gzip(4)),
                "none" => Ok(Compression::None),
                _ => Err(anyhow!("Invalid compression '{}': expected lzf, gzip or none", s)),
            },
            Some(("gzip", level)) => {
                let level: u8 = level
                    .parse()
                    .with_context(|| format!("Invalid gzip level '{}'", level))?;
                if level > 9 {
                    return Err(anyhow!("gzip level must be in 0..=9, got {}", level));
                }
                Ok(Compression::Gzip(level))
            }
            Some(_) => Err(anyhow!("Invalid compression '{}'", s)),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::Lzf => write!(f, "lzf"),
            Compression::Gzip(level) => write!(f, "gzip:{}", level),
            Compression::None => write!(f, "none"),
        }
    }
}

/// Parse a separator given on the command line; accepts `tab` and `\t` for tabs
pub fn parse_separator(s: &str) -> Result<u8> {
    match s {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(anyhow!("Separator must be a single ASCII character, got '{}'", s)),
    }
}

/// Read a delimited text table with a header row
pub fn read_table(path: impl AsRef<Path>, sep: u8) -> Result<DataFrame> {
    let path = path.as_ref();
    CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|options| options.with_separator(sep))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .with_context(|| format!("Failed to read table {}", path.display()))
}

/// Write a table as delimited text with a header row
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>, sep: u8) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(sep)
        .finish(df)
        .with_context(|| format!("Failed to write table {}", path.display()))
}

fn is_h5ad(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("h5ad"))
}

/// Load an annotated matrix from `.h5ad` or from delimited text
///
/// Delimited text is laid out genes x cells: one row per gene, the gene name in
/// column `index_col`, one column per cell. It is transposed on load so that `X`
/// is cells x genes, with the column headers as observation names.
///
/// # Errors
/// Will return `Err` if:
/// - the file cannot be read or parsed
/// - a cell column holds a missing or non-numeric value
/// - the path is `.h5ad` and the crate was built without the `h5ad` feature
pub fn load_data(path: impl AsRef<Path>, options: &LoadOptions) -> Result<AnnotatedMatrix> {
    let path = path.as_ref();

    if is_h5ad(path) {
        tracing::info!("Reading AnnData from {}", path.display());
        return read_h5ad_file(path);
    }

    tracing::info!(
        "Reading delimited matrix {} (sep {:?})",
        path.display(),
        options.sep as char
    );
    let df = read_table(path, options.sep)?;
    let matrix = matrix_from_gene_table(&df, options)?;
    tracing::info!(
        "Loaded {} observations x {} variables",
        matrix.n_obs(),
        matrix.n_vars()
    );
    Ok(matrix)
}

fn matrix_from_gene_table(df: &DataFrame, options: &LoadOptions) -> Result<AnnotatedMatrix> {
    let columns = df.get_columns();
    let index = columns.get(options.index_col).ok_or_else(|| {
        anyhow!(
            "index_col {} out of range for a table with {} columns",
            options.index_col,
            columns.len()
        )
    })?;

    let var_names: Vec<String> = index
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, name)| name.map(str::to_string).unwrap_or_else(|| row.to_string()))
        .collect();

    let cells: Vec<&Column> = columns
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != options.index_col)
        .map(|(_, column)| column)
        .collect();
    let obs_names: Vec<String> = cells.iter().map(|c| c.name().to_string()).collect();

    let mut x = Array2::<f32>::zeros((cells.len(), var_names.len()));
    for (cell, column) in cells.iter().enumerate() {
        let values = column
            .cast(&DataType::Float32)
            .with_context(|| format!("Column '{}' is not numeric", column.name()))?;
        for (gene, value) in values.f32()?.into_iter().enumerate() {
            x[[cell, gene]] = value.ok_or_else(|| {
                anyhow!(
                    "Missing or non-numeric value for cell '{}' at row {}",
                    column.name(),
                    gene
                )
            })?;
        }
    }

    let x = if options.sparse_output {
        Expression::Sparse(CsrMatrix::from_dense(&x))
    } else {
        Expression::Dense(x)
    };
    AnnotatedMatrix::new(x, obs_names, var_names)
}

/// Load a per-cell table (one row per cell) with 2D coordinates
///
/// The coordinate columns go to `obsm[key]` as an `n x 2` matrix, every other
/// column except the index column becomes `obs` metadata. The result has no
/// variables.
pub fn load_cell_table(path: impl AsRef<Path>, options: &TableOptions) -> Result<AnnotatedMatrix> {
    let path = path.as_ref();
    let df = read_table(path, options.sep)?;
    let matrix = matrix_from_cell_table(df, options)
        .with_context(|| format!("Invalid cell table {}", path.display()))?;
    tracing::info!(
        "Loaded {} cells with coordinates '{}' from {}",
        matrix.n_obs(),
        options.key,
        path.display()
    );
    Ok(matrix)
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| anyhow!("Coordinate column '{}' not found", name))?;
    column
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| anyhow!("Missing coordinate '{}' at row {}", name, row))
        })
        .collect()
}

fn matrix_from_cell_table(df: DataFrame, options: &TableOptions) -> Result<AnnotatedMatrix> {
    let xs = float_column(&df, &options.x_column)?;
    let ys = float_column(&df, &options.y_column)?;
    let n_obs = xs.len();

    let mut coords = Array2::<f64>::zeros((n_obs, 2));
    for (row, (x, y)) in xs.into_iter().zip(ys).enumerate() {
        coords[[row, 0]] = x;
        coords[[row, 1]] = y;
    }

    let mut obs = df.drop(&options.x_column)?.drop(&options.y_column)?;
    let obs_names = match &options.index_column {
        Some(index) => {
            let names = obs
                .column(index)
                .map_err(|_| anyhow!("Index column '{}' not found", index))?
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .enumerate()
                .map(|(row, name)| name.map(str::to_string).unwrap_or_else(|| row.to_string()))
                .collect();
            obs = obs.drop(index)?;
            names
        }
        None => (0..n_obs).map(|i| i.to_string()).collect(),
    };

    AnnotatedMatrix::builder(n_obs, 0)
        .obs_names(obs_names)
        .obs(obs)
        .obsm(options.key.clone(), coords)
        .build()
}

#[cfg(feature = "h5ad")]
fn read_h5ad_file(path: &Path) -> Result<AnnotatedMatrix> {
    crate::h5ad::read_h5ad(path)
}

#[cfg(not(feature = "h5ad"))]
fn read_h5ad_file(path: &Path) -> Result<AnnotatedMatrix> {
    Err(anyhow!(
        "Cannot read {}: .h5ad support requires the `h5ad` feature of rsp-anndata",
        path.display()
    ))
}

/// Save an annotated matrix as `.h5ad`
pub fn save_data(
    matrix: &AnnotatedMatrix,
    path: impl AsRef<Path>,
    compression: Compression,
) -> Result<()> {
    let path = path.as_ref();
    tracing::info!(
        "Writing AnnData to {} with {} compression",
        path.display(),
        compression
    );
    write_h5ad_file(matrix, path, compression)
}

#[cfg(feature = "h5ad")]
fn write_h5ad_file(matrix: &AnnotatedMatrix, path: &Path, compression: Compression) -> Result<()> {
    crate::h5ad::write_h5ad(matrix, path, compression)
}

#[cfg(not(feature = "h5ad"))]
fn write_h5ad_file(_: &AnnotatedMatrix, path: &Path, _: Compression) -> Result<()> {
    Err(anyhow!(
        "Cannot write {}: .h5ad support requires the `h5ad` feature of rsp-anndata",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_gene_table_is_transposed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "counts.tsv",
            "gene\tcell_a\tcell_b\tcell_c\nCD3E\t1\t0\t5\nMS4A1\t0\t2\t0\n",
        );

        let adata = load_data(&path, &LoadOptions::default()).unwrap();
        assert_eq!(adata.shape(), (3, 2));
        assert_eq!(adata.obs_names(), &["cell_a", "cell_b", "cell_c"]);
        assert_eq!(adata.var_names(), &["CD3E", "MS4A1"]);
        assert!(adata.x().is_sparse());
        assert_eq!(adata.expression("CD3E").unwrap(), vec![1.0, 0.0, 5.0]);
        assert_eq!(adata.expression("MS4A1").unwrap(), vec![0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_dense_output_and_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "counts.csv", "c1,gene,c2\n1.5,G1,2\n0,G2,3\n");
        let options = LoadOptions {
            sep: b',',
            index_col: 1,
            sparse_output: false,
        };

        let adata = load_data(&path, &options).unwrap();
        assert!(!adata.x().is_sparse());
        assert_eq!(adata.obs_names(), &["c1", "c2"]);
        assert_eq!(adata.x().to_dense()[[0, 0]], 1.5);
        assert_eq!(adata.x().to_dense()[[1, 1]], 3.0);
    }

    #[test]
    fn test_missing_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "counts.tsv", "gene\tc1\nG1\t\nG2\t1\n");
        assert!(load_data(&path, &LoadOptions::default()).is_err());
    }

    #[test]
    fn test_cell_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "cells.csv",
            "cell_id,x,y,cell_type\nA,0.5,1.0,T\nB,-1.0,2.0,B\n",
        );
        let options = TableOptions {
            index_column: Some("cell_id".to_string()),
            ..Default::default()
        };

        let adata = load_cell_table(&path, &options).unwrap();
        assert_eq!(adata.shape(), (2, 0));
        assert_eq!(adata.obs_names(), &["A", "B"]);
        assert_eq!(adata.obsm("spatial").unwrap()[[1, 0]], -1.0);
        assert_eq!(adata.obs_column_strings("cell_type").unwrap(), vec!["T", "B"]);
        assert!(!adata.has_obs_column("x"));
    }

    #[test]
    fn test_cell_table_missing_coordinate_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "cells.csv", "a,b\n1,2\n");
        assert!(load_cell_table(&path, &TableOptions::default()).is_err());
    }

    #[test]
    fn test_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.tsv");
        let mut df = df!("p_value" => [0.01, 0.5]).unwrap();
        write_table(&mut df, &path, b'\t').unwrap();
        let back = read_table(&path, b'\t').unwrap();
        assert_eq!(back.shape(), (2, 1));
    }

    #[test]
    fn test_parse_compression() {
        assert_eq!("lzf".parse::<Compression>().unwrap(), Compression::Lzf);
        assert_eq!("GZIP:9".parse::<Compression>().unwrap(), Compression::Gzip(9));
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
        assert!("gzip:12".parse::<Compression>().is_err());
        assert!("zstd".parse::<Compression>().is_err());
    }

    #[test]
    fn test_parse_separator() {
        assert_eq!(parse_separator("\\t").unwrap(), b'\t');
        assert_eq!(parse_separator(";").unwrap(), b';');
        assert!(parse_separator("::").is_err());
    }

    #[cfg(not(feature = "h5ad"))]
    #[test]
    fn test_h5ad_without_feature() {
        let err = load_data("missing.h5ad", &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("h5ad"));
    }
}
