//! Annotated single-cell matrices for spatial RSP analysis
//!
//! An [`AnnotatedMatrix`] holds a cells x genes expression matrix (`X`) together
//! with per-cell metadata (`obs`), per-gene metadata (`var`) and named cell
//! embeddings (`obsm`, e.g. `X_umap`). Matrices can be loaded from delimited
//! text or, with the `h5ad` feature, from AnnData `.h5ad` files. The [`fetch`]
//! module downloads public cell atlases (HCL, KPMP and MCA).
//!
//! ```no_run
//! use rsp_anndata::{LoadOptions, load_data};
//!
//! let matrix = load_data("counts.tsv", &LoadOptions::default())?;
//! println!("{} cells x {} genes", matrix.n_obs(), matrix.n_vars());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use fetch::{Dataset, DownloadOutcome, FetchConfig, Fetcher, KpmpKind, RemoteFile};
pub use io::{
    Compression, LoadOptions, TableOptions, load_cell_table, load_data, parse_separator,
    read_table, save_data, write_table,
};
pub use matrix::{AnnotatedMatrix, AnnotatedMatrixBuilder, Expression};
pub use sparse::CsrMatrix;

pub mod fetch;
#[cfg(feature = "h5ad")]
pub mod h5ad;
pub mod io;
pub mod matrix;
pub mod sparse;
