//! Compressed sparse row storage for expression matrices

use anyhow::{Result, anyhow};
use ndarray::Array2;

/// Row-major sparse matrix in CSR layout
///
/// Row `i` owns the entries `indptr[i]..indptr[i + 1]` of `indices` (column
/// positions, strictly increasing within a row) and `data` (values).
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl CsrMatrix {
    /// Build from raw CSR components, checking that they describe a valid matrix
    pub fn from_csr(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f32>,
    ) -> Result<Self> {
        if indptr.len() != n_rows + 1 {
            return Err(anyhow!(
                "indptr has {} entries, expected {} for {} rows",
                indptr.len(),
                n_rows + 1,
                n_rows
            ));
        }
        if indices.len() != data.len() {
            return Err(anyhow!(
                "indices ({}) and data ({}) differ in length",
                indices.len(),
                data.len()
            ));
        }
        if indptr.first() != Some(&0) || indptr.last() != Some(&data.len()) {
            return Err(anyhow!("indptr must start at 0 and end at nnz ({})", data.len()));
        }
        for (row, bounds) in indptr.windows(2).enumerate() {
            if bounds[0] > bounds[1] {
                return Err(anyhow!("indptr decreases at row {}", row));
            }
            let columns = &indices[bounds[0]..bounds[1]];
            if columns.windows(2).any(|w| w[0] >= w[1]) {
                return Err(anyhow!("column indices of row {} are not strictly increasing", row));
            }
            if let Some(&col) = columns.last()
                && col >= n_cols
            {
                return Err(anyhow!("column index {} out of bounds in row {}", col, row));
            }
        }

        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    /// Build from compressed sparse column components
    pub fn from_csc(
        n_rows: usize,
        n_cols: usize,
        indptr: &[usize],
        indices: &[usize],
        data: &[f32],
    ) -> Result<Self> {
        if indptr.len() != n_cols + 1 || indices.len() != data.len() {
            return Err(anyhow!("inconsistent CSC components for a {}x{} matrix", n_rows, n_cols));
        }
        if indptr.last() != Some(&data.len()) {
            return Err(anyhow!("CSC indptr must end at nnz ({})", data.len()));
        }

        let mut row_counts = vec![0usize; n_rows + 1];
        for &row in indices {
            if row >= n_rows {
                return Err(anyhow!("row index {} out of bounds", row));
            }
            row_counts[row + 1] += 1;
        }
        for row in 0..n_rows {
            row_counts[row + 1] += row_counts[row];
        }

        let row_ptr = row_counts.clone();
        let mut next = row_counts;
        let mut csr_indices = vec![0usize; data.len()];
        let mut csr_data = vec![0f32; data.len()];
        for col in 0..n_cols {
            if indptr[col] > indptr[col + 1] {
                return Err(anyhow!("CSC indptr decreases at column {}", col));
            }
            for k in indptr[col]..indptr[col + 1] {
                let row = indices[k];
                let slot = next[row];
                csr_indices[slot] = col;
                csr_data[slot] = data[k];
                next[row] += 1;
            }
        }

        Self::from_csr(n_rows, n_cols, row_ptr, csr_indices, csr_data)
    }

    /// All-zero matrix
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Keep the non-zero entries of a dense matrix
    pub fn from_dense(dense: &Array2<f32>) -> Self {
        let (n_rows, n_cols) = dense.dim();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in dense.rows() {
            for (col, &value) in row.iter().enumerate() {
                if value != 0.0 {
                    indices.push(col);
                    data.push(value);
                }
            }
            indptr.push(data.len());
        }
        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        if row >= self.n_rows {
            return 0.0;
        }
        let range = self.indptr[row]..self.indptr[row + 1];
        match self.indices[range.clone()].binary_search(&col) {
            Ok(offset) => self.data[range.start + offset],
            Err(_) => 0.0,
        }
    }

    pub fn to_dense(&self) -> Array2<f32> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for row in 0..self.n_rows {
            for k in self.indptr[row]..self.indptr[row + 1] {
                dense[[row, self.indices[k]]] = self.data[k];
            }
        }
        dense
    }

    /// Dense copy of one column
    pub fn column(&self, col: usize) -> Vec<f32> {
        (0..self.n_rows).map(|row| self.get(row, col)).collect()
    }

    /// New matrix made of the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for &row in rows {
            let range = self.indptr[row]..self.indptr[row + 1];
            indices.extend_from_slice(&self.indices[range.clone()]);
            data.extend_from_slice(&self.data[range]);
            indptr.push(data.len());
        }
        Self {
            n_rows: rows.len(),
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dense_round_trip() {
        let dense = array![[1.0f32, 0.0, 2.0], [0.0, 0.0, 0.0], [0.0, 3.0, 0.0]];
        let csr = CsrMatrix::from_dense(&dense);
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.indptr(), &[0, 2, 2, 3]);
        assert_eq!(csr.to_dense(), dense);
        assert_eq!(csr.get(2, 1), 3.0);
        assert_eq!(csr.get(1, 1), 0.0);
        assert_eq!(csr.column(2), vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_select_rows() {
        let dense = array![[1.0f32, 0.0], [0.0, 2.0], [3.0, 4.0]];
        let csr = CsrMatrix::from_dense(&dense).select_rows(&[2, 0]);
        assert_eq!(csr.to_dense(), array![[3.0f32, 4.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_from_csc() {
        // [[1, 0, 2], [0, 3, 0]] stored by column
        let csr = CsrMatrix::from_csc(2, 3, &[0, 1, 2, 3], &[0, 1, 0], &[1.0, 3.0, 2.0]).unwrap();
        assert_eq!(csr.to_dense(), array![[1.0f32, 0.0, 2.0], [0.0, 3.0, 0.0]]);
        assert!(CsrMatrix::from_csc(1, 1, &[0, 1], &[4], &[1.0]).is_err());
    }

    #[test]
    fn test_invalid_components() {
        assert!(CsrMatrix::from_csr(2, 2, vec![0, 1], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::from_csr(1, 2, vec![0, 1], vec![5], vec![1.0]).is_err());
        assert!(CsrMatrix::from_csr(1, 3, vec![0, 2], vec![1, 0], vec![1.0, 2.0]).is_err());
        assert!(CsrMatrix::from_csr(1, 3, vec![0, 2], vec![0, 2], vec![1.0, 2.0]).is_ok());
    }
}
