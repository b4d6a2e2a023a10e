pub mod fdr;
pub mod rmsd;
pub mod significance;

pub use fdr::{FdrResult, bh_fdr, correct};
pub use rmsd::{compute_rmsd, coverage};
pub use significance::{angular_pvalues, angular_significance, binomial_two_sided};
