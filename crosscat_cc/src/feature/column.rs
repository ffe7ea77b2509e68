use crosscat_stats::conjugate::Hypers;
use crosscat_stats::grid::HyperGrids;
use crosscat_stats::FType;
use serde::{Deserialize, Serialize};

/// A column as seen by the `View` that owns it: its dataset index, its
/// current hyperparameters and the grids those are resampled on.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewColumn {
    pub col_ix: usize,
    pub hypers: Hypers,
    pub grids: HyperGrids,
}

impl ViewColumn {
    /// # Panics
    /// Panics if `hypers` and `grids` are for different column types
    pub fn new(col_ix: usize, hypers: Hypers, grids: HyperGrids) -> Self {
        assert_eq!(
            hypers.ftype(),
            grids.ftype(),
            "Column {col_ix} hypers and grids disagree on type"
        );
        ViewColumn {
            col_ix,
            hypers,
            grids,
        }
    }

    #[inline]
    pub fn ftype(&self) -> FType {
        self.hypers.ftype()
    }
}
