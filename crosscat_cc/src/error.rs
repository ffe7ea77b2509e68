use crosscat_stats::conjugate::HypersError;
use crosscat_stats::grid::GridError;
use crosscat_stats::FType;
use thiserror::Error;

/// Problems with the data handed to a builder
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DataError {
    #[error("data has no rows")]
    NoRows,
    #[error("data has no columns")]
    NoColumns,
    #[error("data has {n_cols} columns but {n_ftypes} column types were given")]
    FTypeCountMismatch { n_cols: usize, n_ftypes: usize },
    #[error("row has {len} entries but there are {n_cols} columns")]
    RowLength { len: usize, n_cols: usize },
    #[error(
        "invalid value {value} at row {row_ix} of column {col_ix}, which is \
        {ftype}"
    )]
    InvalidValue {
        row_ix: usize,
        col_ix: usize,
        value: f64,
        ftype: FType,
    },
}

/// Problems with an explicitly supplied starting partition or its CRP
/// settings
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PartitionError {
    #[error("the partition has {len} entries but there are {n} items")]
    WrongLength { len: usize, n: usize },
    #[error(
        "partition labels must be 0..k with no gaps, but label {missing} is \
        unused"
    )]
    LabelGap { missing: usize },
    #[error(
        "the column partition has {n_views} views but {n_row_partitions} row \
        partitions were given"
    )]
    ViewCountMismatch {
        n_views: usize,
        n_row_partitions: usize,
    },
    #[error("row partition of view {view_ix}: {source}")]
    RowPartition {
        view_ix: usize,
        #[source]
        source: Box<PartitionError>,
    },
    #[error("{n_given} view alphas were given for {n_views} views")]
    ViewAlphasLength { n_given: usize, n_views: usize },
    #[error("{n_given} hypers were given for {n_cols} columns")]
    HypersLength { n_given: usize, n_cols: usize },
    #[error("hypers for column {col_ix} are {given} but the column is {ftype}")]
    HypersFType {
        col_ix: usize,
        given: FType,
        ftype: FType,
    },
    #[error("hypers for column {col_ix}: {source}")]
    InvalidHypers {
        col_ix: usize,
        #[source]
        source: HypersError,
    },
    #[error("CRP alpha must be finite and positive, got {0}")]
    InvalidAlpha(f64),
    #[error("CRP alpha grid: {0}")]
    AlphaGrid(#[source] GridError),
}

/// Errors that can arise when building a `State`
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BuildStateError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error("hyper grids for column {col_ix}: {source}")]
    Grid {
        col_ix: usize,
        #[source]
        source: GridError,
    },
    #[error("{n_given} hyper grids were given for {n_cols} columns")]
    GridCount { n_given: usize, n_cols: usize },
    #[error("CRP alpha grid: {0}")]
    AlphaGrid(#[source] GridError),
}

/// Problems with a `StateUpdateConfig`
#[derive(Clone, Debug, PartialEq, Error)]
pub enum UpdateConfigError {
    #[error("MH singleton proposal probability must be in (0, 1), got {0}")]
    InvalidSingletonProb(f64),
}

/// A broken invariant found by `State::validate`
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    #[error("column {col_ix} is assigned to {n_views} views")]
    ColumnAssignment { col_ix: usize, n_views: usize },
    #[error("row {row_ix} is in {n_clusters} clusters of view {view_ix}")]
    RowAssignment {
        view_ix: usize,
        row_ix: usize,
        n_clusters: usize,
    },
    #[error("view {view_ix} has an empty cluster")]
    EmptyCluster { view_ix: usize },
    #[error("view {view_ix} has no columns")]
    EmptyView { view_ix: usize },
    #[error("running {what} score is {running} but recomputes to {recomputed}")]
    ScoreDrift {
        what: String,
        running: f64,
        recomputed: f64,
    },
}
