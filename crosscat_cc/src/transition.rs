use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::alg::ColAssignAlg;
use crate::ParseError;

pub const DEFAULT_STATE_TRANSITIONS: [StateTransition; 5] = [
    StateTransition::ColumnAssignment(ColAssignAlg::Gibbs),
    StateTransition::StateAlpha,
    StateTransition::RowAssignment,
    StateTransition::ViewAlphas,
    StateTransition::FeaturePriors,
];

/// MCMC transitions in the `View`
#[derive(Deserialize, Serialize, Clone, Copy, Eq, PartialEq, Debug)]
pub enum ViewTransition {
    /// Reassign rows to clusters with collapsed Gibbs
    RowAssignment,
    /// Update the CRP alpha on the grid
    Alpha,
    /// Update the feature (column) hyperparameters on their grids
    FeaturePriors,
}

/// MCMC transitions in the `State`
#[derive(Deserialize, Serialize, Clone, Copy, Eq, PartialEq, Debug)]
pub enum StateTransition {
    /// Reassign columns to views
    #[serde(rename = "column_assignment")]
    ColumnAssignment(ColAssignAlg),
    /// Reassign rows in views to clusters
    #[serde(rename = "row_assignment")]
    RowAssignment,
    /// Update the alpha parameter on the column-to-views CRP
    #[serde(rename = "state_alpha")]
    StateAlpha,
    /// Update the alpha parameters on the row-to-clusters CRPs
    #[serde(rename = "view_alphas")]
    ViewAlphas,
    /// Update the feature (column) hyperparameters
    #[serde(rename = "feature_priors")]
    FeaturePriors,
}

impl TryFrom<StateTransition> for ViewTransition {
    type Error = ParseError<StateTransition>;

    fn try_from(st: StateTransition) -> Result<ViewTransition, Self::Error> {
        match st {
            StateTransition::ViewAlphas => Ok(ViewTransition::Alpha),
            StateTransition::RowAssignment => Ok(ViewTransition::RowAssignment),
            StateTransition::FeaturePriors => Ok(ViewTransition::FeaturePriors),
            _ => Err(ParseError(st)),
        }
    }
}
