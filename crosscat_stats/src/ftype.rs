use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Feature (column) type
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FType {
    /// Real-valued data modelled with a Normal-Gamma component
    Continuous,
    /// Angles in radians modelled with a von Mises component
    Cyclic,
    /// Category indices in `0..k` modelled with a Dirichlet-categorical
    /// component
    Multinomial { k: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FTypeError {
    #[error("unknown column type tag '{0}'")]
    UnknownTag(String),
    #[error("multinomial column requires a category count")]
    MissingCategoryCount,
    #[error("multinomial column must have at least one category")]
    ZeroCategories,
}

impl std::fmt::Display for FType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continuous => write!(f, "Continuous"),
            Self::Cyclic => write!(f, "Cyclic"),
            Self::Multinomial { k } => write!(f, "Multinomial(k={k})"),
        }
    }
}

impl FType {
    /// Build an `FType` from a string tag and, for multinomial columns, the
    /// number of categories.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use crosscat_stats::FType;
    /// assert_eq!(FType::from_tag("continuous", None), Ok(FType::Continuous));
    /// assert_eq!(
    ///     FType::from_tag("multinomial", Some(4)),
    ///     Ok(FType::Multinomial { k: 4 })
    /// );
    /// assert!(FType::from_tag("multinomial", None).is_err());
    /// assert!(FType::from_tag("ordinal", None).is_err());
    /// ```
    pub fn from_tag(tag: &str, k: Option<usize>) -> Result<Self, FTypeError> {
        match tag.to_lowercase().as_str() {
            "continuous" => Ok(Self::Continuous),
            "cyclic" => Ok(Self::Cyclic),
            "multinomial" | "categorical" => match k {
                Some(0) => Err(FTypeError::ZeroCategories),
                Some(k) => Ok(Self::Multinomial { k }),
                None => Err(FTypeError::MissingCategoryCount),
            },
            _ => Err(FTypeError::UnknownTag(tag.to_owned())),
        }
    }

    /// Whether `x` is a legal cell value for this type. `NaN` (missing) is
    /// always legal.
    pub fn accepts(&self, x: f64) -> bool {
        if x.is_nan() {
            return true;
        }
        match self {
            Self::Continuous | Self::Cyclic => x.is_finite(),
            Self::Multinomial { k } => {
                x >= 0.0 && x.fract() == 0.0 && (x as usize) < *k
            }
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Continuous)
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, Self::Cyclic)
    }

    pub fn is_multinomial(&self) -> bool {
        matches!(self, Self::Multinomial { .. })
    }
}
