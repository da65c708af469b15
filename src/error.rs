use thiserror::Error;

/// Errors raised by the abatement-cost models.
#[derive(Debug, Error)]
pub enum MacError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid energy grid: {0}")]
    InvalidGrid(String),

    #[error("Technology table error: {0}")]
    Technology(String),

    #[error("Root solve failed: {0}")]
    RootSolve(String),

    #[error("Curve export failed: {0}")]
    Export(String),
}

/// Errors raised while loading, formulating or solving a dispatch model.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Problem is infeasible")]
    Infeasible,

    #[error("Problem is unbounded")]
    Unbounded,

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("LP solving requires the 'optimization' feature")]
    SolverUnavailable,
}

impl From<validator::ValidationErrors> for MacError {
    fn from(errors: validator::ValidationErrors) -> Self {
        MacError::InvalidParameter(errors.to_string())
    }
}

impl From<validator::ValidationErrors> for DispatchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DispatchError::Validation(errors.to_string())
    }
}

impl From<csv::Error> for MacError {
    fn from(error: csv::Error) -> Self {
        MacError::Export(error.to_string())
    }
}

#[cfg(feature = "optimization")]
impl From<good_lp::ResolutionError> for DispatchError {
    fn from(error: good_lp::ResolutionError) -> Self {
        match error {
            good_lp::ResolutionError::Infeasible => DispatchError::Infeasible,
            good_lp::ResolutionError::Unbounded => DispatchError::Unbounded,
            other => DispatchError::Solver(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            MacError::InvalidParameter("alpha".to_string()).to_string(),
            "Invalid parameter: alpha"
        );
        assert_eq!(DispatchError::Infeasible.to_string(), "Problem is infeasible");
    }

    #[cfg(feature = "optimization")]
    #[test]
    fn test_resolution_error_mapping() {
        assert!(matches!(
            DispatchError::from(good_lp::ResolutionError::Unbounded),
            DispatchError::Unbounded
        ));
        assert!(matches!(
            DispatchError::from(good_lp::ResolutionError::Infeasible),
            DispatchError::Infeasible
        ));
    }
}
