use thiserror::Error;

/// Configuration errors of the integrators.
///
/// These are detected when an integrator or its parameters are built, never
/// in the middle of a step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegratorError {
    #[error("scheme has {positions} position coefficients but {momenta} momentum coefficients")]
    MismatchedCoefficients { positions: usize, momenta: usize },

    #[error("scheme has no stages")]
    EmptyScheme,

    #[error("{kind} coefficient {index} is not finite")]
    NonFiniteCoefficient { kind: &'static str, index: usize },

    #[error("{kind} coefficients sum to {sum} instead of 1")]
    InconsistentCoefficientSum { kind: &'static str, sum: f64 },

    #[error("step must be positive and finite, got {0} s")]
    NonPositiveStep(f64),

    #[error("{0} tolerance must be positive and finite")]
    NonPositiveTolerance(&'static str),

    #[error("state has {positions} positions but {momenta} momenta")]
    StateDimensionMismatch { positions: usize, momenta: usize },
}
