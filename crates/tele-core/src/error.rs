use thiserror::Error;

/// Contract violations detected while constructing exploration inputs.
///
/// All of these indicate a caller bug (inputs that do not describe the same
/// grid, or parameters outside their domain). Once inputs are accepted the
/// algorithms themselves cannot fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TeleError {
    /// The grid has no latitudes or no longitudes.
    #[error("grid must have at least one latitude and one longitude, got {n_lat}×{n_lon}")]
    EmptyGrid { n_lat: usize, n_lon: usize },

    /// An input vector or matrix does not match the grid size.
    #[error("{what}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Significance level outside the open interval (0, 1).
    #[error("significance level must lie in (0, 1), got {0}")]
    InvalidSignificanceLevel(f64),

    /// A point id that does not address a grid point.
    #[error("point {point} out of range for a grid of {n_points} points")]
    PointOutOfRange { point: usize, n_points: usize },

    /// The correlation chain must at least hold its reference point.
    #[error("maximum chain length must be at least 1")]
    InvalidChainLength,

    /// Malformed exploration configuration.
    #[error("config error: {0}")]
    Config(String),
}

pub type TeleResult<T> = Result<T, TeleError>;
