use std::fmt;

use crate::model::StreamId;

/// Errors in distribution or stream configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidDistribution {
        kind: &'static str,
        reason: &'static str,
    },
    PercentileOutOfRange(f64),
    WindowOrder {
        stream: StreamId,
        start_month: usize,
        end_month: usize,
    },
    ConversionRateOutOfRange {
        stream: StreamId,
        value: f64,
    },
    ZeroPeriodicity(StreamId),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDistribution { kind, reason } => {
                write!(f, "invalid {kind} distribution: {reason}")
            }
            ConfigError::PercentileOutOfRange(p) => {
                write!(f, "percentile {p} is outside [0, 1]")
            }
            ConfigError::WindowOrder {
                stream,
                start_month,
                end_month,
            } => write!(
                f,
                "stream {stream:?}: end_month {end_month} precedes start_month {start_month}"
            ),
            ConfigError::ConversionRateOutOfRange { stream, value } => {
                write!(
                    f,
                    "stream {stream:?}: conversion rate {value} must be between 0 and 1"
                )
            }
            ConfigError::ZeroPeriodicity(id) => {
                write!(f, "stream {id:?}: periodicity_months must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors in the stream graph structure
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    DuplicateStream(StreamId),
    StreamNotFound(StreamId),
    DanglingParent { stream: StreamId, parent: StreamId },
    CircularDependency,
    InvalidOrder,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateStream(id) => write!(f, "stream {id:?} already exists"),
            GraphError::StreamNotFound(id) => write!(f, "stream {id:?} not found"),
            GraphError::DanglingParent { stream, parent } => {
                write!(f, "stream {stream:?} references non-existent parent {parent:?}")
            }
            GraphError::CircularDependency => {
                write!(f, "circular dependency detected among streams")
            }
            GraphError::InvalidOrder => {
                write!(f, "order list must include every stream exactly once")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors raised by `FinancialModel::validate`
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Config(ConfigError),
    Graph(GraphError),
    DiscountRateNotAboveGrowth {
        discount_rate: f64,
        terminal_growth_rate: f64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Config(e) => write!(f, "{e}"),
            ValidationError::Graph(e) => write!(f, "{e}"),
            ValidationError::DiscountRateNotAboveGrowth {
                discount_rate,
                terminal_growth_rate,
            } => write!(
                f,
                "discount rate ({discount_rate}) must be greater than terminal growth rate ({terminal_growth_rate})"
            ),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::Config(e) => Some(e),
            ValidationError::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ValidationError {
    fn from(e: ConfigError) -> Self {
        ValidationError::Config(e)
    }
}

impl From<GraphError> for ValidationError {
    fn from(e: GraphError) -> Self {
        ValidationError::Graph(e)
    }
}

/// Errors surfaced by the calculation drivers
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Config(ConfigError),
    Graph(GraphError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "{e}"),
            EngineError::Graph(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Config(e) => Some(e),
            EngineError::Graph(e) => Some(e),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}

impl From<GraphError> for EngineError {
    fn from(e: GraphError) -> Self {
        EngineError::Graph(e)
    }
}

/// Root-finding failures from the Brent solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootFindError {
    /// The objective has the same sign at both bracket endpoints
    NoSignChange { f_lo: f64, f_hi: f64 },
    /// Iteration budget exhausted before reaching tolerance
    MaxIterations { last: f64 },
}

impl fmt::Display for RootFindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootFindError::NoSignChange { f_lo, f_hi } => write!(
                f,
                "no sign change over the bracket (f(lo)={f_lo}, f(hi)={f_hi})"
            ),
            RootFindError::MaxIterations { last } => {
                write!(f, "root finder exhausted its iteration budget near {last}")
            }
        }
    }
}

impl std::error::Error for RootFindError {}

/// IRR-specific failures. These are attached to result records, never
/// propagated as a failure of the surrounding pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IrrError {
    NoSignChange,
    SolverFailed(RootFindError),
}

impl fmt::Display for IrrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrrError::NoSignChange => write!(
                f,
                "no sign change in cashflows (need both positive and negative values)"
            ),
            IrrError::SolverFailed(_) => {
                write!(f, "IRR solver could not find a solution in the search range")
            }
        }
    }
}

impl std::error::Error for IrrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IrrError::SolverFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors from document save/load and template lookup
#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Graph(GraphError),
    TemplateNotFound(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "{e}"),
            PersistenceError::Json(e) => write!(f, "document parse error: {e}"),
            PersistenceError::Graph(e) => write!(f, "{e}"),
            PersistenceError::TemplateNotFound(name) => {
                write!(f, "template '{name}' not found")
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Io(e) => Some(e),
            PersistenceError::Json(e) => Some(e),
            PersistenceError::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Json(e)
    }
}

impl From<GraphError> for PersistenceError {
    fn from(e: GraphError) -> Self {
        PersistenceError::Graph(e)
    }
}
