mod distribution;
mod document;
mod graph;
mod ids;
mod results;
mod settings;
mod stream;

pub use distribution::{Distribution, Preview, PreviewPoint};
pub use document::{DOCUMENT_VERSION, DocumentMetadata, ModelDocument};
pub use graph::FinancialModel;
pub use ids::StreamId;
pub use results::{
    DeterministicResult, MonteCarloConfig, MonteCarloResult, MonthlyCashflowStats, SummaryStats,
};
pub use settings::{CalculationMode, ModelSettings};
pub use stream::{Stream, StreamKind};
