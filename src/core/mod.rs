pub mod enricher;
pub mod etl;
pub mod extractor;
pub mod filter;
pub mod pipeline;
pub mod throttle;

pub use crate::domain::model::{CanonicalRecord, FinancialSnapshot, OutputRow, RunState, RunSummary};
pub use crate::domain::ports::{PageSource, Pipeline, RowSink, StatementSource, Storage};
pub use crate::utils::error::Result;
