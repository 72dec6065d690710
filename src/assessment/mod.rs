//! Relationship assessment: the quiz catalog, count summaries and the
//! response store.

pub mod catalog;
pub mod store;
pub mod summary;

pub use catalog::{AssessmentModule, MODULES, find_module, total_questions};
pub use store::{AssessmentStore, SqliteAssessmentStore, StoreFuture};
pub use summary::{AssessmentSummary, DashboardSummary, ModuleProgress, QuizResponse};
