//! Count-only assessment summaries and the dashboard rollup built on them.
//!
//! None of these types can carry an answer value: the mediator only ever
//! learns how many questions a participant answered per module.

use serde::{Deserialize, Serialize};

use crate::assessment::catalog::{self, AssessmentModule};
use crate::common::ids::UserId;

/// Per-module response count for one participant.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    /// Module id.
    pub module_id: String,
    /// Module title.
    pub title: String,
    /// Number of recorded responses.
    pub response_count: u32,
}

impl AssessmentSummary {
    /// Build a summary for a catalog module.
    #[must_use]
    pub fn for_module(module: &AssessmentModule, response_count: u32) -> Self {
        Self {
            module_id: module.id.to_string(),
            title: module.title.to_string(),
            response_count,
        }
    }
}

/// A single recorded quiz answer, as submitted by the quiz client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    /// Who answered.
    pub user_id: UserId,
    /// Module the question belongs to.
    pub module_id: String,
    /// Global question id.
    pub question_id: u32,
    /// Free-form answer payload.
    pub answer: serde_json::Value,
}

/// Completion of one module.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    /// Module id.
    pub module_id: String,
    /// Module title.
    pub title: String,
    /// Answered questions.
    pub completed: u32,
    /// Questions in the module.
    pub total: u32,
    /// Rounded completion, 0..=100.
    pub percentage: u32,
}

/// Completion across the whole assessment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Rounded overall completion, 0..=100.
    pub completion_percentage: u32,
    /// Answered questions.
    pub total_responses: u32,
    /// Questions in the catalog.
    pub total_questions: u32,
    /// Per-module breakdown in catalog order.
    pub module_progress: Vec<ModuleProgress>,
}

impl DashboardSummary {
    /// Roll per-module counts up against the catalog.
    ///
    /// Counts for modules missing from the catalog are ignored; counts above a
    /// module's size are clamped.
    #[must_use]
    pub fn from_counts(counts: &[AssessmentSummary]) -> Self {
        let module_progress: Vec<ModuleProgress> = catalog::MODULES
            .iter()
            .map(|module| {
                let total = module.question_count();
                let completed = counts
                    .iter()
                    .filter(|summary| summary.module_id == module.id)
                    .map(|summary| summary.response_count)
                    .sum::<u32>()
                    .min(total);
                ModuleProgress {
                    module_id: module.id.to_string(),
                    title: module.title.to_string(),
                    completed,
                    total,
                    percentage: percentage(completed, total),
                }
            })
            .collect();

        let total_responses = module_progress.iter().map(|m| m.completed).sum();
        let total_questions = catalog::total_questions();

        Self {
            completion_percentage: percentage(total_responses, total_questions),
            total_responses,
            total_questions,
            module_progress,
        }
    }
}

fn percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let rounded = (completed * 100 + total / 2) / total;
    u32::try_from(rounded).map_or(100, |value| value.min(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(module_id: &str, count: u32) -> AssessmentSummary {
        let module = catalog::find_module(module_id).unwrap();
        AssessmentSummary::for_module(module, count)
    }

    #[test]
    fn test_empty_dashboard() {
        let dashboard = DashboardSummary::from_counts(&[]);
        assert_eq!(dashboard.completion_percentage, 0);
        assert_eq!(dashboard.total_responses, 0);
        assert_eq!(dashboard.total_questions, 90);
        assert_eq!(dashboard.module_progress.len(), 7);
        assert!(dashboard.module_progress.iter().all(|m| m.percentage == 0));
    }

    #[test]
    fn test_partial_dashboard() {
        let dashboard =
            DashboardSummary::from_counts(&[summary("individual", 3), summary("preferences", 5)]);
        assert_eq!(dashboard.total_responses, 8);
        assert_eq!(dashboard.completion_percentage, 9);
        assert_eq!(dashboard.module_progress[0].percentage, 100);
        assert_eq!(dashboard.module_progress[1].percentage, 25);
        assert_eq!(dashboard.module_progress[1].total, 20);
    }

    #[test]
    fn test_counts_are_clamped_to_module_size() {
        let dashboard = DashboardSummary::from_counts(&[summary("monogamy", 50)]);
        assert_eq!(dashboard.module_progress[6].completed, 5);
        assert_eq!(dashboard.module_progress[6].percentage, 100);
    }

    #[test]
    fn test_unknown_modules_are_ignored() {
        let stray = AssessmentSummary {
            module_id: "retired".to_string(),
            title: "Retired".to_string(),
            response_count: 4,
        };
        let dashboard = DashboardSummary::from_counts(&[stray]);
        assert_eq!(dashboard.total_responses, 0);
    }

    #[test]
    fn test_percentage_rounds_and_stays_in_range() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(7, 5), 100);
        assert_eq!(percentage(u32::MAX, u32::MAX), 100);
        assert_eq!(percentage(u32::MAX - 1, u32::MAX), 100);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_value(summary("attraction", 2)).unwrap();
        assert_eq!(json["moduleId"], "attraction");
        assert_eq!(json["responseCount"], 2);
    }
}
