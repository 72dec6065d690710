//! The fixed catalog of assessment modules.
//!
//! Question ids are global and contiguous per module, so a module is fully
//! described by its id range.

use serde::Serialize;

/// One quiz module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentModule {
    /// Stable module id.
    pub id: &'static str,
    /// Display title, also used in mediator context lines.
    pub title: &'static str,
    /// Short description.
    pub description: &'static str,
    /// First question id (inclusive).
    pub first_question: u32,
    /// Last question id (inclusive).
    pub last_question: u32,
}

impl AssessmentModule {
    /// Number of questions in the module.
    #[must_use]
    pub const fn question_count(&self) -> u32 {
        self.last_question - self.first_question + 1
    }

    /// Whether the question id belongs to this module.
    #[must_use]
    pub const fn contains_question(&self, question_id: u32) -> bool {
        question_id >= self.first_question && question_id <= self.last_question
    }
}

/// All modules, in quiz order.
pub const MODULES: [AssessmentModule; 7] = [
    AssessmentModule {
        id: "individual",
        title: "The Individual Profile",
        description: "Understanding your core values and communication style.",
        first_question: 1,
        last_question: 3,
    },
    AssessmentModule {
        id: "preferences",
        title: "Personal Preferences & Aversions",
        description: "Deep dive into your everyday needs, triggers, and love languages.",
        first_question: 4,
        last_question: 23,
    },
    AssessmentModule {
        id: "aspirations",
        title: "Aspirations & Long-Term Goals",
        description: "Aligning your visions for the future together.",
        first_question: 24,
        last_question: 40,
    },
    AssessmentModule {
        id: "compatibility",
        title: "Compatibility & Current Dynamics",
        description: "Assessing the current state of your connection and teamwork.",
        first_question: 41,
        last_question: 59,
    },
    AssessmentModule {
        id: "attraction",
        title: "Attraction, Excitement & Emotional Pull",
        description: "Exploring the spark, desire, and emotional bond between you.",
        first_question: 60,
        last_question: 75,
    },
    AssessmentModule {
        id: "deep_dive",
        title: "Deep, Open-Ended Reflections",
        description: "Thoughtful explorations for deeper mutual understanding.",
        first_question: 76,
        last_question: 85,
    },
    AssessmentModule {
        id: "monogamy",
        title: "Agreements: Boundaries & Definitions",
        description: "Defining expectations and relationship structure.",
        first_question: 86,
        last_question: 90,
    },
];

/// Look up a module by id.
#[must_use]
pub fn find_module(id: &str) -> Option<&'static AssessmentModule> {
    MODULES.iter().find(|module| module.id == id)
}

/// Total number of questions across the catalog.
#[must_use]
pub fn total_questions() -> u32 {
    MODULES.iter().map(AssessmentModule::question_count).sum()
}
