//! System instruction for the mediator persona.
//!
//! The instruction is built from fixed text plus an optional context section
//! listing how many assessment responses each participant has recorded.
//! Output depends only on the inputs.

use crate::assessment::summary::AssessmentSummary;

/// Heading for the speaking user's assessment context.
pub const USER_INSIGHTS_HEADING: &str = "[User Profile Insights from Assessment]";
/// Heading for the partner's assessment context.
pub const PARTNER_INSIGHTS_HEADING: &str = "[Partner Profile Insights from Assessment]";

const PERSONA: &str = "You are Dr. Ponz, an AI mediator within Project Synapse - a relationship intelligence platform.

CORE PRINCIPLES (The Ethical Framework):
1. THE VAULT - Privacy is sacred. Never reveal or reference specific quiz answers unless the user shares them first.
2. THE MEDIATOR - You are neutral. You never take sides, never judge, never assign blame.
3. NON-COERCION - You guide, you don't push. You offer perspectives, not prescriptions.
4. TRANSPARENCY - Be clear about what you can and cannot do. You are not a therapist.";

const ROLE: &str = "YOUR ROLE:
- Facilitate understanding between partners
- Help translate emotional needs into clear communication
- De-escalate conflict with calm, measured responses
- Reflect back what you hear without judgment
- Ask clarifying questions to deepen understanding
- Offer reframes that honor both perspectives";

const STYLE: &str = "COMMUNICATION STYLE:
- Warm but professional
- Concise and clear
- Emotionally intelligent
- Never preachy or lecturing
- Use \"I notice...\" and \"It sounds like...\" constructions
- Avoid definitive statements about feelings - ask instead";

const CLOSING: &str = "Remember: You are the bridge, not the destination. Your job is to help partners see each other more clearly.";

const SECTION_SEPARATOR: &str = "\n\n";

/// Build the full system instruction for one turn.
///
/// Modules with no recorded responses are skipped, and a heading is only
/// written when at least one line follows it.
#[must_use]
pub fn build_instruction(
    self_summaries: Option<&[AssessmentSummary]>,
    partner_summaries: Option<&[AssessmentSummary]>,
) -> String {
    let sections = [
        Some(PERSONA.to_string()),
        Some(ROLE.to_string()),
        Some(STYLE.to_string()),
        render_context(USER_INSIGHTS_HEADING, self_summaries),
        render_context(PARTNER_INSIGHTS_HEADING, partner_summaries),
        Some(CLOSING.to_string()),
    ];

    let mut out = String::with_capacity(2048);
    for section in sections.into_iter().flatten() {
        if !out.is_empty() {
            out.push_str(SECTION_SEPARATOR);
        }
        out.push_str(&section);
    }
    out
}

fn render_context(heading: &str, summaries: Option<&[AssessmentSummary]>) -> Option<String> {
    let lines: Vec<String> = summaries
        .unwrap_or_default()
        .iter()
        .filter(|summary| summary.response_count > 0)
        .map(render_line)
        .collect();

    if lines.is_empty() {
        return None;
    }

    let mut out = String::from(heading);
    for line in &lines {
        out.push('\n');
        out.push_str(line);
    }
    Some(out)
}

fn render_line(summary: &AssessmentSummary) -> String {
    format!(
        "- {}: {} responses recorded",
        summary.title, summary.response_count
    )
}
