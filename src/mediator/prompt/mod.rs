//! Prompt construction for the mediator persona.

pub mod prompt_builder;

pub use prompt_builder::{PARTNER_INSIGHTS_HEADING, USER_INSIGHTS_HEADING, build_instruction};
