//! Scenario tests for the full mediation pipeline.

mod answer_flow;
mod support;
