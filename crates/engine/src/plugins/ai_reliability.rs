//! Scores model call sites: grounding, error handling, response
//! validation and sampling temperature.

use crate::plugin::{AnalyzerOutput, AnalyzerPlugin};
use crate::report::Finding;
use analysis::ProjectSnapshot;
use ir::{Severity, SignalKey, SignalMap};

const HIGH_TEMPERATURE: f64 = 0.7;

pub struct AiReliabilityPlugin;

impl AnalyzerPlugin for AiReliabilityPlugin {
    fn dimension(&self) -> &str {
        "ai_reliability"
    }

    fn analyze(&self, snapshot: &ProjectSnapshot) -> anyhow::Result<AnalyzerOutput> {
        let mut findings = Vec::new();
        let mut ungrounded = 0usize;
        let mut missing_handling = 0usize;
        let mut unvalidated = 0usize;
        let mut high_temperature = 0usize;

        for site in &snapshot.call_sites {
            if !site.has_error_handling {
                missing_handling += 1;
                findings.push(
                    Finding::new(
                        self.dimension(),
                        Severity::Major,
                        &format!("Missing error handling around {}", site.callee),
                        "The model call is not wrapped in error handling; a provider failure will propagate unchecked.",
                    )
                    .recommend("Wrap the call in a try/except (or equivalent) and handle provider errors explicitly.")
                    .at(&site.file, site.line),
                );
            }
            if !site.has_grounding {
                ungrounded += 1;
                findings.push(
                    Finding::new(
                        self.dimension(),
                        Severity::Minor,
                        &format!("Ungrounded call to {}", site.callee),
                        "No grounding keyword was found in the call's prompt arguments.",
                    )
                    .recommend("Include retrieved context or explicit grounding instructions in the prompt.")
                    .at(&site.file, site.line),
                );
            }
            if !site.has_response_validation {
                unvalidated += 1;
                findings.push(
                    Finding::new(
                        self.dimension(),
                        Severity::Minor,
                        &format!("Unvalidated response from {}", site.callee),
                        "The model response is used without a validation step nearby.",
                    )
                    .recommend("Validate the response shape before acting on it.")
                    .at(&site.file, site.line),
                );
            }
            if site.temperature.is_some_and(|t| t > HIGH_TEMPERATURE) {
                high_temperature += 1;
                findings.push(
                    Finding::new(
                        self.dimension(),
                        Severity::Minor,
                        &format!("High temperature on {}", site.callee),
                        "Sampling temperature above 0.7 makes output hard to reproduce.",
                    )
                    .at(&site.file, site.line),
                );
            }
        }

        let total = snapshot.call_sites.len();
        let mut signals = SignalMap::new();
        signals.set(SignalKey::TotalCallSites, total as f64);
        signals.set(SignalKey::UngroundedCalls, ungrounded as f64);
        signals.set(SignalKey::MissingErrorHandling, missing_handling as f64);
        signals.set(SignalKey::UnvalidatedResponses, unvalidated as f64);
        signals.set(SignalKey::HighTemperatureCalls, high_temperature as f64);

        // heuristic fallback score, superseded when a rule is configured
        let score = if total == 0 {
            5.0
        } else {
            let issues = (ungrounded + missing_handling + unvalidated + high_temperature) as f64;
            (5.0 - issues / total as f64 * 2.5).clamp(0.0, 5.0)
        };

        Ok(AnalyzerOutput {
            findings,
            score,
            signals,
        })
    }
}
