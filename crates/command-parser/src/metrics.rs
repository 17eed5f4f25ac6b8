use crate::fallback::is_fallback_result;
use crate::parser::{ParseOutcome, ParseResult};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct ParserMetrics {
    pub registry: Registry,
    pub parsed: IntCounter,
    pub clarifications: IntCounter,
    pub failed: IntCounter,
    pub fallback_overrides: IntCounter,
    pub routines_defined: IntGauge,
}

fn counter(name: &str, help: &str) -> Result<IntCounter, String> {
    IntCounter::new(name, help).map_err(|e| format!("metrics init error: {e}"))
}

impl ParserMetrics {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let parsed = counter("fll_commands_parsed", "Commands that produced code")?;
        let clarifications = counter(
            "fll_commands_clarification",
            "Commands waiting on a missing value",
        )?;
        let failed = counter("fll_commands_failed", "Empty or unrecognized commands")?;
        let fallback_overrides = counter(
            "fll_fallback_overrides",
            "Commands answered by the fallback parser",
        )?;
        let routines_defined = IntGauge::new("fll_routines_defined", "Routines in the library")
            .map_err(|e| format!("metrics init error: {e}"))?;

        let _ = registry.register(Box::new(parsed.clone()));
        let _ = registry.register(Box::new(clarifications.clone()));
        let _ = registry.register(Box::new(failed.clone()));
        let _ = registry.register(Box::new(fallback_overrides.clone()));
        let _ = registry.register(Box::new(routines_defined.clone()));
        Ok(Self {
            registry,
            parsed,
            clarifications,
            failed,
            fallback_overrides,
            routines_defined,
        })
    }

    pub fn record(&self, result: &ParseResult) {
        match result.outcome {
            ParseOutcome::Code(_) => {
                self.parsed.inc();
                if is_fallback_result(result) {
                    self.fallback_overrides.inc();
                }
            }
            ParseOutcome::Clarification(_) => self.clarifications.inc(),
            ParseOutcome::Failed(_) => self.failed.inc(),
        }
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_command, CommandType, RobotDefaults};

    #[test]
    fn test_record_outcomes() {
        let metrics = ParserMetrics::new().unwrap();
        let defaults = RobotDefaults::default();
        for text in ["stop", "move forward", "", "wait 1"] {
            metrics.record(&parse_command(text, &defaults));
        }
        metrics.record(&ParseResult::code("robot.stop()", 0.99, CommandType::Fallback));

        assert_eq!(metrics.parsed.get(), 3);
        assert_eq!(metrics.clarifications.get(), 1);
        assert_eq!(metrics.failed.get(), 1);
        assert_eq!(metrics.fallback_overrides.get(), 1);
    }

    #[test]
    fn test_encode_text() {
        let metrics = ParserMetrics::new().unwrap();
        metrics.parsed.inc();
        metrics.routines_defined.set(2);
        let text = metrics.encode_text();
        assert!(text.contains("fll_commands_parsed 1"));
        assert!(text.contains("fll_routines_defined 2"));
    }
}
