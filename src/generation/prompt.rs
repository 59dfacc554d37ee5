//! Generation prompt assembly.

use serde::{Deserialize, Serialize};

/// Restricts a generation run to one month and a set of weeks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationScope {
    pub month: String,
    pub weeks: Vec<u32>,
}

impl GenerationScope {
    /// Scope sentence, or `None` when month or weeks are missing.
    #[must_use]
    pub fn requirement(&self) -> Option<String> {
        let month = self.month.trim();
        if month.is_empty() || self.weeks.is_empty() {
            return None;
        }

        let mut weeks = self.weeks.clone();
        weeks.sort_unstable();
        weeks.dedup();
        let week_text = weeks
            .iter()
            .map(|week| format!("Week {week}"))
            .collect::<Vec<_>>()
            .join(", ");

        Some(format!(
            "Generation scope requirement: Month is {month}. Generate only for {week_text}. \
             If week labels are included in output, use only the selected week numbers."
        ))
    }
}

/// Wrap the runbook text into the prompt sent to the agent.
#[must_use]
pub fn build_generation_prompt(runbook: &str, scope: Option<&GenerationScope>) -> String {
    let mut prompt = String::from(
        "Run the SMARCOMMS runbook now from the current workspace root. \
         Follow all rules exactly and generate graphic post idea files for eligible clients.\n\n",
    );
    if let Some(requirement) = scope.and_then(GenerationScope::requirement) {
        prompt.push_str(&requirement);
        prompt.push_str("\n\n");
    }
    prompt.push_str("BEGIN SMARCOMMS.md\n");
    prompt.push_str(runbook);
    prompt.push_str("\nEND SMARCOMMS.md\n");
    prompt
}
