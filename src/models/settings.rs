//! Company-wide settings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Stage label for closed-won deals.
pub const WON_STAGE: &str = "Won";
/// Stage label for closed-lost deals.
pub const LOST_STAGE: &str = "Lost";
/// Stage label for freshly captured leads.
pub const NEW_STAGE: &str = "New";

/// Process-wide configuration: company name, lead sources and pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(rename = "companyName")]
    pub company_name: String,
    pub lead_sources: Vec<String>,
    /// Ordered stage labels; also the domain of `Lead::status`.
    pub pipeline_stages: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            company_name: "Dronetribes".to_string(),
            lead_sources: ["Website", "Referral", "Cold Call", "Trade Show", "Partner"]
                .into_iter()
                .map(String::from)
                .collect(),
            pipeline_stages: [
                NEW_STAGE,
                "Contacted",
                "Proposal",
                "Negotiation",
                WON_STAGE,
                LOST_STAGE,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Settings {
    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = name.into();
        self
    }

    pub fn has_stage(&self, stage: &str) -> bool {
        self.pipeline_stages.iter().any(|s| s == stage)
    }

    pub fn stage_index(&self, stage: &str) -> Option<usize> {
        self.pipeline_stages.iter().position(|s| s == stage)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.company_name.trim().is_empty() {
            return Err(AppError::Validation("Company name is required.".to_string()));
        }
        if self.pipeline_stages.is_empty() {
            return Err(AppError::Validation(
                "At least one pipeline stage is required.".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for stage in &self.pipeline_stages {
            if stage.trim().is_empty() {
                return Err(AppError::Validation("Pipeline stages cannot be blank.".to_string()));
            }
            if !seen.insert(stage.as_str()) {
                return Err(AppError::Validation(format!(
                    "Duplicate pipeline stage: {}",
                    stage
                )));
            }
        }
        Ok(())
    }
}
