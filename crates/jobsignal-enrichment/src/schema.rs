//! Strict JSON response schema the enrichment model must produce.

use serde::{Deserialize, Serialize};

use jobsignal_core::types::WorkArrangement;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentModelResponse {
    pub ai_job_titles: Vec<String>,
    pub ai_required_skills: Vec<String>,
    pub ai_preferred_skills: Vec<String>,
    pub ai_industry: Vec<String>,
    pub ai_job_function: String,
    pub ai_job_level: Vec<String>,
    pub ai_city: String,
    pub ai_state: String,
    pub ai_country: String,
    pub ai_work_arrangement: String,
    pub ai_remote_allowed: bool,
    pub ai_salary_min: Option<i64>,
    pub ai_salary_max: Option<i64>,
    pub ai_salary_currency: Option<String>,
    pub ai_years_experience_min: Option<i64>,
    pub ai_years_experience_max: Option<i64>,
    pub ai_summary: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("ai_job_titles must contain at least one title")]
    MissingTitle,
    #[error("ai_work_arrangement {0:?} is not one of remote/hybrid/on-site")]
    InvalidWorkArrangement(String),
    #[error("ai_summary exceeds 280 characters ({0})")]
    SummaryTooLong(usize),
}

/// Validates the model's response against the schema's closed constraints:
/// a non-empty title array, a recognized work-arrangement enum value, and
/// a summary within the 280-char cap.
pub fn validate(resp: &EnrichmentModelResponse) -> Result<WorkArrangement, SchemaError> {
    if resp.ai_job_titles.is_empty() {
        return Err(SchemaError::MissingTitle);
    }
    let arrangement = WorkArrangement::parse(&resp.ai_work_arrangement)
        .ok_or_else(|| SchemaError::InvalidWorkArrangement(resp.ai_work_arrangement.clone()))?;
    if resp.ai_summary.chars().count() > 280 {
        return Err(SchemaError::SummaryTooLong(resp.ai_summary.chars().count()));
    }
    Ok(arrangement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnrichmentModelResponse {
        EnrichmentModelResponse {
            ai_job_titles: vec!["Sales Executive".into()],
            ai_required_skills: vec![],
            ai_preferred_skills: vec![],
            ai_industry: vec![],
            ai_job_function: "Sales".into(),
            ai_job_level: vec!["mid".into()],
            ai_city: "Lagos".into(),
            ai_state: "Lagos".into(),
            ai_country: "Nigeria".into(),
            ai_work_arrangement: "hybrid".into(),
            ai_remote_allowed: false,
            ai_salary_min: None,
            ai_salary_max: None,
            ai_salary_currency: None,
            ai_years_experience_min: None,
            ai_years_experience_max: None,
            ai_summary: "Short summary".into(),
        }
    }

    #[test]
    fn valid_response_parses_work_arrangement() {
        let resp = sample();
        assert_eq!(validate(&resp).unwrap(), WorkArrangement::Hybrid);
    }

    #[test]
    fn empty_titles_is_rejected() {
        let mut resp = sample();
        resp.ai_job_titles.clear();
        assert!(validate(&resp).is_err());
    }

    #[test]
    fn oversized_summary_is_rejected() {
        let mut resp = sample();
        resp.ai_summary = "x".repeat(281);
        assert!(matches!(validate(&resp), Err(SchemaError::SummaryTooLong(281))));
    }

    #[test]
    fn unrecognized_work_arrangement_is_rejected() {
        let mut resp = sample();
        resp.ai_work_arrangement = "flexible".into();
        assert!(validate(&resp).is_err());
    }
}
