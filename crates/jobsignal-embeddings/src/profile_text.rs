//! Deterministic profile-text generators. Fixed ordering is mandatory:
//! profile text is a pure function of its inputs so that equal preferences
//! yield equal embeddings.

use jobsignal_core::types::{ExperienceLevel, SalaryPeriod};
use jobsignal_store::entities::{CanonicalPosting, Preferences};

const DESCRIPTION_SNIPPET_MAX: usize = 300;

fn period_word(p: SalaryPeriod) -> &'static str {
    match p {
        SalaryPeriod::Hourly => "hour",
        SalaryPeriod::Monthly => "month",
        SalaryPeriod::Annual => "year",
    }
}

/// Assembles sentences from the user's preferences in a fixed order,
/// joined with ". ". Empty components are omitted.
pub fn user_profile_text(prefs: &Preferences) -> String {
    let mut sentences = Vec::new();

    if !prefs.desired_roles.is_empty() {
        sentences.push(format!("Desired roles: {}", prefs.desired_roles.join(", ")));
    }
    if !prefs.job_categories.is_empty() {
        sentences.push(format!("Categories: {}", prefs.job_categories.join(", ")));
    }
    if !prefs.desired_locations.is_empty() {
        sentences.push(format!("Locations: {}", prefs.desired_locations.join(", ")));
    }
    if !prefs.work_arrangements.is_empty() {
        let arrangements: Vec<&str> = prefs.work_arrangements.iter().map(|w| w.as_str()).collect();
        sentences.push(format!("Work arrangement: {}", arrangements.join(", ")));
    }
    if !prefs.employment_types.is_empty() {
        let types: Vec<&str> = prefs.employment_types.iter().map(|e| e.as_str()).collect();
        sentences.push(format!("Employment type: {}", types.join(", ")));
    }
    if let Some(level) = prefs.experience_level {
        let years = prefs
            .years_experience
            .map(|y| format!(" ({y} years)"))
            .unwrap_or_default();
        sentences.push(format!("Experience level: {}{}", level.as_str(), years));
    }
    if prefs.desired_salary.min.is_some() || prefs.desired_salary.max.is_some() {
        let min = prefs.desired_salary.min.map(|v| v.to_string()).unwrap_or_default();
        let max = prefs.desired_salary.max.map(|v| v.to_string()).unwrap_or_default();
        let currency = prefs
            .desired_salary
            .currency
            .map(|c| c.as_str())
            .unwrap_or("");
        let period = prefs
            .desired_salary
            .period
            .map(period_word)
            .unwrap_or("month");
        sentences.push(format!("Desired salary: {min}-{max} {currency} per {period}"));
    }
    if !prefs.required_skills.is_empty() {
        sentences.push(format!("Required skills: {}", prefs.required_skills.join(", ")));
    }
    if !prefs.soft_skills.is_empty() {
        sentences.push(format!("Soft skills: {}", prefs.soft_skills.join(", ")));
    }
    if !prefs.industries.is_empty() {
        sentences.push(format!("Industries: {}", prefs.industries.join(", ")));
    }
    if prefs.willing_to_relocate {
        sentences.push("Willing to relocate".to_string());
    }

    sentences.join(". ")
}

fn years_word(levels: &[ExperienceLevel]) -> String {
    levels.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(", ")
}

/// Assembles sentences from a canonical posting's fields in a fixed order.
pub fn job_profile_text(job: &CanonicalPosting) -> String {
    let mut sentences = Vec::new();

    sentences.push(format!("{} at {}", job.title, job.company));
    if !job.alternate_titles.is_empty() {
        sentences.push(format!("Also known as: {}", job.alternate_titles.join(", ")));
    }
    if let Some(function) = &job.job_function {
        sentences.push(format!("Function: {function}"));
    }
    if !job.levels.is_empty() {
        sentences.push(format!("Level: {}", years_word(&job.levels)));
    }
    if !job.industries.is_empty() {
        sentences.push(format!("Industry: {}", job.industries.join(", ")));
    }

    let location_parts: Vec<&str> = [job.city.as_deref(), job.state.as_deref(), job.country.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !location_parts.is_empty() {
        sentences.push(format!("Location: {}", location_parts.join(", ")));
    }
    if let Some(arrangement) = job.work_arrangement {
        sentences.push(format!("Work arrangement: {}", arrangement.as_str()));
    }
    if job.remote_allowed {
        sentences.push("Remote allowed".to_string());
    }
    if !job.required_skills.is_empty() {
        sentences.push(format!("Required skills: {}", job.required_skills.join(", ")));
    }
    if !job.preferred_skills.is_empty() {
        sentences.push(format!("Preferred skills: {}", job.preferred_skills.join(", ")));
    }
    if let Some(years) = job.years_experience {
        sentences.push(format!("Experience: {}-{} years", years.min, years.max));
    }
    if let Some(salary) = &job.inferred_salary_range {
        let min = salary.min.map(|v| v.to_string()).unwrap_or_default();
        let max = salary.max.map(|v| v.to_string()).unwrap_or_default();
        sentences.push(format!(
            "Salary: {min}-{max} {} per {}",
            salary.currency.as_str(),
            period_word(salary.period)
        ));
    }

    if let Some(summary) = &job.summary {
        sentences.push(summary.clone());
    } else if !job.description.is_empty() {
        let snippet: String = job.description.chars().take(DESCRIPTION_SNIPPET_MAX).collect();
        sentences.push(snippet);
    }

    sentences.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsignal_core::types::UserId;

    #[test]
    fn equal_preferences_yield_identical_text() {
        let mut a = Preferences::empty(UserId::new());
        a.desired_roles = vec!["Sales Executive".into()];
        a.confirmed = true;
        let mut b = a.clone();
        b.user_id = a.user_id;
        assert_eq!(user_profile_text(&a), user_profile_text(&b));
    }

    #[test]
    fn empty_preferences_yield_empty_text() {
        let prefs = Preferences::empty(UserId::new());
        assert_eq!(user_profile_text(&prefs), "");
    }

    #[test]
    fn omits_empty_components() {
        let mut prefs = Preferences::empty(UserId::new());
        prefs.desired_roles = vec!["Engineer".into()];
        let text = user_profile_text(&prefs);
        assert!(text.contains("Desired roles: Engineer"));
        assert!(!text.contains("Locations"));
    }
}
