//! Rule Matcher: fallback matcher when a user or candidate job lacks an
//! embedding. Location is a hard pre-score filter; every other factor
//! contributes to a weighted sum capped at 100.

use jobsignal_core::tables::match_location;
use jobsignal_core::types::{Currency, ExperienceLevel, WorkArrangement, YearsRange};
use jobsignal_store::entities::{CanonicalPosting, Preferences};

use crate::types::{MatchOutcome, MatcherKind};

const TITLE_MAX: f64 = 35.0;
const WORK_ARRANGEMENT_MAX: f64 = 20.0;
const SALARY_MAX: f64 = 20.0;
const EXPERIENCE_MAX: f64 = 10.0;
const JOB_FUNCTION_MAX: f64 = 7.0;
const INDUSTRY_MAX: f64 = 5.0;
const SKILLS_MAX: f64 = 20.0;
const SEMANTIC_CLUSTER_MAX: f64 = 5.0;

/// Sales-family role/industry co-occurrence terms ("sales-family special
/// cases").
const SALES_TERMS: &[&str] = &[
    "sales",
    "business development",
    "account executive",
    "account manager",
    "bd",
];

const SALES_FRIENDLY_INDUSTRIES: &[&str] = &[
    "retail",
    "fmcg",
    "telecom",
    "telecommunications",
    "banking",
    "insurance",
    "real estate",
    "hospitality",
];

/// Location hard filter. `None` means the job is excluded entirely and
/// must not be scored.
pub fn passes_location_filter(prefs: &Preferences, job: &CanonicalPosting) -> bool {
    if prefs.desired_locations.is_empty() {
        return true;
    }
    if prefs.work_arrangements.contains(&WorkArrangement::Remote)
        && (job.work_arrangement == Some(WorkArrangement::Remote) || job.remote_allowed)
    {
        return true;
    }
    if prefs.willing_to_relocate && !job.location_fields().iter().all(|f| f.is_empty()) {
        return true;
    }

    let fields = job.location_fields();
    prefs
        .desired_locations
        .iter()
        .any(|loc| match_location(loc, &fields).is_some())
}

fn is_sales_text(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    SALES_TERMS.iter().any(|t| lower.contains(t))
}

fn title_factor(prefs: &Preferences, job: &CanonicalPosting) -> f64 {
    if prefs.desired_roles.is_empty() {
        return TITLE_MAX * 0.2;
    }

    let mut candidates: Vec<&str> = vec![job.title.as_str()];
    candidates.extend(job.alternate_titles.iter().map(|s| s.as_str()));

    let mut best = 0.0f64;
    for role in &prefs.desired_roles {
        for candidate in &candidates {
            let sim = strsim::jaro_winkler(&role.to_ascii_lowercase(), &candidate.to_ascii_lowercase());
            if sim > best {
                best = sim;
            }
        }
    }

    let mut score = best * TITLE_MAX;

    let user_is_sales = prefs.desired_roles.iter().any(|r| is_sales_text(r));
    let job_is_sales = is_sales_text(&job.title) || job.alternate_titles.iter().any(|t| is_sales_text(t));
    if user_is_sales && job_is_sales {
        score = (score + 5.0).min(TITLE_MAX);
    }

    score
}

fn work_arrangement_factor(prefs: &Preferences, job: &CanonicalPosting) -> f64 {
    let Some(job_arrangement) = job.work_arrangement else {
        return WORK_ARRANGEMENT_MAX * 0.5;
    };
    if prefs.work_arrangements.is_empty() {
        return WORK_ARRANGEMENT_MAX * 0.75;
    }
    if prefs.work_arrangements.contains(&job_arrangement) {
        return WORK_ARRANGEMENT_MAX;
    }
    if prefs.work_arrangements.contains(&WorkArrangement::Hybrid) {
        return 18.0;
    }
    0.0
}

fn salary_factor(prefs: &Preferences, job: &CanonicalPosting) -> f64 {
    if prefs.desired_salary.min.is_none() && prefs.desired_salary.max.is_none() {
        return SALARY_MAX;
    }
    let Some(job_range) = job.inferred_salary_range.or(job.salary_range) else {
        return SALARY_MAX * 0.5;
    };

    let user_currency = prefs.desired_salary.currency.unwrap_or(Currency::Usd);
    let to_user = |amount: i64, from: Currency| -> f64 {
        jobsignal_core::tables::convert(amount as f64, from, user_currency).unwrap_or(0.0)
    };

    let job_min = to_user(job_range.min.unwrap_or(0), job_range.currency);
    let job_max = to_user(
        job_range.max.unwrap_or(job_range.min.unwrap_or(0)),
        job_range.currency,
    );

    let user_min = prefs.desired_salary.min.unwrap_or(0) as f64;
    let user_max = prefs
        .desired_salary
        .max
        .map(|m| m as f64)
        .unwrap_or(f64::INFINITY);

    let tol_min = user_min * 0.8;
    let tol_max = if user_max.is_infinite() {
        f64::INFINITY
    } else {
        user_max * 1.2
    };

    let overlaps = tol_min <= job_max && tol_max >= job_min;
    if overlaps {
        return SALARY_MAX;
    }

    let gap = if job_max < tol_min {
        tol_min - job_max
    } else {
        job_min - tol_max
    };
    let scale = job_max.max(tol_min).max(1.0);
    let ratio = (gap / scale).min(1.0);
    (SALARY_MAX * (1.0 - ratio)).max(0.0)
}

fn years_credit_for_zero(job_years: &YearsRange) -> f64 {
    match job_years.max {
        0 => 10.0,
        1 => 8.0,
        2 => 6.0,
        3 => 4.0,
        _ => 0.0,
    }
}

fn experience_factor(prefs: &Preferences, job: &CanonicalPosting) -> f64 {
    let level_credit = match prefs.experience_level {
        Some(pl) if !job.levels.is_empty() => {
            let min_dist = job.levels.iter().map(|jl| pl.distance(jl)).min().unwrap_or(0);
            match min_dist {
                0 => 10.0,
                1 => 7.0,
                2 => 4.0,
                3 => 1.0,
                _ => 0.0,
            }
        }
        _ => 5.0,
    };

    let years_credit = match (prefs.years_experience, job.years_experience) {
        (Some(0), Some(job_years)) => years_credit_for_zero(&job_years),
        (Some(y), Some(job_years)) => {
            if y >= job_years.min && y <= job_years.max {
                10.0
            } else {
                let dist = if y < job_years.min {
                    job_years.min - y
                } else {
                    y - job_years.max
                };
                (10.0 - dist as f64 * 2.0).max(0.0)
            }
        }
        _ => 7.0,
    };

    ((level_credit + years_credit) / 2.0).min(EXPERIENCE_MAX)
}

fn job_function_factor(prefs: &Preferences, job: &CanonicalPosting) -> f64 {
    if prefs.job_categories.is_empty() {
        return JOB_FUNCTION_MAX * 0.5;
    }
    let Some(job_function) = &job.job_function else {
        return JOB_FUNCTION_MAX * 0.5;
    };
    let jf = job_function.to_ascii_lowercase();
    if prefs.job_categories.iter().any(|c| c.to_ascii_lowercase() == jf) {
        return JOB_FUNCTION_MAX;
    }
    if prefs.job_categories.iter().any(|c| {
        let c = c.to_ascii_lowercase();
        c.contains(&jf) || jf.contains(&c)
    }) {
        return JOB_FUNCTION_MAX * 0.6;
    }
    0.0
}

fn industry_factor(prefs: &Preferences, job: &CanonicalPosting, sales_role: bool) -> f64 {
    if prefs.industries.is_empty() {
        return INDUSTRY_MAX * 0.5;
    }
    let exact = job
        .industries
        .iter()
        .any(|ji| prefs.industries.iter().any(|pi| pi.eq_ignore_ascii_case(ji)));
    if exact {
        return INDUSTRY_MAX;
    }
    if sales_role
        && job
            .industries
            .iter()
            .any(|ji| SALES_FRIENDLY_INDUSTRIES.contains(&ji.to_ascii_lowercase().as_str()))
    {
        return INDUSTRY_MAX * 0.6;
    }
    0.0
}

fn skills_factor(prefs: &Preferences, job: &CanonicalPosting) -> f64 {
    if job.required_skills.is_empty() && job.preferred_skills.is_empty() {
        return SKILLS_MAX * 0.5;
    }
    let user_skills: Vec<String> = prefs
        .required_skills
        .iter()
        .chain(prefs.soft_skills.iter())
        .map(|s| s.to_ascii_lowercase())
        .collect();

    let required_matches = job
        .required_skills
        .iter()
        .filter(|js| user_skills.iter().any(|us| us == &js.to_ascii_lowercase()))
        .count() as f64;
    let preferred_matches = job
        .preferred_skills
        .iter()
        .filter(|js| user_skills.iter().any(|us| us == &js.to_ascii_lowercase()))
        .count() as f64;

    let weighted = required_matches * 1.5 + preferred_matches;
    let possible = job.required_skills.len() as f64 * 1.5 + job.preferred_skills.len() as f64;
    if possible <= 0.0 {
        return SKILLS_MAX * 0.5;
    }
    (weighted / possible * SKILLS_MAX).min(SKILLS_MAX)
}

fn semantic_cluster_factor(title_score: f64, function_score: f64, industry_score: f64) -> f64 {
    if title_score < TITLE_MAX * 0.2 && (function_score > 0.0 || industry_score > 0.0) {
        SEMANTIC_CLUSTER_MAX
    } else {
        0.0
    }
}

/// Scores one (user, job) pair. `None` means the job failed the location
/// hard filter and must not be considered at all (not "scored zero").
pub fn score(prefs: &Preferences, job: &CanonicalPosting) -> Option<MatchOutcome> {
    if !passes_location_filter(prefs, job) {
        return None;
    }

    let sales_role = prefs.desired_roles.iter().any(|r| is_sales_text(r));

    let title = title_factor(prefs, job);
    let work_arrangement = work_arrangement_factor(prefs, job);
    let salary = salary_factor(prefs, job);
    let experience = experience_factor(prefs, job);
    let job_function = job_function_factor(prefs, job);
    let industry = industry_factor(prefs, job, sales_role);
    let skills = skills_factor(prefs, job);
    let semantic_cluster = semantic_cluster_factor(title, job_function, industry);

    let total = (title
        + work_arrangement
        + salary
        + experience
        + job_function
        + industry
        + skills
        + semantic_cluster)
        .min(100.0)
        .max(0.0);

    let mut reasons = Vec::new();
    if title >= TITLE_MAX * 0.5 {
        reasons.push(format!("alternate titles match (~{:.0}/{:.0})", title, TITLE_MAX));
    }
    if work_arrangement >= WORK_ARRANGEMENT_MAX * 0.5 {
        reasons.push("work arrangement matches preference".to_string());
    }
    if salary >= SALARY_MAX * 0.5 {
        reasons.push("salary range overlaps preference".to_string());
    }
    if experience >= EXPERIENCE_MAX * 0.5 {
        reasons.push("experience level and years compatible".to_string());
    }
    if job_function >= JOB_FUNCTION_MAX * 0.5 {
        reasons.push("job function matches a desired category".to_string());
    }
    if industry >= INDUSTRY_MAX * 0.5 {
        reasons.push("industry matches preference".to_string());
    }
    if skills >= SKILLS_MAX * 0.5 {
        reasons.push("required/preferred skills overlap".to_string());
    }
    if semantic_cluster >= SEMANTIC_CLUSTER_MAX * 0.5 {
        reasons.push("matched via semantic cluster fallback".to_string());
    }

    Some(MatchOutcome {
        score: total,
        reasons,
        matcher: MatcherKind::Rule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobsignal_core::types::{
        CanonicalPostingId, EmploymentType, RawPostingId, SalaryPeriod, SalaryRange, UserId,
    };
    use jobsignal_store::entities::SalaryPreference;

    fn base_prefs() -> Preferences {
        Preferences::empty(UserId::new())
    }

    fn base_job() -> CanonicalPosting {
        CanonicalPosting {
            id: CanonicalPostingId::new(),
            raw_id: RawPostingId::new(),
            title: "Software Engineer".into(),
            company: "Acme".into(),
            display_location: "Lagos, Nigeria".into(),
            posting_url: "https://example.com/job".into(),
            description: "Build things.".into(),
            employment_type: Some(EmploymentType::FullTime),
            salary_range: None,
            posted_date: Utc::now(),
            source: "test".into(),
            alternate_titles: vec![],
            required_skills: vec![],
            preferred_skills: vec![],
            industries: vec![],
            job_function: None,
            levels: vec![],
            city: Some("Lagos".into()),
            state: None,
            country: Some("Nigeria".into()),
            work_arrangement: Some(WorkArrangement::OnSite),
            remote_allowed: false,
            inferred_salary_range: None,
            years_experience: None,
            summary: None,
            embedding: None,
            scraped_at: Utc::now(),
            ai_enhanced: false,
        }
    }

    #[test]
    fn no_location_preference_passes_filter() {
        let prefs = base_prefs();
        let job = base_job();
        assert!(passes_location_filter(&prefs, &job));
    }

    #[test]
    fn mismatched_location_without_remote_or_relocate_fails_filter() {
        let mut prefs = base_prefs();
        prefs.desired_locations = vec!["Kano".into()];
        let job = base_job();
        assert!(!passes_location_filter(&prefs, &job));
        assert!(score(&prefs, &job).is_none());
    }

    #[test]
    fn remote_preference_bypasses_location_mismatch() {
        let mut prefs = base_prefs();
        prefs.desired_locations = vec!["Kano".into()];
        prefs.work_arrangements = vec![WorkArrangement::Remote];
        let mut job = base_job();
        job.work_arrangement = Some(WorkArrangement::Remote);
        assert!(passes_location_filter(&prefs, &job));
    }

    #[test]
    fn willing_to_relocate_bypasses_location_mismatch() {
        let mut prefs = base_prefs();
        prefs.desired_locations = vec!["Kano".into()];
        prefs.willing_to_relocate = true;
        let job = base_job();
        assert!(passes_location_filter(&prefs, &job));
    }

    #[test]
    fn abbreviation_location_match_passes_filter() {
        let mut prefs = base_prefs();
        prefs.desired_locations = vec!["LOS".into()];
        let job = base_job();
        assert!(passes_location_filter(&prefs, &job));
    }

    #[test]
    fn total_score_is_clipped_at_one_hundred() {
        let mut prefs = base_prefs();
        prefs.desired_roles = vec!["Software Engineer".into()];
        prefs.work_arrangements = vec![WorkArrangement::OnSite];
        prefs.experience_level = Some(ExperienceLevel::Mid);
        prefs.years_experience = Some(3);
        prefs.job_categories = vec!["Engineering".into()];
        prefs.industries = vec!["Tech".into()];
        prefs.required_skills = vec!["rust".into()];

        let mut job = base_job();
        job.job_function = Some("Engineering".into());
        job.industries = vec!["Tech".into()];
        job.levels = vec![ExperienceLevel::Mid];
        job.years_experience = Some(YearsRange { min: 2, max: 4 });
        job.required_skills = vec!["rust".into()];

        let outcome = score(&prefs, &job).unwrap();
        assert!(outcome.score <= 100.0);
    }

    #[test]
    fn years_zero_gets_graduated_credit_against_low_requirement_job() {
        let mut prefs = base_prefs();
        prefs.years_experience = Some(0);
        let mut job = base_job();
        job.years_experience = Some(YearsRange { min: 0, max: 2 });
        let credit = experience_factor(&prefs, &job);
        // level_credit baseline (5.0) + years credit (6.0) / 2 = 5.5
        assert!((credit - 5.5).abs() < 1e-9);
    }

    #[test]
    fn missing_job_salary_gets_fair_baseline() {
        let mut prefs = base_prefs();
        prefs.desired_salary = SalaryPreference {
            min: Some(100_000),
            max: Some(200_000),
            currency: Some(Currency::Ngn),
            period: Some(SalaryPeriod::Monthly),
        };
        let job = base_job();
        assert!((salary_factor(&prefs, &job) - SALARY_MAX * 0.5).abs() < 1e-9);
    }

    #[test]
    fn overlapping_salary_after_conversion_scores_max() {
        let mut prefs = base_prefs();
        prefs.desired_salary = SalaryPreference {
            min: Some(300_000),
            max: Some(600_000),
            currency: Some(Currency::Ngn),
            period: Some(SalaryPeriod::Monthly),
        };
        let mut job = base_job();
        job.salary_range = Some(SalaryRange {
            min: Some(300_000),
            max: Some(600_000),
            currency: Currency::Ngn,
            period: SalaryPeriod::Monthly,
        });
        assert_eq!(salary_factor(&prefs, &job), SALARY_MAX);
    }

    #[test]
    fn sales_family_titles_get_co_occurrence_bonus() {
        let mut prefs = base_prefs();
        prefs.desired_roles = vec!["Sales Executive".into()];
        let mut job = base_job();
        job.title = "Business Development Representative".into();
        let with_bonus = title_factor(&prefs, &job);

        let mut job_non_sales = job.clone();
        job_non_sales.title = "Business Analyst".into();
        let without_bonus = title_factor(&prefs, &job_non_sales);

        assert!(with_bonus >= without_bonus);
    }
}
