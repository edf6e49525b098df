//! Outbound message templates. Text-only, emoji-permitted, plaintext with
//! line breaks. Every optional field is omitted entirely (not rendered
//! blank) when absent.

use jobsignal_core::types::{ReminderStage, SalaryPeriod, SalaryRange};
use jobsignal_match::MatchOutcome;
use jobsignal_store::entities::{CanonicalPosting, Preferences};

fn period_word(p: SalaryPeriod) -> &'static str {
    match p {
        SalaryPeriod::Hourly => "hr",
        SalaryPeriod::Monthly => "mo",
        SalaryPeriod::Annual => "yr",
    }
}

fn format_salary(range: SalaryRange) -> String {
    let currency = range.currency.as_str();
    match (range.min, range.max) {
        (Some(min), Some(max)) if min != max => {
            format!("{currency} {min}–{max}/{}", period_word(range.period))
        }
        (Some(v), _) | (_, Some(v)) => format!("{currency} {v}/{}", period_word(range.period)),
        (None, None) => String::new(),
    }
}

/// Job alert: match percent header, title/company, optional
/// salary/location/experience/skills/summary/apply-url lines.
pub fn render_job_alert(job: &CanonicalPosting, outcome: &MatchOutcome) -> String {
    let mut lines = Vec::new();
    lines.push(format!("🎯 New match: {:.0}% fit", outcome.score.round()));
    lines.push(format!("**{}** at **{}**", job.title, job.company));

    if let Some(range) = job.inferred_salary_range.or(job.salary_range) {
        let formatted = format_salary(range);
        if !formatted.is_empty() {
            lines.push(format!("💰 {formatted}"));
        }
    }

    if !job.display_location.is_empty() {
        lines.push(format!("📍 {}", job.display_location));
    }

    if let Some(years) = job.years_experience {
        lines.push(format!("⏱️ {}-{} years", years.min, years.max));
    }

    let top_skills: Vec<&str> = job
        .required_skills
        .iter()
        .chain(job.preferred_skills.iter())
        .take(3)
        .map(|s| s.as_str())
        .collect();
    if !top_skills.is_empty() {
        lines.push(format!("🎯 {}", top_skills.join(", ")));
    }

    if let Some(summary) = &job.summary {
        lines.push(summary.clone());
    }

    if !job.posting_url.is_empty() {
        lines.push(job.posting_url.clone());
    }

    lines.join("\n")
}

/// Preference confirmation: echoes the structured summary back, closing
/// with a yes/no prompt before preferences are marked `confirmed`.
pub fn render_preference_confirmation(prefs: &Preferences) -> String {
    let mut lines = vec!["Here's what I've got so far:".to_string()];

    if !prefs.desired_roles.is_empty() {
        lines.push(format!("Roles: {}", prefs.desired_roles.join(", ")));
    }
    if !prefs.desired_locations.is_empty() {
        lines.push(format!("Locations: {}", prefs.desired_locations.join(", ")));
    }
    if !prefs.work_arrangements.is_empty() {
        let arrangements: Vec<&str> = prefs.work_arrangements.iter().map(|w| w.as_str()).collect();
        lines.push(format!("Work style: {}", arrangements.join(", ")));
    }
    if let Some(level) = prefs.experience_level {
        lines.push(format!("Experience level: {}", level.as_str()));
    }
    if let Some(min) = prefs.desired_salary.min {
        let currency = prefs.desired_salary.currency.map(|c| c.as_str()).unwrap_or("");
        lines.push(format!("Desired salary: {currency} {min}+"));
    }

    lines.push("Does this look right? Reply yes to confirm, or tell me what to change.".to_string());
    lines.join("\n")
}

/// Window reminders, one per stage S1-S5. S4/S5 carry explicit urgency phrasing.
pub fn render_reminder(stage: ReminderStage) -> String {
    match stage {
        ReminderStage::S1 => {
            "👋 Still looking for the right role? I'm here whenever you want to chat.".to_string()
        }
        ReminderStage::S2 => {
            "📋 Quick recap of what you're looking for — let me know if anything's changed.".to_string()
        }
        ReminderStage::S3 => {
            "⏳ Our 24-hour window is closing soon — reply to keep the conversation open.".to_string()
        }
        ReminderStage::S4 => {
            "⚠️ This is your last hour to reply before this conversation window closes.".to_string()
        }
        ReminderStage::S5 => {
            "🔔 Last call — reply now or this window closes and I'll need a fresh message from you to start again.".to_string()
        }
    }
}

/// Welcome message, offered when a user has no preferences yet.
pub fn render_welcome() -> String {
    "👋 Welcome! Tell me what kind of role you're looking for — title, location, and any must-haves — and I'll start matching you with postings.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobsignal_core::types::{
        CanonicalPostingId, Currency, RawPostingId, UserId, WorkArrangement, YearsRange,
    };

    fn job() -> CanonicalPosting {
        CanonicalPosting {
            id: CanonicalPostingId::new(),
            raw_id: RawPostingId::new(),
            title: "Sales Executive".into(),
            company: "TechCorp Nigeria".into(),
            display_location: "Lagos, Nigeria".into(),
            posting_url: "https://example.com/j/1".into(),
            description: "desc".into(),
            employment_type: None,
            salary_range: None,
            posted_date: Utc::now(),
            source: "test".into(),
            alternate_titles: vec![],
            required_skills: vec!["negotiation".into()],
            preferred_skills: vec![],
            industries: vec![],
            job_function: None,
            levels: vec![],
            city: Some("Lagos".into()),
            state: None,
            country: Some("Nigeria".into()),
            work_arrangement: Some(WorkArrangement::Hybrid),
            remote_allowed: false,
            inferred_salary_range: Some(SalaryRange {
                min: Some(220_000),
                max: Some(320_000),
                currency: Currency::Ngn,
                period: SalaryPeriod::Monthly,
            }),
            years_experience: Some(YearsRange { min: 0, max: 2 }),
            summary: Some("Drive new business across Lagos SMEs.".into()),
            embedding: None,
            scraped_at: Utc::now(),
            ai_enhanced: true,
        }
    }

    #[test]
    fn job_alert_includes_match_percent_and_all_optional_fields_present() {
        let outcome = MatchOutcome {
            score: 84.0,
            reasons: vec![],
            matcher: jobsignal_match::MatcherKind::Rule,
        };
        let text = render_job_alert(&job(), &outcome);
        assert!(text.contains("84%"));
        assert!(text.contains("Sales Executive"));
        assert!(text.contains("TechCorp Nigeria"));
        assert!(text.contains("NGN"));
        assert!(text.contains("Lagos"));
        assert!(text.contains(&job().posting_url));
    }

    #[test]
    fn job_alert_omits_missing_optional_fields() {
        let mut j = job();
        j.inferred_salary_range = None;
        j.salary_range = None;
        j.years_experience = None;
        j.summary = None;
        let outcome = MatchOutcome {
            score: 50.0,
            reasons: vec![],
            matcher: jobsignal_match::MatcherKind::Rule,
        };
        let text = render_job_alert(&j, &outcome);
        assert!(!text.contains('💰'));
        assert!(!text.contains('⏱'));
    }

    #[test]
    fn reminders_s4_and_s5_carry_explicit_urgency_phrasing() {
        assert!(render_reminder(ReminderStage::S4).contains("last hour"));
        assert!(render_reminder(ReminderStage::S5).contains("Last call"));
    }

    #[test]
    fn preference_confirmation_ends_with_yes_no_prompt() {
        let prefs = Preferences::empty(UserId::new());
        let text = render_preference_confirmation(&prefs);
        assert!(text.to_lowercase().contains("yes"));
    }
}
