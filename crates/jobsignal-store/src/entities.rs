use chrono::{DateTime, Utc};
use jobsignal_core::types::{
    CanonicalPostingId, Currency, Embedding, EmploymentType, ExperienceLevel, RawPostingId,
    ReminderStage, SalaryPeriod, SalaryRange, UserId, WindowId, WindowStatus, WorkArrangement,
    YearsRange,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub handle: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SalaryPreference {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub currency: Option<Currency>,
    pub period: Option<SalaryPeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub user_id: UserId,
    pub desired_roles: Vec<String>,
    pub job_categories: Vec<String>,
    pub desired_locations: Vec<String>,
    pub willing_to_relocate: bool,
    pub work_arrangements: Vec<WorkArrangement>,
    pub employment_types: Vec<EmploymentType>,
    pub experience_level: Option<ExperienceLevel>,
    pub years_experience: Option<u32>,
    pub desired_salary: SalaryPreference,
    pub required_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub industries: Vec<String>,
    pub confirmed: bool,
    pub embedding: Option<Embedding>,
}

impl Preferences {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            desired_roles: Vec::new(),
            job_categories: Vec::new(),
            desired_locations: Vec::new(),
            willing_to_relocate: false,
            work_arrangements: Vec::new(),
            employment_types: Vec::new(),
            experience_level: None,
            years_experience: None,
            desired_salary: SalaryPreference::default(),
            required_skills: Vec::new(),
            soft_skills: Vec::new(),
            industries: Vec::new(),
            confirmed: false,
            embedding: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPosting {
    pub id: RawPostingId,
    pub source: String,
    pub source_id: String,
    pub payload: serde_json::Value,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub processed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalPosting {
    pub id: CanonicalPostingId,
    pub raw_id: RawPostingId,

    // direct fields
    pub title: String,
    pub company: String,
    pub display_location: String,
    pub posting_url: String,
    pub description: String,
    pub employment_type: Option<EmploymentType>,
    pub salary_range: Option<SalaryRange>,
    pub posted_date: DateTime<Utc>,
    pub source: String,

    // inferred fields
    pub alternate_titles: Vec<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub industries: Vec<String>,
    pub job_function: Option<String>,
    pub levels: Vec<ExperienceLevel>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub work_arrangement: Option<WorkArrangement>,
    pub remote_allowed: bool,
    pub inferred_salary_range: Option<SalaryRange>,
    pub years_experience: Option<YearsRange>,
    pub summary: Option<String>,
    pub embedding: Option<Embedding>,

    pub scraped_at: DateTime<Utc>,
    pub ai_enhanced: bool,
}

impl CanonicalPosting {
    pub fn location_fields(&self) -> Vec<&str> {
        let mut v = vec![self.display_location.as_str()];
        if let Some(c) = &self.city {
            v.push(c.as_str());
        }
        if let Some(s) = &self.state {
            v.push(s.as_str());
        }
        if let Some(c) = &self.country {
            v.push(c.as_str());
        }
        v
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeliveryHistoryRow {
    pub user_id: UserId,
    pub canonical_posting_id: CanonicalPostingId,
    pub score: f64,
    pub stage: jobsignal_core::types::DeliveryStage,
    pub sent: bool,
    pub shown_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationWindow {
    pub id: WindowId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub status: WindowStatus,
    pub stages_sent: Vec<ReminderStage>,
    pub messages_in_window: u32,
}

impl ConversationWindow {
    pub fn has_sent(&self, stage: ReminderStage) -> bool {
        self.stages_sent.iter().any(|s| *s == stage)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReminderLogRow {
    pub user_id: UserId,
    pub window_id: WindowId,
    pub stage: ReminderStage,
    pub sent_at: DateTime<Utc>,
}
