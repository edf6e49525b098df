use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(RawPostingId);
uuid_id!(CanonicalPostingId);
uuid_id!(WindowId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    OnSite,
}

impl WorkArrangement {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkArrangement::Remote => "remote",
            WorkArrangement::Hybrid => "hybrid",
            WorkArrangement::OnSite => "on-site",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Some(WorkArrangement::Remote),
            "hybrid" => Some(WorkArrangement::Hybrid),
            "on-site" | "onsite" | "on_site" => Some(WorkArrangement::OnSite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
    Temporary,
    Volunteer,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full-time",
            EmploymentType::PartTime => "part-time",
            EmploymentType::Contract => "contract",
            EmploymentType::Internship => "internship",
            EmploymentType::Freelance => "freelance",
            EmploymentType::Temporary => "temporary",
            EmploymentType::Volunteer => "volunteer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "full-time" => Some(EmploymentType::FullTime),
            "part-time" => Some(EmploymentType::PartTime),
            "contract" => Some(EmploymentType::Contract),
            "internship" => Some(EmploymentType::Internship),
            "freelance" => Some(EmploymentType::Freelance),
            "temporary" => Some(EmploymentType::Temporary),
            "volunteer" => Some(EmploymentType::Volunteer),
            _ => None,
        }
    }
}

/// Experience level, ordered low to high. The numeric ordinal backs the
/// adjacency scoring in the rule matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Junior,
    Mid,
    Senior,
    Lead,
    Executive,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
            ExperienceLevel::Lead => "lead",
            ExperienceLevel::Executive => "executive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "entry" => Some(ExperienceLevel::Entry),
            "junior" => Some(ExperienceLevel::Junior),
            "mid" | "mid-level" | "intermediate" => Some(ExperienceLevel::Mid),
            "senior" => Some(ExperienceLevel::Senior),
            "lead" => Some(ExperienceLevel::Lead),
            "executive" | "exec" => Some(ExperienceLevel::Executive),
            _ => None,
        }
    }

    /// Distance between two levels on the ordinal scale, used for adjacency
    /// credit in the rule matcher.
    pub fn distance(&self, other: &ExperienceLevel) -> i32 {
        (*self as i32 - *other as i32).abs()
    }
}

/// ISO-ish 4217-style currency tag, restricted to the pairs the static
/// conversion table covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ngn,
    Eur,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ngn => "NGN",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::Usd),
            "NGN" => Some(Currency::Ngn),
            "EUR" => Some(Currency::Eur),
            "GBP" => Some(Currency::Gbp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryPeriod {
    Hourly,
    Monthly,
    Annual,
}

impl SalaryPeriod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" | "hour" | "hr" => Some(SalaryPeriod::Hourly),
            "monthly" | "month" | "mo" => Some(SalaryPeriod::Monthly),
            "annual" | "annually" | "year" | "yearly" | "yr" => Some(SalaryPeriod::Annual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub currency: Currency,
    pub period: SalaryPeriod,
}

impl SalaryRange {
    /// When only one bound is present, the other equals it.
    pub fn normalize_bounds(mut self) -> Self {
        match (self.min, self.max) {
            (Some(m), None) => self.max = Some(m),
            (None, Some(m)) => self.min = Some(m),
            _ => {}
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct YearsRange {
    pub min: u32,
    pub max: u32,
}

impl YearsRange {
    /// Clamps both bounds into [0, 50].
    pub fn clamped(min: u32, max: u32) -> Self {
        let min = min.min(50);
        let max = max.min(50).max(min);
        Self { min, max }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationTriple {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStage {
    S1,
    S2,
    S3,
    S4,
    S5,
}

impl ReminderStage {
    pub const ALL: [ReminderStage; 5] = [
        ReminderStage::S1,
        ReminderStage::S2,
        ReminderStage::S3,
        ReminderStage::S4,
        ReminderStage::S5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStage::S1 => "S1",
            ReminderStage::S2 => "S2",
            ReminderStage::S3 => "S3",
            ReminderStage::S4 => "S4",
            ReminderStage::S5 => "S5",
        }
    }

    /// Elapsed-time threshold in minutes since the window opened
    /// (16h, 19h, 21h, 23h, 23h45m).
    pub fn threshold_minutes(&self) -> i64 {
        match self {
            ReminderStage::S1 => 16 * 60,
            ReminderStage::S2 => 19 * 60,
            ReminderStage::S3 => 21 * 60,
            ReminderStage::S4 => 23 * 60,
            ReminderStage::S5 => 23 * 60 + 45,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStage {
    RealTime,
    BackFill,
}

impl DeliveryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStage::RealTime => "real_time",
            DeliveryStage::BackFill => "back_fill",
        }
    }
}

/// A 1536-dimensional embedding vector tagged with the model version that
/// produced it, plus the exact source text it was derived from (so the
/// preference projector can detect a no-op re-render).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub source_text: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
}

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 for a
/// degenerate (zero-norm) vector rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
