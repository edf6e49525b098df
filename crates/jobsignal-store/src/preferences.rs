use std::sync::{Arc, Mutex};
use std::str::FromStr;

use chrono::Utc;
use jobsignal_core::types::{
    Currency, Embedding, EmploymentType, ExperienceLevel, SalaryPeriod, UserId, WorkArrangement,
};
use jobsignal_core::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::{Preferences, SalaryPreference};
use crate::vector;

fn json_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn row_to_preferences(row: &rusqlite::Row<'_>) -> rusqlite::Result<Preferences> {
    let user_id: String = row.get(0)?;
    let work_arrangements: String = row.get(5)?;
    let employment_types: String = row.get(6)?;
    let experience_level: Option<String> = row.get(7)?;
    let embedding_vector: Option<Vec<u8>> = row.get(17)?;
    let embedding_source_text: Option<String> = row.get(18)?;
    let embedding_version: Option<String> = row.get(19)?;
    let embedding_generated_at: Option<String> = row.get(20)?;

    let embedding = match (embedding_vector, embedding_source_text, embedding_version, embedding_generated_at) {
        (Some(v), Some(src), Some(ver), Some(ts)) => Some(Embedding {
            vector: vector::decode(&v),
            source_text: src,
            version: ver,
            generated_at: ts.parse().unwrap_or_else(|_| Utc::now()),
        }),
        _ => None,
    };

    Ok(Preferences {
        user_id: UserId::from_str(&user_id).unwrap_or_default(),
        desired_roles: json_list(&row.get::<_, String>(1)?),
        job_categories: json_list(&row.get::<_, String>(2)?),
        desired_locations: json_list(&row.get::<_, String>(3)?),
        willing_to_relocate: row.get::<_, i64>(4)? != 0,
        work_arrangements: json_list(&work_arrangements)
            .iter()
            .filter_map(|s| WorkArrangement::parse(s))
            .collect(),
        employment_types: json_list(&employment_types)
            .iter()
            .filter_map(|s| match s.as_str() {
                "full-time" => Some(EmploymentType::FullTime),
                "part-time" => Some(EmploymentType::PartTime),
                "contract" => Some(EmploymentType::Contract),
                "internship" => Some(EmploymentType::Internship),
                "freelance" => Some(EmploymentType::Freelance),
                "temporary" => Some(EmploymentType::Temporary),
                "volunteer" => Some(EmploymentType::Volunteer),
                _ => None,
            })
            .collect(),
        experience_level: experience_level.and_then(|s| ExperienceLevel::parse(&s)),
        years_experience: row.get::<_, Option<i64>>(8)?.map(|v| v as u32),
        desired_salary: SalaryPreference {
            min: row.get(9)?,
            max: row.get(10)?,
            currency: row
                .get::<_, Option<String>>(11)?
                .and_then(|s| Currency::parse(&s)),
            period: row
                .get::<_, Option<String>>(12)?
                .and_then(|s| match s.as_str() {
                    "hourly" => Some(SalaryPeriod::Hourly),
                    "monthly" => Some(SalaryPeriod::Monthly),
                    "annual" => Some(SalaryPeriod::Annual),
                    _ => None,
                }),
        },
        required_skills: json_list(&row.get::<_, String>(13)?),
        soft_skills: json_list(&row.get::<_, String>(14)?),
        industries: json_list(&row.get::<_, String>(15)?),
        confirmed: row.get::<_, i64>(16)? != 0,
        embedding,
    })
}

const PREFERENCES_SELECT_SQL: &str = "SELECT user_id, desired_roles, job_categories,
    desired_locations, willing_to_relocate, work_arrangements, employment_types,
    experience_level, years_experience, salary_min, salary_max, salary_currency,
    salary_period, required_skills, soft_skills, industries, confirmed,
    embedding_vector, embedding_source_text, embedding_version, embedding_generated_at
    FROM preferences";

pub struct PreferenceRepo {
    db: Arc<Mutex<Connection>>,
}

impl PreferenceRepo {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn find(&self, user_id: UserId) -> Result<Option<Preferences>> {
        let db = self.db.lock().unwrap();
        let prefs = db
            .query_row(
                &format!("{PREFERENCES_SELECT_SQL} WHERE user_id = ?1"),
                params![user_id.to_string()],
                row_to_preferences,
            )
            .optional()?;
        Ok(prefs)
    }

    /// Upserts the full preference row. Invoked by the conversational
    /// front-end (out of scope) through whatever boundary calls into this
    /// store; re-materializing the embedding is the caller's job via the
    /// Preference Projector, not this repo.
    pub fn upsert(&self, prefs: &Preferences) -> Result<()> {
        let db = self.db.lock().unwrap();
        let work_arrangements: Vec<&str> =
            prefs.work_arrangements.iter().map(|w| w.as_str()).collect();
        let employment_types: Vec<&str> =
            prefs.employment_types.iter().map(|e| e.as_str()).collect();

        db.execute(
            "INSERT INTO preferences (
                user_id, desired_roles, job_categories, desired_locations,
                willing_to_relocate, work_arrangements, employment_types,
                experience_level, years_experience, salary_min, salary_max,
                salary_currency, salary_period, required_skills, soft_skills,
                industries, confirmed
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)
            ON CONFLICT(user_id) DO UPDATE SET
                desired_roles=excluded.desired_roles,
                job_categories=excluded.job_categories,
                desired_locations=excluded.desired_locations,
                willing_to_relocate=excluded.willing_to_relocate,
                work_arrangements=excluded.work_arrangements,
                employment_types=excluded.employment_types,
                experience_level=excluded.experience_level,
                years_experience=excluded.years_experience,
                salary_min=excluded.salary_min,
                salary_max=excluded.salary_max,
                salary_currency=excluded.salary_currency,
                salary_period=excluded.salary_period,
                required_skills=excluded.required_skills,
                soft_skills=excluded.soft_skills,
                industries=excluded.industries,
                confirmed=excluded.confirmed",
            params![
                prefs.user_id.to_string(),
                serde_json::to_string(&prefs.desired_roles).unwrap(),
                serde_json::to_string(&prefs.job_categories).unwrap(),
                serde_json::to_string(&prefs.desired_locations).unwrap(),
                prefs.willing_to_relocate as i64,
                serde_json::to_string(&work_arrangements).unwrap(),
                serde_json::to_string(&employment_types).unwrap(),
                prefs.experience_level.map(|e| e.as_str()),
                prefs.years_experience.map(|v| v as i64),
                prefs.desired_salary.min,
                prefs.desired_salary.max,
                prefs.desired_salary.currency.map(|c| c.as_str()),
                prefs.desired_salary.period.map(|p| match p {
                    SalaryPeriod::Hourly => "hourly",
                    SalaryPeriod::Monthly => "monthly",
                    SalaryPeriod::Annual => "annual",
                }),
                serde_json::to_string(&prefs.required_skills).unwrap(),
                serde_json::to_string(&prefs.soft_skills).unwrap(),
                serde_json::to_string(&prefs.industries).unwrap(),
                prefs.confirmed as i64,
            ],
        )?;
        Ok(())
    }

    /// Updates only the embedding fields. Used by the Preference Projector
    /// so a re-render never clobbers concurrently-written preference data.
    pub fn update_embedding(&self, user_id: UserId, embedding: &Embedding) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE preferences SET embedding_vector = ?1, embedding_source_text = ?2,
             embedding_version = ?3, embedding_generated_at = ?4 WHERE user_id = ?5",
            params![
                vector::encode(&embedding.vector),
                embedding.source_text,
                embedding.version,
                embedding.generated_at.to_rfc3339(),
                user_id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// All confirmed users with an embedding, for the embedding matcher's
    /// candidate scan. Returned in-memory since SQLite has no vector
    /// index.
    pub fn all_with_embedding(&self) -> Result<Vec<Preferences>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{PREFERENCES_SELECT_SQL} WHERE confirmed = 1 AND embedding_vector IS NOT NULL"
        ))?;
        let rows = stmt
            .query_map([], row_to_preferences)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsignal_core::types::UserId;

    fn test_repo() -> PreferenceRepo {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init_db(&conn).unwrap();
        PreferenceRepo::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn upsert_then_find_round_trips() {
        let repo = test_repo();
        let uid = UserId::new();
        let mut prefs = Preferences::empty(uid);
        prefs.desired_roles = vec!["Sales Executive".into()];
        prefs.confirmed = true;
        repo.upsert(&prefs).unwrap();

        let loaded = repo.find(uid).unwrap().unwrap();
        assert_eq!(loaded.desired_roles, vec!["Sales Executive".to_string()]);
        assert!(loaded.confirmed);
    }

    #[test]
    fn update_embedding_preserves_other_fields() {
        let repo = test_repo();
        let uid = UserId::new();
        let mut prefs = Preferences::empty(uid);
        prefs.desired_roles = vec!["Engineer".into()];
        repo.upsert(&prefs).unwrap();

        let embedding = Embedding {
            vector: vec![0.1; 1536],
            source_text: "engineer".into(),
            version: "v1".into(),
            generated_at: Utc::now(),
        };
        repo.update_embedding(uid, &embedding).unwrap();

        let loaded = repo.find(uid).unwrap().unwrap();
        assert_eq!(loaded.desired_roles, vec!["Engineer".to_string()]);
        assert_eq!(loaded.embedding.unwrap().vector.len(), 1536);
    }
}
