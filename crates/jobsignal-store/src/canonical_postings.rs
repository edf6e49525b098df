use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use jobsignal_core::types::{
    CanonicalPostingId, Currency, Embedding, EmploymentType, ExperienceLevel, RawPostingId,
    SalaryPeriod, SalaryRange, WorkArrangement, YearsRange,
};
use jobsignal_core::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::entities::CanonicalPosting;
use crate::vector;

fn json_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn row_to_canonical(row: &rusqlite::Row<'_>) -> rusqlite::Result<CanonicalPosting> {
    let id: String = row.get(0)?;
    let raw_id: String = row.get(1)?;
    let employment_type: Option<String> = row.get(7)?;
    let posted_date: String = row.get(12)?;
    let levels: String = row.get(19)?;
    let work_arrangement: Option<String> = row.get(23)?;
    let inferred_currency: Option<String> = row.get(27)?;
    let embedding_vector: Option<Vec<u8>> = row.get(32)?;
    let embedding_source_text: Option<String> = row.get(33)?;
    let embedding_version: Option<String> = row.get(34)?;
    let embedding_generated_at: Option<String> = row.get(35)?;
    let scraped_at: String = row.get(36)?;

    let salary_min: Option<i64> = row.get(8)?;
    let salary_max: Option<i64> = row.get(9)?;
    let salary_currency: Option<String> = row.get(10)?;
    let salary_range = salary_currency.as_ref().map(|c| SalaryRange {
        min: salary_min,
        max: salary_max,
        currency: Currency::parse(c).unwrap_or(Currency::Ngn),
        period: SalaryPeriod::Monthly,
    });

    let inferred_min: Option<i64> = row.get(25)?;
    let inferred_max: Option<i64> = row.get(26)?;
    let inferred_salary_range = inferred_currency.as_ref().map(|c| SalaryRange {
        min: inferred_min,
        max: inferred_max,
        currency: Currency::parse(c).unwrap_or(Currency::Ngn),
        period: SalaryPeriod::Monthly,
    });

    let years_min: Option<i64> = row.get(28)?;
    let years_max: Option<i64> = row.get(29)?;
    let years_experience = match (years_min, years_max) {
        (Some(min), Some(max)) => Some(YearsRange::clamped(min as u32, max as u32)),
        _ => None,
    };

    let embedding = match (
        embedding_vector,
        embedding_source_text,
        embedding_version,
        embedding_generated_at,
    ) {
        (Some(v), Some(src), Some(ver), Some(ts)) => Some(Embedding {
            vector: vector::decode(&v),
            source_text: src,
            version: ver,
            generated_at: ts.parse().unwrap_or_else(|_| Utc::now()),
        }),
        _ => None,
    };

    Ok(CanonicalPosting {
        id: CanonicalPostingId::from_str(&id).unwrap_or_default(),
        raw_id: RawPostingId::from_str(&raw_id).unwrap_or_default(),
        title: row.get(2)?,
        company: row.get(3)?,
        display_location: row.get(4)?,
        posting_url: row.get(5)?,
        description: row.get(6)?,
        employment_type: employment_type.and_then(|s| match s.as_str() {
            "full-time" => Some(EmploymentType::FullTime),
            "part-time" => Some(EmploymentType::PartTime),
            "contract" => Some(EmploymentType::Contract),
            "internship" => Some(EmploymentType::Internship),
            "freelance" => Some(EmploymentType::Freelance),
            "temporary" => Some(EmploymentType::Temporary),
            "volunteer" => Some(EmploymentType::Volunteer),
            _ => None,
        }),
        salary_range,
        posted_date: posted_date.parse().unwrap_or_else(|_| Utc::now()),
        source: row.get(13)?,
        alternate_titles: json_list(&row.get::<_, String>(14)?),
        required_skills: json_list(&row.get::<_, String>(15)?),
        preferred_skills: json_list(&row.get::<_, String>(16)?),
        industries: json_list(&row.get::<_, String>(17)?),
        job_function: row.get(18)?,
        levels: json_list(&levels)
            .iter()
            .filter_map(|s| ExperienceLevel::parse(s))
            .collect(),
        city: row.get(20)?,
        state: row.get(21)?,
        country: row.get(22)?,
        work_arrangement: work_arrangement.and_then(|s| WorkArrangement::parse(&s)),
        remote_allowed: row.get::<_, i64>(24)? != 0,
        inferred_salary_range,
        years_experience,
        summary: row.get(30)?,
        embedding,
        scraped_at: scraped_at.parse().unwrap_or_else(|_| Utc::now()),
        ai_enhanced: row.get::<_, i64>(37)? != 0,
    })
}

const CANONICAL_SELECT_SQL: &str = "SELECT id, raw_id, title, company, display_location,
    posting_url, description, employment_type, salary_min, salary_max, salary_currency,
    salary_period, posted_date, source, alternate_titles, required_skills, preferred_skills,
    industries, job_function, levels, city, state, country, work_arrangement, remote_allowed,
    inferred_salary_min, inferred_salary_max, inferred_salary_currency, years_experience_min,
    years_experience_max, summary, NULL, embedding_vector, embedding_source_text,
    embedding_version, embedding_generated_at, scraped_at, ai_enhanced FROM canonical_postings";

pub struct CanonicalPostingRepo {
    db: Arc<Mutex<Connection>>,
}

impl CanonicalPostingRepo {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Inserts the direct+inferred fields composed by the Enrichment
    /// Worker. `ai_enhanced` starts false; it flips true once the
    /// embedding is persisted by `attach_embedding`.
    pub fn insert(&self, posting: &CanonicalPosting) -> Result<()> {
        let db = self.db.lock().unwrap();
        let levels: Vec<&str> = posting.levels.iter().map(|l| l.as_str()).collect();
        db.execute(
            "INSERT INTO canonical_postings (
                id, raw_id, title, company, display_location, posting_url, description,
                employment_type, salary_min, salary_max, salary_currency, salary_period,
                posted_date, source, alternate_titles, required_skills, preferred_skills,
                industries, job_function, levels, city, state, country, work_arrangement,
                remote_allowed, inferred_salary_min, inferred_salary_max,
                inferred_salary_currency, years_experience_min, years_experience_max,
                summary, scraped_at, ai_enhanced
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,
                      ?21,?22,?23,?24,?25,?26,?27,?28,?29,?30,?31,?32,0)",
            params![
                posting.id.to_string(),
                posting.raw_id.to_string(),
                posting.title,
                posting.company,
                posting.display_location,
                posting.posting_url,
                posting.description,
                posting.employment_type.map(|e| e.as_str()),
                posting.salary_range.as_ref().and_then(|s| s.min),
                posting.salary_range.as_ref().and_then(|s| s.max),
                posting.salary_range.as_ref().map(|s| s.currency.as_str()),
                Some("monthly"),
                posting.posted_date.to_rfc3339(),
                posting.source,
                serde_json::to_string(&posting.alternate_titles).unwrap(),
                serde_json::to_string(&posting.required_skills).unwrap(),
                serde_json::to_string(&posting.preferred_skills).unwrap(),
                serde_json::to_string(&posting.industries).unwrap(),
                posting.job_function,
                serde_json::to_string(&levels).unwrap(),
                posting.city,
                posting.state,
                posting.country,
                posting.work_arrangement.map(|w| w.as_str()),
                posting.remote_allowed as i64,
                posting.inferred_salary_range.as_ref().and_then(|s| s.min),
                posting.inferred_salary_range.as_ref().and_then(|s| s.max),
                posting
                    .inferred_salary_range
                    .as_ref()
                    .map(|s| s.currency.as_str()),
                posting.years_experience.map(|y| y.min as i64),
                posting.years_experience.map(|y| y.max as i64),
                posting.summary,
                posting.scraped_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Persists the embedding and flips `ai_enhanced=true`.
    pub fn attach_embedding(&self, id: CanonicalPostingId, embedding: &Embedding) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE canonical_postings SET embedding_vector = ?1, embedding_source_text = ?2,
             embedding_version = ?3, embedding_generated_at = ?4, ai_enhanced = 1
             WHERE id = ?5",
            params![
                vector::encode(&embedding.vector),
                embedding.source_text,
                embedding.version,
                embedding.generated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn find(&self, id: CanonicalPostingId) -> Result<Option<CanonicalPosting>> {
        let db = self.db.lock().unwrap();
        let posting = db
            .query_row(
                &format!("{CANONICAL_SELECT_SQL} WHERE id = ?1"),
                params![id.to_string()],
                row_to_canonical,
            )
            .optional()?;
        Ok(posting)
    }

    /// Candidate set for the embedding matcher: recent, embedded postings.
    /// Filtered by SQL, ranked by cosine similarity in Rust — SQLite has
    /// no native vector index.
    pub fn recent_with_embedding(&self, since: DateTime<Utc>) -> Result<Vec<CanonicalPosting>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{CANONICAL_SELECT_SQL} WHERE posted_date >= ?1 AND embedding_vector IS NOT NULL
             ORDER BY posted_date DESC"
        ))?;
        let rows = stmt
            .query_map(params![since.to_rfc3339()], row_to_canonical)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Recency-windowed candidate set for the rule matcher, independent of
    /// embedding presence (rule matcher is the fallback for un-embedded
    /// postings).
    pub fn recent(&self, since: DateTime<Utc>) -> Result<Vec<CanonicalPosting>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{CANONICAL_SELECT_SQL} WHERE posted_date >= ?1 ORDER BY posted_date DESC"
        ))?;
        let rows = stmt
            .query_map(params![since.to_rfc3339()], row_to_canonical)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Postings older than `stale_since` still missing an embedding, for
    /// the Scheduler's back-fill pass.
    pub fn missing_embedding(&self, limit: usize) -> Result<Vec<CanonicalPosting>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{CANONICAL_SELECT_SQL} WHERE embedding_vector IS NULL ORDER BY scraped_at ASC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_canonical)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn stale_embeddings(&self, older_than: DateTime<Utc>, limit: usize) -> Result<Vec<CanonicalPosting>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{CANONICAL_SELECT_SQL} WHERE embedding_generated_at < ?1 ORDER BY embedding_generated_at ASC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![older_than.to_rfc3339(), limit as i64], row_to_canonical)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Duplicate groups keyed by lowercased trimmed (title, company,
    /// location), for the Scheduler's dedup pass. Returns, per group with
    /// more than one row, every id except the one with the latest
    /// `scraped_at` — those are the ones to prune.
    pub fn find_duplicate_ids_to_prune(&self) -> Result<Vec<CanonicalPostingId>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, scraped_at,
                LOWER(TRIM(title)) AS k_title,
                LOWER(TRIM(company)) AS k_company,
                LOWER(TRIM(display_location)) AS k_location
             FROM canonical_postings",
        )?;
        let rows: Vec<(String, String, String, String, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .collect();

        use std::collections::HashMap;
        let mut groups: HashMap<(String, String, String), Vec<(String, String)>> = HashMap::new();
        for (id, scraped_at, title, company, location) in rows {
            groups
                .entry((title, company, location))
                .or_default()
                .push((id, scraped_at));
        }

        let mut to_prune = Vec::new();
        for (_, mut members) in groups {
            if members.len() < 2 {
                continue;
            }
            members.sort_by(|a, b| b.1.cmp(&a.1));
            for (id, _) in members.into_iter().skip(1) {
                if let Ok(id) = CanonicalPostingId::from_str(&id) {
                    to_prune.push(id);
                }
            }
        }
        Ok(to_prune)
    }

    /// Deletes a canonical posting row. Delivery History rows referencing
    /// it are preserved — history never loses rows — since
    /// `delivery_history` has no foreign-key cascade configured here.
    pub fn delete(&self, id: CanonicalPostingId) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "DELETE FROM canonical_postings WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Old, undelivered postings for the Scheduler's purge pass.
    pub fn find_old_undelivered(&self, older_than: DateTime<Utc>) -> Result<Vec<CanonicalPostingId>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT cp.id FROM canonical_postings cp
             WHERE cp.scraped_at < ?1
               AND NOT EXISTS (
                   SELECT 1 FROM delivery_history dh WHERE dh.canonical_posting_id = cp.id
               )",
        )?;
        let ids = stmt
            .query_map(params![older_than.to_rfc3339()], |row| {
                row.get::<_, String>(0)
            })?
            .filter_map(|r| r.ok())
            .filter_map(|s| CanonicalPostingId::from_str(&s).ok())
            .collect();
        Ok(ids)
    }

    pub fn count_total(&self) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row("SELECT COUNT(*) FROM canonical_postings", [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }

    pub fn count_with_embedding(&self) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM canonical_postings WHERE ai_enhanced = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsignal_core::types::RawPostingId;

    fn test_repo() -> CanonicalPostingRepo {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init_db(&conn).unwrap();
        CanonicalPostingRepo::new(Arc::new(Mutex::new(conn)))
    }

    fn sample(title: &str, company: &str, location: &str, scraped_at: DateTime<Utc>) -> CanonicalPosting {
        CanonicalPosting {
            id: CanonicalPostingId::new(),
            raw_id: RawPostingId::new(),
            title: title.to_string(),
            company: company.to_string(),
            display_location: location.to_string(),
            posting_url: "https://x".into(),
            description: "desc".into(),
            employment_type: Some(EmploymentType::FullTime),
            salary_range: None,
            posted_date: scraped_at,
            source: "indeed".into(),
            alternate_titles: vec![],
            required_skills: vec![],
            preferred_skills: vec![],
            industries: vec![],
            job_function: None,
            levels: vec![],
            city: None,
            state: None,
            country: None,
            work_arrangement: None,
            remote_allowed: false,
            inferred_salary_range: None,
            years_experience: None,
            summary: None,
            embedding: None,
            scraped_at,
            ai_enhanced: false,
        }
    }

    #[test]
    fn insert_then_find_round_trips() {
        let repo = test_repo();
        let p = sample("Sales Executive", "TechCorp", "Lagos", Utc::now());
        let id = p.id;
        repo.insert(&p).unwrap();
        let loaded = repo.find(id).unwrap().unwrap();
        assert_eq!(loaded.title, "Sales Executive");
        assert!(!loaded.ai_enhanced);
    }

    #[test]
    fn attach_embedding_sets_ai_enhanced() {
        let repo = test_repo();
        let p = sample("Engineer", "Acme", "Abuja", Utc::now());
        let id = p.id;
        repo.insert(&p).unwrap();
        repo.attach_embedding(
            id,
            &Embedding {
                vector: vec![0.0; 1536],
                source_text: "x".into(),
                version: "v1".into(),
                generated_at: Utc::now(),
            },
        )
        .unwrap();
        let loaded = repo.find(id).unwrap().unwrap();
        assert!(loaded.ai_enhanced);
        assert_eq!(loaded.embedding.unwrap().dimension(), 1536);
    }

    #[test]
    fn duplicate_detection_keeps_latest_scraped_at() {
        let repo = test_repo();
        let t0 = Utc::now();
        let older = sample("Sales Executive", "TechCorp Nigeria", "Lagos", t0);
        let newer = sample(
            "sales executive",
            " TechCorp Nigeria ",
            "lagos",
            t0 + chrono::Duration::days(1),
        );
        let older_id = older.id;
        let newer_id = newer.id;
        repo.insert(&older).unwrap();
        repo.insert(&newer).unwrap();

        let to_prune = repo.find_duplicate_ids_to_prune().unwrap();
        assert_eq!(to_prune, vec![older_id]);
        assert!(!to_prune.contains(&newer_id));
    }
}
