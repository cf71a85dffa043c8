use chrono::{Duration, Utc};

use crate::connection::DbPool;
use crate::repositories::{format_timestamp, RepositoryError};

/// Demo leads covering every status, used by `sparky seed` and the admin UI demo.
pub const DEMO_LEADS: &[DemoLeadSeed] = &[
    DemoLeadSeed {
        id: "demo-lead-001",
        name: "Sam Taylor",
        phone: "0412345678",
        suburb: Some("Clyde North"),
        job_description: "Switchboard upgrade, breakers keep tripping",
        status: "new",
        sms_sent: false,
        email_sent: true,
        quote_sent: false,
        review_requested: false,
        age_hours: 2,
    },
    DemoLeadSeed {
        id: "demo-lead-002",
        name: "Priya Nair",
        phone: "0398765432",
        suburb: Some("Berwick"),
        job_description: "Install six LED downlights in the living room",
        status: "contacted",
        sms_sent: true,
        email_sent: true,
        quote_sent: true,
        review_requested: false,
        age_hours: 26,
    },
    DemoLeadSeed {
        id: "demo-lead-003",
        name: "Jordan Lee",
        phone: "0455123987",
        suburb: None,
        job_description: "EV charger installation in the garage",
        status: "booked",
        sms_sent: true,
        email_sent: true,
        quote_sent: true,
        review_requested: false,
        age_hours: 72,
    },
    DemoLeadSeed {
        id: "demo-lead-004",
        name: "Chris Morgan",
        phone: "0387001234",
        suburb: Some("Narre Warren"),
        job_description: "Replace hard-wired smoke alarms",
        status: "completed",
        sms_sent: true,
        email_sent: true,
        quote_sent: true,
        review_requested: true,
        age_hours: 240,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct DemoLeadSeed {
    pub id: &'static str,
    pub name: &'static str,
    pub phone: &'static str,
    pub suburb: Option<&'static str>,
    pub job_description: &'static str,
    pub status: &'static str,
    pub sms_sent: bool,
    pub email_sent: bool,
    pub quote_sent: bool,
    pub review_requested: bool,
    age_hours: i64,
}

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Inserts the demo leads. Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;
        let mut inserted = 0;

        for seed in DEMO_LEADS {
            let created_at = format_timestamp(&(now - Duration::hours(seed.age_hours)));
            let result = sqlx::query(
                "INSERT OR IGNORE INTO lead (id, name, phone, suburb, job_description, status,
                                             sms_sent, email_sent, quote_sent, review_requested,
                                             created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(seed.id)
            .bind(seed.name)
            .bind(seed.phone)
            .bind(seed.suburb)
            .bind(seed.job_description)
            .bind(seed.status)
            .bind(seed.sms_sent)
            .bind(seed.email_sent)
            .bind(seed.quote_sent)
            .bind(seed.review_requested)
            .bind(&created_at)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(SeedResult { leads_seeded: DEMO_LEADS.iter().map(|seed| seed.id).collect(), inserted })
    }

    /// Checks each demo lead exists with its seeded status.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();
        for seed in DEMO_LEADS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lead WHERE id = ?1 AND status = ?2)")
                    .bind(seed.id)
                    .bind(seed.status)
                    .fetch_one(pool)
                    .await?;
            checks.push((seed.id, exists == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let ids = DEMO_LEADS.iter().map(|seed| format!("'{}'", seed.id)).collect::<Vec<_>>();
        sqlx::query(&format!("DELETE FROM lead WHERE id IN ({})", ids.join(",")))
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub leads_seeded: Vec<&'static str>,
    /// Rows actually written; zero on a repeat run.
    pub inserted: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
