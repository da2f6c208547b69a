//! Lead repository

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, Row, ffi, params};
use serde::Serialize;
use uuid::Uuid;

use super::DbPool;
use crate::lead::{Lead, LeadSink};
use crate::{Error, Result};

const LEAD_COLUMNS: &str = "id, conversation_id, child_name, child_class, subjects, exam_info, \
     budget_range, decision_maker, timeline, urgency, contact_phone, captured_at";

/// A persisted lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredLead {
    pub id: String,
    #[serde(flatten)]
    pub lead: Lead,
    pub captured_at: DateTime<Utc>,
}

/// Lead repository
#[derive(Clone)]
pub struct LeadRepo {
    pool: DbPool,
}

impl std::fmt::Debug for LeadRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadRepo").finish_non_exhaustive()
    }
}

impl LeadRepo {
    /// Create a new lead repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a lead
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSubmission`] if a lead with the same
    /// `conversation_id` already exists, or error if the database operation
    /// fails
    pub fn insert(&self, lead: &Lead) -> Result<StoredLead> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let captured_at = Utc::now();

        conn.execute(
            "INSERT INTO leads (id, conversation_id, child_name, child_class, subjects, exam_info,
                                budget_range, decision_maker, timeline, urgency, contact_phone,
                                captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id,
                lead.conversation_id,
                lead.child_name,
                lead.child_class,
                lead.subjects,
                lead.exam_info,
                lead.budget_range,
                lead.decision_maker,
                lead.timeline,
                lead.urgency,
                lead.contact_phone,
                captured_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )
        .map_err(|e| insert_error(&e, lead))?;

        tracing::debug!(
            id = %id,
            conversation_id = lead.conversation_id.as_deref().unwrap_or_default(),
            "lead stored"
        );

        Ok(StoredLead {
            id,
            lead: lead.clone(),
            captured_at,
        })
    }

    /// Find the lead captured in a conversation
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_conversation(&self, conversation_id: &str) -> Result<Option<StoredLead>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let lead = conn
            .query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE conversation_id = ?1"),
                [conversation_id],
                row_to_lead,
            )
            .optional()?;

        Ok(lead)
    }

    /// Most recently captured leads, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredLead>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads ORDER BY captured_at DESC, rowid DESC LIMIT ?1"
        ))?;

        let leads = stmt
            .query_map([limit], row_to_lead)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(leads)
    }
}

impl LeadSink for LeadRepo {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn emit(&self, lead: &Lead) -> Result<()> {
        self.insert(lead).map(|_| ())
    }
}

fn row_to_lead(row: &Row<'_>) -> rusqlite::Result<StoredLead> {
    Ok(StoredLead {
        id: row.get(0)?,
        lead: Lead {
            conversation_id: row.get(1)?,
            child_name: row.get(2)?,
            child_class: row.get(3)?,
            subjects: row.get(4)?,
            exam_info: row.get(5)?,
            budget_range: row.get(6)?,
            decision_maker: row.get(7)?,
            timeline: row.get(8)?,
            urgency: row.get(9)?,
            contact_phone: row.get(10)?,
        },
        captured_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

/// Only a UNIQUE violation means the conversation already has a lead
fn insert_error(e: &rusqlite::Error, lead: &Lead) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE => {
            Error::DuplicateSubmission {
                conversation_id: lead.conversation_id.clone(),
            }
        }
        _ => Error::Database(e.to_string()),
    }
}
