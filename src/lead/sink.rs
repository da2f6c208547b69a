//! Emission sinks for captured leads

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use super::Lead;
use crate::{Error, Result};

/// Banner line opening a console lead record
pub const RECORD_HEADER: &str = "===== NEW LEAD CAPTURED =====";

/// Banner line closing a console lead record
pub const RECORD_FOOTER: &str = "================================";

/// Destination for captured leads
///
/// Sinks are shared across conversations; each `emit` must write one
/// complete record without interleaving with concurrent callers.
pub trait LeadSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Write one lead
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be written
    fn emit(&self, lead: &Lead) -> Result<()>;
}

/// Render a lead as a framed, pretty-printed JSON record
///
/// # Errors
///
/// Returns error if the lead cannot be serialized
pub fn format_record(lead: &Lead) -> Result<String> {
    let json = serde_json::to_string_pretty(lead)?;
    Ok(format!("\n{RECORD_HEADER}\n{json}\n{RECORD_FOOTER}\n\n"))
}

/// Parse the first framed record in `text`
///
/// # Errors
///
/// Returns error if no complete record is found or its JSON is invalid
pub fn parse_record(text: &str) -> Result<Lead> {
    parse_records(text)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidInput("no lead record found".to_string()))
}

/// Parse every framed record in `text`, in order
///
/// # Errors
///
/// Returns error if a record is unterminated or its JSON is invalid
pub fn parse_records(text: &str) -> Result<Vec<Lead>> {
    let mut leads = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(RECORD_HEADER) {
        let body = &rest[start + RECORD_HEADER.len()..];
        let end = body
            .find(&format!("\n{RECORD_FOOTER}"))
            .ok_or_else(|| Error::InvalidInput("unterminated lead record".to_string()))?;

        leads.push(serde_json::from_str(body[..end].trim())?);
        rest = &body[end + 1 + RECORD_FOOTER.len()..];
    }

    Ok(leads)
}

/// Writes framed records to a process stream (stdout by default)
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Sink writing to `writer`
    #[must_use]
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Sink writing to standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

impl LeadSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn emit(&self, lead: &Lead) -> Result<()> {
        let record = format_record(lead)?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(record.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps captured leads in memory for in-process consumers
#[derive(Debug, Default)]
pub struct MemorySink {
    leads: Mutex<Vec<Lead>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every lead emitted so far
    #[must_use]
    pub fn leads(&self) -> Vec<Lead> {
        self.leads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of leads emitted so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.leads.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LeadSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn emit(&self, lead: &Lead) -> Result<()> {
        self.leads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(lead.clone());
        Ok(())
    }
}
