//! Shared test utilities

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use bant_agent::livekit::ApiCredentials;
use bant_agent::{DbPool, TokenIssuer, db};

/// Arguments of the NEET example call, all eight fields
pub const NEET_ARGS: &str = r#"{
    "child_name": "Aarav",
    "child_class": "12",
    "subjects": "Physics, Chemistry, Biology",
    "exam_info": "NEET 2025",
    "budget_range": "₹50,000-₹1,00,000 per year",
    "decision_maker": "Both parents",
    "timeline": "Start next month",
    "contact_phone": "9876543210"
}"#;

/// The parent's call from the end-to-end walkthrough, every field filled
pub const WALKTHROUGH_ARGS: &str = r#"{
    "child_class": "8th grade",
    "subjects": "Physics, Chemistry",
    "contact_phone": "8512131516",
    "exam_info": "NEET next year",
    "budget_range": "Under ₹10,000/month",
    "decision_maker": "Both parents",
    "timeline": "ASAP",
    "urgency": "Immediate"
}"#;

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Dev-server style credentials
#[must_use]
pub fn test_credentials() -> ApiCredentials {
    ApiCredentials::new("APItestkey", "test-secret-with-enough-length").expect("valid credentials")
}

/// Token issuer over [`test_credentials`]
#[must_use]
pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(test_credentials())
}

/// Writer that keeps everything written to it, shareable with a sink
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf-8 output")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
