//! Lead capture contract integration tests

use std::collections::HashSet;
use std::sync::Arc;

use bant_agent::lead::{LeadCapture, parse_records};
use bant_agent::session::AgentSession;
use bant_agent::tools::SUBMIT_LEAD;
use bant_agent::{
    CaptureState, ConsoleSink, ConversationContext, Error, LeadField, LeadRepo, MemorySink,
    Tracking, ValidationPolicy,
};

mod common;
use common::{NEET_ARGS, SharedBuffer, WALKTHROUGH_ARGS, setup_test_db};

fn console_capture(policy: ValidationPolicy) -> (LeadCapture, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let capture = LeadCapture::new(policy).with_sink(Arc::new(ConsoleSink::new(buffer.clone())));
    (capture, buffer)
}

#[test]
fn test_neet_scenario_emits_all_fields() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());
    let mut session = AgentSession::start(Some(r#"{"conversation_id":"neet-001"}"#), capture);

    let ack = session.handle_tool_call(SUBMIT_LEAD, NEET_ARGS).unwrap();
    assert_eq!(ack.status, "ok");
    assert_eq!(ack.tracking, Tracking::Bound);

    let leads = parse_records(&buffer.contents()).unwrap();
    assert_eq!(leads.len(), 1);

    let lead = &leads[0];
    assert_eq!(lead.conversation_id.as_deref(), Some("neet-001"));
    assert_eq!(lead.child_name.as_deref(), Some("Aarav"));
    assert_eq!(lead.child_class, "12");
    assert_eq!(lead.subjects, "Physics, Chemistry, Biology");
    assert_eq!(lead.exam_info.as_deref(), Some("NEET 2025"));
    assert_eq!(lead.budget_range.as_deref(), Some("₹50,000-₹1,00,000 per year"));
    assert_eq!(lead.decision_maker.as_deref(), Some("Both parents"));
    assert_eq!(lead.timeline.as_deref(), Some("Start next month"));
    assert_eq!(lead.urgency, None);
    assert_eq!(lead.contact_phone, "9876543210");
}

#[test]
fn test_walkthrough_call_emits_every_field() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());
    let mut session = AgentSession::start(None, capture);

    let ack = session.handle_tool_call(SUBMIT_LEAD, WALKTHROUGH_ARGS).unwrap();
    assert_eq!(ack.status, "ok");

    let lead = parse_records(&buffer.contents()).unwrap().remove(0);
    let id = lead.conversation_id.as_deref().unwrap();
    assert!(!id.is_empty());
    assert_eq!(Some(id), session.conversation_id());

    assert_eq!(lead.child_name, None);
    assert_eq!(lead.child_class, "8th grade");
    assert_eq!(lead.subjects, "Physics, Chemistry");
    assert_eq!(lead.contact_phone, "8512131516");
    assert_eq!(lead.exam_info.as_deref(), Some("NEET next year"));
    assert_eq!(lead.budget_range.as_deref(), Some("Under ₹10,000/month"));
    assert_eq!(lead.decision_maker.as_deref(), Some("Both parents"));
    assert_eq!(lead.timeline.as_deref(), Some("ASAP"));
    assert_eq!(lead.urgency.as_deref(), Some("Immediate"));
}

#[test]
fn test_console_output_is_framed_and_verbatim() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());
    let mut session = AgentSession::start(None, capture);
    session.handle_tool_call(SUBMIT_LEAD, NEET_ARGS).unwrap();

    let out = buffer.contents();
    assert!(out.starts_with("\n===== NEW LEAD CAPTURED =====\n{"));
    assert!(out.ends_with("}\n================================\n\n"));
    assert!(out.contains("₹50,000"));
    assert!(!out.contains("\\u20b9"));

    // Key order follows the record layout
    let id_pos = out.find("\"conversation_id\"").unwrap();
    let phone_pos = out.find("\"contact_phone\"").unwrap();
    assert!(id_pos < phone_pos);
}

#[test]
fn test_missing_phone_emits_nothing() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());
    let mut session = AgentSession::start(None, capture);

    let err = session
        .handle_tool_call(
            SUBMIT_LEAD,
            r#"{"child_class": "9", "subjects": "Maths", "budget_range": "₹2,000 per month"}"#,
        )
        .unwrap_err();

    match err {
        Error::Validation(v) => assert_eq!(v.missing, vec![LeadField::ContactPhone]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(buffer.contents().is_empty());
    assert_eq!(session.context().state(), CaptureState::Collecting);
}

#[test]
fn test_blank_required_field_rejected() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());
    let mut session = AgentSession::start(None, capture);

    let result = session.handle_tool_call(
        SUBMIT_LEAD,
        r#"{"child_class": "9", "subjects": "   ", "contact_phone": "9000000000"}"#,
    );
    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(buffer.contents().is_empty());
}

#[test]
fn test_strict_policy_requires_bant_fields() {
    let (capture, buffer) = console_capture(ValidationPolicy::strict());
    let mut session = AgentSession::start(None, capture);

    let err = session
        .handle_tool_call(
            SUBMIT_LEAD,
            r#"{"child_class": "9", "subjects": "Maths", "contact_phone": "9000000000"}"#,
        )
        .unwrap_err();
    let Error::Validation(v) = err else {
        panic!("expected validation error");
    };
    assert!(v.missing.contains(&LeadField::BudgetRange));
    assert!(v.missing.contains(&LeadField::Urgency));
    assert!(!v.missing.contains(&LeadField::ChildName));
    assert!(buffer.contents().is_empty());
}

#[test]
fn test_second_submit_rejected_single_emission() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());
    let mut session = AgentSession::start(Some(r#"{"conversation_id":"dup-1"}"#), capture);

    session.handle_tool_call(SUBMIT_LEAD, NEET_ARGS).unwrap();
    let err = session.handle_tool_call(SUBMIT_LEAD, NEET_ARGS).unwrap_err();

    assert!(matches!(
        err,
        Error::DuplicateSubmission { conversation_id: Some(ref id) } if id == "dup-1"
    ));
    assert_eq!(parse_records(&buffer.contents()).unwrap().len(), 1);
}

#[test]
fn test_generated_ids_distinct_across_conversations() {
    let sink = Arc::new(MemorySink::new());
    let capture = LeadCapture::new(ValidationPolicy::standard()).with_sink(sink.clone());

    for _ in 0..3 {
        let mut ctx = ConversationContext::new(None);
        ctx.begin();
        let ack = capture
            .submit(&mut ctx, bant_agent::tools::submit_lead::parse_arguments(NEET_ARGS).unwrap())
            .unwrap();
        assert_eq!(ack.tracking, Tracking::Generated);
    }

    let ids: HashSet<String> = sink
        .leads()
        .into_iter()
        .map(|l| l.conversation_id.unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| !id.is_empty()));
}

#[test]
fn test_tracking_unavailable_emits_null_id() {
    let sink = Arc::new(MemorySink::new());
    let capture = LeadCapture::new(ValidationPolicy::standard()).with_sink(sink.clone());

    let mut ctx = ConversationContext::new(None).without_id_generation();
    ctx.begin();
    let ack = capture
        .submit(&mut ctx, bant_agent::tools::submit_lead::parse_arguments(NEET_ARGS).unwrap())
        .unwrap();

    assert_eq!(ack.tracking, Tracking::Unavailable);
    assert_eq!(sink.leads()[0].conversation_id, None);
}

#[test]
fn test_sqlite_sink_enforces_one_lead_per_conversation() {
    let repo = LeadRepo::new(setup_test_db());
    let capture = LeadCapture::new(ValidationPolicy::standard()).with_sink(Arc::new(repo.clone()));

    let mut first = AgentSession::start(Some(r#"{"conversation_id":"shared"}"#), capture.clone());
    first.handle_tool_call(SUBMIT_LEAD, NEET_ARGS).unwrap();

    // A second session replaying the same tracking id is refused by the store
    let mut second = AgentSession::start(Some(r#"{"conversation_id":"shared"}"#), capture);
    let err = second.handle_tool_call(SUBMIT_LEAD, NEET_ARGS).unwrap_err();
    assert!(matches!(err, Error::DuplicateSubmission { .. }));
    assert_eq!(second.context().state(), CaptureState::Collecting);

    let stored = repo.find_by_conversation("shared").unwrap().unwrap();
    assert_eq!(stored.lead.exam_info.as_deref(), Some("NEET 2025"));
    assert_eq!(repo.list_recent(10).unwrap().len(), 1);
}

#[test]
fn test_replayed_id_prints_nothing_when_store_claims_first() {
    let repo = LeadRepo::new(setup_test_db());
    let buffer = SharedBuffer::default();
    let capture = LeadCapture::new(ValidationPolicy::standard())
        .with_sink(Arc::new(repo.clone()))
        .with_sink(Arc::new(ConsoleSink::new(buffer.clone())));

    // Two separate runs replaying the same tracking id
    for attempt in 0..2 {
        let mut ctx = ConversationContext::new(Some("abc-123".to_string()));
        ctx.begin();
        let fields = bant_agent::tools::submit_lead::parse_arguments(WALKTHROUGH_ARGS).unwrap();
        let result = capture.submit(&mut ctx, fields);

        if attempt == 0 {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(Error::DuplicateSubmission { .. })));
            assert_eq!(ctx.state(), CaptureState::Collecting);
        }
    }

    let printed = parse_records(&buffer.contents()).unwrap();
    assert_eq!(printed.len(), 1);
    assert_eq!(printed[0].conversation_id.as_deref(), Some("abc-123"));
    assert_eq!(repo.list_recent(10).unwrap().len(), 1);
}

#[test]
fn test_concurrent_conversations_do_not_interleave() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let capture = capture.clone();
            std::thread::spawn(move || {
                let metadata = format!(r#"{{"conversation_id":"conv-{i}"}}"#);
                let mut session = AgentSession::start(Some(&metadata), capture);
                session.handle_tool_call(SUBMIT_LEAD, NEET_ARGS).unwrap();
                session.close()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().lead_captured);
    }

    let leads = parse_records(&buffer.contents()).unwrap();
    assert_eq!(leads.len(), 8);

    let ids: HashSet<_> = leads.iter().filter_map(|l| l.conversation_id.clone()).collect();
    assert_eq!(ids.len(), 8);
}

#[test]
fn test_round_trip_preserves_rupee() {
    let (capture, buffer) = console_capture(ValidationPolicy::standard());
    let mut ctx = ConversationContext::new(Some("rupee".to_string()));
    ctx.begin();

    let fields = bant_agent::tools::submit_lead::parse_arguments(NEET_ARGS).unwrap();
    capture.submit(&mut ctx, fields.clone()).unwrap();

    let parsed = parse_records(&buffer.contents()).unwrap().remove(0);
    assert_eq!(parsed.fields(), fields);
    assert_eq!(Some(&parsed), ctx.captured_lead());
}
