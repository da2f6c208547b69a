//! Room token integration tests

use std::time::Duration;

use bant_agent::livekit::{DispatchMetadata, ParticipantPermissions, TokenRequest};
use bant_agent::{Error, TokenIssuer};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

mod common;
use common::{test_credentials, test_issuer};

/// Decode with the bare JWT library, as a media server would
fn decode(token: &str) -> serde_json::Value {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&["APItestkey"]);
    jsonwebtoken::decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(b"test-secret-with-enough-length"),
        &validation,
    )
    .expect("token verifies")
    .claims
}

#[test]
fn test_supplied_conversation_id_preserved() {
    let issued = test_issuer()
        .client_token(
            "sales-room-123",
            "parent-9876543210",
            Some("Priya"),
            Some("abc-123".to_string()),
        )
        .unwrap();
    assert_eq!(issued.conversation_id, "abc-123");

    let claims = decode(&issued.token);
    assert_eq!(claims["sub"], "parent-9876543210");
    assert_eq!(claims["name"], "Priya");
    assert_eq!(claims["video"]["room"], "sales-room-123");
    assert_eq!(claims["video"]["roomJoin"], true);
    assert_eq!(claims["roomConfig"]["maxParticipants"], 2);

    let metadata = claims["roomConfig"]["agents"][0]["metadata"].as_str().unwrap();
    let parsed = DispatchMetadata::parse(metadata).unwrap();
    assert_eq!(parsed.conversation_id.as_deref(), Some("abc-123"));
}

#[test]
fn test_generated_id_matches_embedded_metadata() {
    let issued = test_issuer().agent_token("sales-room-123", None).unwrap();

    let claims = decode(&issued.token);
    let metadata = claims["roomConfig"]["agents"][0]["metadata"].as_str().unwrap();
    assert_eq!(
        DispatchMetadata::parse(metadata).unwrap().conversation_id,
        Some(issued.conversation_id)
    );
}

#[test]
fn test_custom_permissions() {
    let issued = test_issuer()
        .issue(TokenRequest {
            room: "r".to_string(),
            identity: "observer".to_string(),
            name: None,
            permissions: ParticipantPermissions {
                can_publish: false,
                can_subscribe: true,
                can_publish_data: false,
            },
            conversation_id: None,
        })
        .unwrap();

    let claims = decode(&issued.token);
    assert_eq!(claims["video"]["canPublish"], false);
    assert_eq!(claims["video"]["canSubscribe"], true);
    assert_eq!(claims["video"]["canPublishData"], false);
    assert_eq!(claims["name"], "observer");
}

#[test]
fn test_ttl_applied() {
    let issuer = TokenIssuer::new(test_credentials()).with_ttl(Duration::from_secs(900));
    let claims = decode(&issuer.agent_token("r", None).unwrap().token);

    let ttl = claims["exp"].as_i64().unwrap() - claims["nbf"].as_i64().unwrap();
    assert_eq!(ttl, 900);
}

#[test]
fn test_blank_conversation_id_rejected() {
    let result = test_issuer().client_token("r", "p", None, Some("  ".to_string()));
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
