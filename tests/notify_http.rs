use edutrack_core::{MessagingConfig, NotificationService, Recipient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> MessagingConfig {
    MessagingConfig {
        account_sid: "AC00000000000000000000000000000000".to_string(),
        auth_token: "secret-token".to_string(),
        sms_from: "+15005550006".to_string(),
        whatsapp_from: Some("+14155238886".to_string()),
        default_country_code: "91".to_string(),
        currency_symbol: "₹".to_string(),
    }
}

fn service(server: &MockServer) -> NotificationService {
    NotificationService::with_messages_url(config(), format!("{}/Messages.json", server.uri()))
}

async fn mount_success(server: &MockServer, matcher: &str, sid: &str) {
    Mock::given(method("POST"))
        .and(path("/Messages.json"))
        .and(body_string_contains(matcher))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": sid})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn both_channels_succeed_independently() {
    let server = MockServer::start().await;
    // SMS From is the bare number; the chat channel From carries the tag.
    mount_success(&server, "From=%2B15005550006", "SM123").await;
    mount_success(&server, "From=whatsapp%3A%2B14155238886", "WA456").await;

    let result = service(&server).send_notification("9876543210", "hello").await;

    assert!(result.sms.success);
    assert_eq!(result.sms.message_id.as_deref(), Some("SM123"));
    assert!(result.whatsapp.success);
    assert_eq!(result.whatsapp.message_id.as_deref(), Some("WA456"));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    // Both To fields point at the normalized number.
    let bodies: Vec<String> = received
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).to_string())
        .collect();
    assert!(bodies.iter().any(|b| b.contains("To=%2B919876543210")));
    assert!(bodies
        .iter()
        .any(|b| b.contains("To=whatsapp%3A%2B919876543210")));
}

#[tokio::test]
async fn one_channel_failing_does_not_block_the_other() {
    let server = MockServer::start().await;
    mount_success(&server, "From=%2B15005550006", "SM123").await;
    Mock::given(method("POST"))
        .and(path("/Messages.json"))
        .and(body_string_contains("From=whatsapp%3A"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 63016,
            "message": "Channel not enabled for this number"
        })))
        .mount(&server)
        .await;

    let result = service(&server).send_notification("9876543210", "hello").await;

    assert!(result.sms.success);
    assert!(!result.whatsapp.success);
    assert_eq!(
        result.whatsapp.error.as_deref(),
        Some("Channel not enabled for this number")
    );
    assert!(result.any_sent());
}

#[tokio::test]
async fn unparseable_success_body_is_a_channel_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
        .mount(&server)
        .await;

    let result = service(&server).send_notification("9876543210", "hello").await;
    assert!(!result.sms.success);
    assert!(!result.whatsapp.success);
}

#[tokio::test]
async fn missing_credentials_issue_zero_network_calls() {
    let server = MockServer::start().await;
    let unconfigured = NotificationService::with_messages_url(
        MessagingConfig::default(),
        format!("{}/Messages.json", server.uri()),
    );

    let result = unconfigured.send_notification("9876543210", "hello").await;
    assert!(!result.sms.success);
    assert!(!result.whatsapp.success);

    let bulk = unconfigured
        .send_bulk_whatsapp(&[("9876543210".to_string(), "hi".to_string())])
        .await;
    assert!(!bulk[0].outcome.success);

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn bulk_whatsapp_preserves_order_and_tags_phones() {
    let server = MockServer::start().await;
    mount_success(&server, "From=whatsapp%3A", "WA1").await;

    let entries = vec![
        ("9876543210".to_string(), "first".to_string()),
        ("9876543211".to_string(), "second".to_string()),
        ("9876543212".to_string(), "third".to_string()),
    ];
    let results = service(&server).send_bulk_whatsapp(&entries).await;

    assert_eq!(results.len(), 3);
    for (result, (phone, _)) in results.iter().zip(&entries) {
        assert_eq!(&result.phone, phone);
        assert!(result.outcome.success);
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn broadcast_counts_recipients_not_channels() {
    let server = MockServer::start().await;
    mount_success(&server, "Body=", "OK1").await;

    let recipients = vec![
        Recipient::new("9876543210"),
        Recipient::new("9876543211"),
        Recipient::new("9876543212"),
    ];
    let summary = service(&server)
        .broadcast_to_recipients(&recipients, "PTM tomorrow at 10am")
        .await;

    assert_eq!(summary.sent, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.results.len(), 3);
    // Two channel attempts per recipient.
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

#[tokio::test]
async fn broadcast_with_all_channels_down_counts_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "down"})))
        .mount(&server)
        .await;

    let recipients = vec![Recipient::new("9876543210"), Recipient::new("9876543211")];
    let summary = service(&server)
        .broadcast_to_recipients(&recipients, "hello")
        .await;

    assert_eq!(summary.sent, 0);
    assert_eq!(summary.failed, 2);
}

#[tokio::test]
async fn empty_broadcast_is_zero_zero_with_no_calls() {
    let server = MockServer::start().await;
    let summary = service(&server).broadcast_to_recipients(&[], "hello").await;

    assert_eq!(summary.sent, 0);
    assert_eq!(summary.failed, 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn broadcast_emergency_renders_the_alert_template() {
    let server = MockServer::start().await;
    mount_success(&server, "Body=", "OK1").await;

    let recipients = vec![Recipient::new("9876543210")];
    let summary = service(&server)
        .broadcast_emergency(&recipients, "high", "Weather warning", "School closes at noon.")
        .await;

    assert_eq!(summary.sent, 1);
    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body).to_string();
    // Severity is uppercased in the rendered body (form-encoded).
    assert!(body.contains("HIGH"));
    assert!(body.contains("EduTrack"));
}

#[tokio::test]
async fn template_send_carries_brand_and_parameters() {
    let server = MockServer::start().await;
    mount_success(&server, "Body=", "OK1").await;

    let result = service(&server)
        .send_absence_alert("9876543210", "Asha", "Rohan", "2024-07-15")
        .await;
    assert!(result.any_sent());

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body).to_string();
    assert!(body.contains("Rohan"));
    assert!(body.contains("EduTrack"));
}

#[tokio::test]
async fn whatsapp_from_falls_back_to_sms_sender() {
    let server = MockServer::start().await;
    mount_success(&server, "From=", "OK1").await;

    let mut config = config();
    config.whatsapp_from = None;
    let service =
        NotificationService::with_messages_url(config, format!("{}/Messages.json", server.uri()));

    service.send_notification("9876543210", "hello").await;

    let received = server.received_requests().await.unwrap();
    let bodies: Vec<String> = received
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).to_string())
        .collect();
    assert!(bodies
        .iter()
        .any(|b| b.contains("From=whatsapp%3A%2B15005550006")));
}
