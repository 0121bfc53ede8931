use mockito::Matcher;
use newsdesk::campaign::{CampaignClient, CampaignError, CampaignStatus, PushRequest, Sender};

fn client(server: &mockito::ServerGuard) -> CampaignClient {
    CampaignClient::new(server.url(), "ac-key", "Ready Artwork", "ai@readyartwork.com").unwrap()
}

fn push_request(status: CampaignStatus, scheduled_date: Option<&str>) -> PushRequest {
    PushRequest {
        list_id: "3".to_string(),
        campaign_name: "Weekly Digest".to_string(),
        subject: "This week in marketing".to_string(),
        html_content: "<h1>Hello</h1>".to_string(),
        status,
        address_id: None,
        scheduled_date: scheduled_date.map(str::to_string),
        sender: Sender::default(),
    }
}

#[tokio::test]
async fn test_lists_are_fetched_with_api_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/3/lists")
        .match_header("api-token", "ac-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"lists": [{"id": "1", "name": "Main", "stringid": "main"}, {"id": "2", "name": "VIP"}]}"#)
        .create_async()
        .await;

    let lists = client(&server).lists().await.unwrap();

    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0].id, "1");
    assert_eq!(lists[1].name, "VIP");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_addresses_get_display_strings() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/3/addresses")
        .with_status(200)
        .with_body(
            r#"{"addresses": [
                {"id": "4", "companyName": "Ready Artwork", "address1": "1 Main St", "city": "Austin", "state": "TX"},
                {"id": "5"}
            ]}"#,
        )
        .create_async()
        .await;

    let addresses = client(&server).addresses().await.unwrap();

    assert_eq!(addresses[0].display, "Ready Artwork - 1 Main St - Austin, TX");
    assert_eq!(addresses[1].display, "Address #5");
}

#[tokio::test]
async fn test_v3_error_carries_status_and_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/3/lists")
        .with_status(403)
        .with_body(r#"{"message": "You are not authorized to access this resource"}"#)
        .create_async()
        .await;

    let err = client(&server).lists().await.unwrap_err();
    match err {
        CampaignError::Api { status, message, .. } => {
            assert_eq!(status, 403);
            assert_eq!(message, "You are not authorized to access this resource");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_push_draft_creates_message_then_campaign() {
    let mut server = mockito::Server::new_async().await;

    let message = server
        .mock("POST", "/api/3/messages")
        .match_body(Matcher::PartialJsonString(
            r#"{"message": {"subject": "This week in marketing", "fromname": "Ready Artwork", "html": "<h1>Hello</h1>"}}"#
                .to_string(),
        ))
        .with_status(201)
        .with_body(r#"{"message": {"id": "55", "subject": "This week in marketing"}}"#)
        .create_async()
        .await;

    let campaign = server
        .mock("POST", "/admin/api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api_action".into(), "campaign_create".into()),
            Matcher::UrlEncoded("api_output".into(), "json".into()),
        ]))
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("status".into(), "0".into()),
            Matcher::UrlEncoded("sdate".into(), "".into()),
            Matcher::UrlEncoded("p[3]".into(), "3".into()),
            Matcher::UrlEncoded("m[55]".into(), "100".into()),
            Matcher::UrlEncoded("addressid".into(), "0".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"result_code": 1, "result_message": "Campaign saved", "id": 901}"#)
        .create_async()
        .await;

    let outcome = client(&server)
        .push_newsletter(&push_request(CampaignStatus::Draft, None))
        .await
        .unwrap();

    assert_eq!(outcome.message_id, "55");
    assert_eq!(outcome.campaign_id, "901");
    assert_eq!(outcome.status, CampaignStatus::Draft);
    message.assert_async().await;
    campaign.assert_async().await;
}

#[tokio::test]
async fn test_scheduled_campaign_sends_formatted_date() {
    let mut server = mockito::Server::new_async().await;

    let _message = server
        .mock("POST", "/api/3/messages")
        .with_status(201)
        .with_body(r#"{"message": {"id": 7}}"#)
        .create_async()
        .await;

    let campaign = server
        .mock("POST", "/admin/api.php")
        .match_query(Matcher::Any)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("status".into(), "1".into()),
            Matcher::UrlEncoded("sdate".into(), "2026-01-20 10:00:00".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"result_code": "1", "id": "12"}"#)
        .create_async()
        .await;

    let outcome = client(&server)
        .push_newsletter(&push_request(
            CampaignStatus::Scheduled,
            Some("2026-01-20T10:00:00"),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.campaign_id, "12");
    campaign.assert_async().await;
}

#[tokio::test]
async fn test_scheduled_without_date_creates_nothing() {
    let mut server = mockito::Server::new_async().await;
    let message = server
        .mock("POST", "/api/3/messages")
        .expect(0)
        .create_async()
        .await;

    let err = client(&server)
        .push_newsletter(&push_request(CampaignStatus::Scheduled, None))
        .await
        .unwrap_err();

    assert!(matches!(err, CampaignError::MissingScheduleDate));
    message.assert_async().await;
}

#[tokio::test]
async fn test_v1_rejection_is_reported_as_campaign_step() {
    let mut server = mockito::Server::new_async().await;

    let _message = server
        .mock("POST", "/api/3/messages")
        .with_status(201)
        .with_body(r#"{"message": {"id": "8"}}"#)
        .create_async()
        .await;
    let _campaign = server
        .mock("POST", "/admin/api.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"result_code": 0, "result_message": "You must select a list"}"#)
        .create_async()
        .await;

    let err = client(&server)
        .push_newsletter(&push_request(CampaignStatus::Immediate, None))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Failed to create campaign"), "{}", message);
    assert!(message.contains("You must select a list"), "{}", message);
}

#[tokio::test]
async fn test_message_failure_stops_before_campaign() {
    let mut server = mockito::Server::new_async().await;

    let _message = server
        .mock("POST", "/api/3/messages")
        .with_status(422)
        .with_body(r#"{"errors": [{"title": "The sender email is invalid"}]}"#)
        .create_async()
        .await;
    let campaign = server
        .mock("POST", "/admin/api.php")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = client(&server)
        .push_newsletter(&push_request(CampaignStatus::Draft, None))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Failed to create message"));
    assert!(err.to_string().contains("sender email is invalid"));
    campaign.assert_async().await;
}
