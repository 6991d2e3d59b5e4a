//! Integration tests for the email service client.

#![allow(clippy::unwrap_used)]

mod common;

use common::{ScriptedTransport, api, session};
use djombi_auth::HttpResponse;
use djombi_core::{Category, EmailError, OutgoingEmail};
use reqwest::Method;
use serde_json::json;

#[tokio::test]
async fn test_fetch_without_account_makes_no_request() {
    let transport = ScriptedTransport::new(|_| HttpResponse::json(200, &json!([])));
    let api = api(&transport, session(None));

    let err = api.fetch_emails_by_category(Category::Spam).await.unwrap_err();
    assert!(matches!(err, EmailError::NoAccountSelected));
    assert!(err.to_string().starts_with("Email ID missing"));
    assert_eq!(transport.calls(), 0);

    let err = api
        .send_email(&OutgoingEmail::new("a@example.com", "Hi", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, EmailError::NoAccountSelected));
    assert!(matches!(api.delete_draft("d-1").await, Err(EmailError::NoAccountSelected)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_fetch_builds_list_request() {
    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(
            200,
            &json!({"success": true, "data": [
                {"id": "m-1", "from": "ana@example.com", "subject": "Hello"},
                {"subject": "no id"}
            ]}),
        )
    });
    let api = api(&transport, session(Some("acc-1")));

    let emails = api.fetch_emails_by_category(Category::Draft).await.unwrap();
    assert_eq!(emails.len(), 2);
    assert_eq!(emails[0].id, "m-1");
    assert!(emails[1].id.starts_with("draft-"));
    assert_eq!(emails[1].category, Category::Draft);

    let request = transport.last();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.url.as_str(), "https://mail.example.com/api/v1/emails/drafts");
    assert_eq!(request.query_value("email_id"), Some("acc-1"));
    assert_eq!(request.query_value("offset"), Some("1"));
    assert_eq!(request.query_value("limit"), Some("100"));
    assert_eq!(request.bearer_token(), Some("dj-1"));
}

#[tokio::test]
async fn test_no_emails_failure_is_empty() {
    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(200, &json!({"success": false, "message": "No spam emails found"}))
    });
    let api = api(&transport, session(Some("acc-1")));
    assert!(api.fetch_emails_by_category(Category::Spam).await.unwrap().is_empty());

    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(404, &json!({"success": false, "message": "No emails found"}))
    });
    let api = common::api(&transport, session(Some("acc-1")));
    assert!(api.fetch_emails_by_category(Category::Inbox).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_api_failures() {
    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(200, &json!({"success": false, "message": "Mailbox locked"}))
    });
    let api = api(&transport, session(Some("acc-1")));
    let err = api.fetch_emails_by_category(Category::Inbox).await.unwrap_err();
    assert!(matches!(err, EmailError::Api(ref m) if m == "Mailbox locked"));

    let transport =
        ScriptedTransport::new(|_| HttpResponse::json(403, &json!({"message": "forbidden"})));
    let api = common::api(&transport, session(Some("acc-1")));
    let err = api.fetch_emails_by_category(Category::Inbox).await.unwrap_err();
    assert!(matches!(err, EmailError::AccessDenied));

    let transport =
        ScriptedTransport::new(|_| HttpResponse::json(500, &json!({"message": "boom"})));
    let api = common::api(&transport, session(Some("acc-1")));
    let err = api.fetch_emails_by_category(Category::Inbox).await.unwrap_err();
    assert!(matches!(err, EmailError::Api(ref m) if m == "boom"));
}

#[tokio::test]
async fn test_status_errors_win_over_no_emails_wording() {
    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(
            403,
            &json!({"success": false, "message": "No access to this email account"}),
        )
    });
    let api = api(&transport, session(Some("acc-1")));
    let err = api.fetch_emails_by_category(Category::Inbox).await.unwrap_err();
    assert!(matches!(err, EmailError::AccessDenied));

    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(503, &json!({"message": "No emails: mail server unavailable"}))
    });
    let api = common::api(&transport, session(Some("acc-1")));
    let err = api.fetch_emails_by_category(Category::Inbox).await.unwrap_err();
    assert!(matches!(err, EmailError::Api(ref m) if m == "No emails: mail server unavailable"));

    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(
            200,
            &json!({"success": false, "message": "No connection to email server"}),
        )
    });
    let api = common::api(&transport, session(Some("acc-1")));
    let err = api.fetch_emails_by_category(Category::Inbox).await.unwrap_err();
    assert!(matches!(err, EmailError::Api(ref m) if m == "No connection to email server"));
}

#[tokio::test]
async fn test_malformed_list_degrades_to_empty() {
    let transport = ScriptedTransport::new(|_| HttpResponse::new(200, "<html>oops</html>"));
    let api = api(&transport, session(Some("acc-1")));
    assert!(api.fetch_emails_by_category(Category::Sent).await.unwrap().is_empty());

    let transport = ScriptedTransport::new(|_| HttpResponse::json(200, &json!({"success": true})));
    let api = common::api(&transport, session(Some("acc-1")));
    assert!(api.fetch_emails_by_category(Category::Sent).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unrecoverable_401_is_authentication_failed() {
    let transport =
        ScriptedTransport::new(|_| HttpResponse::json(401, &json!({"message": "expired"})));
    let session = session(Some("acc-1"));
    let api = api(&transport, session.clone());

    let err = api.fetch_emails_by_category(Category::Inbox).await.unwrap_err();
    assert!(matches!(err, EmailError::AuthenticationFailed));
    assert!(session.get_djombi_tokens().is_none());
}

#[tokio::test]
async fn test_mutations_hit_their_endpoints() {
    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(200, &json!({"success": true, "message": "ok"}))
    });
    let api = api(&transport, session(Some("acc-1")));
    let draft = OutgoingEmail::new("b@example.com", "Draft", "Body");

    let ack = api.send_email(&draft).await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("ok"));
    let request = transport.last();
    assert_eq!(request.method, Method::POST);
    assert!(request.url.path().ends_with("/emails/send"));
    assert_eq!(request.body.as_ref().unwrap()["email_id"], "acc-1");

    api.create_draft(&draft).await.unwrap();
    assert_eq!(transport.last().method, Method::POST);
    assert!(transport.last().url.path().ends_with("/emails/drafts"));

    api.update_draft("d-1", &draft).await.unwrap();
    let request = transport.last();
    assert_eq!(request.method, Method::PUT);
    assert!(request.url.path().ends_with("/emails/drafts/d-1"));

    api.delete_draft("d-1").await.unwrap();
    let request = transport.last();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.query_value("email_id"), Some("acc-1"));

    api.move_email("m-1", Category::Spam).await.unwrap();
    let request = transport.last();
    assert_eq!(request.method, Method::PUT);
    assert!(request.url.path().ends_with("/emails/m-1/move"));
    assert_eq!(request.body.as_ref().unwrap()["category"], "spam");
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn test_mutation_rejected_by_body_flag() {
    let transport = ScriptedTransport::new(|_| {
        HttpResponse::json(200, &json!({"success": false, "message": "Recipient invalid"}))
    });
    let api = api(&transport, session(Some("acc-1")));
    let err = api
        .send_email(&OutgoingEmail::new("bad", "Hi", "Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, EmailError::Api(ref m) if m == "Recipient invalid"));
}

#[tokio::test]
async fn test_account_is_read_per_call() {
    let transport = ScriptedTransport::new(|_| HttpResponse::json(200, &json!([])));
    let session = session(Some("acc-1"));
    let api = api(&transport, session.clone());

    api.fetch_emails_by_category(Category::Inbox).await.unwrap();
    assert_eq!(transport.last().query_value("email_id"), Some("acc-1"));

    session.set_selected_linked_email(&djombi_auth::SelectedEmailAccount::new("acc-2"));
    api.fetch_emails_by_category(Category::Inbox).await.unwrap();
    assert_eq!(transport.last().query_value("email_id"), Some("acc-2"));

    session.clear_email_data();
    assert!(matches!(
        api.fetch_emails_by_category(Category::Inbox).await,
        Err(EmailError::NoAccountSelected)
    ));
}
