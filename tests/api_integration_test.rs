//! Integration tests for the HTTP service clients.
//!
//! These verify the wire contracts against a mock server: request shapes,
//! bearer authentication, and response classification into the crate's
//! error taxonomy.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use berean::api::{
    AccountApi, BillingApi, HttpAccountApi, HttpBillingApi, HttpNotificationApi, NotificationApi,
};
use berean::{Error, PushRegistration};

fn user_body(premium: bool) -> serde_json::Value {
    json!({
        "user_id": "user_3f2a9c1d77aa",
        "email": "ruth@example.com",
        "name": "Ruth",
        "is_premium": premium
    })
}

fn auth_body(premium: bool) -> serde_json::Value {
    let mut body = user_body(premium);
    body["token"] = json!("brn_live_token");
    body
}

mod account_api {
    use super::*;

    #[tokio::test]
    async fn login_parses_token_and_flattened_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({
                "email": "ruth@example.com",
                "password": "hunter2"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(false)))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpAccountApi::new(&format!("{}/api", server.uri()));
        let response = api
            .login("ruth@example.com", "hunter2")
            .await
            .expect("login should succeed");

        assert_eq!(response.token, "brn_live_token");
        assert_eq!(response.user.user_id, "user_3f2a9c1d77aa");
        assert!(!response.user.is_premium);
    }

    #[tokio::test]
    async fn login_rejection_carries_backend_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let api = HttpAccountApi::new(&format!("{}/api", server.uri()));
        let result = api.login("ruth@example.com", "wrong").await;

        match result {
            Err(Error::CredentialRejected(detail)) => {
                assert_eq!(detail, "Invalid credentials");
            }
            other => panic!("expected CredentialRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_posts_all_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .and(body_json(json!({
                "name": "Ruth",
                "email": "ruth@example.com",
                "password": "hunter2"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(false)))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpAccountApi::new(&format!("{}/api", server.uri()));
        api.register("Ruth", "ruth@example.com", "hunter2")
            .await
            .expect("register should succeed");
    }

    #[tokio::test]
    async fn exchange_session_posts_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/session"))
            .and(body_json(json!({ "session_id": "sess_abc123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(false)))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpAccountApi::new(&format!("{}/api", server.uri()));
        api.exchange_session("sess_abc123")
            .await
            .expect("exchange should succeed");
    }

    #[tokio::test]
    async fn who_am_i_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("authorization", "Bearer brn_live_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body(true)))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpAccountApi::new(&format!("{}/api", server.uri()));
        let user = api.who_am_i("brn_live_token").await.expect("who_am_i");
        assert!(user.is_premium);
    }

    #[tokio::test]
    async fn server_errors_classify_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let api = HttpAccountApi::new(&format!("{}/api", server.uri()));
        let result = api.who_am_i("brn_live_token").await;
        assert!(matches!(result, Err(Error::Transient(_))));
    }
}

mod notification_api {
    use super::*;

    #[tokio::test]
    async fn public_key_is_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/push/vapid-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"publicKey": "BPk3yK..."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpNotificationApi::new(&format!("{}/api", server.uri()));
        let key = api.public_key().await.expect("public key");
        assert_eq!(key, "BPk3yK...");
    }

    #[tokio::test]
    async fn submit_subscription_posts_registration_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/push/subscribe"))
            .and(header("authorization", "Bearer brn_live_token"))
            .and(body_json(json!({
                "endpoint": "https://push.example.com/reg/device-1",
                "p256dh": "device-public-key",
                "auth": "device-auth-secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpNotificationApi::new(&format!("{}/api", server.uri()));
        let registration = PushRegistration {
            endpoint: "https://push.example.com/reg/device-1".into(),
            p256dh: "device-public-key".into(),
            auth: "device-auth-secret".into(),
        };
        api.submit_subscription("brn_live_token", &registration)
            .await
            .expect("submit");
    }

    #[tokio::test]
    async fn status_reads_subscribed_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/push/status"))
            .and(header("authorization", "Bearer brn_live_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subscribed": true})))
            .mount(&server)
            .await;

        let api = HttpNotificationApi::new(&format!("{}/api", server.uri()));
        assert!(api.status("brn_live_token").await.expect("status"));
    }

    #[tokio::test]
    async fn remove_subscription_uses_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/push/unsubscribe"))
            .and(header("authorization", "Bearer brn_live_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpNotificationApi::new(&format!("{}/api", server.uri()));
        api.remove_subscription("brn_live_token")
            .await
            .expect("remove");
    }

    #[tokio::test]
    async fn non_premium_rejection_classifies_as_capability_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/push/test"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"detail": "Premium subscription required"})),
            )
            .mount(&server)
            .await;

        let api = HttpNotificationApi::new(&format!("{}/api", server.uri()));
        let result = api.send_test("brn_live_token").await;
        assert!(matches!(result, Err(Error::CapabilityDenied(_))));
    }
}

mod billing_api {
    use super::*;

    #[tokio::test]
    async fn checkout_status_addresses_session_and_parses_states() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/subscription/status/cs_test_123"))
            .and(header("authorization", "Bearer brn_live_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "complete",
                "payment_status": "paid",
                "amount": 9.99
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpBillingApi::new(&format!("{}/api", server.uri()));
        let status = api
            .checkout_status("brn_live_token", "cs_test_123")
            .await
            .expect("status");

        assert!(status.is_paid());
        assert!(!status.is_expired());
        assert_eq!(status.amount, Some(9.99));
    }
}
