//! Integration tests for the Google Play HTTP client and service-account auth.
//!
//! A wiremock server stands in for both the token endpoint and the
//! publishing API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{
    body_json, body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use play_deploy::auth::key::download;
use play_deploy::auth::{AuthError, ServiceAccountAuth, ServiceAccountKey, TokenProvider};
use play_deploy::core::config::KeySource;
use play_deploy::core::inputs::ExpansionSlot;
use play_deploy::core::types::{Release, ReleaseStatus, Track};
use play_deploy::publisher::google::{GooglePlayPublisher, RetryPolicy};
use play_deploy::publisher::{DeobfuscationKind, Publisher, PublisherError};

const PACKAGE: &str = "com.example.app";
const PRIVATE_KEY: &str = include_str!("fixtures/service_account_key.pem");

fn edits(rest: &str) -> String {
    format!("/androidpublisher/v3/applications/{}/edits{}", PACKAGE, rest)
}

fn uploads(rest: &str) -> String {
    format!(
        "/upload/androidpublisher/v3/applications/{}/edits/{}",
        PACKAGE, rest
    )
}

/// Token provider handing out `t0`, `t1`, ... one per invalidation.
#[derive(Default)]
struct CountingToken {
    generation: AtomicUsize,
}

#[async_trait]
impl TokenProvider for CountingToken {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        Ok(format!("t{}", self.generation.load(Ordering::SeqCst)))
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn account(&self) -> &str {
        "ci@example.iam.gserviceaccount.com"
    }
}

fn publisher(server: &MockServer) -> (GooglePlayPublisher, Arc<CountingToken>) {
    let tokens = Arc::new(CountingToken::default());
    let publisher =
        GooglePlayPublisher::with_host(Client::new(), tokens.clone(), PACKAGE, server.uri())
            .with_retry_policy(RetryPolicy {
                max_retries: 2,
                wait: Duration::ZERO,
            });
    (publisher, tokens)
}

fn key_json(token_uri: &str) -> String {
    json!({
        "type": "service_account",
        "client_email": "ci@example.iam.gserviceaccount.com",
        "private_key_id": "kid-1",
        "private_key": PRIVATE_KEY,
        "token_uri": token_uri,
    })
    .to_string()
}

// =============================================================================
// Service-account auth
// =============================================================================

mod auth {
    use super::*;

    #[tokio::test]
    async fn exchanges_assertion_and_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion=ey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let key = ServiceAccountKey::from_json(&key_json(&format!("{}/token", server.uri())))
            .unwrap();
        let auth = ServiceAccountAuth::new(key, Client::new());

        assert_eq!(auth.bearer_token().await.unwrap(), "ya29.token");
        assert_eq!(auth.bearer_token().await.unwrap(), "ya29.token");
        assert_eq!(auth.account(), "ci@example.iam.gserviceaccount.com");
    }

    #[tokio::test]
    async fn invalidate_forces_new_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "expires_in": 3599
            })))
            .expect(2)
            .mount(&server)
            .await;

        let key = ServiceAccountKey::from_json(&key_json(&format!("{}/token", server.uri())))
            .unwrap();
        let auth = ServiceAccountAuth::new(key, Client::new());

        auth.bearer_token().await.unwrap();
        auth.invalidate();
        auth.bearer_token().await.unwrap();
    }

    #[tokio::test]
    async fn refused_exchange_reports_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })))
            .mount(&server)
            .await;

        let key = ServiceAccountKey::from_json(&key_json(&format!("{}/token", server.uri())))
            .unwrap();
        let auth = ServiceAccountAuth::new(key, Client::new());

        match auth.bearer_token().await.unwrap_err() {
            AuthError::TokenExchange { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid_grant: Invalid JWT Signature.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn loads_remote_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/keys/sa.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(key_json("")))
            .mount(&server)
            .await;

        let source = KeySource::Remote(format!("{}/keys/sa.json", server.uri()));
        let key = ServiceAccountKey::load(&source, &Client::new()).await.unwrap();

        assert_eq!(key.client_email, "ci@example.iam.gserviceaccount.com");
        assert_eq!(key.token_uri(), play_deploy::auth::DEFAULT_TOKEN_URI);
    }

    #[tokio::test]
    async fn download_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sa.json"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sa.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let body = download(
            &Client::new(),
            &format!("{}/sa.json", server.uri()),
            1,
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn download_gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sa.json"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let err = download(
            &Client::new(),
            &format!("{}/sa.json", server.uri()),
            2,
            Duration::ZERO,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::KeyDownload(_)));
    }
}

// =============================================================================
// Edit lifecycle
// =============================================================================

mod edits {
    use super::*;

    #[tokio::test]
    async fn insert_edit_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(edits("")))
            .and(header("authorization", "Bearer t0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "e1",
                "expiryTimeSeconds": "1700000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let edit = publisher.insert_edit().await.unwrap();

        assert_eq!(edit.id, "e1");
        assert_eq!(edit.expiry_time_seconds.as_deref(), Some("1700000000"));
    }

    #[tokio::test]
    async fn list_tracks_parses_string_version_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(edits("/e1/tracks")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "androidpublisher#tracksListResponse",
                "tracks": [
                    {"track": "production", "releases": [
                        {"status": "completed", "versionCodes": ["10", "11"]}
                    ]},
                    {"track": "beta"}
                ]
            })))
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let tracks = publisher.list_tracks("e1").await.unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].version_codes(), vec![10, 11]);
        assert_eq!(tracks[1].name, "beta");
        assert!(tracks[1].releases.is_empty());
    }

    #[tokio::test]
    async fn empty_track_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(edits("/e1/tracks")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        assert!(publisher.list_tracks("e1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_track_puts_track_body() {
        let server = MockServer::start().await;
        let track = Track {
            releases: vec![Release {
                version_codes: vec![42],
                ..Release::with_status(ReleaseStatus::Completed)
            }],
            ..Track::empty("production")
        };
        let expected = json!({
            "track": "production",
            "releases": [{"versionCodes": ["42"], "status": "completed"}]
        });
        Mock::given(method("PUT"))
            .and(path(edits("/e1/tracks/production")))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(&expected))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let updated = publisher.update_track("e1", &track).await.unwrap();
        assert_eq!(updated, track);
    }

    #[tokio::test]
    async fn validate_edit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(edits("/e1:validate")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e1"})))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        assert_eq!(publisher.validate_edit("e1").await.unwrap().id, "e1");
    }

    #[tokio::test]
    async fn commit_sends_review_flag_only_when_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(edits("/e1:commit")))
            .and(query_param_is_missing("changesNotSentForReview"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "Changes cannot be sent for review automatically. Please set the query parameter changesNotSentForReview to true.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(edits("/e1:commit")))
            .and(query_param("changesNotSentForReview", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e1"})))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let refused = publisher.commit_edit("e1", false).await.unwrap_err();
        assert!(refused.is_review_refusal());
        assert!(publisher.commit_edit("e1", true).await.is_ok());
    }
}

// =============================================================================
// Uploads
// =============================================================================

mod uploads {
    use super::*;

    #[tokio::test]
    async fn upload_apk() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(uploads("e1/apks")))
            .and(query_param("uploadType", "media"))
            .and(header("content-type", "application/vnd.android.package-archive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "versionCode": 31,
                "binary": {"sha1": "aa", "sha256": "bb"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let apk = publisher
            .upload_apk("e1", Bytes::from_static(b"apk"))
            .await
            .unwrap();
        assert_eq!(apk.version_code, 31);
        assert_eq!(apk.sha256.as_deref(), Some("bb"));
    }

    #[tokio::test]
    async fn upload_bundle_with_acknowledgement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(uploads("e1/bundles")))
            .and(query_param("uploadType", "media"))
            .and(query_param("ackBundleInstallationWarning", "true"))
            .and(header("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "versionCode": 32,
                "sha256": "cc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let bundle = publisher
            .upload_bundle("e1", Bytes::from_static(b"aab"), true)
            .await
            .unwrap();
        assert_eq!(bundle.version_code, 32);
    }

    #[tokio::test]
    async fn upload_expansion_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(uploads("e1/apks/31/expansionFiles/patch")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expansionFile": {"fileSize": "3"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        publisher
            .upload_expansion_file("e1", 31, ExpansionSlot::Patch, Bytes::from_static(b"obb"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upload_deobfuscation_files() {
        let server = MockServer::start().await;
        for kind in ["proguard", "nativeCode"] {
            Mock::given(method("POST"))
                .and(path(uploads(&format!("e1/apks/31/deobfuscationFiles/{}", kind))))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "deobfuscationFile": {"symbolType": kind}
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let (publisher, _) = publisher(&server);
        for kind in [DeobfuscationKind::Proguard, DeobfuscationKind::NativeCode] {
            publisher
                .upload_deobfuscation_file("e1", 31, kind, Bytes::from_static(b"map"))
                .await
                .unwrap();
        }
    }
}

// =============================================================================
// Errors and retries
// =============================================================================

mod errors {
    use super::*;

    #[tokio::test]
    async fn server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(edits("")))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(edits("")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e2"})))
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        assert_eq!(publisher.insert_edit().await.unwrap().id, "e2");
    }

    #[tokio::test]
    async fn unauthorized_invalidates_token_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(edits("/e1/tracks")))
            .and(header("authorization", "Bearer t0"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "Request had invalid authentication credentials."}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(edits("/e1/tracks")))
            .and(header("authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tracks": []})))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, tokens) = publisher(&server);
        assert!(publisher.list_tracks("e1").await.unwrap().is_empty());
        assert_eq!(tokens.generation.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(edits("")))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        assert_eq!(
            publisher.insert_edit().await.unwrap_err(),
            PublisherError::RateLimited
        );
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(uploads("e1/bundles")))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "The installation of the app bundle may be too large and trigger user warning on some devices, and this needs to be explicitly acknowledged in the request."
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let err = publisher
            .upload_bundle("e1", Bytes::from_static(b"aab"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PublisherError::Api { status: 403, .. }));
        assert!(err.is_bundle_installation_warning());
    }

    #[tokio::test]
    async fn not_found_and_unparseable_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(edits("/gone:validate")))
            .respond_with(ResponseTemplate::new(404).set_body_string("<html>missing</html>"))
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        assert_eq!(
            publisher.validate_edit("gone").await.unwrap_err(),
            PublisherError::NotFound("Not Found".into())
        );
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(uploads("e1/apks")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let (publisher, _) = publisher(&server);
        let err = publisher
            .upload_apk("e1", Bytes::from_static(b"apk"))
            .await
            .unwrap_err();
        assert!(matches!(err, PublisherError::InvalidResponse(_)));
    }
}
