//! Refresh-and-retry behavior under each refresh policy

use foodsnap::pipeline::{ApiRequest, RefreshPolicy};
use foodsnap::{Credential, PipelineError};

use crate::integration::test_utils::{delayed, ok, pipeline_with, Reply, ScriptedTransport};

#[tokio::test]
async fn test_per_request_policy_refreshes_for_each_failure() {
    let transport = ScriptedTransport::new()
        .on("/dish/my/", ok(401, "expired"))
        .on("/dish/my/", ok(401, "expired"))
        .on("/dish/my/", ok(200, "first"))
        .on("/dish/my/", ok(200, "second"))
        .on("/auth/refresh", delayed(3, 200, r#"{"access_token":"t2"}"#))
        .on("/auth/refresh", delayed(3, 200, r#"{"access_token":"t3"}"#));
    let (pipeline, tokens, _storage) = pipeline_with(transport.clone(), RefreshPolicy::PerRequest);
    tokens.login(Credential::new("t1"));

    let (a, b) = futures::join!(
        pipeline.send(ApiRequest::get("/dish/my/")),
        pipeline.send(ApiRequest::get("/dish/my/"))
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(transport.count("/auth/refresh"), 2);
    assert_eq!(transport.count("/dish/my/"), 4);
    assert!(tokens.is_authenticated());
}

#[tokio::test]
async fn test_single_flight_policy_shares_one_refresh() {
    let transport = ScriptedTransport::new()
        .on("/dish/my/", ok(401, "expired"))
        .on("/dish/my/", ok(401, "expired"))
        .on("/dish/my/", ok(200, "first"))
        .on("/dish/my/", ok(200, "second"))
        .on("/auth/refresh", delayed(3, 200, r#"{"access_token":"t2"}"#));
    let (pipeline, tokens, _storage) =
        pipeline_with(transport.clone(), RefreshPolicy::SingleFlight);
    tokens.login(Credential::new("t1"));

    let (a, b) = futures::join!(
        pipeline.send(ApiRequest::get("/dish/my/")),
        pipeline.send(ApiRequest::get("/dish/my/"))
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(transport.count("/auth/refresh"), 1);

    let retried: Vec<_> = transport
        .sent()
        .into_iter()
        .filter(|r| r.url.ends_with("/dish/my/"))
        .skip(2)
        .map(|r| r.header("Authorization").map(str::to_string))
        .collect();
    assert_eq!(
        retried,
        vec![Some("Bearer t2".to_string()), Some("Bearer t2".to_string())]
    );
    assert_eq!(tokens.token().unwrap().as_str(), "t2");
}

#[tokio::test]
async fn test_single_flight_failure_reaches_every_waiter() {
    let transport = ScriptedTransport::new()
        .on("/x", ok(401, ""))
        .on("/x", ok(401, ""))
        .on("/auth/refresh", delayed(3, 401, "refresh token expired"));
    let (pipeline, tokens, storage) =
        pipeline_with(transport.clone(), RefreshPolicy::SingleFlight);
    tokens.login(Credential::new("t1"));

    let (a, b) = futures::join!(
        pipeline.send(ApiRequest::get("/x")),
        pipeline.send(ApiRequest::get("/x"))
    );
    assert!(a.unwrap_err().is_session_lost());
    assert!(b.unwrap_err().is_session_lost());
    assert_eq!(transport.count("/auth/refresh"), 1);
    assert_eq!(transport.count("/x"), 2);
    assert!(!tokens.is_authenticated());
    assert!(!storage.contains(foodsnap::storage::AUTH_FLAG_KEY).unwrap());
}

#[tokio::test]
async fn test_refresh_precedes_retry_and_sends_no_bearer() {
    let transport = ScriptedTransport::new()
        .on("/dish/", ok(401, ""))
        .on("/dish/", ok(200, "{}"))
        .on("/auth/refresh", ok(200, r#"{"access_token":"t2"}"#));
    let (pipeline, tokens, _storage) = pipeline_with(transport.clone(), RefreshPolicy::PerRequest);
    tokens.login(Credential::new("t1"));

    pipeline
        .send(ApiRequest::post("/dish/").json(serde_json::json!({"a": 1})))
        .await
        .unwrap();

    let sent = transport.sent();
    let urls: Vec<_> = sent.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "http://api.test/dish/",
            "http://api.test/auth/refresh",
            "http://api.test/dish/"
        ]
    );
    assert!(sent[1].header("Authorization").is_none());
    assert_eq!(sent[0].header("Authorization"), Some("Bearer t1"));
    assert_eq!(sent[2].header("Authorization"), Some("Bearer t2"));
}

#[tokio::test]
async fn test_network_error_is_not_retried() {
    let transport = ScriptedTransport::new().on(
        "/x",
        Reply::Respond(Err(PipelineError::Network("connection reset".into()))),
    );
    let (pipeline, tokens, _storage) = pipeline_with(transport.clone(), RefreshPolicy::PerRequest);
    tokens.login(Credential::new("t1"));

    let err = pipeline.send(ApiRequest::get("/x")).await.unwrap_err();
    assert_eq!(err, PipelineError::Network("connection reset".into()));
    assert_eq!(transport.count("/auth/refresh"), 0);
    assert!(tokens.is_authenticated());
}
