mod common;

use common::{ScriptedHttp, Step};
use core_auth::{InMemoryTokenStore, TokenStore};
use core_network::{
    ApiClient, BodySpec, Descriptor, Endpoint, MultipartPart, NetworkError, RequestBuilder,
};
use core_runtime::config::AppMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

fn builder() -> RequestBuilder {
    RequestBuilder::new(AppMetadata::new("2.3.1", "ios", "km_KH"))
}

fn base() -> Url {
    Url::parse("http://host/api/").unwrap()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct CheckIn {
    #[serde(rename = "qrCode")]
    qr_code: String,
    attempts: Vec<u32>,
}

fn sample_descriptors() -> Vec<Descriptor> {
    let mut query = BTreeMap::new();
    query.insert("page".to_string(), "1".to_string());
    vec![
        Descriptor::get(base(), "/v1/gyms").accept_json(),
        Descriptor::post(base(), "/checkin").json(CheckIn {
            qr_code: "QR-1".to_string(),
            attempts: vec![1, 2],
        }),
        Descriptor::post(base(), "/auth/logout").body(BodySpec::Json(None)),
        Descriptor::get(base(), "/v1/subscriptions").body(BodySpec::Parameters {
            body: None,
            query,
        }),
        Descriptor::post(base(), "/v1/dms/upload")
            .multipart(vec![MultipartPart::text("kind", "passport")]),
    ]
}

#[test]
fn authorization_header_present_iff_token() {
    for descriptor in sample_descriptors() {
        let with_token = builder().build(&descriptor, Some("t-1")).unwrap();
        assert_eq!(with_token.header_value("Authorization"), Some("Basic t-1"));

        let without = builder().build(&descriptor, None).unwrap();
        assert_eq!(without.header_value("Authorization"), None);
    }
}

#[test]
fn json_body_is_exactly_base_and_payload() {
    let payloads = vec![
        serde_json::json!({"qrCode": "QR-9"}),
        serde_json::json!({"token_verify": "123456"}),
        serde_json::json!([1, 2, 3]),
        serde_json::json!("plain"),
        serde_json::json!({"nested": {"deep": [true, null, 1.5]}}),
    ];

    for payload in payloads {
        let descriptor = Descriptor::post(base(), "/anything").json(payload.clone());
        let request = builder().build(&descriptor, None).unwrap();
        let body: serde_json::Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();

        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(body["payload"], payload);
        assert_eq!(
            body["base"],
            serde_json::json!({"appVersion": "2.3.1", "platform": "ios", "locale": "km_KH"})
        );
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
    }
}

#[test]
fn multipart_sections_match_parts() {
    let parts = vec![
        MultipartPart::file("files[]", "front.jpg", "image/jpeg", vec![0xFF, 0xD8, 0x00, 0x0D]),
        MultipartPart::file("files[]", "back.jpg", "image/jpeg", vec![0xFF, 0xD9]),
        MultipartPart::text("owner", "member-7"),
    ];
    let descriptor = Descriptor::post(base(), "/v1/dms/upload").multipart(parts.clone());

    let request = builder().build(&descriptor, None).unwrap();
    let content_type = request.header_value("Content-Type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let boundary = content_type.trim_start_matches("multipart/form-data; boundary=");

    let body = request.body.as_ref().unwrap().to_vec();
    let delimiter = format!("--{}\r\n", boundary).into_bytes();
    let closing = format!("--{}--\r\n", boundary).into_bytes();
    assert!(body.ends_with(&closing));

    let sections = split(&body[..body.len() - closing.len()], &delimiter);
    assert_eq!(sections.len(), parts.len());

    for (section, part) in sections.iter().zip(&parts) {
        let header_end = find(section, b"\r\n\r\n").unwrap();
        let headers = String::from_utf8(section[..header_end].to_vec()).unwrap();
        let content = &section[header_end + 4..section.len() - 2];

        let mut expected = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = &part.filename {
            expected.push_str(&format!("; filename=\"{}\"", filename));
        }
        if let Some(mime) = &part.mime_type {
            expected.push_str(&format!("\r\nContent-Type: {}", mime));
        }
        assert_eq!(headers, expected);
        assert_eq!(content, &part.data[..]);
    }
}

#[test]
fn base_path_join_keeps_every_segment() {
    let request = builder()
        .build(&Descriptor::get(base(), "/v1/gyms"), None)
        .unwrap();
    assert_eq!(request.url, "http://host/api/v1/gyms");
}

#[derive(Debug, Deserialize, PartialEq)]
struct Gym {
    id: String,
    name: String,
}

struct GymList;

impl Endpoint for GymList {
    fn descriptor(&self, base: &Url) -> Descriptor {
        Descriptor::get(base.clone(), "/v1/gyms").accept_json()
    }
}

fn client(http: Arc<ScriptedHttp>, tokens: Arc<InMemoryTokenStore>) -> ApiClient {
    ApiClient::new(http, builder(), tokens, base())
}

#[tokio::test]
async fn enveloped_payload_is_unwrapped() {
    let http = Arc::new(ScriptedHttp::new(vec![Step::Respond(
        200,
        r#"{"status":"ok","data":{"id":"g1","name":"Gym A"}}"#,
    )]));

    let gym: Gym = client(http.clone(), Arc::new(InMemoryTokenStore::new()))
        .call(&GymList)
        .await
        .unwrap();

    assert_eq!(
        gym,
        Gym {
            id: "g1".to_string(),
            name: "Gym A".to_string()
        }
    );
    let (request, _) = &http.uploads()[0];
    assert_eq!(request.url, "http://host/api/v1/gyms");
    assert_eq!(request.header_value("Accept"), Some("application/json"));
}

#[tokio::test]
async fn structured_not_found_is_server_error() {
    let http = Arc::new(ScriptedHttp::new(vec![Step::Respond(
        404,
        r#"{"code":404,"message":"not found"}"#,
    )]));

    let err = client(http.clone(), Arc::new(InMemoryTokenStore::new()))
        .call::<Gym, _>(&GymList)
        .await
        .unwrap_err();

    match &err {
        NetworkError::Server { status, body } => {
            assert_eq!(*status, 404);
            assert_eq!(body.code, Some(404));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "not found");
    assert_eq!(http.attempts(), 1);
}

#[tokio::test]
async fn token_changes_apply_to_next_request() {
    let http = Arc::new(ScriptedHttp::new(vec![
        Step::Respond(200, "[]"),
        Step::Respond(200, "[]"),
    ]));
    let tokens = Arc::new(InMemoryTokenStore::new());
    let client = client(http.clone(), tokens.clone());

    let _: Vec<Gym> = client.call(&GymList).await.unwrap();
    tokens.set_access_token(Some("fresh".to_string())).await;
    let _: Vec<Gym> = client.call(&GymList).await.unwrap();

    let uploads = http.uploads();
    assert_eq!(uploads[0].0.header_value("Authorization"), None);
    assert_eq!(uploads[1].0.header_value("Authorization"), Some("Basic fresh"));
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut sections = Vec::new();
    let mut rest = body;
    assert!(rest.starts_with(delimiter));
    rest = &rest[delimiter.len()..];
    while let Some(next) = find(rest, delimiter) {
        sections.push(&rest[..next]);
        rest = &rest[next + delimiter.len()..];
    }
    sections.push(rest);
    sections
}
