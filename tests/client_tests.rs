use sourcemap_release::build::{Artifact, BuildManifest};
use sourcemap_release::client::{ReleaseApi, ReleaseClient};
use sourcemap_release::config::{
    CommitSpec, FinalizeEndpoint, ReleaseMetadata, RepositoryRef, UploadConfig,
};
use sourcemap_release::error::ClientError;
use sourcemap_release::orchestrator::{BuildOutcome, UploadOrchestrator};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Request as seen by the test server
#[derive(Debug, Clone)]
struct Captured {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn form_field(&self, name: &str) -> Option<String> {
        let body = self.body_text();
        let marker = format!("name=\"{}\"", name);
        let start = body.find(&marker)?;
        let rest = &body[start..];
        let value_start = rest.find("\r\n\r\n")? + 4;
        let value = &rest[value_start..];
        let value_end = value.find("\r\n")?;
        Some(value[..value_end].to_string())
    }
}

type Log = Arc<Mutex<Vec<Captured>>>;

/// Serve canned responses in order, repeating the last one once exhausted
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();
    let requests = Arc::clone(&log);

    tokio::spawn(async move {
        let mut served = 0usize;
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(request) = read_request(&mut stream).await else {
                continue;
            };
            requests.lock().unwrap().push(request);

            let (status, body) = responses[served.min(responses.len() - 1)];
            served += 1;
            let response = format!(
                "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{}/", addr), log)
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let mut body = buf[header_end..].to_vec();
    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok());
    let chunked = headers
        .iter()
        .any(|(k, v)| k == "transfer-encoding" && v.contains("chunked"));

    if let Some(len) = content_length {
        while body.len() < len {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(len);
    } else if chunked {
        while !body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body = decode_chunked(&body);
    }

    Ok(Captured {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_chunked(mut data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(data, b"\r\n") {
        let size_text = String::from_utf8_lossy(&data[..line_end]);
        let size = usize::from_str_radix(size_text.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        out.extend_from_slice(&data[start..start + size]);
        data = &data[start + size + 2..];
    }
    out
}

fn config(url: &str) -> UploadConfig {
    UploadConfig {
        url: url.to_string(),
        organization: "acme".to_string(),
        project: "web".to_string(),
        auth_token: "secret-token".to_string(),
        version: "v1".to_string(),
        retries: 2,
        retry_delay_ms: 0,
        timeout_secs: 5,
        ..Default::default()
    }
}

fn artifact(dir: &TempDir, name: &str, content: &str) -> Artifact {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    Artifact {
        name: name.to_string(),
        is_source_map: name.ends_with(".map"),
        path,
    }
}

#[tokio::test]
async fn test_create_release_request() {
    let (url, log) = serve(vec![(201, r#"{"version":"v1","dateCreated":"2024-05-01T10:00:00Z"}"#)]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();

    let metadata = ReleaseMetadata {
        git_ref: Some("abc123".to_string()),
        refs: vec![RepositoryRef {
            repository: "acme/web".to_string(),
            commit: "abc123".to_string(),
            previous_commit: None,
        }],
        commits: Vec::new(),
    };
    let record = client.create_release("v1", &metadata).await.unwrap();
    assert_eq!(record.version, "v1");
    assert!(record.date_created.is_some());

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/0/projects/acme/web/releases/");
    assert_eq!(request.header("authorization"), Some("Bearer secret-token"));

    let body = request.json();
    assert_eq!(body["version"], "v1");
    assert_eq!(body["ref"], "abc123");
    assert_eq!(body["refs"][0]["repository"], "acme/web");
    assert!(body.get("commits").is_none());
}

#[tokio::test]
async fn test_create_release_sends_commits() {
    let (url, log) = serve(vec![(201, r#"{"version":"v1"}"#)]).await;
    let config = UploadConfig {
        commits: vec![CommitSpec {
            id: "abc123".to_string(),
            repository: Some("acme/web".to_string()),
            message: None,
            author_name: Some("Jane Doe".to_string()),
            author_email: Some("jane@example.com".to_string()),
            timestamp: None,
        }],
        ..config(&url)
    };
    let client = ReleaseClient::new(&config).unwrap();

    client
        .create_release("v1", &config.release_metadata())
        .await
        .unwrap();

    let requests = log.lock().unwrap().clone();
    let body = requests[0].json();
    let commit = &body["commits"][0];
    assert_eq!(commit["id"], "abc123");
    assert_eq!(commit["repository"], "acme/web");
    assert_eq!(commit["authorName"], "Jane Doe");
    assert_eq!(commit["authorEmail"], "jane@example.com");
    assert!(commit.get("author_name").is_none());
    assert!(commit.get("message").is_none());
    assert!(body.get("refs").is_none());
}

#[tokio::test]
async fn test_create_release_empty_body() {
    let (url, _log) = serve(vec![(201, "")]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();

    let record = client
        .create_release("v1", &ReleaseMetadata::default())
        .await
        .unwrap();
    assert_eq!(record.version, "v1");
}

#[tokio::test]
async fn test_upload_script_with_sourcemap_link() {
    let (url, log) = serve(vec![(201, r#"{"id":7,"name":"~/static/app.js","size":21}"#)]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();
    let dir = TempDir::new().unwrap();
    let script = artifact(&dir, "app.js", "console.log('hello');");

    let record = client
        .upload_artifact("v1", &script, "~/static/app.js")
        .await
        .unwrap();
    assert_eq!(record.id, "7");

    let requests = log.lock().unwrap().clone();
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/0/projects/acme/web/releases/v1/files/");
    assert_eq!(request.header("authorization"), Some("Bearer secret-token"));
    assert!(
        request
            .header("content-type")
            .is_some_and(|v| v.starts_with("multipart/form-data"))
    );
    assert_eq!(request.form_field("name").as_deref(), Some("~/static/app.js"));
    assert_eq!(
        request.form_field("header").as_deref(),
        Some("Sourcemap:app.js.map")
    );
    assert!(request.body_text().contains("filename=\"app.js\""));
    assert!(request.body_text().contains("console.log('hello');"));
}

#[tokio::test]
async fn test_upload_source_map_has_no_link() {
    let (url, log) = serve(vec![(201, "{}")]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();
    let dir = TempDir::new().unwrap();
    let map = artifact(&dir, "app.js.map", r#"{"version":3}"#);

    let record = client
        .upload_artifact("v1", &map, "~/static/app.js.map")
        .await
        .unwrap();
    assert_eq!(record.name, "");

    let requests = log.lock().unwrap().clone();
    assert_eq!(
        requests[0].form_field("name").as_deref(),
        Some("~/static/app.js.map")
    );
    assert_eq!(requests[0].form_field("header"), None);
}

#[tokio::test]
async fn test_upload_missing_file_makes_no_request() {
    let (url, log) = serve(vec![(201, "{}")]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();
    let missing = Artifact {
        name: "gone.js".to_string(),
        path: "/definitely/not/here/gone.js".into(),
        is_source_map: false,
    };

    let err = client
        .upload_artifact("v1", &missing, "~/gone.js")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ArtifactRead { .. }));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_finalize_release_root() {
    let (url, log) = serve(vec![(200, r#"{"version":"v1","dateReleased":"2024-05-01T10:05:00Z"}"#)]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();

    let record = client.finalize_release("v1").await.unwrap();
    assert!(record.date_released.is_some());

    let requests = log.lock().unwrap().clone();
    let request = &requests[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/api/0/projects/acme/web/releases/v1/");

    let body = request.json();
    assert_eq!(body["projects"], serde_json::json!(["web"]));
    let released = body["dateReleased"].as_str().unwrap();
    assert!(released.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(released).is_ok());
    assert!(body.get("environment").is_none());
}

#[tokio::test]
async fn test_finalize_deploy_endpoint() {
    let (url, log) = serve(vec![(201, "")]).await;
    let config = UploadConfig {
        finalize: FinalizeEndpoint::Deploy,
        environment: Some("production".to_string()),
        ..config(&url)
    };
    let client = ReleaseClient::new(&config).unwrap();

    let record = client.finalize_release("v1").await.unwrap();
    assert_eq!(record.version, "v1");

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/0/projects/acme/web/releases/v1/deploy/");
    assert_eq!(requests[0].json()["environment"], "production");
}

#[tokio::test]
async fn test_retries_server_errors() {
    let (url, log) = serve(vec![(500, "oops"), (503, "busy"), (201, r#"{"version":"v1"}"#)]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();

    let record = client
        .create_release("v1", &ReleaseMetadata::default())
        .await
        .unwrap();
    assert_eq!(record.version, "v1");
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_gives_up_after_retries() {
    let (url, log) = serve(vec![(502, "bad gateway")]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();

    let err = client
        .create_release("v1", &ReleaseMetadata::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (url, log) = serve(vec![(400, r#"{"detail":"bad version"}"#)]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();

    let err = client
        .create_release("v1", &ReleaseMetadata::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.contains("bad version"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_encoding_error() {
    let (url, log) = serve(vec![(200, "<html>not json</html>")]).await;
    let client = ReleaseClient::new(&config(&url)).unwrap();

    let err = client.finalize_release("v1").await.unwrap_err();
    assert!(matches!(err, ClientError::Encoding { .. }));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let url = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        format!("http://{}/", listener.local_addr().unwrap())
    };
    let config = UploadConfig {
        retries: 1,
        ..config(&url)
    };
    let client = ReleaseClient::new(&config).unwrap();

    let err = client
        .create_release("v1", &ReleaseMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
}

#[tokio::test]
async fn test_full_release_against_server() {
    let (url, log) = serve(vec![(201, "{}")]).await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1);").unwrap();
    std::fs::write(dir.path().join("app.js.map"), r#"{"version":3}"#).unwrap();
    let manifest = BuildManifest::from_json_str(
        r#"{ "outputPath": ".", "chunks": [{ "files": ["app.js", "app.js.map"] }] }"#,
        dir.path(),
    )
    .unwrap();

    let config = UploadConfig {
        default_public_path: Some("/static/".to_string()),
        ..config(&url)
    };
    let orchestrator = UploadOrchestrator::new(ReleaseClient::new(&config).unwrap());
    let outcome = orchestrator.run(&config, &manifest).await;
    assert!(matches!(outcome, BuildOutcome::Success(_)));

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].path, "/api/0/projects/acme/web/releases/");
    assert_eq!(requests[3].method, "PUT");

    let mut names: Vec<String> = requests[1..3]
        .iter()
        .filter_map(|r| r.form_field("name"))
        .collect();
    names.sort();
    assert_eq!(names, vec!["~/static/app.js", "~/static/app.js.map"]);
}
