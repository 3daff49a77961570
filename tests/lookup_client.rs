use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use copyright_desk::lookup::{AuthScheme, LookupClient, LookupConfig, SearchStrategy};
use copyright_desk::models::{FieldKey, FieldValues, PublicationKind};
use copyright_desk::session::SessionCredentials;
use copyright_desk::store::PublicationTable;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the stub server.
#[derive(Debug, Clone)]
struct Captured {
    target: String,
    headers: HashMap<String, String>,
    body: Value,
}

type Handler = Arc<dyn Fn(&Captured) -> (u16, String) + Send + Sync>;

/// Minimal HTTP/1.1 server: one request per connection, answered by `handler`.
async fn start_stub(handler: Handler) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let captured = Arc::new(Mutex::new(Vec::new()));

    let log = captured.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let handler = handler.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let _ = serve_one(stream, handler, log).await;
            });
        }
    });

    (format!("http://{addr}"), captured)
}

async fn serve_one(
    mut stream: TcpStream,
    handler: Handler,
    log: Arc<Mutex<Vec<Captured>>>,
) -> Option<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let mut lines = head.lines();
    let target = lines.next()?.split_whitespace().nth(1)?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let length: usize = headers
        .get("content-length")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);

    while buffer.len() < head_end + length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body = serde_json::from_slice(&buffer[head_end..]).unwrap_or(Value::Null);

    let request = Captured {
        target,
        headers,
        body,
    };
    let (status, payload) = handler(&request);
    log.lock().expect("log").push(request);

    let response = format!(
        "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(response.as_bytes()).await.ok()?;
    stream.shutdown().await.ok()
}

fn client(base_url: &str, credentials: SessionCredentials) -> LookupClient {
    LookupClient::new(
        &LookupConfig {
            base_url: base_url.to_string(),
            auth_scheme: AuthScheme::ApiKey,
            send_ai_mode: true,
        },
        credentials,
    )
    .expect("client")
}

fn monographs(authors: &[&str]) -> PublicationTable {
    let mut table = PublicationTable::new(PublicationKind::Monograph);
    for author in authors {
        let values: FieldValues = [
            (FieldKey::BookTitle, format!("Book by {author}")),
            (FieldKey::Author, author.to_string()),
            (FieldKey::Publisher, "Press".to_string()),
            (FieldKey::PublishYear, "1950".to_string()),
        ]
        .into_iter()
        .collect();
        table.add_one(&values);
    }
    table
}

/// Answers per-item requests: authors named "fail" get a 500, everyone else
/// an individual who died in 1900.
fn per_item_handler() -> Handler {
    Arc::new(|request: &Captured| {
        let author = request.body["items"][0]["author"].as_str().unwrap_or("");
        if author == "fail" {
            return (500, json!({"detail": "boom"}).to_string());
        }
        let body = json!({
            "successItems": [{
                "authorType": "개인",
                "birthYear": "1850",
                "deathYear": "1900",
                "controlNumber": format!("KAC-{author}"),
                "isAuthorUnknown": false,
                "webSearchUtilized": true,
                "copyrightInfo": {"code": "PD", "has_copyright": false, "reason": "expired"}
            }],
            "failedIndices": []
        });
        (200, body.to_string())
    })
}

#[tokio::test]
async fn per_item_search_merges_results_by_index() {
    let (base_url, captured) = start_stub(per_item_handler()).await;
    let credentials = SessionCredentials::in_memory();
    credentials.set_api_key("test-key");
    let client = client(&base_url, credentials);

    let mut table = monographs(&["A", "fail", "C"]);
    let snapshot = table.search_snapshot();
    let mut progress = Vec::new();
    let report = client
        .search_each(PublicationKind::Monograph, &snapshot.items, |done, total| {
            progress.push((done, total))
        })
        .await
        .expect("search");

    assert_eq!(progress.len(), 3);
    assert_eq!(progress.last(), Some(&(3, 3)));
    assert_eq!(report.failed_indices(), vec![1]);
    assert!(report.failures[0].reason.contains("500"));
    let indices: Vec<usize> = report.successes.iter().map(|(index, _)| *index).collect();
    assert_eq!(indices, vec![0, 2]);

    let summary = table.apply_search(&snapshot, &report, 2024);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);

    let records = table.records();
    assert_eq!(records[0].control_number.as_deref(), Some("KAC-A"));
    assert_eq!(records[0].has_copyright, Some(false));
    assert_eq!(records[0].copyright_reason.as_deref(), Some("expired"));
    assert_eq!(records[1].has_copyright, None);
    assert_eq!(records[1].control_number, None);
    assert_eq!(records[2].control_number.as_deref(), Some("KAC-C"));

    let requests = captured.lock().expect("log").clone();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(
            request.target,
            "/search-copyright/monograph/single?mode=openai"
        );
        assert_eq!(request.headers.get("x-api-key").map(String::as_str), Some("test-key"));
        assert_eq!(request.body["items"].as_array().map(Vec::len), Some(1));
        assert!(request.body["items"][0].get("articleTitle").is_none());
    }
}

#[tokio::test]
async fn batch_search_places_results_by_reported_index() {
    let handler: Handler = Arc::new(|_request: &Captured| {
        let body = json!({
            "successItems": [
                {"index": 1, "authorType": "단체"},
                {"index": 7, "authorType": "개인", "deathYear": "1900"}
            ],
            "failedIndices": [0]
        });
        (200, body.to_string())
    });
    let (base_url, captured) = start_stub(handler).await;
    let credentials = SessionCredentials::in_memory();
    credentials.set_api_key("batch-key");
    let client = client(&base_url, credentials);

    let table = monographs(&["A", "B", "C"]);
    let snapshot = table.search_snapshot();
    let mut calls = 0;
    let report = client
        .search(
            SearchStrategy::Batch,
            PublicationKind::Monograph,
            &snapshot.items,
            |_, _| calls += 1,
        )
        .await
        .expect("search");

    assert_eq!(calls, 1);
    let indices: Vec<usize> = report.successes.iter().map(|(index, _)| *index).collect();
    assert_eq!(indices, vec![1]);
    assert_eq!(report.failed_indices(), vec![0, 2]);

    let requests = captured.lock().expect("log").clone();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].target.starts_with("/search-copyright/monograph?"));
    assert_eq!(requests[0].body["items"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn missing_credentials_send_nothing() {
    let (base_url, captured) = start_stub(per_item_handler()).await;
    let client = client(&base_url, SessionCredentials::in_memory());
    let table = monographs(&["A"]);
    let snapshot = table.search_snapshot();

    let err = client
        .search(
            SearchStrategy::PerItem,
            PublicationKind::Monograph,
            &snapshot.items,
            |_, _| {},
        )
        .await
        .unwrap_err();
    assert!(err.is_credential_missing());

    let err = client
        .search_batch(PublicationKind::Monograph, &snapshot.items)
        .await
        .unwrap_err();
    assert!(err.is_credential_missing());
    assert!(captured.lock().expect("log").is_empty());
}

#[tokio::test]
async fn undecodable_body_is_a_per_item_failure() {
    let handler: Handler = Arc::new(|_request: &Captured| (200, "<html>oops</html>".to_string()));
    let (base_url, _captured) = start_stub(handler).await;
    let credentials = SessionCredentials::in_memory();
    credentials.set_api_key("k");
    let client = client(&base_url, credentials);

    let table = monographs(&["A"]);
    let snapshot = table.search_snapshot();
    let report = client
        .search_each(PublicationKind::Monograph, &snapshot.items, |_, _| {})
        .await
        .expect("search");
    assert!(report.successes.is_empty());
    assert!(report.failures[0].reason.starts_with("unexpected response body"));
}

#[tokio::test]
async fn empty_success_list_counts_as_failure() {
    let handler: Handler = Arc::new(|_request: &Captured| {
        (200, json!({"successItems": [], "failedIndices": [0]}).to_string())
    });
    let (base_url, _captured) = start_stub(handler).await;
    let credentials = SessionCredentials::in_memory();
    credentials.set_api_key("k");
    let client = client(&base_url, credentials);

    let item = monographs(&["A"]).search_snapshot().items.remove(0);
    let err = client
        .search_item(PublicationKind::Monograph, &item, 4)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "search failed for item at index 4");
}
