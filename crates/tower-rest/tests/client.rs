use serde::Deserialize;
use std::time::Duration;
use tower_rest::{
    Client, Error, Form, LoggingLayer, MemorySink, Request, RetryLayer, StreamConfig,
    TransportConfig,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
    name: String,
}

fn client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn get_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/7"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 7,
            "name": "sprocket"
        })))
        .mount(&server)
        .await;

    let mut resp = client()
        .get(
            &format!("{}/items/7", server.uri()),
            [("Accept", "application/json")],
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let item: Item = resp.json().await.unwrap();
    assert_eq!(
        item,
        Item {
            id: 7,
            name: "sprocket".into()
        }
    );
    assert!(matches!(resp.bytes().await, Err(Error::BodyConsumed)));
}

#[tokio::test]
async fn query_parameters_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "tower"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .expect(1)
        .mount(&server)
        .await;

    let mut resp = client()
        .send(
            Request::get(format!("{}/search?q=tower", server.uri())).query("page", "2"),
        )
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "found");
}

#[tokio::test]
async fn streamed_response_arrives_in_chunks() {
    let server = MockServer::start().await;
    let payload = "x".repeat(10_000);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload.clone()))
        .mount(&server)
        .await;

    let mut resp = client()
        .send_stream(Request::get(server.uri()))
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut largest = 0;
    resp.stream_chunks_with(StreamConfig::new(1024), |chunk| {
        largest = largest.max(chunk.len());
        received.extend_from_slice(chunk);
    })
    .await
    .unwrap();

    assert_eq!(received, payload.as_bytes());
    assert!(largest <= 1024);
    resp.close();
    resp.close();
    assert!(resp.is_closed());
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .middleware(RetryLayer::new(3, Duration::from_millis(10)))
        .build()
        .unwrap();

    let mut resp = client.send(Request::get(server.uri())).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "recovered");
}

#[tokio::test]
async fn persistent_failure_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = Client::builder()
        .middleware(RetryLayer::new(2, Duration::from_millis(5)))
        .build()
        .unwrap();

    let err = client.send(Request::get(server.uri())).await.unwrap_err();
    match err {
        Error::StatusRetriesExhausted { attempts, status } => {
            assert_eq!(attempts, 2);
            assert_eq!(status, 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn logging_dumps_the_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let client = Client::builder()
        .middleware(LoggingLayer::new(sink.clone()))
        .build()
        .unwrap();

    let mut resp = client
        .post(
            &format!("{}/notes", server.uri()),
            "remember the milk",
            [("content-type", "text/plain")],
        )
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "created");

    let log = sink.contents();
    assert!(log.starts_with("=== Request ===\nPOST /notes HTTP/1.1\r\n"));
    assert!(log.contains("Content-Type: text/plain\r\n"));
    assert!(log.contains("\r\n\r\nremember the milk\n"));
    assert!(log.contains("=== Response ===\nHTTP/1.1 201 Created\r\n"));
    assert!(log.ends_with("\r\n\r\ncreated\n"));
}

#[tokio::test]
async fn multipart_form_is_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("name=\"title\"\r\n\r\nquarterly\r\n"))
        .and(body_string_contains("filename=\"q3.csv\""))
        .and(body_string_contains("a,b\n1,2\n"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let form = Form::new()
        .text("title", "quarterly")
        .file("report", "q3.csv", "a,b\n1,2\n");
    let resp = client()
        .send(Request::post(format!("{}/upload", server.uri())).multipart(form))
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn group_results_keep_request_order() {
    let server = MockServer::start().await;
    for (name, delay) in [("slow", 300), ("fast", 0), ("medium", 100)] {
        Mock::given(method("GET"))
            .and(path(format!("/{name}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(name)
                    .set_delay(Duration::from_millis(delay)),
            )
            .mount(&server)
            .await;
    }

    let client = client();
    let requests = ["slow", "fast", "medium"]
        .map(|name| Request::get(format!("{}/{name}", server.uri())));
    let results = client.send_group_async(requests).await;

    let mut bodies = Vec::new();
    for result in results {
        bodies.push(result.unwrap().text().await.unwrap());
    }
    assert_eq!(bodies, ["slow", "fast", "medium"]);
}

#[tokio::test]
async fn async_calls_and_join() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = client();
    let get = client.get_async(&server.uri(), [("x-call", "1")]);
    let post = client.post_async(&server.uri(), "body", [("x-call", "2")]);
    let broken = client.send_async(Request::get(""));

    let results = client.join([get, post, broken]).await;
    assert_eq!(results[0].as_ref().unwrap().status(), 200);
    assert_eq!(results[1].as_ref().unwrap().status(), 202);
    assert!(matches!(results[2], Err(Error::EmptyUrl)));
}

#[tokio::test]
async fn timeout_bounds_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let client = Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = client
        .send_stream_async(Request::get(server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn custom_transport_config_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "inventory-sync/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .transport_config(TransportConfig::new().user_agent("inventory-sync/1.0"))
        .build()
        .unwrap();
    let resp = client.send(Request::get(server.uri())).await.unwrap();
    assert_eq!(resp.status(), 200);
}
