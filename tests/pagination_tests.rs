use futures::TryStreamExt;
use helix_client::models::Game;
use helix_client::paginate::{self, Paginated};
use helix_client::{json, Config, HelixError, HttpClient, Method, Result};
use serde_json::Value;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(Config::new("test-client").with_base_urls(server.uri(), server.uri()))
}

fn games(ids: &[&str]) -> Value {
    Value::Array(ids.iter().map(|id| json!({"id": id, "name": format!("game {}", id)})).collect())
}

/// Mount three pages of games: 1..=2, 3..=4 and 5, chained by cursors
async fn mount_three_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/games/top"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": games(&["1", "2"]),
            "pagination": {"cursor": "c1"}
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/games/top"))
        .and(query_param("after", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": games(&["3", "4"]),
            "pagination": {"cursor": "c2"}
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/games/top"))
        .and(query_param("after", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": games(&["5"]),
            "pagination": {}
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn collect<T>(mut stream: Paginated<T>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    while let Some(item) = stream.next().await? {
        out.push(item);
    }
    Ok(out)
}

#[tokio::test]
async fn test_walks_every_page_in_order() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let http = client(&server);
    let stream = http.get_top_games(2, None, None);
    let ids: Vec<String> = collect(stream).await.unwrap().into_iter().map(|g| g.id).collect();

    assert_eq!(ids, ["1", "2", "3", "4", "5"]);
    // MockServer verifies each page was requested exactly once on drop
}

#[tokio::test]
async fn test_stops_after_last_page() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let http = client(&server);
    let mut stream = http.get_top_games(2, None, None);
    while stream.next().await.unwrap().is_some() {}

    assert!(stream.is_exhausted());
    // asking again must not hit the server
    assert!(stream.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_budget_stops_mid_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/games/top"))
        .and(query_param("first", "3"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": games(&["1", "2"]),
            "pagination": {"cursor": "c1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/games/top"))
        .and(query_param("after", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": games(&["3", "4", "5"]),
            "pagination": {"cursor": "c2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = client(&server);
    let stream = http.get_top_games(100, None, Some(3));
    assert_eq!(stream.page_size(), 3);

    let ids: Vec<String> = collect(stream).await.unwrap().into_iter().map(|g| g.id).collect();
    assert_eq!(ids, ["1", "2", "3"]);
}

#[tokio::test]
async fn test_missing_data_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/games/top"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pagination": {}})))
        .mount(&server)
        .await;

    let http = client(&server);
    let mut stream = http.get_top_games(20, None, None);
    let err = stream.next().await.unwrap_err();
    assert!(matches!(err, HelixError::MalformedResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_error_status_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/games/top"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let http = client(&server);
    let mut stream = http.get_top_games(20, None, None);
    let err = stream.next().await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_flatten_fetches_one_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/games/top"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": games(&["1", "2"]),
            "pagination": {"cursor": "c1"}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let http = client(&server);
    let items = http.get_top_games(2, None, None).flatten().await.unwrap();
    assert_eq!(items.len(), 2);

    // awaiting the stream directly does the same
    let items: Vec<Game> = http.get_top_games(2, None, None).await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_into_stream() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let http = client(&server);
    let games: Vec<Game> = http.get_top_games(2, None, None).into_stream().try_collect().await.unwrap();
    assert_eq!(games.len(), 5);
    assert_eq!(games[4].name, "game 5");
}

#[tokio::test]
async fn test_converter_sees_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat/emotes/user"))
        .and(query_param("user_id", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "e1",
                "name": "Kappa",
                "emote_type": "globals",
                "emote_set_id": "0",
                "owner_id": "0",
                "format": ["static"],
                "scale": ["1.0"],
                "theme_mode": ["light", "dark"]
            }],
            "template": "https://cdn/{{id}}/{{format}}/{{theme_mode}}/{{scale}}",
            "pagination": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = client(&server);
    let emotes = collect(http.get_user_emotes("9", "9", None, None)).await.unwrap();
    assert_eq!(emotes.len(), 1);
    assert_eq!(emotes[0].template, "https://cdn/{{id}}/{{format}}/{{theme_mode}}/{{scale}}");
}

#[tokio::test]
async fn test_custom_converter_error_stops_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/games/top"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "1"}],
            "pagination": {}
        })))
        .mount(&server)
        .await;

    let http = client(&server);
    let route = http.route(Method::GET, "games/top");
    // `name` is missing so the typed converter fails
    let mut stream: Paginated<Game> = http.request_paginated(route, None, paginate::deserialize);
    assert!(matches!(stream.next().await, Err(HelixError::Json(_))));
}
