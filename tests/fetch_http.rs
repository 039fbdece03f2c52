// tests/fetch_http.rs
//! HTTP-level adapter tests against a local mock server: feed fetching,
//! the three JSON API shapes, and the crypto-term gate.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crypto_news_aggregator::article::NewsQuery;
use crypto_news_aggregator::catalog::{RequestMethod, SourceDescriptor, SourceKind};
use crypto_news_aggregator::fetch::{ApiFetcher, FeedFetcher};

fn descriptor(name: &str, url: String, kind: SourceKind, method: RequestMethod) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url,
        category: "general".to_string(),
        priority: 1,
        enabled: true,
        kind,
        credential_env: None,
        method,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn feed_fetcher_parses_a_served_feed() {
    let server = MockServer::start().await;
    let body = r#"<rss><channel>
        <item>
            <title>Bitcoin steadies after volatile week</title>
            <link>https://example.test/steady</link>
            <pubDate>Mon, 15 Jan 2024 10:30:00 GMT</pubDate>
        </item>
    </channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let fetcher = FeedFetcher::with_client(client());
    let desc = descriptor(
        "MockWire",
        format!("{}/feed", server.uri()),
        SourceKind::Feed,
        RequestMethod::Get,
    );
    let articles = fetcher.fetch(&desc).await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].source, "MockWire");
}

#[tokio::test]
async fn feed_fetcher_surfaces_non_success_status_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = FeedFetcher::with_client(client());
    let desc = descriptor(
        "Flaky",
        format!("{}/feed", server.uri()),
        SourceKind::Feed,
        RequestMethod::Get,
    );
    assert!(fetcher.fetch(&desc).await.is_err());
}

#[tokio::test]
async fn cryptopanic_results_are_unnested_and_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "title": "Whale moves 10k BTC",
                    "url": "https://example.test/whale",
                    "description": "On-chain watchers spot a large transfer.",
                    "published_at": "2024-01-15T10:30:00Z",
                    "votes": { "liked": 42, "saved": 7, "comments": 3 }
                },
                { "description": "no title or url, dropped" }
            ]
        })))
        .mount(&server)
        .await;

    let fetcher = ApiFetcher::with_client(client());
    let desc = descriptor(
        "cryptopanic",
        format!("{}/posts", server.uri()),
        SourceKind::Api,
        RequestMethod::Post,
    );
    let articles = fetcher.fetch(&desc, &NewsQuery::default()).await.unwrap();

    assert_eq!(articles.len(), 1);
    let post = &articles[0];
    assert_eq!(post.title, "Whale moves 10k BTC");
    assert_eq!(post.engagement.likes, 42);
    assert_eq!(post.engagement.comments, 3);
    // Same URL + source must always hash to the same id.
    let again = fetcher.fetch(&desc, &NewsQuery::default()).await.unwrap();
    assert_eq!(post.id, again[0].id);
}

#[tokio::test]
async fn newsdata_non_ok_status_means_zero_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "articles": [{ "title": "ignored", "link": "https://example.test/x" }]
        })))
        .mount(&server)
        .await;

    let fetcher = ApiFetcher::with_client(client());
    let desc = descriptor(
        "newsdata",
        format!("{}/news", server.uri()),
        SourceKind::Api,
        RequestMethod::Get,
    );
    let articles = fetcher.fetch(&desc, &NewsQuery::default()).await.unwrap();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn newsdata_gate_drops_off_topic_articles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": [
                {
                    "title": "Bitcoin adoption grows in new markets",
                    "link": "https://example.test/adoption",
                    "description": "Payment processors report rising volume."
                },
                {
                    "title": "Celebrity gossip roundup",
                    "link": "https://example.test/gossip",
                    "description": "None of this involves digital assets."
                }
            ]
        })))
        .mount(&server)
        .await;

    let fetcher = ApiFetcher::with_client(client());
    let desc = descriptor(
        "newsdata",
        format!("{}/news", server.uri()),
        SourceKind::Api,
        RequestMethod::Get,
    );
    let articles = fetcher.fetch(&desc, &NewsQuery::default()).await.unwrap();

    assert_eq!(articles.len(), 1);
    assert!(articles[0].title.contains("Bitcoin"));
}

#[tokio::test]
async fn newsdata_page_size_is_clamped() {
    let server = MockServer::start().await;
    // limit=3 clamps up to the API floor of 10.
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(query_param("pageSize", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ApiFetcher::with_client(client());
    let desc = descriptor(
        "newsdata",
        format!("{}/news", server.uri()),
        SourceKind::Api,
        RequestMethod::Get,
    );
    let query = NewsQuery {
        limit: 3,
        ..NewsQuery::default()
    };
    fetcher.fetch(&desc, &query).await.unwrap();
}

#[tokio::test]
async fn blockbeat_accepts_both_array_and_single_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/array"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "title": "Token listing announced", "url": "https://example.test/1" },
            { "title": "Bridge audit published", "url": "https://example.test/2" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/object"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            { "title": "Single-story payload", "url": "https://example.test/solo" }
        )))
        .mount(&server)
        .await;

    let fetcher = ApiFetcher::with_client(client());

    let desc = descriptor(
        "blockbeat",
        format!("{}/array", server.uri()),
        SourceKind::Api,
        RequestMethod::Get,
    );
    let from_array = fetcher.fetch(&desc, &NewsQuery::default()).await.unwrap();
    assert_eq!(from_array.len(), 2);

    let desc = descriptor(
        "blockbeat",
        format!("{}/object", server.uri()),
        SourceKind::Api,
        RequestMethod::Get,
    );
    let from_object = fetcher.fetch(&desc, &NewsQuery::default()).await.unwrap();
    assert_eq!(from_object.len(), 1);
    assert_eq!(from_object[0].title, "Single-story payload");
}

#[tokio::test]
async fn unknown_api_source_is_an_error_outcome() {
    let fetcher = ApiFetcher::with_client(client());
    let desc = descriptor(
        "mystery",
        "https://example.test/api".to_string(),
        SourceKind::Api,
        RequestMethod::Get,
    );
    assert!(fetcher.fetch(&desc, &NewsQuery::default()).await.is_err());
}
