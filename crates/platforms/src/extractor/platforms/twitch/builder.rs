use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::models::{GqlResponse, GqlStream};
use crate::extractor::error::FetchError;
use crate::extractor::status_fetcher::StatusFetcher;
use crate::extractor::utils::{capture_group_1, normalize_timestamp};
use crate::http::{HttpFetcher, HttpRequest};
use crate::media::{LiveDetails, LiveStatus, Platform};

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.|m\.)?twitch\.tv/([^/?#]*)").unwrap()
});

pub const BASE_URL: &str = "https://www.twitch.tv";
pub const GQL_API_URL: &str = "https://gql.twitch.tv/gql";
/// Client id of the public web player.
pub const CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";

const LIVE_STATUS_QUERY: &str = "query ($login: String!) { user(login: $login) { stream { type title viewersCount createdAt game { name } } } }";

/// Reduce a channel URL or bare name to a login.
///
/// Channel URLs yield their first path segment; anything else is taken to
/// already be a login.
pub fn normalize_login(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if URL_REGEX.is_match(trimmed) {
        return capture_group_1(&URL_REGEX, trimmed)
            .filter(|login| !login.is_empty())
            .map(ToOwned::to_owned);
    }

    Some(trimmed.to_string())
}

/// Twitch status fetcher backed by a single GQL query.
pub struct Twitch {
    http: Arc<dyn HttpFetcher>,
    user_agent: String,
}

impl Twitch {
    pub fn new(http: Arc<dyn HttpFetcher>, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            user_agent: user_agent.into(),
        }
    }

    fn build_query(login: &str) -> String {
        serde_json::json!({
            "query": LIVE_STATUS_QUERY,
            "variables": { "login": login },
        })
        .to_string()
    }

    fn build_request(&self, login: &str) -> HttpRequest {
        HttpRequest::post(GQL_API_URL)
            .header("Client-ID", CLIENT_ID)
            .header("Content-Type", "text/plain;charset=UTF-8")
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .body(Self::build_query(login))
    }

    fn status_from_response(login: &str, response: GqlResponse) -> LiveStatus {
        let stream = response
            .data
            .and_then(|data| data.user)
            .and_then(|user| user.stream);

        match stream {
            Some(stream) if Self::is_live_stream(&stream) => LiveStatus::Live(LiveDetails {
                title: stream.title,
                category: stream.game.and_then(|game| game.name),
                viewer_count: stream.viewers_count.and_then(|n| u64::try_from(n).ok()),
                started_at: stream.created_at.as_deref().and_then(normalize_timestamp),
                stream_url: Some(format!("{BASE_URL}/{login}")),
            }),
            Some(stream) => {
                debug!(login, stream_type = ?stream.stream_type, "Stream present but not live");
                LiveStatus::Offline
            }
            None => LiveStatus::Offline,
        }
    }

    /// Reruns and premieres carry a stream object with a different type.
    fn is_live_stream(stream: &GqlStream) -> bool {
        match stream.stream_type.as_deref() {
            None | Some("") => true,
            Some(kind) => kind.eq_ignore_ascii_case("live"),
        }
    }
}

#[async_trait]
impl StatusFetcher for Twitch {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn fetch_status(&self, channel: &str) -> Result<LiveStatus, FetchError> {
        let login = normalize_login(channel)
            .ok_or_else(|| FetchError::InvalidIdentifier(channel.to_string()))?;

        let response = self.http.fetch(self.build_request(&login)).await?;
        if !response.is_ok() {
            debug!(login = %login, status = response.status, "Twitch GQL returned non-200");
            return Err(FetchError::UnexpectedStatus {
                url: GQL_API_URL.to_string(),
                status: response.status,
            });
        }

        let payload: GqlResponse = serde_json::from_str(&response.body)?;
        if let Some(errors) = payload.errors.as_ref().filter(|errors| !errors.is_empty()) {
            let message = errors
                .iter()
                .map(|e| e.message.as_deref().unwrap_or("unknown error"))
                .collect::<Vec<_>>()
                .join("; ");
            debug!(login = %login, errors = %message, "Twitch GQL returned errors");
            return Err(FetchError::Api(message));
        }

        let status = Self::status_from_response(&login, payload);
        debug!(login = %login, is_live = status.is_live(), "Fetched Twitch live status");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::platforms::test::MockHttp;
    use crate::media::format_timestamp;

    fn fetcher(http: Arc<MockHttp>) -> Twitch {
        Twitch::new(http, "test-agent")
    }

    #[test]
    fn test_normalize_login() {
        assert_eq!(normalize_login("alice").as_deref(), Some("alice"));
        assert_eq!(normalize_login("  alice  ").as_deref(), Some("alice"));
        assert_eq!(
            normalize_login("https://www.twitch.tv/alice").as_deref(),
            Some("alice")
        );
        assert_eq!(
            normalize_login("HTTPS://Twitch.tv/Alice/videos?filter=all").as_deref(),
            Some("Alice")
        );
        assert_eq!(normalize_login("https://twitch.tv/"), None);
        assert_eq!(normalize_login(""), None);
        assert_eq!(normalize_login("   "), None);
    }

    #[tokio::test]
    async fn test_live_stream() {
        let body = r#"{"data":{"user":{"stream":{"type":"live","title":"Ranked Grind","viewersCount":1500,"createdAt":"2024-01-01T00:00:00Z","game":{"name":"Valorant"}}}}}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));

        let status = fetcher(http.clone()).fetch_status("alice").await.unwrap();

        let details = status.details().expect("live");
        assert_eq!(details.title.as_deref(), Some("Ranked Grind"));
        assert_eq!(details.category.as_deref(), Some("Valorant"));
        assert_eq!(details.viewer_count, Some(1500));
        assert_eq!(
            details.started_at.map(|dt| format_timestamp(&dt)).as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
        assert_eq!(details.stream_url.as_deref(), Some("https://www.twitch.tv/alice"));

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.header_value("client-id"), Some(CLIENT_ID));
        assert_eq!(request.header_value("user-agent"), Some("test-agent"));
        let sent: serde_json::Value =
            serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["variables"]["login"], "alice");
    }

    #[tokio::test]
    async fn test_stream_without_type_is_live() {
        let body = r#"{"data":{"user":{"stream":{"title":"Ranked Grind","viewersCount":1500,"createdAt":"2024-01-01T00:00:00Z"}}}}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));

        let status = fetcher(http).fetch_status("alice").await.unwrap();
        assert!(status.is_live());
        assert_eq!(status.viewer_count(), Some(1500));
    }

    #[tokio::test]
    async fn test_offline_when_stream_missing() {
        let body = r#"{"data":{"user":{"stream":null}}}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));

        let status = fetcher(http).fetch_status("alice").await.unwrap();
        assert_eq!(status, LiveStatus::Offline);
    }

    #[tokio::test]
    async fn test_offline_when_user_missing() {
        let body = r#"{"data":{"user":null}}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));

        let status = fetcher(http).fetch_status("nobody").await.unwrap();
        assert_eq!(status, LiveStatus::Offline);
    }

    #[tokio::test]
    async fn test_rerun_is_offline() {
        let body = r#"{"data":{"user":{"stream":{"type":"rerun","title":"Old","viewersCount":3,"createdAt":null}}}}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));

        let status = fetcher(http).fetch_status("alice").await.unwrap();
        assert_eq!(status, LiveStatus::Offline);
    }

    #[tokio::test]
    async fn test_url_identifier_uses_login() {
        let body = r#"{"data":{"user":{"stream":{"type":"live","title":null,"viewersCount":null,"createdAt":"garbage"}}}}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));

        let status = fetcher(http)
            .fetch_status("https://www.twitch.tv/bob/about")
            .await
            .unwrap();
        assert_eq!(status.stream_url(), Some("https://www.twitch.tv/bob"));
        assert_eq!(status.started_at(), None);
        assert_eq!(status.title(), None);
    }

    #[tokio::test]
    async fn test_non_200_is_unavailable() {
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 500, "oops"));

        let result = fetcher(http).fetch_status("alice").await;
        assert!(matches!(
            result,
            Err(FetchError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_graphql_errors_are_unavailable() {
        let body = r#"{"errors":[{"message":"service timeout"}],"data":null}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));

        let result = fetcher(http).fetch_status("alice").await;
        match result {
            Err(FetchError::Api(message)) => assert!(message.contains("service timeout")),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_is_unavailable() {
        let http = Arc::new(MockHttp::new().with_error(GQL_API_URL, "connection reset"));

        let result = fetcher(http).fetch_status("alice").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_malformed_json_is_unavailable() {
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, "<html>"));

        let result = fetcher(http).fetch_status("alice").await;
        assert!(matches!(result, Err(FetchError::Json(_))));
    }

    #[tokio::test]
    async fn test_empty_identifier_skips_network() {
        let http = Arc::new(MockHttp::new());

        let result = fetcher(http.clone()).fetch_status("  ").await;
        assert!(matches!(result, Err(FetchError::InvalidIdentifier(_))));
        assert_eq!(http.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_fetch_is_identical() {
        let body = r#"{"data":{"user":{"stream":{"type":"live","title":"Ranked Grind","viewersCount":1500,"createdAt":"2024-01-01T00:00:00Z"}}}}"#;
        let http = Arc::new(MockHttp::new().with_page(GQL_API_URL, 200, body));
        let twitch = fetcher(http);

        let first = twitch.fetch_status("alice").await.unwrap();
        let second = twitch.fetch_status("alice").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
