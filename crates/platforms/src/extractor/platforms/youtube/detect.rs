//! Live detection over a fetched YouTube page.
//!
//! YouTube has no public live-status endpoint, so a page is run through an
//! ordered list of heuristics and the first positive one wins:
//!
//! 1. the embedded `ytInitialPlayerResponse` JSON,
//! 2. a thumbnail carrying the `LIVE` overlay,
//! 3. generic document signals (meta flags, live badge, inline `isLive` JSON).
//!
//! Each heuristic is a pure function over a parsed [`PageDocument`] so it can
//! be tested against a fixture on its own.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::trace;
use url::Url;

use super::builder::{BASE_URL, watch_url};
use crate::extractor::utils::{extract_text, normalize_timestamp, parse_viewer_count};
use crate::media::LiveDetails;

/// Shortest string accepted as a video id.
const MIN_VIDEO_ID_LEN: usize = 11;

static PLAYER_RESPONSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ytInitialPlayerResponse\s*=\s*\{").unwrap());
static LIVE_JSON_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""isLive(?:Content|Now)?":\s*true"#).unwrap());
static LIVE_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/live/([0-9A-Za-z_-]{11})").unwrap());

static LIVE_OVERLAY: LazyLock<Selector> =
    LazyLock::new(|| selector("ytd-thumbnail-overlay-time-status-renderer[overlay-style='LIVE']"));
static WATCH_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href^='/watch?v=']"));
static VIDEO_RENDERER: LazyLock<Selector> = LazyLock::new(|| {
    selector("ytd-grid-video-renderer, ytd-video-renderer, ytd-rich-item-renderer, ytd-rich-grid-media")
});
static VIDEO_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("#video-title"));
static DATA_VIDEO_ID: LazyLock<Selector> = LazyLock::new(|| selector("[data-video-id]"));
static LIVE_BADGE: LazyLock<Selector> = LazyLock::new(|| {
    selector("ytd-badge-supported-renderer, .badge-style-type-live-now, .ytp-live-badge")
});

/// Elements whose attribute may hold a watch URL, in priority order.
static VIDEO_URL_SOURCES: LazyLock<Vec<(Selector, &'static str)>> = LazyLock::new(|| {
    vec![
        (selector("link[rel='canonical']"), "href"),
        (selector("meta[property='og:video:url']"), "content"),
        (selector("meta[property='og:url']"), "content"),
        (selector("meta[itemprop='url']"), "content"),
        (selector("a[href^='/watch?v=']"), "href"),
    ]
});
static LIVE_META: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    vec![
        selector("meta[itemprop='isLiveBroadcast']"),
        selector("meta[property='og:video:live_broadcast']"),
        selector("meta[name='is_live']"),
    ]
});
static TITLE_META: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    vec![
        selector("meta[property='og:title']"),
        selector("meta[name='title']"),
        selector("meta[name='twitter:title']"),
        selector("meta[itemprop='name']"),
    ]
});
static TITLE_TEXT: LazyLock<Vec<Selector>> =
    LazyLock::new(|| vec![selector("#video-title"), selector("title")]);
static START_META: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    vec![
        selector("meta[itemprop='startDate']"),
        selector("meta[property='video:release_date']"),
        selector("meta[property='l:original_publish_date']"),
    ]
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// A heuristic that reports live details when it finds a live signal.
pub type Detector = fn(&PageDocument<'_>) -> Option<LiveDetails>;

/// Heuristics in the order they are tried.
pub const DETECTORS: [(&str, Detector); 3] = [
    ("player_response", detect_from_player_response),
    ("live_overlay", detect_from_overlay),
    ("document", detect_from_document),
];

/// A fetched page, parsed once and shared by all detectors.
pub struct PageDocument<'a> {
    raw: &'a str,
    source_url: &'a str,
    html: Html,
}

impl<'a> PageDocument<'a> {
    pub fn parse(raw: &'a str, source_url: &'a str) -> Self {
        Self {
            raw,
            source_url,
            html: Html::parse_document(raw),
        }
    }

    fn first_attr(&self, selector: &Selector, attr: &str) -> Option<&str> {
        self.html
            .select(selector)
            .next()
            .and_then(|element| element.value().attr(attr))
    }

    fn first_text(&self, selector: &Selector) -> Option<String> {
        self.html.select(selector).next().map(element_text)
    }

    fn video_id(&self) -> Option<String> {
        let from_links = VIDEO_URL_SOURCES
            .iter()
            .find_map(|(selector, attr)| self.first_attr(selector, attr).and_then(video_id_from_href));
        if from_links.is_some() {
            return from_links;
        }

        self.first_attr(&DATA_VIDEO_ID, "data-video-id")
            .filter(|id| id.len() >= MIN_VIDEO_ID_LEN)
            .map(ToOwned::to_owned)
    }

    fn title(&self) -> Option<String> {
        let from_meta = TITLE_META
            .iter()
            .find_map(|selector| self.first_attr(selector, "content").and_then(non_empty));
        from_meta.or_else(|| {
            TITLE_TEXT
                .iter()
                .find_map(|selector| self.first_text(selector).as_deref().and_then(non_empty))
        })
    }

    fn start_timestamp(&self) -> Option<&str> {
        START_META
            .iter()
            .filter_map(|selector| self.first_attr(selector, "content"))
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    fn has_live_signal(&self) -> bool {
        let meta_flag = LIVE_META
            .iter()
            .filter_map(|selector| self.first_attr(selector, "content"))
            .any(is_truthy);
        if meta_flag {
            return true;
        }

        let badge = self
            .html
            .select(&LIVE_BADGE)
            .any(|element| element_text(element).to_uppercase() == "LIVE");
        if badge {
            return true;
        }

        LIVE_JSON_REGEX.is_match(self.raw)
    }
}

/// Run every detector over `raw` in order. `None` means no live signal.
pub fn detect_live(raw: &str, source_url: &str) -> Option<LiveDetails> {
    let page = PageDocument::parse(raw, source_url);
    DETECTORS.iter().find_map(|(name, detector)| {
        let details = detector(&page)?;
        trace!(source_url, detector = *name, "Live signal found");
        Some(details)
    })
}

/// Layer 1: the player configuration literal embedded in the page.
pub fn detect_from_player_response(page: &PageDocument<'_>) -> Option<LiveDetails> {
    let player = extract_player_response(page.raw)?;

    let live_details = player.pointer("/microformat/playerMicroformatRenderer/liveBroadcastDetails");
    let renderer =
        player.pointer("/playabilityStatus/liveStreamability/liveStreamabilityRenderer");
    let video_details = player.get("videoDetails");

    let is_live = is_flag_set(live_details, "isLiveNow")
        || is_flag_set(live_details, "isLive")
        || is_flag_set(video_details, "isLiveContent")
        || is_flag_set(renderer, "isLive");
    if !is_live {
        return None;
    }

    let video_id = video_id_of(video_details)
        .or_else(|| video_id_of(renderer))
        .or_else(|| page.video_id());

    let title = video_details
        .and_then(|v| v.get("title"))
        .and_then(extract_text)
        .or_else(|| live_details.and_then(|v| v.get("title")).and_then(extract_text))
        .or_else(|| page.title());

    let started_at = [live_details, renderer]
        .into_iter()
        .flatten()
        .filter_map(|v| v.get("startTimestamp").and_then(Value::as_str))
        .chain(page.start_timestamp())
        .find_map(normalize_timestamp);

    let viewer_count = [
        video_details.and_then(|v| v.get("viewCount")),
        renderer.and_then(|v| v.get("viewerCount")),
        renderer.and_then(|v| v.pointer("/liveStream/viewerCount")),
        renderer.and_then(|v| v.pointer("/liveStream/activeViewers")),
    ]
    .into_iter()
    .flatten()
    .find(|v| !v.is_null())
    .and_then(parse_viewer_count);

    let stream_url = video_id
        .map(|id| watch_url(&id))
        .unwrap_or_else(|| page.source_url.to_string());

    Some(LiveDetails {
        title,
        category: None,
        viewer_count,
        started_at,
        stream_url: Some(stream_url),
    })
}

/// Layer 2: a thumbnail marked with the `LIVE` time-status overlay.
pub fn detect_from_overlay(page: &PageDocument<'_>) -> Option<LiveDetails> {
    page.html.select(&LIVE_OVERLAY).find_map(|overlay| {
        let anchor = find_watch_link(overlay);
        let video_id = anchor
            .and_then(|a| a.value().attr("href"))
            .and_then(video_id_from_href)?;

        let title = anchor
            .and_then(|a| overlay_title(a, overlay))
            .or_else(|| page.title());

        Some(LiveDetails {
            title,
            category: None,
            viewer_count: None,
            started_at: page.start_timestamp().and_then(normalize_timestamp),
            stream_url: Some(watch_url(&video_id)),
        })
    })
}

/// Layer 3: a video id on the page plus any independent live signal.
pub fn detect_from_document(page: &PageDocument<'_>) -> Option<LiveDetails> {
    let video_id = page.video_id()?;
    if !page.has_live_signal() {
        return None;
    }

    Some(LiveDetails {
        title: page.title(),
        category: None,
        viewer_count: None,
        started_at: page.start_timestamp().and_then(normalize_timestamp),
        stream_url: Some(watch_url(&video_id)),
    })
}

/// Parse the JSON object assigned to `ytInitialPlayerResponse`, reading
/// exactly one value so trailing script text is ignored.
fn extract_player_response(raw: &str) -> Option<Value> {
    let found = PLAYER_RESPONSE_REGEX.find(raw)?;
    let json_start = found.end() - 1;
    serde_json::Deserializer::from_str(&raw[json_start..])
        .into_iter::<Value>()
        .next()
        .and_then(Result::ok)
        .filter(Value::is_object)
}

/// Nearest watch link for an overlay: enclosing link, sibling, descendant,
/// then anywhere inside the enclosing video renderer.
fn find_watch_link(overlay: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let ancestors = || overlay.ancestors().filter_map(ElementRef::wrap);

    ancestors()
        .find(|element| WATCH_LINK.matches(element))
        .or_else(|| {
            overlay
                .parent()
                .into_iter()
                .flat_map(|parent| parent.children())
                .filter(|node| *node != *overlay)
                .filter_map(ElementRef::wrap)
                .find(|element| WATCH_LINK.matches(element))
        })
        .or_else(|| overlay.select(&WATCH_LINK).next())
        .or_else(|| {
            ancestors()
                .find(|element| VIDEO_RENDERER.matches(element))
                .and_then(|renderer| renderer.select(&WATCH_LINK).next())
        })
}

fn overlay_title(anchor: ElementRef<'_>, overlay: ElementRef<'_>) -> Option<String> {
    let attribute = ["title", "aria-label"]
        .into_iter()
        .find_map(|name| anchor.value().attr(name).and_then(non_empty));
    if attribute.is_some() {
        return attribute;
    }

    anchor
        .select(&VIDEO_TITLE)
        .next()
        .or_else(|| {
            overlay
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|element| VIDEO_RENDERER.matches(element))
                .and_then(|renderer| renderer.select(&VIDEO_TITLE).next())
        })
        .map(element_text)
        .as_deref()
        .and_then(non_empty)
}

/// Video id from a watch link (`?v=`) or a `/live/<id>` path, relative or
/// absolute.
pub fn video_id_from_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let url = if href.starts_with("http") {
        Url::parse(href).ok()?
    } else {
        Url::parse(BASE_URL).ok()?.join(href).ok()?
    };

    let from_query = url
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| id.len() >= MIN_VIDEO_ID_LEN);
    if from_query.is_some() {
        return from_query;
    }

    LIVE_PATH_REGEX
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn video_id_of(source: Option<&Value>) -> Option<String> {
    source
        .and_then(|v| v.get("videoId"))
        .and_then(Value::as_str)
        .filter(|id| id.len() >= MIN_VIDEO_ID_LEN)
        .map(ToOwned::to_owned)
}

fn is_flag_set(source: Option<&Value>, key: &str) -> bool {
    match source.and_then(|v| v.get(key)) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => is_truthy(s),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::format_timestamp;

    const SOURCE: &str = "https://www.youtube.com/@someone/live";

    const PLAYER_PAGE: &str = r#"<!DOCTYPE html><html><head><title>fallback - YouTube</title></head><body>
<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"videoDetails":{"videoId":"abc12345678","title":"Morning Stream","viewCount":"1234","isLiveContent":true},"microformat":{"playerMicroformatRenderer":{"liveBroadcastDetails":{"isLiveNow":true,"startTimestamp":"2024-05-01T10:00:00+00:00"}}}};var meta = {"x":1};</script>
</body></html>"#;

    fn started(details: &LiveDetails) -> Option<String> {
        details.started_at.as_ref().map(format_timestamp)
    }

    #[test]
    fn test_player_response_live() {
        let details = detect_live(PLAYER_PAGE, SOURCE).expect("live");
        assert_eq!(
            details.stream_url.as_deref(),
            Some("https://www.youtube.com/watch?v=abc12345678")
        );
        assert_eq!(details.title.as_deref(), Some("Morning Stream"));
        assert_eq!(details.viewer_count, Some(1234));
        assert_eq!(started(&details).as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(details.category, None);
    }

    #[test]
    fn test_player_response_shapes() {
        let page = r#"<html><script>ytInitialPlayerResponse = {"videoDetails":{"title":{"runs":[{"text":"Part "},{"text":"Two"}]}},"playabilityStatus":{"liveStreamability":{"liveStreamabilityRenderer":{"isLive":true,"videoId":"xyz98765432","liveStream":{"activeViewers":{"simpleText":"2,048 watching"}}}}}};</script></html>"#;
        let doc = PageDocument::parse(page, SOURCE);
        let details = detect_from_player_response(&doc).expect("live");
        assert_eq!(details.title.as_deref(), Some("Part Two"));
        assert_eq!(details.viewer_count, Some(2048));
        assert_eq!(
            details.stream_url.as_deref(),
            Some("https://www.youtube.com/watch?v=xyz98765432")
        );
    }

    #[test]
    fn test_player_response_without_video_id_uses_source() {
        let page = r#"<script>var ytInitialPlayerResponse = {"microformat":{"playerMicroformatRenderer":{"liveBroadcastDetails":{"isLive":true}}},"videoDetails":{"videoId":"short"}};</script>"#;
        let doc = PageDocument::parse(page, SOURCE);
        let details = detect_from_player_response(&doc).expect("live");
        assert_eq!(details.stream_url.as_deref(), Some(SOURCE));
    }

    #[test]
    fn test_player_response_not_live() {
        let page = r#"<script>var ytInitialPlayerResponse = {"videoDetails":{"videoId":"abc12345678","isLiveContent":false}};</script>"#;
        let doc = PageDocument::parse(page, SOURCE);
        assert!(detect_from_player_response(&doc).is_none());
    }

    #[test]
    fn test_malformed_player_response_falls_through() {
        let page = r#"<script>var ytInitialPlayerResponse = {"videoDetails": broken</script>"#;
        let doc = PageDocument::parse(page, SOURCE);
        assert!(detect_from_player_response(&doc).is_none());
        assert!(detect_live(page, SOURCE).is_none());
    }

    #[test]
    fn test_overlay_inside_link() {
        let page = r#"<html><head><meta property="og:title" content="Channel"></head><body>
<ytd-grid-video-renderer>
  <a id="thumbnail" href="/watch?v=live1234567&amp;t=1" title="Late Night Live">
    <ytd-thumbnail-overlay-time-status-renderer overlay-style="LIVE">LIVE</ytd-thumbnail-overlay-time-status-renderer>
  </a>
</ytd-grid-video-renderer>
</body></html>"#;
        let doc = PageDocument::parse(page, SOURCE);
        let details = detect_from_overlay(&doc).expect("live");
        assert_eq!(
            details.stream_url.as_deref(),
            Some("https://www.youtube.com/watch?v=live1234567")
        );
        assert_eq!(details.title.as_deref(), Some("Late Night Live"));
    }

    #[test]
    fn test_overlay_title_from_renderer() {
        let page = r#"<html><body>
<ytd-rich-grid-media>
  <div id="overlays"><ytd-thumbnail-overlay-time-status-renderer overlay-style="LIVE"></ytd-thumbnail-overlay-time-status-renderer></div>
  <div id="details"><a href="/watch?v=grid1234567"></a><span id="video-title"> Speedrun Sunday </span></div>
</ytd-rich-grid-media>
</body></html>"#;
        let doc = PageDocument::parse(page, SOURCE);
        let details = detect_from_overlay(&doc).expect("live");
        assert_eq!(
            details.stream_url.as_deref(),
            Some("https://www.youtube.com/watch?v=grid1234567")
        );
        assert_eq!(details.title.as_deref(), Some("Speedrun Sunday"));
    }

    #[test]
    fn test_overlay_without_live_style_is_ignored() {
        let page = r#"<a href="/watch?v=vod12345678"><ytd-thumbnail-overlay-time-status-renderer overlay-style="DEFAULT">12:34</ytd-thumbnail-overlay-time-status-renderer></a>"#;
        let doc = PageDocument::parse(page, SOURCE);
        assert!(detect_from_overlay(&doc).is_none());
    }

    #[test]
    fn test_document_meta_flag() {
        let page = r#"<html><head>
<link rel="canonical" href="https://www.youtube.com/watch?v=doc12345678">
<meta property="og:title" content="Q&amp;A Stream">
</head><body>
<meta itemprop="isLiveBroadcast" content="True">
<meta itemprop="startDate" content="2024-03-10T18:30:00+01:00">
</body></html>"#;
        let details = detect_live(page, SOURCE).expect("live");
        assert_eq!(
            details.stream_url.as_deref(),
            Some("https://www.youtube.com/watch?v=doc12345678")
        );
        assert_eq!(details.title.as_deref(), Some("Q&A Stream"));
        assert_eq!(started(&details).as_deref(), Some("2024-03-10T17:30:00.000Z"));
        assert_eq!(details.viewer_count, None);
    }

    #[test]
    fn test_document_badge_must_equal_live() {
        let live = r#"<a href="/watch?v=bdg12345678">x</a><div class="badge-style-type-live-now"> live </div>"#;
        let doc = PageDocument::parse(live, SOURCE);
        assert!(detect_from_document(&doc).is_some());

        let upcoming = r#"<a href="/watch?v=bdg12345678">x</a><div class="badge-style-type-live-now">LIVE SOON</div>"#;
        let doc = PageDocument::parse(upcoming, SOURCE);
        assert!(detect_from_document(&doc).is_none());
    }

    #[test]
    fn test_document_inline_json_signal() {
        let page = r#"<html><head><link rel="canonical" href="https://www.youtube.com/live/abcdefghijk"></head><body><script>var d = {"isLiveNow": true};</script></body></html>"#;
        let details = detect_live(page, SOURCE).expect("live");
        assert_eq!(
            details.stream_url.as_deref(),
            Some("https://www.youtube.com/watch?v=abcdefghijk")
        );
    }

    #[test]
    fn test_document_needs_video_id_and_signal() {
        let no_signal = r#"<link rel="canonical" href="https://www.youtube.com/watch?v=doc12345678">"#;
        assert!(detect_live(no_signal, SOURCE).is_none());

        let no_video = r#"<link rel="canonical" href="https://www.youtube.com/@someone"><script>{"isLive":true}</script>"#;
        assert!(detect_live(no_video, SOURCE).is_none());
    }

    #[test]
    fn test_data_video_id_fallback() {
        let page = r#"<div data-video-id="dat12345678"></div><meta name="is_live" content="yes">"#;
        let doc = PageDocument::parse(page, SOURCE);
        assert_eq!(doc.video_id().as_deref(), Some("dat12345678"));
        assert!(doc.has_live_signal());
    }

    #[test]
    fn test_video_id_from_href() {
        assert_eq!(
            video_id_from_href("/watch?v=abc12345678&list=x").as_deref(),
            Some("abc12345678")
        );
        assert_eq!(
            video_id_from_href("https://youtube.com/live/abc12345678?si=1").as_deref(),
            Some("abc12345678")
        );
        assert_eq!(video_id_from_href("/watch?v=short"), None);
        assert_eq!(video_id_from_href("https://www.youtube.com/@someone"), None);
        assert_eq!(video_id_from_href(""), None);
    }

    #[test]
    fn test_detectors_are_ordered() {
        let names: Vec<&str> = DETECTORS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["player_response", "live_overlay", "document"]);
    }
}
