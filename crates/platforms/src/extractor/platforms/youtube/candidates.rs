use url::Url;

use super::builder::BASE_URL;
use crate::extractor::utils::trim_trailing_slashes;

/// Ordered, de-duplicated list of pages that may reveal a live broadcast.
///
/// Pages derived from what the user typed come first, then handle and legacy
/// `/c/` `/user/` forms, then the canonical channel pages and the embed
/// player.
pub fn build_live_page_candidates(channel_id: &str, input: &str) -> Vec<String> {
    let input = input.trim();
    let mut urls = Vec::new();
    let mut handles = Vec::new();

    if input.starts_with("http://") || input.starts_with("https://") {
        if let Ok(url) = Url::parse(input) {
            let path = trim_trailing_slashes(url.path());
            if !path.is_empty() {
                push_unique(&mut urls, format!("{BASE_URL}{path}"));
                push_unique(&mut urls, format!("{BASE_URL}{path}/live"));

                if let Some(handle) = path.split('/').find(|s| s.starts_with('@')) {
                    push_unique(&mut handles, handle.to_string());
                }
            }
        }
    } else {
        let bare = input.strip_prefix('@').unwrap_or(input);
        if !bare.is_empty() {
            push_unique(&mut handles, format!("@{bare}"));
            push_unique(&mut handles, bare.to_string());
        }
    }

    for handle in &handles {
        let cleaned = trim_trailing_slashes(handle);
        let bare = cleaned.strip_prefix('@').unwrap_or(cleaned);
        push_unique(&mut urls, format!("{BASE_URL}/{cleaned}"));
        push_unique(&mut urls, format!("{BASE_URL}/{cleaned}/live"));
        push_unique(&mut urls, format!("{BASE_URL}/c/{bare}"));
        push_unique(&mut urls, format!("{BASE_URL}/c/{bare}/live"));
        push_unique(&mut urls, format!("{BASE_URL}/user/{bare}"));
        push_unique(&mut urls, format!("{BASE_URL}/user/{bare}/live"));
    }

    push_unique(&mut urls, format!("{BASE_URL}/channel/{channel_id}/live"));
    push_unique(&mut urls, format!("{BASE_URL}/channel/{channel_id}"));
    push_unique(
        &mut urls,
        format!("{BASE_URL}/embed/live_stream?channel={channel_id}"),
    );

    urls
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
