// Embeddable platform links: recognised without fetching and rendered in an iframe.

use url::Url;

const SHORT_LINK_HOST: &str = "youtu.be";
const CANONICAL_HOST: &str = "youtube.com";
const EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// A video on a known hosting platform, with an optional start offset in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTarget {
    pub video_id: String,
    pub start_seconds: Option<u64>,
}

impl EmbedTarget {
    /// Player URL for the hosting platform's iframe embed.
    pub fn embed_url(&self) -> String {
        match self.start_seconds {
            Some(start) => format!("{}{}?start={}", EMBED_BASE, self.video_id, start),
            None => format!("{}{}", EMBED_BASE, self.video_id),
        }
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Leading digits of a `t=` value: `42`, `42s` and `42.5` all yield 42.
fn parse_start(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn start_offset(url: &Url) -> Option<u64> {
    if let Some((_, t)) = url.query_pairs().find(|(k, _)| k == "t") {
        return parse_start(&t);
    }
    // Fragment form: #t=42
    let fragment = url.fragment()?;
    let pos = fragment.find("t=")?;
    parse_start(&fragment[pos + 2..])
}

/// Recognise a short-link or canonical video-sharing URL.
pub fn parse_embed_target(raw: &str) -> Option<EmbedTarget> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();

    let video_id = if host_matches(&host, SHORT_LINK_HOST) {
        url.path().trim_start_matches('/').split('/').next()?.to_string()
    } else if host_matches(&host, CANONICAL_HOST) {
        match url.query_pairs().find(|(k, _)| k == "v") {
            Some((_, v)) => v.into_owned(),
            None => {
                let mut segments = url.path_segments()?;
                match segments.next()? {
                    "embed" | "shorts" | "live" => segments.next()?.to_string(),
                    _ => return None,
                }
            }
        }
    } else {
        return None;
    };

    if video_id.is_empty() {
        return None;
    }

    Some(EmbedTarget {
        video_id,
        start_seconds: start_offset(&url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link_with_start() {
        let target = parse_embed_target("https://youtu.be/ABC123?t=42").unwrap();
        assert_eq!(target.video_id, "ABC123");
        assert_eq!(target.start_seconds, Some(42));
        assert_eq!(
            target.embed_url(),
            "https://www.youtube.com/embed/ABC123?start=42"
        );
    }

    #[test]
    fn test_canonical_watch_link() {
        let target = parse_embed_target("https://www.youtube.com/watch?v=xyz789").unwrap();
        assert_eq!(target.video_id, "xyz789");
        assert_eq!(target.start_seconds, None);
        assert_eq!(target.embed_url(), "https://www.youtube.com/embed/xyz789");
    }

    #[test]
    fn test_fragment_start_and_suffix() {
        let target = parse_embed_target("https://m.youtube.com/watch?v=q1#t=90s").unwrap();
        assert_eq!(target.start_seconds, Some(90));
        let target = parse_embed_target("https://youtu.be/q2?t=15s").unwrap();
        assert_eq!(target.start_seconds, Some(15));
    }

    #[test]
    fn test_shorts_path() {
        let target = parse_embed_target("https://youtube.com/shorts/s9").unwrap();
        assert_eq!(target.video_id, "s9");
    }

    #[test]
    fn test_not_embeddable() {
        assert_eq!(parse_embed_target("https://example.com/watch?v=abc"), None);
        assert_eq!(parse_embed_target("https://notyoutube.com/watch?v=abc"), None);
        assert_eq!(parse_embed_target("https://www.youtube.com/feed"), None);
        assert_eq!(parse_embed_target("https://youtu.be/"), None);
        assert_eq!(parse_embed_target("not a url"), None);
    }
}
