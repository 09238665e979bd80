//! HTML for the playlist page, the player fragment and the not-found page.

use std::fmt::Write;

use domain::VideoRecord;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, PercentEncode, utf8_percent_encode};
use playback::{Effect, PlaybackSelector, PlayerConfig};

pub const PAGE_TITLE: &str = "My Youtube Collection";
pub const PAGE_DESCRIPTION: &str = "A YouTube playlist with video player";
pub const EMBED_BASE: &str = "https://www.youtube.com/embed";

/// Everything but RFC 3986 unreserved characters, safe for a query value or a path segment
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; background: #fff; color: #1a202c; }
main { max-width: 72rem; margin: 0 auto; padding: 2rem 1rem 4rem; }
h1 { text-align: center; font-size: 2.5rem; margin: 2rem 0 1rem; }
.player { max-width: 56rem; margin: 0 auto 2rem; aspect-ratio: 16 / 9; scroll-margin-top: 70px; }
.player iframe { width: 100%; height: 100%; border: 0; border-radius: 0.75rem; }
.grid { display: grid; grid-template-columns: 1fr; column-gap: 40px; row-gap: 56px; }
@media (min-width: 30em) { .grid { grid-template-columns: repeat(2, 1fr); } }
@media (min-width: 48em) { .grid { grid-template-columns: repeat(3, 1fr); } }
.card { display: flex; flex-direction: column; border-radius: 0.75rem; background: #faf9f9; overflow: hidden; }
.card img { width: 100%; aspect-ratio: 16 / 9; object-fit: cover; }
.card .body { padding: 1rem 1rem 0; }
.card h5 { font-size: 1rem; margin: 0 0 0.5rem; }
.card .footer { display: flex; justify-content: flex-end; padding: 1rem; margin-top: auto; }
.play { border: 1px solid #319795; color: #319795; border-radius: 0.75rem; padding: 0.5rem 1rem; text-decoration: none; }
@media (prefers-color-scheme: dark) {
  body { background: #1a202c; color: #fff; }
  .card { background: #242A2B; color: white; }
}
"#;

/// Loads the player once the document is live in the browser
const HYDRATE_SCRIPT: &str = r#"document.addEventListener('DOMContentLoaded', function () {
  var mount = document.getElementById('player');
  if (!mount || !mount.dataset.src) return;
  fetch(mount.dataset.src)
    .then(function (r) { return r.ok ? r.text() : Promise.reject(r.status); })
    .then(function (html) { mount.outerHTML = html; });
});"#;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn url_component(raw: &str) -> PercentEncode<'_> {
    utf8_percent_encode(raw, URL_COMPONENT)
}

/// Link a card click follows
pub fn select_href(record: &VideoRecord) -> String {
    format!("/?item={}", url_component(&record.id))
}

/// Where the client pass fetches the player for the current selection
pub fn player_src(selector: &PlaybackSelector) -> String {
    let mut src = format!("/player?item={}", url_component(&selector.current().id));
    if selector.auto_play() {
        src.push_str("&autoplay=true");
    }
    src
}

/// Embedded player fragment
pub fn player(config: &PlayerConfig) -> String {
    format!(
        r#"<div id="player" class="player" data-video-id="{id}"><iframe src="{base}/{segment}?autoplay={autoplay}" title="YouTube video player" allow="autoplay; encrypted-media; picture-in-picture" allowfullscreen></iframe></div>"#,
        id = escape_html(&config.video_id),
        segment = url_component(&config.video_id),
        base = EMBED_BASE,
        autoplay = u8::from(config.autoplay),
    )
}

/// Full page for the selector's current state
///
/// Before readiness the player is replaced by a mount point the client pass
/// fills in. Queued selection effects are drained and emitted as script.
pub fn page(selector: &mut PlaybackSelector) -> String {
    let effects = selector.take_effects();
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(PAGE_TITLE));
    let _ = writeln!(
        html,
        "<meta name=\"description\" content=\"{}\">",
        escape_html(PAGE_DESCRIPTION)
    );
    let _ = writeln!(html, "<style>{STYLE}</style>");
    html.push_str("</head>\n<body>\n<main>\n");
    let _ = writeln!(html, "<h1>{}</h1>", escape_html(PAGE_TITLE));

    match selector.player() {
        Some(config) => html.push_str(&player(&config)),
        None => {
            let _ = write!(
                html,
                r#"<div id="player" class="player" data-src="{}"></div>"#,
                escape_html(&player_src(selector))
            );
        }
    }
    html.push('\n');

    html.push_str("<div class=\"grid\">\n");
    for record in selector.snapshot().records() {
        html.push_str(&card(record));
    }
    html.push_str("</div>\n</main>\n");

    let _ = writeln!(html, "<script>{HYDRATE_SCRIPT}</script>");
    for effect in effects {
        match effect {
            Effect::ScrollToTop { top, smooth } => {
                let behavior = if smooth { "smooth" } else { "auto" };
                let _ = writeln!(
                    html,
                    "<script>window.scrollTo({{ top: {top}, behavior: '{behavior}' }});</script>"
                );
            }
        }
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn card(record: &VideoRecord) -> String {
    let title = escape_html(&record.title);
    format!(
        concat!(
            r#"<article class="card" data-item-id="{item_id}" data-video-id="{video_id}" title="{tooltip}">"#,
            r#"<img src="{thumbnail}" alt="{title} thumbnail">"#,
            r#"<div class="body"><h5>{title}</h5><p>{channel}</p></div>"#,
            r#"<div class="footer"><a class="play" href="{href}" aria-label="Play {title}">&#9654;</a></div>"#,
            "</article>\n"
        ),
        item_id = escape_html(&record.id),
        video_id = escape_html(record.video_id()),
        href = escape_html(&select_href(record)),
        tooltip = escape_html(&record.description),
        thumbnail = escape_html(record.thumbnail_or_placeholder()),
        title = title,
        channel = escape_html(&record.channel_title),
    )
}

pub fn not_found() -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>404: This page could not be found</title>\n</head>\n<body>\n");
    html.push_str("<h1>404</h1>\n<h2>This page could not be found.</h2>\n</body>\n</html>\n");
    html
}
