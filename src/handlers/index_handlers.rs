//! Index page naming the showcase object and its download URL.

use crate::handlers::AppState;
use axum::{extract::State, response::Html};

/// `GET /`
///
/// Renders a small page pointing at the demo object so the conditional
/// round trip can be watched from a browser's network panel.
pub async fn show_index_page(State(state): State<AppState>) -> Html<String> {
    let download_url = format!("/download/{}", state.showcase_object);
    Html(format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html><head><title>Conditional GET streaming demo</title></head>\n",
            "<body>\n",
            "<h1>Conditional GET streaming demo</h1>\n",
            "<p>Container <code>{container}</code> holds one object:</p>\n",
            "<ul><li><a href=\"{url}\">{name}</a></li></ul>\n",
            "<p>Request it twice: the second response should be a\n",
            "<code>304 Not Modified</code> thanks to the\n",
            "<code>If-Modified-Since</code> header your browser sends back.</p>\n",
            "</body></html>\n"
        ),
        container = state.container,
        url = download_url,
        name = state.showcase_object,
    ))
}
