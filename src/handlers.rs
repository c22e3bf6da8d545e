//! HTTP route handlers for the liora dashboard.
//!
//! The dashboard is read-only: every handler reads the files under the data
//! directory on request, so it reflects the latest cycle without any shared
//! in-memory state. Missing files read as empty.

use axum::{
    extract::{Query, State},
    response::{Html, Json},
    routing::get,
    Router,
};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::{
    read_engagement, read_posted_replies, read_reply_urls, DataFiles, PendingStatus, PendingStore,
};

const MAX_PER_PAGE: usize = 100;

/// `?page=&per_page=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Pagination metadata returned next to every list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Slices `items` into one page. `page` below 1 means 1; `per_page` is clamped to `1..=100`.
///
/// # Parameters
///
/// - `items`: The full, already ordered list
/// - `params`: Requested page and page size
/// - `default_per_page`: Page size used when none is requested
///
/// # Returns
///
/// The items on the requested page (empty past the end) and the pagination metadata.
pub fn paginate<T>(items: Vec<T>, params: &PageParams, default_per_page: usize) -> (Vec<T>, Pagination) {
    let page = params.page.unwrap_or(1).max(1) as usize;
    let per_page = params
        .per_page
        .map(|p| p.clamp(1, MAX_PER_PAGE as i64) as usize)
        .unwrap_or(default_per_page);

    let total = items.len();
    let start = (page - 1).saturating_mul(per_page);
    let end = start.saturating_add(per_page).min(total);
    let page_items: Vec<T> = if start < total {
        items.into_iter().skip(start).take(end - start).collect()
    } else {
        Vec::new()
    };

    let pagination = Pagination {
        page,
        per_page,
        total,
        pages: total.div_ceil(per_page),
        has_next: end < total,
        has_prev: page > 1,
    };
    (page_items, pagination)
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "liora"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "liora"}))
}

/// Handles GET requests to `/api/replies`: posted replies, newest first.
pub async fn handle_replies(
    State(files): State<DataFiles>,
    Query(params): Query<PageParams>,
) -> Json<Value> {
    let mut replies = read_posted_replies(&files.posted_replies());
    replies.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let rows: Vec<Value> = replies
        .into_iter()
        .map(|r| {
            json!({
                "timestamp": r.timestamp.to_rfc3339(),
                "original_tweet_id": r.original_item_id,
                "original_tweet_text": r.original_text,
                "reply_text": r.reply_text,
                "reply_url": r.result_url,
                "reply_tweet_id": r.result_id,
            })
        })
        .collect();

    let (page, pagination) = paginate(rows, &params, 10);
    Json(json!({"replies": page, "pagination": pagination}))
}

/// Handles GET requests to `/api/urls`: reply URLs in file order.
pub async fn handle_urls(
    State(files): State<DataFiles>,
    Query(params): Query<PageParams>,
) -> Json<Value> {
    let urls = read_reply_urls(&files.reply_urls());
    let (page, pagination) = paginate(urls, &params, 20);
    Json(json!({"urls": page, "pagination": pagination}))
}

/// Handles GET requests to `/api/engagement`: metric snapshots, newest first.
pub async fn handle_engagement(
    State(files): State<DataFiles>,
    Query(params): Query<PageParams>,
) -> Json<Value> {
    let mut records = read_engagement(&files.engagement());
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let (page, pagination) = paginate(records, &params, 15);
    Json(json!({"engagement": page, "pagination": pagination}))
}

/// Handles GET requests to `/api/stats`.
///
/// # Example Response
///
/// ```json
/// {
///   "total_replies": 12,
///   "total_urls": 12,
///   "total_engagement_records": 40,
///   "total_pending": 3,
///   "last_updated": "2024-05-01T10:00:00+00:00"
/// }
/// ```
pub async fn handle_stats(State(files): State<DataFiles>) -> Json<Value> {
    let replies = read_posted_replies(&files.posted_replies());
    let urls = read_reply_urls(&files.reply_urls());
    let engagement = read_engagement(&files.engagement());
    let pending = PendingStore::load(files.pending())
        .map(|store| store.with_status(PendingStatus::Pending).len())
        .unwrap_or(0);
    let last_updated = replies.iter().map(|r| r.timestamp).max();

    Json(json!({
        "total_replies": replies.len(),
        "total_urls": urls.len(),
        "total_engagement_records": engagement.len(),
        "total_pending": pending,
        "last_updated": last_updated.map(|t| t.to_rfc3339()),
    }))
}

/// Handles GET requests to the root `/` endpoint.
///
/// Renders the 25 most recent replies as an HTML table.
pub async fn handle_root(State(files): State<DataFiles>) -> Html<String> {
    info!("Rendering dashboard");
    let mut replies = read_posted_replies(&files.posted_replies());
    replies.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut html = String::from(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Liora - Recent Replies</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            margin: 0;
            padding: 20px;
            background-color: #f5f5f5;
        }
        .container {
            max-width: 1200px;
            margin: 0 auto;
            background-color: white;
            padding: 30px;
            border-radius: 8px;
        }
        table {
            width: 100%;
            border-collapse: collapse;
        }
        th, td {
            padding: 12px;
            text-align: left;
            border-bottom: 1px solid #ddd;
            vertical-align: top;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Recent Replies</h1>
        <table>
            <thead>
                <tr>
                    <th>time</th>
                    <th>post</th>
                    <th>reply</th>
                </tr>
            </thead>
            <tbody>
"#,
    );

    for r in replies.iter().take(25) {
        html.push_str(&format!(
            "                <tr>\n                    <td>{}</td>\n                    <td>{}</td>\n                    <td><a href=\"{}\">{}</a></td>\n                </tr>\n",
            r.timestamp.format("%Y-%m-%d %H:%M"),
            html_escape(&r.original_text),
            html_escape(&r.result_url),
            html_escape(&r.reply_text)
        ));
    }

    html.push_str(
        r#"            </tbody>
        </table>
    </div>
</body>
</html>"#,
    );

    Html(html)
}

/// Builds the dashboard router over the files in `files`.
pub fn build_router(files: DataFiles) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/replies", get(handle_replies))
        .route("/api/urls", get(handle_urls))
        .route("/api/engagement", get(handle_engagement))
        .route("/api/stats", get(handle_stats))
        .with_state(files)
}

/// Escapes HTML special characters to prevent XSS attacks.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
