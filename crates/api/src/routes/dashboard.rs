//! Dashboard Route

use axum::response::Html;

const DASHBOARD: &str = include_str!("../../templates/dashboard.html");

/// Serve the dashboard page
pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD)
}
