//! `sitemap.xml` and `robots.txt`.
//!
//! Both are generated from the canonical origin so they never advertise the
//! legacy host. Without a configured canonical URL the production URL is used.
//! The sitemap only lists pages a crawler can fetch without a session.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{NaiveDate, Utc};
use subit_core::gate::{Admission, AdmissionGate, PRODUCTION_SITE_URL};

use crate::state::AppState;

/// Static marketing pages considered for the sitemap.
const SITEMAP_PAGES: &[&str] = &[
    "",
    "/features",
    "/pricing",
    "/faq",
    "/about",
    "/careers",
    "/privacy",
    "/terms",
    "/cookies",
];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

fn base_url(state: &AppState) -> &str {
    state
        .gate
        .canonical()
        .map_or(PRODUCTION_SITE_URL, |c| c.origin())
}

/// Sitemap pages the gate lets through without a session.
fn crawlable_pages(gate: &AdmissionGate) -> Vec<&'static str> {
    SITEMAP_PAGES
        .iter()
        .copied()
        .filter(|page: &&str| {
            let path = if page.is_empty() { "/" } else { *page };
            gate.admit(None, path) == Admission::Allow
        })
        .collect()
}

/// `GET /sitemap.xml`
async fn sitemap(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pages = crawlable_pages(&state.gate);
    let body = render_sitemap(base_url(&state), &pages, Utc::now().date_naive());
    ([(header::CONTENT_TYPE, "application/xml")], body)
}

/// `GET /robots.txt`
async fn robots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = render_robots(base_url(&state));
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

fn page_priority(page: &str) -> &'static str {
    match page {
        "" => "1.0",
        "/pricing" | "/features" => "0.9",
        _ => "0.7",
    }
}

fn render_sitemap(base: &str, pages: &[&str], last_modified: NaiveDate) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for page in pages {
        let changefreq = if page.is_empty() { "daily" } else { "weekly" };
        xml.push_str(&format!(
            "  <url>\n    <loc>{base}{page}</loc>\n    <lastmod>{last_modified}</lastmod>\n    <changefreq>{changefreq}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            page_priority(page)
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

fn render_robots(base: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /dashboard\nDisallow: /api/\n\nSitemap: {base}/sitemap.xml\n"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use subit_core::routes::RouteTable;

    use super::*;

    fn gate(extra: &[&str], enforce: bool) -> AdmissionGate {
        AdmissionGate::new(
            "subit-ai.vercel.app",
            None,
            RouteTable::with_defaults(extra).unwrap(),
            enforce,
        )
    }

    #[test]
    fn sitemap_lists_every_page_on_base() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let xml = render_sitemap("https://www.subitai.com", SITEMAP_PAGES, date);
        assert_eq!(xml.matches("<url>").count(), SITEMAP_PAGES.len());
        assert!(xml.contains("<loc>https://www.subitai.com</loc>"));
        assert!(xml.contains("<loc>https://www.subitai.com/pricing</loc>"));
        assert!(xml.contains("<lastmod>2026-10-19</lastmod>"));
    }

    #[test]
    fn priorities_favour_home_then_pricing() {
        assert_eq!(page_priority(""), "1.0");
        assert_eq!(page_priority("/features"), "0.9");
        assert_eq!(page_priority("/terms"), "0.7");
    }

    #[test]
    fn robots_points_at_sitemap_and_hides_dashboard() {
        let txt = render_robots("https://www.subitai.com");
        assert!(txt.contains("Disallow: /dashboard"));
        assert!(txt.ends_with("Sitemap: https://www.subitai.com/sitemap.xml\n"));
    }

    #[test]
    fn protected_pages_are_left_out_when_sessions_are_enforced() {
        let pages = crawlable_pages(&gate(&[], true));
        assert!(pages.contains(&""));
        assert!(pages.contains(&"/pricing"));
        assert!(!pages.contains(&"/faq"));
        assert!(!pages.contains(&"/careers"));
    }

    #[test]
    fn pages_made_public_by_config_are_listed() {
        let pages = crawlable_pages(&gate(&["/faq", "/careers"], true));
        assert_eq!(pages, SITEMAP_PAGES);
    }

    #[test]
    fn every_page_is_listed_without_enforcement() {
        assert_eq!(crawlable_pages(&gate(&[], false)), SITEMAP_PAGES);
    }
}
