//! Page routes behind the route guard.
//!
//! The storefront UI itself is served elsewhere; these handlers return a
//! bare shell so guarded paths have something to resolve to.

use axum::{Router, response::Html, routing::get};

/// Paths served by the page router.
pub const PAGE_PATHS: &[&str] = &["/", "/login", "/register", "/dashboard", "/dashboard/{*rest}"];

const PAGE_SHELL: &str = "<!doctype html><html><head><title>StarStudy</title></head>\
                          <body><div id=\"root\"></div></body></html>";

pub fn router() -> Router {
    PAGE_PATHS
        .iter()
        .fold(Router::new(), |router, path| router.route(path, get(page_shell)))
}

async fn page_shell() -> Html<&'static str> {
    Html(PAGE_SHELL)
}
