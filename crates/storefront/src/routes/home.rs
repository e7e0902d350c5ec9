//! Shell document route handler.
//!
//! The shell is cached at install and served to every later navigation, so
//! it carries the catalog and the active section but never the cart. The
//! page script fills the cart in.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use crate::navigation::{Navigation, Section};
use crate::state::AppState;
use crate::views::{NavLinkView, ProductCardView};

/// Query string of the shell document.
#[derive(Debug, Default, Deserialize)]
pub struct ShellQuery {
    pub section: Option<String>,
}

impl ShellQuery {
    /// Requested section; missing or unknown values show the products.
    fn section(&self) -> Section {
        self.section
            .as_deref()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// Shell document template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub nav_links: Vec<NavLinkView>,
    pub products: Vec<ProductCardView>,
    pub products_active: bool,
    pub cart_active: bool,
}

/// Display the shell document.
#[instrument(skip(state))]
pub async fn shell(State(state): State<AppState>, Query(query): Query<ShellQuery>) -> IndexTemplate {
    let nav = Navigation::new(query.section());

    IndexTemplate {
        nav_links: NavLinkView::all(&nav),
        products: state
            .catalog()
            .products()
            .iter()
            .map(ProductCardView::from)
            .collect(),
        products_active: nav.is_active(Section::Products),
        cart_active: nav.is_active(Section::Cart),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::cart::MemoryCartStorage;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn test_shell_lists_every_product() {
        let response = app().await.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert_eq!(html.matches("class=\"product-card\"").count(), 6);
        assert!(html.contains("Wireless Headphones"));
        assert!(html.contains("$79.99"));
        assert!(html.contains("High-quality, durable, and stylish."));
        assert!(html.contains(r#"<section id="products" class="section active">"#));
        assert!(html.contains(r#"<div id="cart-body">"#));
    }

    #[tokio::test]
    async fn test_section_query_selects_cart() {
        let response = app()
            .await
            .oneshot(get("/index.html?section=cart"))
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains(r#"<section id="cart" class="section active">"#));
        assert!(html.contains(r#"<section id="products" class="section">"#));
    }

    #[tokio::test]
    async fn test_unknown_section_falls_back_to_products() {
        let response = app().await.oneshot(get("/?section=checkout")).await.unwrap();
        let html = body_string(response).await;
        assert!(html.contains(r#"<section id="products" class="section active">"#));
    }

    #[tokio::test]
    async fn test_shell_does_not_depend_on_cart() {
        let app = app().await;
        let before = body_string(app.clone().oneshot(get("/")).await.unwrap()).await;

        app.clone()
            .oneshot(post_form("/cart/add", "product_id=2", true))
            .await
            .unwrap();
        let after = body_string(app.clone().oneshot(get("/")).await.unwrap()).await;
        assert_eq!(before, after);

        let storage = MemoryCartStorage::with_raw(
            r#"[{"id":2,"name":"Smartwatch Pro","price":{"amount":"199.99","currency_code":"USD"},"image":"https://placehold.co/300x200?text=Smartwatch","quantity":2}]"#,
        );
        let restored = body_string(app_with(storage).await.oneshot(get("/")).await.unwrap()).await;
        assert_eq!(before, restored);
        assert!(!restored.contains("$199.99 x 2"));
    }
}
