//! Cart route handlers.
//!
//! Every cart route is a `POST`, so no cart state ever lands in the offline
//! cache. Cart actions are plain form posts carrying `product_id`. The
//! enhanced page script sends them with `x-requested-with: fetch` and swaps
//! in the returned fragment (cart body, count, toast); without the header
//! the browser is redirected back to the shell.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use eshop_core::{Cart, CartChange, ProductId};
use serde::Deserialize;
use tracing::instrument;

use crate::cart::{CartBackend, CartStore};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::navigation::Section;
use crate::notifications::Toast;
use crate::routes::wants_fragment;
use crate::state::AppState;
use crate::views::CartView;

/// Cart action form data.
#[derive(Debug, Deserialize)]
pub struct CartForm {
    pub product_id: String,
}

impl CartForm {
    fn product_id(&self) -> Result<ProductId> {
        self.product_id
            .trim()
            .parse::<i32>()
            .map(ProductId::new)
            .map_err(|_| AppError::BadRequest(format!("invalid product id: {}", self.product_id)))
    }
}

/// Cart body plus count and an optional toast.
#[derive(Template)]
#[template(path = "partials/cart_update.html")]
pub struct CartUpdateTemplate {
    pub cart: CartView,
    pub toast: Option<Toast>,
}

impl CartUpdateTemplate {
    fn into_html(self) -> Result<Response> {
        Ok(Html(self.render()?).into_response())
    }
}

#[derive(Debug, Clone, Copy)]
enum CartAction {
    Add,
    Increase,
    Decrease,
    RemoveAll,
}

impl CartAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::RemoveAll => "remove",
        }
    }

    /// Section shown after a plain form post.
    const fn section(self) -> Section {
        match self {
            Self::Add => Section::Products,
            Self::Increase | Self::Decrease | Self::RemoveAll => Section::Cart,
        }
    }

    async fn apply(self, store: &mut CartStore<CartBackend>, id: ProductId) -> Option<CartChange> {
        match self {
            Self::Add | Self::Increase => store.add(id).await,
            Self::Decrease => store.remove(id, false).await,
            Self::RemoveAll => store.remove(id, true).await,
        }
    }
}

async fn mutate(
    state: &AppState,
    headers: &HeaderMap,
    form: &CartForm,
    action: CartAction,
) -> Result<Response> {
    let id = form.product_id()?;
    let product_id = id.as_i32().to_string();
    add_breadcrumb(
        "cart",
        action.as_str(),
        Some(&[("product_id", product_id.as_str())]),
    );

    let (cart, change): (Cart, _) = {
        let mut store = state.cart().await;
        let change = action.apply(&mut store, id).await;
        (store.cart().clone(), change)
    };

    if let Some(change) = &change {
        tracing::info!(
            product_id = change.product_id().as_i32(),
            count = cart.count(),
            action = action.as_str(),
            "Cart updated"
        );
    }

    if !wants_fragment(headers) {
        return Ok(Redirect::to(&format!("/?section={}", action.section().id())).into_response());
    }

    CartUpdateTemplate {
        cart: CartView::from(&cart),
        toast: change.as_ref().map(Toast::for_change),
    }
    .into_html()
}

/// Current cart body and count, read from the store's latest snapshot.
#[instrument(skip(state))]
pub async fn current(State(state): State<AppState>) -> Result<Response> {
    CartUpdateTemplate {
        cart: CartView::from(&state.cart_snapshot()),
        toast: None,
    }
    .into_html()
}

/// Add one unit of a catalog product.
#[instrument(skip(state, headers))]
pub async fn add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CartForm>,
) -> Result<Response> {
    mutate(&state, &headers, &form, CartAction::Add).await
}

/// Add one unit of a product already in the cart.
#[instrument(skip(state, headers))]
pub async fn increase(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CartForm>,
) -> Result<Response> {
    mutate(&state, &headers, &form, CartAction::Increase).await
}

/// Remove one unit; the line goes away when it reaches zero.
#[instrument(skip(state, headers))]
pub async fn decrease(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CartForm>,
) -> Result<Response> {
    mutate(&state, &headers, &form, CartAction::Decrease).await
}

/// Remove the whole line.
#[instrument(skip(state, headers))]
pub async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CartForm>,
) -> Result<Response> {
    mutate(&state, &headers, &form, CartAction::RemoveAll).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{StatusCode, header};
    use tower::ServiceExt;

    use crate::cart::MemoryCartStorage;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn test_add_returns_fragment_with_toast() {
        let app = app().await;
        let response = app
            .oneshot(post_form("/cart/add", "product_id=1", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("$79.99 x 1"));
        assert!(html.contains(r#"<span id="cart-count-update" hidden>1</span>"#));
        assert!(html.contains(r#"data-color="hsl(120, 60%, 40%)""#));
        assert!(html.contains(r#"data-duration-ms="3000""#));
        assert!(html.contains("Added Wireless Headphones to cart!"));
    }

    #[tokio::test]
    async fn test_plain_post_redirects_to_section() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(post_form("/cart/add", "product_id=2", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/?section=products"
        );

        let response = app
            .oneshot(post_form("/cart/decrease", "product_id=2", false))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/?section=cart"
        );
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let storage = MemoryCartStorage::new();
        let app = app_with(storage.clone()).await;

        for _ in 0..2 {
            app.clone()
                .oneshot(post_form("/cart/add", "product_id=3", true))
                .await
                .unwrap();
        }
        app.clone()
            .oneshot(post_form("/cart/increase", "product_id=5", true))
            .await
            .unwrap();

        let snapshot: serde_json::Value =
            serde_json::from_str(&storage.raw().unwrap()).unwrap();
        let lines = snapshot.as_array().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 3);
        assert_eq!(lines[0]["quantity"], 2);

        let response = app
            .oneshot(post_form("/cart/state", "", true))
            .await
            .unwrap();
        assert!(
            body_string(response)
                .await
                .contains(r#"<span id="cart-count-update" hidden>3</span>"#)
        );
    }

    #[tokio::test]
    async fn test_decrease_and_remove_toasts() {
        let app = app().await;
        for _ in 0..3 {
            app.clone()
                .oneshot(post_form("/cart/add", "product_id=4", true))
                .await
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(post_form("/cart/decrease", "product_id=4", true))
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("Decreased quantity of Gaming Mouse RGB."));
        assert!(html.contains(r#"data-color="hsl(210, 80%, 55%)""#));

        let response = app
            .clone()
            .oneshot(post_form("/cart/remove", "product_id=4", true))
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("Removed all Gaming Mouse RGB."));
        assert!(html.contains("Your cart is empty."));
        assert!(html.contains(r#"<span id="cart-total">0.00</span>"#));
    }

    #[tokio::test]
    async fn test_unknown_product_is_noop() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(post_form("/cart/add", "product_id=42", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(!html.contains(r#"id="toast""#));
        assert!(html.contains(r#"<span id="cart-count-update" hidden>0</span>"#));
    }

    #[tokio::test]
    async fn test_malformed_product_id_is_bad_request() {
        let response = app()
            .await
            .oneshot(post_form("/cart/add", "product_id=abc", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cart_state_reflects_snapshot() {
        let app = app().await;
        app.clone()
            .oneshot(post_form("/cart/add", "product_id=6", true))
            .await
            .unwrap();

        let response = app
            .oneshot(post_form("/cart/state", "", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Ergonomic Keyboard"));
        assert!(html.contains(r#"<span id="cart-total">89.99</span>"#));
        assert!(html.contains(r#"action="/cart/decrease""#));
        assert!(!html.contains(r#"id="toast""#));
    }

    #[tokio::test]
    async fn test_cart_state_restores_persisted_cart() {
        let storage = MemoryCartStorage::with_raw(
            r#"[{"id":2,"name":"Smartwatch Pro","price":{"amount":"199.99","currency_code":"USD"},"image":"https://placehold.co/300x200?text=Smartwatch","quantity":2}]"#,
        );
        let response = app_with(storage)
            .await
            .oneshot(post_form("/cart/state", "", true))
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains(r#"<span id="cart-count-update" hidden>2</span>"#));
        assert!(html.contains("$199.99 x 2"));
        assert!(html.contains(r#"<span id="cart-total">399.98</span>"#));
    }

    #[tokio::test]
    async fn test_cart_has_no_get_routes() {
        let app = app().await;
        for uri in ["/cart/state", "/cart/add", "/cart/remove"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{uri}");
        }
        for uri in ["/cart", "/cart/count"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }
}
