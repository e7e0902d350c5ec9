//! Product grid route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::state::AppState;
use crate::views::ProductCardView;

/// Product grid fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub products: Vec<ProductCardView>,
}

/// Render one card per catalog product, in catalog order.
#[instrument(skip(state))]
pub async fn grid(State(state): State<AppState>) -> ProductGridTemplate {
    ProductGridTemplate {
        products: state
            .catalog()
            .products()
            .iter()
            .map(ProductCardView::from)
            .collect(),
    }
}
