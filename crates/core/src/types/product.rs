//! Catalog product.

use serde::{Deserialize, Serialize};
use url::Url;

use super::id::ProductId;
use super::price::Price;

/// A product in the static catalog.
///
/// Products are defined at process start and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Product image (absolute URL, usually on the placeholder image host).
    pub image: Url,
}

impl Product {
    /// Create a new product.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Price, image: Url) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image,
        }
    }
}
