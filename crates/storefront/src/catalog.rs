//! Static product catalog.
//!
//! Products are defined once at startup and never change. Images live on the
//! placeholder image host, which the offline cache is allowed to store.

use eshop_core::{Price, Product, ProductId};
use url::Url;

/// `(id, name, price in cents, image text)` for the demo catalog.
const DEMO_PRODUCTS: &[(i32, &str, i64, &str)] = &[
    (1, "Wireless Headphones", 7999, "Headphones"),
    (2, "Smartwatch Pro", 19999, "Smartwatch"),
    (3, "Portable Bluetooth Speaker", 4999, "Speaker"),
    (4, "Gaming Mouse RGB", 3499, "Gaming+Mouse"),
    (5, "USB-C Hub 7-in-1", 5999, "USB-C+Hub"),
    (6, "Ergonomic Keyboard", 8999, "Keyboard"),
];

const IMAGE_BASE: &str = "https://placehold.co/300x200/4a4a4a/ffffff";

/// The products offered by the shop, in display order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Create a catalog from a product list.
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// The six-product demo catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if an image URL fails to parse.
    pub fn demo() -> Result<Self, url::ParseError> {
        let products = DEMO_PRODUCTS
            .iter()
            .map(|&(id, name, cents, text)| {
                let image = Url::parse(&format!("{IMAGE_BASE}?text={text}"))?;
                Ok(Product::new(
                    ProductId::new(id),
                    name,
                    Price::from_cents(cents),
                    image,
                ))
            })
            .collect::<Result<Vec<_>, url::ParseError>>()?;
        Ok(Self::new(products))
    }

    /// All products in display order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by id.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog() {
        let catalog = Catalog::demo().unwrap();
        assert_eq!(catalog.len(), 6);

        let speaker = catalog.get(ProductId::new(3)).unwrap();
        assert_eq!(speaker.name, "Portable Bluetooth Speaker");
        assert_eq!(speaker.price.display(), "$49.99");
        assert_eq!(speaker.image.host_str(), Some("placehold.co"));
        assert_eq!(speaker.image.query(), Some("text=Speaker"));
    }

    #[test]
    fn test_unknown_product() {
        let catalog = Catalog::demo().unwrap();
        assert!(catalog.get(ProductId::new(99)).is_none());
    }
}
