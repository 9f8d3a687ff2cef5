//! Catalog records exchanged with the backend.
//!
//! Field names follow the backend's JSON contract (`totalPages` is camel
//! case, everything else is a single word).

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Price, ProductId};

/// A product category as returned by `/category/all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Reference to a category by id, as embedded in product payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
}

/// A product as returned by `/product/all` and `/product/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default = "default_total_pages")]
    pub total_pages: u32,
}

const fn default_total_pages() -> u32 {
    1
}

/// A listing endpoint that may answer with either a bare array or a page.
///
/// `/category/all` without paging parameters returns an array, with them a
/// [`Page`]. Callers that want every record accept both.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Page(Page<T>),
    Items(Vec<T>),
}

impl<T> Listing<T> {
    /// The records regardless of envelope.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Page(page) => page.content,
            Self::Items(items) => items,
        }
    }
}

/// Body of `POST /category`.
///
/// The backend expects the category wrapped in a `category` field.
#[derive(Debug, Clone, Serialize)]
pub struct NewCategoryRequest {
    pub category: NewCategory,
}

/// A category to be created.
#[derive(Debug, Clone, Serialize)]
pub struct NewCategory {
    pub name: String,
    pub products: Vec<Product>,
}

impl NewCategoryRequest {
    /// Wrap a category name into the request envelope.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            category: NewCategory {
                name: name.into(),
                products: Vec::new(),
            },
        }
    }
}

/// Body of `POST /product`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub quantity: u32,
    pub price: Price,
    pub category: CategoryRef,
}

/// Body of `PUT /product`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    pub id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Price,
}

/// Anything with a display name that the search box can filter on.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for Category {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Product {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Case-insensitive substring filter used by the list views' search boxes.
///
/// An empty query keeps every item.
pub fn filter_by_name<'a, T: Named>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    items
        .iter()
        .filter(|item| item.name().to_lowercase().contains(&needle))
        .collect()
}

/// Resolve the product form's category field.
///
/// The field accepts either a category name (case-insensitive exact match)
/// or a numeric id. Names win over ids so a category called "42" is found by
/// name first.
#[must_use]
pub fn resolve_category(input: &str, categories: &[Category]) -> Option<CategoryId> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let wanted = input.to_lowercase();
    categories
        .iter()
        .find(|c| c.name.to_lowercase() == wanted)
        .map(|c| c.id)
        .or_else(|| input.parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            products: Vec::new(),
        }
    }

    #[test]
    fn test_page_decodes_camel_case() {
        let json = r#"{"content":[{"id":1,"name":"Tools"}],"totalPages":4}"#;
        let page: Page<Category> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.content, vec![category(1, "Tools")]);
    }

    #[test]
    fn test_listing_accepts_array_and_page() {
        let array: Listing<Category> = serde_json::from_str(r#"[{"id":1,"name":"A"}]"#).unwrap();
        assert_eq!(array.into_items().len(), 1);

        let json = r#"{"content":[{"id":1,"name":"A"},{"id":2,"name":"B"}],"totalPages":1}"#;
        let page: Listing<Category> = serde_json::from_str(json).unwrap();
        assert_eq!(page.into_items().len(), 2);
    }

    #[test]
    fn test_product_decodes_numeric_price() {
        let json = r#"{"id":9,"name":"Hammer","quantity":3,"price":12.5,"category":{"id":2}}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Price::parse("12.5").unwrap());
        assert_eq!(product.category, Some(CategoryRef { id: CategoryId::new(2) }));
    }

    #[test]
    fn test_new_category_request_shape() {
        let body = serde_json::to_value(NewCategoryRequest::named("Garden")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"category": {"name": "Garden", "products": []}})
        );
    }

    #[test]
    fn test_new_product_shape() {
        let body = serde_json::to_value(NewProduct {
            name: "Rake".to_string(),
            quantity: 2,
            price: Price::parse("9.5").unwrap(),
            category: CategoryRef {
                id: CategoryId::new(4),
            },
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"name": "Rake", "quantity": 2, "price": 9.5, "category": {"id": 4}})
        );
    }

    #[test]
    fn test_filter_by_name_is_case_insensitive() {
        let items = vec![category(1, "Garden Tools"), category(2, "Kitchen")];
        let hits = filter_by_name(&items, "garden");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, CategoryId::new(1));
        assert_eq!(filter_by_name(&items, "").len(), 2);
    }

    #[test]
    fn test_resolve_category_by_name_then_id() {
        let items = vec![category(1, "Garden"), category(2, "Kitchen")];
        assert_eq!(resolve_category("KITCHEN", &items), Some(CategoryId::new(2)));
        assert_eq!(resolve_category("7", &items), Some(CategoryId::new(7)));
        assert_eq!(resolve_category("Attic", &items), None);
        assert_eq!(resolve_category("  ", &items), None);
    }
}
