//! Field-level validation for the admin forms.
//!
//! Each form checks presence and ranges before anything is sent to the
//! backend. Failures are collected per field so every message can be shown
//! next to its input at once.

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::{
    Category, CategoryRef, NewCategoryRequest, NewProduct, ProductUpdate, resolve_category,
};
use crate::types::{Email, Price, ProductId};

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// The message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

fn require(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

fn parse_quantity(errors: &mut FieldErrors, raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or_else(|_| {
        errors.add("quantity", "Quantity must be a non-negative number");
        0
    })
}

fn parse_price(errors: &mut FieldErrors, raw: &str) -> Price {
    Price::parse(raw).unwrap_or_else(|_| {
        errors.add("price", "Price must be a non-negative number");
        Price::ZERO
    })
}

/// The login form.
#[derive(Debug, Clone, Copy)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl LoginForm<'_> {
    /// Both fields are required.
    ///
    /// # Errors
    ///
    /// Returns the missing fields.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "username", self.username, "Username is required");
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result(|| ())
    }
}

/// The registration form.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationForm<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub roles: &'a str,
}

impl RegistrationForm<'_> {
    /// Every field is required and the email must look like an address.
    ///
    /// Password confirmation is checked by the backend.
    ///
    /// # Errors
    ///
    /// Returns one message per invalid field.
    pub fn validate(&self) -> Result<Email, FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "name", self.name, "Name is required");
        require(&mut errors, "password", self.password, "Password is required");
        require(
            &mut errors,
            "confirmPassword",
            self.confirm_password,
            "Please confirm the password",
        );
        require(&mut errors, "roles", self.roles, "Roles are required");

        match Email::parse(self.email) {
            Ok(email) => errors.into_result(|| email),
            Err(e) => {
                errors.add("email", e.to_string());
                Err(errors)
            }
        }
    }
}

/// The new-category form.
#[derive(Debug, Clone, Copy)]
pub struct CategoryForm<'a> {
    pub name: &'a str,
}

impl CategoryForm<'_> {
    /// # Errors
    ///
    /// Returns a `name` error when the name is blank.
    pub fn validate(&self) -> Result<NewCategoryRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "name", self.name, "Name cannot be empty");
        errors.into_result(|| NewCategoryRequest::named(self.name.trim()))
    }
}

/// The new-product form. All inputs are raw text as typed.
#[derive(Debug, Clone, Copy)]
pub struct ProductForm<'a> {
    pub name: &'a str,
    pub price: &'a str,
    pub quantity: &'a str,
    /// Category name or id.
    pub category: &'a str,
}

impl ProductForm<'_> {
    /// Validate against the known categories and build the request body.
    ///
    /// # Errors
    ///
    /// Returns one message per invalid field.
    pub fn validate(&self, categories: &[Category]) -> Result<NewProduct, FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "name", self.name, "Name cannot be empty");
        require(&mut errors, "category", self.category, "Category is required");
        let category = resolve_category(self.category, categories);
        if category.is_none() {
            errors.add("category", format!("Unknown category: {}", self.category.trim()));
        }
        let quantity = parse_quantity(&mut errors, self.quantity);
        let price = parse_price(&mut errors, self.price);

        match category {
            Some(id) => errors.into_result(|| NewProduct {
                name: self.name.trim().to_string(),
                quantity,
                price,
                category: CategoryRef { id },
            }),
            None => Err(errors),
        }
    }
}

/// The inline product edit form on the product list.
#[derive(Debug, Clone, Copy)]
pub struct ProductUpdateForm<'a> {
    pub id: ProductId,
    pub name: &'a str,
    pub price: &'a str,
    pub quantity: &'a str,
}

impl ProductUpdateForm<'_> {
    /// # Errors
    ///
    /// Returns one message per invalid field.
    pub fn validate(&self) -> Result<ProductUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "name", self.name, "Name is required");
        let quantity = parse_quantity(&mut errors, self.quantity);
        let price = parse_price(&mut errors, self.price);
        errors.into_result(|| ProductUpdate {
            id: self.id,
            name: self.name.trim().to_string(),
            quantity,
            price,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::CategoryId;

    fn categories() -> Vec<Category> {
        vec![Category {
            id: CategoryId::new(3),
            name: "Garden".to_string(),
            products: Vec::new(),
        }]
    }

    #[test]
    fn test_product_form_collects_every_error() {
        let form = ProductForm {
            name: "  ",
            price: "-2",
            quantity: "-1",
            category: "",
        };
        let errors = form.validate(&categories()).unwrap_err();

        assert_eq!(errors.get("name"), Some("Name cannot be empty"));
        assert_eq!(errors.get("category"), Some("Category is required"));
        assert_eq!(
            errors.get("quantity"),
            Some("Quantity must be a non-negative number")
        );
        assert_eq!(errors.get("price"), Some("Price must be a non-negative number"));
    }

    #[test]
    fn test_product_form_resolves_category_name() {
        let form = ProductForm {
            name: "Rake",
            price: "9.99",
            quantity: "4",
            category: "garden",
        };
        let product = form.validate(&categories()).unwrap();

        assert_eq!(product.category.id, CategoryId::new(3));
        assert_eq!(product.quantity, 4);
        assert_eq!(product.name, "Rake");
    }

    #[test]
    fn test_product_form_unknown_category() {
        let form = ProductForm {
            name: "Rake",
            price: "1",
            quantity: "1",
            category: "Attic",
        };
        let errors = form.validate(&categories()).unwrap_err();
        assert_eq!(errors.get("category"), Some("Unknown category: Attic"));
    }

    #[test]
    fn test_update_form_requires_name() {
        let form = ProductUpdateForm {
            id: ProductId::new(1),
            name: "",
            price: "1.50",
            quantity: "0",
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert!(errors.get("price").is_none());
    }

    #[test]
    fn test_category_form_trims_name() {
        let request = CategoryForm { name: " Tools " }.validate().unwrap();
        assert_eq!(request.category.name, "Tools");
        assert!(CategoryForm { name: "" }.validate().is_err());
    }

    #[test]
    fn test_registration_form_checks_email() {
        let form = RegistrationForm {
            name: "Ada",
            email: "ada",
            password: "pw",
            confirm_password: "pw",
            roles: "ROLE_ADMIN",
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("email").is_some());
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn test_login_form_requires_both_fields() {
        let errors = LoginForm {
            username: "",
            password: "",
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.to_string(),
            "password: Password is required; username: Username is required"
        );
    }
}
