//! Query identity: the raw input plus the offline-seeded guess.
//!
//! The offline tokenizer that produces these guesses lives outside this
//! crate; the orchestrator receives the identity fully formed and treats it
//! as read-only.

use serde::{Deserialize, Serialize};

/// The product being researched, as far as we know before going online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIdentity {
    /// The unmodified input query (e.g. "HP W1331X toner black").
    pub raw_query: String,

    /// Brand guess (e.g. "HP").
    pub brand: Option<String>,

    /// Model / part number guess (e.g. "W1331X").
    pub model: Option<String>,

    /// Product type guess (e.g. "toner cartridge").
    pub product_type: Option<String>,

    /// Color guess (e.g. "black").
    pub color: Option<String>,

    /// Page-yield guess (e.g. "15000").
    pub page_yield: Option<String>,
}

impl QueryIdentity {
    /// Create an identity from the raw query alone.
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            brand: None,
            model: None,
            product_type: None,
            color: None,
            page_yield: None,
        }
    }

    /// Set the brand guess.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Set the model guess.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the product type guess.
    pub fn with_product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    /// Set the color guess.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the page-yield guess.
    pub fn with_page_yield(mut self, page_yield: impl Into<String>) -> Self {
        self.page_yield = Some(page_yield.into());
        self
    }

    /// The token used in search templates: the model guess when present,
    /// otherwise the raw query.
    pub fn search_token(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.raw_query)
    }

    /// The brand in lowercase, if known.
    pub fn brand_lower(&self) -> Option<String> {
        self.brand.as_ref().map(|b| b.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_token_prefers_model() {
        let id = QueryIdentity::new("HP W1331X toner").with_model("W1331X");
        assert_eq!(id.search_token(), "W1331X");

        let bare = QueryIdentity::new("mystery product");
        assert_eq!(bare.search_token(), "mystery product");
    }
}
