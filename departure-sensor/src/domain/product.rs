//! Transit product (train category) codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length of a product code.
const MAX_LEN: usize = 8;

/// Product codes with a known human-readable description.
const KNOWN_PRODUCTS: &[(&str, &str)] = &[
    ("BUS", "Busverkehr (BUS)"),
    ("STR", "Straßenbahn (STR)"),
    ("S", "Stadtbahn (S-Bahn)"),
    ("RE", "Regional Express (RE)"),
    ("RB", "Regional Bahn (RB)"),
    ("EC", "EuroCity (EC)"),
    ("IC", "Intercity (IC)"),
    ("ICE", "Intercity Express (ICE)"),
    ("TGV", "Train à grande vitesse (TGV)"),
    ("EST", "LGV Est européenne"),
];

/// Error returned when parsing an invalid product code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid product code: {reason}")]
pub struct InvalidProduct {
    reason: &'static str,
}

/// A transit product code such as `ICE`, `RE` or `S`.
///
/// Product codes are 1 to 8 uppercase ASCII letters or digits. Codes outside
/// the known set are accepted; they just have no description.
///
/// # Examples
///
/// ```
/// use departure_sensor::domain::Product;
///
/// let ice = Product::parse("ICE").unwrap();
/// assert_eq!(ice.as_str(), "ICE");
/// assert_eq!(ice.description(), Some("Intercity Express (ICE)"));
///
/// // Lowercase is rejected by `parse` but accepted by `parse_normalized`
/// assert!(Product::parse("ice").is_err());
/// assert_eq!(Product::parse_normalized(" ice ").unwrap(), ice);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Product(String);

impl Product {
    /// Parse a product code from a string.
    ///
    /// The input must be 1 to 8 uppercase ASCII letters or digits.
    pub fn parse(s: &str) -> Result<Self, InvalidProduct> {
        if s.is_empty() {
            return Err(InvalidProduct {
                reason: "must not be empty",
            });
        }

        if s.len() > MAX_LEN {
            return Err(InvalidProduct {
                reason: "must be at most 8 characters",
            });
        }

        if !s
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(InvalidProduct {
                reason: "must be uppercase ASCII letters or digits",
            });
        }

        Ok(Product(s.to_string()))
    }

    /// Parse a product code, trimming whitespace and converting to uppercase.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidProduct> {
        Self::parse(&s.trim().to_ascii_uppercase())
    }

    /// Returns the product code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable description for known product codes.
    pub fn description(&self) -> Option<&'static str> {
        KNOWN_PRODUCTS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, description)| *description)
    }

    /// All product codes with a known description, in display order.
    pub fn known() -> impl Iterator<Item = Product> {
        KNOWN_PRODUCTS
            .iter()
            .map(|(code, _)| Product((*code).to_string()))
    }
}

impl TryFrom<String> for Product {
    type Error = InvalidProduct;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse_normalized(&s)
    }
}

impl From<Product> for String {
    fn from(product: Product) -> Self {
        product.0
    }
}

impl fmt::Debug for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Product({})", self.as_str())
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_codes() {
        for code in ["BUS", "STR", "S", "RE", "RB", "EC", "IC", "ICE", "TGV", "EST"] {
            let product = Product::parse(code).unwrap();
            assert!(product.description().is_some(), "{code} has no description");
        }
    }

    #[test]
    fn parse_unknown_code() {
        let product = Product::parse("NJ").unwrap();
        assert_eq!(product.as_str(), "NJ");
        assert_eq!(product.description(), None);
    }

    #[test]
    fn reject_invalid() {
        assert!(Product::parse("").is_err());
        assert!(Product::parse("ice").is_err());
        assert!(Product::parse("S-BAHN").is_err());
        assert!(Product::parse("ICE 123").is_err());
        assert!(Product::parse("TOOLONGCODE").is_err());
    }

    #[test]
    fn normalized_parse() {
        assert_eq!(Product::parse_normalized("re").unwrap().as_str(), "RE");
        assert_eq!(Product::parse_normalized("  Bus\t").unwrap().as_str(), "BUS");
        assert!(Product::parse_normalized("   ").is_err());
    }

    #[test]
    fn known_lists_every_code_once() {
        let known: Vec<Product> = Product::known().collect();
        assert_eq!(known.len(), 10);
        assert_eq!(known[0].as_str(), "BUS");
        assert_eq!(known[9].as_str(), "EST");
    }

    #[test]
    fn serde_as_plain_string() {
        let product = Product::parse("ICE").unwrap();
        assert_eq!(serde_json::to_string(&product).unwrap(), r#""ICE""#);

        let parsed: Product = serde_json::from_str(r#""ice""#).unwrap();
        assert_eq!(parsed, product);

        assert!(serde_json::from_str::<Product>(r#""""#).is_err());
    }

    #[test]
    fn debug_and_display() {
        let product = Product::parse("RB").unwrap();
        assert_eq!(format!("{product}"), "RB");
        assert_eq!(format!("{product:?}"), "Product(RB)");
    }
}
