//! Enrichment of Open Food Facts search results.
//!
//! Upstream products are kept field-for-field; a handful of derived fields are added so
//! that clients do not have to re-implement the same fallbacks.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DERIVED_FIELDS: [&str; 4] = ["display_name", "has_nutrition", "has_image", "nutrition_grade"];
const IMAGE_FIELDS: [&str; 4] = [
    "image_url",
    "image_front_url",
    "image_front_small_url",
    "image_small_url",
];

/// One page of `cgi/search.pl` output. Unknown top-level fields pass through.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub products: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct EnrichedSearchPage {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub products: Vec<SearchEntry>,
}

/// A product record gets enriched; anything else in the array is echoed as-is.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SearchEntry {
    Product(EnrichedProduct),
    Other(Value),
}

impl From<Value> for SearchEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => SearchEntry::Product(EnrichedProduct::from_upstream(fields)),
            other => SearchEntry::Other(other),
        }
    }
}

impl From<SearchPage> for EnrichedSearchPage {
    fn from(page: SearchPage) -> Self {
        Self {
            extra: page.extra,
            products: page.products.into_iter().map(SearchEntry::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrichedProduct {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub display_name: String,
    pub has_nutrition: bool,
    pub has_image: bool,
    pub nutrition_grade: Option<String>,
}

impl EnrichedProduct {
    pub fn from_upstream(mut fields: Map<String, Value>) -> Self {
        // Upstream values under our derived names would serialize twice.
        for name in DERIVED_FIELDS {
            fields.remove(name);
        }

        let display_name = display_name(&fields);
        let has_nutrition = matches!(fields.get("nutriments"), Some(Value::Object(n)) if !n.is_empty());
        let has_image = IMAGE_FIELDS
            .iter()
            .any(|name| non_empty_str(&fields, name).is_some());
        let nutrition_grade = fields
            .get("nutrition_grades_tags")
            .and_then(Value::as_array)
            .and_then(|tags| tags.iter().filter_map(Value::as_str).find_map(normalize_grade));

        Self {
            fields,
            display_name,
            has_nutrition,
            has_image,
            nutrition_grade,
        }
    }
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Localized name, then English name, then a name derived from the barcode.
fn display_name(fields: &Map<String, Value>) -> String {
    if let Some(name) =
        non_empty_str(fields, "product_name").or_else(|| non_empty_str(fields, "product_name_en"))
    {
        return name.to_string();
    }

    let code = match fields.get("code") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => String::new(),
    };
    format!("Product {code}")
}

/// `"en:b"` or `"b"` become `"B"`; `"unknown"` and `"not-applicable"` are dropped.
pub fn normalize_grade(tag: &str) -> Option<String> {
    let grade = tag.rsplit(':').next().unwrap_or(tag).trim();
    let mut chars = grade.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if matches!(c.to_ascii_lowercase(), 'a'..='e') => {
            Some(c.to_ascii_uppercase().to_string())
        }
        _ => None,
    }
}
