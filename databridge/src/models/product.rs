//! Product entity and import-time parsing
//!
//! Products arrive as wide spreadsheet-shaped rows. Column headers are
//! normalized before matching field names, cell values convert to the
//! field's declared type with empty / `---` treated as null, and the two
//! hierarchy fields (tree path, class mapping) go through strict
//! positional parsers that reject malformed segments.

use super::NaturalKey;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Wide denormalized product record keyed by the vendor's article id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Product {
    pub article_id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub tree_path: Option<String>,
    pub class_mapping: Option<String>,
    pub dimensions: [Option<i64>; 6],
    pub class_ids: [Option<i64>; 5],
    pub price: Option<f64>,
    pub weight_kg: Option<f64>,
    pub in_stock: Option<bool>,
    pub discontinued: Option<bool>,
    pub launch_date: Option<String>,
}

impl NaturalKey for Product {
    type Key = i64;

    fn natural_key(&self) -> i64 {
        self.article_id
    }
}

/// Product row import failure
#[derive(Debug, Error)]
pub enum ProductImportError {
    #[error("Row has no usable ArticleId")]
    MissingArticleId,

    #[error("Malformed tree path segment {segment:?} in {path:?}")]
    InvalidTreeSegment { path: String, segment: String },

    #[error("Malformed class mapping segment {segment:?} in {mapping:?}")]
    InvalidClassSegment { mapping: String, segment: String },
}

/// Normalize a spreadsheet header to a field name.
///
/// Rules, applied in order: strip any `(filter)` marker, keep only the text
/// before the first `#`, trim, then remove all spaces and periods.
pub fn normalize_header(header: &str) -> String {
    let stripped = header.replace("(filter)", "");
    let before_hash = stripped.split('#').next().unwrap_or("");
    before_hash
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '.')
        .collect()
}

/// Parse the slash-delimited hierarchy tree path into dimension levels.
///
/// Strictly positional: segment *i* is dimension *i*; absent trailing
/// positions stay `None`. An empty or missing path is not an error; a
/// non-integer segment is.
pub fn parse_tree_path(path: &str) -> Result<[Option<i64>; 6], ProductImportError> {
    let mut dimensions = [None; 6];

    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(dimensions);
    }

    for (i, segment) in trimmed.split('/').enumerate().take(6) {
        let value = segment
            .trim()
            .parse::<i64>()
            .map_err(|_| ProductImportError::InvalidTreeSegment {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
        dimensions[i] = Some(value);
    }

    Ok(dimensions)
}

/// Parse the comma-delimited class mapping list into class id levels.
///
/// Same positional/null-fill rules as [`parse_tree_path`].
pub fn parse_class_mapping(mapping: &str) -> Result<[Option<i64>; 5], ProductImportError> {
    let mut class_ids = [None; 5];

    let trimmed = mapping.trim();
    if trimmed.is_empty() {
        return Ok(class_ids);
    }

    for (i, segment) in trimmed.split(',').enumerate().take(5) {
        let value = segment
            .trim()
            .parse::<i64>()
            .map_err(|_| ProductImportError::InvalidClassSegment {
                mapping: mapping.to_string(),
                segment: segment.to_string(),
            })?;
        class_ids[i] = Some(value);
    }

    Ok(class_ids)
}

/// Null markers: empty cell or the literal `---` token
fn clean_cell(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "---" {
        return None;
    }
    // A value prefixed with --- has the marker stripped before conversion
    Some(trimmed.strip_prefix("---").unwrap_or(trimmed).trim())
}

fn cell_string(value: &str) -> Option<String> {
    clean_cell(value).map(|s| s.to_string())
}

fn cell_i64(header: &str, value: &str) -> Option<i64> {
    let cleaned = clean_cell(value)?;
    match cleaned.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(header, value, "Integer conversion failed, storing null");
            None
        }
    }
}

fn cell_f64(header: &str, value: &str) -> Option<f64> {
    let cleaned = clean_cell(value)?;
    match cleaned.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(header, value, "Decimal conversion failed, storing null");
            None
        }
    }
}

fn cell_bool(header: &str, value: &str) -> Option<bool> {
    let cleaned = clean_cell(value)?;
    match cleaned.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => {
            warn!(header, value, "Boolean conversion failed, storing null");
            None
        }
    }
}

fn cell_date(header: &str, value: &str) -> Option<String> {
    let cleaned = clean_cell(value)?;
    match chrono::NaiveDate::parse_from_str(cleaned, "%Y-%m-%d")
        .map(|d| d.to_string())
        .or_else(|_| {
            chrono::DateTime::parse_from_rfc3339(cleaned).map(|d| d.date_naive().to_string())
        }) {
        Ok(date) => Some(date),
        Err(_) => {
            warn!(header, value, "Date conversion failed, storing null");
            None
        }
    }
}

impl Product {
    /// Build a product from one spreadsheet row.
    ///
    /// Headers that normalize to an unknown field name are silently
    /// ignored. Ordinary conversion failures become nulls; a missing
    /// article id or a malformed tree path / class mapping fails the row.
    pub fn from_row(headers: &[String], cells: &[String]) -> Result<Self, ProductImportError> {
        let mut product = Product::default();
        let mut has_article_id = false;

        for (header, cell) in headers.iter().zip(cells.iter()) {
            match normalize_header(header).as_str() {
                "ArticleId" => {
                    if let Some(id) = cell_i64(header, cell) {
                        product.article_id = id;
                        has_article_id = true;
                    }
                }
                "Name" => product.name = cell_string(cell),
                "Description" => product.description = cell_string(cell),
                "Brand" => product.brand = cell_string(cell),
                "Color" => product.color = cell_string(cell),
                "TreePath" => {
                    product.tree_path = cell_string(cell);
                    if let Some(ref path) = product.tree_path {
                        product.dimensions = parse_tree_path(path)?;
                    }
                }
                "ClassMapping" => {
                    product.class_mapping = cell_string(cell);
                    if let Some(ref mapping) = product.class_mapping {
                        product.class_ids = parse_class_mapping(mapping)?;
                    }
                }
                "Price" => product.price = cell_f64(header, cell),
                "WeightKg" => product.weight_kg = cell_f64(header, cell),
                "InStock" => product.in_stock = cell_bool(header, cell),
                "Discontinued" => product.discontinued = cell_bool(header, cell),
                "LaunchDate" => product.launch_date = cell_date(header, cell),
                _ => {} // unknown headers are ignored
            }
        }

        if !has_article_id {
            return Err(ProductImportError::MissingArticleId);
        }

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_filter_marker_and_swatch() {
        assert_eq!(normalize_header("Color (filter)#Swatch"), "Color");
    }

    #[test]
    fn normalize_removes_spaces_and_periods() {
        assert_eq!(normalize_header("Inside Diameter.Filter"), "InsideDiameterFilter");
    }

    #[test]
    fn tree_path_positions_map_to_dimensions() {
        let dims = parse_tree_path("/1000/15500/15501").unwrap();
        assert_eq!(dims[0], Some(1000));
        assert_eq!(dims[1], Some(15500));
        assert_eq!(dims[2], Some(15501));
        assert_eq!(dims[3], None);
        assert_eq!(dims[4], None);
        assert_eq!(dims[5], None);
    }

    #[test]
    fn empty_tree_path_is_all_null() {
        assert_eq!(parse_tree_path("").unwrap(), [None; 6]);
        assert_eq!(parse_tree_path("/").unwrap(), [None; 6]);
    }

    #[test]
    fn malformed_tree_segment_raises() {
        assert!(parse_tree_path("/1000/abc").is_err());
    }

    #[test]
    fn class_mapping_positions_map_to_class_ids() {
        let ids = parse_class_mapping("30,28,7056,29").unwrap();
        assert_eq!(ids[0], Some(30));
        assert_eq!(ids[1], Some(28));
        assert_eq!(ids[2], Some(7056));
        assert_eq!(ids[3], Some(29));
        assert_eq!(ids[4], None);
    }

    #[test]
    fn malformed_class_segment_raises() {
        assert!(parse_class_mapping("30,x").is_err());
    }

    #[test]
    fn null_markers_convert_to_none() {
        assert_eq!(cell_string(""), None);
        assert_eq!(cell_string("---"), None);
        assert_eq!(cell_string("--- red"), Some("red".to_string()));
        assert_eq!(cell_i64("Price", "not a number"), None);
    }

    #[test]
    fn from_row_builds_typed_product() {
        let headers: Vec<String> = [
            "ArticleId",
            "Name",
            "Color (filter)#Swatch",
            "TreePath",
            "ClassMapping",
            "Price",
            "InStock",
            "Unknown Column",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let cells: Vec<String> = [
            "1234",
            "Widget",
            "Blue",
            "/1000/15500",
            "30,28",
            "19.95",
            "true",
            "ignored",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let product = Product::from_row(&headers, &cells).unwrap();
        assert_eq!(product.article_id, 1234);
        assert_eq!(product.name.as_deref(), Some("Widget"));
        assert_eq!(product.color.as_deref(), Some("Blue"));
        assert_eq!(product.dimensions[1], Some(15500));
        assert_eq!(product.class_ids[0], Some(30));
        assert_eq!(product.price, Some(19.95));
        assert_eq!(product.in_stock, Some(true));
    }

    #[test]
    fn from_row_without_article_id_fails() {
        let headers = vec!["Name".to_string()];
        let cells = vec!["Widget".to_string()];
        assert!(matches!(
            Product::from_row(&headers, &cells),
            Err(ProductImportError::MissingArticleId)
        ));
    }
}
