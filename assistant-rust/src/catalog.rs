//! Product catalog ingestion from comma-separated text.
use crate::errors::IngestError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

const DEFAULT_PRICE: &str = "0.00";
const DEFAULT_CATEGORY: &str = "Uncategorized";
const DEFAULT_DESCRIPTION: &str = "No description available.";
const DEFAULT_STOCK_STATUS: &str = "In Stock";

/// One catalog entry. Every field except `image_url` is non-empty once a
/// record leaves the importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    /// Kept exactly as written in the source, currency symbols included.
    pub price: String,
    pub category: String,
    pub description: String,
    pub stock_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Columns that did not map to a known field, keyed by normalized header.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// How a store configuration absorbs a freshly imported catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    #[default]
    Replace,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    Name,
    Price,
    Category,
    Description,
    StockStatus,
    ImageUrl,
    Id,
}

/// Field stems in claim order. A header claims the first field whose stem
/// prefixes one of its `_`-separated tokens.
const FIELD_STEMS: [(Field, &[&str]); 7] = [
    (Field::Name, &["name", "title"]),
    (Field::Price, &["price"]),
    (Field::Category, &["categ"]),
    (Field::Description, &["desc"]),
    (Field::StockStatus, &["stock"]),
    (Field::ImageUrl, &["image", "img"]),
    (Field::Id, &["id", "sku"]),
];

const MIN_EMBEDDED_STEM: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Known(Field),
    Extra,
}

/// Parses product CSV text into [`ProductRecord`]s.
///
/// The first non-empty line is the header row. Rows with fewer values than
/// headers are dropped. Fewer than two non-empty lines yields no products.
#[derive(Debug, Clone)]
pub struct CsvImporter {
    /// Synthesize a placeholder image URL for rows without one.
    pub placeholder_images: bool,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self {
            placeholder_images: true,
        }
    }
}

impl CsvImporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn placeholder_images(mut self, placeholder_images: bool) -> Self {
        self.placeholder_images = placeholder_images;
        self
    }

    #[must_use]
    pub fn parse(&self, text: &str) -> Vec<ProductRecord> {
        let mut lines = text
            .trim_start_matches('\u{feff}')
            .lines()
            .filter(|line| !line.trim().is_empty());

        let Some(header_line) = lines.next() else {
            return Vec::new();
        };

        let headers: Vec<String> = header_line.split(',').map(normalize_header).collect();
        let columns = map_columns(&headers);

        let mut products = Vec::new();
        let mut skipped = 0usize;

        for (index, line) in lines.enumerate() {
            let row = index + 1;
            let values = split_row(line);
            if values.len() < headers.len() {
                skipped += 1;
                continue;
            }
            products.push(self.build_record(row, &headers, &columns, values));
        }

        tracing::debug!(
            products = products.len(),
            skipped,
            columns = headers.len(),
            "parsed product catalog"
        );

        products
    }

    fn build_record(
        &self,
        row: usize,
        headers: &[String],
        columns: &[Column],
        values: Vec<String>,
    ) -> ProductRecord {
        let mut fields: BTreeMap<Field, String> = BTreeMap::new();
        let mut extra = BTreeMap::new();

        for ((header, column), value) in headers.iter().zip(columns).zip(values) {
            match column {
                Column::Known(field) => {
                    if !value.is_empty() {
                        fields.insert(*field, value);
                    }
                }
                Column::Extra => {
                    if !header.is_empty() && !value.is_empty() {
                        extra.insert(header.clone(), value);
                    }
                }
            }
        }

        let mut take = |field: Field| fields.remove(&field);

        ProductRecord {
            id: take(Field::Id).unwrap_or_else(|| format!("prod-{row}")),
            name: take(Field::Name).unwrap_or_else(|| format!("Unknown Product {row}")),
            price: take(Field::Price).unwrap_or_else(|| DEFAULT_PRICE.to_string()),
            category: take(Field::Category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            description: take(Field::Description)
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            stock_status: take(Field::StockStatus)
                .unwrap_or_else(|| DEFAULT_STOCK_STATUS.to_string()),
            image_url: take(Field::ImageUrl).or_else(|| {
                self.placeholder_images
                    .then(|| format!("https://picsum.photos/200/200?random={row}"))
            }),
            extra,
        }
    }
}

/// Parses product CSV text with the default importer.
#[must_use]
pub fn parse_products(text: &str) -> Vec<ProductRecord> {
    CsvImporter::default().parse(text)
}

/// Decodes an uploaded file's bytes and parses them. `name` only labels
/// errors.
pub fn decode_products(
    name: impl AsRef<Path>,
    bytes: &[u8],
) -> Result<Vec<ProductRecord>, IngestError> {
    let text = std::str::from_utf8(bytes).map_err(|source| IngestError::Decode {
        path: name.as_ref().to_path_buf(),
        source,
    })?;
    Ok(parse_products(text))
}

/// Reads a CSV file from disk and parses it.
pub async fn read_products(path: impl AsRef<Path>) -> Result<Vec<ProductRecord>, IngestError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    decode_products(path, &bytes)
}

/// Trims, strips one surrounding quote pair, joins inner whitespace runs
/// with `_`, splits camelCase words with `_` and lower-cases.
fn normalize_header(raw: &str) -> String {
    let trimmed = strip_quotes(raw.trim());
    let joined = trimmed.split_whitespace().collect::<Vec<_>>().join("_");

    let mut header = String::with_capacity(joined.len() + 4);
    let mut prev: Option<char> = None;
    for ch in joined.chars() {
        if ch.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
            header.push('_');
        }
        header.extend(ch.to_lowercase());
        prev = Some(ch);
    }
    header
}

/// Token prefixes are tried first. Headers with run-together words
/// (`productname`) fall back to a substring search, limited to stems long
/// enough not to hide inside unrelated words.
fn header_field(header: &str) -> Option<Field> {
    let tokens: Vec<&str> = header.split('_').filter(|t| !t.is_empty()).collect();
    let by_token = FIELD_STEMS.iter().find_map(|(field, stems)| {
        tokens
            .iter()
            .any(|token| stems.iter().any(|stem| token.starts_with(stem)))
            .then_some(*field)
    });

    by_token.or_else(|| {
        FIELD_STEMS.iter().find_map(|(field, stems)| {
            stems
                .iter()
                .any(|stem| stem.len() >= MIN_EMBEDDED_STEM && header.contains(stem))
                .then_some(*field)
        })
    })
}

/// Each field is taken by its leftmost claiming header; later claimants and
/// unrecognized headers become extra columns.
fn map_columns(headers: &[String]) -> Vec<Column> {
    let mut taken: Vec<Field> = Vec::new();
    headers
        .iter()
        .map(|header| match header_field(header) {
            Some(field) if !taken.contains(&field) => {
                taken.push(field);
                Column::Known(field)
            }
            _ => Column::Extra,
        })
        .collect()
}

/// Splits a data row on commas outside double quotes. Quote characters
/// toggle the quoted state and are not kept.
fn split_row(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                values.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    values.push(current.trim().to_string());

    values
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_catalog_with_defaults() {
        let products = parse_products("name,price,stock\nWidget,9.99,instock\n");

        assert_eq!(
            products,
            vec![ProductRecord {
                id: "prod-1".to_string(),
                name: "Widget".to_string(),
                price: "9.99".to_string(),
                category: "Uncategorized".to_string(),
                description: "No description available.".to_string(),
                stock_status: "instock".to_string(),
                image_url: Some("https://picsum.photos/200/200?random=1".to_string()),
                extra: BTreeMap::new(),
            }]
        );
    }

    #[test]
    fn quoted_value_keeps_embedded_comma() {
        let products = parse_products("name,price,category\n\"Acme, Inc.\",19.99,Widgets");

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Acme, Inc.");
        assert_eq!(products[0].price, "19.99");
        assert_eq!(products[0].category, "Widgets");
    }

    #[test]
    fn fewer_than_two_lines_is_empty() {
        assert!(parse_products("").is_empty());
        assert!(parse_products("name,price\n").is_empty());
        assert!(parse_products("\n  \nname,price\n\n").is_empty());
    }

    #[test]
    fn short_rows_are_dropped_but_consume_an_index() {
        let products = parse_products("name,price\nonly-name\nLamp,45.00\n");

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Lamp");
        assert_eq!(products[0].id, "prod-2");
    }

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_header(" \"Product  Name\" "), "product_name");
        assert_eq!(normalize_header("Stock Status"), "stock_status");
        assert_eq!(normalize_header("SKU"), "sku");
        assert_eq!(normalize_header("ProductName"), "product_name");
        assert_eq!(normalize_header("productId"), "product_id");
        assert_eq!(normalize_header("Image2Url"), "image2_url");
    }

    #[test]
    fn maps_camel_case_and_run_together_headers() {
        let text = "ProductName,UnitPrice,ShortDescription,productId,stockstatus\n\
                    Mug,12,Ceramic mug,M-1,instock\n";
        let products = parse_products(text);

        let product = &products[0];
        assert_eq!(product.name, "Mug");
        assert_eq!(product.price, "12");
        assert_eq!(product.description, "Ceramic mug");
        assert_eq!(product.id, "M-1");
        assert_eq!(product.stock_status, "instock");
        assert!(product.extra.is_empty());

        assert_eq!(header_field("productname"), Some(Field::Name));
        assert_eq!(header_field("unitprice"), Some(Field::Price));
        assert_eq!(header_field("productcategory"), Some(Field::Category));
        assert_eq!(header_field("paid"), None);
        assert_eq!(header_field("valid"), None);
    }

    #[test]
    fn maps_woocommerce_export_headers() {
        let text = "ID,Type,SKU,Name,Short description,In stock?,Regular price,Categories,Images\n\
                    42,simple,LAMP-1,Desk Lamp,Warm light,1,45.00,Home,https://shop.test/lamp.png\n";
        let products = parse_products(text);

        let product = &products[0];
        assert_eq!(product.id, "42");
        assert_eq!(product.name, "Desk Lamp");
        assert_eq!(product.description, "Warm light");
        assert_eq!(product.stock_status, "1");
        assert_eq!(product.price, "45.00");
        assert_eq!(product.category, "Home");
        assert_eq!(product.image_url.as_deref(), Some("https://shop.test/lamp.png"));
        assert_eq!(product.extra.get("type").map(String::as_str), Some("simple"));
        assert_eq!(product.extra.get("sku").map(String::as_str), Some("LAMP-1"));
    }

    #[test]
    fn ambiguous_header_claims_first_field_in_stem_order() {
        assert_eq!(header_field("id_category"), Some(Field::Category));
        assert_eq!(header_field("product_title"), Some(Field::Name));
        assert_eq!(header_field("regular_price"), Some(Field::Price));
        assert_eq!(header_field("width"), None);
        assert_eq!(header_field("paid"), None);
    }

    #[test]
    fn unknown_columns_are_kept_as_extra() {
        let products = parse_products("name,price,width,color\nShelf,80,120cm,oak\n");

        let extra = &products[0].extra;
        assert_eq!(extra.get("width").map(String::as_str), Some("120cm"));
        assert_eq!(extra.get("color").map(String::as_str), Some("oak"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let products = parse_products("name,price,description,stock\n ,, ,\n");

        let product = &products[0];
        assert_eq!(product.name, "Unknown Product 1");
        assert_eq!(product.price, "0.00");
        assert_eq!(product.description, "No description available.");
        assert_eq!(product.stock_status, "In Stock");
    }

    #[test]
    fn placeholder_images_can_be_disabled() {
        let products = CsvImporter::new()
            .placeholder_images(false)
            .parse("name,price\nMug,12\n");

        assert_eq!(products[0].image_url, None);
    }

    #[test]
    fn handles_crlf_and_byte_order_mark() {
        let products = parse_products("\u{feff}name,price\r\nMug,12\r\n");

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Mug");
        assert_eq!(products[0].price, "12");
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let result = decode_products("catalog.csv", &[0x6e, 0xff, 0xfe]);

        assert!(matches!(result, Err(IngestError::Decode { .. })));
    }

    #[test]
    fn product_serializes_with_camel_case_keys() {
        let product = &parse_products("name,price\nMug,12\n")[0];
        let value = serde_json::to_value(product).unwrap();

        assert_eq!(value["stockStatus"], "In Stock");
        assert_eq!(value["imageUrl"], "https://picsum.photos/200/200?random=1");
        assert!(value.get("extra").is_none());
    }
}
