use genie_assistant::{
    catalog::{decode_products, read_products},
    parse_products, DocumentIngestor, DocumentKind, IngestError,
};
use std::fs;

#[tokio::test]
async fn reads_products_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.csv");
    fs::write(
        &path,
        "Name,Price,Category,Stock Status\n\
         \"Tea Set, Blue\",\"$39.00\",Kitchen,outofstock\n\
         Kettle,25,Kitchen,instock\n",
    )
    .unwrap();

    let products = read_products(&path).await.expect("file is readable");

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Tea Set, Blue");
    assert_eq!(products[0].price, "$39.00");
    assert_eq!(products[0].stock_status, "outofstock");
    assert_eq!(products[1].id, "prod-2");
}

#[tokio::test]
async fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();

    let result = read_products(dir.path().join("missing.csv")).await;

    assert!(matches!(result, Err(IngestError::Read { .. })));
}

#[tokio::test]
async fn empty_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    fs::write(&path, "name,price\n").unwrap();

    let products = read_products(&path).await.expect("file is readable");

    assert!(products.is_empty());
}

#[test]
fn every_record_has_required_fields() {
    let text = "title,regular_price,short_description,in_stock,extra\n\
                Mug,12,,,\n\
                ,,,,\n\
                Bowl,8,Stoneware,outofstock,glazed\n";

    let products = parse_products(text);

    assert_eq!(products.len(), 3);
    for product in &products {
        assert!(!product.id.is_empty());
        assert!(!product.name.is_empty());
        assert!(!product.price.is_empty());
        assert!(!product.description.is_empty());
        assert!(!product.stock_status.is_empty());
    }
    assert_eq!(products[2].description, "Stoneware");
    assert_eq!(products[2].extra.get("extra").map(String::as_str), Some("glazed"));
}

#[test]
fn decode_distinguishes_bad_bytes_from_no_rows() {
    assert!(matches!(
        decode_products("upload.csv", b"name,price\n\xff\xfe,1\n"),
        Err(IngestError::Decode { .. })
    ));
    assert!(decode_products("upload.csv", b"name,price\n").unwrap().is_empty());
}

#[tokio::test]
async fn reads_documents_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("returns.md");
    fs::write(&path, "# Returns\nWithin 30 days.\n").unwrap();

    let document = DocumentIngestor::read(&path).await.expect("file is readable");

    assert_eq!(document.name, "returns.md");
    assert_eq!(document.kind, DocumentKind::Markdown);
    assert_eq!(document.content, "# Returns\nWithin 30 days.\n");
}

#[tokio::test]
async fn unreadable_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    let result = DocumentIngestor::read(dir.path().join("nope.txt")).await;

    assert!(matches!(result, Err(IngestError::Read { .. })));
}
