use crate::{
    catalog::{ImportMode, ProductRecord},
    documents::{DocumentIngestor, KnowledgeDocument},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STORE_NAME: &str = "My WooCommerce Store";

/// Name given to a free-text policy when it is folded into a document
/// collection.
const POLICIES_DOCUMENT_NAME: &str = "Store Policies";

/// The unit of persistence and of session initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfiguration {
    pub store_name: String,
    #[serde(flatten)]
    pub knowledge: Knowledge,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

/// The store's policy knowledge. A configuration carries either a single
/// free-text policy or an ordered document collection, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Knowledge {
    Policies(String),
    Documents(Vec<KnowledgeDocument>),
}

impl Knowledge {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Policies(policies) => policies.trim().is_empty(),
            Self::Documents(documents) => documents.is_empty(),
        }
    }
}

impl Default for Knowledge {
    fn default() -> Self {
        Self::Documents(Vec::new())
    }
}

impl Default for StoreConfiguration {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_NAME)
    }
}

impl StoreConfiguration {
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            knowledge: Knowledge::default(),
            products: Vec::new(),
        }
    }

    pub fn with_policies(store_name: impl Into<String>, policies: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            knowledge: Knowledge::Policies(policies.into()),
            products: Vec::new(),
        }
    }

    /// Absorbs an imported catalog and returns the resulting product count.
    pub fn import_products(&mut self, records: Vec<ProductRecord>, mode: ImportMode) -> usize {
        let imported = records.len();
        match mode {
            ImportMode::Replace => self.products = records,
            ImportMode::Append => self.products.extend(records),
        }
        tracing::info!(
            imported,
            total = self.products.len(),
            ?mode,
            "imported products"
        );
        self.products.len()
    }

    /// Appends a document. A configuration still holding free-text policies
    /// switches to a document collection, keeping non-blank policies as its
    /// first document.
    pub fn add_document(&mut self, document: KnowledgeDocument) {
        match &mut self.knowledge {
            Knowledge::Documents(documents) => documents.push(document),
            Knowledge::Policies(policies) => {
                let mut documents = Vec::with_capacity(2);
                if !policies.trim().is_empty() {
                    documents.push(DocumentIngestor::ingest(
                        POLICIES_DOCUMENT_NAME,
                        std::mem::take(policies),
                    ));
                }
                documents.push(document);
                self.knowledge = Knowledge::Documents(documents);
            }
        }
    }

    pub fn remove_document(&mut self, id: &str) -> Option<KnowledgeDocument> {
        let Knowledge::Documents(documents) = &mut self.knowledge else {
            return None;
        };
        let position = documents.iter().position(|document| document.id == id)?;
        Some(documents.remove(position))
    }

    #[must_use]
    pub fn documents(&self) -> &[KnowledgeDocument] {
        match &self.knowledge {
            Knowledge::Documents(documents) => documents,
            Knowledge::Policies(_) => &[],
        }
    }

    /// A ready-to-chat sample shop.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            store_name: "WooGemini Demo Shop".to_string(),
            knowledge: Knowledge::Policies(demo_policies()),
            products: demo_products(),
        }
    }
}

fn demo_product(
    id: &str,
    name: &str,
    price: &str,
    category: &str,
    description: &str,
    stock_status: &str,
    image_seed: &str,
) -> ProductRecord {
    ProductRecord {
        id: id.to_string(),
        name: name.to_string(),
        price: price.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        stock_status: stock_status.to_string(),
        image_url: Some(format!("https://picsum.photos/seed/{image_seed}/200/200")),
        extra: std::collections::BTreeMap::new(),
    }
}

#[must_use]
pub fn demo_products() -> Vec<ProductRecord> {
    vec![
        demo_product(
            "101",
            "Vintage Leather Jacket",
            "199.99",
            "Clothing",
            "Genuine leather, classic fit, brown.",
            "In Stock",
            "jacket",
        ),
        demo_product(
            "102",
            "Wireless Noise-Canceling Headphones",
            "249.50",
            "Electronics",
            "40hr battery life, active noise cancellation.",
            "In Stock",
            "headphones",
        ),
        demo_product(
            "103",
            "Organic Matcha Tea Powder",
            "24.00",
            "Grocery",
            "Premium ceremonial grade from Japan.",
            "Low Stock",
            "tea",
        ),
        demo_product(
            "104",
            "Minimalist Desk Lamp",
            "45.00",
            "Home",
            "LED, adjustable brightness, matte black.",
            "Out of Stock",
            "lamp",
        ),
    ]
}

#[must_use]
pub fn demo_policies() -> String {
    "**Return Policy:** You can return items within 30 days of receipt. Items must be unused and in original packaging.\n\
     **Shipping:** Free shipping on orders over $50. Standard shipping takes 3-5 business days.\n\
     **Contact:** Support email is support@woogemini.com."
        .to_string()
}
