use crate::{
    catalog::ProductRecord,
    store::{Knowledge, StoreConfiguration},
};

pub const NO_KNOWLEDGE_PLACEHOLDER: &str = "No store policies or documents have been provided.";
pub const NO_PRODUCTS_PLACEHOLDER: &str = "No products uploaded yet.";
pub const DEFAULT_ASSISTANT_NAME: &str = "WooGenie";
pub const DEFAULT_PRODUCT_LIMIT: usize = 200;

const BEHAVIOR_RULES: &[&str] = &[
    "Answer customer questions based only on the store policies, documents and product catalog above.",
    "If a customer asks about a product, share its price, stock status and description from the catalog.",
    "If a customer asks for recommendations, suggest only products from the catalog that fit their needs.",
    "If the answer is not in the knowledge base, politely say you don't have that information and suggest they contact store support.",
    "Never make up products or policies that are not listed.",
    "Keep answers concise (under 100 words) unless the customer asks for more detail.",
    "Use a professional yet warm tone.",
    "If a product's stock status says it is out of stock (for example \"Out of Stock\" or \"outofstock\"), tell the customer it is currently unavailable.",
    "Format prices for display with a currency symbol when the catalog value has none (for example 24.00 becomes $24.00).",
];

#[derive(Debug, Clone)]
pub enum InstructionParam<TCtx> {
    String(String),
    Func(fn(&TCtx) -> String),
}

impl<TCtx> InstructionParam<TCtx> {
    pub fn as_string(&self, context: &TCtx) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Func(f) => f(context),
        }
    }
}

impl<TCtx> From<&str> for InstructionParam<TCtx> {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<TCtx> From<fn(&TCtx) -> String> for InstructionParam<TCtx> {
    fn from(value: fn(&TCtx) -> String) -> Self {
        Self::Func(value)
    }
}

pub fn get_prompt<TCtx>(instructions: &[InstructionParam<TCtx>], context: &TCtx) -> String {
    instructions
        .iter()
        .map(|param| param.as_string(context))
        .collect::<Vec<_>>()
        .join("\n")
}

/// How the product catalog is rendered into the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogFormat {
    /// One summary line plus a description line per product.
    #[default]
    Lines,
    /// A pretty-printed JSON array of product records.
    Json,
}

/// Renders a [`StoreConfiguration`] into the grounding instruction given to
/// the language model. Output depends only on the compiler settings and the
/// configuration.
#[derive(Debug, Clone)]
pub struct ContextCompiler {
    pub assistant_name: String,
    pub catalog_format: CatalogFormat,
    /// Products beyond this count are left out of the instruction.
    pub product_limit: usize,
}

impl Default for ContextCompiler {
    fn default() -> Self {
        Self {
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            catalog_format: CatalogFormat::default(),
            product_limit: DEFAULT_PRODUCT_LIMIT,
        }
    }
}

struct CompileContext<'a> {
    compiler: &'a ContextCompiler,
    config: &'a StoreConfiguration,
}

impl ContextCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn assistant_name(mut self, assistant_name: impl Into<String>) -> Self {
        self.assistant_name = assistant_name.into();
        self
    }

    #[must_use]
    pub fn catalog_format(mut self, catalog_format: CatalogFormat) -> Self {
        self.catalog_format = catalog_format;
        self
    }

    #[must_use]
    pub fn product_limit(mut self, product_limit: usize) -> Self {
        self.product_limit = product_limit;
        self
    }

    #[must_use]
    pub fn compile(&self, config: &StoreConfiguration) -> String {
        let sections: [InstructionParam<CompileContext>; 6] = [
            InstructionParam::Func(role_section),
            InstructionParam::String("\nYOUR KNOWLEDGE BASE:".to_string()),
            InstructionParam::Func(knowledge_section),
            InstructionParam::Func(catalog_section),
            InstructionParam::String("\nINSTRUCTIONS:".to_string()),
            InstructionParam::String(
                BEHAVIOR_RULES
                    .iter()
                    .map(|rule| format!("- {rule}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        ];

        get_prompt(
            &sections,
            &CompileContext {
                compiler: self,
                config,
            },
        )
    }
}

/// Compiles with the default [`ContextCompiler`].
#[must_use]
pub fn compile_instruction(config: &StoreConfiguration) -> String {
    ContextCompiler::default().compile(config)
}

fn role_section(ctx: &CompileContext) -> String {
    format!(
        "You are {}, a helpful and friendly AI shopping assistant for an online store named \"{}\".",
        ctx.compiler.assistant_name, ctx.config.store_name
    )
}

fn knowledge_section(ctx: &CompileContext) -> String {
    let body = match &ctx.config.knowledge {
        knowledge if knowledge.is_empty() => NO_KNOWLEDGE_PLACEHOLDER.to_string(),
        Knowledge::Policies(policies) => policies.clone(),
        Knowledge::Documents(documents) => documents
            .iter()
            .map(|document| format!("--- {} ---\n{}", document.name, document.content))
            .collect::<Vec<_>>()
            .join("\n\n"),
    };
    format!("1. Store Policies & Documents:\n{body}\n")
}

fn catalog_section(ctx: &CompileContext) -> String {
    let products = &ctx.config.products;
    if products.is_empty() {
        return format!("2. Product Catalog:\n{NO_PRODUCTS_PLACEHOLDER}");
    }

    let shown = &products[..products.len().min(ctx.compiler.product_limit)];
    let mut body = match ctx.compiler.catalog_format {
        CatalogFormat::Lines => shown.iter().map(product_line).collect::<Vec<_>>().join("\n"),
        CatalogFormat::Json => serde_json::to_string_pretty(shown)
            .unwrap_or_else(|_| shown.iter().map(product_line).collect::<Vec<_>>().join("\n")),
    };

    if shown.len() < products.len() {
        body.push_str(&format!(
            "\n(Showing the first {} of {} products.)",
            shown.len(),
            products.len()
        ));
    }

    format!("2. Product Catalog:\n{body}")
}

fn product_line(product: &ProductRecord) -> String {
    format!(
        "- ID: {}, Name: {}, Price: {}, Category: {}, Stock: {}\n  Description: {}",
        product.id,
        product.name,
        product.price,
        product.category,
        product.stock_status,
        product.description
    )
}
