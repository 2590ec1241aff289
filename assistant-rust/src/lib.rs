//! Storefront shopping assistant.
//!
//! Product CSVs and policy documents become a [`StoreConfiguration`], which the
//! [`ContextCompiler`] renders into a grounding instruction. An [`Assistant`]
//! starts [`ChatSession`]s on that instruction and the [`Conversation`] log
//! records what the customer sees.
pub mod catalog;
pub mod conversation;
pub mod documents;
mod errors;
pub mod instruction;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod store;
pub mod widget;

pub use catalog::{parse_products, CsvImporter, ImportMode, ProductRecord};
pub use conversation::{ChatMessage, Conversation, Role};
pub use documents::{DocumentIngestor, DocumentKind, KnowledgeDocument};
pub use errors::{AssistantError, IngestError};
pub use instruction::{compile_instruction, CatalogFormat, ContextCompiler, InstructionParam};
pub use persistence::{ConfigStore, FileConfigStore, MemoryConfigStore};
pub use session::{Assistant, ChatSession, ReplyStream, SessionParams};
pub use settings::AssistantSettings;
pub use store::{Knowledge, StoreConfiguration};
pub use widget::{ChatWidget, WidgetStatus};
