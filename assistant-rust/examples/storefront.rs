//! Interactive storefront chat.
//!
//! ```sh
//! cargo run -p genie-assistant --example storefront -- products.csv returns.md
//! ```
//!
//! `.csv` arguments replace the catalog, any other file is added as a
//! knowledge document. Without a saved configuration the demo shop is used.
use futures::StreamExt;
use genie_assistant::{
    catalog::{read_products, ImportMode},
    conversation::Conversation,
    Assistant, AssistantSettings, ConfigStore, DocumentIngestor, FileConfigStore,
    StoreConfiguration,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = AssistantSettings::from_env();
    let store = FileConfigStore::from_settings(&settings);
    let mut config = store.load().unwrap_or_else(StoreConfiguration::demo);

    for path in std::env::args().skip(1) {
        if path.ends_with(".csv") {
            match read_products(&path).await {
                Ok(products) if products.is_empty() => {
                    eprintln!("{path}: no valid products found. Ensure headers include name and price.");
                }
                Ok(products) => {
                    let total = config.import_products(products, ImportMode::Replace);
                    println!("Imported {total} products from {path}");
                }
                Err(error) => eprintln!("{error}"),
            }
        } else {
            match DocumentIngestor::read(&path).await {
                Ok(document) => {
                    println!("Added document {}", document.name);
                    config.add_document(document);
                }
                Err(error) => eprintln!("{error}"),
            }
        }
    }
    store.save(&config);

    let assistant = match Assistant::from_settings(&settings) {
        Ok(assistant) => assistant,
        Err(error) => {
            eprintln!("{error}");
            eprintln!("Set GEMINI_API_KEY to chat with the assistant.");
            return Ok(());
        }
    };

    let mut session = assistant.initialize(&config);
    let mut conversation = Conversation::with_welcome(&config.store_name);
    if let Some(welcome) = conversation.last() {
        println!("{}\n", welcome.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        conversation.push_user(line.as_str());
        let id = conversation.push_model_placeholder();

        let mut reply = session.send_stream(line);
        while let Some(fragment) = reply.next().await {
            print!("{fragment}");
            std::io::stdout().flush()?;
            conversation.append_fragment(&id, &fragment);
        }
        drop(reply);
        conversation.finish_streaming(&id);
        println!("\n");
    }

    Ok(())
}
