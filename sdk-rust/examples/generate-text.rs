use dotenvy::dotenv;
use genie_sdk::{
    google::{GeminiModel, GeminiModelOptions},
    LanguageModel, LanguageModelInput, Message,
};

#[tokio::main]
async fn main() {
    dotenv().ok();

    let model = GeminiModel::new(
        "gemini-3-flash-preview",
        GeminiModelOptions {
            api_key: std::env::var("GEMINI_API_KEY")
                .expect("GEMINI_API_KEY environment variable must be set"),
            ..Default::default()
        },
    );

    let response = model
        .generate(LanguageModelInput {
            messages: vec![Message::user("Write a one-line tagline for a desk lamp.")],
            ..Default::default()
        })
        .await
        .unwrap();

    println!("{response:#?}");
}
