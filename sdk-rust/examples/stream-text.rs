use dotenvy::dotenv;
use futures::stream::StreamExt;
use genie_sdk::{
    google::{GeminiModel, GeminiModelOptions},
    LanguageModel, LanguageModelInput, Message, StreamAccumulator,
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

    let mut stream = model
        .stream(LanguageModelInput {
            system_prompt: Some("You are a helpful shop assistant for a tea store.".to_string()),
            messages: vec![
                Message::user("Do you sell matcha?"),
                Message::assistant("Yes, we carry organic matcha tea powder."),
                Message::user("How should I prepare it?"),
            ],
            temperature: Some(0.4),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut accumulator = StreamAccumulator::new();

    while let Some(partial_response) = stream.next().await {
        let partial_response = partial_response.unwrap();
        accumulator.add_partial(&partial_response);
        println!("{partial_response:#?}");
    }

    let final_response = accumulator.compute_response();
    println!("Final response: {}", final_response.text());
}
