use futures::StreamExt;
use genie_sdk::{
    testing::{text_partial, MockGenerateResult, MockLanguageModel, MockStreamResult},
    LanguageModel, LanguageModelError, LanguageModelInput, Message, ModelResponse, Part,
    StreamAccumulator,
};

fn user_input(text: &str) -> LanguageModelInput {
    LanguageModelInput {
        messages: vec![Message::user(text)],
        ..LanguageModelInput::default()
    }
}

#[tokio::test]
async fn mock_language_model_tracks_generate_inputs_and_returns_results() {
    let model = MockLanguageModel::new();

    let response = ModelResponse {
        content: vec![Part::text("Hello, world!")],
        ..ModelResponse::default()
    };

    model
        .enqueue_generate(response.clone())
        .enqueue_generate(MockGenerateResult::error(LanguageModelError::InvalidInput(
            "generate error".to_string(),
        )));

    let first = model
        .generate(user_input("Hi"))
        .await
        .expect("first generate should succeed");
    assert_eq!(first, response);

    let err = model
        .generate(user_input("Error"))
        .await
        .expect_err("second generate should error");
    assert!(matches!(err, LanguageModelError::InvalidInput(msg) if msg == "generate error"));

    let tracked = model.tracked_generate_inputs();
    assert_eq!(tracked.len(), 2);
    assert_eq!(tracked[0].messages, vec![Message::user("Hi")]);
    assert_eq!(tracked[1].messages, vec![Message::user("Error")]);

    let exhausted = model.generate(user_input("Again")).await;
    assert!(matches!(exhausted, Err(LanguageModelError::Invariant("mock", _))));
}

#[tokio::test]
async fn mock_language_model_streams_fragments_in_order() {
    let model = MockLanguageModel::new();
    model.enqueue_stream(MockStreamResult::fragments(["Our ", "lamp ", "is sold out."]));

    let mut stream = model
        .stream(user_input("Lamp?"))
        .await
        .expect("stream should open");

    let mut accumulator = StreamAccumulator::new();
    while let Some(partial) = stream.next().await {
        accumulator.add_partial(&partial.expect("partial should be ok"));
    }

    assert_eq!(accumulator.text(), "Our lamp is sold out.");
    assert_eq!(model.tracked_stream_inputs().len(), 1);
}

#[tokio::test]
async fn mock_language_model_fails_mid_stream() {
    let model = MockLanguageModel::new();
    model.enqueue_stream(MockStreamResult::interrupted(
        ["partial "],
        LanguageModelError::Invariant("mock", "connection reset".to_string()),
    ));

    let mut stream = model
        .stream(user_input("Hi"))
        .await
        .expect("stream should open");

    assert_eq!(
        stream.next().await.map(Result::ok),
        Some(Some(text_partial("partial ")))
    );
    assert!(matches!(stream.next().await, Some(Err(LanguageModelError::Invariant(_, _)))));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn mock_language_model_fails_to_open_stream() {
    let model = MockLanguageModel::new();
    model.enqueue_stream(MockStreamResult::error(LanguageModelError::Refusal(
        "blocked".to_string(),
    )));

    let result = model.stream(user_input("Hi")).await;
    assert!(matches!(result, Err(LanguageModelError::Refusal(_))));
}

#[tokio::test]
async fn mock_language_model_reset_and_restore() {
    let model = MockLanguageModel::new();
    model
        .enqueue_generate(MockGenerateResult::text("one"))
        .enqueue_generate(MockGenerateResult::text("two"));

    model.generate(user_input("a")).await.expect("generate");
    model.reset();
    assert!(model.tracked_generate_inputs().is_empty());

    let second = model.generate(user_input("b")).await.expect("generate");
    assert_eq!(second.text(), "two");

    model.enqueue_stream(MockStreamResult::fragments(["x"]));
    model.restore();
    assert!(model.tracked_generate_inputs().is_empty());
    assert!(model.stream(user_input("c")).await.is_err());
}
