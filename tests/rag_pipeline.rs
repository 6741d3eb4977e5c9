//! End-to-end tests of the answer path with fake model gateways

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::embed_text;
use common::FailingEmbedding;
use common::FailingGeneration;
use common::FakeEmbedding;
use common::FakeGeneration;
use fitrag::config::AppConfig;
use fitrag::conversations::ConversationStore;
use fitrag::errors::FitragError;
use fitrag::gateway::EmbeddingGateway;
use fitrag::gateway::GenerationGateway;
use fitrag::index::MemoryVectorIndex;
use fitrag::index::VectorIndex;
use fitrag::models::MessageRole;
use fitrag::rag::AnswerOptions;
use fitrag::rag::RagService;
use fitrag::rag::Retriever;
use fitrag::Result;

async fn seeded_index() -> Arc<MemoryVectorIndex> {
    let index = Arc::new(MemoryVectorIndex::new("fitness_knowledge"));
    let passages = [
        ("strength.md", "Squats and deadlifts build whole-body strength."),
        ("nutrition.md", "Protein supports muscle recovery after training."),
        ("cardio.md", "Zone two cardio improves aerobic capacity."),
        ("sleep.md", "Sleep is when adaptation actually happens."),
    ];
    for (idx, (source, text)) in passages.iter().enumerate() {
        let metadata = HashMap::from([("source_name".to_string(), (*source).to_string())]);
        index
            .upsert(&format!("chunk-{idx}"), embed_text(text), text, metadata)
            .await
            .unwrap();
    }
    index
}

fn make_service(
    embedding: Arc<dyn EmbeddingGateway>,
    generation: Arc<dyn GenerationGateway>,
    index: Arc<MemoryVectorIndex>,
    store: Arc<ConversationStore>,
) -> RagService {
    let config = AppConfig::default();
    RagService::new(embedding, generation, index, store, &config)
}

#[tokio::test]
async fn test_answer_records_turn_and_cites_sources() -> Result<()> {
    let store = Arc::new(ConversationStore::new());
    let generation = Arc::new(FakeGeneration::new("Train three times a week."));
    let service = make_service(
        Arc::new(FakeEmbedding),
        generation,
        seeded_index().await,
        store.clone(),
    );

    let reply = service.answer("How should I build strength?", None).await?;

    assert_eq!(reply.answer, "Train three times a week.");
    assert!(!reply.sources.is_empty());
    assert!(reply.sources.len() <= 3);

    let history = store.history(&reply.conversation_id)?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "How should I build strength?");
    assert!(history[0].sources.is_empty());
    assert_eq!(history[1].role, MessageRole::Assistant);
    assert_eq!(history[1].sources.len(), reply.sources.len());
    Ok(())
}

#[tokio::test]
async fn test_no_rag_mode_yields_empty_sources_every_turn() -> Result<()> {
    let store = Arc::new(ConversationStore::new());
    let service = make_service(
        Arc::new(FakeEmbedding),
        Arc::new(FakeGeneration::new("General advice.")),
        seeded_index().await,
        store.clone(),
    );

    let options = AnswerOptions {
        use_rag: false,
        top_k: 5,
    };
    let first = service
        .answer_with_options("How do I squat?", None, &options)
        .await?;
    let second = service
        .answer_with_options("And deadlift?", Some(&first.conversation_id), &options)
        .await?;

    assert!(first.sources.is_empty());
    assert!(second.sources.is_empty());
    for message in store.history(&first.conversation_id)? {
        assert!(message.sources.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_retrieval_failure_degrades_to_answer_without_references() -> Result<()> {
    let store = Arc::new(ConversationStore::new());
    let service = make_service(
        Arc::new(FailingEmbedding),
        Arc::new(FakeGeneration::new("Still here to help.")),
        seeded_index().await,
        store.clone(),
    );

    let reply = service.answer("How much protein?", None).await?;

    assert_eq!(reply.answer, "Still here to help.");
    assert!(reply.sources.is_empty());
    assert_eq!(store.history(&reply.conversation_id)?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_generation_failure_leaves_conversation_untouched() {
    let store = Arc::new(ConversationStore::new());
    let conversation = store.create(None);
    let service = make_service(
        Arc::new(FakeEmbedding),
        Arc::new(FailingGeneration),
        seeded_index().await,
        store.clone(),
    );

    let err = service
        .answer("How much protein?", Some(&conversation.id))
        .await
        .unwrap_err();

    assert!(matches!(err, FitragError::Generation(_)));
    assert!(store.history(&conversation.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_conversation_is_rejected_before_any_backend_call() {
    let store = Arc::new(ConversationStore::new());
    let generation = Arc::new(FakeGeneration::new("unused"));
    let service = make_service(
        Arc::new(FakeEmbedding),
        generation.clone(),
        seeded_index().await,
        store,
    );

    let err = service
        .answer("Hello?", Some("no-such-conversation"))
        .await
        .unwrap_err();

    assert!(matches!(err, FitragError::ConversationNotFound(_)));
    assert!(generation.prompts().is_empty());
}

#[tokio::test]
async fn test_second_turn_prompt_contains_first_turn_verbatim() -> Result<()> {
    let store = Arc::new(ConversationStore::new());
    let generation = Arc::new(FakeGeneration::new("Aim for 1.6 g per kg daily."));
    let service = make_service(
        Arc::new(FakeEmbedding),
        generation.clone(),
        seeded_index().await,
        store,
    );

    let first = service.answer("How much protein do I need?", None).await?;
    service
        .answer("Does timing matter?", Some(&first.conversation_id))
        .await?;

    let prompts = generation.prompts();
    assert_eq!(prompts.len(), 2);
    // the first turn must not see itself in the history section
    assert!(!prompts[0].contains("Previous conversation:"));
    assert!(prompts[1].contains("User: How much protein do I need?"));
    assert!(prompts[1].contains("Coach: Aim for 1.6 g per kg daily."));
    Ok(())
}

#[tokio::test]
async fn test_retriever_on_empty_index_returns_empty() -> Result<()> {
    let index = Arc::new(MemoryVectorIndex::new("fitness_knowledge"));
    let retriever = Retriever::new(Arc::new(FakeEmbedding), index, 0.0);

    let results = retriever.retrieve("anything", 5).await?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_retriever_caps_and_sorts_results() -> Result<()> {
    let index = seeded_index().await;
    let retriever = Retriever::new(Arc::new(FakeEmbedding), index, 0.0);

    let results = retriever
        .retrieve("protein for muscle recovery", 3)
        .await?;

    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(results[0].source, "nutrition.md");
    Ok(())
}

#[tokio::test]
async fn test_retriever_rejects_zero_top_k() {
    let index = seeded_index().await;
    let retriever = Retriever::new(Arc::new(FakeEmbedding), index, 0.0);

    assert!(retriever.retrieve("anything", 0).await.is_err());
}

#[tokio::test]
async fn test_min_score_floor_filters_weak_matches() -> Result<()> {
    let index = seeded_index().await;
    // an impossible floor filters every passage without raising an error
    let retriever = Retriever::new(Arc::new(FakeEmbedding), index, 1.1);

    let results = retriever.retrieve("squats", 5).await?;
    assert!(results.is_empty());
    Ok(())
}
