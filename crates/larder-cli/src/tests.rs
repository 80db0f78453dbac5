//! Snapshot and session tests for the console

#[cfg(test)]
mod snapshot_tests {
    use crate::MenuChoice;
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_menu_operations_snapshot() {
        let operations: Vec<_> = ["1", "2", "3", "help", "q"]
            .iter()
            .filter_map(|input| MenuChoice::parse(input))
            .map(|choice| choice.operation())
            .collect();

        assert_yaml_snapshot!(operations, @r###"
        - upload documents
        - vectorize and index corpus
        - query
        - help
        - quit
        "###);
    }
}

#[cfg(test)]
mod session_tests {
    use crate::Session;
    use async_trait::async_trait;
    use larder_core::{
        ChatCompletion, EmbeddingProvider, EmbeddingVector, GenerationProvider, GenerationRequest,
        Result, TokenUsage,
    };
    use larder_rag::{MemoryDocumentStore, RagConfig, RagPipeline, StoreBackend, SystemInstruction};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Two-axis embedding: soup-ness and bread-ness
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
            let text = text.to_lowercase();
            let soup = if text.contains("soup") { 1.0 } else { 0.1 };
            let bread = if text.contains("bread") { 1.0 } else { 0.1 };
            Ok(EmbeddingVector::new(vec![soup, bread]))
        }

        fn model_id(&self) -> &str {
            "keyword"
        }
    }

    /// Echoes the best-matching recipe name it was shown
    struct EchoGenerator;

    #[async_trait]
    impl GenerationProvider for EchoGenerator {
        async fn complete(&self, request: &GenerationRequest) -> Result<ChatCompletion> {
            let context = &request.messages[0].content;
            let text = ["Tomato Soup", "Banana Bread"]
                .iter()
                .filter_map(|name| context.find(name).map(|pos| (pos, *name)))
                .min()
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| "I don't know.".to_string());

            Ok(ChatCompletion {
                choices: vec![text],
                usage: TokenUsage {
                    prompt_tokens: 120,
                    completion_tokens: 4,
                },
            })
        }

        fn model_id(&self) -> &str {
            "echo"
        }
    }

    fn pipeline(store: Arc<MemoryDocumentStore>) -> RagPipeline {
        let mut config = RagConfig {
            store: StoreBackend::Memory,
            ..RagConfig::default()
        };
        config.retry = config.retry.with_base_delay(Duration::ZERO);

        RagPipeline::new(
            &config,
            store,
            Arc::new(KeywordEmbedder),
            2,
            Arc::new(EchoGenerator),
            SystemInstruction::default(),
            8191,
        )
    }

    fn corpus_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("recipes.json"),
            r#"[
                {"name": "Tomato Soup", "ingredients": ["tomatoes", "stock"]},
                {"name": "Banana Bread", "ingredients": ["bananas", "flour"]},
                {"ingredients": ["nameless"]}
            ]"#,
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_upload_vectorize_and_ask() {
        let dir = corpus_dir();
        let store = Arc::new(MemoryDocumentStore::new());
        let pipeline = pipeline(store);
        let session = Session::new(&pipeline, dir.path());

        let uploaded = session.upload().await.unwrap();
        assert_eq!(uploaded.report.upserted, 2);
        assert_eq!(uploaded.report.failures.len(), 1);
        assert!(uploaded.unreadable.is_empty());

        let vectorized = session.vectorize().await.unwrap();
        assert_eq!(vectorized.upserted, 2);

        let answer = session.ask("how do I make banana bread").await.unwrap();
        assert_eq!(answer.text, "Banana Bread");
        assert_eq!(answer.prompt_tokens, 120);
        assert_eq!(answer.response_tokens, 4);
    }

    #[tokio::test]
    async fn test_menu_loop_dispatches_until_quit() {
        let dir = corpus_dir();
        let store = Arc::new(MemoryDocumentStore::new());
        let pipeline = pipeline(store);
        let session = Session::new(&pipeline, dir.path());

        let mut input = Cursor::new("help\n1\n2\n3\nhow do I make tomato soup\n\nbogus\nq\n1\n");
        session.run(&mut input).await.unwrap();

        assert_eq!(pipeline.document_count().await.unwrap(), 2);
        // the trailing upload after `q` is never read
        assert_eq!(input.position() as usize, input.get_ref().len() - 2);
    }

    #[tokio::test]
    async fn test_menu_loop_survives_failures_and_ends_at_eof() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryDocumentStore::new());
        let pipeline = pipeline(store);
        let session = Session::new(&pipeline, dir.path().join("missing"));

        let mut input = Cursor::new("1\n3\nanything\n");
        session.run(&mut input).await.unwrap();

        assert_eq!(pipeline.document_count().await.unwrap(), 0);
    }
}
