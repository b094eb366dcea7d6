//! Mock Provider Tests
//!
//! Tests using mockall for the Provider trait to verify that it can be mocked
//! and used behind a `Box<dyn Provider>`.

use async_trait::async_trait;
use autocoder_provider::{
    Completion, Decoding, GenerateOptions, GenerateParams, Provider, ProviderError,
};
use mockall::mock;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn generate(&self, params: GenerateParams) -> Result<Completion, ProviderError>;
        fn default_model(&self) -> String;
        async fn ping(&self) -> Result<(), ProviderError>;
    }
}

#[tokio::test]
async fn test_mock_provider_generate_returns_success() {
    let mut mock = MockProvider::new();

    mock.expect_generate()
        .times(1)
        .returning(|_| Ok(Completion::text("MESSAGE:\nhello\nDONE")));

    let completion = mock.generate(GenerateParams::default()).await.unwrap();
    assert_eq!(completion.text, "MESSAGE:\nhello\nDONE");
}

#[tokio::test]
async fn test_mock_provider_generate_returns_error() {
    let mut mock = MockProvider::new();

    mock.expect_generate()
        .times(1)
        .returning(|_| Err(ProviderError::Api("model not loaded".to_string())));

    match mock.generate(GenerateParams::default()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "model not loaded"),
        _ => panic!("Expected Api error"),
    }
}

#[tokio::test]
async fn test_mock_provider_receives_options() {
    let mut mock = MockProvider::new();

    mock.expect_generate()
        .times(1)
        .withf(|params| {
            params.prompt.starts_with("SYSTEM:")
                && params.options.decoding == Decoding::Greedy
                && params.options.max_tokens == 64
        })
        .returning(|_| Ok(Completion::text("DONE")));

    let params = GenerateParams::new(
        "SYSTEM:\nbe brief",
        GenerateOptions {
            max_tokens: 64,
            decoding: Decoding::Greedy,
            ..Default::default()
        },
    );
    assert_eq!(mock.generate(params).await.unwrap().text, "DONE");
}

#[tokio::test]
async fn test_boxed_provider_delegates() {
    let mut mock = MockProvider::new();
    mock.expect_generate()
        .times(2)
        .returning(|params| Ok(Completion::text(format!("echo: {}", params.prompt))));
    mock.expect_default_model()
        .returning(|| "mock-model".to_string());
    mock.expect_ping().times(1).returning(|| Ok(()));

    let boxed: Box<dyn Provider> = Box::new(mock);

    assert_eq!(boxed.default_model(), "mock-model");
    boxed.ping().await.unwrap();
    for i in 0..2 {
        let completion = boxed
            .generate(GenerateParams::new(format!("turn {}", i), GenerateOptions::default()))
            .await
            .unwrap();
        assert_eq!(completion.text, format!("echo: turn {}", i));
    }
}

#[tokio::test]
async fn test_mock_provider_ping_failure() {
    let mut mock = MockProvider::new();
    mock.expect_ping()
        .times(1)
        .returning(|| Err(ProviderError::InvalidResponse));

    assert!(matches!(
        mock.ping().await,
        Err(ProviderError::InvalidResponse)
    ));
}
