use std::env;
use tempfile::TempDir;
use teacherspet::Settings;
use teacherspet::config::EmbeddingBackend;

#[test]
fn test_env_override() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        "[retrieval]\ntop_k = 3\n\n[validation]\nmax_tokens = 12\n",
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels; single underscores stay
        env::set_var("TP_RETRIEVAL__TOP_K", "8");
        env::set_var("TP_EMBEDDING__PROVIDER", "openai");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("TP_RETRIEVAL__TOP_K");
        env::remove_var("TP_EMBEDDING__PROVIDER");
    }

    // Environment variable overrides the file
    assert_eq!(settings.retrieval.top_k, 8);
    assert_eq!(settings.embedding.provider, EmbeddingBackend::OpenAi);
    // File value stays when no env var is set
    assert_eq!(settings.validation.max_tokens, 12);
    // Defaults fill the rest
    assert_eq!(settings.chunking.chunk_overlap, 200);
}
