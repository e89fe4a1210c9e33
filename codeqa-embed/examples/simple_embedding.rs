//! Embeds a few code snippets and prints how close each is to a query.
//!
//! Uses the local fastembed model by default; pass `--hashing` to run offline.

use codeqa_embed::{EmbedConfig, EmbeddingClient, ProviderKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let offline = std::env::args().any(|arg| arg == "--hashing");
    let config = if offline {
        EmbedConfig::hashing()
    } else {
        EmbedConfig::default().with_provider(ProviderKind::FastEmbed)
    }
    .with_max_concurrency(2)
    .with_cache_embeddings(true);

    println!("📝 Provider: {} ({})", config.provider, config.model_name);
    let client = EmbeddingClient::from_config(&config)?;

    let snippets = vec![
        "function authenticateUser(user, password) { return checkPassword(user, password); }"
            .to_string(),
        "function renderButton(label) { return `<button>${label}</button>`; }".to_string(),
        "def parse_config(path):\n    return toml.load(path)".to_string(),
    ];
    let query = "how does login work?";

    let embeddings = client.embed(&snippets).await?;
    let query_embedding = client.embed_one(query).await?;

    println!("   Dimension: {}", query_embedding.len());
    println!("\n🔍 Similarity to \"{query}\":");
    for (snippet, embedding) in snippets.iter().zip(&embeddings) {
        // Vectors are unit length, so the dot product is the cosine
        let score: f32 = embedding
            .iter()
            .zip(&query_embedding)
            .map(|(a, b)| a * b)
            .sum();
        let first_line = snippet.lines().next().unwrap_or_default();
        println!("   {score:.3}  {first_line}");
    }

    // Second pass is served from the cache
    client.embed(&snippets).await?;
    if let Some(cache) = client.cache() {
        let stats = cache.stats();
        println!("\n💾 Cache: {} entries, {} hits, {} misses", stats.entries, stats.hits, stats.misses);
    }
    Ok(())
}
