use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use fitrag::config::AppConfig;
use fitrag::conversations::ConversationStore;
use fitrag::gateway::EmbeddingGateway;
use fitrag::gateway::GenerationGateway;
use fitrag::gateway::OllamaClient;
use fitrag::index::MemoryVectorIndex;
use fitrag::index::VectorIndex;
use fitrag::knowledge::KnowledgeBase;
use fitrag::models::MessageRole;
use fitrag::models::ServiceHealth;
use fitrag::rag::AnswerOptions;
use fitrag::rag::RagService;
use fitrag::rag::DEFAULT_TOP_K;
use fitrag::Result;

#[derive(Parser)]
#[command(name = "fitrag")]
#[command(about = "Fitness-coaching RAG assistant over a local Ollama backend")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file (defaults to config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive coaching conversation
    Chat {
        /// Continue an existing conversation
        #[arg(short = 'C', long)]
        conversation: Option<String>,
        /// Answer without knowledge-base retrieval
        #[arg(long)]
        no_rag: bool,
    },
    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        question: String,
        /// Record the turn in an existing conversation
        #[arg(short = 'C', long)]
        conversation: Option<String>,
        /// Answer without knowledge-base retrieval
        #[arg(long)]
        no_rag: bool,
        /// Number of passages to retrieve
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Search the knowledge base without generating an answer
    Search {
        /// Search query
        query: String,
        /// Number of results to return
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Ingest a document or a directory of documents
    Ingest {
        /// File or directory to ingest (.txt, .md, .pdf, .docx)
        path: PathBuf,
        /// Source name recorded with every chunk (defaults to the file name)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// List conversations, most recently updated first
    Conversations {
        /// Maximum number of conversations to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Delete a conversation
    Delete {
        /// Conversation id
        conversation_id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show knowledge base statistics
    Stats,
    /// Clear the entire knowledge base
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Check backend and knowledge base health
    Health,
    /// Show the resolved configuration
    Config,
}

/// Everything the commands need, constructed once and passed around
struct Services {
    store: Arc<ConversationStore>,
    knowledge: KnowledgeBase,
    rag: RagService,
    ollama: Arc<OllamaClient>,
}

impl Services {
    fn init(config: &AppConfig) -> Result<Self> {
        let ollama = Arc::new(OllamaClient::new(config)?);
        let embedding: Arc<dyn EmbeddingGateway> = ollama.clone();
        let generation: Arc<dyn GenerationGateway> = ollama.clone();

        let data_dir = Path::new(config.data_dir());
        let index: Arc<dyn VectorIndex> = if config.persist_enabled() {
            Arc::new(MemoryVectorIndex::with_path(
                config.collection_name(),
                data_dir.join("index.json"),
            )?)
        } else {
            Arc::new(MemoryVectorIndex::new(config.collection_name()))
        };

        let store = Arc::new(if config.persist_enabled() {
            ConversationStore::with_dir(data_dir.join("conversations"))?
        } else {
            ConversationStore::new()
        });

        let knowledge = KnowledgeBase::new(embedding.clone(), index.clone(), config)?;
        let rag = RagService::new(embedding, generation, index, store.clone(), config);

        Ok(Self {
            store,
            knowledge,
            rag,
            ollama,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };
    fitrag::logging::init_logging(Some(&config), cli.verbose)?;

    let services = Services::init(&config)?;

    match cli.command {
        Commands::Chat {
            conversation,
            no_rag,
        } => handle_chat(&services, &config, conversation, no_rag).await,
        Commands::Ask {
            question,
            conversation,
            no_rag,
            top_k,
        } => handle_ask(&services, &question, conversation.as_deref(), no_rag, top_k).await,
        Commands::Search { query, top_k } => handle_search(&services, &query, top_k).await,
        Commands::Ingest { path, source } => handle_ingest(&services, &path, source).await,
        Commands::Conversations { limit } => {
            handle_conversations(&services, limit);
            Ok(())
        }
        Commands::Delete {
            conversation_id,
            force,
        } => {
            handle_delete(&services, &conversation_id, force);
            Ok(())
        }
        Commands::Stats => handle_stats(&services).await,
        Commands::Clear { force } => handle_clear(&services, force).await,
        Commands::Health => handle_health(&services).await,
        Commands::Config => handle_config(&config),
    }
}

async fn handle_chat(
    services: &Services,
    config: &AppConfig,
    conversation: Option<String>,
    no_rag: bool,
) -> Result<()> {
    let mut current_id = match conversation {
        Some(id) => {
            let existing = services.store.get(&id).ok_or_else(|| {
                fitrag::FitragError::ConversationNotFound(id.clone())
            })?;
            println!("Continuing conversation: {}", existing.title);
            Some(id)
        }
        None => None,
    };

    println!("💪 fitrag coach - ask about training, nutrition, or recovery");
    println!("Type 'quit' to exit, 'history' to review this conversation\n");

    let options = AnswerOptions {
        use_rag: !no_rag,
        top_k: config.top_k(),
    };

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();

        match input {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "history" => {
                print_history(services, current_id.as_deref());
                continue;
            }
            _ => {}
        }

        match services
            .rag
            .answer_with_options(input, current_id.as_deref(), &options)
            .await
        {
            Ok(reply) => {
                current_id = Some(reply.conversation_id.clone());
                println!("\ncoach> {}\n", reply.answer);
                if !reply.sources.is_empty() {
                    println!("Sources:");
                    for (idx, source) in reply.sources.iter().enumerate() {
                        println!(
                            "  {}. {} (relevance: {:.0}%)",
                            idx + 1,
                            source.source,
                            source.score * 100.0
                        );
                    }
                    println!();
                }
            }
            Err(e) => eprintln!("✗ {e}"),
        }
    }

    println!("Keep training! 💪");
    Ok(())
}

fn print_history(services: &Services, conversation_id: Option<&str>) {
    let Some(id) = conversation_id else {
        println!("No messages yet");
        return;
    };
    match services.store.history(id) {
        Ok(messages) if !messages.is_empty() => {
            for message in messages {
                let label = match message.role {
                    MessageRole::User => "you",
                    MessageRole::Assistant => "coach",
                };
                println!("{label}> {}", message.content);
            }
        }
        _ => println!("No messages yet"),
    }
}

async fn handle_ask(
    services: &Services,
    question: &str,
    conversation: Option<&str>,
    no_rag: bool,
    top_k: usize,
) -> Result<()> {
    let options = AnswerOptions {
        use_rag: !no_rag,
        top_k,
    };
    let reply = services
        .rag
        .answer_with_options(question, conversation, &options)
        .await?;

    println!("{}\n", reply.answer);
    if !reply.sources.is_empty() {
        println!("Sources:");
        for (idx, source) in reply.sources.iter().enumerate() {
            println!(
                "  {}. {} (relevance: {:.0}%)",
                idx + 1,
                source.source,
                source.score * 100.0
            );
        }
    }
    println!("\nConversation: {}", reply.conversation_id);
    Ok(())
}

async fn handle_search(services: &Services, query: &str, top_k: usize) -> Result<()> {
    let results = services.rag.retriever().retrieve(query, top_k).await?;

    if results.is_empty() {
        println!("No matching passages");
        return Ok(());
    }

    println!("Results for \"{query}\":\n");
    for (idx, result) in results.iter().enumerate() {
        println!(
            "{}. {} (relevance: {:.0}%)",
            idx + 1,
            result.source,
            result.score * 100.0
        );
        println!("   {}\n", preview(&result.content, 200));
    }
    Ok(())
}

async fn handle_ingest(services: &Services, path: &Path, source: Option<String>) -> Result<()> {
    if !path.exists() {
        eprintln!("✗ Path does not exist: {}", path.display());
        return Ok(());
    }

    if path.is_dir() {
        let metadata = HashMap::from([(
            "category".to_string(),
            "fitness_knowledge".to_string(),
        )]);
        let report = services.knowledge.ingest_dir(path, &metadata).await?;
        println!(
            "✓ Ingested {} documents ({} failed), {} chunks total",
            report.succeeded, report.failed, report.total_chunks
        );
    } else {
        let mut metadata = HashMap::from([(
            "category".to_string(),
            "fitness_knowledge".to_string(),
        )]);
        if let Some(source) = source {
            metadata.insert("source_name".to_string(), source);
        }
        match services.knowledge.ingest_file(path, &metadata).await {
            Ok(chunks) => println!("✓ Ingested {} ({chunks} chunks)", path.display()),
            Err(e) => eprintln!("✗ Failed to ingest {}: {e}", path.display()),
        }
    }
    Ok(())
}

fn handle_conversations(services: &Services, limit: usize) {
    let conversations = services.store.list(limit);
    if conversations.is_empty() {
        println!("No conversations");
        return;
    }

    println!("Found {} conversation(s):", conversations.len());
    for summary in conversations {
        println!(
            "  {} | {} | {} messages | updated {}",
            &summary.id[..8.min(summary.id.len())],
            summary.title,
            summary.message_count,
            summary.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn handle_delete(services: &Services, conversation_id: &str, force: bool) {
    if !force && !confirm(&format!("Delete conversation {conversation_id}?")) {
        println!("Cancelled");
        return;
    }

    if services.store.delete(conversation_id) {
        println!("✓ Conversation deleted");
    } else {
        println!("✗ Conversation not found");
    }
}

async fn handle_stats(services: &Services) -> Result<()> {
    let stats = services.knowledge.stats().await?;
    println!("Knowledge base statistics:");
    println!("  Documents:       {}", stats.total_documents);
    println!("  Chunks:          {}", stats.total_chunks);
    println!("  Collection:      {}", stats.collection_name);
    println!("  Embedding model: {}", stats.embedding_model);
    Ok(())
}

async fn handle_clear(services: &Services, force: bool) -> Result<()> {
    if !force && !confirm("Clear the entire knowledge base? This cannot be undone.") {
        println!("Cancelled");
        return Ok(());
    }

    services.knowledge.clear().await?;
    println!("✓ Knowledge base cleared");
    Ok(())
}

async fn handle_health(services: &Services) -> Result<()> {
    let embedding = EmbeddingGateway::health(services.ollama.as_ref()).await;
    let generation = GenerationGateway::health(services.ollama.as_ref()).await;

    print_health("Embedding model", &embedding);
    print_health("LLM model", &generation);

    match services.knowledge.stats().await {
        Ok(stats) => println!("✓ Vector index: {} chunks", stats.total_chunks),
        Err(e) => println!("✗ Vector index: {e}"),
    }
    Ok(())
}

fn print_health(label: &str, health: &ServiceHealth) {
    if health.ok() {
        println!("✓ {label}: {}", health.detail);
    } else {
        println!("✗ {label}: {}", health.detail);
    }
}

fn handle_config(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| fitrag::FitragError::Config(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
