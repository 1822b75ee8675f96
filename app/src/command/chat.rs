use std::io::Write;
use std::sync::Arc;

use crate::command::{
    CommandStrategy, build_completion_client, build_key_pool, build_session_store,
};
use warelay_config::Config;
use warelay_conversation::{CompletionClient, SessionStore};
use warelay_providers::KeyPool;

const CLI_USER: &str = "cli:default";

/// Input for the direct chat command.
pub struct ChatInput {
    /// Single message to send instead of an interactive session.
    pub message: Option<String>,
}

/// Strategy for talking to the assistant without the gateway pipeline.
pub struct ChatStrategy;

impl CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        let store = build_session_store(&config);
        let pool = Arc::new(build_key_pool(&config)?);
        let client = build_completion_client(&config);

        if let Some(message) = input.message {
            let reply = exchange(&store, &pool, &client, &message).await?;
            println!("{reply}");
            return Ok(());
        }

        run_interactive(&store, &pool, &client).await
    }
}

async fn exchange(
    store: &SessionStore,
    pool: &Arc<KeyPool>,
    client: &CompletionClient,
    message: &str,
) -> anyhow::Result<String> {
    let entry = store.get_or_create(CLI_USER).await;
    let provider = pool.provider_for(CLI_USER).await;
    let mut session = entry.lock().await;
    Ok(client.reply(provider.as_ref(), &mut session, message).await?)
}

async fn run_interactive(
    store: &SessionStore,
    pool: &Arc<KeyPool>,
    client: &CompletionClient,
) -> anyhow::Result<()> {
    println!("=== warelay chat ===");
    println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if matches!(line, "exit" | "quit" | "q") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match exchange(store, pool, client, line).await {
            Ok(reply) => println!("\n{reply}\n"),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    Ok(())
}
