//! Companion CLI
//!
//! Headless REPL driving the conversation client runtime against a running
//! assistant backend. Useful for development and for exercising the runtime
//! without the desktop shell.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the default backend (http://localhost:5000)
//! companion-cli
//!
//! # Against a different backend, with verbose logging
//! COMPANION_BACKEND_URL=http://localhost:8000 RUST_LOG=debug companion-cli
//! ```
//!
//! # Commands
//!
//! - `/new` - start a new conversation
//! - `/history` - list recent conversations
//! - `/load <id>` - load a stored conversation
//! - `/models` - list available models
//! - `/model <id>` - select a model
//! - `/email <to> <subject> <body...>` - send an email directly
//! - `/quit` - exit
//!
//! Anything else is sent as a message.
//!
//! # Environment Variables
//!
//! - `COMPANION_BACKEND_URL`: backend base URL (default `http://localhost:5000`)
//! - `COMPANION_MODEL`: default model identifier
//! - `COMPANION_PROBE_RETRIES` / `COMPANION_PROBE_DELAY_MS`: readiness probe
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use companion_core::modules::ModulePayload;
use companion_core::{
    load_config, to_html, ChatCoordinator, HttpBackend, MessageRole, ModuleDescriptor,
    ModuleLoader, UiUpdate,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("companion_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let config = load_config()?;
    info!(backend_url = %config.backend_url, model = %config.model, "Starting Companion CLI");

    let backend = HttpBackend::new(config.backend_url.clone());
    let features = config.features.clone();
    let (tx, mut rx) = mpsc::channel::<UiUpdate>(256);
    let mut coordinator = ChatCoordinator::new(backend, config, tx);

    // The surface: print updates as they arrive.
    let printer = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            match update {
                UiUpdate::MessageAppended { role, .. } => {
                    if role == MessageRole::User {
                        // The user already sees their own input line.
                        continue;
                    }
                }
                UiUpdate::ThinkingStarted { .. } => println!("  ..."),
                UiUpdate::Notify { level, message } => println!("  [{level:?}] {message}"),
                UiUpdate::ModelsLoaded { models } => {
                    for model in models {
                        println!("  model: {} ({})", model.name, model.id);
                    }
                }
                _ => {}
            }
        }
    });

    coordinator.start().await;
    print_last_assistant(&coordinator);

    // Optional modules load concurrently; a failed module never blocks the
    // rest of the client.
    let loader = ModuleLoader::new(coordinator.backend(), features);
    let descriptors = vec![
        ModuleDescriptor::new("email", || async {
            Ok(Arc::new(()) as ModulePayload)
        })
        .with_backend_endpoint("/features/email/status"),
        ModuleDescriptor::new("music_player", || async {
            Ok(Arc::new(()) as ModulePayload)
        })
        .with_backend_endpoint("/features/music/status")
        .with_show_error_to_user(false),
    ];
    let summary = loader.load_modules(&descriptors).await;
    info!(
        loaded = summary.loaded,
        failed = summary.failed,
        "Optional modules initialized"
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    println!("Type a message, or /quit to exit.");
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["/quit"] => break,
            ["/new"] => coordinator.new_conversation().await,
            ["/history"] => match coordinator.list_recent().await {
                Ok(conversations) => {
                    for conversation in conversations {
                        println!(
                            "  {}  {}  ({})",
                            conversation.id, conversation.title, conversation.updated_at
                        );
                    }
                }
                Err(error) => println!("  could not load history: {error}"),
            },
            ["/load", id] => {
                if let Err(error) = coordinator.load_conversation(id).await {
                    println!("  could not load conversation: {error}");
                }
            }
            ["/models"] => {
                if let Err(error) = coordinator.refresh_models().await {
                    println!("  could not load models: {error}");
                }
            }
            ["/model", id] => coordinator.select_model(id.to_string()).await,
            ["/email", to, subject, body @ ..] => {
                match coordinator.send_email(to, subject, &body.join(" ")).await {
                    Ok(()) => println!("  email sent"),
                    Err(error) => println!("  could not send email: {error}"),
                }
            }
            _ => {
                coordinator.send(&line).await;
                print_last_assistant(&coordinator);
            }
        }

        // Drive the ephemeral timers forward between inputs.
        coordinator.tick(Instant::now() + Duration::from_millis(1)).await;
    }

    drop(coordinator);
    let _ = printer.await;
    Ok(())
}

/// Print the latest assistant reply as HTML-free terminal text.
fn print_last_assistant<B: companion_core::AssistantBackend + 'static>(
    coordinator: &ChatCoordinator<B>,
) {
    if let Some(message) = coordinator
        .conversation()
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
    {
        println!("assistant: {}", message.raw_text);
        tracing::debug!(html = %to_html(&message.rendered), "Rendered reply");
    }
}
