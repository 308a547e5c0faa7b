//! Key Shop - Main Application Entry Point
//!
//! A chat storefront for time-limited access keys. The core is
//! transport agnostic; this binary wires it to a console gateway that
//! reads events from stdin and prints replies, useful for local runs
//! without a chat network.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the command router
//! 5. Read events from stdin until EOF
//!
//! # Line Grammar
//!
//! ```text
//! <id> /command [args]     slash command
//! <id> @sel <selector>     menu button press
//! <id> @photo <handle>     photo upload
//! <id> <anything else>     free text
//! ```

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use keyshop::config::Config;
use keyshop::db;
use keyshop::error::ShopError;
use keyshop::models::user::PrincipalId;
use keyshop::router::Router;
use keyshop::shop::Shop;
use keyshop::transport::{AttachmentRef, Event, Notifier, Reply};

/// Outbound pushes go straight to stdout.
struct ConsoleNotifier;

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, to: PrincipalId, text: &str) -> Result<(), ShopError> {
        println!("[push -> {to}]\n{text}\n");
        Ok(())
    }

    async fn forward_attachment(
        &self,
        from: PrincipalId,
        to: PrincipalId,
        attachment: &AttachmentRef,
        caption: &str,
    ) -> Result<(), ShopError> {
        println!("[photo {} from {from} -> {to}]\n{caption}\n", attachment.0);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let shop = Arc::new(Shop::new(pool, config, Arc::new(ConsoleNotifier)));
    let router = Router::new(shop);

    tracing::info!("Console gateway ready; type '<principal-id> <message>'");

    // One event per line until stdin closes
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(event) = parse_line(&line) else {
            if !line.trim().is_empty() {
                eprintln!(
                    "usage: <id> /command [args] | <id> @sel <selector> | <id> @photo <handle> | <id> <text>"
                );
            }
            continue;
        };

        let reply = router.dispatch(event).await;
        render(&reply);
    }

    Ok(())
}

/// Parse one console line into an event. `None` means empty or
/// unparseable.
fn parse_line(line: &str) -> Option<Event> {
    let line = line.trim();
    let (id_raw, rest) = line.split_once(char::is_whitespace)?;
    let from = PrincipalId(id_raw.parse().ok()?);
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    if let Some(select) = rest.strip_prefix("@sel ") {
        return Some(Event::Selection {
            from,
            handle: None,
            select: select.trim().to_string(),
        });
    }
    if let Some(photo) = rest.strip_prefix("@photo ") {
        return Some(Event::Photo {
            from,
            handle: None,
            attachment: AttachmentRef(photo.trim().to_string()),
        });
    }
    if let Some(command) = rest.strip_prefix('/') {
        let (name, args) = match command.split_once(char::is_whitespace) {
            Some((name, args)) => (name.to_string(), args.trim().to_string()),
            None => (command.to_string(), String::new()),
        };
        return Some(Event::Command {
            from,
            handle: None,
            name,
            args,
        });
    }

    Some(Event::Text {
        from,
        handle: None,
        text: rest.to_string(),
    })
}

/// Print a reply the way a chat client would lay it out.
fn render(reply: &Reply) {
    println!("{}", reply.text);
    if let Some(attachment) = &reply.attachment {
        println!("[attachment: {}]", attachment.0);
    }
    for row in &reply.menu {
        let cells = row
            .iter()
            .map(|choice| format!("[{} -> {}]", choice.label, choice.select))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {cells}");
    }
    println!();
}
