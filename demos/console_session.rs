//! Console session example
//!
//! Usage:
//!   AGENT_CONSOLE_API_BASE_URL=http://localhost:8000 \
//!   CONSOLE_EMAIL=owner@acme.com CONSOLE_PASSWORD=supersecret \
//!   cargo run --example console_session

use agent_console_client::{logging, resolve_ui_error_message, AppContainer, ClientConfig, LoginInput};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("AGENT_CONSOLE_CONFIG").ok();
    let config = ClientConfig::load(config_path.as_deref())?;
    logging::init(&config.log_filter)?;

    println!("=== Agent Console Client Example ===");
    println!("Backend: {}", config.api_base_url);
    println!();

    let app = AppContainer::new(&config)?;

    if app.auth.bootstrap_session().await? {
        println!("✓ Session restored");
    } else {
        let email = std::env::var("CONSOLE_EMAIL").unwrap_or_else(|_| "owner@acme.com".to_string());
        let password = std::env::var("CONSOLE_PASSWORD").unwrap_or_default();

        println!("Logging in as {}...", email);
        if let Err(e) = app.auth.login(&LoginInput { email, password }).await {
            println!("! Login failed: {}", resolve_ui_error_message(&[&e]).unwrap_or_default());
            return Ok(());
        }
        println!("✓ Logged in");
    }
    println!();

    match app.onboarding.get_connection_status().await {
        Ok(connection) => println!("WhatsApp connection: {:?}", connection.status),
        Err(e) => println!("! {}", resolve_ui_error_message(&[&e]).unwrap_or_default()),
    }

    match app.conversations.list_conversations().await {
        Ok(conversations) => {
            println!("Conversations ({}):", conversations.len());
            for conversation in conversations {
                println!(
                    "  - {} [{:?}] {}",
                    conversation.whatsapp_user_id,
                    conversation.control_mode,
                    conversation.last_message_preview.as_deref().unwrap_or("")
                );
            }
        }
        Err(e) => println!("! {}", resolve_ui_error_message(&[&e]).unwrap_or_default()),
    }
    println!();

    app.auth.logout().await?;
    println!("Done!");

    Ok(())
}
