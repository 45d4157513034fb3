use std::sync::Arc;

use ledgerbank::api::{self, AppState};
use ledgerbank::auth::{JwtMaker, TokenMaker};
use ledgerbank::config::AppConfig;
use ledgerbank::db::Database;

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn get_port_override() -> Option<u16> {
    get_arg(&["--port"]).and_then(|p| p.parse().ok())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.server.port = port;
    }

    let token_maker: Arc<dyn TokenMaker> =
        Arc::new(JwtMaker::new(&app_config.token.symmetric_key)?);

    // Mint a token for local use and exit
    if let Some(username) = get_arg(&["--issue-token"]) {
        let (token, payload) =
            token_maker.create_token(&username, app_config.access_token_duration())?;
        println!("{}", token);
        eprintln!("expires at {}", payload.expired_at);
        return Ok(());
    }

    let _log_guard = ledgerbank::logging::init_logging(&app_config);
    tracing::info!(env = %env, version = env!("GIT_HASH"), "Starting ledgerbank");

    let db = Database::connect(&app_config.database).await?;
    db.health_check().await?;

    let state = Arc::new(AppState::new(
        db.store(),
        token_maker,
        app_config.transfer_timeout(),
    ));

    api::run_server(&app_config.server_addr(), state).await
}
