use anyhow::{Context, bail};
use aria::{
    AccessControl, AppState, AriaConfig, ConversationMemory, DatabaseProvider, TelegramClient,
    bot,
    cli::{Cli, Commands, HistoryCommands, output::Output},
    utils::LogFormat,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose info-level chatter drowns out the bot's own logs
const QUIET_CRATES: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls", "libsql"];

fn init_tracing(config: &AriaConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { config.logging.level.as_str() };
        let mut directives = level.to_string();
        for krate in QUIET_CRATES {
            directives.push_str(&format!(",{}=warn", krate));
        }
        EnvFilter::new(directives)
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

async fn open_memory(config: &AriaConfig) -> anyhow::Result<ConversationMemory> {
    let provider = DatabaseProvider::from_path(
        &config.memory.database_path,
        config.memory.turso_auth_token.as_deref(),
    )?;
    let store = provider
        .create_client()
        .await
        .context("Failed to open the conversation database")?;

    Ok(ConversationMemory::new(
        Arc::from(store),
        config.memory.max_history,
    )?)
}

async fn run_bot(config: AriaConfig) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = ?config.model.provider,
        model = %config.model.model_name(),
        database = %config.memory.database_path,
        "Starting Aria"
    );

    let memory = open_memory(&config).await?;

    let provider = config.provider()?;
    let llm = provider
        .create_client()
        .await
        .with_context(|| format!("Failed to create {} client", provider.name()))?;

    let token = config
        .telegram
        .bot_token
        .clone()
        .context("Telegram bot token is not set")?;
    let telegram = Arc::new(
        TelegramClient::new(token)
            .with_api_base(config.telegram.api_base.clone())
            .with_polling_timeout(config.telegram.polling_timeout_secs)
            .with_download_timeout(Duration::from_secs(config.media.download_timeout_secs)),
    );

    let state = AppState {
        access: Arc::new(AccessControl::new(config.allowed_user_ids())),
        config: Arc::new(config),
        memory: Arc::new(memory),
        llm: Arc::from(llm),
        transport: telegram.clone(),
    };

    bot::run(state, &telegram).await?;
    Ok(())
}

fn show_config(config: &AriaConfig, validate: bool, output: &Output) -> anyhow::Result<()> {
    output.header("Configuration");
    output.block(&config.to_redacted_toml()?);

    output.header("Secrets");
    let status = |set: bool| if set { "set" } else { "not set" };
    output.kv(
        &config.telegram.bot_token_env,
        status(config.telegram.bot_token.is_some()),
    );
    output.kv(
        &config.model.api_key_env,
        status(config.model.api_key.is_some()),
    );
    output.newline();

    if validate {
        match config.validate() {
            Ok(()) => output.success("Configuration is valid"),
            Err(e) => {
                output.error(&e.to_string());
                bail!("configuration is invalid");
            }
        }
    }

    Ok(())
}

async fn history_command(
    config: &AriaConfig,
    command: HistoryCommands,
    output: &Output,
) -> anyhow::Result<()> {
    let memory = open_memory(config).await?;

    match command {
        HistoryCommands::Show { user_id } => {
            let entries = memory.get_history(&user_id).await?;
            output.header(&format!("History for user {}", user_id));
            if entries.is_empty() {
                output.info("No stored entries");
            }
            for (i, entry) in entries.iter().enumerate() {
                output.history_entry(i + 1, entry);
            }
            output.newline();
            output.kv(
                "entries",
                &format!("{} of max {}", entries.len(), memory.max_history()),
            );
        }
        HistoryCommands::Clear { user_id, yes } => {
            if !yes
                && !output.confirm(&format!("Delete all stored history for user {}?", user_id))
            {
                output.warning("Aborted");
                return Ok(());
            }
            let removed = memory.clear(&user_id).await?;
            output.success(&format!("Removed {} entries for user {}", removed, user_id));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables take precedence
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = match AriaConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Settings come from aria.toml (optional) and environment variables:");
            output.command("TELEGRAM_BOT_TOKEN=... aria-bot");
            return Err(e.into());
        }
    };

    match cli.resolved_command() {
        Commands::Run => {
            if !cli.no_color && config.logging.format == LogFormat::Pretty {
                output.banner();
            }
            init_tracing(&config, cli.verbose);
            run_bot(config).await
        }
        Commands::Config { validate } => show_config(&config, validate, &output),
        Commands::History(command) => history_command(&config, command, &output).await,
    }
}
