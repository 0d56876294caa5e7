use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use serenity::{model::gateway::GatewayIntents, Client};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};
use dotenvy::dotenv;

mod command;
mod config;
mod db;
mod greeting;
mod presence;
mod stats;

use config::Config;
use db::ActivityStore;
use greeting::GreetingPool;
use presence::PresenceHandler;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub struct Data {
    pub presence: PresenceHandler,
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!("Error while handling `{}`: {}", event.snake_case_name(), error);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let db_pool = db::init_db(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized successfully");

    let greetings = match &config.greetings_file {
        Some(path) => GreetingPool::from_file(path)
            .with_context(|| format!("Failed to load greetings from {}", path.display()))?,
        None => GreetingPool::default(),
    };
    info!("Loaded {} greeting templates", greetings.templates().len());

    let presence = PresenceHandler::new(ActivityStore::new(db_pool.clone()), greetings);

    let options = poise::FrameworkOptions {
        commands: vec![command::stats()],
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some("/".into()),
            edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                Duration::from_secs(3600),
            ))),
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                info!("Executing command {}...", ctx.command().qualified_name);
            })
        },
        event_handler: |ctx, event, framework, data| {
            Box::pin(presence::discord::handle_event(ctx, event, framework, data))
        },
        ..Default::default()
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES;

    let command_guild = config.command_guild;
    let framework = poise::Framework::builder()
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                if let Some(guild_id) = command_guild {
                    let guild_id = serenity::GuildId::new(guild_id);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id).await?;
                    info!("Registered commands for guild {}", guild_id);
                }

                Ok(Data { presence })
            })
        })
        .options(options)
        .build();

    let mut client = Client::builder(&config.discord_token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutting down");
        shard_manager.shutdown_all().await;
    });

    client.start().await?;

    db_pool.close().await;
    info!("Database closed");
    Ok(())
}
