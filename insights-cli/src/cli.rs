use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, Select, Text};
use insights_core::{
    BackendApi, Config, Dashboard, Favorites, HttpBackend, ServiceId, Services, Session,
    TokenStore, history::HistoryClient, provider, session::KEYRING_SERVICE, suggest::Suggester,
};
use std::sync::Arc;
use tracing::debug;

use crate::render;

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000/api";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "city-insights", version, about = "City insights dashboard")]
pub struct Cli {
    /// Show debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a service, or the backend.
    Configure {
        /// "geodb", "restcountries", "openweather", "exchangerate" or "backend".
        target: String,
    },

    /// Look up a city and save the lookup to history.
    Show {
        /// City name.
        city: String,

        /// Print the record as JSON instead of a card.
        #[arg(long)]
        json: bool,

        /// Do not save the lookup to the backend.
        #[arg(long)]
        no_save: bool,
    },

    /// List cities matching a partial name.
    Suggest {
        partial: String,
    },

    /// Type part of a name, pick a suggestion, see the result.
    Interactive,

    /// Show usage statistics from the backend.
    Stats,

    /// Show recently saved lookups.
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 5)]
        limit: u32,
    },

    /// Discard the stored backend token and authenticate again.
    Login,

    /// Manage favorite cities.
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoriteAction {
    /// Add a city to favorites.
    Add { city: String, country: String },

    /// List favorite cities.
    List,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { target } => configure(&target),
            Command::Show { city, json, no_save } => show(&city, json, no_save).await,
            Command::Suggest { partial } => {
                let geo = provider::geo_from_config(&load_config()?)?;
                let cities = Suggester::new(geo).suggest(&partial).await;
                print!("{}", render::suggestions(&cities));
                Ok(())
            }
            Command::Interactive => interactive().await,
            Command::Stats => {
                let history = history_client(&load_config()?)?;
                match history.fetch_statistics().await {
                    Some(stats) => print!("{}", render::statistics(&stats)),
                    None => println!("No statistics available."),
                }
                Ok(())
            }
            Command::History { page, limit } => {
                let history = history_client(&load_config()?)?;
                let records = history.fetch_records(page, limit).await;
                print!("{}", render::history(&records, Utc::now()));
                Ok(())
            }
            Command::Login => {
                let (backend, session) = backend_parts(&load_config()?)?;
                session.refresh(backend.as_ref()).await?;
                println!("Authenticated with the backend.");
                Ok(())
            }
            Command::Favorite { action } => favorite(action),
        }
    }
}

/// Config file with environment overrides applied.
fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    config.apply_env();

    debug!(
        services = config.services.len(),
        backend = config.backend.is_some(),
        "configuration loaded"
    );
    Ok(config)
}

fn backend_parts(config: &Config) -> anyhow::Result<(Arc<dyn BackendApi>, Arc<Session>)> {
    let backend = HttpBackend::new(config.backend()?);
    let session = Session::with_store(
        TokenStore::new(Config::token_file_path()?).with_keyring(KEYRING_SERVICE),
    );
    Ok((Arc::new(backend), Arc::new(session)))
}

fn history_client(config: &Config) -> anyhow::Result<HistoryClient> {
    let (backend, session) = backend_parts(config)?;
    Ok(HistoryClient::new(backend, session))
}

fn dashboard(config: &Config, save: bool) -> anyhow::Result<Dashboard> {
    let dashboard = Dashboard::new(Services::from_config(config)?);

    if !save {
        return Ok(dashboard);
    }
    if config.backend.is_none() {
        eprintln!("Backend not configured; lookups will not be saved.");
        return Ok(dashboard);
    }

    let (backend, session) = backend_parts(config)?;
    Ok(dashboard.with_backend(backend, session))
}

fn configure(target: &str) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    if target.eq_ignore_ascii_case("backend") {
        let current = config.backend.as_ref().map(|b| b.url.clone());
        let url = Text::new("Backend URL:")
            .with_default(current.as_deref().unwrap_or(DEFAULT_BACKEND_URL))
            .prompt()?;
        let api_key = Password::new("Backend API key:").without_confirmation().prompt()?;

        config.set_backend(url, api_key);
        config.save()?;
        println!("Backend saved to {}", Config::config_file_path()?.display());
        return Ok(());
    }

    let id = ServiceId::try_from(target)?;
    if !id.requires_api_key() {
        println!("'{id}' does not need an API key.");
        return Ok(());
    }

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()?;
    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.upsert_service_api_key(id, api_key.trim().to_string());
    config.save()?;
    println!("Saved {id} key to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(city: &str, json: bool, no_save: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let dashboard = dashboard(&config, !no_save)?;
    search_and_print(&dashboard, city, json, !no_save && config.backend.is_some()).await
}

async fn search_and_print(
    dashboard: &Dashboard,
    city: &str,
    json: bool,
    saving: bool,
) -> anyhow::Result<()> {
    let outcome = dashboard.search(city).await;

    let record = match outcome.record {
        Ok(record) => record,
        Err(err) => {
            let message = err.user_message();
            return Err(anyhow::Error::new(err).context(message));
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).context("Failed to serialize record to JSON")?
        );
    } else {
        print!("{}", render::record(&record));
    }

    if saving {
        if outcome.saved {
            eprintln!("City data saved to history.");
        } else {
            eprintln!("Failed to save city data to history.");
        }
    }

    if let Some(stats) = outcome.statistics
        && !json
    {
        println!();
        print!("{}", render::statistics(&stats));
    }

    Ok(())
}

async fn interactive() -> anyhow::Result<()> {
    let config = load_config()?;
    let saving = config.backend.is_some();
    let dashboard = dashboard(&config, true)?;

    loop {
        let partial = Text::new("City (at least 2 letters):").prompt()?;

        let Some(cities) = dashboard.suggest(&partial).await else {
            continue;
        };

        if cities.is_empty() {
            println!("No matching cities.");
        } else {
            let labels: Vec<String> = cities
                .iter()
                .map(|c| format!("{} ({}, {})", c.city, c.country, c.region))
                .collect();
            let choice = Select::new("Pick a city:", labels).raw_prompt()?;
            let city = &cities[choice.index].city;

            if let Err(err) = search_and_print(&dashboard, city, false, saving).await {
                eprintln!("{err}");
            }
        }

        if !Confirm::new("Search another city?").with_default(true).prompt()? {
            break;
        }
    }

    Ok(())
}

fn favorite(action: FavoriteAction) -> anyhow::Result<()> {
    let path = Config::favorites_file_path()?;
    let mut favorites = Favorites::load_from(&path)?;

    match action {
        FavoriteAction::Add { city, country } => {
            if favorites.add(&city, &country, Utc::now()) {
                favorites.save_to(&path)?;
                println!("{city} added to favorites!");
            } else {
                println!("{city} is already in favorites");
            }
        }
        FavoriteAction::List => print!("{}", render::favorites(favorites.list())),
    }

    Ok(())
}
