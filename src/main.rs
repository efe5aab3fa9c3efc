use clap::{Parser, Subcommand};
use login_store::{Config, FetchState, LoginRepository};
use mimalloc::MiMalloc;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "login-store", about = "Save and look up login credentials")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a username/password pair
    Save { username: String, password: String },
    /// Show the newest credential saved under a username
    Fetch { username: String },
    /// Show every credential saved under a username
    History { username: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database = %cfg.database.path().display(),
        loglevel = %cfg.loglevel
    );

    let repo = LoginRepository::new(cfg.database.clone());
    repo.initialize().await?;

    match cli.command {
        Command::Save { username, password } => {
            let id = repo.save(username.clone(), password).wait().await?;
            println!("{}", json!({ "id": id, "username": username }));
        }
        Command::Fetch { username } => {
            let result = repo.fetch(username.clone());
            let _sub = result.subscribe(|state| {
                if !state.is_terminal() {
                    info!("lookup pending");
                }
            });
            match result.wait_for(FetchState::is_terminal).await {
                Some(FetchState::Found(cred)) => println!("{}", serde_json::to_string(&cred)?),
                Some(FetchState::Failed(e)) => {
                    warn!(username = %username, "lookup failed");
                    return Err(e.to_string().into());
                }
                _ => println!("{}", json!({ "username": username, "found": false })),
            }
        }
        Command::History { username } => {
            let rows = repo.history(&username).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    repo.shutdown();
    Ok(())
}
