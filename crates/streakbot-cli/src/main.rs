use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "streakbot", version, about = "Daily goal streaks for one chat group")]
struct Cli {
    /// Chat group id (defaults to group.allowed_id from the config)
    #[arg(long, global = true)]
    group: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Records(commands::records::RecordAction),
    #[command(flatten)]
    Query(commands::query::QueryAction),
    /// Run the daily rollover now
    Rollover(commands::rollover::RolloverArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the bot for group.allowed_id: chat lines on stdin, announcements on stdout
    Serve,
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Records(action) => commands::records::run(action, cli.group),
        Commands::Query(action) => commands::query::run(action, cli.group),
        Commands::Rollover(args) => commands::rollover::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Serve => commands::serve::run(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
