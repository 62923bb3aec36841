use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use nfl_betting_ai::api::openai_api::DEFAULT_MODEL;
use nfl_betting_ai::config::{PipelineConfig, StoreKind, DEFAULT_SEASON_YEAR};
use nfl_betting_ai::pipeline::{open_store, BatchResult, Pipeline, WeekFeed};
use nfl_betting_ai::utils::data::save_analyses_to_csv;
use nfl_betting_ai::TemplateVersion;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cli", about = "Weekly NFL matchup analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Season year
    #[arg(long, env = "SEASON_YEAR", default_value_t = DEFAULT_SEASON_YEAR)]
    season: i32,

    /// Regular-season week; the next week with unplayed games when omitted
    #[arg(long, env = "WEEK")]
    week: Option<u32>,

    /// Read the scoreboard from a fixture instead of ESPN (1/0, true/false, yes/no)
    #[arg(
        long,
        env = "USE_MOCK_DATA",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    mock: bool,

    /// Scoreboard fixture to use with --mock
    #[arg(long)]
    mock_file: Option<PathBuf>,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// postgres, json or memory
    #[arg(long)]
    store: Option<StoreKind>,

    /// Where the json store and batch summaries are written
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Response template: cover or classic
    #[arg(long, default_value = "cover")]
    template: TemplateVersion,

    /// Only treat the template's own labels as section headers
    #[arg(long)]
    strict_headers: bool,

    /// Also write the analyses to this CSV file
    #[arg(long)]
    save_csv: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Fetch, analyze and persist one week (default)
    Run,
    /// Print the prompts a run would send
    Preview,
    /// Delete every stored game and analysis
    Clear,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            season_year: self.season,
            week: self.week,
            use_mock_data: self.mock,
            mock_file: self.mock_file.clone(),
            template: self.template,
            strict_headers: self.strict_headers,
            model: self.model.clone(),
            openai_api_key: self.openai_api_key.clone().filter(|k| !k.is_empty()),
            database_url: self.database_url.clone().filter(|u| !u.is_empty()),
            store: self.store,
            output_dir: self.output_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nfl_betting_ai=info,cli=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config, cli.save_csv.as_deref()).await,
        Command::Preview => preview(&config).await,
        Command::Clear => clear(&config).await,
    }
}

async fn run(config: &PipelineConfig, save_csv: Option<&std::path::Path>) -> Result<()> {
    println!("NFL Betting AI - Season {}\n", config.season_year);

    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to set up pipeline")?;
    let result = pipeline.run(config.week).await;

    print_report(&result);

    let path = result.save_summary(&config.output_dir, Utc::now())?;
    println!("\nSaved batch summary to {}", path.display());

    if let Some(csv_path) = save_csv {
        save_analyses_to_csv(&result.analyses(), csv_path)?;
        println!("Saved analyses to {}", csv_path.display());
    }

    if result.games_fetched == 0 && !result.errors.is_empty() {
        anyhow::bail!("Run failed: {}", result.errors.join("; "));
    }
    Ok(())
}

async fn preview(config: &PipelineConfig) -> Result<()> {
    let feed = WeekFeed::from_config(config).context("Failed to set up scoreboard source")?;
    let prompts = feed.preview(config.week, config.template).await?;

    if prompts.is_empty() {
        println!("No games found.");
    }
    for (i, (game, prompt)) in prompts.iter().enumerate() {
        println!("{}. {} [{}]\n", i + 1, game.matchup(), game.game_id);
        println!("{}", prompt);
    }
    Ok(())
}

async fn clear(config: &PipelineConfig) -> Result<()> {
    let store = open_store(config).await?;
    let removed = store.clear().await?;
    println!("Removed {} rows from the {} store", removed, store.store_name());
    Ok(())
}

fn print_report(result: &BatchResult) {
    println!("\nPIPELINE REPORT\n");
    match result.week {
        Some(week) => println!("Week: {}", week),
        None => println!("Week: unknown"),
    }
    println!("Games fetched:   {}", result.games_fetched);
    println!("Games analyzed:  {}", result.games_analyzed);
    println!("Fallbacks used:  {}", result.fallbacks);
    println!("Games persisted: {}", result.games_persisted);

    if !result.games.is_empty() {
        println!("\nGAMES\n");
        for (i, game) in result.games.iter().enumerate() {
            println!(
                "{}. {} | {} | Line: {} | Total: {} | Confidence: {}{}",
                i + 1,
                game.matchup,
                game.analysis.ai_lean,
                game.analysis.predicted_line,
                game.analysis.predicted_total,
                game.analysis.confidence_score,
                if game.persisted { "" } else { " (not saved)" }
            );
        }
    }

    if result.errors.is_empty() {
        println!("\nNo errors.");
    } else {
        println!("\nERRORS ({})\n", result.errors.len());
        for error in &result.errors {
            println!("- {}", error);
        }
    }
}
