use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};

use estate_chat::app::App;
use estate_chat::session::{ChatSession, CONNECTION_ERROR_PREFIX, ERROR_PREFIX};
use estate_chat::table::project_table;
use estate_chat::theme::{self, Theme};
use estate_chat::tui::{self, EventHandler, Tui};
use estate_chat::{handler, logging, ui};
use estate_chat::{AnalysisClient, Config, Message, Overrides, Settings};

/// Width of the longest bar in the text chart
const BAR_WIDTH: f64 = 30.0;

#[derive(Parser)]
#[command(name = "estate-chat", version)]
#[command(about = "Chat with the real-estate analysis backend")]
struct Cli {
    /// Analysis endpoint URL
    #[arg(long, env = "ESTATE_CHAT_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Give up on a request after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Send the trimmed query instead of the text as typed
    #[arg(long, global = true)]
    send_trimmed: bool,

    /// Log debug output to stderr (one-shot commands only)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one query and print the answer
    Ask {
        /// Your question, e.g. "Analyze Wakad"
        query: String,
    },
    /// List the example queries
    Examples,
    /// Show the resolved settings
    Config {
        /// Write the endpoint/timeout/trim flags given on this command line to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so it logs to a file
    let _log_guard = match cli.command {
        None => Some(logging::init_tui()?),
        Some(_) => {
            logging::init_cli(cli.verbose)?;
            None
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "could not read config file, using defaults");
            Config::new()
        }
    };

    let overrides = Overrides {
        endpoint: cli.endpoint.clone(),
        request_timeout_secs: cli.timeout,
        send_trimmed_query: cli.send_trimmed,
    };
    let settings = config.resolve(&overrides);
    let client = AnalysisClient::with_timeout(&settings.endpoint, settings.request_timeout)?;

    theme::init(Theme::default());

    match cli.command {
        None => run_tui(client, &settings).await,
        Some(Commands::Ask { query }) => ask(client, &settings, &query).await,
        Some(Commands::Examples) => {
            list_examples(&settings);
            Ok(())
        }
        Some(Commands::Config { save }) => show_config(config, &overrides, &settings, save),
    }
}

async fn run_tui(client: AnalysisClient, settings: &Settings) -> Result<()> {
    info!(endpoint = %settings.endpoint, "starting chat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(client, settings);
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await,
            None => break,
        }
    }

    // Unmount: nothing may land in the history after this
    app.quit();
    Ok(())
}

async fn ask(client: AnalysisClient, settings: &Settings, query: &str) -> Result<()> {
    let mut session = ChatSession::new().with_send_trimmed(settings.send_trimmed_query);
    session.set_draft(query);

    println!("{} {}", "👤 You:".bold().cyan(), query.trim());
    println!("{}", format!("🤖 Asking {} ...", client.endpoint()).dimmed());

    let Some(reply) = session.submit(&client).await else {
        bail!("nothing to send: the query is blank");
    };

    print_reply(reply);

    if reply.text.starts_with(ERROR_PREFIX) || reply.text.starts_with(CONNECTION_ERROR_PREFIX) {
        bail!("analysis failed");
    }
    Ok(())
}

fn print_reply(reply: &Message) {
    println!("\n{}", "🤖 Bot:".bold().yellow());
    println!("{}", reply.text);

    if let Some(chart) = reply.chart_data.as_ref().filter(|c| !c.labels.is_empty()) {
        println!("\n{}", "📈 Price Trends by Year".bold().green());
        let max = chart.values.iter().cloned().fold(0.0_f64, f64::max);
        let label_width = chart.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        for (label, value) in chart.labels.iter().zip(&chart.values) {
            let bar_len = if max > 0.0 { (value / max * BAR_WIDTH).round() as usize } else { 0 };
            println!(
                "  {:>width$}  {} {}",
                label.yellow(),
                "█".repeat(bar_len).blue(),
                value,
                width = label_width
            );
        }
    }

    if let Some(records) = reply.table_data.as_deref() {
        match project_table(records) {
            Ok(Some(view)) => {
                println!("\n{}", "📋 Data preview".bold().green());

                let widths: Vec<usize> = view
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(col, header)| {
                        view.rows
                            .iter()
                            .map(|row| row[col].to_string().chars().count())
                            .chain(std::iter::once(header.chars().count()))
                            .max()
                            .unwrap_or(0)
                    })
                    .collect();

                let header: Vec<String> = view
                    .headers
                    .iter()
                    .zip(&widths)
                    .map(|(h, w)| format!("{:<width$}", h, width = *w))
                    .collect();
                println!("  {}", header.join("  ").bold());

                for row in &view.rows {
                    let cells: Vec<String> = row
                        .iter()
                        .zip(&widths)
                        .map(|(c, w)| format!("{:<width$}", c.to_string(), width = *w))
                        .collect();
                    println!("  {}", cells.join("  "));
                }

                if view.is_truncated() {
                    println!(
                        "  {}",
                        format!("showing {} of {} rows", view.rows.len(), view.total_rows).dimmed()
                    );
                }
            }
            Ok(None) => {}
            Err(e) => println!("\n{}: {}", "Table data is malformed".red(), e),
        }
    }
}

fn list_examples(settings: &Settings) {
    println!("\n{}", "💡 Try these examples".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    for example in &settings.example_queries {
        println!("  • {}", example.green());
    }
}

fn show_config(
    mut config: Config,
    overrides: &Overrides,
    settings: &Settings,
    save: bool,
) -> Result<()> {
    let path = Config::get_config_path()?;

    if save {
        if let Some(endpoint) = &overrides.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(secs) = overrides.request_timeout_secs {
            config.request_timeout_secs = Some(secs);
        }
        if overrides.send_trimmed_query {
            config.send_trimmed_query = Some(true);
        }
        config.save()?;
        println!("{} {}", "Saved".green(), path.display());
    }

    println!("\n{}", "⚙️  Settings".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("  config file:  {}", path.display().to_string().dimmed());
    println!("  endpoint:     {}", settings.endpoint.green());
    println!(
        "  timeout:      {}",
        settings
            .request_timeout
            .map(|t| format!("{}s", t.as_secs()))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  send trimmed: {}", settings.send_trimmed_query);
    println!("  logs:         {}", logging::log_dir().display().to_string().dimmed());
    Ok(())
}
