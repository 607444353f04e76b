use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cpa_demo::observability::metrics::get_metrics;
use cpa_demo::provider::TokenProvider;
use cpa_demo::ui::{self, Navigator};
use cpa_demo::utils::config_loader;
use cpa_demo::utils::constants::DEFAULT_CONFIG_PATH;
use cpa_demo::utils::logging::{self, LogLevel};
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Override the authorization provider URL from the config file
    #[arg(long, env = "CPA_PROVIDER_URL")]
    provider_url: Option<String>,
    /// Print the metrics exposition before exiting
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Browse domains and request tokens interactively (default)
    Interactive,
    /// List known domains
    Domains,
    /// Show the token cached for a domain
    Show { domain: String },
    /// Request a token for a domain
    Request {
        domain: String,
        /// Request a user token instead of a client token
        #[arg(long)]
        user: bool,
        /// Request even if a token is already available
        #[arg(long)]
        force: bool,
        /// Present the credentials screen inside the navigation flow
        #[arg(long)]
        custom_presentation: bool,
    },
    /// Discard the token cached for a domain
    Discard { domain: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let mut demo_config = config_loader::run(&args.config).await?;
    if let Some(url) = &args.provider_url {
        demo_config.provider.url = url.to_owned();
    }
    logging::run(&demo_config, args.log_level);

    // -------------------------------
    // 2. Bootstrap the provider
    // -------------------------------

    let app = ui::bootstrap(&demo_config)?;
    info!("cpa-demo starting...");

    // -------------------------------
    // 3. Screens
    // -------------------------------

    let mut stdout = std::io::stdout();
    let mut navigator = Navigator::new();
    match args.command.unwrap_or(Command::Interactive) {
        Command::Interactive => {
            let stdin = BufReader::new(tokio::io::stdin());
            ui::shell::run(&app, stdin, &mut stdout).await?;
        }
        Command::Domains => {
            for (entry, row) in app.catalog().entries().iter().zip(app.domain_list().rows()) {
                writeln!(stdout, "{}\t{}", entry.domain, row)?;
            }
        }
        Command::Show { domain } => {
            let detail = app.domain_list().open(&domain, &mut navigator);
            writeln!(stdout, "{}", detail.display())?;
        }
        Command::Request {
            domain,
            user,
            force,
            custom_presentation,
        } => {
            let mut detail = app.domain_list().open(&domain, &mut navigator);
            detail.options.request_user_token = user;
            detail.options.force_renewal = force;
            detail.options.use_custom_presentation = custom_presentation;

            let outcome = detail
                .request_token_with(&mut navigator, tokio::signal::ctrl_c(), |navigator| {
                    if let ui::Screen::Credentials(view) = navigator.top() {
                        println!(
                            "Visit {} and enter the code {}",
                            view.verification_url, view.user_code
                        );
                    }
                })
                .await;
            match outcome {
                Ok(display) => writeln!(stdout, "{}", display)?,
                Err(alert) => {
                    writeln!(stdout, "[{}] {}", alert.title, alert.message)?;
                    std::process::exit(1);
                }
            }
        }
        Command::Discard { domain } => {
            app.provider().discard_token_for_domain(&domain).await;
            writeln!(stdout, "{}", app.domain_list().open(&domain, &mut navigator).display())?;
        }
    }

    if args.print_metrics {
        writeln!(stdout, "{}", get_metrics().await.render()?)?;
    }
    Ok(())
}
