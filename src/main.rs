use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use prompt_optimizer::app::App;
use prompt_optimizer::history::HistoryStore;
use prompt_optimizer::models::{Config, TargetModel};
use prompt_optimizer::session::{self, Session};
use prompt_optimizer::server;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "prompt-optimizer")]
#[command(about = "Expand image ideas into Midjourney / Stable Diffusion prompts")]
struct CliArgs {
    /// JSON file holding the recent-results history.
    #[arg(long, global = true, default_value = ".prompt-history.json")]
    history_file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Listen address, overriding BIND_ADDR.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Expand a description into a general prompt.
    Optimize { text: String },
    /// Expand a description into a prompt for a specific model family.
    Generate {
        text: String,
        #[arg(long, value_enum, default_value_t = ModelArg::Mj)]
        model: ModelArg,
        /// Midjourney aspect ratio, e.g. 16:9.
        #[arg(long)]
        aspect_ratio: Option<String>,
        /// Stable Diffusion negative prompt.
        #[arg(long)]
        negative: Option<String>,
        /// Style tag chained onto the description; repeatable.
        #[arg(long = "style")]
        styles: Vec<String>,
    },
    /// Derive a prompt from an image file.
    Describe { image: PathBuf },
    /// Print recent results, newest first.
    History,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Mj,
    Sd,
}

impl From<ModelArg> for TargetModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Mj => TargetModel::Mj,
            ModelArg::Sd => TargetModel::Sd,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prompt_optimizer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app = App::from_config(&config);
    let mut session = Session::start(HistoryStore::new(&args.history_file));

    let outcome = match args.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or(config.bind_addr);
            info!("Starting prompt-optimizer server");
            server::serve(app, addr, config.max_body_bytes).await
        }
        Command::Optimize { text } => {
            session.input = text;
            run_optimize(&app, &mut session).await
        }
        Command::Generate {
            text,
            model,
            aspect_ratio,
            negative,
            styles,
        } => {
            session.input = text;
            for style in &styles {
                session.append_style_tag(style);
            }
            session.target_model = model.into();
            session.aspect_ratio = aspect_ratio;
            session.negative_prompt = negative;
            run_generate(&app, &mut session).await
        }
        Command::Describe { image } => run_describe(&app, &image).await,
        Command::History => {
            for entry in session.history() {
                println!("[{}] {}\n  -> {}", entry.id, entry.input, entry.output);
            }
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}

async fn run_optimize(app: &App, session: &mut Session) -> prompt_optimizer::Result<()> {
    let payload = session.optimize_payload()?;
    let response = app.optimize(&payload).await?;
    println!("{}", response.optimized_prompt);
    session.record_success(response.optimized_prompt, Utc::now())
}

async fn run_generate(app: &App, session: &mut Session) -> prompt_optimizer::Result<()> {
    let payload = session.generate_payload()?;
    let prompt = app.generate(&payload).await?;
    let output = session::history_output(&prompt);
    println!("{}", output);
    session.record_success(output, Utc::now())
}

async fn run_describe(app: &App, image: &std::path::Path) -> prompt_optimizer::Result<()> {
    let data_url = session::read_image_as_data_url(image)?;
    let response = app.describe(&json!({ "image": data_url })).await?;
    println!("{}", response.prompt);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let args = CliArgs::parse_from(["prompt-optimizer"]);
        assert!(args.command.is_none());
        assert_eq!(args.history_file, PathBuf::from(".prompt-history.json"));
    }

    #[test]
    fn test_generate_args_parse() {
        let args = CliArgs::parse_from([
            "prompt-optimizer",
            "generate",
            "a cat",
            "--model",
            "sd",
            "--negative",
            "blurry",
            "--style",
            "cinematic",
            "--style",
            "8k",
        ]);
        match args.command {
            Some(Command::Generate {
                text,
                model,
                negative,
                styles,
                ..
            }) => {
                assert_eq!(text, "a cat");
                assert!(matches!(model, ModelArg::Sd));
                assert_eq!(negative.as_deref(), Some("blurry"));
                assert_eq!(styles, vec!["cinematic", "8k"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_serve_bind_override() {
        let args = CliArgs::parse_from(["prompt-optimizer", "serve", "--bind", "0.0.0.0:8080"]);
        match args.command {
            Some(Command::Serve { bind }) => {
                assert_eq!(bind, Some("0.0.0.0:8080".parse().unwrap()));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
