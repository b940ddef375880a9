use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use story_generator::ai::{MockChatClient, MockImageGenerationClient};
use story_generator::app::{App, AppServices, SessionSettings};
use story_generator::models::Config;
use story_generator::output::{FilePublisher, MockPublisher, StoryPublisher};
use story_generator::view;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "story-generator")]
#[command(about = "Write a short illustrated story from a prompt")]
struct CliArgs {
    /// Generate a single story for this prompt instead of starting the prompt loop.
    #[arg(short, long, value_name = "TEXT")]
    prompt: Option<String>,

    /// Seed passed to the image service for every story line.
    #[arg(long)]
    seed: Option<u64>,

    /// Chat model requested from the text service.
    #[arg(long, value_name = "MODEL")]
    text_model: Option<String>,

    /// Directory where stories are saved.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Do not write stories to disk.
    #[arg(long)]
    dry_run: bool,

    /// Use canned local responses instead of the hosted services.
    #[arg(long)]
    offline: bool,
}

impl CliArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(seed) = self.seed {
            config.image.seed = seed;
        }
        if let Some(model) = &self.text_model {
            config.text_model = model.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }
}

fn build_app(config: &Config, offline: bool) -> story_generator::Result<App> {
    if !offline {
        return App::new(config);
    }

    info!("Offline mode: using canned story and illustration responses");
    let publisher: Box<dyn StoryPublisher> = if config.dry_run {
        Box::new(MockPublisher::new())
    } else {
        Box::new(FilePublisher::new(&config.output_dir)?)
    };

    Ok(App::with_services(
        AppServices {
            chat: Arc::new(MockChatClient::new()),
            image_gen: Arc::new(MockImageGenerationClient::new()),
            publisher,
        },
        SessionSettings::from(config),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "story_generator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting story-generator");

    let args = CliArgs::parse();
    let mut config = Config::from_env()?;
    args.apply(&mut config);

    let app = match build_app(&config, args.offline) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    match &args.prompt {
        Some(prompt) => match app.run_once(prompt).await {
            Ok(Some(board)) => {
                print!("{}", view::board(Some(board.prompt.as_str()), &board.units));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                error!("Story generation failed: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            let mut stdout = tokio::io::stdout();
            app.run_interactive(tokio::io::stdin(), &mut stdout).await?;
            Ok(())
        }
    }
}
