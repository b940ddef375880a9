//! Application orchestration: the prompt/reply/illustration event loop.

use crate::ai::{
    ChatService, ImageGenerationService, PollinationsChatClient, PollinationsImageClient,
};
use crate::controller::{Dispatcher, PromptController, Reply, ReplyOutcome, SubmitOutcome};
use crate::models::{Config, Illustration, ImageSettings, Storyboard};
use crate::output::{FilePublisher, MockPublisher, StoryPublisher};
use crate::renderer::StoryRenderer;
use crate::{prompts, view, Error, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_retry::{strategy::FixedInterval, Retry};
use tracing::{error, info, warn};

const QUIT_COMMAND: &str = "/quit";

type ImageOutcome = (u64, usize, Result<Illustration>);

/// Per-run knobs that are not service dependencies.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub image: ImageSettings,
    pub image_retries: usize,
    pub image_retry_delay_ms: u64,
    pub discard_stale_replies: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            image: ImageSettings::default(),
            image_retries: 0,
            image_retry_delay_ms: 2000,
            discard_stale_replies: true,
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            image: config.image.clone(),
            image_retries: config.image_retries,
            image_retry_delay_ms: config.image_retry_delay_ms,
            discard_stale_replies: config.discard_stale_replies,
        }
    }
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub chat: Arc<dyn ChatService>,
    pub image_gen: Arc<dyn ImageGenerationService>,
    pub publisher: Box<dyn StoryPublisher>,
}

/// Coordinates story generation, illustration fetching and publishing.
pub struct App {
    chat: Arc<dyn ChatService>,
    image_gen: Arc<dyn ImageGenerationService>,
    publisher: Box<dyn StoryPublisher>,
    settings: SessionSettings,
}

/// State of one conversation: controller, renderer and in-flight work.
struct Session {
    controller: PromptController,
    renderer: StoryRenderer,
    replies: mpsc::UnboundedReceiver<Reply>,
    images: JoinSet<ImageOutcome>,
    unpublished: bool,
}

impl Session {
    fn is_idle(&self) -> bool {
        self.controller.in_flight() == 0 && self.images.is_empty()
    }

    fn storyboard(&self) -> Storyboard {
        Storyboard {
            prompt: self
                .controller
                .current_prompt()
                .unwrap_or_default()
                .to_string(),
            created_at: Utc::now(),
            units: self.renderer.units().to_vec(),
        }
    }
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices, settings: SessionSettings) -> Self {
        Self {
            chat: services.chat,
            image_gen: services.image_gen,
            publisher: services.publisher,
            settings,
        }
    }

    /// Construct an app talking to the configured Pollinations endpoints.
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!(
            "Chat provider: {} (model: {})",
            config.text_base_url, config.text_model
        );
        let chat = Arc::new(PollinationsChatClient::new_with_client(
            config.text_base_url.clone(),
            config.text_model.clone(),
            timeout,
            http_client.clone(),
        ));

        info!(
            "Image provider: {} (seed: {})",
            config.image_base_url, config.image.seed
        );
        let image_gen = Arc::new(PollinationsImageClient::new_with_client(
            config.image_base_url.clone(),
            timeout,
            http_client,
        ));

        let publisher: Box<dyn StoryPublisher> = if config.dry_run {
            info!("DRY_RUN enabled, stories will not be written to disk");
            Box::new(MockPublisher::new())
        } else {
            Box::new(FilePublisher::new(&config.output_dir)?)
        };

        Ok(Self::with_services(
            AppServices {
                chat,
                image_gen,
                publisher,
            },
            SessionSettings::from(config),
        ))
    }

    fn start_session(&self) -> Result<Session> {
        let (dispatcher, replies) = Dispatcher::new(Arc::clone(&self.chat));
        let controller = PromptController::new(
            prompts::system_message(),
            dispatcher,
            self.settings.discard_stale_replies,
        )?;
        let renderer = StoryRenderer::new(controller.subscribe(), self.settings.image.clone());

        Ok(Session {
            controller,
            renderer,
            replies,
            images: JoinSet::new(),
            unpublished: false,
        })
    }

    /// Start one independent fetch per pending story line.
    fn spawn_images(&self, session: &mut Session) {
        let retries = self.settings.image_retries;
        let delay = self.settings.image_retry_delay_ms;

        for pending in session.renderer.image_requests() {
            let image_gen = Arc::clone(&self.image_gen);

            session.images.spawn(async move {
                let strategy = FixedInterval::from_millis(delay).take(retries);
                let request = pending.request;
                let result = Retry::spawn(strategy, || {
                    let image_gen = Arc::clone(&image_gen);
                    let request = request.clone();
                    async move { image_gen.generate_image(&request).await }
                })
                .await;
                (pending.generation, pending.index, result)
            });
        }
    }

    /// Apply a finished image task; returns the rendered status line when it
    /// belongs to the current render.
    fn apply_image(
        &self,
        session: &mut Session,
        joined: std::result::Result<ImageOutcome, JoinError>,
    ) -> Option<String> {
        match joined {
            Ok((generation, index, result)) => session
                .renderer
                .apply_image(generation, index, result)
                .map(|unit| format!("{} {}", unit.label(), view::image_status(unit))),
            Err(e) => {
                error!("Illustration task failed: {}", e);
                None
            }
        }
    }

    async fn publish(&self, session: &mut Session) -> Result<String> {
        session.unpublished = false;
        let board = session.storyboard();
        let location = self.publisher.publish(&board).await?;
        info!("Published story '{}' to {}", board.prompt, location);
        Ok(location)
    }

    /// Run a single submit/reply/illustrate cycle for `prompt`.
    ///
    /// Returns `None` when the prompt is empty or whitespace-only.
    pub async fn run_once(&self, prompt: &str) -> Result<Option<Storyboard>> {
        let mut session = self.start_session()?;
        session.controller.set_draft(prompt);

        if session.controller.submit()? == SubmitOutcome::Ignored {
            info!("Empty prompt, nothing to generate");
            return Ok(None);
        }

        while session.controller.in_flight() > 0 {
            let reply = session
                .replies
                .recv()
                .await
                .ok_or_else(|| Error::Generic("Reply channel closed".to_string()))?;

            if let ReplyOutcome::Failed(reason) = session.controller.apply_reply(reply)? {
                return Err(Error::AiProvider(reason));
            }
        }

        if session.renderer.refresh() {
            self.spawn_images(&mut session);
        }

        while let Some(joined) = session.images.join_next().await {
            self.apply_image(&mut session, joined);
        }

        let board = session.storyboard();
        let location = self.publisher.publish(&board).await?;
        info!("Published story '{}' to {}", board.prompt, location);
        Ok(Some(board))
    }

    /// Read prompts line by line from `input` until EOF or `/quit`, writing
    /// the story view to `output`. Pending work is drained before returning.
    pub async fn run_interactive<R, W>(&self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut session = self.start_session()?;
        let mut lines = BufReader::new(input).lines();
        let mut input_open = true;

        write_out(output, &view::input_prompt(prompts::random_placeholder())).await?;

        loop {
            if !input_open && session.is_idle() {
                break;
            }

            tokio::select! {
                line = lines.next_line(), if input_open => {
                    match line? {
                        Some(text) if text.trim() == QUIT_COMMAND => {
                            info!("Quit requested");
                            input_open = false;
                        }
                        Some(text) => {
                            session.controller.set_draft(text);
                            if let SubmitOutcome::Dispatched { seq } = session.controller.submit()? {
                                write_out(output, &format!("Writing story #{}...\n", seq)).await?;
                            }
                        }
                        None => input_open = false,
                    }
                }
                Some(reply) = session.replies.recv() => {
                    match session.controller.apply_reply(reply)? {
                        ReplyOutcome::Applied => {
                            if session.renderer.refresh() {
                                let board = view::board(
                                    session.controller.current_prompt(),
                                    session.renderer.units(),
                                );
                                write_out(output, &format!("\n{}", board)).await?;
                                session.unpublished = true;
                                self.spawn_images(&mut session);
                            }
                        }
                        ReplyOutcome::Stale => {}
                        ReplyOutcome::Failed(reason) => {
                            write_out(output, &format!("Story failed: {}\n", reason)).await?;
                        }
                    }
                    if input_open {
                        write_out(output, &view::input_prompt(prompts::random_placeholder())).await?;
                    }
                }
                Some(joined) = session.images.join_next() => {
                    if let Some(status) = self.apply_image(&mut session, joined) {
                        write_out(output, &format!("{}\n", status)).await?;
                    }
                }
                else => break,
            }

            if session.unpublished && session.renderer.is_settled() {
                match self.publish(&mut session).await {
                    Ok(location) => write_out(output, &format!("Saved story to {}\n", location)).await?,
                    Err(e) => {
                        warn!("Failed to publish story: {}", e);
                        write_out(output, &format!("Could not save story: {}\n", e)).await?;
                    }
                }
            }
        }

        output.flush().await?;
        Ok(())
    }
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockChatClient, MockImageGenerationClient};
    use crate::models::{ImageStatus, Role};
    use pretty_assertions::assert_eq;

    fn build_test_app(
        chat: MockChatClient,
        image_gen: MockImageGenerationClient,
        publisher: MockPublisher,
    ) -> App {
        App::with_services(
            AppServices {
                chat: Arc::new(chat),
                image_gen: Arc::new(image_gen),
                publisher: Box::new(publisher),
            },
            SessionSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_run_once_illustrates_every_line() {
        let chat = MockChatClient::new().with_response("A cat woke up.\nIt stretched. ".to_string());
        let image_gen = MockImageGenerationClient::new();
        let publisher = MockPublisher::new();
        let app = build_test_app(chat.clone(), image_gen.clone(), publisher.clone());

        let board = app.run_once("A cat").await.unwrap().unwrap();

        assert_eq!(board.prompt, "A cat");
        let lines: Vec<&str> = board.units.iter().map(|u| u.line.as_str()).collect();
        assert_eq!(lines, vec!["A cat woke up", "It stretched"]);
        assert!(board
            .units
            .iter()
            .all(|u| matches!(u.status, ImageStatus::Ready { .. })));

        let mut requested: Vec<String> = image_gen
            .recorded_requests()
            .into_iter()
            .map(|r| r.prompt)
            .collect();
        requested.sort();
        assert_eq!(requested, vec!["A cat woke up", "It stretched"]);
        assert_eq!(publisher.get_publish_count(), 1);

        let history = &chat.recorded_histories()[0];
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[0].content, prompts::STORY_SYSTEM.trim_end());
    }

    #[tokio::test]
    async fn test_run_once_ignores_blank_prompt() {
        let chat = MockChatClient::new();
        let publisher = MockPublisher::new();
        let app = build_test_app(chat.clone(), MockImageGenerationClient::new(), publisher.clone());

        assert!(app.run_once("   ").await.unwrap().is_none());
        assert_eq!(chat.get_call_count(), 0);
        assert_eq!(publisher.get_publish_count(), 0);
    }

    #[tokio::test]
    async fn test_run_once_surfaces_chat_failure() {
        let chat = MockChatClient::new().with_error("rate limited".to_string());
        let app = build_test_app(chat, MockImageGenerationClient::new(), MockPublisher::new());

        let err = app.run_once("A cat").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(ref reason) if reason.contains("rate limited")));
    }

    #[tokio::test]
    async fn test_run_once_marks_failed_illustrations() {
        let chat = MockChatClient::new().with_response("Good line. Bad line".to_string());
        let image_gen = MockImageGenerationClient::new().with_failure_for("Bad line".to_string());
        let app = build_test_app(chat, image_gen, MockPublisher::new());

        let board = app.run_once("prompt").await.unwrap().unwrap();

        assert!(matches!(board.units[0].status, ImageStatus::Ready { .. }));
        assert!(matches!(board.units[1].status, ImageStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_image_retries_are_attempted_when_configured() {
        let chat = MockChatClient::new().with_response("Bad line".to_string());
        let image_gen = MockImageGenerationClient::new().with_failure_for("Bad line".to_string());
        let app = App::with_services(
            AppServices {
                chat: Arc::new(chat),
                image_gen: Arc::new(image_gen.clone()),
                publisher: Box::new(MockPublisher::new()),
            },
            SessionSettings {
                image_retries: 2,
                image_retry_delay_ms: 1,
                ..SessionSettings::default()
            },
        );

        app.run_once("prompt").await.unwrap();
        assert_eq!(image_gen.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_interactive_session_renders_and_publishes() {
        let chat = MockChatClient::new().with_response("A cat woke up.\nIt stretched.".to_string());
        let publisher = MockPublisher::new();
        let app = build_test_app(chat, MockImageGenerationClient::new(), publisher.clone());

        let input = tokio_test::io::Builder::new()
            .read(b"   \nA cat\n")
            .build();
        let mut output = Vec::new();

        app.run_interactive(input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Writing story #1..."));
        assert!(!text.contains("Writing story #2"));
        assert!(text.contains("Story: A cat"));
        assert!(text.contains("Episode: 1\n  \"A cat woke up\""));
        assert!(text.contains("Episode: 2\n  \"It stretched\""));
        assert!(text.contains("Saved story to memory://story-1"));

        let boards = publisher.published();
        assert_eq!(boards.len(), 1);
        assert!(boards[0]
            .units
            .iter()
            .all(|u| matches!(u.status, ImageStatus::Ready { .. })));
    }

    #[tokio::test]
    async fn test_interactive_quit_stops_reading() {
        let chat = MockChatClient::new();
        let app = build_test_app(chat.clone(), MockImageGenerationClient::new(), MockPublisher::new());

        let input = tokio_test::io::Builder::new()
            .read(b"/quit\n")
            .build();
        let mut output = Vec::new();

        app.run_interactive(input, &mut output).await.unwrap();
        assert_eq!(chat.get_call_count(), 0);
    }
}
