//! Shared fixtures for unit tests

use crate::config::Config;
use crate::download::Downloader;
use crate::error::GenerationError;
use crate::generation::ImageGenerator;
use crate::pipeline::LeafPipeline;
use crate::retry::LinearBackoff;
use crate::types::{GenerationRequest, LeafPath};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\ngenerated";

type Reply = Result<String, GenerationError>;

#[derive(Default)]
struct Script {
    queued: VecDeque<Reply>,
    prompts: Vec<String>,
}

/// [`ImageGenerator`] that replays queued replies, then a fallback reply forever
#[derive(Clone)]
pub(crate) struct ScriptedGenerator {
    script: Arc<Mutex<Script>>,
    fallback: Reply,
}

impl ScriptedGenerator {
    pub(crate) fn new(queued: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Arc::new(Mutex::new(Script {
                queued: queued.into(),
                prompts: Vec::new(),
            })),
            fallback,
        })
    }

    pub(crate) fn always_ok(url: &str) -> Arc<Self> {
        Self::new(Vec::new(), Ok(url.to_string()))
    }

    pub(crate) fn always_err(err: GenerationError) -> Arc<Self> {
        Self::new(Vec::new(), Err(err))
    }

    pub(crate) fn calls(&self) -> usize {
        self.script.lock().unwrap().prompts.len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.script.lock().unwrap().prompts.clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut script = self.script.lock().unwrap();
        script.prompts.push(request.prompt.clone());
        script
            .queued
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

pub(crate) fn leaf(names: &[&str]) -> LeafPath {
    LeafPath::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
}

/// Defaults with millisecond backoffs, writing under `dir`
pub(crate) fn fast_config(dir: &Path) -> Config {
    let mut config = Config {
        output_dir: dir.to_path_buf(),
        ..Config::default()
    };
    config.retry.backoff = Duration::from_millis(5);
    config.download.backoff = Duration::from_millis(5);
    config.download.timeout = Duration::from_secs(5);
    config
}

pub(crate) fn pipeline_with(generator: Arc<ScriptedGenerator>, config: Config) -> LeafPipeline {
    let downloader = Downloader::with_client(
        reqwest::Client::new(),
        LinearBackoff::from_attempts(config.download.attempts, config.download.backoff),
    );
    LeafPipeline::new(generator, downloader, Arc::new(config))
}

/// Mock server answering every GET with [`IMAGE_BYTES`]; returns it with an image URL
pub(crate) async fn image_server() -> (MockServer, String) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES))
        .mount(&server)
        .await;
    let url = format!("{}/image.png", server.uri());
    (server, url)
}
