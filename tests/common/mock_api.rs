//! wiremock stand-in for the image API and the image host

use feeling_images::generation::IMAGES_ENDPOINT;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Bytes served for every generated image
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nintegration";

/// Path the mock image host serves images from
pub const IMAGE_PATH: &str = "/files/portrait.png";

/// One server playing both the generation API and the image host
pub struct MockApi {
    pub server: MockServer,
}

impl MockApi {
    /// Server with no mocks mounted
    pub async fn bare() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Server that answers every generation request and serves the image
    pub async fn start() -> Self {
        let api = Self::bare().await;
        api.mount_image().await;
        api.mount_generation_ok().await;
        api
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn image_url(&self) -> String {
        format!("{}{IMAGE_PATH}", self.server.uri())
    }

    pub fn generation_ok(&self) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "created": 1_700_000_000,
            "data": [{ "url": self.image_url() }]
        }))
    }

    pub async fn mount_generation_ok(&self) {
        Mock::given(method("POST"))
            .and(path(IMAGES_ENDPOINT))
            .respond_with(self.generation_ok())
            .mount(&self.server)
            .await;
    }

    pub async fn mount_image(&self) {
        Mock::given(method("GET"))
            .and(path(IMAGE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES))
            .mount(&self.server)
            .await;
    }

    async fn requests_matching(&self, verb: &str, url_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == url_path)
            .collect()
    }

    /// Generation requests received so far, in arrival order
    pub async fn generation_requests(&self) -> Vec<Request> {
        self.requests_matching("POST", IMAGES_ENDPOINT).await
    }

    /// Image downloads received so far
    pub async fn image_requests(&self) -> Vec<Request> {
        self.requests_matching("GET", IMAGE_PATH).await
    }

    /// Prompts of every generation request, in arrival order
    pub async fn prompts(&self) -> Vec<String> {
        self.generation_requests()
            .await
            .iter()
            .map(|r| {
                let body: serde_json::Value = r.body_json().unwrap();
                body["prompt"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

/// Error body in the shape the API uses for rejected requests
pub fn api_error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "error": { "message": message, "type": "invalid_request_error" }
    }))
}
