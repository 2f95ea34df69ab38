//! Common test utilities
//!
//! Shared by the artcore integration tests: an in-memory store, a wiremock
//! server standing in for the attachment CDN, and a scratch directory.

#![allow(dead_code)]

use std::sync::Arc;

use artcore::dispatcher::DispatcherSettings;
use artcore::fetch::http_client;
use artcore::{Attachment, Dispatcher, Invocation, MemoryStore, Post, Reply, Session, UploadPipeline};
use secrecy::SecretString;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const IMAGE_BOT_ID: u64 = 936929561302675456;

/// Everything one test needs, torn down when dropped
pub struct TestEnvironment {
    pub store: Arc<MemoryStore>,
    pub server: MockServer,
    pub scratch: TempDir,
    pub dispatcher: Dispatcher,
}

impl TestEnvironment {
    pub async fn new(session: Session) -> Self {
        let store = Arc::new(MemoryStore::new());
        let server = MockServer::start().await;
        let scratch = tempfile::tempdir().unwrap();

        let pipeline = UploadPipeline::new(store.clone(), http_client().unwrap());
        let settings = DispatcherSettings {
            scratch_dir: scratch.path().to_path_buf(),
            prefix: "!".to_string(),
            bot_token: SecretString::from("test-token-0123456789".to_string()),
        };
        let dispatcher = Dispatcher::new(session.shared(), pipeline, settings);

        Self {
            store,
            server,
            scratch,
            dispatcher,
        }
    }

    /// Environment whose session already points at `bucket/path`.
    pub async fn with_bucket(bucket: &str, path: &str) -> Self {
        let mut session = Session::default();
        session.set_bucket(bucket, path);
        Self::new(session).await
    }

    /// Serves `body` at `route` with status 200.
    pub async fn serve(&self, route: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&self.server)
            .await;
    }

    /// Answers `route` with a bare status code.
    pub async fn serve_status(&self, route: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    pub fn attachment(&self, route: &str, filename: &str) -> Attachment {
        Attachment::new(self.url(route), filename, Some("image/png"))
    }

    pub fn image_post(&self, route: &str, content: &str) -> Post {
        Post {
            author_id: IMAGE_BOT_ID,
            author_is_bot: true,
            content: content.to_string(),
            attachments: vec![self.attachment(route, "grid_0.png")],
        }
    }

    /// Runs a text command as a regular member.
    pub async fn run(&self, text: &str) -> Vec<Reply> {
        self.run_with(text, Invocation::new(false)).await
    }

    pub async fn run_with(&self, text: &str, invocation: Invocation) -> Vec<Reply> {
        self.dispatcher
            .handle_text(text, &invocation)
            .await
            .unwrap_or_else(|| panic!("{text:?} was not recognized as a command"))
    }
}

/// Text of every reply, in order.
pub fn texts(replies: &[Reply]) -> Vec<String> {
    replies
        .iter()
        .map(|reply| match reply {
            Reply::Text(text) => text.clone(),
            Reply::File { caption, .. } => caption.clone(),
            Reply::Choices { text, .. } => text.clone(),
        })
        .collect()
}
