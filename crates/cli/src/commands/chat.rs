use std::io::{self, BufRead, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sparky_agent::ResponseComposer;
use sparky_core::config::{AppConfig, LoadOptions};
use uuid::Uuid;

use crate::commands::CommandResult;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

/// The parts of the server's chat response the terminal shows.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub quick_replies: Vec<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Thin client for `POST /api/chat`. Transport failures never surface as
/// errors; the caller always gets something to show the customer.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    session_id: String,
    fallback: ChatReply,
}

impl ChatClient {
    pub fn new(
        base_url: &str,
        session_id: impl Into<String>,
        fallback_text: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            session_id: session_id.into(),
            fallback: ChatReply {
                response: fallback_text.into(),
                quick_replies: Vec::new(),
                state: None,
                action: None,
            },
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn send(&self, message: &str) -> ChatReply {
        match self.try_send(message).await {
            Ok(reply) => reply,
            Err(error) => {
                eprintln!("(chat transport error: {error})");
                self.fallback.clone()
            }
        }
    }

    async fn try_send(&self, message: &str) -> Result<ChatReply, reqwest::Error> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest { message, session_id: &self.session_id })
            .send()
            .await?;

        // A degraded server still answers with its own fallback reply.
        let status = response.status();
        match response.json::<ChatReply>().await {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Ok(self.fallback.clone()),
            Err(error) => Err(error),
        }
    }
}

pub fn run(url: Option<String>, session: Option<String>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let base_url = url.unwrap_or_else(|| default_base_url(&config));
    let session_id = session.unwrap_or_else(|| Uuid::new_v4().to_string());
    let fallback = ResponseComposer::new(config.business.clone()).fallback_reply().text;
    let client = match ChatClient::new(&base_url, session_id, fallback) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("chat", "client_init", error.to_string(), 4);
        }
    };

    println!("Chatting with {} at {base_url} (type `exit` to leave)", config.business.name);
    let stdin = io::stdin();
    let mut sent = 0usize;
    loop {
        print!("you> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                return CommandResult::failure("chat", "stdin", error.to_string(), 5);
            }
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&message.to_ascii_lowercase().as_str()) {
            break;
        }

        let reply = runtime.block_on(client.send(message));
        sent += 1;
        println!("{}", render_reply(&reply));
    }

    CommandResult::success(
        "chat",
        format!("chat session {} ended after {sent} message(s)", client.session_id()),
    )
}

fn default_base_url(config: &AppConfig) -> String {
    let host = match config.server.bind_address.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        other => other,
    };
    format!("http://{host}:{}", config.server.port)
}

fn render_reply(reply: &ChatReply) -> String {
    let mut rendered = format!("bot> {}", reply.response);
    if !reply.quick_replies.is_empty() {
        let options =
            reply.quick_replies.iter().map(|option| format!("[{option}]")).collect::<Vec<_>>();
        rendered.push_str(&format!("\n     {}", options.join(" ")));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use sparky_core::config::AppConfig;

    use super::{default_base_url, render_reply, ChatClient, ChatReply};

    #[tokio::test]
    async fn unreachable_server_yields_fallback_reply() {
        let client = ChatClient::new("http://127.0.0.1:9/", "cli-test", "Please call 0448 195 614")
            .expect("client");

        let reply = client.send("hello").await;

        assert_eq!(reply.response, "Please call 0448 195 614");
        assert!(reply.quick_replies.is_empty());
    }

    #[test]
    fn wildcard_bind_address_is_dialled_on_loopback() {
        let mut config = AppConfig::default();
        config.server.bind_address = "0.0.0.0".to_string();
        config.server.port = 8123;

        assert_eq!(default_base_url(&config), "http://127.0.0.1:8123");
    }

    #[test]
    fn quick_replies_render_under_the_reply() {
        let reply = ChatReply {
            response: "What's your name?".to_string(),
            quick_replies: vec!["Get a free quote".to_string(), "Call now".to_string()],
            state: Some("COLLECTING_NAME".to_string()),
            action: Some("collect_name".to_string()),
        };

        assert_eq!(
            render_reply(&reply),
            "bot> What's your name?\n     [Get a free quote] [Call now]"
        );
    }
}
