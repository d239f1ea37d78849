use std::io::Write;

use streamchat_rs::client::ChatClient;
use streamchat_rs::config::{load_config, AppConfig};
use streamchat_rs::error::ChatError;
use streamchat_rs::observability::init_tracing;
use streamchat_rs::protocol::{ChatRequest, Message, Role};
use streamchat_rs::stream::StreamHandler;

fn main() {
    let config = load_config("config.yaml").unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        eprintln!("Please copy 'config.example.yaml' to 'config.yaml' and modify as needed.");
        std::process::exit(1);
    });

    init_tracing(&config.features.log_level);

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: streamchat <prompt>");
        std::process::exit(2);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize Tokio runtime: {e}");
            std::process::exit(1);
        });

    let exit_code = runtime.block_on(run(config, prompt));
    std::process::exit(exit_code);
}

async fn run(config: AppConfig, prompt: String) -> i32 {
    let client = match ChatClient::new(config.service) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build chat client: {e}");
            return 1;
        }
    };

    let request = ChatRequest {
        messages: vec![Message::text(Role::User, prompt)],
    };

    let mut handler = StdoutHandler::default();
    client.chat_stream(&request, &mut handler).await;
    i32::from(handler.errored)
}

/// Prints chunks as they arrive; the terminal analog of the chat view.
#[derive(Default)]
struct StdoutHandler {
    errored: bool,
}

impl StreamHandler for StdoutHandler {
    fn on_chunk(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn on_done(&mut self) {
        println!();
    }

    fn on_error(&mut self, error: &ChatError) {
        eprintln!("Error: {error}");
        self.errored = true;
    }
}
