//! quill-cli – terminal client for the quill chat server.
//!
//! Logs in by email, streams assistant replies fragment by fragment, and
//! keeps the transcript by folding every stream event through the same pure
//! reducer the protocol tests use.  Ctrl-C during generation cancels the
//! in-flight turn (the server finalizes it as `INTERRUPTED`); Ctrl-C at the
//! prompt exits.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;

use quill_client::api::ChatRequest;
use quill_client::reducer::PLACEHOLDER_PREFIX;
use quill_client::{
    QuillClient, ReadOutcome, TranscriptMessage, apply_event, placeholder_user, read_stream,
};
use quill_proto::{MessageStatus, Sender, StreamEvent};

#[derive(Parser, Debug)]
#[command(name = "quill-cli", version, about = "Chat with a quill server from the terminal")]
struct Args {
    /// Server root URL.
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Email to log in with (prompted when omitted).
    #[arg(long)]
    email: Option<String>,

    /// Model id (defaults to the first catalog entry).
    #[arg(long)]
    model: Option<String>,

    /// Continue an existing chat by id.
    #[arg(long)]
    chat: Option<String>,
}

struct App {
    client: QuillClient,
    user_id: String,
    model_id: String,
    chat_id: Option<String>,
    transcript: Vec<TranscriptMessage>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = QuillClient::new(&args.server);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let email = match args.email {
        Some(email) => email,
        None => prompt(&mut lines, "email: ").await?,
    };
    let user = client.login(email.trim()).await?;
    println!("logged in as {}", user.email);

    let models = client.models().await?;
    let model_id = match args.model {
        Some(id) if models.iter().any(|m| m.id == id) => id,
        Some(id) => anyhow::bail!(
            "unknown model '{id}'; server offers: {}",
            models.iter().map(|m| m.id.as_str()).collect::<Vec<_>>().join(", ")
        ),
        None => {
            models
                .first()
                .context("server offers no models")?
                .id
                .clone()
        }
    };
    println!("model: {model_id}  (type /help for commands)");

    let mut app = App {
        client,
        user_id: user.id,
        model_id,
        chat_id: args.chat,
        transcript: Vec::new(),
    };
    if app.chat_id.is_some() {
        app.load_history().await?;
    }

    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !app.handle_line(line.trim()).await {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }
    println!("bye");
    Ok(())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> anyhow::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    lines
        .next_line()
        .await?
        .context("stdin closed before input")
}

impl App {
    /// Returns `false` when the REPL should exit.
    async fn handle_line(&mut self, line: &str) -> bool {
        match line {
            "" => true,
            "/quit" | "/exit" => false,
            "/help" => {
                println!(
                    "/models        list models\n\
                     /model <id>    switch model\n\
                     /history       reload the chat transcript from the server\n\
                     /star <n>      star message n of the transcript\n\
                     /unstar <n>    remove the star from message n\n\
                     /starred       list starred messages\n\
                     /quit          exit"
                );
                true
            }
            "/models" => {
                match self.client.models().await {
                    Ok(models) => {
                        for m in models {
                            let marker = if m.id == self.model_id { "*" } else { " " };
                            println!("{marker} {}  ({}, {})", m.id, m.name, m.provider);
                        }
                    }
                    Err(e) => eprintln!("error: {e}"),
                }
                true
            }
            "/history" => {
                if let Err(e) = self.load_history().await {
                    eprintln!("error: {e}");
                }
                true
            }
            "/starred" => {
                match self.client.starred(&self.user_id).await {
                    Ok(starred) if starred.is_empty() => println!("no starred messages"),
                    Ok(starred) => {
                        for s in starred {
                            println!("[{}] {}: {}", s.starred_at, s.message.sender, s.message.content);
                        }
                    }
                    Err(e) => eprintln!("error: {e}"),
                }
                true
            }
            _ if line.starts_with("/model ") => {
                self.switch_model(line.trim_start_matches("/model ").trim()).await;
                true
            }
            _ if line.starts_with("/star ") => {
                self.toggle_star(line.trim_start_matches("/star ").trim(), true).await;
                true
            }
            _ if line.starts_with("/unstar ") => {
                self.toggle_star(line.trim_start_matches("/unstar ").trim(), false).await;
                true
            }
            _ if line.starts_with('/') => {
                eprintln!("unknown command: {line} (try /help)");
                true
            }
            message => {
                if let Err(e) = self.send_turn(message).await {
                    eprintln!("error: {e}");
                }
                true
            }
        }
    }

    /// One full chat turn: optimistic placeholder, stream, reduce, settle.
    async fn send_turn(&mut self, text: &str) -> anyhow::Result<()> {
        self.transcript
            .push(placeholder_user(text, self.chat_id.as_deref()));

        let request = ChatRequest {
            chat_id: self.chat_id.clone(),
            message: text.to_owned(),
            user_id: self.user_id.clone(),
            model_id: self.model_id.clone(),
        };
        let response = match self.client.start_chat_stream(&request).await {
            Ok(response) => response,
            Err(e) => {
                // The turn never started; take the placeholder back out.
                self.transcript
                    .retain(|m| !m.id.starts_with(PLACEHOLDER_PREFIX));
                return Err(e.into());
            }
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        print!("ai> ");
        std::io::stdout().flush()?;

        let mut transcript = std::mem::take(&mut self.transcript);
        let outcome = {
            let read = read_stream(response, cancel_rx, |event| {
                match event {
                    StreamEvent::Chunk { content, .. } => {
                        print!("{content}");
                        let _ = std::io::stdout().flush();
                    }
                    StreamEvent::Interrupt { .. } => println!("\n[interrupted]"),
                    StreamEvent::Error { error } => println!("\n[generation failed: {error}]"),
                    StreamEvent::Done => println!(),
                }
                transcript = apply_event(std::mem::take(&mut transcript), event);
            });
            tokio::pin!(read);
            loop {
                tokio::select! {
                    result = &mut read => break result,
                    _ = tokio::signal::ctrl_c() => {
                        // Cancel the turn, not the program; the read loop
                        // returns Cancelled on the next poll.
                        let _ = cancel_tx.send(true);
                    }
                }
            }
        };

        match outcome {
            Ok(ReadOutcome::Cancelled) => {
                // The connection was dropped before the server's interrupt
                // event arrived; settle the local copy the same way the
                // server settles the durable one.
                if let Some(message) = transcript
                    .iter_mut()
                    .rev()
                    .find(|m| m.sender == Sender::Ai && m.status == MessageStatus::Pending)
                {
                    message.status = MessageStatus::Interrupted;
                }
                println!("\n[interrupted]");
            }
            Ok(ReadOutcome::Finished) => {}
            Err(e) => eprintln!("\nstream error: {e}"),
        }

        // A lazily-created chat becomes addressable after the first chunk.
        if self.chat_id.is_none() {
            if let Some(message) = transcript.iter().rev().find(|m| m.sender == Sender::Ai) {
                self.chat_id = Some(message.chat_id.clone());
            }
        }
        self.transcript = transcript;
        Ok(())
    }

    async fn switch_model(&mut self, id: &str) {
        match self.client.models().await {
            Ok(models) if models.iter().any(|m| m.id == id) => {
                self.model_id = id.to_owned();
                println!("model: {id}");
            }
            Ok(_) => eprintln!("unknown model: {id}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    async fn load_history(&mut self) -> anyhow::Result<()> {
        let Some(chat_id) = self.chat_id.clone() else {
            println!("no chat yet; send a message first");
            return Ok(());
        };
        let messages = self.client.messages(&chat_id).await?;
        self.transcript = messages.into_iter().map(Into::into).collect();
        for (i, m) in self.transcript.iter().enumerate() {
            let who = match m.sender {
                Sender::User => "you",
                Sender::Ai => "ai",
            };
            let suffix = match m.status {
                MessageStatus::Interrupted => " [interrupted]",
                MessageStatus::Failed => " [failed]",
                MessageStatus::Pending => " [pending]",
                MessageStatus::Completed => "",
            };
            println!("{:>3}. {who}> {}{suffix}", i + 1, m.content);
        }
        Ok(())
    }

    /// Star/unstar message `n` (1-based index into the transcript).
    async fn toggle_star(&self, index: &str, starred: bool) {
        let Ok(index) = index.parse::<usize>() else {
            eprintln!("usage: /star <n>");
            return;
        };
        let Some(message) = index.checked_sub(1).and_then(|i| self.transcript.get(i)) else {
            eprintln!("no message {index} in the transcript (try /history)");
            return;
        };
        if message.id.starts_with(PLACEHOLDER_PREFIX) {
            eprintln!("message {index} is not persisted yet");
            return;
        }
        match self
            .client
            .set_star(&message.id, &self.user_id, starred)
            .await
        {
            Ok(()) => println!("{}", if starred { "starred" } else { "unstarred" }),
            Err(e) => eprintln!("error: {e}"),
        }
    }
}
