mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use skein_core::impls::{InMemoryAdapter, SignalLoop};
use skein_core::ports::{Loop, QueueHandle};
use skein_core::worker::{HandlerRegistry, MessageHandler, RegistryWorker};
use skein_core::{Message, Queue, QueueConfig, QueueError};

#[derive(Parser, Debug)]
#[command(name = "skein", about = "Skein queue demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push demo messages and drain them once.
    Run {
        /// Handle at most this many messages (0 = all).
        #[arg(long)]
        max: Option<usize>,

        #[arg(long, default_value_t = 5)]
        messages: usize,

        /// Queue config (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Push demo messages and keep consuming until stopped.
    Listen {
        #[arg(long, default_value_t = 5)]
        messages: usize,

        /// Stop automatically after this many milliseconds.
        #[arg(long)]
        stop_after_ms: Option<u64>,

        /// Queue config (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// "greet" handler: payload の name を挨拶する
/// name が無い payload は失敗扱い
#[derive(Default)]
struct GreetHandler {
    greeted: AtomicUsize,
}

#[async_trait]
impl MessageHandler for GreetHandler {
    async fn handle(&self, message: &Message, _queue: &dyn QueueHandle) -> Result<(), QueueError> {
        let name = message
            .payload()
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| QueueError::handler(message.name(), "payload has no name"))?;

        let n = self.greeted.fetch_add(1, Ordering::Relaxed) + 1;
        info!(id = ?message.id(), greeted = n, "Hello, {name}!");
        Ok(())
    }
}

fn registry() -> anyhow::Result<Arc<HandlerRegistry>> {
    let mut registry = HandlerRegistry::new();
    registry.register("greet", Arc::new(GreetHandler::default()))?;
    Ok(Arc::new(registry))
}

/// 最後の 1 件は name 無し（Failed になるのを見せるため）
async fn push_demo_messages(queue: &Queue, count: usize) -> anyhow::Result<()> {
    for i in 0..count {
        let payload = if i + 1 == count && count > 1 {
            json!({})
        } else {
            json!({ "name": format!("guest-{i}") })
        };
        let pushed = queue.push(Message::new("greet", payload)).await?;
        info!(id = ?pushed.id(), "pushed");
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<QueueConfig> {
    match path {
        Some(path) => QueueConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(QueueConfig::default()),
    }
}

async fn run(max: Option<usize>, messages: usize, config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config.as_deref())?;
    let max = max.unwrap_or(config.run_max);

    let run_loop = Arc::new(SignalLoop::new());
    let _signals = run_loop.watch_signals();

    let adapter = Arc::new(InMemoryAdapter::new().with_poll_interval(config.poll_interval()));
    let queue = Queue::builder()
        .adapter(adapter.clone())
        .worker(Arc::new(RegistryWorker::new(registry()?)))
        .run_loop(run_loop)
        .config(&config)
        .build()?;

    push_demo_messages(&queue, messages).await?;

    match queue.run(max).await {
        Ok(handled) => info!(handled, max, "drain finished"),
        Err(e) => warn!(error = %e, "drain stopped on error"),
    }

    println!("{}", serde_json::to_string(&adapter.counts().await)?);
    Ok(())
}

async fn listen(messages: usize, stop_after_ms: Option<u64>, config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config.as_deref())?;

    let run_loop = Arc::new(SignalLoop::new());
    let _signals = run_loop.watch_signals();
    let stop = run_loop.stop_handle();

    let adapter = Arc::new(
        InMemoryAdapter::new()
            .with_loop(run_loop.clone() as Arc<dyn Loop>)
            .with_poll_interval(config.poll_interval()),
    );
    let queue = Arc::new(
        Queue::builder()
            .adapter(adapter.clone())
            .worker(Arc::new(RegistryWorker::new(registry()?)))
            .run_loop(run_loop)
            .config(&config)
            .build()?,
    );

    push_demo_messages(&queue, messages).await?;

    if let Some(ms) = stop_after_ms {
        tokio::spawn(async move {
            sleep(Duration::from_millis(ms)).await;
            stop.stop();
        });
    }

    info!("listening (Ctrl-C to stop)");
    loop {
        match queue.listen().await {
            Ok(()) => break,
            // handler の失敗で subscribe が抜けたら再開する
            Err(e) => warn!(error = %e, "listen interrupted, resuming"),
        }
    }

    println!("{}", serde_json::to_string(&adapter.counts().await)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Run { max, messages, config } => run(max, messages, config).await,
        Command::Listen {
            messages,
            stop_after_ms,
            config,
        } => listen(messages, stop_after_ms, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_accepts_a_config_file() {
        let cli = Cli::try_parse_from(["skein", "listen", "--config", "queue.toml", "--stop-after-ms", "50"]).unwrap();
        match cli.command {
            Command::Listen { config, stop_after_ms, .. } => {
                assert_eq!(config, Some(PathBuf::from("queue.toml")));
                assert_eq!(stop_after_ms, Some(50));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn missing_config_path_means_defaults() {
        assert_eq!(load_config(None).unwrap(), QueueConfig::default());
    }

    #[test]
    fn unreadable_config_names_the_path() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
