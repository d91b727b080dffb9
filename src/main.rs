use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use loqa_transcribe::{
    AuthorizationStatus, Config, FileCapture, PreviewClient, PreviewScript, Recorder,
    SessionEngine, TranscriptRecognizer, TranscriptionClient,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "loqa-transcribe", about = "Live transcription session demo")]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/loqa-transcribe")]
    config: String,

    /// Override the preview text
    #[arg(long)]
    text: Option<String>,

    /// Override the delay between preview words
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Print each result as a JSON line instead of live text
    #[arg(long)]
    json: bool,

    /// Simulate a user who denied speech recognition
    #[arg(long)]
    deny: bool,

    /// Replay a 16-bit PCM WAV file through the session engine
    #[arg(long)]
    wav: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load_or_default(&args.config)?;

    info!("Loqa Transcribe v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    if let Some(path) = &args.wav {
        return replay_wav(&cfg, path, args.text.as_deref()).await;
    }

    let script = PreviewScript::Words {
        text: args.text.unwrap_or(cfg.preview.text.clone()),
        interval: args
            .interval_ms
            .map(std::time::Duration::from_millis)
            .unwrap_or_else(|| cfg.preview.word_interval()),
    };
    let authorization = if args.deny {
        AuthorizationStatus::Denied
    } else {
        AuthorizationStatus::Authorized
    };
    let client = Arc::new(PreviewClient::new(authorization, script));

    if args.json {
        return print_json(client.as_ref()).await;
    }

    let recorder = Arc::new(Recorder::new(client));
    let mut updates = recorder.subscribe();

    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            print!("\r{}", state.transcribed_text);
            std::io::stdout().flush().ok();
        }
    });

    let running = Arc::clone(&recorder);
    let session = tokio::spawn(async move { running.start().await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping recording");
            recorder.stop().await;
        }
        _ = session => {}
    }

    let state = recorder.snapshot();
    println!();
    if let Some(alert) = state.alert {
        warn!("{}", alert);
    }
    printer.abort();

    Ok(())
}

async fn print_json(client: &dyn TranscriptionClient) -> Result<()> {
    if !client.request_authorization().await.is_authorized() {
        warn!("Speech recognition is not authorized");
        return Ok(());
    }

    let mut stream = client.start_session().await;
    while let Some(item) = stream.next().await {
        println!("{}", serde_json::to_string(&item?)?);
    }
    Ok(())
}

async fn replay_wav(cfg: &Config, path: &str, text: Option<&str>) -> Result<()> {
    let capture = FileCapture::new(path, cfg.capture.clone()).realtime(true);
    // No acoustic model ships with this crate; `--text` is the known transcript
    let recognizer = TranscriptRecognizer::new(text.unwrap_or("(end of file)"));

    let engine = SessionEngine::new(Box::new(capture), Arc::new(recognizer), cfg.session.clone());

    let mut stream = engine.start_session().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                engine.finish_session().await;
            }
            item = stream.next() => match item {
                Some(item) => println!("{}", serde_json::to_string(&item?)?),
                None => break,
            }
        }
    }

    if let Some(stats) = engine.last_session_stats().await {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
