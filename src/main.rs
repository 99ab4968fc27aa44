use anyhow::{Context, Result};
use clap::Parser;
use ocr_chat::chat_api::{ChatClient, ChatConfig};
use ocr_chat::gui::run_gui;
use ocr_chat::prompt::PromptProfile;
use ocr_chat::render::Renderer;
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the chat-completion API
    #[arg(long, default_value = "https://api.openai.com")]
    host: String,

    /// Model identifier sent with every request
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Bearer credential for the API
    #[arg(long, env = "OCR_CHAT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Prompt profile (instruction template, temperature, output length)
    #[arg(long, value_enum, default_value_t = PromptProfile::Detailed)]
    profile: PromptProfile,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_seconds: u64,

    /// Text file produced by the OCR step
    #[arg(long)]
    source: Option<String>,

    /// Force CLI mode (the GUI is launched otherwise)
    #[arg(long, default_value_t = false)]
    cli: bool,

    /// Print the CLI answer as sanitized HTML instead of markdown
    #[arg(long, default_value_t = false)]
    html: bool,

    /// Question (optional: when given, runs a single CLI request)
    prompt: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = ChatConfig {
        host: args.host,
        model: args.model,
        api_key: args.api_key,
        timeout_seconds: args.timeout_seconds,
    };

    let (source_text, source_label) = match args.source.as_deref() {
        Some(path) => (load_source(Path::new(path))?, path.to_string()),
        None => (String::new(), "No document".to_string()),
    };

    if args.cli || args.prompt.is_some() {
        let prompt = args
            .prompt
            .context("CLI mode: a question must be provided")?;
        run_cli(config, args.profile, &source_text, &prompt, args.html)
    } else {
        run_gui(config, args.profile, source_text, source_label)
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_source(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Unable to read OCR text: {}", path.display()))?;
    tracing::info!(path = %path.display(), chars = text.chars().count(), "source text loaded");
    Ok(text)
}

fn run_cli(
    config: ChatConfig,
    profile: PromptProfile,
    source_text: &str,
    prompt: &str,
    html: bool,
) -> Result<()> {
    if source_text.trim().is_empty() {
        anyhow::bail!("CLI mode: no OCR text available, pass --source <file>");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Unable to create the async runtime")?;
    let client = ChatClient::new(config)?;

    match runtime.block_on(client.ask(profile, source_text, prompt)) {
        Ok(answer) if html => println!("{}", Renderer::default().assistant_html(&answer)),
        Ok(answer) => println!("{answer}"),
        Err(err) => {
            eprintln!("{}", err.transcript_text());
            std::process::exit(1);
        }
    }

    Ok(())
}
