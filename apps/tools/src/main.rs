use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gateway::{GatewayConfig, HttpGateway, DEFAULT_BASE_URL, DEFAULT_MODEL};
use server_api::{ApiContext, Backend, ChatContext};
use shared::{domain::Language, error::ApiException, protocol::ActionOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coderefine-tools", about = "Run a single CodeRefine action")]
struct Cli {
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, default_value_t = 120)]
    timeout_seconds: u64,
    /// Answer locally instead of calling the hosted model.
    #[arg(long)]
    placeholder: bool,
    /// Write the result to this file as well as stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Refine {
        #[arg(long, default_value = "")]
        language: String,
        file: PathBuf,
    },
    Optimize {
        #[arg(long, default_value = "")]
        language: String,
        file: PathBuf,
    },
    Convert {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        file: PathBuf,
    },
    Analyze {
        #[arg(long, default_value = "")]
        language: String,
        file: PathBuf,
    },
    Chat {
        message: String,
    },
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Command::Languages = cli.command {
        for language in Language::ALL {
            println!("{}\t{}", language.label(), language.extension());
        }
        return Ok(());
    }

    let backend = if cli.placeholder {
        Backend::Placeholder
    } else {
        let gateway = HttpGateway::new(GatewayConfig {
            api_key: cli.api_key.clone(),
            model: cli.model.clone(),
            base_url: cli.base_url.clone(),
            timeout: Duration::from_secs(cli.timeout_seconds),
        })?;
        Backend::Remote(Arc::new(gateway))
    };
    let ctx = ApiContext::new(backend, ChatContext::LatestMessage);
    let session_id = server_api::create_session(&ctx).await.session_id;

    let (output, outcome) = match &cli.command {
        Command::Refine { language, file } => {
            let code = read_source(file)?;
            let response = server_api::refine(&ctx, session_id, &code, language)
                .await
                .map_err(ApiException::from)?;
            (response.output, response.outcome)
        }
        Command::Optimize { language, file } => {
            let code = read_source(file)?;
            let response = server_api::optimize(&ctx, session_id, &code, language)
                .await
                .map_err(ApiException::from)?;
            (response.output, response.outcome)
        }
        Command::Convert { from, to, file } => {
            let code = read_source(file)?;
            let response = server_api::convert(&ctx, session_id, &code, from, to)
                .await
                .map_err(ApiException::from)?;
            (response.output, response.outcome)
        }
        Command::Analyze { language, file } => {
            let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
            let filename = file.file_name().and_then(|name| name.to_str());
            let response = server_api::analyze_file(&ctx, session_id, filename, language, &bytes)
                .await
                .map_err(ApiException::from)?;
            (response.output, response.outcome)
        }
        Command::Chat { message } => {
            let response = server_api::chat(&ctx, session_id, message)
                .await
                .map_err(ApiException::from)?;
            (response.reply, response.outcome)
        }
        Command::Languages => return Ok(()),
    };

    println!("{output}");

    if let Some(path) = &cli.out {
        if outcome == ActionOutcome::Completed {
            fs::write(path, &output).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
    }

    if outcome == ActionOutcome::Completed {
        Ok(())
    } else {
        anyhow::bail!("action did not complete: {outcome:?}")
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
