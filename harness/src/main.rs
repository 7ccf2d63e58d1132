use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tool_harness::config::HarnessFileConfig;
use tool_harness::host::ResearchHost;
use tool_harness::llm::OpenAiClient;
use tool_harness::mcp::{Endpoint, JsonObject, SessionRegistry, StdioConnector};
use tool_harness::output::default_output;

/// Queries used by the suite's first experiment
const SUITE_QUERIES: [&str; 3] = [
    "Find information about USDT",
    "Search for the latest financial news, limiting the results to 5 items, sorted from newest to oldest",
    "Get system status",
];

const SUITE_SYSTEM_PROMPT: &str = "You are a professional tool selection assistant";

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Measure how tool schemas affect LLM tool selection over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Chat-completions base URL (overrides .harness.toml)
    #[arg(long, env = "HARNESS_BASE_URL")]
    base_url: Option<String>,

    /// Model to use (overrides .harness.toml)
    #[arg(long, env = "HARNESS_MODEL")]
    model: Option<String>,

    /// Explicit config file instead of searching for .harness.toml
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to servers and list their tools with schemas
    Tools {
        /// Server launch string (repeatable)
        #[arg(long = "endpoint", short = 'e')]
        endpoints: Vec<String>,
    },
    /// Run one tool-selection experiment
    Run {
        /// User query sent to the model
        query: String,
        /// Server launch string (repeatable)
        #[arg(long = "endpoint", short = 'e')]
        endpoints: Vec<String>,
        /// System prompt sent before the query
        #[arg(long, short)]
        system: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the demo experiments against the bundled servers
    Suite {
        /// System prompt sent before each query
        #[arg(long, short, default_value = SUITE_SYSTEM_PROMPT)]
        system: String,
    },
    /// Call a tool directly (debugging only, not an experiment)
    Call {
        /// Tool name
        tool: String,
        /// Server launch string
        #[arg(long = "endpoint", short = 'e')]
        endpoint: String,
        /// Arguments as a JSON object
        #[arg(long, short)]
        args: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so RUST_LOG and HF_TOKEN can come from it
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HarnessFileConfig::load_from_path(path)?,
        None => HarnessFileConfig::load()?,
    };

    // Only experiments reach the model, so only they require the credential
    let token = match cli.command {
        Commands::Run { .. } | Commands::Suite { .. } => config.resolve_token()?,
        Commands::Tools { .. } | Commands::Call { .. } => {
            config.resolve_token().unwrap_or_default()
        }
    };

    let base_url = cli.base_url.as_deref().unwrap_or(&config.llm.base_url);
    let model = cli.model.as_deref().unwrap_or(&config.llm.model);
    let llm = OpenAiClient::new(base_url, &token, model);

    let registry = SessionRegistry::new(Arc::new(StdioConnector::new()), config.timeouts());
    let mut host = ResearchHost::new(registry, Arc::new(llm))
        .with_system_prompt(config.experiment.system_prompt.clone())
        .with_default_endpoints(config.endpoints())
        .with_output(default_output());

    let outcome = tokio::select! {
        result = execute(&mut host, cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted by user");
            Ok(())
        }
    };

    host.shutdown().await;
    outcome
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("harness=info,tool_harness=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn execute(host: &mut ResearchHost, command: Commands) -> Result<()> {
    match command {
        Commands::Tools { endpoints } => run_tools(host, endpoints).await,
        Commands::Run {
            query,
            endpoints,
            system,
            json,
        } => run_experiment(host, &query, endpoints, system, json).await,
        Commands::Suite { system } => run_suite(host, system).await,
        Commands::Call {
            tool,
            endpoint,
            args,
        } => run_call_tool(host, &endpoint, &tool, args).await,
    }
}

fn to_endpoints(launches: Vec<String>) -> Option<Vec<Endpoint>> {
    if launches.is_empty() {
        None
    } else {
        Some(launches.into_iter().map(Endpoint::from).collect())
    }
}

async fn run_tools(host: &mut ResearchHost, endpoints: Vec<String>) -> Result<()> {
    let endpoints = match to_endpoints(endpoints) {
        Some(endpoints) => endpoints,
        None => host.default_endpoints().to_vec(),
    };

    let failures = host.list_endpoint_tools(&endpoints).await;
    if !endpoints.is_empty() && failures.len() == endpoints.len() {
        anyhow::bail!("no MCP server could be reached");
    }
    Ok(())
}

async fn run_experiment(
    host: &mut ResearchHost,
    query: &str,
    endpoints: Vec<String>,
    system: Option<String>,
    json: bool,
) -> Result<()> {
    if system.is_some() {
        host.set_system_prompt(system);
    }

    let endpoints = to_endpoints(endpoints);
    let record = host.run_experiment(query, endpoints.as_deref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        host.print_result(&record);
    }
    Ok(())
}

async fn run_suite(host: &mut ResearchHost, system: String) -> Result<()> {
    host.set_system_prompt(Some(system));

    let probe = Endpoint::sibling_binary("probe-mcp");
    let experiment = Endpoint::sibling_binary("experiment-mcp");

    println!("\n=== Example1: default server ===");
    for query in SUITE_QUERIES {
        let record = host.run_experiment(query, Some(&[probe.clone()])).await?;
        host.print_result(&record);
    }

    println!("\n=== Example2: selected server ===");
    let record = host
        .run_experiment(SUITE_QUERIES[0], Some(&[experiment.clone()]))
        .await?;
    host.print_result(&record);

    println!("\n=== Example3: multiple server ===");
    let record = host
        .run_experiment(SUITE_QUERIES[0], Some(&[probe, experiment]))
        .await?;
    host.print_result(&record);

    Ok(())
}

async fn run_call_tool(
    host: &mut ResearchHost,
    endpoint: &str,
    tool: &str,
    args: Option<String>,
) -> Result<()> {
    let arguments: JsonObject = match args {
        Some(raw) => serde_json::from_str(&raw).context("--args must be a JSON object")?,
        None => JsonObject::new(),
    };

    let invocation = host
        .call_tool(&Endpoint::from(endpoint), tool, arguments)
        .await?;

    println!("{}", invocation.text());
    if invocation.is_error {
        anyhow::bail!("tool '{}' reported an error", tool);
    }
    Ok(())
}
