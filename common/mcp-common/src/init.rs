//! Server initialization utilities
//!
//! Tracing setup and the `serve_stdio!` macro used by every tool server.
//! Servers are spawned by the harness with stdout wired to the protocol
//! channel, so all logging goes to stderr.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for a tool server
///
/// Logs to stderr without ANSI colors. `RUST_LOG` refines the filter and the
/// crate itself defaults to `info`. Set `LOG_FORMAT=json` for JSON lines.
pub fn init_tracing(crate_name: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(default_directive(crate_name).parse()?);

    let registry = tracing_subscriber::registry().with(filter);

    if json_logs_requested(std::env::var("LOG_FORMAT").ok().as_deref()) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }

    Ok(())
}

fn default_directive(crate_name: &str) -> String {
    format!("{}=info", crate_name.replace('-', "_"))
}

fn json_logs_requested(format: Option<&str>) -> bool {
    format.is_some_and(|v| v.eq_ignore_ascii_case("json"))
}

/// Generate a `main` that serves a tool server over stdio
///
/// The server type must provide `new()`. The generated `main`:
/// 1. Initializes tracing to stderr
/// 2. Serves the server on stdin/stdout
/// 3. Waits until the client closes the channel
///
/// ```rust,ignore
/// mcp_common::serve_stdio!(ProbeMcpServer, "probe_mcp");
/// ```
#[macro_export]
macro_rules! serve_stdio {
    ($server_type:ty, $crate_name:expr) => {
        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            use rmcp::ServiceExt;

            $crate::init_tracing($crate_name)?;

            tracing::info!(concat!("Starting ", $crate_name, " MCP server"));

            let service = <$server_type>::new()
                .serve(rmcp::transport::stdio())
                .await?;

            let reason = service.waiting().await?;

            tracing::info!(?reason, "Server stopped");
            Ok(())
        }
    };
}
