//! Tagwatch gateway binary.
//!
//! Thin wiring only: parse configuration from flags/environment, initialize
//! tracing, run the streaming gateway until interrupted. Supervision and any
//! HTTP surface live outside this process.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tagwatch::settings::{GatewayConfig, ReaderConfig, VerifierMode};
use tagwatch::verifier::DEFAULT_SHARED_SECRET;
use tagwatch::{Gateway, Result};

#[derive(Debug, Parser)]
#[command(name = "tagwatch", about = "RFID tag-authentication gateway")]
struct Cli {
    /// Base URL of the reader, e.g. http://reader.local
    #[arg(long, env = "READER_BASE_URL")]
    reader_base_url: String,

    /// HTTP basic-auth username for the reader feed
    #[arg(long, env = "READER_USER", default_value = "")]
    reader_user: String,

    /// HTTP basic-auth password for the reader feed
    #[arg(long, env = "READER_PASSWORD", default_value = "")]
    reader_password: String,

    /// Grace period in seconds before an unobserved tag is evicted
    #[arg(long, env = "TAGWATCH_GRACE_SECONDS", default_value_t = 3.0)]
    grace_seconds: f64,

    /// TTL in hours for cached authentication verdicts
    #[arg(long, env = "TAGWATCH_CACHE_TTL_HOURS", default_value_t = 24)]
    cache_ttl_hours: u64,

    /// Endpoint of the remote verification service; the simulated verifier
    /// is used when omitted
    #[arg(long, env = "TAGWATCH_VERIFIER_ENDPOINT")]
    verifier_endpoint: Option<String>,

    /// Shared secret for the simulated verifier
    #[arg(long, env = "TAGWATCH_SHARED_SECRET", default_value = DEFAULT_SHARED_SECRET)]
    shared_secret: String,
}

impl Cli {
    fn into_config(self) -> GatewayConfig {
        GatewayConfig {
            reader: ReaderConfig {
                base_url: self.reader_base_url,
                username: self.reader_user,
                password: self.reader_password,
            },
            grace_seconds: self.grace_seconds,
            cache_ttl_hours: self.cache_ttl_hours,
            verifier: match self.verifier_endpoint {
                Some(endpoint) => VerifierMode::Http { endpoint },
                None => VerifierMode::Simulated,
            },
            shared_secret: self.shared_secret,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let gateway = Gateway::new(cli.into_config())?;

    gateway.start_stream().await?;
    info!("Gateway running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    gateway.stop_stream().await
}
