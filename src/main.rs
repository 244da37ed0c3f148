use chunkpay::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MIN_BACKOFF, DEFAULT_PROBE_AMOUNT, DEFAULT_TRANSFER_TIMEOUT,
};
use chunkpay::infrastructure::loopback::LoopbackTransport;
use chunkpay::logging::{LogFormat, init_logging};
use chunkpay::{
    Amount, DeliverRequest, PaymentConfig, PaymentEngine, QuoteRequest, RegressionPolicy,
    SendRequest, SharedSecret,
};
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::time::Duration;

/// Quote and send chunked payments over a simulated in-process path.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the path for the other side of a payment
    Quote {
        #[arg(long, conflicts_with = "destination_amount")]
        source_amount: Option<Amount>,
        #[arg(long)]
        destination_amount: Option<Amount>,
        #[command(flatten)]
        path: PathArgs,
    },
    /// Send a fixed source amount
    Send {
        #[arg(long)]
        source_amount: Amount,
        #[command(flatten)]
        path: PathArgs,
    },
    /// Deliver a fixed destination amount
    Deliver {
        #[arg(long)]
        destination_amount: Amount,
        #[command(flatten)]
        path: PathArgs,
    },
}

#[derive(Args)]
struct PathArgs {
    /// Hex-encoded shared secret (at least 32 bytes). Random if omitted.
    #[arg(long)]
    shared_secret: Option<String>,

    #[arg(long, default_value = "receiver")]
    destination: String,

    /// Exchange rate applied by the simulated path
    #[arg(long, default_value = "1")]
    rate: Decimal,

    /// Largest transfer the simulated path carries; larger ones get T04
    #[arg(long)]
    max_packet_amount: Option<Amount>,

    #[arg(long, default_value_t = Amount::from(DEFAULT_CHUNK_SIZE))]
    initial_chunk_size: Amount,

    /// Probe size when quoting by destination amount
    #[arg(long, default_value_t = Amount::from(DEFAULT_PROBE_AMOUNT))]
    probe_amount: Amount,

    #[arg(long, default_value_t = DEFAULT_MIN_BACKOFF.as_millis() as u64)]
    min_backoff_ms: u64,

    /// Expiry set on every transfer, in seconds
    #[arg(long, default_value_t = DEFAULT_TRANSFER_TIMEOUT.as_secs())]
    transfer_timeout_secs: u64,

    /// Give up after this many rejected attempts in a row
    #[arg(long, default_value_t = 50)]
    max_retries: u32,

    /// Give up after this many seconds
    #[arg(long)]
    max_duration_secs: Option<u64>,

    /// Abort if the receiver reports less than it did before
    #[arg(long)]
    strict_claims: bool,
}

impl PathArgs {
    fn secret(&self) -> Result<SharedSecret> {
        match &self.shared_secret {
            Some(encoded) => SharedSecret::from_hex(encoded).into_diagnostic(),
            None => Ok(SharedSecret::random()),
        }
    }

    fn engine(&self, secret: &SharedSecret) -> PaymentEngine {
        let mut transport = LoopbackTransport::new(secret.clone(), self.rate);
        if let Some(limit) = self.max_packet_amount {
            transport = transport.with_max_packet_amount(limit);
        }
        let config = PaymentConfig::default()
            .with_initial_chunk_size(self.initial_chunk_size)
            .with_probe_amount(self.probe_amount)
            .with_min_backoff(Duration::from_millis(self.min_backoff_ms))
            .with_transfer_timeout(Duration::from_secs(self.transfer_timeout_secs))
            .with_max_consecutive_rejections(Some(self.max_retries))
            .with_max_duration(self.max_duration_secs.map(Duration::from_secs))
            .with_regression_policy(if self.strict_claims {
                RegressionPolicy::Fail
            } else {
                RegressionPolicy::Ignore
            });
        PaymentEngine::new(Box::new(transport)).with_config(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format).into_diagnostic()?;

    let output = match cli.command {
        Command::Quote {
            source_amount,
            destination_amount,
            path,
        } => {
            let secret = path.secret()?;
            let request = QuoteRequest::from_amounts(
                source_amount,
                destination_amount,
                secret.clone(),
                path.destination.clone(),
            )
            .into_diagnostic()?;
            let quote = path.engine(&secret).quote(request).await.into_diagnostic()?;
            serde_json::to_string(&quote).into_diagnostic()?
        }
        Command::Send {
            source_amount,
            path,
        } => {
            let secret = path.secret()?;
            let request = SendRequest {
                source_amount,
                shared_secret: secret.clone(),
                destination_account: path.destination.clone(),
            };
            let receipt = path.engine(&secret).send(request).await.into_diagnostic()?;
            serde_json::to_string(&receipt).into_diagnostic()?
        }
        Command::Deliver {
            destination_amount,
            path,
        } => {
            let secret = path.secret()?;
            let request = DeliverRequest {
                destination_amount,
                shared_secret: secret.clone(),
                destination_account: path.destination.clone(),
            };
            let receipt = path
                .engine(&secret)
                .deliver(request)
                .await
                .into_diagnostic()?;
            serde_json::to_string(&receipt).into_diagnostic()?
        }
    };

    println!("{output}");
    Ok(())
}
