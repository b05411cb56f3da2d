use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use adaptive_timesync::server::SampleLogger;
use adaptive_timesync::{FilterConfig, ProbeClient, Scheme, ServerConfig, TimesyncServer};

#[derive(Parser)]
#[command(name = "timesync-server")]
#[command(about = "Adaptive clock offset correction over UDP", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server
    Serve(ServeArgs),
    /// Send probes to a running server and print the corrections
    Probe(ProbeArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(short, long, default_value = "0.0.0.0:9999")]
    bind: String,

    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    #[arg(long, default_value_t = 256, help = "Receive buffer size in bytes")]
    buffer_size: usize,

    #[arg(long, default_value_t = 60, help = "Evict clients idle for this many seconds")]
    idle_timeout: u64,

    #[arg(long, default_value_t = 0.25, help = "EWMA smoothing factor, in (0, 1)")]
    alpha: f64,

    #[arg(long, default_value_t = 1.0, help = "Kalman process noise Q")]
    process_noise: f64,

    #[arg(long, default_value_t = 25.0, help = "Kalman measurement noise R")]
    measurement_noise: f64,

    #[arg(long, default_value_t = 1.0, help = "Kalman initial covariance")]
    initial_covariance: f64,

    #[arg(long, default_value_t = 0.6)]
    kp: f64,

    #[arg(long, default_value_t = 0.05)]
    ki: f64,

    #[arg(long, default_value_t = 0.001)]
    kd: f64,

    #[arg(long, default_value_t = 500_000.0, help = "PID integral clamp (symmetric)")]
    integral_limit: f64,

    #[arg(long, help = "Log every handled probe on target timesync::sample")]
    log_samples: bool,
}

#[derive(Args)]
struct ProbeArgs {
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    server: SocketAddr,

    #[arg(long, default_value = "kalman", help = "raw, ewma, kalman or pid")]
    scheme: Scheme,

    #[arg(short, long, default_value_t = 10)]
    count: u32,

    #[arg(long, default_value_t = 500, help = "Delay between probes in ms")]
    interval_ms: u64,

    #[arg(long, default_value_t = 2000, help = "Response timeout in ms")]
    timeout_ms: u64,
}

impl ServeArgs {
    fn config(&self) -> Result<ServerConfig, adaptive_timesync::ConfigError> {
        let mut filters = FilterConfig::default()
            .alpha(self.alpha)
            .kalman_noise(self.process_noise, self.measurement_noise)
            .pid_gains(self.kp, self.ki, self.kd);
        filters.kalman.initial_covariance = self.initial_covariance;
        filters.pid.integral_min = -self.integral_limit;
        filters.pid.integral_max = self.integral_limit;

        let mut config = ServerConfig::with_bind_addr(&self.bind)?
            .workers(self.workers)
            .idle_timeout(Duration::from_secs(self.idle_timeout))
            .filters(filters);
        config.recv_buf_size = self.buffer_size;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("adaptive_timesync=info,timesync::sample=info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(&args).await,
        Command::Probe(args) => probe(&args).await,
    }
}

async fn serve(args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let server = TimesyncServer::bind(args.config()?).await?;

    let logger = args
        .log_samples
        .then(|| SampleLogger::spawn(server.telemetry(), server.shutdown_signal()));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Interrupt received");
        }
        () = server.stopped() => {}
    }

    let counters = server.stats_handle();
    let result = server.shutdown().await;
    let stats = counters.snapshot();
    if let Some(logger) = logger {
        let logged = logger.await?;
        tracing::info!(samples = logged, "Sample logger stopped");
    }
    tracing::info!(
        received = stats.received,
        responded = stats.responded,
        malformed = stats.malformed,
        send_failures = stats.send_failures,
        "Final counters"
    );
    Ok(result?)
}

async fn probe(args: &ProbeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = ProbeClient::connect(args.server)
        .await?
        .timeout(Duration::from_millis(args.timeout_ms));
    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms));

    println!("seq  scheme  correction_us  raw_offset_us  rtt_us");
    for sequence in 1..=args.count {
        ticker.tick().await;
        match client.probe(args.scheme, sequence).await {
            Ok(reply) => {
                let raw = reply
                    .packet
                    .raw_offset_us
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                println!(
                    "{sequence:<4} {:<7} {:>13}  {raw:>13}  {:>6}",
                    reply.packet.scheme,
                    reply.packet.correction_us,
                    reply.round_trip.as_micros()
                );
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => println!("{sequence:<4} {e}"),
        }
    }
    Ok(())
}
