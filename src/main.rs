use std::net::{IpAddr, Ipv4Addr};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use udp_drive_runtime::output::{JsonLinesOutput, MotorOutput, TracingOutput};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputKind {
    /// Log rendered motor and debug values
    Log,
    /// Write one JSON object per output call to stdout
    Json,
}

/// Two-motor drive runtime controlled over UDP
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Local address to bind the control port on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Where motor commands go
    #[arg(long, value_enum, default_value_t = OutputKind::Log)]
    output: OutputKind,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (set RUST_LOG=debug for per-message output); logs go to stderr
    // so the json output stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let output: Box<dyn MotorOutput> = match args.output {
        OutputKind::Log => Box::new(TracingOutput::new()),
        OutputKind::Json => Box::new(JsonLinesOutput::new(std::io::stdout())),
    };

    if let Err(e) = udp_drive_runtime::runtime::run(args.bind, output).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
