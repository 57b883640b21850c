use anyhow::{Context, Result};
use clap::Parser;
use twinsnap::capture::{CaptureConfig, CaptureScheduler, RetryPolicy, DEFAULT_ROI};
use twinsnap::driver::NokhwaDriver;
use twinsnap::server::{ImageServer, ReplyFormat, ReplySocket};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the reply endpoint binds to
    #[arg(short, long, default_value = "0.0.0.0:5555")]
    bind: String,

    /// Directory capture files are written to
    #[arg(short, long, default_value = "images")]
    output_dir: String,

    /// Freeze attempts per capture; 0 retries until success
    #[arg(long, default_value_t = 0)]
    retry_attempts: u32,

    /// Restrict capture to the fixed sensor region of interest
    #[arg(long)]
    roi: bool,

    /// Frame replies as msgpack [bytes, width, height] instead of raw bytes
    #[arg(long)]
    framed: bool,

    /// Capture this many images and exit instead of serving
    #[arg(long)]
    once: Option<u32>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Twinsnap starting");

    let retry = match args.retry_attempts {
        0 => RetryPolicy::UntilSuccess,
        1 => RetryPolicy::SingleAttempt,
        attempts => RetryPolicy::Bounded { attempts },
    };

    let config = CaptureConfig {
        output_dir: args.output_dir.clone().into(),
        retry: if args.once.is_some() && args.retry_attempts == 0 {
            // Standalone captures default to a single attempt; looping
            // forever only makes sense when a client is owed a reply.
            RetryPolicy::SingleAttempt
        } else {
            retry
        },
        roi: args.roi.then_some(DEFAULT_ROI),
        ..CaptureConfig::default()
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory {}", args.output_dir))?;

    let mut scheduler = CaptureScheduler::initialize(NokhwaDriver::new(), config)
        .context("Failed to initialize cameras")?;

    if let Some(count) = args.once {
        for _ in 0..count {
            let image = scheduler.capture().context("Capture failed")?;
            tracing::info!(
                "Captured {} ({} bytes)",
                image.path.display(),
                image.bytes.len()
            );
        }
        return Ok(());
    }

    let socket = ReplySocket::bind(&args.bind)
        .with_context(|| format!("Failed to bind reply endpoint {}", args.bind))?;
    tracing::info!("Serving images on {}", args.bind);

    let format = if args.framed {
        ReplyFormat::Framed
    } else {
        ReplyFormat::Raw
    };

    ImageServer::new(socket, scheduler, format).serve_forever()
}
