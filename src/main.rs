use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mecanum_runtime::config::RobotConfig;
use mecanum_runtime::messages::VelocityCommand;
use mecanum_runtime::runtime::{JsonLogSink, MpscCommandSource, Runtime, initialize_drive};
use mecanum_runtime::sim::{MotorModel, simulated_stack};

#[derive(Parser, Debug)]
#[command(about = "Mecanum base control runtime")]
struct Args {
    /// JSON config file overriding the compiled defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against simulated motors instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Stop after this many seconds (runs forever when omitted)
    #[arg(long)]
    duration: Option<f64>,

    /// Constant body velocity command injected in simulation mode
    #[arg(long, default_value_t = 0.0)]
    vx: f64,
    #[arg(long, default_value_t = 0.0)]
    vy: f64,
    #[arg(long, default_value_t = 0.0)]
    wz: f64,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("Runtime error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match &args.config {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    if !args.simulate {
        // Hardware drive outputs and pulse sources are wired by a
        // platform-specific integration, not by this binary.
        return Err("no hardware backend configured; run with --simulate".into());
    }

    let (velocity_controller, mut drive) = simulated_stack(&config, MotorModel::default());
    initialize_drive(&config, || drive.probe()).await?;

    let period = config.loop_period();
    tokio::spawn(async move {
        // Plant stepping stands in for physics running on its own clock.
        let mut tick = tokio::time::interval(period);
        loop {
            tick.tick().await;
            drive.step_all(period.as_secs_f64());
        }
    });

    let (tx, rx) = tokio::sync::mpsc::channel(16);
    let command = VelocityCommand {
        linear_x: args.vx,
        linear_y: args.vy,
        angular_z: args.wz,
    };
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(100));
        loop {
            tick.tick().await;
            if tx.send(command).await.is_err() {
                break;
            }
        }
    });

    info!(?command, "simulation mode");
    let runtime = Runtime::new(config, velocity_controller);
    runtime
        .run(
            MpscCommandSource::new(rx),
            JsonLogSink,
            args.duration.map(Duration::from_secs_f64),
        )
        .await?;
    Ok(())
}
