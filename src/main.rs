use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use droidform::driver::adb;
use droidform::driver::AppiumConfig;
use droidform::engine::{self, HoldTarget};
use droidform::flows::{signup_steps, SignupInput, SignupSelectors};
use droidform::runner::{run_workflow, SessionContext};
use droidform::SpeedProfile;

#[derive(Parser)]
#[command(name = "droidform")]
#[command(version = "0.1.0")]
#[command(about = "Resilient Android form-filling workflows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the account-creation flow against a connected device
    Signup {
        /// Automation server URL
        #[arg(long, default_value = "http://127.0.0.1:4723")]
        server: String,

        /// Device serial
        #[arg(short, long)]
        device: Option<String>,

        /// App package to launch
        #[arg(long)]
        package: Option<String>,

        /// App activity to launch
        #[arg(long)]
        activity: Option<String>,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Day of month as shown in the picker, e.g. 12
        #[arg(long)]
        birth_day: String,

        /// Month as shown in the picker, e.g. June
        #[arg(long)]
        birth_month: String,

        /// Four-digit year
        #[arg(long)]
        birth_year: String,

        /// Execution speed profile (fast, normal, safe)
        #[arg(long, default_value = "normal")]
        speed: String,

        /// Write the run result as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List connected devices
    Devices,

    /// Press and hold at a screen position
    Hold {
        /// Automation server URL
        #[arg(long, default_value = "http://127.0.0.1:4723")]
        server: String,

        /// Device serial
        #[arg(short, long)]
        device: Option<String>,

        /// Horizontal position as a fraction of screen width
        #[arg(short, long, default_value = "0.5")]
        x: f32,

        /// Vertical position as a fraction of screen height
        #[arg(short, long, default_value = "0.6")]
        y: f32,

        /// Minimum hold duration in milliseconds
        #[arg(long, default_value = "15000")]
        duration_ms: u64,

        /// Execution speed profile (fast, normal, safe)
        #[arg(long, default_value = "normal")]
        speed: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Signup {
            server,
            device,
            package,
            activity,
            email,
            password,
            first_name,
            last_name,
            birth_day,
            birth_month,
            birth_year,
            speed,
            report,
        } => {
            let config = AppiumConfig {
                server_url: server,
                device_serial: device,
                app_package: package,
                app_activity: activity,
                ..AppiumConfig::default()
            };
            let timing = SpeedProfile::parse(&speed).timing();

            let input = SignupInput {
                email,
                password,
                first_name,
                last_name,
                birth_day,
                birth_month,
                birth_year,
            };
            let steps = signup_steps(&input, &SignupSelectors::default());

            println!("{} Running signup flow ({} steps)", "▶".green().bold(), steps.len());
            let ctx = SessionContext::open(&config, timing).await?;
            let result = run_workflow(steps, ctx).await;
            result.print_summary();

            if let Some(path) = report {
                result.write_json(&path)?;
                println!("  Report: {}", path.display().to_string().cyan());
            }

            if !result.success {
                std::process::exit(1);
            }
        }

        Commands::Devices => {
            let devices = adb::list_devices().await?;
            if devices.is_empty() {
                println!("{} No devices connected.", "ℹ".blue());
            }
            for d in devices {
                println!("  {} ({})", d.serial.cyan(), d.state);
            }
        }

        Commands::Hold {
            server,
            device,
            x,
            y,
            duration_ms,
            speed,
        } => {
            let config = AppiumConfig {
                server_url: server,
                device_serial: device,
                ..AppiumConfig::default()
            };
            let timing = SpeedProfile::parse(&speed).timing();
            let ctx = SessionContext::open(&config, timing).await?;

            let outcome = engine::press_and_hold(
                &ctx,
                &HoldTarget::ScreenFraction { x, y },
                Duration::from_millis(duration_ms),
                "hold point",
            )
            .await;
            ctx.close().await;

            match outcome {
                Ok(()) => println!("{} Hold completed.", "✅".green()),
                Err(e) => {
                    println!("{} Hold failed: {}", "❌".red(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
