use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use thingy_host_lib::{
    config::{read_fleet_config, FleetConfig, ModelConfigSerde},
    BtleplugTransport, Fleet, Transport, DEFAULT_LABELS, DEFAULT_WINDOW_SIZE,
};

#[derive(Parser)]
#[command(name = "Thingy CLI")]
#[command(bin_name = "thingy-cli")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Scan(ScanArgs),
    Record(RecordArgs),
}

#[derive(clap::Args)]
#[command(about = "List nearby BLE peripherals")]
struct ScanArgs {
    #[arg(long, short, default_value_t = 10)]
    timeout: u64,
}

#[derive(clap::Args)]
#[command(about = "Stream, log and classify motion data until Ctrl-C")]
struct RecordArgs {
    /// Peripheral addresses, e.g. FD:CD:F2:2A:C9:6A
    addresses: Vec<String>,

    /// JSON fleet config, command line arguments take precedence
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[arg(long, short)]
    name: Option<String>,

    /// Motion processing frequency in Hz
    #[arg(long, short)]
    frequency: Option<u16>,

    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    scan_timeout: Option<u64>,

    /// ONNX model taking (1, window, 6) f32
    #[arg(long, short)]
    model: Option<PathBuf>,

    /// Class labels in training order
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    /// Only record samples
    #[arg(long, action)]
    no_classify: bool,
}

impl RecordArgs {
    fn into_fleet_config(self) -> Result<FleetConfig> {
        let mut config = match &self.config {
            Some(path) => read_fleet_config(path)?,
            None => FleetConfig::default(),
        };

        if !self.addresses.is_empty() {
            config.addresses = self.addresses;
        }
        if let Some(name) = self.name {
            config.recording_name = name;
        }
        if let Some(frequency) = self.frequency {
            config.sampling_frequency = frequency;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(scan_timeout) = self.scan_timeout {
            config.scan_timeout_secs = scan_timeout;
        }
        if let Some(path) = self.model {
            let labels = if self.labels.is_empty() {
                DEFAULT_LABELS.iter().map(|label| label.to_string()).collect()
            } else {
                self.labels
            };
            config.model = Some(ModelConfigSerde {
                path,
                labels,
                window_size: self.window_size,
            });
        }
        if self.no_classify {
            config.model = None;
        }

        if config.addresses.is_empty() {
            return Err(anyhow!("No device addresses given"));
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let args = Cli::parse();

    match args.command {
        Commands::Scan(args) => {
            let transport = BtleplugTransport::new().await?;
            println!("Scanning for {}s...", args.timeout);
            for device in transport.scan(Duration::from_secs(args.timeout)).await? {
                println!(
                    "{} {}",
                    device.address,
                    device.name.as_deref().unwrap_or("(unknown)")
                );
            }
        }
        Commands::Record(args) => {
            let config = args.into_fleet_config()?;
            let options = config.session_options()?;
            let transport = Arc::new(BtleplugTransport::new().await?);
            let mut fleet = Fleet::new(transport, options);

            let sessions = fleet
                .start(&config.addresses, config.scan_duration())
                .await?;
            if sessions.is_empty() {
                return Err(anyhow!("None of the devices could be connected"));
            }

            fleet
                .run_all(
                    sessions,
                    config.sampling_frequency,
                    &config.recording_name,
                    async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            log::error!("Failed to listen for Ctrl-C: {}", e);
                        }
                    },
                )
                .await;
        }
    }
    Ok(())
}
