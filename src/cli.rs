use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "eventbot", about = "Discord event-planning bot", version)]
pub struct Args {
    /// Path to the YAML config file (falls back to CONFIG_PATH, then config.yaml)
    #[arg(short, long)]
    pub config: Option<String>,
}
