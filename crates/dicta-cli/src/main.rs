mod app;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dicta_core::Settings;

#[derive(Parser)]
#[command(name = "dicta", version, about = "Voice-to-text dictation pad for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// BCP-47 language tag for recognition (overrides saved settings)
    #[arg(long)]
    language: Option<String>,

    /// Microphone device name (the default input device when omitted)
    #[arg(long)]
    device: Option<String>,

    /// Print verbose diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List available microphone devices
    Devices,
    /// Update saved settings
    Config {
        /// BCP-47 language tag for recognition
        #[arg(long)]
        language: Option<String>,
        /// Preferred microphone device name
        #[arg(long)]
        device: Option<String>,
        /// Deepgram API key
        #[arg(long)]
        api_key: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    dicta_core::set_verbose(cli.verbose);

    match cli.command {
        Some(Command::Devices) => list_devices(),
        Some(Command::Config {
            language,
            device,
            api_key,
        }) => update_config(language, device, api_key),
        None => app::run(cli.language, cli.device),
    }
}

fn list_devices() -> Result<()> {
    for device in dicta_core::list_input_devices()? {
        if device.is_default {
            println!("{} (default)", device.name);
        } else {
            println!("{}", device.name);
        }
    }
    Ok(())
}

fn update_config(
    language: Option<String>,
    device: Option<String>,
    api_key: Option<String>,
) -> Result<()> {
    if language.is_none() && device.is_none() && api_key.is_none() {
        let settings = Settings::load();
        println!("language: {}", settings.language);
        println!(
            "microphone device: {}",
            settings.microphone_device.as_deref().unwrap_or("(default)")
        );
        println!(
            "deepgram api key: {}",
            if settings.api_key().is_some() {
                "configured"
            } else {
                "not configured"
            }
        );
        return Ok(());
    }

    let mut settings = Settings::load();
    if let Some(language) = language {
        settings.language = language;
    }
    if let Some(device) = device {
        settings.microphone_device = Some(device);
    }
    if let Some(api_key) = api_key {
        settings.deepgram_api_key = Some(api_key);
    }
    settings.save()?;
    println!("Settings saved.");
    Ok(())
}
