use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hearth::daemon::{build_conversation, build_weather, start_indicator};
use hearth::indicator::{Color, release_indicator};
use hearth::providers::{GenerationParams, Locality, display_name};
use hearth::voice::{AplayPlayback, ArecordCapture, HttpSynthesizer, clip_info, tone_wav};
use hearth::{Config, Daemon};

/// Hearth - voice-interaction appliance controller
#[derive(Parser)]
#[command(name = "hearth", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ~/.config/hearth/config.toml)
    #[arg(short, long, env = "HEARTH_CONFIG")]
    config: Option<PathBuf>,

    /// Run without the LED indicator
    #[arg(long, env = "HEARTH_DISABLE_LED")]
    no_led: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "안녕하세요. 음성 합성 테스트입니다.")]
        text: String,
    },
    /// Cycle the LED strip through its colors
    TestLed,
    /// Print the current weather
    Weather {
        /// Locality token (e.g. Seoul), or "auto" for the current location
        locality: Option<String>,
    },
    /// Ask the conversation model a question
    Ask {
        /// Question text
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,hearth=info",
        1 => "info,hearth=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let mut config = Config::load(cli.config.as_deref());
    if cli.no_led {
        config.led.enabled = false;
    }
    tracing::debug!(?config, "loaded configuration");

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(&config, duration).await,
            Command::TestSpeaker => test_speaker(&config).await,
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::TestLed => test_led(&config).await,
            Command::Weather { locality } => weather(&config, locality.as_deref()).await,
            Command::Ask { text } => ask(&config, &text).await,
        };
    }

    // Run until interrupted
    Daemon::new(config).run().await?;

    Ok(())
}

/// Test microphone input
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let target = config.audio.capture_path();
    let capture = ArecordCapture::new(&config.audio);
    capture.record(Duration::from_secs(duration), &target).await?;

    let bytes = tokio::fs::read(&target).await?;
    let info = clip_info(&bytes)?;
    println!("Recorded {} bytes to {}", bytes.len(), target.display());
    println!(
        "{} Hz, {} channel(s), {}-bit, {:.2}s",
        info.sample_rate,
        info.channels,
        info.bits_per_sample,
        info.duration().as_secs_f64()
    );

    println!("\n---");
    println!("If the duration matches, your mic is working!");
    println!("If not, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");
    println!(
        "  3. Set AUDIO_RECORD_DEVICE to the right card (currently {})",
        config.audio.record_device
    );

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker(config: &Config) -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let wav = tone_wav(440.0, Duration::from_secs(2), 24000)?;
    let target = config.audio.response_path();
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &wav).await?;

    AplayPlayback::new(&config.audio).play_file(&target).await?;
    let _ = tokio::fs::remove_file(&target).await;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: aplay -l (to list devices)");
    println!("  2. Set AUDIO_PLAYBACK_DEVICE if the default card is wrong");

    Ok(())
}

/// Test TTS output via the speech service
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let synthesizer = HttpSynthesizer::new(&config.server_url, config.network_timeout)?;

    println!("Synthesizing speech...");
    let audio = synthesizer.request(text, &config.tts_lang).await?;
    println!("Got {} bytes of audio data", audio.len());

    if let Ok(info) = clip_info(&audio) {
        println!(
            "{} Hz, {} channel(s), {:.2}s",
            info.sample_rate,
            info.channels,
            info.duration().as_secs_f64()
        );
    }

    let target = config.audio.response_path();
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &audio).await?;

    println!("Playing...");
    AplayPlayback::new(&config.audio).play_file(&target).await?;
    let _ = tokio::fs::remove_file(&target).await;

    println!("Done!");
    Ok(())
}

/// Cycle the LED strip through its colors
async fn test_led(config: &Config) -> anyhow::Result<()> {
    let indicator = start_indicator(&config.led).await;
    if !indicator.is_powered() {
        release_indicator(indicator).await;
        anyhow::bail!("LED strip unavailable (check LED_DEVICE and LED_POWER_PIN)");
    }

    for color in [Color::Red, Color::Green, Color::Blue, Color::Off, Color::White] {
        println!("  -> {color}");
        if color == Color::Off {
            indicator.set_color_only(color);
        } else {
            indicator.set_color(color);
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    release_indicator(indicator).await;
    println!("LED test complete");
    Ok(())
}

/// Print the current weather
async fn weather(config: &Config, locality: Option<&str>) -> anyhow::Result<()> {
    let locality = Locality::from_token(locality.unwrap_or(&config.weather.default_locality));
    println!("Weather for {}:", display_name(locality.token()));

    let summary = build_weather(config).summary(&locality).await;
    println!("{summary}");
    Ok(())
}

/// Ask the conversation model a question
async fn ask(config: &Config, text: &str) -> anyhow::Result<()> {
    let provider = build_conversation(config);
    if !provider.is_available() {
        anyhow::bail!("conversation provider not configured (set LM_STUDIO_URL)");
    }

    let params = GenerationParams::from(&config.conversation);
    let reply = provider
        .reply(text, &params)
        .await
        .map_err(|kind| anyhow::anyhow!("no reply ({kind})"))?;

    println!("{reply}");
    Ok(())
}
