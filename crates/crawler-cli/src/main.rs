//! `crawlerd` – remote-control daemon for the crawler robot.
//!
//! 1. Loads `~/.crawler/config.toml` (or `$CRAWLER_CONFIG`), applying
//!    `CRAWLER_*` environment overrides.
//! 2. Initialises logging and binds the UDP command port.
//! 3. Serves one controller at a time until `quit` or Ctrl-C.
//!
//! `crawlerd --init-config` writes the default configuration file and exits.

mod config;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crawler_hal::sim::{SimCamera, SimLocomotion, SimSoundPlayer};
use crawler_hal::{ProcessSoundPlayer, SoundPlayer};
use crawler_net::{UdpOutbound, UdpTransport};
use crawler_runtime::{CrawlerServer, Dispatcher, Gateways};

fn main() -> ExitCode {
    if std::env::args().skip(1).any(|a| a == "--init-config") {
        return init_config();
    }

    let (cfg, from_file, config_error) = match config::load() {
        Ok((cfg, found)) => (cfg, found, None),
        Err(e) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            (cfg, false, Some(e))
        }
    };

    let _guard = crawler_runtime::init_tracing("crawlerd", &cfg.log_filter);

    print_banner();
    match (&config_error, from_file) {
        (Some(e), _) => {
            println!("{}", e.to_string().red());
            println!("  Using default configuration.");
        }
        (None, true) => println!(
            "  Config loaded from {}",
            config::config_path().display().to_string().bold()
        ),
        (None, false) => println!("  No config file; using defaults."),
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – disconnecting and shutting down …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let server_config = cfg.to_server_config();
    let transport = match UdpTransport::bind(server_config.port, server_config.input_timeout) {
        Ok(t) => t,
        Err(e) => {
            error!(target: "crawler::boot", error = %e, "cannot bind command port");
            println!("{}: {}", "Startup failed".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    let frames = match UdpOutbound::dedicated() {
        Ok(o) => o,
        Err(e) => {
            error!(target: "crawler::boot", error = %e, "cannot open frame socket");
            return ExitCode::FAILURE;
        }
    };

    let gateways = Gateways {
        locomotion: Box::new(SimLocomotion::new()),
        speaker: speaker_for(cfg.audio_player.as_deref()),
        camera: Arc::new(Mutex::new(SimCamera::new(cfg.camera.fps))),
    };
    let dispatcher = Dispatcher::new(
        server_config.clone(),
        gateways,
        Arc::new(UdpOutbound::ephemeral()),
        Arc::new(frames),
    );

    println!(
        "  Listening on UDP port {} (idle timeout {}s)\n",
        server_config.port.to_string().bold(),
        server_config.input_timeout.as_secs()
    );
    info!(target: "crawler::boot", port = server_config.port, "crawlerd starting");

    CrawlerServer::new(transport, dispatcher, shutdown).run();

    println!("{}", "  ✓ Exiting crawlerd.".green());
    ExitCode::SUCCESS
}

fn speaker_for(audio_player: Option<&str>) -> Box<dyn SoundPlayer> {
    match audio_player.and_then(ProcessSoundPlayer::new) {
        Some(player) => Box::new(player),
        None => Box::new(SimSoundPlayer::new()),
    }
}

fn init_config() -> ExitCode {
    let path = config::config_path();
    if path.exists() {
        println!("  Config already exists at {}", path.display().to_string().bold());
        return ExitCode::SUCCESS;
    }
    match config::save(&config::Config::default()) {
        Ok(path) => {
            println!(
                "  {} Config saved to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   ____                    __         "#.bold().cyan());
    println!("{}", r#"  / ___|_ __ __ ___      _| | ___ _ __"#.bold().cyan());
    println!("{}", r#" | |   | '__/ _` \ \ /\ / / |/ _ \ '__|"#.bold().cyan());
    println!("{}", r#" | |___| | | (_| |\ V  V /| |  __/ |  "#.bold().cyan());
    println!("{}", r#"  \____|_|  \__,_| \_/\_/ |_|\___|_|  "#.bold().cyan());
    println!();
    println!("  {} {}",
        "crawlerd".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Single-controller UDP remote control");
    println!();
}
