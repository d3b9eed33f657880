//! `SoundPlayer` trait and an external-process implementation.

use std::process::{Child, Command, Stdio};

use crawler_types::CrawlerError;
use tracing::{debug, warn};

/// Fire-and-forget audio output.
pub trait SoundPlayer: Send {
    /// Start playing `asset` (a file path or driver-specific identifier) and
    /// return without waiting for playback to finish.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::HardwareFault`] if playback cannot be started.
    fn play(&mut self, asset: &str) -> Result<(), CrawlerError>;
}

/// Plays assets by spawning an external command (e.g. `aplay`) with the asset
/// path as its last argument.
///
/// Children are not waited on; finished ones are reaped on the next call.
pub struct ProcessSoundPlayer {
    program: String,
    args: Vec<String>,
    children: Vec<Child>,
}

impl ProcessSoundPlayer {
    /// `command_line` is split on whitespace: the first token is the program,
    /// the rest are fixed leading arguments (e.g. `"aplay -q"`).
    ///
    /// Returns `None` for an empty command line.
    pub fn new(command_line: &str) -> Option<Self> {
        let mut tokens = command_line.split_whitespace().map(str::to_string);
        let program = tokens.next()?;
        Some(Self {
            program,
            args: tokens.collect(),
            children: Vec::new(),
        })
    }

    /// Number of spawned players that have not been reaped yet.
    pub fn pending(&self) -> usize {
        self.children.len()
    }

    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    warn!(target: "crawler::sound", %status, "sound player exited with failure");
                }
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(target: "crawler::sound", error = %e, "could not poll sound player");
                false
            }
        });
    }
}

impl SoundPlayer for ProcessSoundPlayer {
    fn play(&mut self, asset: &str) -> Result<(), CrawlerError> {
        self.reap();
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(asset)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CrawlerError::hardware("speaker", format!("failed to spawn {}: {e}", self.program))
            })?;
        debug!(target: "crawler::sound", asset, pid = child.id(), "sound started");
        self.children.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_splits_program_and_args() {
        let player = ProcessSoundPlayer::new("aplay -q").unwrap();
        assert_eq!(player.program, "aplay");
        assert_eq!(player.args, vec!["-q".to_string()]);
        assert!(ProcessSoundPlayer::new("   ").is_none());
    }

    #[test]
    fn missing_program_is_a_hardware_fault() {
        let mut player = ProcessSoundPlayer::new("definitely-not-a-real-player-binary").unwrap();
        let result = player.play("./sounds/bell.wav");
        assert!(matches!(result, Err(CrawlerError::HardwareFault { .. })));
        assert_eq!(player.pending(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn finished_players_are_reaped() {
        let mut player = ProcessSoundPlayer::new("true").unwrap();
        player.play("a.wav").unwrap();
        // Give the child time to exit, then trigger a reap via another play.
        std::thread::sleep(std::time::Duration::from_millis(200));
        player.play("b.wav").unwrap();
        assert_eq!(player.pending(), 1);
    }
}
