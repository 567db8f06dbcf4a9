//! Plays encoded audio through an external player.
//!
//! Audio is written to a temp file with the right suffix and handed to
//! the configured command, or to the first known player found on `PATH`.

use std::env;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{SpeechError, SpeechResult};
use crate::voice::{AudioFormat, EffectiveVoiceParameters};

/// A player binary and the formats it can decode.
struct KnownPlayer {
    program: &'static str,
    args: &'static [&'static str],
    wav: bool,
    mp3: bool,
}

#[cfg(target_os = "macos")]
const KNOWN_PLAYERS: &[KnownPlayer] = &[KnownPlayer {
    program: "afplay",
    args: &[],
    wav: true,
    mp3: true,
}];

#[cfg(not(target_os = "macos"))]
const KNOWN_PLAYERS: &[KnownPlayer] = &[
    KnownPlayer {
        program: "paplay",
        args: &[],
        wav: true,
        mp3: false,
    },
    KnownPlayer {
        program: "aplay",
        args: &["-q"],
        wav: true,
        mp3: false,
    },
    KnownPlayer {
        program: "ffplay",
        args: &["-nodisp", "-autoexit", "-loglevel", "quiet"],
        wav: true,
        mp3: true,
    },
    KnownPlayer {
        program: "mpg123",
        args: &["-q"],
        wav: false,
        mp3: true,
    },
];

impl KnownPlayer {
    fn plays(&self, format: AudioFormat) -> bool {
        match format {
            AudioFormat::Wav => self.wav,
            AudioFormat::Mp3 => self.mp3,
        }
    }

    /// Player-specific flags for a volume other than 1.0.
    fn volume_args(&self, volume: f64) -> Vec<String> {
        match self.program {
            "afplay" => vec!["-v".to_string(), format!("{volume:.2}")],
            "paplay" => vec![format!("--volume={}", (volume * 65536.0).round() as u32)],
            "ffplay" => vec![
                "-volume".to_string(),
                format!("{}", (volume * 100.0).round().min(100.0) as u32),
            ],
            "mpg123" => vec!["-f".to_string(), format!("{}", (volume * 32768.0).round() as u32)],
            _ => Vec::new(),
        }
    }
}

/// Plays audio with a configured command or a detected player.
#[derive(Debug, Clone, Default)]
pub struct Player {
    command: Option<String>,
}

impl Player {
    /// `command` is a whitespace-separated program and arguments; the
    /// audio file path is appended.
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Full argument vector, without the file path, for these parameters.
    fn command_for(&self, params: &EffectiveVoiceParameters) -> SpeechResult<Vec<String>> {
        if let Some(command) = &self.command {
            return Ok(command.split_whitespace().map(str::to_string).collect());
        }

        let format = params.format();
        let player = KNOWN_PLAYERS
            .iter()
            .filter(|p| p.plays(format))
            .find(|p| on_path(p.program))
            .ok_or_else(|| SpeechError::NoPlayer {
                tried: KNOWN_PLAYERS
                    .iter()
                    .filter(|p| p.plays(format))
                    .map(|p| p.program)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let mut argv = vec![player.program.to_string()];
        argv.extend(player.args.iter().map(|a| a.to_string()));
        // Local engines already baked volume into the audio
        if !params.provider().is_local() && params.volume() != 1.0 {
            argv.extend(player.volume_args(params.volume()));
        }
        Ok(argv)
    }

    /// Plays `audio` and waits for the player to finish.
    pub async fn play(&self, audio: &[u8], params: &EffectiveVoiceParameters) -> SpeechResult<()> {
        let argv = self.command_for(params)?;
        let Some((program, args)) = argv.split_first() else {
            return Err(SpeechError::NoPlayer {
                tried: "an empty player command".to_string(),
            });
        };

        let mut file = tempfile::Builder::new()
            .prefix("parrot-")
            .suffix(params.format().suffix())
            .tempfile()?;
        file.write_all(audio)?;
        file.flush()?;

        debug!(player = %program, path = %file.path().display(), "Playing audio");
        let output = Command::new(program)
            .args(args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SpeechError::Playback {
                command: program.clone(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SpeechError::Playback {
                command: program.clone(),
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }
}

fn on_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| is_file(&dir.join(program))))
        .unwrap_or(false)
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
