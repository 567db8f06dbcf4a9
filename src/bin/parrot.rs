//! parrot - Hook companion for AI coding assistants
//!
//! Applies a persona when a session starts, speaks the assistant's
//! replies, and raises desktop notifications when attention is needed.
//! Works with Claude Code hooks, the Codex `notify` program, and Cursor
//! hooks.
//!
//! # Usage
//!
//! ```bash
//! # As a hook (payload on stdin, or as the argument for Codex)
//! parrot hook
//! parrot hook '{"type":"agent-turn-complete",...}'
//!
//! # Speak something with explicit voice settings
//! parrot speak --text "Build finished" --provider openai --voice nova
//!
//! # Show what would be used, without speaking
//! parrot speak --dry-run
//!
//! # Manage personas
//! parrot persona save pirate --file pirate.md
//! parrot persona apply pirate --source cursor
//!
//! # Register with Claude Code
//! parrot setup
//!
//! # Enable debug logging
//! RUST_LOG=parrot_cli=debug parrot hook
//! ```

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{error, info, warn};

use parrot_cli::dispatch::Dispatcher;
use parrot_cli::error::TranscriptError;
use parrot_cli::{
    logging, read_last_assistant, setup, AppContext, Notifier, Speaker, SpeechSink, VoiceFlags,
    VoiceSources,
};
use parrot_core::{normalize_for_speech, SessionId};
use parrot_protocol::{looks_like_json_object, Source};

// ============================================================================
// CLI Arguments
// ============================================================================

/// parrot - personas, spoken replies and alerts for AI coding assistants
#[derive(Parser, Debug)]
#[command(name = "parrot", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle one hook event (always exits 0)
    Hook {
        /// Hook payload; read from stdin when absent or not a JSON object
        payload: Option<String>,
    },
    /// Speak text with resolved voice settings
    Speak(SpeakArgs),
    /// Manage persona profiles
    Persona {
        #[command(subcommand)]
        command: PersonaCommand,
    },
    /// Configure Claude Code hooks for parrot
    Setup,
    /// Remove parrot hooks from Claude Code
    Uninstall,
    /// Delete expired session markers now
    Sweep,
}

#[derive(ClapArgs, Debug)]
struct SpeakArgs {
    #[command(flatten)]
    voice: VoiceFlags,

    /// Text to speak
    #[arg(long, conflicts_with_all = ["stdin", "transcript"])]
    text: Option<String>,

    /// Read the text from stdin
    #[arg(long, conflicts_with = "transcript")]
    stdin: bool,

    /// Speak the latest assistant reply from a JSONL transcript
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Session id for de-duplication
    #[arg(long)]
    session: Option<String>,

    /// Project directory for persona and voice settings (default: cwd)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Write audio to a file instead of playing it
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Print the resolved voice parameters and exit
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum PersonaCommand {
    /// List stored personas
    List,
    /// Print a persona
    Show { name: String },
    /// Store a persona from a file, or from stdin
    Save {
        name: String,
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
    },
    /// Copy a persona into a project's instructions file
    Apply {
        name: String,
        /// Host to write for: claude_code, codex or cursor
        #[arg(long, default_value = "claude_code")]
        source: String,
        /// Project directory (default: cwd)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Open a persona in $VISUAL / $EDITOR
    Edit { name: String },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Command::Hook { payload } => {
            run_hook(payload);
            ExitCode::SUCCESS
        }
        command => {
            logging::init_stderr();
            match run_command(command) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

// ============================================================================
// Hook
// ============================================================================

/// Runs one hook dispatch. Every failure is logged to the file, never
/// surfaced to the host.
fn run_hook(payload: Option<String>) {
    let ctx = AppContext::from_env();
    logging::init_file(&ctx.paths.log_file());
    if let Some(e) = &ctx.config_error {
        warn!(error = %e, "Using default config");
    }

    let input = match payload {
        Some(arg) if looks_like_json_object(&arg) => arg.into_bytes(),
        _ => read_stdin_bytes(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            return;
        }
    };

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let speaker = Speaker::new(ctx.player());
    let notifier = Notifier::new(ctx.config.notifications);
    let dispatcher = Dispatcher::new(ctx, speaker, notifier, cwd);
    runtime.block_on(dispatcher.dispatch(&input));
}

fn read_stdin_bytes() -> Vec<u8> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Vec::new();
    }
    let mut buf = Vec::new();
    if let Err(e) = stdin.read_to_end(&mut buf) {
        warn!(error = %e, "Failed to read hook payload from stdin");
    }
    buf
}

// ============================================================================
// Interactive commands
// ============================================================================

fn run_command(command: Command) -> Result<()> {
    let ctx = AppContext::from_env();
    if let Some(e) = &ctx.config_error {
        warn!(error = %e, "Using default config");
    }

    match command {
        Command::Hook { .. } => Ok(()),
        Command::Speak(args) => run_speak(&ctx, args),
        Command::Persona { command } => run_persona(&ctx, command),
        Command::Setup => {
            let path = setup::claude_settings_path().context("Could not determine home directory")?;
            setup::setup(&path, &setup::hook_command())
        }
        Command::Uninstall => {
            let path = setup::claude_settings_path().context("Could not determine home directory")?;
            setup::uninstall(&path)
        }
        Command::Sweep => {
            let sessions = ctx.sessions();
            let report = sessions.sweep();
            println!(
                "Removed {} expired files from {} ({} failed)",
                report.removed,
                sessions.dir().display(),
                report.failed
            );
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run_speak(ctx: &AppContext, args: SpeakArgs) -> Result<()> {
    let workdir = project_dir(args.dir.as_deref())?;
    let sources = VoiceSources::load(&workdir, &ctx.paths)?;
    let params = sources.resolve(&args.voice.to_layer())?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }

    let text = if let Some(text) = &args.text {
        params.shape_text(&normalize_for_speech(text))
    } else if args.stdin {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read text from stdin")?;
        params.shape_text(&normalize_for_speech(&raw))
    } else if let Some(path) = &args.transcript {
        match read_last_assistant(path, params.mode(), params.max_chars()) {
            Ok(text) => text,
            Err(TranscriptError::NoAssistantMessage) => {
                info!("No assistant text in transcript");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        bail!("Nothing to speak: pass --text, --stdin or --transcript");
    };

    if text.is_empty() {
        info!("Nothing to speak after normalization");
        return Ok(());
    }

    let session = args.session.map(SessionId::new).unwrap_or_default();
    let sessions = ctx.sessions();
    if sessions.is_duplicate(&session, &text) {
        info!(session_id = %session, "Already spoken in this session");
        return Ok(());
    }

    let speaker = Speaker::new(ctx.player());
    if let Some(output) = &args.output {
        let audio = speaker.synthesize(&text, &params).await?;
        fs::write(output, audio)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    } else {
        speaker.speak(&text, &params).await?;
    }

    if let Err(e) = sessions.record(&session, &text) {
        warn!(error = %e, "Failed to record spoken text");
    }
    Ok(())
}

fn run_persona(ctx: &AppContext, command: PersonaCommand) -> Result<()> {
    let personas = ctx.personas();

    match command {
        PersonaCommand::List => {
            let names = personas.list()?;
            if names.is_empty() {
                println!("No personas in {}", personas.dir().display());
            }
            for name in names {
                let marker = if ctx.config.default_persona.as_deref() == Some(name.as_str()) {
                    " (default)"
                } else {
                    ""
                };
                println!("{name}{marker}");
            }
        }
        PersonaCommand::Show { name } => {
            print!("{}", personas.read(&name)?);
        }
        PersonaCommand::Save { name, file } => {
            let contents = match file {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut raw = String::new();
                    io::stdin()
                        .read_to_string(&mut raw)
                        .context("Failed to read persona from stdin")?;
                    raw
                }
            };
            let path = personas.write(&name, &contents)?;
            println!("Saved {}", path.display());
        }
        PersonaCommand::Apply { name, source, dir } => {
            let Some(source) = Source::from_name(&source) else {
                bail!("Unknown source: {source} (expected claude_code, codex or cursor)");
            };
            let target = project_dir(dir.as_deref())?
                .join(ctx.config.instructions.for_source(source));
            if personas.apply(&name, &target)? {
                println!("Applied {name} to {}", target.display());
            } else {
                println!("{} already uses {name}", target.display());
            }
        }
        PersonaCommand::Edit { name } => {
            let path = personas.edit(&name)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

fn project_dir(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => env::current_dir().context("Failed to determine current directory"),
    }
}
