//! Hook configuration for Claude Code integration
//!
//! Manages installation and removal of parrot hooks in
//! `~/.claude/settings.json`. Codex and Cursor are configured by hand;
//! `setup` prints the snippets for them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Value};

/// Claude Code events parrot listens to.
pub const HOOK_TYPES: &[&str] = &[
    "SessionStart",
    "UserPromptSubmit",
    "Stop",
    "SubagentStop",
    "Notification",
    "SessionEnd",
];

/// Substring identifying hooks this tool installed.
const HOOK_MARKER: &str = "parrot hook";

/// Returns the path to Claude Code settings.json
pub fn claude_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("settings.json"))
}

/// The command line Claude Code should run, pointing at this binary.
pub fn hook_command() -> String {
    let exe = std::env::current_exe()
        .ok()
        .and_then(|p| p.to_str().map(str::to_string))
        .filter(|p| p.ends_with("parrot"))
        .unwrap_or_else(|| "parrot".to_string());
    format!("{exe} hook")
}

/// Reads settings, returns an empty object if the file doesn't exist
fn read_settings(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(json!({}));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_settings(path: &Path, settings: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn create_hook_entry(command: &str) -> Value {
    json!({
        "hooks": [{
            "type": "command",
            "command": command
        }]
    })
}

fn is_parrot_entry(entry: &Value) -> bool {
    entry
        .get("hooks")
        .and_then(|h| h.as_array())
        .map(|hooks| {
            hooks.iter().any(|hook| {
                hook.get("command")
                    .and_then(|c| c.as_str())
                    .map(|cmd| cmd.contains(HOOK_MARKER))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// Adds a parrot entry for every hook type that lacks one.
///
/// Returns the hook types that were added.
pub fn install_hooks(settings: &mut Value, command: &str) -> Result<Vec<&'static str>> {
    let root = settings
        .as_object_mut()
        .context("settings is not a JSON object")?;
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .context("hooks is not an object")?;

    let mut added = Vec::new();
    for &hook_type in HOOK_TYPES {
        let entries = hooks
            .entry(hook_type)
            .or_insert_with(|| json!([]))
            .as_array_mut()
            .with_context(|| format!("hooks.{hook_type} is not an array"))?;

        if !entries.iter().any(is_parrot_entry) {
            entries.push(create_hook_entry(command));
            added.push(hook_type);
        }
    }
    Ok(added)
}

/// Removes every parrot entry, dropping hook types left empty.
///
/// Entries installed by other tools are kept. Returns how many entries
/// were removed.
pub fn remove_hooks(settings: &mut Value) -> usize {
    let Some(hooks) = settings.get_mut("hooks").and_then(|h| h.as_object_mut()) else {
        return 0;
    };

    let mut removed = 0;
    for &hook_type in HOOK_TYPES {
        if let Some(entries) = hooks.get_mut(hook_type).and_then(|h| h.as_array_mut()) {
            let before = entries.len();
            entries.retain(|entry| !is_parrot_entry(entry));
            removed += before - entries.len();

            if entries.is_empty() {
                hooks.remove(hook_type);
            }
        }
    }
    removed
}

/// Installs parrot hooks into the Claude Code settings at `path`
pub fn setup(path: &Path, command: &str) -> Result<()> {
    println!("Configuring Claude Code hooks in {}...", path.display());
    let mut settings = read_settings(path)?;
    let added = install_hooks(&mut settings, command)?;

    for &hook_type in HOOK_TYPES {
        if added.contains(&hook_type) {
            println!("  {hook_type} - added");
        } else {
            println!("  {hook_type} - already configured");
        }
    }

    if added.is_empty() {
        println!("\nAll hooks already configured.");
    } else {
        write_settings(path, &settings)?;
        println!("\nConfiguration complete!");
    }

    println!("\nCodex: add to ~/.codex/config.toml");
    println!("  notify = [\"{}\", \"hook\"]", command.trim_end_matches(" hook"));
    println!("\nCursor: add to ~/.cursor/hooks.json for beforeSubmitPrompt, afterAgentResponse and stop");
    println!("  {{ \"command\": \"{command}\" }}");

    Ok(())
}

/// Removes parrot hooks from the Claude Code settings at `path`
pub fn uninstall(path: &Path) -> Result<()> {
    println!("Removing Claude Code hooks from {}...", path.display());
    let mut settings = read_settings(path)?;

    let removed = remove_hooks(&mut settings);
    if removed == 0 {
        println!("  No hooks found");
        return Ok(());
    }

    write_settings(path, &settings)?;
    println!("  Removed {removed} hook entries");
    println!("\nparrot uninstalled successfully!");
    Ok(())
}
