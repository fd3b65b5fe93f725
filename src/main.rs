//! CLI entry point for chordd
//!
//! Provides command-line interface for checking a rule file,
//! listing compiled bindings and dumping the key map.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use chordd::core::{compile, Keymap, UsQwertyLayout};

#[derive(Parser)]
#[command(name = "chordd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the rule file and report diagnostics
    Check {
        /// Path to the rule file
        #[arg(short, long, default_value = "~/.chorddrc")]
        config: PathBuf,
    },

    /// List all compiled modes and bindings
    List {
        /// Path to the rule file
        #[arg(short, long, default_value = "~/.chorddrc")]
        config: PathBuf,
    },

    /// Dump the built-in layout's character-to-keycode table
    Keys,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check_rules(&config)?,
        Commands::List { config } => list_bindings(&config)?,
        Commands::Keys => dump_keys()?,
    }

    Ok(())
}

/// Expand tilde and build the keymap shared by the subcommands.
fn prepare(config_path: &Path) -> anyhow::Result<(PathBuf, Keymap)> {
    let expanded = shellexpand::tilde(
        config_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?,
    );
    let path = PathBuf::from(expanded.as_ref());
    let keymap = Keymap::build(&UsQwertyLayout)?;
    Ok((path, keymap))
}

/// Compile the rule file and print warnings and errors
fn check_rules(config_path: &Path) -> anyhow::Result<()> {
    let (path, keymap) = prepare(config_path)?;

    println!("{} Compiling rules: {}", "→".cyan(), path.display());

    let output = match compile(&path, &keymap) {
        Ok(output) => output,
        Err(err) => {
            println!("{} {}", "✗".red().bold(), err);
            std::process::exit(1);
        }
    };

    for warning in &output.warnings {
        println!("{} {}", "⚠".yellow(), warning);
    }

    let bindings: usize = output.graph.iter().map(|mode| mode.len()).sum();
    println!(
        "{} {} mode{}, {} binding{}, {} blacklisted process{}",
        "✓".green().bold(),
        output.graph.len(),
        if output.graph.len() == 1 { "" } else { "s" },
        bindings,
        if bindings == 1 { "" } else { "s" },
        output.blacklist.len(),
        if output.blacklist.len() == 1 { "" } else { "es" },
    );
    println!("  shell: {}", output.shell);
    for watched in output.watch.iter() {
        println!("  watching: {}", watched.display());
    }

    Ok(())
}

/// List every mode and binding in the compiled graph
fn list_bindings(config_path: &Path) -> anyhow::Result<()> {
    let (path, keymap) = prepare(config_path)?;
    let output = compile(&path, &keymap)?;

    println!("{}", format!("Bindings from: {}\n", path.display()).bold());

    let mut modes: Vec<_> = output.graph.iter().collect();
    modes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut total = 0;
    for mode in modes {
        let mut flags = Vec::new();
        if mode.capture {
            flags.push("capture");
        }
        if mode.inherit {
            flags.push("inherit");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!("{}{}", format!("mode {}", mode.name).magenta().bold(), suffix);

        let mut bindings: Vec<String> = mode
            .bindings()
            .map(|(key, action)| {
                format!(
                    "  {} {} {}",
                    format!("{}{}", key.fingerprint, key.scope).cyan(),
                    "→".dimmed(),
                    action
                )
            })
            .collect();
        bindings.sort();
        for line in &bindings {
            println!("{}", line);
        }
        total += mode.len();
        println!();
    }

    println!("{} Total: {} bindings", "✓".green(), total);

    Ok(())
}

/// Dump the built-in US layout table, sorted by key code
fn dump_keys() -> anyhow::Result<()> {
    let keymap = Keymap::build(&UsQwertyLayout)?;

    let mut entries: Vec<(char, u32)> = keymap.iter().collect();
    entries.sort_by_key(|&(_, code)| code);

    for (character, code) in entries {
        let shown = if character == ' ' {
            "space".to_string()
        } else {
            character.to_string()
        };
        println!("{}  0x{:02X}", shown.cyan(), code);
    }

    Ok(())
}
