//! Ember REPL.
//!
//! Reads statements from stdin one line at a time, evaluates them and prints
//! whatever the shell emitted. Errors and warnings go to stderr. Type `quit`
//! or `exit` to leave.

mod host;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use ember_shell::{Line, Severity, Shell, ShellConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Config path from CLI arg or EMBER_CONFIG env var; defaults otherwise.
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("EMBER_CONFIG").ok())
        .map(PathBuf::from);
    let config = match &config_path {
        Some(path) => ShellConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ShellConfig::default(),
    };
    log::info!(
        "Starting Ember (max depth {}, {} aliases)",
        config.max_depth,
        config.aliases.len(),
    );

    let shell = Shell::new(config);
    let player = host::Player::spawn();
    host::bind_demo(&shell, &player)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print_lines(&shell.drain_and_clear(), &mut stdout)?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }
        shell.eval(input);
        print_lines(&shell.drain_and_clear(), &mut stdout)?;
    }

    print_lines(&shell.dispose(), &mut stdout)?;
    log::info!("Goodbye");
    Ok(())
}

fn print_lines(lines: &[Line], out: &mut impl Write) -> io::Result<()> {
    for line in lines {
        match line.severity {
            Severity::Normal => writeln!(out, "{}", line.text)?,
            Severity::Input => writeln!(out, "> {}", line.text)?,
            Severity::Warning => eprintln!("warning: {}", line.text),
            Severity::Error => eprintln!("error: {}", line.text),
        }
    }
    Ok(())
}
