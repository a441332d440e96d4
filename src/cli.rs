//! Command-line interface and REPL

use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use tokio::sync::mpsc::UnboundedSender;

/// Commands the REPL forwards to the runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    ListPads,
    ListLayers,
    SetLayer { name: String, active: bool },
    Calibrate(bool),
    Reload,
    Quit,
}

/// Parse one REPL line. Empty input parses to None; bad input to an error
/// message for the user.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let command = match head {
        "pads" => ReplCommand::ListPads,
        "layers" => ReplCommand::ListLayers,
        "layer" => {
            let name = words.next().ok_or("usage: layer <name> on|off")?;
            let active = match words.next() {
                Some("on") => true,
                Some("off") => false,
                _ => return Err("usage: layer <name> on|off".into()),
            };
            ReplCommand::SetLayer {
                name: name.to_string(),
                active,
            }
        }
        "calibrate" => match words.next() {
            Some("start") => ReplCommand::Calibrate(true),
            Some("stop") => ReplCommand::Calibrate(false),
            _ => return Err("usage: calibrate start|stop".into()),
        },
        "reload" => ReplCommand::Reload,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {}                 list connected pads", "pads".green());
    println!("  {}               list the active mapping's layers", "layers".green());
    println!("  {}  toggle a layer", "layer <name> on|off".green());
    println!("  {} hold still, then stop", "calibrate start|stop".green());
    println!("  {}               rescan the configs directory", "reload".green());
    println!("  {}                 exit", "quit".green());
}

/// Blocking REPL loop; runs on its own thread and forwards commands to the
/// runtime. Returns when the user quits or the runtime goes away.
pub fn run_repl(commands: UnboundedSender<ReplCommand>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("gyrogate> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "help" {
                    print_help();
                    continue;
                }
                match parse_command(trimmed) {
                    Ok(None) => {}
                    Ok(Some(command)) => {
                        let _ = rl.add_history_entry(trimmed);
                        let quit = command == ReplCommand::Quit;
                        if commands.send(command).is_err() || quit {
                            break;
                        }
                    }
                    Err(message) => println!("{}", message.red()),
                }
            }
            Err(_) => {
                let _ = commands.send(ReplCommand::Quit);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layer_toggles() {
        assert_eq!(
            parse_command("layer menu on"),
            Ok(Some(ReplCommand::SetLayer {
                name: "menu".into(),
                active: true
            }))
        );
        assert!(parse_command("layer menu maybe").is_err());
        assert!(parse_command("layer").is_err());
    }

    #[test]
    fn parses_simple_commands_and_blank_lines() {
        assert_eq!(parse_command("pads"), Ok(Some(ReplCommand::ListPads)));
        assert_eq!(
            parse_command("calibrate start"),
            Ok(Some(ReplCommand::Calibrate(true)))
        );
        assert_eq!(parse_command("exit"), Ok(Some(ReplCommand::Quit)));
        assert_eq!(parse_command("   "), Ok(None));
        assert!(parse_command("bogus").is_err());
    }
}
