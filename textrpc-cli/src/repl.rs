//! Interactive REPL.

use crate::commands::{self, parse_line};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use textrpc_client::Client;

const HISTORY_FILE: &str = ".textrpc_history";

pub async fn run(client: Client) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "textrpc CLI".bold().cyan());
    println!("Server: {}", client.connection().config().endpoint());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(HISTORY_FILE))
        .unwrap_or_else(|_| HISTORY_FILE.into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for the server's functions, 'quit' to leave.\n");

    loop {
        let prompt = format!("{} ", "textrpc>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if matches!(line, "quit" | "exit") {
                    break;
                }
                let Some(invocation) = parse_line(line) else {
                    continue;
                };

                // Each line is its own connection; a failure only affects that line.
                match commands::execute(&client, &invocation).await {
                    Ok(text) => println!("{}\n", text),
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}
