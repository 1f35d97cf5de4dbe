// main.rs
//
// Interactive jsonrpc4rs client: reads "service.method [json params]"
// lines and prints the decoded response. Readline runs on its own thread
// (rustyline is synchronous) and forwards lines to the async command loop
// over an unbounded channel.

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;
use tokio::sync::mpsc;

use jsonrpc4rs::{new_client, AddressSource, Client, ClientOptions};

#[derive(Parser, Debug)]
#[command(name = "jsonrpc4rs-cli")]
#[command(about = "Interactive jsonrpc4rs client")]
struct Args {
    /// Transport protocol: "tcp", "http", "https"
    #[arg(short, long, default_value = "tcp")]
    protocol: String,

    /// Comma-separated server address list
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    address: String,
}

fn print_help() {
    println!("\nAvailable commands:");
    println!("  <service.method> [json params]  - Call a method, e.g. Calculator.Add {{\"a\":1,\"b\":2}}");
    println!("  <service.method>! [json params]  - Fire as a notification (no response expected)");
    println!("  help                             - Show this help");
    println!("  quit                             - Exit");
    println!();
}

enum InputEvent {
    Line(String),
    Quit,
    Error(String),
}

fn parse_line(line: &str) -> Option<(String, Value, bool)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let mut parts = line.splitn(2, char::is_whitespace);
    let method_token = parts.next()?;
    let rest = parts.next().unwrap_or("").trim();

    let (method, is_notify) = match method_token.strip_suffix('!') {
        Some(stripped) => (stripped.to_string(), true),
        None => (method_token.to_string(), false),
    };

    let params = if rest.is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str(rest) {
            Ok(v) => v,
            Err(e) => {
                println!("invalid JSON params: {}", e);
                return None;
            }
        }
    };

    Some((method, params, is_notify))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {} via {}...", args.address, args.protocol);
    let client = new_client(
        "cli",
        &args.protocol,
        AddressSource::Static(args.address.clone()),
        ClientOptions::default(),
    )
    .await?;
    println!("Connected!");

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<InputEvent>();

    let readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                let _ = cmd_tx.send(InputEvent::Error(format!("Failed to create editor: {}", e)));
                return;
            }
        };

        loop {
            match rl.readline("> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        let _ = rl.add_history_entry(trimmed);
                    }
                    if trimmed == "quit" || trimmed == "exit" {
                        let _ = cmd_tx.send(InputEvent::Quit);
                        break;
                    }
                    if trimmed == "help" {
                        print_help();
                        continue;
                    }
                    if cmd_tx.send(InputEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    let _ = cmd_tx.send(InputEvent::Quit);
                    break;
                }
                Err(ReadlineError::Eof) => {
                    let _ = cmd_tx.send(InputEvent::Quit);
                    break;
                }
                Err(e) => {
                    let _ = cmd_tx.send(InputEvent::Error(format!("Readline error: {}", e)));
                    break;
                }
            }
        }
    });

    print_help();

    while let Some(event) = cmd_rx.recv().await {
        match event {
            InputEvent::Line(line) => {
                if let Some((method, params, is_notify)) = parse_line(&line) {
                    match client.call(&method, params, is_notify).await {
                        Ok(result) => {
                            if is_notify {
                                println!("[NOTIFY SENT] {}", method);
                            } else {
                                println!(
                                    "[RESPONSE] {}",
                                    serde_json::to_string_pretty(&result).unwrap()
                                );
                            }
                        }
                        Err(e) => println!("[ERROR] {}", e),
                    }
                }
            }
            InputEvent::Quit => break,
            InputEvent::Error(e) => {
                eprintln!("{}", e);
                break;
            }
        }
    }

    let _ = readline_handle.join();
    println!("Goodbye!");
    Ok(())
}
