//! Attach command - stream a remote terminal and forward input to it.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use std::io::Write;
use tether_client::{AppLifecycle, TerminalSize};
use tether_stream::{StreamEndpoint, StreamTransport, TransportEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{Context, print_error};

/// Arguments for the attach command.
#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Terminal ID
    pub terminal_id: String,

    /// Only watch output, do not forward stdin
    #[arg(long)]
    pub no_input: bool,

    /// Resize the remote terminal to COLSxROWS before attaching
    #[arg(long, value_parser = parse_size)]
    pub size: Option<TerminalSize>,
}

/// Run the attach command.
pub async fn run(args: AttachArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let dim = Style::new().dim();

    if let Some(size) = args.size {
        client.terminals().resize(&args.terminal_id, size).await?;
    }

    let transport = StreamTransport::new(
        client.clone(),
        ctx.config.stream.clone(),
        ctx.network(),
        AppLifecycle::new(),
    );
    let endpoint = StreamEndpoint::terminal(&client, &args.terminal_id)?;
    let (handle, mut events) = transport.open(endpoint);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = !args.no_input;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    TransportEvent::Connected => {
                        eprintln!("{}", dim.apply_to(format!("Attached to {}", args.terminal_id)));
                    }
                    TransportEvent::Output(text) => {
                        let mut stdout = std::io::stdout().lock();
                        stdout.write_all(text.as_bytes())?;
                        stdout.flush()?;
                    }
                    TransportEvent::Reconnecting { attempt, delay } => {
                        eprintln!(
                            "{}",
                            dim.apply_to(format!(
                                "Connection lost, retrying in {}ms (attempt {})",
                                delay.as_millis(),
                                attempt
                            ))
                        );
                    }
                    TransportEvent::Exit(status) => {
                        let detail = match status.signal {
                            Some(signal) => format!("Process exited with code {} (signal {})", status.code, signal),
                            None => format!("Process exited with code {}", status.code),
                        };
                        eprintln!("{}", dim.apply_to(detail));
                        break;
                    }
                    TransportEvent::Error(e) => {
                        handle.close();
                        bail!("Terminal stream failed: {}", e);
                    }
                    TransportEvent::Event(_) => {}
                }
            }
            line = stdin.next_line(), if input_open => {
                match line {
                    Ok(Some(mut line)) => {
                        line.push('\n');
                        if let Err(e) = client.terminals().write(&args.terminal_id, line).await {
                            print_error(format!("Failed to send input: {}", e));
                        }
                    }
                    Ok(None) => input_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        input_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted, detaching");
                break;
            }
        }
    }

    handle.close();
    Ok(())
}

fn parse_size(s: &str) -> Result<TerminalSize, String> {
    let (cols, rows) = s
        .split_once('x')
        .ok_or_else(|| format!("expected COLSxROWS, got '{}'", s))?;
    let cols = cols.trim().parse().map_err(|_| format!("invalid column count '{}'", cols))?;
    let rows = rows.trim().parse().map_err(|_| format!("invalid row count '{}'", rows))?;
    Ok(TerminalSize { cols, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        let size = parse_size("120x40").unwrap();
        assert_eq!(size.cols, 120);
        assert_eq!(size.rows, 40);
        assert!(parse_size("120").is_err());
        assert!(parse_size("axb").is_err());
    }
}
