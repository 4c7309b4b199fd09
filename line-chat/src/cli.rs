use clap::{Parser, ValueEnum};

use crate::config::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_PORT, READ_BUFFER_SIZE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Host name or address of the chat server.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port of the chat server.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Username announced after connecting. Prompted for when omitted.
    #[arg(short, long)]
    pub username: Option<String>,

    /// Seconds to wait for the TCP connection to be established.
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout: u64,

    /// Size of the buffer used for each read from the server.
    #[arg(long, default_value_t = READ_BUFFER_SIZE, value_parser = parse_buffer_size)]
    pub buffer_size: usize,

    /// How text pushed by the server is displayed.
    #[arg(long, value_enum, default_value_t = InboundMode::Raw)]
    pub inbound: InboundMode,

    /// Do not print input prompts.
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboundMode {
    /// Print every chunk as soon as it arrives, exactly as received.
    #[default]
    Raw,
    /// Buffer incoming text and print it one complete line at a time.
    Lines,
}

fn parse_buffer_size(value: &str) -> Result<usize, String> {
    let size: usize = value.parse().map_err(|err| format!("{err}"))?;
    if size == 0 {
        return Err("buffer size must be at least 1 byte".to_string());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_endpoint() {
        let cli = Cli::try_parse_from(["line_chat"]).expect("parse defaults");
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 6378);
        assert_eq!(cli.buffer_size, 512);
        assert_eq!(cli.inbound, InboundMode::Raw);
        assert!(cli.username.is_none());
        assert!(!cli.no_prompt);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "line_chat",
            "--host",
            "chat.local",
            "--port",
            "7000",
            "-u",
            "alice",
            "--inbound",
            "lines",
            "--no-prompt",
        ])
        .expect("parse overrides");
        assert_eq!(cli.host, "chat.local");
        assert_eq!(cli.port, 7000);
        assert_eq!(cli.username.as_deref(), Some("alice"));
        assert_eq!(cli.inbound, InboundMode::Lines);
        assert!(cli.no_prompt);
    }

    #[test]
    fn rejects_zero_buffer_size() {
        let result = Cli::try_parse_from(["line_chat", "--buffer-size", "0"]);
        assert!(result.is_err());
    }
}
