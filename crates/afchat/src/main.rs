mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "afchat", version, about = "AfreecaTV chat client")]
struct Cli {
    /// Output format for stdout.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_subcommand() {
        let cli = Cli::try_parse_from([
            "afchat",
            "watch",
            "https://play.afreecatv.com/bjfoo/123",
            "--count",
            "5",
            "--no-log",
        ])
        .expect("watch args should parse");

        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.count, Some(5));
                assert!(args.no_log);
                assert!(!args.verify_tls);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_log_dir_with_no_log() {
        let err = Cli::try_parse_from([
            "afchat",
            "watch",
            "https://play.afreecatv.com/bjfoo/123",
            "--no-log",
            "--log-dir",
            "/tmp/logs",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn keepalive_is_not_configurable() {
        let err = Cli::try_parse_from([
            "afchat",
            "watch",
            "https://play.afreecatv.com/bjfoo/123",
            "--keepalive",
            "5s",
        ])
        .expect_err("keepalive flag should not exist");

        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn rejects_zero_count() {
        let err = Cli::try_parse_from([
            "afchat",
            "watch",
            "https://play.afreecatv.com/bjfoo/123",
            "--count",
            "0",
        ])
        .expect_err("zero count should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn decode_requires_input() {
        let err = Cli::try_parse_from(["afchat", "decode"]).expect_err("decode needs input");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["afchat", "decode", "--hex", "0c", "--format", "json"])
            .expect("decode args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(cli.command, Command::Decode(_)));
    }
}
