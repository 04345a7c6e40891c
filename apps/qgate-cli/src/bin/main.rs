use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qgate_core::config::Config;
use qgate_router::Router;

const USAGE: &str = "Usage: qgate [--config <dir>] <route|explain|info> [query...]";

#[derive(Debug, PartialEq)]
enum Command {
    Route(String),
    Explain(String),
    Info,
}

#[derive(Debug, PartialEq)]
struct Args {
    config_dir: PathBuf,
    command: Command,
}

/// Arguments are decoded lossily; invalid UTF-8 becomes U+FFFD and is later
/// dropped by the normalizer.
fn parse_args(raw: Vec<OsString>) -> Result<Args, String> {
    let mut args: Vec<String> = raw.into_iter().map(|a| a.to_string_lossy().into_owned()).collect();
    let mut config_dir = PathBuf::from(".");
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            return Err("--config needs a directory".to_string());
        }
        config_dir = PathBuf::from(args.remove(1));
        args.remove(0);
    }
    if args.is_empty() {
        return Err("missing command".to_string());
    }
    let cmd = args.remove(0);
    let query = args.join(" ");
    let command = match cmd.as_str() {
        "route" => Command::Route(query),
        "explain" => Command::Explain(query),
        "info" if args.is_empty() => Command::Info,
        "info" => return Err("info takes no arguments".to_string()),
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Args { config_dir, command })
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` overrides
/// the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load_in(&args.config_dir, None)
        .with_context(|| format!("loading configuration from {}", args.config_dir.display()))?;
    let router = Router::from_config(&config).context("loading routing artifacts")?;
    tracing::info!(base_dir = %router.base_dir().display(), "router ready");
    match args.command {
        Command::Route(query) => println!("{}", serde_json::to_string_pretty(&router.route(&query))?),
        Command::Explain(query) => println!("{}", serde_json::to_string_pretty(&router.explain(&query))?),
        Command::Info => println!("{}", serde_json::to_string_pretty(&router.snapshot().info())?),
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let args = match parse_args(env::args_os().skip(1).collect()) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(OsString::from).collect())
    }

    #[test]
    fn route_joins_the_query_words() {
        let args = parse(&["route", "farm", "crop"]).unwrap();
        assert_eq!(args.command, Command::Route("farm crop".to_string()));
        assert_eq!(args.config_dir, PathBuf::from("."));
    }

    #[test]
    fn config_dir_flag_comes_first() {
        let args = parse(&["--config", "/etc/qgate", "info"]).unwrap();
        assert_eq!(args.config_dir, PathBuf::from("/etc/qgate"));
        assert_eq!(args.command, Command::Info);
    }

    #[test]
    fn empty_route_query_is_allowed() {
        assert_eq!(parse(&["route"]).unwrap().command, Command::Route(String::new()));
    }

    #[test]
    fn usage_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["serve"]).is_err());
        assert!(parse(&["info", "extra"]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        use std::os::unix::ffi::OsStringExt;
        let raw = vec![OsString::from("route"), OsString::from_vec(vec![b'f', b'a', b'r', b'm', 0xff])];
        let args = parse_args(raw).unwrap();
        assert_eq!(args.command, Command::Route("farm\u{fffd}".to_string()));
    }
}
