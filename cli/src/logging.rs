use std::io::IsTerminal;

use clap::{ArgAction, Args, ColorChoice};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

/// Crates whose events follow the verbosity flag
const TARGETS: [&str; 2] = ["masm_emulator", "masm"];

#[derive(Args, Debug)]
pub struct LogOpt {
    /// More logs. Once for machine state changes, twice for every register and stack slot
    /// access, three times for dependencies too
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// When to color log output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Write log events as JSON lines
    #[arg(long, global = true, conflicts_with = "color")]
    json: bool,
}

impl LogOpt {
    /// Filter directives for the verbosity flag
    fn directives(&self) -> String {
        let (ours, others) = match self.verbose {
            0 => return "info".to_string(),
            1 => ("debug", "info"),
            2 => ("trace", "info"),
            _ => ("trace", "trace"),
        };

        let mut directives: Vec<_> = TARGETS.iter().map(|t| format!("{t}={ours}")).collect();
        directives.push(others.to_string());
        directives.join(",")
    }

    fn ansi(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stdout().is_terminal(),
        }
    }

    /// Install the global subscriber. `RUST_LOG` takes precedence over `-v`.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directives()));
        let registry = tracing_subscriber::registry().with(filter);

        if self.json {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        } else {
            // Machine-level events are easier to follow with their module
            let layer = tracing_subscriber::fmt::layer()
                .without_time()
                .with_ansi(self.ansi())
                .with_target(self.verbose > 0);
            registry.with(layer).init();
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Test {
        #[command(flatten)]
        log: LogOpt,
    }

    fn directives(args: &[&str]) -> String {
        let args = std::iter::once("masm").chain(args.iter().copied());
        Test::try_parse_from(args).unwrap().log.directives()
    }

    #[test]
    fn directives_test() {
        assert_eq!(directives(&[]), "info");
        assert_eq!(directives(&["-v"]), "masm_emulator=debug,masm=debug,info");
        assert_eq!(directives(&["-vv"]), "masm_emulator=trace,masm=trace,info");
        assert_eq!(
            directives(&["-vvvv"]),
            "masm_emulator=trace,masm=trace,trace"
        );
    }

    #[test]
    fn color_test() {
        let parse = |args: &[&str]| Test::try_parse_from(args).map(|t| t.log);
        assert!(parse(&["masm", "--color", "never"]).is_ok_and(|log| !log.ansi()));
        assert!(parse(&["masm", "--color", "always"]).is_ok_and(|log| log.ansi()));
        assert!(parse(&["masm", "--json", "--color", "always"]).is_err());
    }
}
