#![forbid(unsafe_code)]

//! Command-line options for the demo binary.
//!
//! Every option can also be set through a `JOIST_*` environment variable;
//! explicit flags win over the environment.

use std::path::PathBuf;

use clap::Parser;

use crate::app::{LaunchConfig, Step};
use crate::sim::FULL_PLUGIN;

const AFTER_HELP: &str = "\
SCREENS:
    1  Ramp       Raise and lower the ramp, then release the ball
    2  Friction   Compare the roll with and without friction
    3  Energy     Track potential and kinetic energy during the roll

STEPS:
    next, prev, home       Navigate between screens
    screen=N               Select screen N (1-based)
    locale=CODE            Switch locale, e.g. locale=es
    fallbacks=A,B          Set custom fallback locales
    plugin=NAME            Swap description logic (ramp, ramp-terse)
    height=METERS          Move the ball
    friction=on|off        Toggle friction
    release                Release the ball

EXAMPLES:
    joist-demo --query '?screens=2,1&locale=es' --step next --step height=2.5
    JOIST_QUERY='?homeScreen=false' joist-demo --json-logs";

/// Boot the ramp simulation from launch parameters and print JSONL reports.
#[derive(Parser, Debug, Clone)]
#[command(name = "joist-demo", version, about, after_help = AFTER_HELP)]
pub struct Opts {
    /// Launch query string (homeScreen, initialScreen, screens, locale, fallbackLocales).
    #[arg(long, env = "JOIST_QUERY", default_value = "")]
    pub query: String,

    /// Locale table JSON file; the built-in table is used when absent.
    #[arg(long, env = "JOIST_LOCALE_DATA")]
    pub locale_data: Option<PathBuf>,

    /// Description plugin loaded at startup.
    #[arg(long, env = "JOIST_PLUGIN", default_value = FULL_PLUGIN)]
    pub plugin: String,

    /// Step to apply after launch; repeat for several.
    #[arg(long = "step", value_parser = parse_step)]
    pub steps: Vec<Step>,

    /// Emit logs as JSON.
    #[arg(long, env = "JOIST_JSON_LOGS")]
    pub json_logs: bool,

    /// Log at debug level when RUST_LOG is unset.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_step(s: &str) -> Result<Step, String> {
    s.parse().map_err(|err: crate::app::DemoError| err.to_string())
}

impl Opts {
    /// Default tracing directive when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_directive(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }

    /// Launch configuration, with the locale table already read from disk.
    #[must_use]
    pub fn launch_config(&self, locale_data: Option<String>) -> LaunchConfig {
        LaunchConfig {
            query: self.query.clone(),
            locale_data,
            plugin: self.plugin.clone(),
        }
    }
}
