#![forbid(unsafe_code)]

//! joist demo binary entry point.
//!
//! Prints one JSON line after launch and one after every `--step`.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use joist_demo::app::{DemoApp, Report};
use joist_demo::cli::Opts;
use serde::Serialize;

#[derive(Serialize)]
struct Line<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<String>,
    #[serde(flatten)]
    report: &'a Report,
}

fn emit(out: &mut impl Write, event: &str, step: Option<String>, report: &Report) -> Result<()> {
    let line = serde_json::to_string(&Line {
        event,
        step,
        report,
    })?;
    writeln!(out, "{line}")?;
    Ok(())
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    joist_core::logging::init_subscriber(opts.log_directive(), opts.json_logs);

    let locale_data = opts
        .locale_data
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read locale data at {}", path.display()))
        })
        .transpose()?;

    let app = DemoApp::launch(&opts.launch_config(locale_data)).context("Launch failed")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, "launch", None, &app.report())?;
    for step in &opts.steps {
        app.apply(step)
            .with_context(|| format!("Step {step} failed"))?;
        emit(&mut out, "step", Some(step.to_string()), &app.report())?;
    }
    Ok(())
}
