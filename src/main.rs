// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! neviwatch daemon entry point.
//!
//! Loads configuration, authenticates against Neviweb, and runs the
//! monitor loop until interrupted. Three modes:
//!
//! - `once`: print the thermostat's current attributes and exit.
//! - `monitor` (default): run the loop and log transitions, dispatch nothing.
//! - `trigger`: run the loop and dispatch the configured actions.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use neviwatch::action::{
    ActionDispatcher, ActionRegistry, AmixerVolume, SideEffects, SystemctlServices,
};
use neviwatch::client::NeviwebClient;
use neviwatch::config::Config;
use neviwatch::event::PowerEventSource;
use neviwatch::monitor::Monitor;
use neviwatch::state::{RetryPolicy, StateMonitor};

const USAGE: &str = "usage: neviwatch [--mode once|monitor|trigger] [--config PATH] [--interval SECS]";

/// What the process should do after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Print the current thermostat attributes and exit.
    Once,
    /// Run the loop, log transitions, dispatch nothing.
    Monitor,
    /// Run the loop and dispatch configured actions.
    Trigger,
}

#[derive(Debug)]
struct CliArgs {
    mode: Mode,
    config_path: String,
    interval_override: Option<u64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut mode = Mode::Monitor;
    let mut config_path = "config.json".to_string();
    let mut interval_override = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => {
                let value = args.next().ok_or("--mode requires a value")?;
                mode = match value.as_str() {
                    "once" => Mode::Once,
                    "monitor" => Mode::Monitor,
                    "trigger" => Mode::Trigger,
                    other => return Err(format!("unknown mode {other:?}")),
                };
            }
            "--config" => {
                config_path = args.next().ok_or("--config requires a value")?;
            }
            "--interval" => {
                let value = args.next().ok_or("--interval requires a value")?;
                let seconds: u64 = value
                    .parse()
                    .map_err(|_| format!("invalid interval {value:?}"))?;
                if seconds == 0 {
                    return Err("interval must be non-zero".to_string());
                }
                interval_override = Some(seconds);
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            other => return Err(format!("unknown argument {other:?}")),
        }
    }

    Ok(CliArgs {
        mode,
        config_path,
        interval_override,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal");
            eprintln!("neviwatch: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> neviwatch::Result<()> {
    let mut config = Config::load(&args.config_path)?;
    if let Some(seconds) = args.interval_override {
        config.settings.poll_interval_seconds = seconds;
    }

    // Validate action bindings before touching the network, so a bad
    // config never gets as far as a login. Only trigger mode dispatches.
    let resolved = ActionRegistry::resolve(&config.actions)?;
    let registry = match args.mode {
        Mode::Trigger => resolved,
        Mode::Once | Mode::Monitor => ActionRegistry::empty(),
    };

    let client = NeviwebClient::new(&config.auth, config.settings.request_timeout())
        .map_err(neviwatch::Error::Client)?;
    client.login().await.map_err(neviwatch::Error::Client)?;
    let device = client
        .ensure_device(config.auth.device_id)
        .await
        .map_err(neviwatch::Error::Client)?;
    tracing::info!(
        id = device.id,
        name = device.name.as_deref().unwrap_or("?"),
        "watching thermostat"
    );

    if args.mode == Mode::Once {
        let info = client
            .device_info(config.auth.device_id)
            .await
            .map_err(neviwatch::Error::Client)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&info).unwrap_or_else(|_| info.to_string())
        );
        client.logout().await;
        return Ok(());
    }

    let state = StateMonitor::new(
        config.settings.poll_interval(),
        config.settings.failure_threshold,
        RetryPolicy::new(
            std::time::Duration::from_secs(config.settings.backoff_initial_seconds),
            std::time::Duration::from_secs(config.settings.backoff_max_seconds),
        ),
    );
    let fx = SideEffects::new(
        Arc::new(AmixerVolume::new()),
        Arc::new(SystemctlServices::new()),
    );
    let monitor = Monitor::new(
        client,
        config.auth.device_id,
        state,
        ActionDispatcher::new(registry, fx),
    );

    // The handle stays alive for the platform sleep/wake integration to
    // drive; without one the source simply never yields.
    let (_power_handle, power_source) = PowerEventSource::channel();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!(
        mode = ?args.mode,
        interval = config.settings.poll_interval_seconds,
        "starting monitor loop"
    );
    monitor.run(power_source, shutdown_rx).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs, String> {
        parse_args(list.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.mode, Mode::Monitor);
        assert_eq!(parsed.config_path, "config.json");
        assert_eq!(parsed.interval_override, None);
    }

    #[test]
    fn full_invocation() {
        let parsed = args(&[
            "--mode",
            "trigger",
            "--config",
            "/etc/neviwatch.json",
            "--interval",
            "10",
        ])
        .unwrap();
        assert_eq!(parsed.mode, Mode::Trigger);
        assert_eq!(parsed.config_path, "/etc/neviwatch.json");
        assert_eq!(parsed.interval_override, Some(10));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(args(&["--mode", "turbo"]).is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        assert!(args(&["--interval", "0"]).is_err());
    }

    #[test]
    fn rejects_stray_argument() {
        assert!(args(&["--frobnicate"]).is_err());
    }
}
