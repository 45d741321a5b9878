/*
 * This file is part of Nasfan.
 *
 * Copyright (C) 2025 Nasfan contributors
 *
 * Nasfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Nasfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Nasfan. If not, see <https://www.gnu.org/licenses/>.
 */

use anyhow::{anyhow, bail};

use nasfan::commands::{self, DEFAULT_FAN_ID, DEFAULT_SENSOR_ID};
use nasfan::ec::Ec;
use nasfan::error::EcError;
use nasfan::hal::DEFAULT_HAL_LIBRARY;
use nasfan::logger;
use nasfan::ports::DirectPortIo;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Optional logging to /etc/nasfan/logs.json
    let logging_enabled = args.iter().any(|a| a == "--logging");
    if logging_enabled {
        logger::init_logging();
        logger::log_event("startup", serde_json::json!({ "args": args }));
    }
    let args: Vec<String> = args.into_iter().filter(|a| a != "--logging").collect();

    let verb = match args.get(1) {
        Some(verb) => verb.as_str(),
        None => {
            usage();
            std::process::exit(1);
        }
    };

    if verb == "help" {
        usage();
        return;
    }

    if let Err(err) = run(verb, &args[2..]) {
        eprintln!("Error: {err:#}");
        if logging_enabled {
            logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
        }
        std::process::exit(1);
    }
}

fn run(verb: &str, rest: &[String]) -> anyhow::Result<()> {
    // The self-test compares an unprivileged code path against the vendor
    // library and must not run with full root rights.
    if verb == "test" && unsafe { libc::getuid() } == 0 && unsafe { libc::geteuid() } == 0 {
        bail!("the test command cannot be run as root");
    }

    let ports = DirectPortIo::acquire().map_err(|e| {
        anyhow!("nasfan must be run as root or hold CAP_SYS_RAWIO to access the IT8528 ports: {e}")
    })?;
    let mut ec = Ec::new(ports);

    // Bail out early when the chip does not answer; `check` reports the
    // probe result itself.
    if verb != "check" && !ec.check_if_present() {
        bail!(EcError::ChipNotPresent);
    }

    match verb {
        "check" => println!("{}", commands::check_command(&mut ec)?),
        "fan" => {
            let percent = match rest.first() {
                None => None,
                Some(arg) => Some(
                    arg.parse::<u8>()
                        .map_err(|_| anyhow!("invalid percent: {} (must be 0-100)", arg))?,
                ),
            };
            if let Some(line) = commands::fan_command(&mut ec, DEFAULT_FAN_ID, percent)? {
                println!("{line}");
            }
        }
        "led" => {
            let mode = rest
                .first()
                .ok_or_else(|| anyhow!("missing LED mode (expected on, off or blink)"))?;
            commands::led_command(&mut ec, mode)?;
        }
        "log" => println!("{}", commands::log_command(&mut ec)?),
        "temperature" => {
            println!("{}", commands::temperature_command(&mut ec, DEFAULT_SENSOR_ID)?)
        }
        "test" => {
            let library = rest.first().map(String::as_str).unwrap_or(DEFAULT_HAL_LIBRARY);
            println!("{}", commands::test_command(&mut ec, library)?);
        }
        _ => {
            usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn usage() {
    println!("Control the IT8528 Super I/O controller chip on QNAP NAS units");
    println!();
    println!("Usage: nasfan {{ COMMAND | help }} [--logging]");
    println!();
    println!("Available commands:");
    println!("  check                   - detect the Super I/O controller");
    println!("  fan [speed_percentage]  - get or set the fan speed");
    println!("  led {{on|off|blink}}      - set the front panel LED mode");
    println!("  log                     - display fan speed & temperature");
    println!("  temperature             - retrieve the temperature of sensor #1");
    println!("  test [libuLinux_hal.so] - test functions against libuLinux_hal.so");
    println!("  help                    - this help message");
    println!();
}
