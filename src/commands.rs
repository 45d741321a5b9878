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

//! CLI verb implementations.
//!
//! Each verb maps onto one or two register-map operations and formats the
//! result as the line main prints. Argument validation happens here, before
//! any port access.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};

use crate::ec::Ec;
use crate::error::{EcError, Result};
use crate::hal::ReferenceHal;
use crate::ports::PortIo;
use crate::registers;

/// Fan driven by the bare `fan` verb (system fan bank, last slot)
pub const DEFAULT_FAN_ID: u8 = 5;
/// Sensor read by the `temperature` verb (system sensor #1)
pub const DEFAULT_SENSOR_ID: u8 = 1;
/// Fan sampled by the `log` verb
const LOG_FAN_ID: u8 = 0;
/// Sensor sampled by the `log` verb
const LOG_SENSOR_ID: u8 = 0;

/// Top speed of the stock fans, used to express RPM as a percentage
const MAX_FAN_SPEED_RPM: u16 = 1720;

/// `check`: report whether the chip answers the identification probe.
pub fn check_command<P: PortIo>(ec: &mut Ec<P>) -> Result<String> {
    if ec.check_if_present() {
        Ok("IT8528 detected.".to_string())
    } else {
        Err(EcError::ChipNotPresent)
    }
}

/// RPM expressed against the stock fan ceiling, clamped to 100%.
fn fan_percent(rpm: u16) -> f64 {
    let percent = f64::from(rpm) / f64::from(MAX_FAN_SPEED_RPM - 15) * 100.0;
    percent.min(100.0)
}

/// `fan`: with no argument, report RPM and an approximate percentage; with
/// an argument, set the speed from a 0-100 percentage.
pub fn fan_command<P: PortIo>(
    ec: &mut Ec<P>,
    fan_id: u8,
    percent: Option<u8>,
) -> Result<Option<String>> {
    if let Some(percent) = percent {
        if percent > 100 {
            return Err(EcError::InvalidPercent(percent));
        }
    }

    if !registers::get_fan_status(ec, LOG_FAN_ID)? {
        return Err(EcError::FanNotRunning(LOG_FAN_ID));
    }

    match percent {
        None => {
            let rpm = registers::get_fan_speed(ec, fan_id)?;
            Ok(Some(format!("{} RPM (~{:.2}%)", rpm, fan_percent(rpm))))
        }
        Some(percent) => {
            registers::set_fan_speed(ec, fan_id, registers::percent_to_raw_speed(percent))?;
            Ok(None)
        }
    }
}

/// `led`: parse and apply a front-panel LED mode. Unknown modes are
/// rejected before any port access.
pub fn led_command<P: PortIo>(ec: &mut Ec<P>, mode: &str) -> Result<()> {
    let mode: registers::LedMode = mode.parse()?;
    registers::set_front_led(ec, mode)
}

/// `log`: one `<unix_ts>,<rpm>,<temperature>` sample.
pub fn log_command<P: PortIo>(ec: &mut Ec<P>) -> Result<String> {
    if !registers::get_fan_status(ec, LOG_FAN_ID)? {
        return Err(EcError::FanNotRunning(LOG_FAN_ID));
    }
    let rpm = registers::get_fan_speed(ec, LOG_FAN_ID)?;
    let temperature = registers::get_temperature(ec, LOG_SENSOR_ID)?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(format!("{},{},{:.2}", timestamp, rpm, temperature))
}

/// `temperature`: read one sensor.
pub fn temperature_command<P: PortIo>(ec: &mut Ec<P>, sensor_id: u8) -> Result<String> {
    let temperature = registers::get_temperature(ec, sensor_id)?;
    Ok(format!("{:.2} °C", temperature))
}

fn as_vendor_ret<T>(result: &Result<T>) -> i8 {
    if result.is_ok() {
        0
    } else {
        -1
    }
}

/// `test`: cross-check fan status, PWM, speed and temperature against the
/// vendor HAL library, reporting the first mismatch.
pub fn test_command<P: PortIo>(ec: &mut Ec<P>, library_path: &str) -> anyhow::Result<String> {
    let hal = ReferenceHal::load(library_path)
        .with_context(|| format!("failed to load reference library {}", library_path))?;

    let (ref_ret, ref_status) = hal.get_fan_status(0)?;
    let ours = registers::get_fan_status(ec, 0);
    let our_status = ours.as_ref().map(|running| u8::from(*running)).unwrap_or(0);
    if ref_ret != as_vendor_ret(&ours) || (ref_ret == 0 && ref_status != our_status) {
        bail!(
            "fan status mismatch: reference ret {} value {}, ours ret {} value {}",
            ref_ret,
            ref_status,
            as_vendor_ret(&ours),
            our_status
        );
    }

    let (ref_ret, ref_pwm) = hal.get_fan_pwm(0)?;
    let ours = registers::get_fan_pwm(ec, 0);
    let our_pwm = *ours.as_ref().unwrap_or(&0);
    if ref_ret != as_vendor_ret(&ours) || (ref_ret == 0 && ref_pwm != our_pwm) {
        bail!(
            "fan PWM mismatch: reference ret {} value {}, ours ret {} value {}",
            ref_ret,
            ref_pwm,
            as_vendor_ret(&ours),
            our_pwm
        );
    }

    let (ref_ret, ref_speed) = hal.get_fan_speed(0)?;
    let ours = registers::get_fan_speed(ec, 0);
    let our_speed = u32::from(*ours.as_ref().unwrap_or(&0));
    if ref_ret != as_vendor_ret(&ours) || (ref_ret == 0 && ref_speed != our_speed) {
        bail!(
            "fan speed mismatch: reference ret {} value {}, ours ret {} value {}",
            ref_ret,
            ref_speed,
            as_vendor_ret(&ours),
            our_speed
        );
    }

    let (ref_ret, ref_temperature) = hal.get_temperature(0)?;
    let ours = registers::get_temperature(ec, 0);
    let our_temperature = *ours.as_ref().unwrap_or(&0.0);
    // The two reads are sequential; the reference value was sampled first,
    // so it may only be lower than ours if something is off.
    if ref_ret != as_vendor_ret(&ours) || (ref_ret == 0 && ref_temperature < our_temperature) {
        bail!(
            "temperature mismatch: reference ret {} value {}, ours ret {} value {}",
            ref_ret,
            ref_temperature,
            as_vendor_ret(&ours),
            our_temperature
        );
    }

    Ok("All tests passed.".to_string())
}
