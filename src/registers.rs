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

//! Register map and value decoding for the IT8528.
//!
//! Each feature maps a logical identifier (fan, sensor or power supply
//! index) onto one or two 16-bit command words, then decodes the raw
//! byte(s) into the caller-visible unit. The command tables and the
//! conversion formulas mirror the vendor's libuLinux_hal.so driver; the
//! PWM decode in particular must stay bit-exact with the fixed-point
//! arithmetic the vendor compiled in. Identifiers outside the enumerated
//! sets are rejected before any port access.
//!
//! Valid fan ids are 0-7, 10, 11, 20-25 and 30-35; ids 10 and 11 only
//! carry a tachometer (redundant power supply units) and have no status,
//! PWM or speed-set registers.

use std::str::FromStr;

use crate::ec::Ec;
use crate::error::{EcError, Result};
use crate::ports::PortIo;

/// Front-panel LED command pair
const FRONT_LED_COMMAND: (u8, u8) = (0x01, 0x55);
/// Power-supply status command pair
const POWER_SUPPLY_STATUS_COMMAND: (u8, u8) = (0x00, 0x45);

fn split(command: u16) -> (u8, u8) {
    ((command & 0xFF) as u8, (command >> 8) as u8)
}

/// Resolves the status register for a fan id.
pub fn fan_status_command(fan_id: u8) -> Result<u16> {
    match fan_id {
        0..=5 => Ok(0x0242),
        6 | 7 => Ok(0x0244),
        20..=25 => Ok(0x0259),
        30..=35 => Ok(0x025A),
        _ => Err(EcError::InvalidFanId(fan_id)),
    }
}

/// Offset of the fan's status bit within its range's register.
fn fan_status_bit_offset(fan_id: u8) -> u8 {
    match fan_id {
        0..=5 => fan_id,
        6 | 7 => fan_id - 6,
        20..=25 => fan_id - 20,
        _ => fan_id - 30,
    }
}

/// Reads the fan status; `true` means the fan is running (the hardware bit
/// uses inverted logic: running means bit clear).
pub fn get_fan_status<P: PortIo>(ec: &mut Ec<P>, fan_id: u8) -> Result<bool> {
    let (c0, c1) = split(fan_status_command(fan_id)?);
    let byte = ec.read_byte(c0, c1)?;
    Ok((byte >> fan_status_bit_offset(fan_id)) & 0x01 == 0)
}

/// Resolves the PWM register for a fan id.
pub fn fan_pwm_command(fan_id: u8) -> Result<u16> {
    match fan_id {
        0..=5 => Ok(0x022E),
        6 | 7 => Ok(0x024B),
        20..=25 => Ok(0x022F),
        30..=35 => Ok(0x023B),
        _ => Err(EcError::InvalidFanId(fan_id)),
    }
}

/// Decodes a raw PWM register byte.
///
/// This is the vendor driver's optimized fixed-point scaling (a
/// reverse-engineered multiply-shift approximation of `byte * 2.55`),
/// reproduced verbatim including the truncation to u8. Do not simplify:
/// the self-test compares results bit-for-bit against the shared library.
pub fn decode_fan_pwm(byte: u8) -> u8 {
    let scaled = (0x51999999E1u64 * u64::from(byte)) >> 32 >> 5;
    (scaled - u64::from(byte) / 0x808081) as u8
}

/// Reads and decodes the fan PWM value.
pub fn get_fan_pwm<P: PortIo>(ec: &mut Ec<P>, fan_id: u8) -> Result<u8> {
    let (c0, c1) = split(fan_pwm_command(fan_id)?);
    let byte = ec.read_byte(c0, c1)?;
    Ok(decode_fan_pwm(byte))
}

/// Resolves the (high, low) tachometer registers for a fan id.
pub fn fan_speed_commands(fan_id: u8) -> Result<(u16, u16)> {
    let id = u16::from(fan_id);
    match fan_id {
        0..=5 => Ok((2 * (id + 0x0312), 2 * id + 0x0625)),
        6 | 7 => Ok((2 * (id + 0x030A), 2 * (id - 0x06) + 0x0621)),
        // Fans 10 and 11 exist only on units with redundant power supplies
        10 => Ok((0x065B, 0x065A)),
        11 => Ok((0x065E, 0x065D)),
        20..=25 => Ok((2 * (id + 0x030E), 2 * (id - 0x14) + 0x0645)),
        30..=35 => Ok((2 * (id + 0x02F8), 2 * (id - 0x1E) + 0x062D)),
        _ => Err(EcError::InvalidFanId(fan_id)),
    }
}

/// Reads the fan speed in RPM, high byte first.
pub fn get_fan_speed<P: PortIo>(ec: &mut Ec<P>, fan_id: u8) -> Result<u16> {
    let (high_command, low_command) = fan_speed_commands(fan_id)?;
    let (c0, c1) = split(high_command);
    let high = ec.read_byte(c0, c1)?;
    let (c0, c1) = split(low_command);
    let low = ec.read_byte(c0, c1)?;
    Ok((u16::from(high) << 8) | u16::from(low))
}

/// Resolves the (mode, pwm) registers used when setting a fan speed.
pub fn set_fan_speed_commands(fan_id: u8) -> Result<(u16, u16)> {
    match fan_id {
        0..=5 => Ok((0x0220, 0x022E)),
        6 | 7 => Ok((0x0223, 0x024B)),
        20..=25 => Ok((0x0221, 0x022F)),
        30..=35 => Ok((0x0222, 0x023B)),
        _ => Err(EcError::InvalidFanId(fan_id)),
    }
}

/// Sets the fan speed from a raw 0-255 value. Switches the fan's bank to
/// manual mode (0x10), then writes the speed rescaled to the chip's
/// 0-100 range.
pub fn set_fan_speed<P: PortIo>(ec: &mut Ec<P>, fan_id: u8, speed: u8) -> Result<()> {
    let (mode_command, pwm_command) = set_fan_speed_commands(fan_id)?;
    let (c0, c1) = split(mode_command);
    ec.write_byte(c0, c1, 0x10)?;
    let (c0, c1) = split(pwm_command);
    ec.write_byte(c0, c1, raw_speed_to_percent(speed))
}

/// Converts a 0-100 percentage to the raw 0-255 speed scale.
pub fn percent_to_raw_speed(percent: u8) -> u8 {
    (u16::from(percent) * 255 / 100) as u8
}

/// Converts a raw 0-255 speed back to a 0-100 percentage. Truncating, so
/// not an exact inverse of [`percent_to_raw_speed`]; the round trip stays
/// within one percentage point.
pub fn raw_speed_to_percent(raw: u8) -> u8 {
    (100 * u16::from(raw) / 255) as u8
}

/// Resolves the temperature register for a sensor id.
pub fn temperature_command(sensor_id: u8) -> Result<u16> {
    let id = u16::from(sensor_id);
    match sensor_id {
        0 | 1 => Ok(id + 0x0600),
        5..=7 => Ok(id + 0x05FD),
        10 => Ok(0x0659),
        11 => Ok(0x065C),
        15..=38 => Ok(id + 0x05F7),
        _ => Err(EcError::InvalidSensorId(sensor_id)),
    }
}

/// Reads a temperature sensor in whole degrees Celsius. No calibration or
/// offset correction is applied at this layer.
pub fn get_temperature<P: PortIo>(ec: &mut Ec<P>, sensor_id: u8) -> Result<f64> {
    let (c0, c1) = split(temperature_command(sensor_id)?);
    let byte = ec.read_byte(c0, c1)?;
    Ok(f64::from(byte))
}

/// Front-panel LED modes and their chip mode codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Off,
    Blink,
    On,
}

impl LedMode {
    pub fn code(self) -> u8 {
        match self {
            LedMode::Off => 0,
            LedMode::Blink => 1,
            LedMode::On => 2,
        }
    }
}

impl FromStr for LedMode {
    type Err = EcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(LedMode::Off),
            "blink" => Ok(LedMode::Blink),
            "on" => Ok(LedMode::On),
            _ => Err(EcError::InvalidLedMode(s.to_string())),
        }
    }
}

/// Sets the front-panel LED mode.
pub fn set_front_led<P: PortIo>(ec: &mut Ec<P>, mode: LedMode) -> Result<()> {
    let (c0, c1) = FRONT_LED_COMMAND;
    ec.write_byte(c0, c1, mode.code())
}

/// Reads the status of power supply 1 or 2; `true` means the supply is up
/// (inverted bit, as for fan status).
pub fn get_power_supply_status<P: PortIo>(ec: &mut Ec<P>, power_supply_id: u8) -> Result<bool> {
    if power_supply_id == 0 || power_supply_id > 2 {
        return Err(EcError::InvalidPowerSupplyId(power_supply_id));
    }
    let (c0, c1) = POWER_SUPPLY_STATUS_COMMAND;
    let byte = ec.read_byte(c0, c1)?;
    Ok((byte >> power_supply_id) & 0x01 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SimulatedChip;

    #[test]
    fn fan_status_decodes_inverted_bit() {
        let mut chip = SimulatedChip::new();
        chip.regs.insert(0x0242, 0b0000_0100); // fan 2 stopped
        let mut ec = Ec::new(chip);
        assert!(!get_fan_status(&mut ec, 2).unwrap());
        assert!(get_fan_status(&mut ec, 0).unwrap());
        assert!(get_fan_status(&mut ec, 5).unwrap());
    }

    #[test]
    fn fan_status_uses_range_local_bit_offset() {
        let mut chip = SimulatedChip::new();
        chip.regs.insert(0x0244, 0b0000_0010); // fan 7 stopped
        chip.regs.insert(0x0259, 0b0010_0000); // fan 25 stopped
        let mut ec = Ec::new(chip);
        assert!(get_fan_status(&mut ec, 6).unwrap());
        assert!(!get_fan_status(&mut ec, 7).unwrap());
        assert!(!get_fan_status(&mut ec, 25).unwrap());
        assert!(get_fan_status(&mut ec, 20).unwrap());
    }

    #[test]
    fn fan_status_rejects_redundant_psu_ids() {
        assert!(matches!(
            fan_status_command(10),
            Err(EcError::InvalidFanId(10))
        ));
        assert!(matches!(
            fan_status_command(11),
            Err(EcError::InvalidFanId(11))
        ));
    }

    #[test]
    fn fan_speed_combines_bytes_high_first() {
        let mut chip = SimulatedChip::new();
        chip.regs.insert(0x0624, 0x03); // fan 0 high byte
        chip.regs.insert(0x0625, 0x5C); // fan 0 low byte
        let mut ec = Ec::new(chip);
        assert_eq!(get_fan_speed(&mut ec, 0).unwrap(), 860);
    }

    #[test]
    fn redundant_psu_fans_use_fixed_tach_registers() {
        assert_eq!(fan_speed_commands(10).unwrap(), (0x065B, 0x065A));
        assert_eq!(fan_speed_commands(11).unwrap(), (0x065E, 0x065D));
    }

    #[test]
    fn fan_speed_commands_follow_range_arithmetic() {
        assert_eq!(fan_speed_commands(0).unwrap(), (0x0624, 0x0625));
        assert_eq!(fan_speed_commands(5).unwrap(), (0x062E, 0x062F));
        assert_eq!(fan_speed_commands(6).unwrap(), (0x0620, 0x0621));
        assert_eq!(fan_speed_commands(20).unwrap(), (0x0644, 0x0645));
        assert_eq!(fan_speed_commands(35).unwrap(), (0x0636, 0x0637));
        assert!(fan_speed_commands(12).is_err());
    }

    #[test]
    fn set_fan_speed_switches_to_manual_then_writes_pwm() {
        let mut ec = Ec::new(SimulatedChip::new());
        set_fan_speed(&mut ec, 5, 127).unwrap();
        let chip = ec.into_inner();
        assert_eq!(chip.written, vec![(0x0220, 0x10), (0x022E, 49)]);
    }

    #[test]
    fn set_fan_speed_picks_registers_per_range() {
        let mut ec = Ec::new(SimulatedChip::new());
        set_fan_speed(&mut ec, 30, 255).unwrap();
        let chip = ec.into_inner();
        assert_eq!(chip.written, vec![(0x0222, 0x10), (0x023B, 100)]);
    }

    #[test]
    fn pwm_decode_is_bit_exact() {
        assert_eq!(decode_fan_pwm(0), 0);
        assert_eq!(decode_fan_pwm(1), 2);
        assert_eq!(decode_fan_pwm(128), 70); // 326 truncated to u8
        assert_eq!(decode_fan_pwm(254), 135); // 647 truncated to u8
        assert_eq!(decode_fan_pwm(255), 138); // 650 truncated to u8
        assert_eq!(decode_fan_pwm(100), 255);
    }

    #[test]
    fn pwm_read_decodes_register_byte() {
        let mut chip = SimulatedChip::new();
        chip.regs.insert(0x022E, 50);
        let mut ec = Ec::new(chip);
        assert_eq!(get_fan_pwm(&mut ec, 3).unwrap(), 127);
    }

    #[test]
    fn speed_percent_round_trip_stays_within_one_point() {
        for percent in 0..=100u8 {
            let back = raw_speed_to_percent(percent_to_raw_speed(percent));
            assert!(
                back <= percent && percent - back <= 1,
                "percent {} round-tripped to {}",
                percent,
                back
            );
        }
    }

    #[test]
    fn temperature_reads_whole_degrees() {
        let mut chip = SimulatedChip::new();
        chip.regs.insert(0x0601, 42);
        let mut ec = Ec::new(chip);
        assert_eq!(get_temperature(&mut ec, 1).unwrap(), 42.0);
    }

    #[test]
    fn temperature_command_mapping() {
        assert_eq!(temperature_command(0).unwrap(), 0x0600);
        assert_eq!(temperature_command(1).unwrap(), 0x0601);
        assert_eq!(temperature_command(5).unwrap(), 0x0602);
        assert_eq!(temperature_command(7).unwrap(), 0x0604);
        assert_eq!(temperature_command(10).unwrap(), 0x0659);
        assert_eq!(temperature_command(11).unwrap(), 0x065C);
        assert_eq!(temperature_command(15).unwrap(), 0x0606);
        assert_eq!(temperature_command(38).unwrap(), 0x061D);
        for bad in [2, 3, 4, 8, 9, 12, 14, 39, 255] {
            assert!(temperature_command(bad).is_err());
        }
    }

    #[test]
    fn front_led_writes_mode_code() {
        let mut ec = Ec::new(SimulatedChip::new());
        set_front_led(&mut ec, LedMode::On).unwrap();
        set_front_led(&mut ec, LedMode::Blink).unwrap();
        set_front_led(&mut ec, LedMode::Off).unwrap();
        let chip = ec.into_inner();
        assert_eq!(
            chip.written,
            vec![(0x5501, 2), (0x5501, 1), (0x5501, 0)]
        );
    }

    #[test]
    fn led_mode_parses_known_strings_only() {
        assert_eq!("on".parse::<LedMode>().unwrap(), LedMode::On);
        assert_eq!("off".parse::<LedMode>().unwrap(), LedMode::Off);
        assert_eq!("blink".parse::<LedMode>().unwrap(), LedMode::Blink);
        assert!(matches!(
            "purple".parse::<LedMode>(),
            Err(EcError::InvalidLedMode(_))
        ));
    }

    #[test]
    fn power_supply_status_validates_id_and_decodes_bit() {
        let mut chip = SimulatedChip::new();
        chip.regs.insert(0x4500, 0b0000_0100); // supply 2 down
        let mut ec = Ec::new(chip);
        assert!(get_power_supply_status(&mut ec, 1).unwrap());
        assert!(!get_power_supply_status(&mut ec, 2).unwrap());
        assert!(matches!(
            get_power_supply_status(&mut ec, 0),
            Err(EcError::InvalidPowerSupplyId(0))
        ));
        assert!(matches!(
            get_power_supply_status(&mut ec, 3),
            Err(EcError::InvalidPowerSupplyId(3))
        ));
    }
}
