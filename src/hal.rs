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

//! Binding to QNAP's vendor HAL library.
//!
//! The self-test verb dynamically loads `libuLinux_hal.so` and calls the
//! four `ec_sys_*` entry points our register map was reverse engineered
//! from, so results can be compared side by side. The vendor functions
//! return 0 on success and a negative code on failure, with the value in
//! an out-parameter; note the vendor's fan speed out-parameter is 32 bits
//! wide even though the chip register pair is 16.

use libloading::{Library, Symbol};

/// Library name resolved through the normal dynamic-linker search path
/// when the caller does not supply an explicit one.
pub const DEFAULT_HAL_LIBRARY: &str = "libuLinux_hal.so";

type GetFanStatusFn = unsafe extern "C" fn(u8, *mut u8) -> i8;
type GetFanPwmFn = unsafe extern "C" fn(u8, *mut u8) -> i8;
type GetFanSpeedFn = unsafe extern "C" fn(u8, *mut u32) -> i8;
type GetTemperatureFn = unsafe extern "C" fn(u8, *mut f64) -> i8;

/// Handle on a loaded vendor HAL library.
pub struct ReferenceHal {
    library: Library,
}

impl ReferenceHal {
    pub fn load(path: &str) -> Result<Self, libloading::Error> {
        let library = unsafe { Library::new(path) }?;
        Ok(Self { library })
    }

    pub fn get_fan_status(&self, fan_id: u8) -> Result<(i8, u8), libloading::Error> {
        let f: Symbol<GetFanStatusFn> =
            unsafe { self.library.get(b"ec_sys_get_fan_status\0") }?;
        let mut value = 0u8;
        let ret = unsafe { f(fan_id, &mut value) };
        Ok((ret, value))
    }

    pub fn get_fan_pwm(&self, fan_id: u8) -> Result<(i8, u8), libloading::Error> {
        let f: Symbol<GetFanPwmFn> = unsafe { self.library.get(b"ec_sys_get_fan_pwm\0") }?;
        let mut value = 0u8;
        let ret = unsafe { f(fan_id, &mut value) };
        Ok((ret, value))
    }

    pub fn get_fan_speed(&self, fan_id: u8) -> Result<(i8, u32), libloading::Error> {
        let f: Symbol<GetFanSpeedFn> =
            unsafe { self.library.get(b"ec_sys_get_fan_speed\0") }?;
        let mut value = 0u32;
        let ret = unsafe { f(fan_id, &mut value) };
        Ok((ret, value))
    }

    pub fn get_temperature(&self, sensor_id: u8) -> Result<(i8, f64), libloading::Error> {
        let f: Symbol<GetTemperatureFn> =
            unsafe { self.library.get(b"ec_sys_get_temperature\0") }?;
        let mut value = 0f64;
        let ret = unsafe { f(sensor_id, &mut value) };
        Ok((ret, value))
    }
}
