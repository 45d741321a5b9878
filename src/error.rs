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

//! Unified error handling for Nasfan.
//!
//! A single error type covers the chip protocol, the register map and the
//! command layer, using thiserror for proper Display and Error impls.

use std::io;

/// Result type alias using EcError
pub type Result<T> = std::result::Result<T, EcError>;

/// Error type for all IT8528 operations
#[derive(thiserror::Error, Debug)]
pub enum EcError {
    #[error("IT8528 chip not detected")]
    ChipNotPresent,

    #[error("timed out waiting for the EC {direction} buffer to drain")]
    ReadyTimeout { direction: &'static str },

    #[error("timed out waiting for the EC output buffer to fill")]
    ClearBufferTimeout,

    #[error("invalid fan ID: {0}")]
    InvalidFanId(u8),

    #[error("invalid sensor ID: {0}")]
    InvalidSensorId(u8),

    #[error("invalid power supply ID: {0} (must be 1 or 2)")]
    InvalidPowerSupplyId(u8),

    #[error("invalid LED mode: {0} (expected on, off or blink)")]
    InvalidLedMode(String),

    #[error("invalid percent: {0} (must be 0-100)")]
    InvalidPercent(u8),

    #[error("fan {0} reports an incorrect status")]
    FanNotRunning(u8),

    #[error("failed to acquire I/O port access: {0}")]
    PortAccess(#[from] io::Error),
}
