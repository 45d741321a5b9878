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

//! Nasfan - IT8528 Super I/O control for QNAP NAS units
//!
//! This library exposes the chip handshake protocol, the register map with
//! its decoders, and the CLI command implementations, all written against a
//! narrow port-I/O capability so they can be tested without hardware.

pub mod commands;
pub mod ec;
pub mod error;
pub mod hal;
pub mod logger;
pub mod ports;
pub mod registers;

#[cfg(test)]
pub mod test_utils;
