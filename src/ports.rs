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

//! Raw x86 port I/O behind a narrow capability trait.
//!
//! Everything above this module talks to the chip through [`PortIo`], so the
//! protocol engine and the register map can run against a simulated chip in
//! tests while production code uses `in`/`out` instructions on the real
//! ports.

use std::io;

/// First identification port (register select)
pub const ID_PORT_1: u16 = 0x2E;
/// Second identification port (register data)
pub const ID_PORT_2: u16 = 0x2F;
/// Communication data port
pub const COMM_PORT_1: u16 = 0x68;
/// Communication status/command port
pub const COMM_PORT_2: u16 = 0x6C;

/// Single-byte access to hardware I/O ports.
pub trait PortIo {
    fn read_port(&mut self, port: u16) -> u8;
    fn write_port(&mut self, port: u16, value: u8);
}

/// Port access using raw `in`/`out` instructions.
///
/// Constructing one acquires read/write permission on the four IT8528 ports
/// via `ioperm(2)`, which requires root or CAP_SYS_RAWIO. Permission is held
/// for the rest of the process lifetime; there is no explicit release.
pub struct DirectPortIo {
    _private: (),
}

impl DirectPortIo {
    pub fn acquire() -> io::Result<Self> {
        for port in [ID_PORT_1, ID_PORT_2, COMM_PORT_1, COMM_PORT_2] {
            let rc = unsafe { libc::ioperm(libc::c_ulong::from(port), 1, 1) };
            if rc != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(Self { _private: () })
    }
}

impl PortIo for DirectPortIo {
    #[inline]
    fn read_port(&mut self, port: u16) -> u8 {
        let value: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                in("dx") port,
                out("al") value,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }

    #[inline]
    fn write_port(&mut self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags),
            );
        }
    }
}
