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

//! IT8528 handshake protocol engine.
//!
//! The chip is driven over two 8-bit ports: a data port and a status/command
//! port. Every exchange is a hand-shaken polling sequence; the engine must
//! never write while the chip's input buffer is full, and must drain stale
//! output before issuing a new command. All timing constants come from the
//! vendor driver: 50 microsecond poll interval, 400 polls for readiness,
//! 5000 polls for buffer draining.

use std::thread;
use std::time::Duration;

use crate::error::{EcError, Result};
use crate::ports::{PortIo, COMM_PORT_1, COMM_PORT_2, ID_PORT_1, ID_PORT_2};

/// Status reads allowed before a readiness wait times out
const WAIT_FOR_READY_RETRIES: u32 = 400;
/// Status reads allowed before a buffer clear times out; draining can
/// legitimately take an order of magnitude longer than a readiness wait
const CLEAR_BUFFER_RETRIES: u32 = 5000;
/// Sleep between status polls
const POLL_INTERVAL: Duration = Duration::from_micros(50);

/// Output-buffer-full status bit: chip has data the host has not read yet
const STATUS_OBF: u8 = 0x01;
/// Input-buffer-full status bit: host wrote data the chip has not consumed
const STATUS_IBF: u8 = 0x02;

/// Direction a readiness wait polls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ready {
    /// Wait until the chip has consumed what we wrote (IBF clear)
    Input,
    /// Wait until the host has consumed what the chip wrote (OBF clear)
    Output,
}

impl Ready {
    fn mask(self) -> u8 {
        match self {
            Ready::Input => STATUS_IBF,
            Ready::Output => STATUS_OBF,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Ready::Input => "input",
            Ready::Output => "output",
        }
    }
}

/// Handle on the IT8528 chip, owning the injected port capability.
pub struct Ec<P: PortIo> {
    ports: P,
}

impl<P: PortIo> Ec<P> {
    pub fn new(ports: P) -> Self {
        Self { ports }
    }

    /// Releases the port capability, mainly so tests can inspect a
    /// simulated chip after driving it.
    pub fn into_inner(self) -> P {
        self.ports
    }

    /// Probes the identification port pair. The chip is present iff reading
    /// back registers 0x20 and 0x21 yields 0x85 and 0x28. A single
    /// mismatched pair signals absence; there is no retry.
    pub fn check_if_present(&mut self) -> bool {
        self.ports.write_port(ID_PORT_1, 0x20);
        let byte_1 = self.ports.read_port(ID_PORT_2);
        self.ports.write_port(ID_PORT_1, 0x21);
        let byte_2 = self.ports.read_port(ID_PORT_2);
        byte_1 == 0x85 && byte_2 == 0x28
    }

    /// Polls the status port until the buffer bit for `ready` reads 0,
    /// sleeping between polls. Performs exactly `WAIT_FOR_READY_RETRIES`
    /// reads before giving up.
    pub fn wait_for_ready(&mut self, ready: Ready) -> Result<()> {
        for _ in 0..WAIT_FOR_READY_RETRIES {
            let byte = self.ports.read_port(COMM_PORT_2);
            if byte & ready.mask() == 0 {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(EcError::ReadyTimeout {
            direction: ready.name(),
        })
    }

    /// Polls the status port until the output-buffer-full bit reads 1,
    /// i.e. until the chip has produced data. Call sites follow up with a
    /// data-port read to actually drain it.
    pub fn clear_buffer(&mut self) -> Result<()> {
        for _ in 0..CLEAR_BUFFER_RETRIES {
            let byte = self.ports.read_port(COMM_PORT_2);
            if byte & STATUS_OBF == STATUS_OBF {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(EcError::ClearBufferTimeout)
    }

    /// Sends a two-byte command. Any readiness timeout aborts the whole
    /// sequence; partial writes are not rolled back (hardware state is not
    /// transactional).
    pub fn send_commands(&mut self, command0: u8, command1: u8) -> Result<()> {
        self.wait_for_ready(Ready::Output)?;
        self.ports.read_port(COMM_PORT_1);
        self.wait_for_ready(Ready::Input)?;
        self.ports.write_port(COMM_PORT_2, 0x88);
        self.wait_for_ready(Ready::Input)?;
        self.ports.write_port(COMM_PORT_1, command0);
        self.wait_for_ready(Ready::Input)?;
        self.ports.write_port(COMM_PORT_1, command1);
        self.wait_for_ready(Ready::Input)?;
        Ok(())
    }

    /// Reads one register byte. Stale pending output is drained first so
    /// the value read afterwards belongs to this command.
    pub fn read_byte(&mut self, command0: u8, command1: u8) -> Result<u8> {
        if self.ports.read_port(COMM_PORT_2) & STATUS_OBF == STATUS_OBF {
            self.clear_buffer()?;
            self.ports.read_port(COMM_PORT_1);
        }
        self.send_commands(command0, command1)?;
        self.clear_buffer()?;
        Ok(self.ports.read_port(COMM_PORT_1))
    }

    /// Writes one register byte. The high bit of `command0` flags the
    /// exchange as a write.
    pub fn write_byte(&mut self, command0: u8, command1: u8, value: u8) -> Result<()> {
        self.wait_for_ready(Ready::Input)?;
        self.ports.write_port(COMM_PORT_2, 0x88);
        self.wait_for_ready(Ready::Input)?;
        self.ports.write_port(COMM_PORT_1, command0 | 0x80);
        self.wait_for_ready(Ready::Input)?;
        self.ports.write_port(COMM_PORT_1, command1);
        self.wait_for_ready(Ready::Input)?;
        self.ports.write_port(COMM_PORT_1, value);
        Ok(())
    }
}
