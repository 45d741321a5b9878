/*
 * Test utilities for Nasfan
 *
 * Provides a simulated IT8528 chip that implements the PortIo capability,
 * so the protocol engine, register map and command layer can be exercised
 * without hardware.
 */

use std::collections::HashMap;

use crate::ports::{PortIo, COMM_PORT_1, COMM_PORT_2, ID_PORT_1, ID_PORT_2};

/// Tracks where the simulated chip is within an 0x88 command exchange.
#[derive(Clone, Copy)]
enum CommandSeq {
    Idle,
    AwaitCommand0,
    AwaitCommand1 { command0: u8 },
    AwaitValue { register: u16 },
}

/// In-memory model of the IT8528 chip.
///
/// The status port reports output-buffer-full whenever a command result is
/// pending and always reports the input buffer as empty, so well-formed
/// sequences run without waiting. `force_status` overrides that to exercise
/// timeout paths.
pub struct SimulatedChip {
    /// Identification register file, read via the 0x2E/0x2F port pair
    pub id_regs: HashMap<u8, u8>,
    /// Register file keyed by command word, e.g. 0x0242 for (0x42, 0x02)
    pub regs: HashMap<u16, u8>,
    /// Registers stored through write exchanges, in order
    pub written: Vec<(u16, u8)>,
    /// Pending command result; mirrored into the OBF status bit
    pub data_out: Option<u8>,
    /// When set, every status-port read returns this value
    pub force_status: Option<u8>,
    /// Number of status-port reads performed
    pub status_reads: usize,
    /// Total port operations of any kind
    pub port_ops: usize,
    id_select: u8,
    seq: CommandSeq,
}

impl SimulatedChip {
    pub fn new() -> Self {
        let mut id_regs = HashMap::new();
        id_regs.insert(0x20, 0x85);
        id_regs.insert(0x21, 0x28);
        Self {
            id_regs,
            regs: HashMap::new(),
            written: Vec::new(),
            data_out: None,
            force_status: None,
            status_reads: 0,
            port_ops: 0,
            id_select: 0,
            seq: CommandSeq::Idle,
        }
    }
}

impl PortIo for SimulatedChip {
    fn read_port(&mut self, port: u16) -> u8 {
        self.port_ops += 1;
        match port {
            ID_PORT_2 => self.id_regs.get(&self.id_select).copied().unwrap_or(0xFF),
            COMM_PORT_2 => {
                self.status_reads += 1;
                self.force_status
                    .unwrap_or(if self.data_out.is_some() { 0x01 } else { 0x00 })
            }
            COMM_PORT_1 => self.data_out.take().unwrap_or(0x00),
            _ => 0xFF,
        }
    }

    fn write_port(&mut self, port: u16, value: u8) {
        self.port_ops += 1;
        match port {
            ID_PORT_1 => self.id_select = value,
            COMM_PORT_2 => {
                if value == 0x88 {
                    self.seq = CommandSeq::AwaitCommand0;
                }
            }
            COMM_PORT_1 => match self.seq {
                CommandSeq::AwaitCommand0 => {
                    self.seq = CommandSeq::AwaitCommand1 { command0: value };
                }
                CommandSeq::AwaitCommand1 { command0 } => {
                    let register =
                        (u16::from(value) << 8) | u16::from(command0 & 0x7F);
                    if command0 & 0x80 != 0 {
                        self.seq = CommandSeq::AwaitValue { register };
                    } else {
                        self.data_out =
                            Some(self.regs.get(&register).copied().unwrap_or(0x00));
                        self.seq = CommandSeq::Idle;
                    }
                }
                CommandSeq::AwaitValue { register } => {
                    self.regs.insert(register, value);
                    self.written.push((register, value));
                    self.seq = CommandSeq::Idle;
                }
                CommandSeq::Idle => {}
            },
            _ => {}
        }
    }
}
