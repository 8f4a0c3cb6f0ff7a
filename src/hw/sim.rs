//! Stand-ins for the console's sound and save hardware.
//!
//! They keep just enough state to check the adapters against (register files, bus and
//! busy protocol counters) and optionally forward what they see to the audio engine so
//! the host build makes a noise.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crossbeam_channel::Sender;
use tracing::warn;

use super::{Coprocessor, PsgPort, Sram};
use crate::audio_api::AudioCommand;
use crate::devices::fm::YM_BASE;
use crate::devices::pcm::{BANK_REGISTER, OUTPUT_LEVEL};

pub const Z80_RAM_LEN: usize = 0x2000;
pub const SRAM_LEN: usize = 0x10000;

// status polls the busy flag stays up after a data write
const DEFAULT_YM_BUSY_POLLS: u32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    pub acquisitions: u32,
    /// Accesses made without holding the bus.
    pub violations: u32,
}

pub struct SimZ80 {
    ram: Vec<u8>,
    requested: bool,
    granted: bool,
    grant_latency: u32,
    waited: u32,
    bank: u16,
    ym: Ym2612,
    level: Arc<AtomicU8>,
    tap: Option<Sender<AudioCommand>>,
    stats: BusStats,
}

impl Default for SimZ80 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimZ80 {
    pub fn new() -> Self {
        Self {
            ram: vec![0; Z80_RAM_LEN],
            requested: false,
            granted: false,
            grant_latency: 0,
            waited: 0,
            bank: 0,
            ym: Ym2612::new(),
            level: Arc::new(AtomicU8::new(0)),
            tap: None,
            stats: BusStats::default(),
        }
    }

    /// Forward mailbox and bank writes to the audio engine, and read the level meter it publishes.
    pub fn with_tap(mut self, tap: Sender<AudioCommand>, level: Arc<AtomicU8>) -> Self {
        self.tap = Some(tap);
        self.level = level;
        self
    }

    pub fn set_grant_latency(&mut self, polls: u32) {
        self.grant_latency = polls;
    }

    pub fn holds_bus(&self) -> bool {
        self.granted
    }

    pub fn ram(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr) % Z80_RAM_LEN]
    }

    pub fn ram_u16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.ram(addr), self.ram(addr + 1)])
    }

    pub fn bank(&self) -> u16 {
        self.bank
    }

    pub fn ym(&self) -> &Ym2612 {
        &self.ym
    }

    pub fn ym_mut(&mut self) -> &mut Ym2612 {
        &mut self.ym
    }

    pub fn stats(&self) -> BusStats {
        self.stats
    }

    pub fn level(&self) -> &Arc<AtomicU8> {
        &self.level
    }

    fn forward(&self, cmd: AudioCommand) {
        if let Some(tap) = &self.tap {
            let _ = tap.try_send(cmd);
        }
    }

    fn check_access(&mut self, what: &str, addr: u16) -> bool {
        if self.granted {
            return true;
        }
        self.stats.violations += 1;
        warn!("{what} at {addr:#06x} without the co-processor bus");
        false
    }
}

impl Coprocessor for SimZ80 {
    fn request_bus(&mut self) {
        self.requested = true;
        self.waited = 0;
    }

    fn bus_granted(&mut self) -> bool {
        if !self.requested {
            return false;
        }
        if self.granted {
            return true;
        }
        if self.waited >= self.grant_latency {
            self.granted = true;
            self.stats.acquisitions += 1;
            true
        } else {
            self.waited += 1;
            false
        }
    }

    fn release_bus(&mut self) {
        self.requested = false;
        self.granted = false;
    }

    fn read(&mut self, addr: u16) -> u8 {
        if !self.check_access("read", addr) {
            return 0xFF;
        }
        match addr {
            a if (YM_BASE..YM_BASE + 4).contains(&a) => self.ym.read_status(),
            OUTPUT_LEVEL => self.level.load(Ordering::Relaxed),
            a if usize::from(a) < Z80_RAM_LEN => self.ram[usize::from(a)],
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if !self.check_access("write", addr) {
            return;
        }
        match addr {
            a if (YM_BASE..YM_BASE + 4).contains(&a) => self.ym.write_port((a - YM_BASE) as u8, value),
            BANK_REGISTER => {
                // 9-bit shift register, fed one bit per write, LSB first
                self.bank = (self.bank >> 1) | (u16::from(value & 1) << 8);
                self.forward(AudioCommand::Bank(self.bank));
            }
            a if usize::from(a) < Z80_RAM_LEN => {
                self.ram[usize::from(a)] = value;
                self.forward(AudioCommand::Mailbox { addr: a, value });
            }
            _ => {}
        }
    }
}

/// Register file of the FM chip as seen through its four ports.
pub struct Ym2612 {
    regs: [[u8; 256]; 2],
    address: [u8; 2],
    busy: u32,
    busy_polls: u32,
    keys: [u8; 6],
    data_writes: u32,
    violations: u32,
}

impl Default for Ym2612 {
    fn default() -> Self {
        Self::new()
    }
}

impl Ym2612 {
    pub fn new() -> Self {
        Self {
            regs: [[0; 256]; 2],
            address: [0; 2],
            busy: 0,
            busy_polls: DEFAULT_YM_BUSY_POLLS,
            keys: [0; 6],
            data_writes: 0,
            violations: 0,
        }
    }

    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    pub fn read_status(&mut self) -> u8 {
        if self.busy > 0 {
            self.busy -= 1;
            0x80
        } else {
            0x00
        }
    }

    pub fn write_port(&mut self, port: u8, value: u8) {
        if self.busy > 0 {
            self.violations += 1;
            warn!(port, value, "FM write while busy");
        }
        let part = usize::from((port >> 1) & 1);
        if port & 1 == 0 {
            self.address[part] = value;
            return;
        }
        let reg = self.address[part];
        self.regs[part][usize::from(reg)] = value;
        self.data_writes += 1;
        self.busy = self.busy_polls;
        if part == 0 && reg == 0x28 {
            let channel = match value & 0x07 {
                c @ 0..=2 => usize::from(c),
                c @ 4..=6 => usize::from(c) - 1,
                _ => return,
            };
            self.keys[channel] = value >> 4;
        }
    }

    pub fn reg(&self, part: usize, reg: u8) -> u8 {
        self.regs[part][usize::from(reg)]
    }

    /// The register currently selected on a part's address port.
    pub fn address(&self, part: usize) -> u8 {
        self.address[part]
    }

    /// Operator key mask last written for a channel (0 = all keyed off).
    pub fn key_mask(&self, channel: usize) -> u8 {
        self.keys[channel]
    }

    pub fn data_writes(&self) -> u32 {
        self.data_writes
    }

    /// Writes that arrived while the busy flag was still up.
    pub fn violations(&self) -> u32 {
        self.violations
    }
}

const PSG_LOG_LEN: usize = 1024;

/// The PSG port: remembers recent bytes and forwards them to the audio engine.
#[derive(Default)]
pub struct PsgTap {
    log: Vec<u8>,
    tap: Option<Sender<AudioCommand>>,
}

impl PsgTap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tap(tap: Sender<AudioCommand>) -> Self {
        Self { log: Vec::new(), tap: Some(tap) }
    }

    pub fn written(&self) -> &[u8] {
        &self.log
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

impl PsgPort for PsgTap {
    fn write(&mut self, byte: u8) {
        if self.log.len() >= PSG_LOG_LEN {
            self.log.drain(..PSG_LOG_LEN / 2);
        }
        self.log.push(byte);
        if let Some(tap) = &self.tap {
            let _ = tap.try_send(AudioCommand::Psg(byte));
        }
    }
}

/// Battery RAM backed by a file (or nothing, for tests).
pub struct FileSram {
    path: Option<PathBuf>,
    data: Vec<u8>,
    unlocked: bool,
    dirty: bool,
    rejected: u32,
}

impl FileSram {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let mut data = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        data.resize(SRAM_LEN, 0);
        Ok(Self {
            path: Some(path.to_path_buf()),
            data,
            unlocked: false,
            dirty: false,
            rejected: 0,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: vec![0; SRAM_LEN],
            unlocked: false,
            dirty: false,
            rejected: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Change a byte behind the sequencer's back.
    pub fn poke(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    /// Writes refused because the SRAM was locked.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }
}

impl Sram for FileSram {
    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn lock(&mut self) {
        self.unlocked = false;
    }

    fn read(&mut self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, offset: usize, value: u8) {
        if !self.unlocked {
            self.rejected += 1;
            warn!(offset, "sram write while locked");
            return;
        }
        if let Some(byte) = self.data.get_mut(offset) {
            *byte = value;
            self.dirty = true;
        }
    }

    fn commit(&mut self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.data)?;
        self.dirty = false;
        Ok(())
    }
}
