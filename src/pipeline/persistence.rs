// Saving the project to battery RAM and getting it back at boot.
//
// The record is a flat byte layout with a magic number up front and an 8-bit sum at the
// end. The cartridge only wires up every other byte, so logical byte i lives at physical
// offset 2 * i and the bytes in between are never touched.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SeqError};
use crate::hw::Sram;
use crate::pipeline::project::{Instrument, InstrumentParam, Project, Step, FM_CHANNELS, FM_OPERATORS};
use crate::shared::STEPS_PER_PATTERN;

pub const MAGIC: u16 = 0xABCE;

const TEMPO_AT: usize = 2;
const INSTRUMENT_AT: usize = 3;
const INSTRUMENT_LEN: usize = InstrumentParam::SCALARS.len() + FM_CHANNELS * FM_OPERATORS;
const STEPS_AT: usize = INSTRUMENT_AT + INSTRUMENT_LEN;
const CHECKSUM_AT: usize = STEPS_AT + 5 * STEPS_PER_PATTERN;

/// Logical length: magic, tempo, instrument, five step arrays, checksum, pad.
pub const RECORD_LEN: usize = CHECKSUM_AT + 2;

const SRAM_BASE: usize = 0;
const STRIDE: usize = 2;

/// What to do with a record whose checksum doesn't add up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Treat it as corrupt.
    #[default]
    Strict,
    /// Warn and use it anyway, like old firmware did.
    Lenient,
}

/// How boot went, for the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootStatus {
    Loaded,
    Fresh,
    BadMagic,
    ChecksumMismatch,
}

impl BootStatus {
    pub fn text(self) -> &'static str {
        match self {
            BootStatus::Loaded => "saved sequence loaded",
            BootStatus::Fresh => "new sequence",
            BootStatus::BadMagic => "incorrect magic",
            BootStatus::ChecksumMismatch => "checksum mismatch",
        }
    }
}

/// Wrapping sum of every byte ahead of the checksum.
pub fn checksum(record: &[u8; RECORD_LEN]) -> u8 {
    record[..CHECKSUM_AT].iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

pub fn encode(project: &Project) -> [u8; RECORD_LEN] {
    let mut record = [0u8; RECORD_LEN];
    record[..2].copy_from_slice(&MAGIC.to_be_bytes());
    record[TEMPO_AT] = project.tempo;

    let inst = &project.instrument;
    for (i, param) in InstrumentParam::SCALARS.into_iter().enumerate() {
        record[INSTRUMENT_AT + i] = inst.get(param);
    }
    let levels_at = INSTRUMENT_AT + InstrumentParam::SCALARS.len();
    for (i, level) in inst.levels.iter().flatten().enumerate() {
        record[levels_at + i] = *level;
    }

    let steps = &project.pattern.steps;
    for (i, step) in steps.iter().enumerate() {
        record[STEPS_AT + i] = step.gate;
        record[STEPS_AT + STEPS_PER_PATTERN + i] = u8::from(step.accent);
        record[STEPS_AT + 2 * STEPS_PER_PATTERN + i] = step.speed;
        record[STEPS_AT + 3 * STEPS_PER_PATTERN + i] = step.psg_note;
        record[STEPS_AT + 4 * STEPS_PER_PATTERN + i] = step.fm_note as u8;
    }

    record[CHECKSUM_AT] = checksum(&record);
    record
}

/// Validate and unpack a record. Values are clamped so nothing out of range gets in.
pub fn decode(record: &[u8; RECORD_LEN], policy: ChecksumPolicy, gate_max: u8) -> Result<Project> {
    let found = u16::from_be_bytes([record[0], record[1]]);
    if found != MAGIC {
        return Err(SeqError::BadMagic { found });
    }
    let stored = record[CHECKSUM_AT];
    let computed = checksum(record);
    if stored != computed {
        match policy {
            ChecksumPolicy::Strict => return Err(SeqError::ChecksumMismatch { stored, computed }),
            ChecksumPolicy::Lenient => warn!(stored, computed, "record checksum mismatch, using it anyway"),
        }
    }

    let mut instrument = Instrument::default();
    for (i, param) in InstrumentParam::SCALARS.into_iter().enumerate() {
        instrument.set(param, record[INSTRUMENT_AT + i]);
    }
    let levels_at = INSTRUMENT_AT + InstrumentParam::SCALARS.len();
    for (i, level) in instrument.levels.iter_mut().flatten().enumerate() {
        *level = record[levels_at + i];
    }

    let mut project = Project {
        tempo: record[TEMPO_AT].max(1),
        instrument: instrument.clamped(),
        ..Project::default()
    };
    for (i, step) in project.pattern.steps.iter_mut().enumerate() {
        *step = Step {
            gate: record[STEPS_AT + i],
            accent: record[STEPS_AT + STEPS_PER_PATTERN + i] != 0,
            speed: record[STEPS_AT + 2 * STEPS_PER_PATTERN + i],
            psg_note: record[STEPS_AT + 3 * STEPS_PER_PATTERN + i],
            fm_note: record[STEPS_AT + 4 * STEPS_PER_PATTERN + i] as i8,
        }
        .clamped(gate_max);
    }
    Ok(project)
}

pub fn save<S: Sram>(sram: &mut S, project: &Project) -> Result<()> {
    let record = encode(project);
    sram.unlock();
    for (i, byte) in record.iter().enumerate() {
        sram.write(SRAM_BASE + i * STRIDE, *byte);
    }
    sram.lock();
    sram.commit()?;
    Ok(())
}

pub fn read_record<S: Sram>(sram: &mut S) -> [u8; RECORD_LEN] {
    let mut record = [0u8; RECORD_LEN];
    for (i, byte) in record.iter_mut().enumerate() {
        *byte = sram.read(SRAM_BASE + i * STRIDE);
    }
    record
}

pub fn load<S: Sram>(sram: &mut S, policy: ChecksumPolicy, gate_max: u8) -> Result<Project> {
    decode(&read_record(sram), policy, gate_max)
}

/// Load the saved project, or start from defaults and save those when there is none
/// or it is damaged.
pub fn boot<S: Sram>(sram: &mut S, policy: ChecksumPolicy, gate_max: u8) -> Result<(Project, BootStatus)> {
    let status = match load(sram, policy, gate_max) {
        Ok(project) => {
            info!(tempo = project.tempo, "saved sequence loaded");
            return Ok((project, BootStatus::Loaded));
        }
        // blank or erased memory
        Err(SeqError::BadMagic { found: 0x0000 | 0xFFFF }) => BootStatus::Fresh,
        Err(SeqError::BadMagic { found }) => {
            warn!(found, "sram holds something else, starting over");
            BootStatus::BadMagic
        }
        Err(e @ SeqError::ChecksumMismatch { .. }) => {
            warn!("{e}, restoring defaults");
            BootStatus::ChecksumMismatch
        }
        Err(e) => return Err(e),
    };
    let project = Project::default();
    save(sram, &project)?;
    info!(status = status.text(), "default sequence written");
    Ok((project, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::sim::FileSram;
    use crate::pipeline::project::{FmLevelShape, FM_NOTE_OFF};

    fn edited() -> Project {
        let mut project = Project { tempo: 7, ..Project::default() };
        project.pattern.steps[3].gate = 2;
        project.pattern.steps[3].fm_note = FM_NOTE_OFF;
        project.pattern.steps[9].psg_note = 60;
        project.instrument.algorithm = 4;
        project.instrument.am = true;
        project.instrument.levels[4][1] = 99;
        project
    }

    #[test]
    fn layout_constants() {
        assert_eq!(INSTRUMENT_LEN, 38);
        assert_eq!(RECORD_LEN, 123);
        assert_eq!(InstrumentParam::list(FmLevelShape::Full).len(), INSTRUMENT_LEN);
    }

    #[test]
    fn round_trips_through_sram() {
        let mut sram = FileSram::in_memory();
        let project = edited();
        save(&mut sram, &project).unwrap();
        assert_eq!(load(&mut sram, ChecksumPolicy::Strict, 2).unwrap(), project);
        assert_eq!(sram.rejected(), 0);
    }

    #[test]
    fn record_uses_every_other_byte() {
        let mut sram = FileSram::in_memory();
        save(&mut sram, &Project::default()).unwrap();
        let bytes = sram.bytes();
        assert_eq!(bytes[0], 0xAB);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[2], 0xCE);
        assert_eq!(bytes[4], Project::default().tempo);
        for i in 0..RECORD_LEN {
            assert_eq!(bytes[2 * i + 1], 0);
        }
    }

    #[test]
    fn fm_note_off_is_stored_as_0xff() {
        let record = encode(&edited());
        assert_eq!(record[STEPS_AT + 4 * STEPS_PER_PATTERN + 3], 0xFF);
    }

    #[test]
    fn checksum_covers_everything_before_it() {
        let mut record = encode(&Project::default());
        assert_eq!(record[CHECKSUM_AT], checksum(&record));
        // the pad byte is outside the sum
        record[RECORD_LEN - 1] = 0x55;
        assert_eq!(record[CHECKSUM_AT], checksum(&record));
    }

    // A damaged record must not be trusted: strict loading refuses it and boot goes back
    // to defaults, saving them over the damage.
    #[test]
    fn flipped_checksum_bit_is_rejected_and_defaults_restored() {
        let mut sram = FileSram::in_memory();
        save(&mut sram, &edited()).unwrap();
        let at = CHECKSUM_AT * STRIDE;
        let flipped = sram.bytes()[at] ^ 0x01;
        sram.poke(at, flipped);

        assert!(matches!(
            load(&mut sram, ChecksumPolicy::Strict, 2),
            Err(SeqError::ChecksumMismatch { .. })
        ));
        let (project, status) = boot(&mut sram, ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(status, BootStatus::ChecksumMismatch);
        assert_eq!(project, Project::default());
        assert_eq!(load(&mut sram, ChecksumPolicy::Strict, 2).unwrap(), Project::default());
    }

    #[test]
    fn lenient_policy_accepts_a_bad_checksum() {
        let mut sram = FileSram::in_memory();
        save(&mut sram, &edited()).unwrap();
        let at = CHECKSUM_AT * STRIDE;
        let flipped = sram.bytes()[at] ^ 0x80;
        sram.poke(at, flipped);
        let (project, status) = boot(&mut sram, ChecksumPolicy::Lenient, 2).unwrap();
        assert_eq!(status, BootStatus::Loaded);
        assert_eq!(project, edited());
    }

    #[test]
    fn blank_memory_boots_fresh_and_saves() {
        let mut sram = FileSram::in_memory();
        let (project, status) = boot(&mut sram, ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(status, BootStatus::Fresh);
        assert_eq!(status.text(), "new sequence");
        assert_eq!(project, Project::default());
        assert_eq!(boot(&mut sram, ChecksumPolicy::Strict, 2).unwrap().1, BootStatus::Loaded);
    }

    #[test]
    fn foreign_magic_is_reported() {
        let mut sram = FileSram::in_memory();
        sram.poke(0, 0xAB);
        sram.poke(2, 0xCD);
        let (_, status) = boot(&mut sram, ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(status, BootStatus::BadMagic);
        assert_eq!(status.text(), "incorrect magic");
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let mut project = edited();
        project.pattern.steps[0].gate = 9;
        project.pattern.steps[1].speed = 0;
        project.instrument.fms = 200;
        let record = encode(&project);
        let loaded = decode(&record, ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(loaded.pattern.steps[0].gate, 2);
        assert_eq!(loaded.pattern.steps[1].speed, 1);
        assert_eq!(loaded.instrument.fms, 7);
    }

    #[test]
    fn survives_a_restart_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sram.bin");
        {
            let mut sram = FileSram::open(&path).unwrap();
            save(&mut sram, &edited()).unwrap();
        }
        let mut sram = FileSram::open(&path).unwrap();
        let (project, status) = boot(&mut sram, ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(status, BootStatus::Loaded);
        assert_eq!(project, edited());
    }
}
