// Note number -> hardware pitch values for the two tone sources.

/// PSG counter values for the 12 semitones of the lowest octave. Higher octaves halve.
pub const PSG_COUNTER_TABLE: [u16; 12] = [851, 803, 758, 715, 675, 637, 601, 568, 536, 506, 477, 450];

/// Highest PSG note; note 72 is the top semitone of octave 5.
pub const PSG_NOTE_MAX: u8 = 72;

/// FM fnum values for one octave, calibrated at block 4.
pub const FM_FNUM_TABLE: [u16; 12] = [
    0x22B, // C
    0x250, // C#
    0x279, // D
    0x2A4, // D#
    0x2D3, // E
    0x305, // F
    0x33B, // F#
    0x374, // G
    0x3B2, // G#
    0x3F4, // A
    0x43B, // A#
    0x487, // B
];

pub const FM_NOTE_MIN: u8 = 12;
pub const FM_NOTE_MAX: u8 = 107;

/// Map a 1-based PSG note to a tone divider.
///
/// Note 0 means "silent" and is handled by the caller; it is treated like note 1 here.
/// Notes above [`PSG_NOTE_MAX`] are pinned to it so the semitone never leaves the table.
pub fn note_to_divider(note: u8) -> u16 {
    debug_assert!(note != 0, "note 0 is silence and must be gated by the caller");
    let index = note.saturating_sub(1).min(PSG_NOTE_MAX - 1);
    let (octave, semitone) = match index {
        0..=11 => (0, index),
        12..=23 => (1, index - 12),
        24..=35 => (2, index - 24),
        36..=47 => (3, index - 36),
        48..=59 => (4, index - 48),
        _ => (5, index - 60),
    };
    PSG_COUNTER_TABLE[semitone as usize] >> octave
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FmPitch {
    pub block: u8,
    pub fnum: u16,
}

/// Map a MIDI-style note to the FM block/fnum pair.
///
/// The fnum table is not rescaled per block; the block field alone carries the octave.
pub fn note_to_block_fnum(note: u8) -> FmPitch {
    let note = note.clamp(FM_NOTE_MIN, FM_NOTE_MAX);
    let octave = i16::from(note / 12) - 1;
    FmPitch {
        block: octave.clamp(0, 7) as u8,
        fnum: FM_FNUM_TABLE[usize::from(note % 12)],
    }
}
