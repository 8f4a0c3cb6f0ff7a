/// What the simulated chips forward to the audio engine.
///
/// The engine can't see the chips (they live on the frame loop's thread), so every write
/// that changes what should be heard is mirrored here, in the order it happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCommand {
    // One byte written to the PSG port
    Psg(u8),

    // A write into the co-processor's RAM, i.e. the PCM driver's mailbox
    Mailbox { addr: u16, value: u8 },

    // The ROM bank register after a bit was shifted in
    Bank(u16),
}
