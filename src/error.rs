use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeqError {
    #[error("co-processor bus not granted after {polls} polls")]
    BusTimeout { polls: u32 },

    #[error("FM chip busy after {polls} polls")]
    FmBusy { polls: u32 },

    #[error("incorrect magic {found:#06x}")]
    BadMagic { found: u16 },

    #[error("checksum mismatch (stored {stored:#04x}, computed {computed:#04x})")]
    ChecksumMismatch { stored: u8, computed: u8 },

    #[error("sram: {0}")]
    Io(#[from] std::io::Error),
}

impl SeqError {
    pub fn status_text(&self) -> &'static str {
        match self {
            SeqError::BusTimeout { .. } => "bus timeout - stopped",
            SeqError::FmBusy { .. } => "fm busy - stopped",
            SeqError::BadMagic { .. } => "incorrect magic",
            SeqError::ChecksumMismatch { .. } => "checksum mismatch",
            SeqError::Io(_) => "sram error",
        }
    }

    // the sound hardware is in an unknown state after these
    pub fn is_fatal(&self) -> bool {
        matches!(self, SeqError::BusTimeout { .. } | SeqError::FmBusy { .. })
    }
}

pub type Result<T> = std::result::Result<T, SeqError>;
