use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const SIDX: FourCC = FourCC(*b"sidx");

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

/// Compact 32-bit box header as it appears at the top level of a fragmented file.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,   // total size including the 8 header bytes
    pub typ: FourCC,
    pub start: u64,  // file offset of header start
}

impl BoxHeader {
    pub const LEN: u64 = 8;

    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn payload_len(&self) -> u64 {
        self.size - Self::LEN
    }

    pub fn is_sidx(&self) -> bool {
        self.typ == FourCC::SIDX
    }
}
