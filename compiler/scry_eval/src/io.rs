//! The target-access contract.
//!
//! Everything the interpreter may touch during a run: a synchronous
//! memory reader, a flat register-file snapshot, and the optional
//! frame/module/TLS base addresses. Absence of a base is only an error
//! if the bytecode actually needs it.

use std::ops::Range;

/// Synchronous target memory access.
pub trait MemoryReader {
    /// Fill `out` (whose length equals the range's) from target memory.
    /// Returns `false` if any byte of the range is unreadable.
    fn read_memory(&self, range: Range<u64>, out: &mut [u8]) -> bool;
}

/// Everything an interpretation may consult.
#[derive(Default, Clone, Copy)]
pub struct EvalIO<'a> {
    pub memory: Option<&'a dyn MemoryReader>,
    /// Flat register file, read by byte offset.
    pub regs: Option<&'a [u8]>,
    pub frame_base: Option<u64>,
    pub module_base: Option<u64>,
    pub tls_base: Option<u64>,
}

impl EvalIO<'_> {
    pub fn new() -> Self {
        EvalIO::default()
    }
}

/// A memory reader over one contiguous in-process buffer, as produced by
/// snapshotting or recording. Reads outside the buffer fail.
pub struct SliceMemory<'a> {
    base: u64,
    bytes: &'a [u8],
}

impl<'a> SliceMemory<'a> {
    pub fn new(base: u64, bytes: &'a [u8]) -> Self {
        SliceMemory { base, bytes }
    }
}

impl MemoryReader for SliceMemory<'_> {
    fn read_memory(&self, range: Range<u64>, out: &mut [u8]) -> bool {
        let Some(start) = range.start.checked_sub(self.base) else {
            return false;
        };
        let len = out.len() as u64;
        let Some(end) = start.checked_add(len) else {
            return false;
        };
        let (Ok(start), Ok(end)) = (usize::try_from(start), usize::try_from(end)) else {
            return false;
        };
        let Some(src) = self.bytes.get(start..end) else {
            return false;
        };
        out.copy_from_slice(src);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slice_memory_reads() {
        let bytes = [1u8, 2, 3, 4];
        let memory = SliceMemory::new(0x1000, &bytes);
        let mut out = [0u8; 2];
        assert!(memory.read_memory(0x1001..0x1003, &mut out));
        assert_eq!(out, [2, 3]);
    }

    #[test]
    fn test_slice_memory_out_of_range() {
        let bytes = [1u8, 2, 3, 4];
        let memory = SliceMemory::new(0x1000, &bytes);
        let mut out = [0u8; 2];
        assert!(!memory.read_memory(0xFFF..0x1001, &mut out));
        assert!(!memory.read_memory(0x1003..0x1005, &mut out));
    }
}
