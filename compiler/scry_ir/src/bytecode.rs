//! Bytecode instruction set.
//!
//! The compiled artifact of an expression is a flat byte buffer: one opcode
//! byte followed by a fixed-width little-endian immediate (0/1/2/4/8 bytes,
//! op-dependent). In tree and list form the instructions are the tagged
//! [`Op`] enum — sub-kinds like the arithmetic [`TypeGroup`] are typed
//! fields and only get packed into immediates at encode time.

use std::fmt;

/// Coarse numeric category selecting arithmetic/conversion behavior,
/// independent of exact bit width.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum TypeGroup {
    /// Not a number the machine can operate on (records, functions, void).
    #[default]
    Other = 0,
    Unsigned = 1,
    Signed = 2,
    F32 = 3,
    F64 = 4,
}

impl TypeGroup {
    /// Decode from an immediate byte.
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(TypeGroup::Other),
            1 => Some(TypeGroup::Unsigned),
            2 => Some(TypeGroup::Signed),
            3 => Some(TypeGroup::F32),
            4 => Some(TypeGroup::F64),
            _ => None,
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(self, TypeGroup::Unsigned | TypeGroup::Signed)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, TypeGroup::F32 | TypeGroup::F64)
    }
}

/// Raw opcode byte values.
///
/// The interpreter decodes these; [`Op::code`] produces them.
pub mod opcode {
    pub const STOP: u8 = 0x00;
    pub const COND: u8 = 0x01;
    pub const SKIP: u8 = 0x02;
    pub const MEM_READ: u8 = 0x03;
    pub const REG_READ: u8 = 0x04;
    pub const REG_READ_DYN: u8 = 0x05;
    pub const FRAME_OFF: u8 = 0x06;
    pub const MODULE_OFF: u8 = 0x07;
    pub const TLS_OFF: u8 = 0x08;
    pub const CONST_U8: u8 = 0x09;
    pub const CONST_U16: u8 = 0x0A;
    pub const CONST_U32: u8 = 0x0B;
    pub const CONST_U64: u8 = 0x0C;
    pub const PICK: u8 = 0x0D;
    pub const INSERT: u8 = 0x0E;
    pub const TRUNC: u8 = 0x0F;
    pub const TRUNC_SIGNED: u8 = 0x10;
    pub const CONVERT: u8 = 0x11;
    pub const NEG: u8 = 0x12;
    pub const LOG_NOT: u8 = 0x13;
    pub const ADD: u8 = 0x14;
    pub const SUB: u8 = 0x15;
    pub const MUL: u8 = 0x16;
    pub const DIV: u8 = 0x17;
    pub const MOD: u8 = 0x18;
    pub const LSHIFT: u8 = 0x19;
    pub const RSHIFT: u8 = 0x1A;
    pub const BIT_AND: u8 = 0x1B;
    pub const BIT_OR: u8 = 0x1C;
    pub const BIT_XOR: u8 = 0x1D;
    pub const BIT_NOT: u8 = 0x1E;
    pub const LOG_AND: u8 = 0x1F;
    pub const LOG_OR: u8 = 0x20;
    pub const EQEQ: u8 = 0x21;
    pub const NOTEQ: u8 = 0x22;
    pub const LESS: u8 = 0x23;
    pub const LESS_EQ: u8 = 0x24;
    pub const GRTR: u8 = 0x25;
    pub const GRTR_EQ: u8 = 0x26;

    /// One past the highest assigned opcode.
    pub const COUNT: u8 = 0x27;
}

/// Immediate width in bytes for a raw opcode, or `None` for an unknown op.
///
/// This table is the single source of truth shared by the encoder and the
/// interpreter's decoder.
pub const fn imm_width(code: u8) -> Option<u8> {
    match code {
        opcode::STOP | opcode::LOG_NOT | opcode::LOG_AND | opcode::LOG_OR => Some(0),
        opcode::MEM_READ
        | opcode::REG_READ_DYN
        | opcode::CONST_U8
        | opcode::PICK
        | opcode::INSERT
        | opcode::TRUNC
        | opcode::TRUNC_SIGNED
        | opcode::CONVERT
        | opcode::NEG
        | opcode::BIT_NOT
        | opcode::ADD
        | opcode::SUB
        | opcode::MUL
        | opcode::DIV
        | opcode::MOD
        | opcode::LSHIFT
        | opcode::RSHIFT
        | opcode::BIT_AND
        | opcode::BIT_OR
        | opcode::BIT_XOR
        | opcode::EQEQ
        | opcode::NOTEQ
        | opcode::LESS
        | opcode::LESS_EQ
        | opcode::GRTR
        | opcode::GRTR_EQ => Some(1),
        opcode::COND | opcode::SKIP | opcode::CONST_U16 => Some(2),
        opcode::REG_READ | opcode::CONST_U32 => Some(4),
        opcode::FRAME_OFF | opcode::MODULE_OFF | opcode::TLS_OFF | opcode::CONST_U64 => Some(8),
        _ => None,
    }
}

/// A single instruction in tagged form.
///
/// Payloads carry typed sub-kinds; packing happens only at [`Op::encode_into`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Op {
    /// Halt; the single remaining stack slot is the result.
    Stop,
    /// Pop; if nonzero, skip forward `skip` bytes (over the false branch).
    Cond { skip: u16 },
    /// Unconditional forward skip of `skip` bytes.
    Skip { skip: u16 },
    /// Pop an address, read `size` bytes of target memory, push zero-extended.
    MemRead { size: u8 },
    /// Push `size` bytes of the register file starting at byte `offset`.
    RegRead { offset: u16, size: u8 },
    /// Pop a register-file byte offset, push `size` bytes from there.
    RegReadDyn { size: u8 },
    /// Push `frame_base + offset`.
    FrameOff { offset: u64 },
    /// Push `module_base + offset`.
    ModuleOff { offset: u64 },
    /// Push `tls_base + offset`.
    TlsOff { offset: u64 },
    ConstU8 { value: u8 },
    ConstU16 { value: u16 },
    ConstU32 { value: u32 },
    ConstU64 { value: u64 },
    /// Push a copy of the slot `depth` below the top.
    Pick { depth: u8 },
    /// Pop the top and insert it `depth` slots down.
    Insert { depth: u8 },
    /// Mask the top to its low `bits` bits.
    Trunc { bits: u8 },
    /// Mask the top to `bits` bits and sign-extend.
    TruncSigned { bits: u8 },
    /// Reinterpret the top from one type group's representation to another.
    Convert { from: TypeGroup, to: TypeGroup },
    Neg { group: TypeGroup },
    LogNot,
    Add { group: TypeGroup },
    Sub { group: TypeGroup },
    Mul { group: TypeGroup },
    Div { group: TypeGroup },
    Mod { group: TypeGroup },
    LShift { group: TypeGroup },
    RShift { group: TypeGroup },
    BitAnd { group: TypeGroup },
    BitOr { group: TypeGroup },
    BitXor { group: TypeGroup },
    BitNot { group: TypeGroup },
    LogAnd,
    LogOr,
    EqEq { group: TypeGroup },
    NotEq { group: TypeGroup },
    Less { group: TypeGroup },
    LessEq { group: TypeGroup },
    Grtr { group: TypeGroup },
    GrtrEq { group: TypeGroup },
}

impl Op {
    /// The raw opcode byte for this instruction.
    pub const fn code(self) -> u8 {
        match self {
            Op::Stop => opcode::STOP,
            Op::Cond { .. } => opcode::COND,
            Op::Skip { .. } => opcode::SKIP,
            Op::MemRead { .. } => opcode::MEM_READ,
            Op::RegRead { .. } => opcode::REG_READ,
            Op::RegReadDyn { .. } => opcode::REG_READ_DYN,
            Op::FrameOff { .. } => opcode::FRAME_OFF,
            Op::ModuleOff { .. } => opcode::MODULE_OFF,
            Op::TlsOff { .. } => opcode::TLS_OFF,
            Op::ConstU8 { .. } => opcode::CONST_U8,
            Op::ConstU16 { .. } => opcode::CONST_U16,
            Op::ConstU32 { .. } => opcode::CONST_U32,
            Op::ConstU64 { .. } => opcode::CONST_U64,
            Op::Pick { .. } => opcode::PICK,
            Op::Insert { .. } => opcode::INSERT,
            Op::Trunc { .. } => opcode::TRUNC,
            Op::TruncSigned { .. } => opcode::TRUNC_SIGNED,
            Op::Convert { .. } => opcode::CONVERT,
            Op::Neg { .. } => opcode::NEG,
            Op::LogNot => opcode::LOG_NOT,
            Op::Add { .. } => opcode::ADD,
            Op::Sub { .. } => opcode::SUB,
            Op::Mul { .. } => opcode::MUL,
            Op::Div { .. } => opcode::DIV,
            Op::Mod { .. } => opcode::MOD,
            Op::LShift { .. } => opcode::LSHIFT,
            Op::RShift { .. } => opcode::RSHIFT,
            Op::BitAnd { .. } => opcode::BIT_AND,
            Op::BitOr { .. } => opcode::BIT_OR,
            Op::BitXor { .. } => opcode::BIT_XOR,
            Op::BitNot { .. } => opcode::BIT_NOT,
            Op::LogAnd => opcode::LOG_AND,
            Op::LogOr => opcode::LOG_OR,
            Op::EqEq { .. } => opcode::EQEQ,
            Op::NotEq { .. } => opcode::NOTEQ,
            Op::Less { .. } => opcode::LESS,
            Op::LessEq { .. } => opcode::LESS_EQ,
            Op::Grtr { .. } => opcode::GRTR,
            Op::GrtrEq { .. } => opcode::GRTR_EQ,
        }
    }

    /// The immediate value, packed for the wire format.
    const fn imm(self) -> u64 {
        match self {
            Op::Stop | Op::LogNot | Op::LogAnd | Op::LogOr => 0,
            Op::Cond { skip } | Op::Skip { skip } => skip as u64,
            Op::MemRead { size } | Op::RegReadDyn { size } => size as u64,
            // REG_READ packs (offset | size << 16) into a u32 immediate.
            Op::RegRead { offset, size } => offset as u64 | ((size as u64) << 16),
            Op::FrameOff { offset } | Op::ModuleOff { offset } | Op::TlsOff { offset } => offset,
            Op::ConstU8 { value } => value as u64,
            Op::ConstU16 { value } => value as u64,
            Op::ConstU32 { value } => value as u64,
            Op::ConstU64 { value } => value,
            Op::Pick { depth } | Op::Insert { depth } => depth as u64,
            Op::Trunc { bits } | Op::TruncSigned { bits } => bits as u64,
            // CONVERT packs (from << 4 | to) into a u8 immediate.
            Op::Convert { from, to } => ((from as u64) << 4) | to as u64,
            Op::Neg { group }
            | Op::Add { group }
            | Op::Sub { group }
            | Op::Mul { group }
            | Op::Div { group }
            | Op::Mod { group }
            | Op::LShift { group }
            | Op::RShift { group }
            | Op::BitAnd { group }
            | Op::BitOr { group }
            | Op::BitXor { group }
            | Op::BitNot { group }
            | Op::EqEq { group }
            | Op::NotEq { group }
            | Op::Less { group }
            | Op::LessEq { group }
            | Op::Grtr { group }
            | Op::GrtrEq { group } => group as u64,
        }
    }

    /// Encoded size of this instruction: opcode byte plus immediate.
    pub fn encoded_len(self) -> u64 {
        1 + u64::from(imm_width(self.code()).unwrap_or(0))
    }

    /// Append the wire encoding of this instruction to `out`.
    pub fn encode_into(self, out: &mut Vec<u8>) {
        let code = self.code();
        out.push(code);
        let imm = self.imm();
        let width = imm_width(code).unwrap_or(0);
        out.extend_from_slice(&imm.to_le_bytes()[..width as usize]);
    }
}

/// A list entry: an instruction, or a pre-encoded byte sequence spliced in
/// verbatim (resolved identifier locations arrive this way).
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Inst {
    Op(Op),
    Splice(Box<[u8]>),
}

/// Ordered, append-only instruction sequence with a running encoded size.
///
/// The final artifact of compilation; [`OpList::encode`] serializes it.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct OpList {
    insts: Vec<Inst>,
    encoded_size: u64,
}

impl OpList {
    pub fn new() -> Self {
        OpList::default()
    }

    /// Append a single instruction.
    pub fn push(&mut self, op: Op) {
        self.encoded_size += op.encoded_len();
        self.insts.push(Inst::Op(op));
    }

    /// Splice pre-encoded bytecode in verbatim.
    pub fn push_bytes(&mut self, bytes: impl Into<Box<[u8]>>) {
        let bytes = bytes.into();
        self.encoded_size += bytes.len() as u64;
        self.insts.push(Inst::Splice(bytes));
    }

    /// Move every instruction of `other` onto the end of `self`, leaving
    /// `other` empty.
    pub fn append(&mut self, other: &mut OpList) {
        self.encoded_size += other.encoded_size;
        self.insts.append(&mut other.insts);
        other.encoded_size = 0;
    }

    /// Copy every instruction of `other` onto the end of `self`.
    pub fn extend_cloned(&mut self, other: &OpList) {
        self.encoded_size += other.encoded_size;
        self.insts.extend(other.insts.iter().cloned());
    }

    /// Encoded size in bytes of everything pushed so far.
    #[inline]
    pub fn encoded_size(&self) -> u64 {
        self.encoded_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Inst> {
        self.insts.iter()
    }

    /// Serialize to the flat wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_size as usize);
        for inst in &self.insts {
            match inst {
                Inst::Op(op) => op.encode_into(&mut out),
                Inst::Splice(bytes) => out.extend_from_slice(bytes),
            }
        }
        out
    }
}

impl fmt::Display for OpList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oplist[{} insts, {} bytes]", self.insts.len(), self.encoded_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encoded_len_matches_width_table() {
        let ops = [
            Op::Stop,
            Op::Cond { skip: 4 },
            Op::MemRead { size: 8 },
            Op::RegRead { offset: 16, size: 8 },
            Op::ConstU64 { value: 1 },
            Op::Add { group: TypeGroup::Signed },
            Op::LogNot,
            Op::Convert { from: TypeGroup::Signed, to: TypeGroup::F64 },
        ];
        for op in ops {
            let mut buf = Vec::new();
            op.encode_into(&mut buf);
            assert_eq!(buf.len() as u64, op.encoded_len(), "{op:?}");
            assert_eq!(imm_width(buf[0]), Some((buf.len() - 1) as u8), "{op:?}");
        }
    }

    #[test]
    fn test_unknown_opcode_has_no_width() {
        assert_eq!(imm_width(opcode::COUNT), None);
        assert_eq!(imm_width(0xFF), None);
    }

    #[test]
    fn test_oplist_running_size() {
        let mut list = OpList::new();
        list.push(Op::ConstU8 { value: 2 }); // 2 bytes
        list.push(Op::ConstU64 { value: 3 }); // 9 bytes
        list.push(Op::Add { group: TypeGroup::Unsigned }); // 2 bytes
        assert_eq!(list.encoded_size(), 13);
        assert_eq!(list.encode().len(), 13);
    }

    #[test]
    fn test_oplist_append_drains() {
        let mut a = OpList::new();
        a.push(Op::Stop);
        let mut b = OpList::new();
        b.push(Op::ConstU8 { value: 9 });
        let b_size = b.encoded_size();
        a.append(&mut b);
        assert!(b.is_empty());
        assert_eq!(b.encoded_size(), 0);
        assert_eq!(a.encoded_size(), 1 + b_size);
    }

    #[test]
    fn test_splice_verbatim() {
        let mut inner = OpList::new();
        inner.push(Op::ConstU32 { value: 0xAABB });
        let bytes = inner.encode();

        let mut outer = OpList::new();
        outer.push_bytes(bytes.clone());
        outer.push(Op::Stop);
        let encoded = outer.encode();
        assert_eq!(&encoded[..bytes.len()], &bytes[..]);
        assert_eq!(encoded[bytes.len()], opcode::STOP);
    }

    #[test]
    fn test_convert_packing() {
        let op = Op::Convert { from: TypeGroup::Signed, to: TypeGroup::F32 };
        let mut buf = Vec::new();
        op.encode_into(&mut buf);
        assert_eq!(buf, vec![opcode::CONVERT, 0x23]);
    }
}
