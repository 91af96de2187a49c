//! Register layout tables.
//!
//! One table per target architecture: register code to (byte offset, byte
//! size) within the flat register file the interpreter reads, plus alias
//! codes describing classic sub-register views (`eax` inside `rax`).
//! Codes index their defining table directly.

use scry_ir::Arch;

/// A full machine register.
#[derive(Copy, Clone, Debug)]
pub struct RegDef {
    pub name: &'static str,
    /// Byte offset into the flat register file.
    pub offset: u16,
    pub size: u16,
}

/// A sub-range view of a register.
#[derive(Copy, Clone, Debug)]
pub struct AliasDef {
    pub name: &'static str,
    /// Code of the register this aliases into.
    pub base: u16,
    /// Byte offset within the base register.
    pub offset: u16,
    pub size: u16,
}

/// Layout table for one architecture.
pub struct RegLayout {
    pub regs: &'static [RegDef],
    pub aliases: &'static [AliasDef],
}

impl RegLayout {
    /// Register code for a name (case-insensitive, as debuggers accept
    /// `RAX` and `rax` alike).
    pub fn reg_by_name(&self, name: &str) -> Option<u16> {
        self.regs
            .iter()
            .position(|r| r.name.eq_ignore_ascii_case(name))
            .and_then(|i| u16::try_from(i).ok())
    }

    pub fn alias_by_name(&self, name: &str) -> Option<u16> {
        self.aliases
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
            .and_then(|i| u16::try_from(i).ok())
    }

    pub fn reg(&self, code: u16) -> Option<&RegDef> {
        self.regs.get(code as usize)
    }

    pub fn alias(&self, code: u16) -> Option<&AliasDef> {
        self.aliases.get(code as usize)
    }

    /// Byte offset of an alias within the flat register file.
    pub fn alias_file_offset(&self, code: u16) -> Option<u16> {
        let alias = self.alias(code)?;
        let base = self.reg(alias.base)?;
        Some(base.offset + alias.offset)
    }
}

/// The layout table for `arch`.
pub fn layout(arch: Arch) -> &'static RegLayout {
    match arch {
        Arch::X64 => &X64,
        Arch::Arm64 => &ARM64,
    }
}

// x64: GPRs at codes 0-15, rip 16, rflags 17, xmm0-7 at 18-25.
const X64_GPR_SIZE: u16 = 8;

macro_rules! x64_gpr {
    ($name:literal, $slot:expr) => {
        RegDef {
            name: $name,
            offset: $slot * X64_GPR_SIZE,
            size: X64_GPR_SIZE,
        }
    };
}

static X64_REGS: [RegDef; 26] = [
    x64_gpr!("rax", 0),
    x64_gpr!("rcx", 1),
    x64_gpr!("rdx", 2),
    x64_gpr!("rbx", 3),
    x64_gpr!("rsp", 4),
    x64_gpr!("rbp", 5),
    x64_gpr!("rsi", 6),
    x64_gpr!("rdi", 7),
    x64_gpr!("r8", 8),
    x64_gpr!("r9", 9),
    x64_gpr!("r10", 10),
    x64_gpr!("r11", 11),
    x64_gpr!("r12", 12),
    x64_gpr!("r13", 13),
    x64_gpr!("r14", 14),
    x64_gpr!("r15", 15),
    x64_gpr!("rip", 16),
    x64_gpr!("rflags", 17),
    RegDef { name: "xmm0", offset: 144, size: 16 },
    RegDef { name: "xmm1", offset: 160, size: 16 },
    RegDef { name: "xmm2", offset: 176, size: 16 },
    RegDef { name: "xmm3", offset: 192, size: 16 },
    RegDef { name: "xmm4", offset: 208, size: 16 },
    RegDef { name: "xmm5", offset: 224, size: 16 },
    RegDef { name: "xmm6", offset: 240, size: 16 },
    RegDef { name: "xmm7", offset: 256, size: 16 },
];

macro_rules! x64_alias {
    ($name:literal, $base:expr, $off:expr, $size:expr) => {
        AliasDef {
            name: $name,
            base: $base,
            offset: $off,
            size: $size,
        }
    };
}

static X64_ALIASES: [AliasDef; 36] = [
    x64_alias!("eax", 0, 0, 4),
    x64_alias!("ax", 0, 0, 2),
    x64_alias!("al", 0, 0, 1),
    x64_alias!("ah", 0, 1, 1),
    x64_alias!("ecx", 1, 0, 4),
    x64_alias!("cx", 1, 0, 2),
    x64_alias!("cl", 1, 0, 1),
    x64_alias!("ch", 1, 1, 1),
    x64_alias!("edx", 2, 0, 4),
    x64_alias!("dx", 2, 0, 2),
    x64_alias!("dl", 2, 0, 1),
    x64_alias!("dh", 2, 1, 1),
    x64_alias!("ebx", 3, 0, 4),
    x64_alias!("bx", 3, 0, 2),
    x64_alias!("bl", 3, 0, 1),
    x64_alias!("bh", 3, 1, 1),
    x64_alias!("esp", 4, 0, 4),
    x64_alias!("sp", 4, 0, 2),
    x64_alias!("spl", 4, 0, 1),
    x64_alias!("ebp", 5, 0, 4),
    x64_alias!("bp", 5, 0, 2),
    x64_alias!("bpl", 5, 0, 1),
    x64_alias!("esi", 6, 0, 4),
    x64_alias!("si", 6, 0, 2),
    x64_alias!("sil", 6, 0, 1),
    x64_alias!("edi", 7, 0, 4),
    x64_alias!("di", 7, 0, 2),
    x64_alias!("dil", 7, 0, 1),
    x64_alias!("r8d", 8, 0, 4),
    x64_alias!("r8w", 8, 0, 2),
    x64_alias!("r8b", 8, 0, 1),
    x64_alias!("r9d", 9, 0, 4),
    x64_alias!("r9w", 9, 0, 2),
    x64_alias!("r9b", 9, 0, 1),
    x64_alias!("eip", 16, 0, 4),
    x64_alias!("eflags", 17, 0, 4),
];

static X64: RegLayout = RegLayout {
    regs: &X64_REGS,
    aliases: &X64_ALIASES,
};

// arm64: x0-x30 at codes 0-30, sp 31, pc 32, v0-v7 at 33-40.
macro_rules! a64_x {
    ($name:literal, $slot:expr) => {
        RegDef {
            name: $name,
            offset: $slot * 8,
            size: 8,
        }
    };
}

static ARM64_REGS: [RegDef; 41] = [
    a64_x!("x0", 0),
    a64_x!("x1", 1),
    a64_x!("x2", 2),
    a64_x!("x3", 3),
    a64_x!("x4", 4),
    a64_x!("x5", 5),
    a64_x!("x6", 6),
    a64_x!("x7", 7),
    a64_x!("x8", 8),
    a64_x!("x9", 9),
    a64_x!("x10", 10),
    a64_x!("x11", 11),
    a64_x!("x12", 12),
    a64_x!("x13", 13),
    a64_x!("x14", 14),
    a64_x!("x15", 15),
    a64_x!("x16", 16),
    a64_x!("x17", 17),
    a64_x!("x18", 18),
    a64_x!("x19", 19),
    a64_x!("x20", 20),
    a64_x!("x21", 21),
    a64_x!("x22", 22),
    a64_x!("x23", 23),
    a64_x!("x24", 24),
    a64_x!("x25", 25),
    a64_x!("x26", 26),
    a64_x!("x27", 27),
    a64_x!("x28", 28),
    a64_x!("x29", 29),
    a64_x!("x30", 30),
    a64_x!("sp", 31),
    a64_x!("pc", 32),
    RegDef { name: "v0", offset: 264, size: 16 },
    RegDef { name: "v1", offset: 280, size: 16 },
    RegDef { name: "v2", offset: 296, size: 16 },
    RegDef { name: "v3", offset: 312, size: 16 },
    RegDef { name: "v4", offset: 328, size: 16 },
    RegDef { name: "v5", offset: 344, size: 16 },
    RegDef { name: "v6", offset: 360, size: 16 },
    RegDef { name: "v7", offset: 376, size: 16 },
];

macro_rules! a64_w {
    ($name:literal, $base:expr) => {
        AliasDef {
            name: $name,
            base: $base,
            offset: 0,
            size: 4,
        }
    };
}

static ARM64_ALIASES: [AliasDef; 8] = [
    a64_w!("w0", 0),
    a64_w!("w1", 1),
    a64_w!("w2", 2),
    a64_w!("w3", 3),
    a64_w!("w4", 4),
    a64_w!("w5", 5),
    a64_w!("w6", 6),
    a64_w!("w7", 7),
];

static ARM64: RegLayout = RegLayout {
    regs: &ARM64_REGS,
    aliases: &ARM64_ALIASES,
};
