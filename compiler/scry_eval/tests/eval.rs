//! End-to-end pipeline tests against mock debug info, mock memory, and a
//! mock register file.

use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;
use scry_eval::{evaluate, EvalIO, InterpError, InterpStatus, SliceMemory};
use scry_ir::{Arch, BasicKind, Mode, Op, OpList, TypeKey, TypeKind};
use scry_types::{
    Context, DebugInfo, ExtMember, ExtTypeInfo, Local, LocalLoc, MemberKind, NameKind,
    ProcedureInfo, SymbolInfo,
};

#[derive(Default)]
struct MockModule {
    types: Vec<ExtTypeInfo>,
    members: FxHashMap<u32, Vec<ExtMember>>,
    type_names: Vec<(String, u32)>,
    globals: Vec<(String, SymbolInfo)>,
    tls: Vec<(String, SymbolInfo)>,
    procs: Vec<(String, ProcedureInfo)>,
}

impl MockModule {
    fn add_type(&mut self, info: ExtTypeInfo) -> u32 {
        let index = u32::try_from(self.types.len()).unwrap_or(u32::MAX);
        self.types.push(info);
        index
    }

    fn basic(&mut self, kind: BasicKind) -> u32 {
        self.add_type(ExtTypeInfo {
            kind: TypeKind::Basic(kind),
            name: Some(kind.name().into()),
            byte_size: kind.byte_size(),
            direct: None,
            owner: None,
            count: 0,
        })
    }
}

impl DebugInfo for MockModule {
    fn type_info(&self, index: u32) -> Option<ExtTypeInfo> {
        self.types.get(index as usize).cloned()
    }

    fn members(&self, index: u32) -> Vec<ExtMember> {
        self.members.get(&index).cloned().unwrap_or_default()
    }

    fn lookup(&self, kind: NameKind, name: &str) -> Vec<u32> {
        match kind {
            NameKind::Types => self
                .type_names
                .iter()
                .filter(|(n, _)| n == name)
                .map(|(_, i)| *i)
                .collect(),
            NameKind::Globals => positions(&self.globals, name),
            NameKind::ThreadLocals => positions(&self.tls, name),
            NameKind::Procedures => positions(&self.procs, name),
            NameKind::SourcePaths => Vec::new(),
        }
    }

    fn global(&self, index: u32) -> Option<SymbolInfo> {
        self.globals.get(index as usize).map(|(_, s)| *s)
    }

    fn thread_local(&self, index: u32) -> Option<SymbolInfo> {
        self.tls.get(index as usize).map(|(_, s)| *s)
    }

    fn procedure(&self, index: u32) -> Option<ProcedureInfo> {
        self.procs.get(index as usize).map(|(_, p)| p.clone())
    }
}

fn positions<T>(entries: &[(String, T)], name: &str) -> Vec<u32> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, (n, _))| n == name)
        .map(|(i, _)| u32::try_from(i).unwrap_or(u32::MAX))
        .collect()
}

fn const_addr_loc(addr: u64) -> LocalLoc {
    let mut ops = OpList::new();
    ops.push(Op::ConstU64 { value: addr });
    LocalLoc::Ops {
        ops,
        mode: Mode::Addr,
    }
}

#[test]
fn arithmetic_is_signed_32() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "1+2*3");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 7);
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::S32));
    assert_eq!(result.mode, Mode::Value);
}

#[test]
fn unsigned_cast_wraps() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "(unsigned int)-1");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 4_294_967_295);
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::U32));
}

#[test]
fn divide_by_zero_status() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "1/0");
    assert_eq!(result.status, InterpStatus::Failed(InterpError::DivideByZero));
    assert!(!result.has_value());
    assert!(result.diags.has_errors());
}

#[test]
fn float_arithmetic_keeps_left_type() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "0.5 + 1");
    assert!(result.diags.is_empty());
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::F64));
    assert!((result.value.as_f64() - 1.5).abs() < f64::EPSILON);
}

#[test]
fn ternary_selects_branch() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "1 ? 41+1 : 13");
    assert_eq!(result.value.as_u64(), 42);
    let result = evaluate(&ctx, &EvalIO::new(), "0 ? 41+1 : 13");
    assert_eq!(result.value.as_u64(), 13);
}

#[test]
fn sizeof_yields_u64() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "sizeof(uint64_t)");
    assert_eq!(result.value.as_u64(), 8);
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::U64));
}

#[test]
fn member_access_reads_at_offset() {
    let mut module = MockModule::default();
    let u32_ty = module.basic(BasicKind::U32);
    let record = module.add_type(ExtTypeInfo {
        kind: TypeKind::Struct,
        name: Some("Box".into()),
        byte_size: 12,
        direct: None,
        owner: None,
        count: 0,
    });
    module.members.insert(
        record,
        vec![
            ExtMember {
                kind: MemberKind::DataField,
                name: "a".into(),
                type_index: u32_ty,
                offset: 0,
            },
            ExtMember {
                kind: MemberKind::DataField,
                name: "b".into(),
                type_index: u32_ty,
                offset: 8,
            },
        ],
    );

    let mut ctx = Context::new(Arch::X64);
    let table = ctx.add_module(&module);
    let record_key = ctx.ext(table, record);
    ctx.add_local(
        "x",
        Local {
            loc: const_addr_loc(0x5000),
            type_key: record_key,
        },
    );

    let mut bytes = [0u8; 12];
    bytes[8..12].copy_from_slice(&42u32.to_le_bytes());
    let memory = SliceMemory::new(0x5000, &bytes);
    let io = EvalIO {
        memory: Some(&memory),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "x.b");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 42);
    assert_eq!(result.mode, Mode::Addr);
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::U32));
}

#[test]
fn pointer_index_scales_by_element_size() {
    let mut module = MockModule::default();
    let record = module.add_type(ExtTypeInfo {
        kind: TypeKind::Struct,
        name: Some("T".into()),
        byte_size: 16,
        direct: None,
        owner: None,
        count: 0,
    });
    let ptr = module.add_type(ExtTypeInfo {
        kind: TypeKind::Ptr,
        name: None,
        byte_size: 8,
        direct: Some(record),
        owner: None,
        count: 0,
    });

    let mut ctx = Context::new(Arch::X64);
    let table = ctx.add_module(&module);
    ctx.add_local(
        "p",
        Local {
            loc: const_addr_loc(0x100),
            type_key: ctx.ext(table, ptr),
        },
    );

    let bytes = 0x2000u64.to_le_bytes();
    let memory = SliceMemory::new(0x100, &bytes);
    let io = EvalIO {
        memory: Some(&memory),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "p[2]");
    assert!(result.diags.is_empty());
    // The element is an aggregate: its address stands in for the value.
    assert_eq!(result.value.as_u64(), 0x2000 + 2 * 16);
    assert_eq!(result.mode, Mode::Addr);
    assert_eq!(result.type_key, ctx.ext(table, record));
}

#[test]
fn pointer_difference_divides_by_pointee_size() {
    let mut module = MockModule::default();
    let record = module.add_type(ExtTypeInfo {
        kind: TypeKind::Struct,
        name: Some("T".into()),
        byte_size: 16,
        direct: None,
        owner: None,
        count: 0,
    });
    let ptr = module.add_type(ExtTypeInfo {
        kind: TypeKind::Ptr,
        name: None,
        byte_size: 8,
        direct: Some(record),
        owner: None,
        count: 0,
    });

    let mut ctx = Context::new(Arch::X64);
    let table = ctx.add_module(&module);
    let ptr_key = ctx.ext(table, ptr);
    ctx.add_local(
        "p",
        Local {
            loc: const_addr_loc(0x100),
            type_key: ptr_key,
        },
    );
    ctx.add_local(
        "q",
        Local {
            loc: const_addr_loc(0x108),
            type_key: ptr_key,
        },
    );

    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&0x2000u64.to_le_bytes());
    bytes[8..].copy_from_slice(&0x2040u64.to_le_bytes());
    let memory = SliceMemory::new(0x100, &bytes);
    let io = EvalIO {
        memory: Some(&memory),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "q - p");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 4);
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::U64));
}

#[test]
fn unresolvable_identifier_produces_no_value() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "ghost");
    assert!(!result.has_value());
    assert!(result
        .diags
        .iter()
        .any(|d| d.code == scry_diagnostic::ErrorCode::E2001));
}

#[test]
fn self_referential_macro_fails_cleanly() {
    let mut ctx = Context::new(Arch::X64);
    ctx.define_macro("x", "x + 1");
    let result = evaluate(&ctx, &EvalIO::new(), "x");
    assert!(!result.has_value());
    assert!(result
        .diags
        .iter()
        .any(|d| d.code == scry_diagnostic::ErrorCode::E2001));
}

#[test]
fn macro_expands_to_its_body() {
    let mut ctx = Context::new(Arch::X64);
    ctx.define_macro("answer", "21 * 2");
    let result = evaluate(&ctx, &EvalIO::new(), "answer");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 42);
}

#[test]
fn register_reads_from_register_file() {
    let ctx = Context::new(Arch::X64);
    let mut regs = vec![0u8; 300];
    regs[..8].copy_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
    let io = EvalIO {
        regs: Some(&regs),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "rax");
    assert!(result.diags.is_empty());
    assert_eq!(result.mode, Mode::Reg);
    assert_eq!(result.value.as_u64(), 0x1122_3344_5566_7788);

    // Alias: the low dword of rax.
    let result = evaluate(&ctx, &io, "eax");
    assert_eq!(result.value.as_u64(), 0x5566_7788);
    assert_eq!(result.mode, Mode::Reg);
}

#[test]
fn register_sub_view_member_and_index() {
    let ctx = Context::new(Arch::X64);
    let mut regs = vec![0u8; 300];
    regs[..8].copy_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
    let io = EvalIO {
        regs: Some(&regs),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "rax.u32[1]");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 0x1122_3344);
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::U32));
}

#[test]
fn namespaced_global_resolves_unqualified() {
    let mut module = MockModule::default();
    let s32 = module.basic(BasicKind::S32);
    module.globals.push((
        "ns::g".into(),
        SymbolInfo {
            type_index: s32,
            offset: 0x10,
        },
    ));

    let mut ctx = Context::new(Arch::X64);
    ctx.add_module(&module);
    ctx.set_procedure_name("ns::fn");

    let bytes = 7i32.to_le_bytes();
    let memory = SliceMemory::new(0x4010, &bytes);
    let io = EvalIO {
        memory: Some(&memory),
        module_base: Some(0x4000),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "g");
    assert!(result.diags.is_empty(), "diags: {:?}", result.diags);
    assert_eq!(result.value.as_u64(), 7);
    assert_eq!(result.mode, Mode::Addr);
}

#[test]
fn frame_relative_local_sign_extends() {
    let mut ctx = Context::new(Arch::X64);
    let mut ops = OpList::new();
    ops.push(Op::FrameOff { offset: 8 });
    ctx.add_local(
        "fx",
        Local {
            loc: LocalLoc::Ops {
                ops,
                mode: Mode::Addr,
            },
            type_key: TypeKey::Basic(BasicKind::S32),
        },
    );

    let bytes = (-5i32).to_le_bytes();
    let memory = SliceMemory::new(0x7008, &bytes);
    let io = EvalIO {
        memory: Some(&memory),
        frame_base: Some(0x7000),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "fx");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_s64(), -5);
}

#[test]
fn missing_frame_base_is_fatal() {
    let mut ctx = Context::new(Arch::X64);
    let mut ops = OpList::new();
    ops.push(Op::FrameOff { offset: 8 });
    ctx.add_local(
        "fx",
        Local {
            loc: LocalLoc::Ops {
                ops,
                mode: Mode::Addr,
            },
            type_key: TypeKey::Basic(BasicKind::S32),
        },
    );

    let result = evaluate(&ctx, &EvalIO::new(), "fx");
    assert_eq!(
        result.status,
        InterpStatus::Failed(InterpError::MissingFrameBase)
    );
}

#[test]
fn register_relative_local() {
    let mut ctx = Context::new(Arch::X64);
    let layout = ctx.reg_layout();
    let Some(rbp) = layout.reg_by_name("rbp") else {
        panic!("rbp must exist");
    };
    ctx.add_local(
        "y",
        Local {
            loc: LocalLoc::RegPlusOff {
                reg: rbp,
                offset: 16,
            },
            type_key: TypeKey::Basic(BasicKind::S32),
        },
    );

    let mut regs = vec![0u8; 300];
    regs[40..48].copy_from_slice(&0x7000u64.to_le_bytes());
    let bytes = 99i32.to_le_bytes();
    let memory = SliceMemory::new(0x7010, &bytes);
    let io = EvalIO {
        memory: Some(&memory),
        regs: Some(&regs),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "y");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 99);
}

#[test]
fn absolute_address_bracket_sugar() {
    let ctx = Context::new(Arch::X64);
    let bytes = 0xDEAD_BEEFu64.to_le_bytes();
    let memory = SliceMemory::new(0x1000, &bytes);
    let io = EvalIO {
        memory: Some(&memory),
        ..EvalIO::new()
    };

    let result = evaluate(&ctx, &io, "[0x1000]");
    assert!(result.diags.is_empty());
    assert_eq!(result.value.as_u64(), 0xDEAD_BEEF);
    assert_eq!(result.type_key, TypeKey::Basic(BasicKind::U64));
    assert_eq!(result.mode, Mode::Addr);
}

#[test]
fn structural_match_across_tables() {
    let mut first = MockModule::default();
    let s32_a = first.basic(BasicKind::S32);
    let arr_a = first.add_type(ExtTypeInfo {
        kind: TypeKind::Array,
        name: None,
        byte_size: 16,
        direct: Some(s32_a),
        owner: None,
        count: 4,
    });

    let mut second = MockModule::default();
    let s32_b = second.basic(BasicKind::S32);
    let arr_b = second.add_type(ExtTypeInfo {
        kind: TypeKind::Array,
        name: None,
        byte_size: 16,
        direct: Some(s32_b),
        owner: None,
        count: 4,
    });

    let mut ctx = Context::new(Arch::X64);
    let t1 = ctx.add_module(&first);
    let t2 = ctx.add_module(&second);
    let key_a = ctx.ext(t1, arr_a);
    let key_b = ctx.ext(t2, arr_b);

    assert_ne!(key_a, key_b);
    assert!(ctx.types_match(key_a, key_b));

    // And both match the locally constructed equivalent.
    let consed = ctx.array_of(TypeKey::Basic(BasicKind::S32), 4);
    assert!(ctx.types_match(key_a, consed));
    assert!(!ctx.types_match(key_a, ctx.array_of(TypeKey::Basic(BasicKind::S32), 5)));
}

#[test]
fn parse_errors_short_circuit_interpretation() {
    let ctx = Context::new(Arch::X64);
    let result = evaluate(&ctx, &EvalIO::new(), "(1+");
    assert!(!result.has_value());
    assert!(result.diags.has_errors());
    assert!(result.status.is_good());
}
