//! The stack machine.
//!
//! Decodes the flat byte format directly: opcode byte, then the
//! fixed-width immediate the shared width table prescribes. Arithmetic
//! dispatches on the decoded type-group immediate, not on the opcode
//! alone — the same `Add` computes differently for signed, unsigned,
//! f32, and f64 groups.
//!
//! A well-formed program leaves exactly one value; anything else is
//! malformed bytecode. Every failure is terminal and reported as a
//! single status code, set once.

use scry_ir::{imm_width, opcode, TypeGroup, Value};

use crate::io::EvalIO;

/// Stack slots available to one interpretation.
pub const STACK_CAP: usize = 128;

/// Largest single memory or register read, in bytes (one `Value`).
const MAX_READ: u64 = 32;

/// Terminal interpretation failure.
#[derive(thiserror::Error, Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum InterpError {
    #[error("bad opcode")]
    BadOp,
    #[error("failed to read memory")]
    BadMemRead,
    #[error("failed to read a register")]
    BadRegRead,
    #[error("no frame base address is available")]
    MissingFrameBase,
    #[error("no module base address is available")]
    MissingModuleBase,
    #[error("no thread-local base address is available")]
    MissingTlsBase,
    #[error("division by zero")]
    DivideByZero,
    #[error("expression requires too much stack space")]
    InsufficientStack,
    #[error("malformed bytecode")]
    MalformedBytecode,
}

/// Execute a bytecode program against the given target accessors.
pub fn interpret(bytecode: &[u8], io: &EvalIO<'_>) -> Result<Value, InterpError> {
    let mut stack: Vec<Value> = Vec::with_capacity(16);
    let mut ip = 0usize;

    while ip < bytecode.len() {
        let code = bytecode[ip];
        ip += 1;
        let Some(width) = imm_width(code) else {
            return Err(InterpError::BadOp);
        };
        let width = width as usize;
        let Some(imm_bytes) = bytecode.get(ip..ip + width) else {
            return Err(InterpError::MalformedBytecode);
        };
        let mut lanes = [0u8; 8];
        lanes[..width].copy_from_slice(imm_bytes);
        let imm = u64::from_le_bytes(lanes);
        ip += width;

        match code {
            opcode::STOP => break,
            opcode::COND => {
                let cond = pop(&mut stack)?;
                if cond.as_u64() != 0 {
                    ip = ip.saturating_add(imm as usize);
                }
            }
            opcode::SKIP => {
                ip = ip.saturating_add(imm as usize);
            }
            opcode::MEM_READ => {
                let addr = pop(&mut stack)?.as_u64();
                let value = read_memory(io, addr, imm)?;
                push(&mut stack, value)?;
            }
            opcode::REG_READ => {
                let offset = imm & 0xFFFF;
                let size = (imm >> 16) & 0xFF;
                let value = read_regs(io, offset, size)?;
                push(&mut stack, value)?;
            }
            opcode::REG_READ_DYN => {
                let offset = pop(&mut stack)?.as_u64();
                let value = read_regs(io, offset, imm)?;
                push(&mut stack, value)?;
            }
            opcode::FRAME_OFF => {
                let base = io.frame_base.ok_or(InterpError::MissingFrameBase)?;
                push(&mut stack, Value::from_u64(base.wrapping_add(imm)))?;
            }
            opcode::MODULE_OFF => {
                let base = io.module_base.ok_or(InterpError::MissingModuleBase)?;
                push(&mut stack, Value::from_u64(base.wrapping_add(imm)))?;
            }
            opcode::TLS_OFF => {
                let base = io.tls_base.ok_or(InterpError::MissingTlsBase)?;
                push(&mut stack, Value::from_u64(base.wrapping_add(imm)))?;
            }
            opcode::CONST_U8 | opcode::CONST_U16 | opcode::CONST_U32 | opcode::CONST_U64 => {
                push(&mut stack, Value::from_u64(imm))?;
            }
            opcode::PICK => {
                let depth = imm as usize;
                let len = stack.len();
                if depth >= len {
                    return Err(InterpError::MalformedBytecode);
                }
                let value = stack[len - 1 - depth];
                push(&mut stack, value)?;
            }
            opcode::INSERT => {
                let depth = imm as usize;
                let value = pop(&mut stack)?;
                if depth > stack.len() {
                    return Err(InterpError::MalformedBytecode);
                }
                let at = stack.len() - depth;
                stack.insert(at, value);
            }
            opcode::TRUNC => {
                let value = pop(&mut stack)?.as_u64();
                push(&mut stack, Value::from_u64(mask_bits(value, imm)))?;
            }
            opcode::TRUNC_SIGNED => {
                let value = pop(&mut stack)?.as_u64();
                push(&mut stack, Value::from_u64(sign_extend(value, imm)))?;
            }
            opcode::CONVERT => {
                let from = TypeGroup::from_u8(((imm >> 4) & 0xF) as u8);
                let to = TypeGroup::from_u8((imm & 0xF) as u8);
                let (Some(from), Some(to)) = (from, to) else {
                    return Err(InterpError::BadOp);
                };
                let value = pop(&mut stack)?;
                push(&mut stack, convert(value, from, to))?;
            }
            opcode::NEG | opcode::BIT_NOT => {
                let group = decode_group(imm)?;
                let value = pop(&mut stack)?;
                push(&mut stack, unary(code, group, value))?;
            }
            opcode::LOG_NOT => {
                let value = pop(&mut stack)?;
                push(&mut stack, Value::from_u64(u64::from(value.as_u64() == 0)))?;
            }
            opcode::LOG_AND | opcode::LOG_OR => {
                let rhs = pop(&mut stack)?.as_u64() != 0;
                let lhs = pop(&mut stack)?.as_u64() != 0;
                let result = if code == opcode::LOG_AND {
                    lhs && rhs
                } else {
                    lhs || rhs
                };
                push(&mut stack, Value::from_u64(u64::from(result)))?;
            }
            opcode::ADD..=opcode::BIT_XOR | opcode::EQEQ..=opcode::GRTR_EQ => {
                let group = decode_group(imm)?;
                let rhs = pop(&mut stack)?;
                let lhs = pop(&mut stack)?;
                push(&mut stack, binary(code, group, lhs, rhs)?)?;
            }
            _ => return Err(InterpError::BadOp),
        }
    }

    if stack.len() == 1 {
        Ok(stack[0])
    } else {
        Err(InterpError::MalformedBytecode)
    }
}

#[inline]
fn pop(stack: &mut Vec<Value>) -> Result<Value, InterpError> {
    stack.pop().ok_or(InterpError::MalformedBytecode)
}

#[inline]
fn push(stack: &mut Vec<Value>, value: Value) -> Result<(), InterpError> {
    if stack.len() >= STACK_CAP {
        return Err(InterpError::InsufficientStack);
    }
    stack.push(value);
    Ok(())
}

fn decode_group(imm: u64) -> Result<TypeGroup, InterpError> {
    TypeGroup::from_u8((imm & 0xFF) as u8).ok_or(InterpError::BadOp)
}

fn read_memory(io: &EvalIO<'_>, addr: u64, size: u64) -> Result<Value, InterpError> {
    if size == 0 || size > MAX_READ {
        return Err(InterpError::MalformedBytecode);
    }
    let memory = io.memory.ok_or(InterpError::BadMemRead)?;
    let end = addr.checked_add(size).ok_or(InterpError::BadMemRead)?;
    let mut buf = [0u8; MAX_READ as usize];
    let out = &mut buf[..size as usize];
    if !memory.read_memory(addr..end, out) {
        return Err(InterpError::BadMemRead);
    }
    Ok(Value::from_le_bytes(out))
}

fn read_regs(io: &EvalIO<'_>, offset: u64, size: u64) -> Result<Value, InterpError> {
    if size == 0 || size > MAX_READ {
        return Err(InterpError::MalformedBytecode);
    }
    let regs = io.regs.ok_or(InterpError::BadRegRead)?;
    let start = usize::try_from(offset).map_err(|_| InterpError::BadRegRead)?;
    let end = start
        .checked_add(size as usize)
        .ok_or(InterpError::BadRegRead)?;
    let bytes = regs.get(start..end).ok_or(InterpError::BadRegRead)?;
    Ok(Value::from_le_bytes(bytes))
}

/// Mask to the low `bits` bits.
fn mask_bits(value: u64, bits: u64) -> u64 {
    if bits >= 64 {
        value
    } else if bits == 0 {
        0
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Mask to `bits` bits, then sign-extend into the full lane.
fn sign_extend(value: u64, bits: u64) -> u64 {
    if bits == 0 || bits >= 64 {
        return value;
    }
    let masked = mask_bits(value, bits);
    let sign = 1u64 << (bits - 1);
    if masked & sign != 0 {
        masked | !((1u64 << bits) - 1)
    } else {
        masked
    }
}

/// Numeric conversion between group representations.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn convert(value: Value, from: TypeGroup, to: TypeGroup) -> Value {
    use TypeGroup::{Signed, Unsigned, F32, F64};
    match (from, to) {
        (Unsigned, F32) => Value::from_f32(value.as_u64() as f32),
        (Unsigned, F64) => Value::from_f64(value.as_u64() as f64),
        (Signed, F32) => Value::from_f32(value.as_s64() as f32),
        (Signed, F64) => Value::from_f64(value.as_s64() as f64),
        (F32, Unsigned) => Value::from_u64(value.as_f32() as u64),
        (F32, Signed) => Value::from_u64(value.as_f32() as i64 as u64),
        (F32, F64) => Value::from_f64(f64::from(value.as_f32())),
        (F64, Unsigned) => Value::from_u64(value.as_f64() as u64),
        (F64, Signed) => Value::from_u64(value.as_f64() as i64 as u64),
        (F64, F32) => Value::from_f32(value.as_f64() as f32),
        // Signed <-> Unsigned and everything else is a bit-identity.
        _ => value,
    }
}

#[allow(clippy::cast_sign_loss)]
fn unary(code: u8, group: TypeGroup, value: Value) -> Value {
    match code {
        opcode::NEG => match group {
            TypeGroup::F32 => Value::from_f32(-value.as_f32()),
            TypeGroup::F64 => Value::from_f64(-value.as_f64()),
            _ => Value::from_u64(value.as_u64().wrapping_neg()),
        },
        // BIT_NOT
        _ => Value::from_u64(!value.as_u64()),
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn binary(code: u8, group: TypeGroup, lhs: Value, rhs: Value) -> Result<Value, InterpError> {
    let result = match group {
        TypeGroup::F32 => {
            let (a, b) = (lhs.as_f32(), rhs.as_f32());
            match code {
                opcode::ADD => Value::from_f32(a + b),
                opcode::SUB => Value::from_f32(a - b),
                opcode::MUL => Value::from_f32(a * b),
                opcode::DIV => Value::from_f32(a / b),
                opcode::EQEQ => Value::from_u64(u64::from(a == b)),
                opcode::NOTEQ => Value::from_u64(u64::from(a != b)),
                opcode::LESS => Value::from_u64(u64::from(a < b)),
                opcode::LESS_EQ => Value::from_u64(u64::from(a <= b)),
                opcode::GRTR => Value::from_u64(u64::from(a > b)),
                opcode::GRTR_EQ => Value::from_u64(u64::from(a >= b)),
                _ => return Err(InterpError::BadOp),
            }
        }
        TypeGroup::F64 => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            match code {
                opcode::ADD => Value::from_f64(a + b),
                opcode::SUB => Value::from_f64(a - b),
                opcode::MUL => Value::from_f64(a * b),
                opcode::DIV => Value::from_f64(a / b),
                opcode::EQEQ => Value::from_u64(u64::from(a == b)),
                opcode::NOTEQ => Value::from_u64(u64::from(a != b)),
                opcode::LESS => Value::from_u64(u64::from(a < b)),
                opcode::LESS_EQ => Value::from_u64(u64::from(a <= b)),
                opcode::GRTR => Value::from_u64(u64::from(a > b)),
                opcode::GRTR_EQ => Value::from_u64(u64::from(a >= b)),
                _ => return Err(InterpError::BadOp),
            }
        }
        TypeGroup::Signed => {
            let (a, b) = (lhs.as_s64(), rhs.as_s64());
            let shift = (rhs.as_u64() & 63) as u32;
            match code {
                opcode::ADD => Value::from_u64(a.wrapping_add(b) as u64),
                opcode::SUB => Value::from_u64(a.wrapping_sub(b) as u64),
                opcode::MUL => Value::from_u64(a.wrapping_mul(b) as u64),
                opcode::DIV => {
                    if b == 0 {
                        return Err(InterpError::DivideByZero);
                    }
                    Value::from_u64(a.wrapping_div(b) as u64)
                }
                opcode::MOD => {
                    if b == 0 {
                        return Err(InterpError::DivideByZero);
                    }
                    Value::from_u64(a.wrapping_rem(b) as u64)
                }
                opcode::LSHIFT => Value::from_u64((a.wrapping_shl(shift)) as u64),
                opcode::RSHIFT => Value::from_u64((a.wrapping_shr(shift)) as u64),
                opcode::BIT_AND => Value::from_u64((a & b) as u64),
                opcode::BIT_OR => Value::from_u64((a | b) as u64),
                opcode::BIT_XOR => Value::from_u64((a ^ b) as u64),
                opcode::EQEQ => Value::from_u64(u64::from(a == b)),
                opcode::NOTEQ => Value::from_u64(u64::from(a != b)),
                opcode::LESS => Value::from_u64(u64::from(a < b)),
                opcode::LESS_EQ => Value::from_u64(u64::from(a <= b)),
                opcode::GRTR => Value::from_u64(u64::from(a > b)),
                opcode::GRTR_EQ => Value::from_u64(u64::from(a >= b)),
                _ => return Err(InterpError::BadOp),
            }
        }
        // Unsigned is also the fallback group for address arithmetic.
        _ => {
            let (a, b) = (lhs.as_u64(), rhs.as_u64());
            let shift = (b & 63) as u32;
            match code {
                opcode::ADD => Value::from_u64(a.wrapping_add(b)),
                opcode::SUB => Value::from_u64(a.wrapping_sub(b)),
                opcode::MUL => Value::from_u64(a.wrapping_mul(b)),
                opcode::DIV => {
                    if b == 0 {
                        return Err(InterpError::DivideByZero);
                    }
                    Value::from_u64(a / b)
                }
                opcode::MOD => {
                    if b == 0 {
                        return Err(InterpError::DivideByZero);
                    }
                    Value::from_u64(a % b)
                }
                opcode::LSHIFT => Value::from_u64(a.wrapping_shl(shift)),
                opcode::RSHIFT => Value::from_u64(a.wrapping_shr(shift)),
                opcode::BIT_AND => Value::from_u64(a & b),
                opcode::BIT_OR => Value::from_u64(a | b),
                opcode::BIT_XOR => Value::from_u64(a ^ b),
                opcode::EQEQ => Value::from_u64(u64::from(a == b)),
                opcode::NOTEQ => Value::from_u64(u64::from(a != b)),
                opcode::LESS => Value::from_u64(u64::from(a < b)),
                opcode::LESS_EQ => Value::from_u64(u64::from(a <= b)),
                opcode::GRTR => Value::from_u64(u64::from(a > b)),
                opcode::GRTR_EQ => Value::from_u64(u64::from(a >= b)),
                _ => return Err(InterpError::BadOp),
            }
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scry_ir::{Op, OpList};

    fn run(ops: &OpList) -> Result<Value, InterpError> {
        interpret(&ops.encode(), &EvalIO::new())
    }

    #[test]
    fn test_add_signed() {
        let mut ops = OpList::new();
        ops.push(Op::ConstU64 { value: (-5i64) as u64 });
        ops.push(Op::ConstU8 { value: 7 });
        ops.push(Op::Add { group: TypeGroup::Signed });
        ops.push(Op::Stop);
        assert_eq!(run(&ops).map(|v| v.as_s64()), Ok(2));
    }

    #[test]
    fn test_divide_by_zero() {
        let mut ops = OpList::new();
        ops.push(Op::ConstU8 { value: 1 });
        ops.push(Op::ConstU8 { value: 0 });
        ops.push(Op::Div { group: TypeGroup::Signed });
        ops.push(Op::Stop);
        assert_eq!(run(&ops), Err(InterpError::DivideByZero));
    }

    #[test]
    fn test_float_div_by_zero_is_not_fatal() {
        let mut ops = OpList::new();
        ops.push(Op::ConstU64 { value: 1.0f64.to_bits() });
        ops.push(Op::ConstU64 { value: 0.0f64.to_bits() });
        ops.push(Op::Div { group: TypeGroup::F64 });
        ops.push(Op::Stop);
        let Ok(value) = run(&ops) else {
            panic!("float division by zero must not be fatal");
        };
        assert!(value.as_f64().is_infinite());
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            interpret(&[0xEE], &EvalIO::new()),
            Err(InterpError::BadOp)
        );
    }

    #[test]
    fn test_truncated_immediate() {
        // CONST_U64 wants 8 bytes of immediate; give it one.
        assert_eq!(
            interpret(&[opcode::CONST_U64, 1], &EvalIO::new()),
            Err(InterpError::MalformedBytecode)
        );
    }

    #[test]
    fn test_empty_program_is_malformed() {
        assert_eq!(interpret(&[], &EvalIO::new()), Err(InterpError::MalformedBytecode));
    }

    #[test]
    fn test_two_leftover_values_malformed() {
        let mut ops = OpList::new();
        ops.push(Op::ConstU8 { value: 1 });
        ops.push(Op::ConstU8 { value: 2 });
        ops.push(Op::Stop);
        assert_eq!(run(&ops), Err(InterpError::MalformedBytecode));
    }

    #[test]
    fn test_missing_frame_base() {
        let mut ops = OpList::new();
        ops.push(Op::FrameOff { offset: 8 });
        ops.push(Op::Stop);
        assert_eq!(run(&ops), Err(InterpError::MissingFrameBase));
    }

    #[test]
    fn test_stack_overflow() {
        let mut ops = OpList::new();
        for _ in 0..=STACK_CAP {
            ops.push(Op::ConstU8 { value: 1 });
        }
        ops.push(Op::Stop);
        assert_eq!(run(&ops), Err(InterpError::InsufficientStack));
    }

    #[test]
    fn test_trunc_signed() {
        let mut ops = OpList::new();
        ops.push(Op::ConstU8 { value: 0xFF });
        ops.push(Op::TruncSigned { bits: 8 });
        ops.push(Op::Stop);
        assert_eq!(run(&ops).map(|v| v.as_s64()), Ok(-1));
    }

    #[test]
    fn test_convert_signed_to_f64() {
        let mut ops = OpList::new();
        ops.push(Op::ConstU64 { value: (-3i64) as u64 });
        ops.push(Op::Convert { from: TypeGroup::Signed, to: TypeGroup::F64 });
        ops.push(Op::Stop);
        let Ok(value) = run(&ops) else {
            panic!("conversion must succeed");
        };
        assert!((value.as_f64() + 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pick_duplicates() {
        let mut ops = OpList::new();
        ops.push(Op::ConstU8 { value: 7 });
        ops.push(Op::Pick { depth: 0 });
        ops.push(Op::Mul { group: TypeGroup::Unsigned });
        ops.push(Op::Stop);
        assert_eq!(run(&ops).map(|v| v.as_u64()), Ok(49));
    }

    #[test]
    fn test_insert_rotates() {
        // [1, 2, 3] -> Insert(2) moves 3 below 1: [3, 1, 2]; then
        // subtract twice: 3 - (1 - 2)? Verify step by step instead:
        // after insert, Sub computes 1 - 2 = -1, then 3 - (-1) = 4.
        let mut ops = OpList::new();
        ops.push(Op::ConstU8 { value: 1 });
        ops.push(Op::ConstU8 { value: 2 });
        ops.push(Op::ConstU8 { value: 3 });
        ops.push(Op::Insert { depth: 2 });
        ops.push(Op::Sub { group: TypeGroup::Signed });
        ops.push(Op::Sub { group: TypeGroup::Signed });
        ops.push(Op::Stop);
        assert_eq!(run(&ops).map(|v| v.as_s64()), Ok(4));
    }

    #[test]
    fn test_reg_read() {
        let regs: Vec<u8> = (0u8..32).collect();
        let io = EvalIO {
            regs: Some(&regs),
            ..EvalIO::new()
        };
        let mut ops = OpList::new();
        ops.push(Op::RegRead { offset: 4, size: 2 });
        ops.push(Op::Stop);
        let encoded = ops.encode();
        assert_eq!(
            interpret(&encoded, &io).map(|v| v.as_u64()),
            Ok(u64::from(u16::from_le_bytes([4, 5])))
        );
    }

    #[test]
    fn test_reg_read_out_of_bounds() {
        let regs = [0u8; 8];
        let io = EvalIO {
            regs: Some(&regs),
            ..EvalIO::new()
        };
        let mut ops = OpList::new();
        ops.push(Op::RegRead { offset: 4, size: 8 });
        ops.push(Op::Stop);
        assert_eq!(
            interpret(&ops.encode(), &io),
            Err(InterpError::BadRegRead)
        );
    }
}
