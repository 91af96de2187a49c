//! C declarator printing.
//!
//! The classic left/right recursive scheme: `lhs` emits the base type
//! name, pointer/reference marks, and opening parens for pointer-to-array
//! and pointer-to-function disambiguation; `rhs` emits array brackets,
//! parameter lists, and the closing parens.

use scry_ir::{TypeKey, TypeKind};

use crate::context::Context;

const MAX_PRINT_DEPTH: u32 = 64;

impl Context<'_> {
    /// Render a type key as a C declarator string.
    pub fn type_string(&self, key: TypeKey) -> String {
        let mut out = String::new();
        self.print_lhs(key, &mut out, 0);
        self.print_rhs(key, &mut out, 0);
        while out.ends_with(' ') {
            out.pop();
        }
        out
    }

    fn print_lhs(&self, key: TypeKey, out: &mut String, depth: u32) {
        if depth > MAX_PRINT_DEPTH {
            return;
        }
        let info = self.type_info(key);
        match info.kind {
            TypeKind::Null => out.push_str("void "),
            TypeKind::Basic(kind) => {
                out.push_str(kind.name());
                out.push(' ');
            }
            TypeKind::Struct
            | TypeKind::Class
            | TypeKind::Union
            | TypeKind::Enum
            | TypeKind::IncompleteStruct
            | TypeKind::IncompleteClass
            | TypeKind::IncompleteUnion
            | TypeKind::IncompleteEnum
            | TypeKind::Alias
            | TypeKind::RegUnion => {
                out.push_str(info.name.as_deref().unwrap_or("<unnamed>"));
                out.push(' ');
            }
            TypeKind::Modifier | TypeKind::Bitfield => {
                if let Some(direct) = info.direct {
                    self.print_lhs(direct, out, depth + 1);
                }
            }
            TypeKind::Ptr | TypeKind::LRef | TypeKind::RRef => {
                if let Some(direct) = info.direct {
                    self.print_lhs(direct, out, depth + 1);
                    if self.needs_parens(direct) {
                        out.push('(');
                    }
                }
                out.push_str(match info.kind {
                    TypeKind::LRef => "&",
                    TypeKind::RRef => "&&",
                    _ => "*",
                });
            }
            TypeKind::MemberPtr => {
                if let Some(direct) = info.direct {
                    self.print_lhs(direct, out, depth + 1);
                }
                if let Some(owner) = info.owner {
                    let owner_info = self.type_info(owner);
                    out.push_str(owner_info.name.as_deref().unwrap_or("<unnamed>"));
                }
                out.push_str("::*");
            }
            TypeKind::Array | TypeKind::Function | TypeKind::Method => {
                if let Some(direct) = info.direct {
                    self.print_lhs(direct, out, depth + 1);
                }
            }
        }
    }

    fn print_rhs(&self, key: TypeKey, out: &mut String, depth: u32) {
        if depth > MAX_PRINT_DEPTH {
            return;
        }
        let info = self.type_info(key);
        match info.kind {
            TypeKind::Ptr | TypeKind::LRef | TypeKind::RRef | TypeKind::MemberPtr => {
                if let Some(direct) = info.direct {
                    if self.needs_parens(direct) {
                        out.push(')');
                    }
                    self.print_rhs(direct, out, depth + 1);
                }
            }
            TypeKind::Array => {
                out.push('[');
                out.push_str(&self.array_count(&info).to_string());
                out.push(']');
                if let Some(direct) = info.direct {
                    self.print_rhs(direct, out, depth + 1);
                }
            }
            TypeKind::Function | TypeKind::Method => {
                out.push('(');
                let params = self.param_types_of(key);
                if params.is_empty() {
                    // C spells an empty parameter list `(void)` for
                    // functions; methods use the bare `()`.
                    if matches!(info.kind, TypeKind::Function) {
                        out.push_str("void");
                    }
                } else {
                    for (i, &param) in params.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&self.type_string(param));
                    }
                }
                out.push(')');
                if let Some(direct) = info.direct {
                    self.print_rhs(direct, out, depth + 1);
                }
            }
            TypeKind::Modifier | TypeKind::Bitfield => {
                if let Some(direct) = info.direct {
                    self.print_rhs(direct, out, depth + 1);
                }
            }
            _ => {}
        }
    }

    /// Pointers into arrays/functions need `(*)` disambiguation.
    fn needs_parens(&self, direct: TypeKey) -> bool {
        matches!(
            self.type_info(direct).kind,
            TypeKind::Array | TypeKind::Function | TypeKind::Method
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scry_ir::{Arch, BasicKind};

    #[test]
    fn test_pointer_to_basic() {
        let ctx = Context::new(Arch::X64);
        let ptr = ctx.ptr_to(TypeKey::Basic(BasicKind::S32));
        assert_eq!(ctx.type_string(ptr), "int32_t *");
    }

    #[test]
    fn test_array_of_basic() {
        let ctx = Context::new(Arch::X64);
        let arr = ctx.array_of(TypeKey::Basic(BasicKind::U8), 10);
        assert_eq!(ctx.type_string(arr), "uint8_t [10]");
    }

    #[test]
    fn test_pointer_to_array_parenthesized() {
        let ctx = Context::new(Arch::X64);
        let arr = ctx.array_of(TypeKey::Basic(BasicKind::S32), 4);
        let ptr = ctx.ptr_to(arr);
        assert_eq!(ctx.type_string(ptr), "int32_t (*)[4]");
    }

    #[test]
    fn test_array_of_pointers() {
        let ctx = Context::new(Arch::X64);
        let ptr = ctx.ptr_to(TypeKey::Basic(BasicKind::S32));
        let arr = ctx.array_of(ptr, 10);
        assert_eq!(ctx.type_string(arr), "int32_t *[10]");
    }

    #[test]
    fn test_plain_basic_trims_trailing_space() {
        let ctx = Context::new(Arch::X64);
        assert_eq!(ctx.type_string(TypeKey::Basic(BasicKind::F64)), "double");
    }
}
