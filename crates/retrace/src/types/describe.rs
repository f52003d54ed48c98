//! C-like spelling of types for diagnostics

use super::context::TypeContext;
use super::kind::{TypeId, TypeKind};

impl TypeContext {
    /// Spell `id` the way it would be written in a C cast
    pub fn describe(&self, id: TypeId) -> String {
        if !self.contains(id) {
            return "<invalid type>".to_string();
        }
        self.spell(id, String::new())
    }

    /// Spell `id` around an already spelled declarator
    fn spell(&self, id: TypeId, declarator: String) -> String {
        match self.kind(id) {
            TypeKind::Pointer { pointee } => self.spell_pointer(*pointee, "*", declarator),
            TypeKind::BlockPointer { pointee } => self.spell_pointer(*pointee, "^", declarator),
            TypeKind::LValueReference { pointee } => self.spell_pointer(*pointee, "&", declarator),
            TypeKind::RValueReference { pointee } => {
                self.spell_pointer(*pointee, "&&", declarator)
            }
            TypeKind::ObjCObjectPointer { pointee } => {
                self.spell_pointer(*pointee, "*", declarator)
            }
            TypeKind::MemberPointer { pointee, class } => {
                let prefix = format!("{}::*", self.describe(*class));
                self.spell_pointer(*pointee, &prefix, declarator)
            }
            TypeKind::ConstantArray { element, size } => {
                self.spell(*element, format!("{}[{}]", declarator, size))
            }
            TypeKind::IncompleteArray { element } => {
                self.spell(*element, format!("{}[]", declarator))
            }
            TypeKind::VariableArray { element } => {
                self.spell(*element, format!("{}[*]", declarator))
            }
            TypeKind::FunctionProto {
                ret,
                params,
                variadic,
                ..
            } => {
                let mut list: Vec<String> = params.iter().map(|param| self.describe(*param)).collect();
                if *variadic {
                    list.push("...".to_string());
                }
                if list.is_empty() {
                    list.push("void".to_string());
                }
                self.spell(*ret, format!("{}({})", declarator, list.join(", ")))
            }
            TypeKind::FunctionNoProto { ret, .. } => self.spell(*ret, format!("{}()", declarator)),
            TypeKind::Qualified { inner, qualifiers } if !self.is_pointer_like(*inner) => {
                format!("{} {}", qualifiers, self.spell(*inner, declarator))
            }
            TypeKind::Qualified { inner, qualifiers } => {
                let declarator = if declarator.is_empty() {
                    qualifiers.to_string()
                } else {
                    format!("{} {}", qualifiers, declarator)
                };
                self.spell(*inner, declarator)
            }
            _ => {
                let base = self.base_name(id);
                if declarator.is_empty() {
                    base
                } else if declarator.starts_with('[') {
                    format!("{}{}", base, declarator)
                } else {
                    format!("{} {}", base, declarator)
                }
            }
        }
    }

    fn spell_pointer(&self, pointee: TypeId, operator: &str, declarator: String) -> String {
        let declarator = format!("{}{}", operator, declarator);
        let canonical = self.canonical_kind(pointee);
        if canonical.is_array() || canonical.is_function() {
            self.spell(pointee, format!("({})", declarator))
        } else {
            self.spell(pointee, declarator)
        }
    }

    /// Qualifiers of these kinds are written after the operator
    fn is_pointer_like(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Pointer { .. }
                | TypeKind::BlockPointer { .. }
                | TypeKind::LValueReference { .. }
                | TypeKind::RValueReference { .. }
                | TypeKind::MemberPointer { .. }
                | TypeKind::ObjCObjectPointer { .. }
        )
    }

    /// Spelling of a type with no declarator part
    fn base_name(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Builtin(kind) => kind.name().to_string(),
            TypeKind::Complex { element } => format!("_Complex {}", self.describe(*element)),
            TypeKind::Vector { element, count, .. } => {
                format!("vector<{} x {}>", count, self.describe(*element))
            }
            TypeKind::Record(record) => {
                let decl = self.record(*record);
                match decl.name {
                    Some(name) => format!("{} {}", decl.tag, self.resolve(name)),
                    None => format!("{} <anonymous>", decl.tag),
                }
            }
            TypeKind::Enum(decl) => match self.enum_decl(*decl).name {
                Some(name) => format!("enum {}", self.resolve(name)),
                None => "enum <anonymous>".to_string(),
            },
            TypeKind::Typedef { name, .. } => self.resolve(*name).to_string(),
            TypeKind::Auto => "__auto_type".to_string(),
            TypeKind::Atomic { value } => format!("_Atomic({})", self.describe(*value)),
            TypeKind::Pipe { element } => format!("pipe {}", self.describe(*element)),
            other => other.class().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::types::{
        BuiltinKind, FunctionExt, Qualifiers, TagKind, TargetLayout, TypeContext, TypeId,
    };

    #[test]
    fn test_describe_declarators() {
        let mut ctx = TypeContext::new("test", TargetLayout::lp64());
        let int = ctx.builtin(BuiltinKind::Int);
        let char_ = ctx.builtin(BuiltinKind::CharS);

        let ptr = ctx.pointer_to(int);
        assert_eq!(ctx.describe(ptr), "int *");

        let array = ctx.constant_array_of(ptr, 4);
        assert_eq!(ctx.describe(array), "int *[4]");

        let char_array = ctx.constant_array_of(char_, 8);
        let ptr_to_array = ctx.pointer_to(char_array);
        assert_eq!(ctx.describe(ptr_to_array), "char (*)[8]");

        let func = ctx.function_proto(int, vec![ptr, char_], true, FunctionExt::default());
        let func_ptr = ctx.pointer_to(func);
        assert_eq!(ctx.describe(func_ptr), "int (*)(int *, char, ...)");

        let no_args = ctx.function_proto(int, vec![], false, FunctionExt::default());
        assert_eq!(ctx.describe(no_args), "int (void)");
    }

    #[test]
    fn test_describe_named_and_qualified() {
        let mut ctx = TypeContext::new("test", TargetLayout::lp64());
        let node = ctx.declare_record(TagKind::Struct, Some("node"));
        let node_ptr = ctx.pointer_to(node);
        assert_eq!(ctx.describe(node_ptr), "struct node *");

        let constant = Qualifiers {
            is_const: true,
            ..Qualifiers::default()
        };
        let const_ptr = ctx.qualified(node_ptr, constant);
        assert_eq!(ctx.describe(const_ptr), "struct node *const");

        let const_node = ctx.qualified(node, constant);
        let ptr_to_const = ctx.pointer_to(const_node);
        assert_eq!(ctx.describe(ptr_to_const), "const struct node *");

        let int = ctx.builtin(BuiltinKind::Int);
        let size = ctx.typedef("size", int);
        assert_eq!(ctx.describe(size), "size");
        assert_eq!(ctx.describe(TypeId(4242)), "<invalid type>");
    }
}
