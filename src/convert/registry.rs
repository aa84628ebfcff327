//! Host type hierarchy used for converter dispatch.
//!
//! The [`TypeRegistry`] records, per type tag, a declared supertype and an
//! ordered list of interfaces. [`TypeRegistry::precedence`] turns that into
//! the lookup order for object converters: exact tag, supertypes nearest
//! first, interfaces in declaration order, then the wildcard.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifies a host type for converter lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag(&'static str);

impl TypeTag {
    pub const NULL: TypeTag = TypeTag("null");
    pub const INT: TypeTag = TypeTag("int");
    pub const FLOAT: TypeTag = TypeTag("float");
    pub const NUMBER: TypeTag = TypeTag("number");
    pub const STRING: TypeTag = TypeTag("string");
    pub const LIST: TypeTag = TypeTag("list");
    pub const ARRAY: TypeTag = TypeTag("array");
    pub const COMPOUND: TypeTag = TypeTag("compound");
    pub const TERM: TypeTag = TypeTag("term");
    /// Interface shared by numbers and strings.
    pub const ATOMIC: TypeTag = TypeTag("atomic");
    /// Interface of ordered collections.
    pub const SEQUENCE: TypeTag = TypeTag("sequence");
    /// Matches every type, consulted last.
    pub const ANY: TypeTag = TypeTag("any");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Default)]
struct TypeDecl {
    supertype: Option<TypeTag>,
    interfaces: Vec<TypeTag>,
}

/// Declared supertypes and interfaces of host types.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    decls: HashMap<TypeTag, TypeDecl>,
}

impl TypeRegistry {
    /// A registry with no declarations.
    pub fn empty() -> Self {
        Self {
            decls: HashMap::new(),
        }
    }

    /// Declare the supertype and interfaces of `tag`, replacing any earlier
    /// declaration.
    pub fn declare(&mut self, tag: TypeTag, supertype: Option<TypeTag>, interfaces: &[TypeTag]) {
        self.decls.insert(
            tag,
            TypeDecl {
                supertype,
                interfaces: interfaces.to_vec(),
            },
        );
    }

    pub fn supertype(&self, tag: TypeTag) -> Option<TypeTag> {
        self.decls.get(&tag).and_then(|d| d.supertype)
    }

    /// Lookup order for `tag`.
    ///
    /// The supertype chain comes first, then the interfaces of each type on
    /// that chain (with the interfaces' own supertypes), then [`TypeTag::ANY`].
    /// Each tag appears once; cyclic declarations are cut at the repeat.
    pub fn precedence(&self, tag: TypeTag) -> Vec<TypeTag> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();

        let mut chain = Vec::new();
        let mut current = Some(tag);
        while let Some(t) = current {
            if !seen.insert(t) {
                break;
            }
            chain.push(t);
            current = self.supertype(t);
        }
        order.extend(chain.iter().copied());

        for t in &chain {
            let Some(decl) = self.decls.get(t) else {
                continue;
            };
            for &iface in &decl.interfaces {
                let mut current = Some(iface);
                while let Some(i) = current {
                    if !seen.insert(i) {
                        break;
                    }
                    order.push(i);
                    current = self.supertype(i);
                }
            }
        }

        if seen.insert(TypeTag::ANY) {
            order.push(TypeTag::ANY);
        }
        order
    }
}

impl Default for TypeRegistry {
    /// The built-in value hierarchy: integers and floats are numbers, numbers
    /// and strings are atomic, lists are sequences.
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.declare(TypeTag::INT, Some(TypeTag::NUMBER), &[]);
        reg.declare(TypeTag::FLOAT, Some(TypeTag::NUMBER), &[]);
        reg.declare(TypeTag::NUMBER, None, &[TypeTag::ATOMIC]);
        reg.declare(TypeTag::STRING, None, &[TypeTag::ATOMIC]);
        reg.declare(TypeTag::LIST, None, &[TypeTag::SEQUENCE]);
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: TypeTag = TypeTag::new("shape");
    const CIRCLE: TypeTag = TypeTag::new("circle");
    const ELLIPSE: TypeTag = TypeTag::new("ellipse");
    const DRAWABLE: TypeTag = TypeTag::new("drawable");
    const NAMED: TypeTag = TypeTag::new("named");
    const PRINTABLE: TypeTag = TypeTag::new("printable");

    #[test]
    fn builtin_precedence() {
        let reg = TypeRegistry::default();
        assert_eq!(
            reg.precedence(TypeTag::INT),
            vec![TypeTag::INT, TypeTag::NUMBER, TypeTag::ATOMIC, TypeTag::ANY]
        );
        assert_eq!(
            reg.precedence(TypeTag::STRING),
            vec![TypeTag::STRING, TypeTag::ATOMIC, TypeTag::ANY]
        );
    }

    #[test]
    fn supertypes_before_interfaces() {
        let mut reg = TypeRegistry::empty();
        reg.declare(CIRCLE, Some(ELLIPSE), &[NAMED]);
        reg.declare(ELLIPSE, Some(SHAPE), &[DRAWABLE]);
        reg.declare(DRAWABLE, Some(PRINTABLE), &[]);
        assert_eq!(
            reg.precedence(CIRCLE),
            vec![CIRCLE, ELLIPSE, SHAPE, NAMED, DRAWABLE, PRINTABLE, TypeTag::ANY]
        );
    }

    #[test]
    fn undeclared_tag_falls_back_to_any() {
        let reg = TypeRegistry::empty();
        assert_eq!(reg.precedence(SHAPE), vec![SHAPE, TypeTag::ANY]);
    }

    #[test]
    fn cycles_terminate() {
        let mut reg = TypeRegistry::empty();
        reg.declare(SHAPE, Some(CIRCLE), &[SHAPE]);
        reg.declare(CIRCLE, Some(SHAPE), &[]);
        assert_eq!(reg.precedence(SHAPE), vec![SHAPE, CIRCLE, TypeTag::ANY]);
    }

    #[test]
    fn redeclaration_replaces() {
        let mut reg = TypeRegistry::empty();
        reg.declare(CIRCLE, Some(ELLIPSE), &[]);
        reg.declare(CIRCLE, Some(SHAPE), &[]);
        assert_eq!(reg.supertype(CIRCLE), Some(SHAPE));
    }
}
