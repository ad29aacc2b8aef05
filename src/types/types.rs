use std::fmt::Display;

use crate::{errors::errors::Error, MK_INTERNAL};

/// A type of the source language.
///
/// Arrays and lists are represented at run time by a reference to heap
/// storage, so every composite type has the size of a pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Integer,
    Boolean,
    Char,
    /// Element type of the empty list; unifies with every type except `Void`.
    Any,
    Array(Box<Type>),
    Pointer(Box<Type>),
    List(Box<Type>),
}

impl Type {
    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn pointer(element: Type) -> Type {
        Type::Pointer(Box::new(element))
    }

    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    /// Structural equality where `Any` stands in for every non-void type.
    pub fn matches(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, other) | (other, Type::Any) => *other != Type::Void,
            (Type::Array(a), Type::Array(b))
            | (Type::Pointer(a), Type::Pointer(b))
            | (Type::List(a), Type::List(b)) => a.matches(b),
            (a, b) => a == b,
        }
    }

    /// Storage size in bytes.
    pub fn size_of(&self) -> Result<i32, Error> {
        match self {
            Type::Void => Err(MK_INTERNAL!("type void has no size")),
            Type::Boolean | Type::Char | Type::Any => Ok(1),
            Type::Integer | Type::Array(_) | Type::Pointer(_) | Type::List(_) => Ok(2),
        }
    }

    /// The referenced type of an array, pointer or list.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(element) | Type::Pointer(element) | Type::List(element) => Some(element),
            _ => None,
        }
    }

    /// Whether a value of this type points into the collected heap.
    pub fn is_heap_reference(&self) -> bool {
        matches!(self, Type::List(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Array(element) if **element == Type::Char)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Integer => write!(f, "integer"),
            Type::Boolean => write!(f, "boolean"),
            Type::Char => write!(f, "char"),
            Type::Any => write!(f, "any"),
            Type::Array(element) => write!(f, "array of {}", element),
            Type::Pointer(element) => write!(f, "pointer to {}", element),
            Type::List(element) => write!(f, "list of {}", element),
        }
    }
}
