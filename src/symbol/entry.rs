//! Symbol entries and the handles used to refer to them.
//!
//! Entries are owned by the symbol table's arena for the whole compilation
//! unit; scopes, operands and the code generator only ever hold `EntryId`s.

use std::fmt::Display;

use crate::types::types::Type;

/// Handle of an entry inside the symbol table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u32);

impl EntryId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    ByValue,
    ByReference,
}

/// Progress of a function header while its parameters are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    /// First declaration: parameters are appended.
    Defining,
    /// Definition of a forward-declared function: parameters are compared.
    Checking,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Integer(i16),
    Boolean(bool),
    Char(u8),
    /// Raw bytes; characters of the source language are single bytes.
    String(Vec<u8>),
    Nil,
}

impl ConstValue {
    /// The identifier a literal is entered under when it has no explicit name.
    pub fn printed(&self) -> String {
        match self {
            ConstValue::Integer(value) => value.to_string(),
            ConstValue::Boolean(true) => String::from("true"),
            ConstValue::Boolean(false) => String::from("false"),
            ConstValue::Char(c) => {
                let mut buffer = String::from("'");
                escape_into(&mut buffer, *c);
                buffer.push('\'');
                buffer
            }
            ConstValue::String(text) => {
                let mut buffer = String::from("\"");
                for byte in text {
                    escape_into(&mut buffer, *byte);
                }
                buffer.push('"');
                buffer
            }
            ConstValue::Nil => String::from("nil"),
        }
    }
}

fn escape_into(buffer: &mut String, c: u8) {
    match c {
        b'\n' => buffer.push_str("\\n"),
        b'\t' => buffer.push_str("\\t"),
        b'\r' => buffer.push_str("\\r"),
        0 => buffer.push_str("\\0"),
        b'\\' => buffer.push_str("\\\\"),
        b'\'' => buffer.push_str("\\'"),
        b'"' => buffer.push_str("\\\""),
        c if c.is_ascii() && !c.is_ascii_control() => buffer.push(c as char),
        c => buffer.push_str(&format!("\\x{:02x}", c)),
    }
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub first_param: Option<EntryId>,
    pub last_param: Option<EntryId>,
    /// Last parameter matched while checking a definition against its forward declaration.
    pub cursor: Option<EntryId>,
    pub result: Option<Type>,
    pub serial: i32,
    pub library: bool,
    pub state: SignatureState,
    pub forward: bool,
    pub gc_hungry: bool,
    /// Bytes of arguments the caller pushes.
    pub params_size: i32,
    /// Bytes of locals and temporaries reserved by the prologue.
    pub frame_size: i32,
}

impl FunctionInfo {
    pub fn new() -> Self {
        FunctionInfo {
            first_param: None,
            last_param: None,
            cursor: None,
            result: None,
            serial: 0,
            library: false,
            state: SignatureState::Defining,
            forward: false,
            gc_hungry: false,
            params_size: 0,
            frame_size: 0,
        }
    }

    pub fn is_library(&self) -> bool {
        self.serial < 0
    }
}

impl Default for FunctionInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum EntryKind {
    Variable {
        ty: Type,
        offset: i32,
    },
    Temporary {
        ty: Type,
        offset: i32,
        number: u32,
    },
    Parameter {
        ty: Type,
        mode: PassMode,
        offset: i32,
        next: Option<EntryId>,
    },
    Constant {
        ty: Type,
        value: ConstValue,
    },
    Function(FunctionInfo),
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub nesting_level: u32,
    pub kind: EntryKind,
}

impl SymbolEntry {
    /// Type of the value the entry denotes; a function denotes its result.
    pub fn ty(&self) -> Option<&Type> {
        match &self.kind {
            EntryKind::Variable { ty, .. }
            | EntryKind::Temporary { ty, .. }
            | EntryKind::Parameter { ty, .. }
            | EntryKind::Constant { ty, .. } => Some(ty),
            EntryKind::Function(function) => function.result.as_ref(),
        }
    }

    /// Frame offset of storage-backed entries.
    pub fn offset(&self) -> Option<i32> {
        match &self.kind {
            EntryKind::Variable { offset, .. }
            | EntryKind::Temporary { offset, .. }
            | EntryKind::Parameter { offset, .. } => Some(*offset),
            EntryKind::Constant { .. } | EntryKind::Function(_) => None,
        }
    }

    pub fn function(&self) -> Option<&FunctionInfo> {
        match &self.kind {
            EntryKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn function_mut(&mut self) -> Option<&mut FunctionInfo> {
        match &mut self.kind {
            EntryKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn constant(&self) -> Option<&ConstValue> {
        match &self.kind {
            EntryKind::Constant { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.kind, EntryKind::Temporary { .. })
    }
}

impl Display for SymbolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
