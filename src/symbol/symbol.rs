//! The scoped symbol table.
//!
//! Entries live in an arena owned by the table for the whole compilation, so
//! they outlive the scope that declared them; the code generator runs after a
//! function's scope is gone and still needs offsets and types. Scopes and the
//! name index only hold `EntryId` handles.

use std::collections::HashMap;

use log::debug;

use crate::{
    errors::errors::{Error, ErrorImpl},
    types::types::Type,
    MK_ERROR, MK_INTERNAL,
};

use super::{
    entry::{ConstValue, EntryId, EntryKind, FunctionInfo, PassMode, SignatureState, SymbolEntry},
    library::LIBRARY_FUNCTIONS,
};

/// Offset counter of a fresh scope; locals grow downwards from here.
pub const START_NEGATIVE_OFFSET: i32 = 0;
/// Offset of the last parameter: saved `bp`, return address, static link and result slot come first.
pub const START_POSITIVE_OFFSET: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPolicy {
    CurrentScopeOnly,
    AllEnclosingScopes,
}

#[derive(Debug)]
pub struct Scope {
    pub nesting_level: u32,
    pub neg_offset: i32,
    pub entries: Vec<EntryId>,
    pub gc_hungry: bool,
}

impl Scope {
    fn new(nesting_level: u32) -> Self {
        Scope {
            nesting_level,
            neg_offset: START_NEGATIVE_OFFSET,
            entries: vec![],
            gc_hungry: false,
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    index: HashMap<String, Vec<EntryId>>,
    scopes: Vec<Scope>,
    next_temporary: u32,
    next_serial: i32,
    next_library_serial: i32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            entries: vec![],
            index: HashMap::new(),
            scopes: vec![],
            next_temporary: 1,
            next_serial: 0,
            next_library_serial: -(LIBRARY_FUNCTIONS.len() as i32),
        }
    }

    pub fn open_scope(&mut self) {
        let nesting_level = self.scopes.last().map_or(1, |scope| scope.nesting_level + 1);
        debug!("opening scope at nesting level {}", nesting_level);
        self.scopes.push(Scope::new(nesting_level));
    }

    /// Pops the current scope and unlinks its entries from the name index.
    /// The entries themselves stay in the arena.
    pub fn close_scope(&mut self) -> Result<(), Error> {
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| MK_INTERNAL!("closeScope: no open scope"))?;

        for id in scope.entries.iter().rev() {
            let name = &self.entries[id.index()].name;
            if let Some(chain) = self.index.get_mut(name) {
                if let Some(position) = chain.iter().rposition(|other| other == id) {
                    chain.remove(position);
                }
                if chain.is_empty() {
                    self.index.remove(name);
                }
            }
        }

        debug!("closed scope at nesting level {}", scope.nesting_level);
        Ok(())
    }

    pub fn current_scope(&self) -> Result<&Scope, Error> {
        self.scopes
            .last()
            .ok_or_else(|| MK_INTERNAL!("no scope is open"))
    }

    fn current_scope_mut(&mut self) -> Result<&mut Scope, Error> {
        self.scopes
            .last_mut()
            .ok_or_else(|| MK_INTERNAL!("no scope is open"))
    }

    /// Nesting level of the innermost open scope, 0 when none is open.
    pub fn nesting_level(&self) -> u32 {
        self.scopes.last().map_or(0, |scope| scope.nesting_level)
    }

    /// Entries declared directly in the innermost scope, in declaration order.
    pub fn current_entries(&self) -> &[EntryId] {
        self.scopes
            .last()
            .map_or(&[][..], |scope| scope.entries.as_slice())
    }

    pub fn entry(&self, id: EntryId) -> &SymbolEntry {
        &self.entries[id.index()]
    }

    pub(crate) fn entry_mut(&mut self, id: EntryId) -> &mut SymbolEntry {
        &mut self.entries[id.index()]
    }

    pub fn function(&self, id: EntryId) -> Result<&FunctionInfo, Error> {
        let entry = self.entry(id);
        entry
            .function()
            .ok_or_else(|| MK_INTERNAL!("`{}` is not a function", entry.name))
    }

    fn function_mut(&mut self, id: EntryId) -> Result<&mut FunctionInfo, Error> {
        let entry = self.entry_mut(id);
        let name = entry.name.clone();
        entry
            .function_mut()
            .ok_or_else(|| MK_INTERNAL!("`{}` is not a function", name))
    }

    fn link(&mut self, id: EntryId) -> Result<(), Error> {
        let name = self.entries[id.index()].name.clone();
        self.current_scope_mut()?.entries.push(id);
        self.index.entry(name).or_default().push(id);
        Ok(())
    }

    fn new_entry(&mut self, name: &str, kind: EntryKind) -> Result<EntryId, Error> {
        let scope = self.current_scope()?;
        if scope
            .entries
            .iter()
            .any(|id| self.entries[id.index()].name == name)
        {
            return Err(MK_ERROR!(ErrorImpl::DuplicateIdentifier {
                name: name.to_string(),
            }));
        }
        let nesting_level = scope.nesting_level;

        let id = EntryId(self.entries.len() as u32);
        self.entries.push(SymbolEntry {
            name: name.to_string(),
            nesting_level,
            kind,
        });
        self.link(id)?;
        Ok(id)
    }

    /// Reserves `ty`'s storage below the current scope's offset counter.
    fn allocate(&mut self, ty: &Type) -> Result<i32, Error> {
        let size = ty.size_of()?;
        let scope = self.current_scope_mut()?;
        scope.neg_offset -= size;
        if ty.is_heap_reference() {
            scope.gc_hungry = true;
        }
        Ok(scope.neg_offset)
    }

    pub fn declare_variable(&mut self, name: &str, ty: Type) -> Result<EntryId, Error> {
        if self.lookup(name, LookupPolicy::CurrentScopeOnly).is_some() {
            return Err(MK_ERROR!(ErrorImpl::DuplicateIdentifier {
                name: name.to_string(),
            }));
        }
        let offset = self.allocate(&ty)?;
        self.new_entry(name, EntryKind::Variable { ty, offset })
    }

    pub fn declare_temporary(&mut self, ty: Type) -> Result<EntryId, Error> {
        let number = self.next_temporary;
        let offset = self.allocate(&ty)?;
        self.next_temporary += 1;
        self.new_entry(
            &format!("${}", number),
            EntryKind::Temporary { ty, offset, number },
        )
    }

    /// Returns the visible constant with the same name, or enters a new one.
    ///
    /// Unnamed literals are entered under their printed form, so a repeated
    /// literal resolves to the entry created the first time.
    pub fn declare_constant(
        &mut self,
        name: Option<&str>,
        ty: Type,
        value: ConstValue,
    ) -> Result<EntryId, Error> {
        let fits = match (&ty, &value) {
            (Type::Integer, ConstValue::Integer(_))
            | (Type::Boolean, ConstValue::Boolean(_))
            | (Type::Char, ConstValue::Char(_))
            | (Type::List(_), ConstValue::Nil) => true,
            (ty, ConstValue::String(_)) => ty.is_string(),
            _ => false,
        };
        if !fits {
            return Err(MK_INTERNAL!("invalid constant {:?} of type {}", value, ty));
        }

        let name = match name {
            Some(name) => name.to_string(),
            None => value.printed(),
        };
        if matches!(value, ConstValue::Nil) && name != "nil" {
            return Err(MK_INTERNAL!("invalid list constant `{}`", name));
        }

        if let Some(existing) = self.lookup(&name, LookupPolicy::AllEnclosingScopes) {
            if self.entry(existing).constant().is_some() {
                return Ok(existing);
            }
        }
        self.new_entry(&name, EntryKind::Constant { ty, value })
    }

    /// Enters a function header, or reopens a forward-declared one for checking.
    pub fn declare_function(&mut self, name: &str) -> Result<EntryId, Error> {
        match self.lookup(name, LookupPolicy::CurrentScopeOnly) {
            None => self.new_entry(name, EntryKind::Function(FunctionInfo::new())),
            Some(existing) => match self.entry_mut(existing).function_mut() {
                Some(function) if function.forward => {
                    function.forward = false;
                    function.state = SignatureState::Checking;
                    function.cursor = None;
                    Ok(existing)
                }
                _ => Err(MK_ERROR!(ErrorImpl::DuplicateIdentifier {
                    name: name.to_string(),
                })),
            },
        }
    }

    pub fn mark_forward(&mut self, function: EntryId) -> Result<(), Error> {
        self.function_mut(function)?.forward = true;
        Ok(())
    }

    pub fn mark_gc_hungry(&mut self, function: EntryId) -> Result<(), Error> {
        self.function_mut(function)?.gc_hungry = true;
        Ok(())
    }

    /// Copies the current scope's offset counter into the function as its local frame size.
    pub fn record_frame_size(&mut self, function: EntryId) -> Result<(), Error> {
        let frame_size = -self.current_scope()?.neg_offset;
        self.function_mut(function)?.frame_size = frame_size;
        Ok(())
    }

    pub fn declare_parameter(
        &mut self,
        name: &str,
        ty: Type,
        mode: PassMode,
        function: EntryId,
    ) -> Result<EntryId, Error> {
        let function_name = self.entry(function).name.clone();
        let info = self
            .function(function)
            .map_err(|_| MK_INTERNAL!("cannot add a parameter to non-function `{}`", function_name))?
            .clone();

        match info.state {
            SignatureState::Defining => {
                let id = self.new_entry(
                    name,
                    EntryKind::Parameter {
                        ty,
                        mode,
                        offset: 0,
                        next: None,
                    },
                )?;
                if let Some(last) = info.last_param {
                    if let EntryKind::Parameter { next, .. } = &mut self.entry_mut(last).kind {
                        *next = Some(id);
                    }
                }
                let info = self.function_mut(function)?;
                if info.first_param.is_none() {
                    info.first_param = Some(id);
                }
                info.last_param = Some(id);
                Ok(id)
            }
            SignatureState::Checking => {
                let expected = match info.cursor {
                    None => info.first_param,
                    Some(cursor) => match &self.entry(cursor).kind {
                        EntryKind::Parameter { next, .. } => *next,
                        _ => None,
                    },
                };
                let mismatch = |reason: &str| {
                    MK_ERROR!(ErrorImpl::SignatureMismatch {
                        function: function_name.clone(),
                        reason: reason.to_string(),
                    })
                };

                let expected = expected.ok_or_else(|| mismatch("more parameters than expected"))?;
                let entry = self.entry(expected);
                if let EntryKind::Parameter {
                    ty: expected_ty,
                    mode: expected_mode,
                    ..
                } = &entry.kind
                {
                    if !expected_ty.matches(&ty) {
                        return Err(mismatch("parameter type mismatch"));
                    }
                    if *expected_mode != mode {
                        return Err(mismatch("parameter passing mode mismatch"));
                    }
                }
                if entry.name != name {
                    return Err(mismatch("parameter name mismatch"));
                }

                self.link(expected)?;
                self.function_mut(function)?.cursor = Some(expected);
                Ok(expected)
            }
            SignatureState::Complete => Err(MK_ERROR!(ErrorImpl::FunctionAlreadyComplete {
                function: function_name,
            })),
        }
    }

    fn parameters(&self, function: &FunctionInfo) -> Vec<EntryId> {
        let mut parameters = vec![];
        let mut current = function.first_param;
        while let Some(id) = current {
            parameters.push(id);
            current = match &self.entry(id).kind {
                EntryKind::Parameter { next, .. } => *next,
                _ => None,
            };
        }
        parameters
    }

    /// Parameters of a function in declaration order.
    pub fn parameters_of(&self, function: EntryId) -> Result<Vec<EntryId>, Error> {
        Ok(self.parameters(self.function(function)?))
    }

    /// Closes a function header: numbers the function and lays out its
    /// parameters, or checks a definition against its forward declaration.
    pub fn finalize_signature(&mut self, function: EntryId, result: Type) -> Result<(), Error> {
        let function_name = self.entry(function).name.clone();
        let info = self.function(function)?.clone();

        match info.state {
            SignatureState::Complete => {
                return Err(MK_INTERNAL!(
                    "cannot end parameters of already defined function `{}`",
                    function_name
                ));
            }
            SignatureState::Defining => {
                let serial = if info.library {
                    self.next_library_serial += 1;
                    self.next_library_serial - 1
                } else {
                    self.next_serial += 1;
                    self.next_serial - 1
                };

                let mut rest = 0;
                for id in self.parameters(&info).into_iter().rev() {
                    if let EntryKind::Parameter { ty, mode, offset, .. } = &mut self.entry_mut(id).kind {
                        *offset = START_POSITIVE_OFFSET + rest;
                        rest += match mode {
                            PassMode::ByReference => 2,
                            PassMode::ByValue => ty.size_of()?,
                        };
                    }
                }

                let info = self.function_mut(function)?;
                info.serial = serial;
                info.params_size = rest;
                info.result = Some(result);
                debug!(
                    "function `{}` numbered {} with {} bytes of parameters",
                    function_name, serial, rest
                );
            }
            SignatureState::Checking => {
                let remaining = match info.cursor {
                    None => info.first_param,
                    Some(cursor) => match &self.entry(cursor).kind {
                        EntryKind::Parameter { next, .. } => *next,
                        _ => None,
                    },
                };
                let mismatch = |reason: &str| {
                    MK_ERROR!(ErrorImpl::SignatureMismatch {
                        function: function_name.clone(),
                        reason: reason.to_string(),
                    })
                };
                if remaining.is_some() {
                    return Err(mismatch("fewer parameters than expected"));
                }
                if !info.result.as_ref().is_some_and(|declared| declared.matches(&result)) {
                    return Err(mismatch("result type mismatch"));
                }
            }
        }

        self.function_mut(function)?.state = SignatureState::Complete;
        Ok(())
    }

    /// Soft lookup through the hashed index.
    pub fn lookup(&self, name: &str, policy: LookupPolicy) -> Option<EntryId> {
        let id = *self.index.get(name)?.last()?;
        match policy {
            LookupPolicy::AllEnclosingScopes => Some(id),
            LookupPolicy::CurrentScopeOnly => {
                (self.entry(id).nesting_level == self.nesting_level()).then_some(id)
            }
        }
    }

    /// Hard lookup: an unknown name is a semantic error.
    pub fn resolve(&self, name: &str) -> Result<EntryId, Error> {
        self.lookup(name, LookupPolicy::AllEnclosingScopes)
            .ok_or_else(|| {
                MK_ERROR!(ErrorImpl::UnknownIdentifier {
                    name: name.to_string(),
                })
            })
    }

    /// Declares every run-time library routine in the current scope.
    pub fn declare_library(&mut self) -> Result<(), Error> {
        for routine in LIBRARY_FUNCTIONS.iter() {
            let function = self.declare_function(routine.name)?;
            {
                let info = self.function_mut(function)?;
                info.library = true;
                info.gc_hungry = routine.gc_hungry;
            }
            self.open_scope();
            for (name, ty, mode) in &routine.params {
                self.declare_parameter(name, ty.clone(), *mode, function)?;
            }
            self.finalize_signature(function, routine.result.clone())?;
            self.close_scope()?;
        }
        Ok(())
    }
}
