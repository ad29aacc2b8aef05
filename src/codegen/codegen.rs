//! Lowering of quads to 16-bit MASM assembly.
//!
//! Registers are fixed per operator: `ax`/`dx`/`cx` for arithmetic, `al`/`dl`
//! for byte comparisons, `bl`/`bx` for assignments, `si` for static-link
//! traversal and indirect parameters, and `di` for dereferences.
//!
//! Frame layout of a unit, relative to `bp`:
//!
//! ```text
//! [bp+8...]  parameters, last one at +8
//! [bp+6]     address of the result slot
//! [bp+4]     static link
//! [bp+2]     return address
//! [bp+0]     saved bp
//! [bp-1...]  locals and temporaries
//! ```

use std::ops::Range;

use log::trace;

use crate::{
    errors::errors::Error,
    intermediate::{
        intermediate::QuadBuffer,
        operand::{Operand, Passing},
        quad::{Operator, Quad},
    },
    symbol::{
        entry::{ConstValue, EntryId, EntryKind, PassMode, SymbolEntry},
        library::library_function,
        symbol::SymbolTable,
    },
    types::types::Type,
    MK_INTERNAL,
};

use super::{
    access::{self, Access, LinkSource},
    gc::{self, GcRoot},
    strings::StringPool,
};

/// The code generator state carried from one flushed unit to the next.
#[derive(Debug)]
pub struct CodeGenerator {
    /// Whether call tables and collector bookkeeping are generated
    gc: bool,
    /// Assembly of every unit lowered so far
    output: String,
    /// The unit whose quads are being lowered
    current_unit: Option<EntryId>,
    /// Nesting level of the current unit's body
    current_nesting: u32,
    /// Library routines referenced so far, with whether they export a call table
    externs: Vec<(String, bool)>,
    strings: StringPool,
    /// Argument bytes pushed at each collector-visible call site of the current unit
    call_sites: Vec<i32>,
    /// Units that published a call table, in emission order
    call_tables: Vec<String>,
}

fn pointer_size(size: i32) -> &'static str {
    if size == 1 {
        "byte"
    } else {
        "word"
    }
}

fn by_reference(entry: &SymbolEntry) -> bool {
    matches!(
        entry.kind,
        EntryKind::Parameter {
            mode: PassMode::ByReference,
            ..
        }
    )
}

fn entry_type<'a>(symbols: &'a SymbolTable, id: EntryId) -> Result<&'a Type, Error> {
    let entry = symbols.entry(id);
    entry
        .ty()
        .ok_or_else(|| MK_INTERNAL!("`{}` has no type", entry.name))
}

/// Assembly label of a unit: `_name_serial`, or `_name` for library routines.
pub fn unit_name(symbols: &SymbolTable, id: EntryId) -> Result<String, Error> {
    let function = symbols.function(id)?;
    let name = &symbols.entry(id).name;
    if function.is_library() {
        Ok(format!("_{}", name))
    } else {
        Ok(format!("_{}_{}", name, function.serial))
    }
}

/// Label of the shared exit point of a user function.
pub fn end_label(symbols: &SymbolTable, id: EntryId) -> Result<String, Error> {
    let function = symbols.function(id)?;
    let name = &symbols.entry(id).name;
    if function.is_library() {
        return Err(MK_INTERNAL!("library routine `{}` has no exit label", name));
    }
    Ok(format!("@{}_{}", name, function.serial))
}

fn quad_label(operand: &Operand) -> Result<String, Error> {
    match operand {
        Operand::QuadLabel(label) => Ok(format!("@{}", label)),
        other => Err(MK_INTERNAL!("expected a quad label, found {:?}", other)),
    }
}

impl CodeGenerator {
    pub fn new(gc: bool) -> Self {
        CodeGenerator {
            gc,
            output: String::new(),
            current_unit: None,
            current_nesting: 0,
            externs: vec![],
            strings: StringPool::new(),
            call_sites: vec![],
            call_tables: vec![],
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn current_nesting(&self) -> u32 {
        self.current_nesting
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn externs(&self) -> impl Iterator<Item = &str> {
        self.externs.iter().map(|(name, _)| name.as_str())
    }

    pub fn call_tables(&self) -> &[String] {
        &self.call_tables
    }

    fn code(&mut self, command: &str, args: &[&str]) {
        self.output.push('\t');
        self.output.push_str(command);
        if !args.is_empty() {
            self.output.push('\t');
            self.output.push_str(&args.join(", "));
        }
        self.output.push('\n');
    }

    fn label(&mut self, label: &str) {
        self.output.push_str(label);
        self.output.push_str(":\n");
    }

    fn declare_extern(&mut self, name: &str, exports_call_table: bool) {
        if !self.externs.iter().any(|(known, _)| known == name) {
            self.externs.push((name.to_string(), exports_call_table));
        }
    }

    /// Lowers the quads of `range`.
    ///
    /// A unit is lowered while its scope is still open: the call table
    /// written at `endu` lists the heap references among the scope's entries.
    pub fn lower(
        &mut self,
        quads: &QuadBuffer,
        range: Range<u32>,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        for quad in quads.range(range)? {
            // Removed quads keep their label so that jumps into them still resolve.
            if !quad.is_active() {
                self.label(&format!("@{}", quad.label()));
                continue;
            }
            let rendered = quad.render(symbols);
            trace!("lowering {}", rendered);
            self.output.push_str(&format!(";;; {}\n", rendered));
            self.label(&format!("@{}", quad.label()));
            self.lower_quad(quad, symbols)?;
        }
        Ok(())
    }

    fn lower_quad(&mut self, quad: &Quad, symbols: &SymbolTable) -> Result<(), Error> {
        let Quad { op, x, y, z, .. } = quad;
        match op {
            Operator::Assign => {
                let register = if self.operand_size(x, symbols)? == 1 {
                    "bl"
                } else {
                    "bx"
                };
                self.load(register, x, symbols)?;
                self.store(register, z, symbols)?;
            }
            Operator::Array => {
                let element_size = self.element_size(x, symbols)?;
                self.load("ax", y, symbols)?;
                self.code("mov", &["cx", &element_size.to_string()]);
                self.code("imul", &["cx"]);
                self.load("cx", x, symbols)?;
                self.code("add", &["ax", "cx"]);
                self.store("ax", z, symbols)?;
            }
            Operator::Add | Operator::Sub => {
                self.load("ax", x, symbols)?;
                self.load("dx", y, symbols)?;
                let command = if *op == Operator::Add { "add" } else { "sub" };
                self.code(command, &["ax", "dx"]);
                self.store("ax", z, symbols)?;
            }
            Operator::Mul => {
                self.load("ax", x, symbols)?;
                self.load("cx", y, symbols)?;
                self.code("imul", &["cx"]);
                self.store("ax", z, symbols)?;
            }
            Operator::Div | Operator::Mod => {
                self.load("ax", x, symbols)?;
                self.code("cwd", &[]);
                self.load("cx", y, symbols)?;
                self.code("idiv", &["cx"]);
                let register = if *op == Operator::Div { "ax" } else { "dx" };
                self.store(register, z, symbols)?;
            }
            Operator::Eq => self.conditional("je", quad, symbols)?,
            Operator::Ne => self.conditional("jne", quad, symbols)?,
            Operator::Lt => self.conditional("jl", quad, symbols)?,
            Operator::Gt => self.conditional("jg", quad, symbols)?,
            Operator::Le => self.conditional("jle", quad, symbols)?,
            Operator::Ge => self.conditional("jge", quad, symbols)?,
            Operator::Ifb => {
                self.load("al", x, symbols)?;
                self.code("or", &["al", "al"]);
                self.code("jnz", &[&quad_label(z)?]);
            }
            Operator::Jump => {
                self.code("jmp", &[&quad_label(z)?]);
            }
            Operator::Unit => self.begin_unit(x, symbols)?,
            Operator::Endu => self.end_unit(x, symbols)?,
            Operator::Call => self.call(z, symbols)?,
            Operator::Ret => {
                let unit = self
                    .current_unit
                    .ok_or_else(|| MK_INTERNAL!("ret outside of a unit"))?;
                self.code("jmp", &[&end_label(symbols, unit)?]);
            }
            Operator::Par => self.parameter(x, y, symbols)?,
        }
        Ok(())
    }

    fn conditional(&mut self, jump: &str, quad: &Quad, symbols: &SymbolTable) -> Result<(), Error> {
        let target = quad_label(&quad.z)?;
        let (left, right) = match self.operand_size(&quad.x, symbols)? {
            1 => ("al", "dl"),
            2 => ("ax", "dx"),
            size => return Err(MK_INTERNAL!("cannot compare operands of size {}", size)),
        };
        self.load(left, &quad.x, symbols)?;
        self.load(right, &quad.y, symbols)?;
        self.code("cmp", &[left, right]);
        self.code(jump, &[&target]);
        Ok(())
    }

    fn begin_unit(&mut self, unit: &Operand, symbols: &SymbolTable) -> Result<(), Error> {
        let Operand::Unit(id) = *unit else {
            return Err(MK_INTERNAL!("unit: operand x must be a unit"));
        };
        let name = unit_name(symbols, id)?;
        let frame_size = symbols.function(id)?.frame_size;

        self.output.push_str(&format!("{}\tproc\tnear\n", name));
        self.code("push", &["bp"]);
        self.code("mov", &["bp", "sp"]);
        self.code("sub", &["sp", &frame_size.to_string()]);

        self.current_unit = Some(id);
        self.current_nesting = symbols.entry(id).nesting_level + 1;
        self.call_sites.clear();
        Ok(())
    }

    fn end_unit(&mut self, unit: &Operand, symbols: &SymbolTable) -> Result<(), Error> {
        let Operand::Unit(id) = *unit else {
            return Err(MK_INTERNAL!("endu: operand x must be a unit"));
        };
        let name = unit_name(symbols, id)?;

        self.output
            .push_str(&format!("{}:\tmov\tsp, bp\n", end_label(symbols, id)?));
        self.code("pop", &["bp"]);
        self.code("ret", &[]);
        self.output.push_str(&format!("{}\tendp\n", name));

        if self.gc && !self.call_sites.is_empty() {
            let function = symbols.function(id)?;
            let roots: Vec<GcRoot> = gc::gc_roots(symbols, symbols.current_entries());
            self.output.push_str(&gc::render_call_table(
                &name,
                function.serial,
                function.frame_size,
                &self.call_sites,
                &roots,
            ));
            self.call_tables.push(name);
        }
        self.call_sites.clear();
        Ok(())
    }

    fn call(&mut self, callee: &Operand, symbols: &SymbolTable) -> Result<(), Error> {
        let Operand::Unit(id) = *callee else {
            return Err(MK_INTERNAL!("call: operand z must be a unit"));
        };
        let function = symbols.function(id)?;
        let name = unit_name(symbols, id)?;

        // Procedures get a dummy result slot; functions had `par RET` push one.
        if matches!(function.result, Some(Type::Void)) {
            self.code("sub", &["sp", "2"]);
        }
        self.push_link(
            access::link_for(
                self.current_nesting,
                symbols.entry(id).nesting_level,
                function.is_library(),
            ),
        );
        if function.is_library() {
            let exports_call_table = library_function(&symbols.entry(id).name)
                .is_some_and(|routine| routine.exports_call_table);
            self.declare_extern(&name, exports_call_table);
        }
        self.code("call", &[&format!("near ptr {}", name)]);

        if self.gc && function.gc_hungry {
            let unit = self
                .current_unit
                .ok_or_else(|| MK_INTERNAL!("call outside of a unit"))?;
            let site = self.call_sites.len() + 1;
            let label = gc::call_site_label(&unit_name(symbols, unit)?, site);
            self.label(&label);
            self.call_sites.push(function.params_size);
        }
        self.code("add", &["sp", &(function.params_size + 4).to_string()]);
        Ok(())
    }

    fn push_link(&mut self, source: LinkSource) {
        match source {
            LinkSource::FrameBase => self.code("push", &["bp"]),
            LinkSource::Inherited => self.code("push", &["word ptr [bp+4]"]),
            LinkSource::Ancestor { hops } => {
                self.code("mov", &["si", "word ptr [bp+4]"]);
                for _ in 1..hops {
                    self.code("mov", &["si", "word ptr [si+4]"]);
                }
                self.code("push", &["word ptr [si+4]"]);
            }
        }
    }

    fn parameter(
        &mut self,
        argument: &Operand,
        passing: &Operand,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        match passing {
            Operand::Pass(Passing::Value) => match self.operand_size(argument, symbols)? {
                1 => {
                    self.load("al", argument, symbols)?;
                    self.code("sub", &["sp", "1"]);
                    self.code("mov", &["si", "sp"]);
                    self.code("mov", &["byte ptr [si]", "al"]);
                }
                2 => {
                    self.load("ax", argument, symbols)?;
                    self.code("push", &["ax"]);
                }
                size => return Err(MK_INTERNAL!("cannot pass a value of size {}", size)),
            },
            Operand::Pass(Passing::Reference) | Operand::Pass(Passing::Result) => {
                self.load_address("si", argument, symbols)?;
                self.code("push", &["si"]);
            }
            other => return Err(MK_INTERNAL!("par: {:?} is not a passing mode", other)),
        }
        Ok(())
    }

    /// Size in bytes of the value an operand denotes.
    fn operand_size(&self, operand: &Operand, symbols: &SymbolTable) -> Result<i32, Error> {
        match operand {
            Operand::Symbol(id) | Operand::Unit(id) => entry_type(symbols, *id)?.size_of(),
            Operand::Dereference(id) => entry_type(symbols, *id)?
                .element()
                .ok_or_else(|| MK_INTERNAL!("cannot dereference `{}`", symbols.entry(*id).name))?
                .size_of(),
            other => Err(MK_INTERNAL!("{:?} has no size", other)),
        }
    }

    /// Size of the elements of the array an operand denotes.
    fn element_size(&self, operand: &Operand, symbols: &SymbolTable) -> Result<i32, Error> {
        let array = match operand {
            Operand::Symbol(id) => entry_type(symbols, *id)?,
            Operand::Dereference(id) => entry_type(symbols, *id)?
                .element()
                .ok_or_else(|| MK_INTERNAL!("cannot dereference `{}`", symbols.entry(*id).name))?,
            other => return Err(MK_INTERNAL!("array: {:?} is not an array", other)),
        };
        match array {
            Type::Array(element) => element.size_of(),
            other => Err(MK_INTERNAL!("array: operand of type {} is not an array", other)),
        }
    }

    /// Emits the static-link walk an entry needs and returns its frame slot, such as `[bp-2]`.
    fn frame_slot(&mut self, entry: &SymbolEntry) -> Result<String, Error> {
        let offset = entry
            .offset()
            .ok_or_else(|| MK_INTERNAL!("`{}` has no frame slot", entry.name))?;
        let base = match access::resolve(entry.nesting_level, self.current_nesting)? {
            Access::Local => "bp",
            Access::NonLocal { hops } => {
                self.code("mov", &["si", "word ptr [bp+4]"]);
                for _ in 0..hops {
                    self.code("mov", &["si", "word ptr [si+4]"]);
                }
                "si"
            }
        };
        Ok(format!("[{}{:+}]", base, offset))
    }

    fn load(&mut self, register: &str, operand: &Operand, symbols: &SymbolTable) -> Result<(), Error> {
        match operand {
            Operand::Symbol(id) => {
                let entry = symbols.entry(*id);
                match &entry.kind {
                    EntryKind::Constant { value, .. } => {
                        let immediate = match value {
                            ConstValue::Integer(value) => value.to_string(),
                            ConstValue::Boolean(value) => (*value as u8).to_string(),
                            ConstValue::Char(value) => value.to_string(),
                            ConstValue::Nil => String::from("0"),
                            ConstValue::String(_) => return self.load_address(register, operand, symbols),
                        };
                        self.code("mov", &[register, &immediate]);
                    }
                    EntryKind::Function(_) => {
                        return Err(MK_INTERNAL!("load: `{}` is a function", entry.name));
                    }
                    _ => {
                        let size = pointer_size(entry_type(symbols, *id)?.size_of()?);
                        let slot = self.frame_slot(entry)?;
                        if by_reference(entry) {
                            self.code("mov", &["si", &format!("word ptr {}", slot)]);
                            self.code("mov", &[register, &format!("{} ptr [si]", size)]);
                        } else {
                            self.code("mov", &[register, &format!("{} ptr {}", size, slot)]);
                        }
                    }
                }
            }
            Operand::Dereference(id) => {
                let size = pointer_size(self.operand_size(operand, symbols)?);
                self.load("di", &Operand::Symbol(*id), symbols)?;
                self.code("mov", &[register, &format!("{} ptr [di]", size)]);
            }
            Operand::Address(id) => self.load_address(register, &Operand::Symbol(*id), symbols)?,
            other => return Err(MK_INTERNAL!("load: unhandled operand {:?}", other)),
        }
        Ok(())
    }

    fn load_address(
        &mut self,
        register: &str,
        operand: &Operand,
        symbols: &SymbolTable,
    ) -> Result<(), Error> {
        match operand {
            Operand::Symbol(id) => {
                let entry = symbols.entry(*id);
                match &entry.kind {
                    EntryKind::Constant {
                        value: ConstValue::String(text),
                        ..
                    } => {
                        let label = self.strings.intern(text);
                        self.code("lea", &[register, &format!("byte ptr {}", label)]);
                    }
                    EntryKind::Constant { .. } | EntryKind::Function(_) => {
                        return Err(MK_INTERNAL!("loadAddr: `{}` has no address", entry.name));
                    }
                    _ => {
                        let size = pointer_size(entry_type(symbols, *id)?.size_of()?);
                        let slot = self.frame_slot(entry)?;
                        if by_reference(entry) {
                            self.code("mov", &[register, &format!("word ptr {}", slot)]);
                        } else {
                            self.code("lea", &[register, &format!("{} ptr {}", size, slot)]);
                        }
                    }
                }
            }
            Operand::Dereference(id) => self.load(register, &Operand::Symbol(*id), symbols)?,
            other => return Err(MK_INTERNAL!("loadAddr: unhandled operand {:?}", other)),
        }
        Ok(())
    }

    fn store(&mut self, register: &str, operand: &Operand, symbols: &SymbolTable) -> Result<(), Error> {
        match operand {
            Operand::Symbol(id) => {
                let entry = symbols.entry(*id);
                if matches!(entry.kind, EntryKind::Constant { .. } | EntryKind::Function(_)) {
                    return Err(MK_INTERNAL!("store: cannot assign to `{}`", entry.name));
                }
                let size = pointer_size(entry_type(symbols, *id)?.size_of()?);
                let slot = self.frame_slot(entry)?;
                if by_reference(entry) {
                    self.code("mov", &["si", &format!("word ptr {}", slot)]);
                    self.code("mov", &[&format!("{} ptr [si]", size), register]);
                } else {
                    self.code("mov", &[&format!("{} ptr {}", size, slot), register]);
                }
            }
            Operand::Result => {
                let unit = self
                    .current_unit
                    .ok_or_else(|| MK_INTERNAL!("store: result outside of a unit"))?;
                let size = pointer_size(entry_type(symbols, unit)?.size_of()?);
                self.code("mov", &["si", "word ptr [bp+6]"]);
                self.code("mov", &[&format!("{} ptr [si]", size), register]);
            }
            Operand::Dereference(id) => {
                let size = pointer_size(self.operand_size(operand, symbols)?);
                self.load("di", &Operand::Symbol(*id), symbols)?;
                self.code("mov", &[&format!("{} ptr [di]", size), register]);
            }
            other => return Err(MK_INTERNAL!("store: unhandled operand {:?}", other)),
        }
        Ok(())
    }

    /// Wraps the lowered units in the program skeleton.
    ///
    /// `program` is the outermost unit; `main` calls it once and exits to DOS.
    pub fn finish(&self, program: EntryId, symbols: &SymbolTable) -> Result<String, Error> {
        let mut output = String::from(
            "xseg\tsegment\tpublic 'code'\n\
             \tassume\tds:xseg, ss:xseg\n\
             \torg\t100h\n\
             main\tproc\tnear\n",
        );

        if self.gc {
            output.push_str(
                ";; initialize memory: 2/3 heap and 1/3 stack\n\
                 \tmov\tcx, OFFSET DGROUP:_start_of_space\n\
                 \tmov\tword ptr _space_from, cx\n\
                 \tmov\tword ptr _next, cx\n\
                 \tmov\tax, 0FFFEh\n\
                 \tsub\tax, cx\n\
                 \txor\tdx, dx\n\
                 \tmov\tbx, 3\n\
                 \tidiv\tbx\n\
                 \tand\tax, 0FFFEh\n\
                 \tadd\tcx, ax\n\
                 \tmov\tword ptr _limit_from, cx\n\
                 \tmov\tword ptr _space_to, cx\n\
                 \tadd\tcx, ax\n\
                 \tmov\tword ptr _limit_to, cx\n\
                 ;;; register gc hungry functions\n",
            );
            for table in &self.call_tables {
                output.push_str(&format!("\tmov\tax, OFFSET {}_call_table\n", table));
                output.push_str("\tcall\tnear ptr _register_call_table\n");
            }
        }

        output.push_str(";;; calling main\n");
        output.push_str(&format!("\tcall\tnear ptr {}\n", unit_name(symbols, program)?));
        if self.gc {
            output.push_str("_ret_of_main:\n");
        }
        output.push_str("\tmov\tax, 4C00h\n\tint\t21h\nmain\tendp\n");

        output.push_str(&self.output);
        output.push_str(&self.strings.render());

        output.push_str(";;; extern library functions\n");
        for (name, exports_call_table) in &self.externs {
            output.push_str(&format!("\textrn\t{} : proc\n", name));
            if self.gc && *exports_call_table {
                output.push_str(&format!("\textrn\t{}_call_table : word\n", name));
            }
        }

        if self.gc {
            output.push_str(
                "\textrn\t_register_call_table : proc\n\
                 \tpublic\t_next\n\
                 \tpublic\t_space_from\n\
                 \tpublic\t_limit_from\n\
                 \tpublic\t_space_to\n\
                 \tpublic\t_limit_to\n\
                 \tpublic\t_ret_of_main\n\
                 _next\tdw\t?\n\
                 _space_from\tdw\t?\n\
                 _limit_from\tdw\t?\n\
                 _space_to\tdw\t?\n\
                 _limit_to\tdw\t?\n",
            );
        }
        output.push_str("\txseg\tends\n");
        if self.gc {
            output.push_str(
                "_DATA_END\tsegment\tbyte public 'stack'\n\
                 _start_of_space\tlabel\tbyte\n\
                 _DATA_END\tends\n\
                 DGROUP\tgroup\txseg, _DATA_END\n",
            );
        }
        output.push_str("\tend\tmain\n");
        Ok(output)
    }
}
