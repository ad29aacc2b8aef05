//! Garbage collector call tables.
//!
//! A runtime collector walks the stack from every call site of an allocating
//! routine. Each function with such call sites publishes a chain of records:
//!
//! ```text
//! @call_S_i   dw  @f_S_call_i          return address of call site i
//!             dw  @call_S_(i+1) | 0    next record
//!             dw  args+4+0+locals+4    bytes of frame to scan
//!             dw  offset               one word per live list slot
//!             dw  0
//! ```

use crate::symbol::{
    entry::{EntryId, EntryKind},
    symbol::SymbolTable,
};

/// A slot of the frame that may hold a pointer into the collected heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcRoot {
    pub offset: i32,
    pub name: String,
}

/// List-typed locals, temporaries and parameters among `entries`.
pub fn gc_roots(symbols: &SymbolTable, entries: &[EntryId]) -> Vec<GcRoot> {
    entries
        .iter()
        .map(|id| symbols.entry(*id))
        .filter(|entry| {
            matches!(
                entry.kind,
                EntryKind::Variable { .. } | EntryKind::Temporary { .. } | EntryKind::Parameter { .. }
            )
        })
        .filter(|entry| entry.ty().is_some_and(|ty| ty.is_heap_reference()))
        .filter_map(|entry| {
            entry.offset().map(|offset| GcRoot {
                offset,
                name: entry.name.clone(),
            })
        })
        .collect()
}

/// Label of the return point of call site `site` (counted from 1) inside `unit`.
pub fn call_site_label(unit: &str, site: usize) -> String {
    format!("@{}_call_{}", unit.trim_start_matches('_'), site)
}

/// Renders the call table of `unit`, one record per entry of `call_sites`
/// (the argument bytes each call pushed).
pub fn render_call_table(
    unit: &str,
    serial: i32,
    frame_size: i32,
    call_sites: &[i32],
    roots: &[GcRoot],
) -> String {
    let mut output = format!("{}_call_table:\n", unit);
    for (index, params_size) in call_sites.iter().enumerate() {
        let site = index + 1;
        output.push_str(&format!(
            "@call_{}_{}\tdw\t{}\n",
            serial,
            site,
            call_site_label(unit, site)
        ));
        if site < call_sites.len() {
            output.push_str(&format!("\tdw\t@call_{}_{}\n", serial, site + 1));
        } else {
            output.push_str("\tdw\t0\n");
        }
        output.push_str(&format!(
            "\tdw\t{}+{}+{}+{}\n",
            params_size + 4,
            0,
            frame_size,
            4
        ));
        for root in roots {
            output.push_str(&format!("\tdw\t{}\t;{}\n", root.offset, root.name));
        }
        output.push_str("\tdw\t0\n");
    }
    output
}
