use std::rc::Rc;

/// Settings of one compilation.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Run the peephole optimizer on every unit before lowering it.
    pub optimize: bool,
    /// Publish call tables for the garbage collector.
    pub gc: bool,
    /// Source file name used in diagnostics.
    pub file: Rc<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            optimize: false,
            gc: true,
            file: Rc::new(String::from("<stdin>")),
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_gc(mut self, gc: bool) -> Self {
        self.gc = gc;
        self
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = Rc::new(file.to_string());
        self
    }
}
