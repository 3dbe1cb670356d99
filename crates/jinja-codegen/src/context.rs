//! Lowering context.

use js_ast::Loc;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use source_map::Span;

/// State threaded through lowering: the stack of runtime context identifiers
/// and the counter behind every generated name.
#[derive(Debug)]
pub struct LowerContext {
    /// The source name attached to emitted locations.
    source_name: Option<SmolStr>,
    /// Runtime context identifiers, innermost last.
    frames: Vec<SmolStr>,
    /// Counter for generating unique identifiers.
    counter: u32,
    /// Every identifier handed out, to keep the generated names auditable.
    issued: FxHashSet<SmolStr>,
}

impl LowerContext {
    /// Create a new lowering context.
    pub fn new(source_name: Option<&str>) -> Self {
        Self {
            source_name: source_name.map(SmolStr::from),
            frames: Vec::new(),
            counter: 0,
            issued: FxHashSet::default(),
        }
    }

    /// Hand out the next index for generated identifiers.
    pub fn next_index(&mut self) -> u32 {
        let index = self.counter;
        self.counter += 1;
        index
    }

    /// Generate a fresh identifier with the given prefix.
    pub fn unique(&mut self, prefix: &str) -> SmolStr {
        let name = SmolStr::from(format!("{}_{}", prefix, self.next_index()));
        self.issued.insert(name.clone());
        name
    }

    /// Generate a fresh runtime-context identifier.
    pub fn fresh_frame(&mut self) -> SmolStr {
        self.unique("__j_ctx")
    }

    /// Generate the iterator, counter, and item identifiers for one loop.
    /// The three share an index.
    pub fn loop_names(&mut self) -> (SmolStr, SmolStr, SmolStr) {
        let index = self.next_index();
        let names = (
            SmolStr::from(format!("__j_loop_{}", index)),
            SmolStr::from(format!("__j_count_{}", index)),
            SmolStr::from(format!("__j_item_{}", index)),
        );
        self.issued.insert(names.0.clone());
        self.issued.insert(names.1.clone());
        self.issued.insert(names.2.clone());
        names
    }

    /// Check whether an identifier was generated by this lowering.
    pub fn is_generated(&self, name: &str) -> bool {
        self.issued.contains(name)
    }

    /// The innermost runtime context identifier.
    ///
    /// Lowering always binds a frame (the `generate` or macro parameter)
    /// before touching variables, so an empty stack means the placeholder
    /// context name.
    pub fn current_frame(&self) -> SmolStr {
        self.frames
            .last()
            .cloned()
            .unwrap_or_else(|| SmolStr::new_static("__j_ctx_0"))
    }

    /// Push a runtime context frame.
    pub fn push_frame(&mut self, name: SmolStr) {
        self.frames.push(name);
    }

    /// Pop the innermost frame.
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Swap the whole frame stack, for bodies with a fresh lexical root
    /// (macros). Returns the previous stack.
    pub fn replace_frames(&mut self, frames: Vec<SmolStr>) -> Vec<SmolStr> {
        std::mem::replace(&mut self.frames, frames)
    }

    /// A location for an emitted node.
    pub fn loc(&self, span: Span) -> Loc {
        Loc {
            source: self.source_name.clone(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let mut ctx = LowerContext::new(None);
        assert_eq!(ctx.fresh_frame(), "__j_ctx_0");
        assert_eq!(ctx.unique("__j_loop"), "__j_loop_1");
        assert_eq!(ctx.fresh_frame(), "__j_ctx_2");
        assert!(ctx.is_generated("__j_loop_1"));
        assert!(!ctx.is_generated("__j_loop_7"));
    }

    #[test]
    fn test_frame_stack() {
        let mut ctx = LowerContext::new(None);
        let outer = ctx.fresh_frame();
        ctx.push_frame(outer.clone());
        let inner = ctx.fresh_frame();
        ctx.push_frame(inner.clone());
        assert_eq!(ctx.current_frame(), inner);
        ctx.pop_frame();
        assert_eq!(ctx.current_frame(), outer);
    }
}
