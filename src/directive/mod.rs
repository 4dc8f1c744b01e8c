//! Block-structured config grammar (nginx flavour).
//!
//! # Data Flow
//! ```text
//! config file bytes
//!     → parser.rs (tokenize, build tree)
//!     → Vec<Directive> (tagged tree, recursive)
//!     → inspect / generate
//!     → printer.rs (tree back to text)
//! ```
//!
//! # Design Decisions
//! - One node type for every directive: name, parameters, optional block
//! - Quotes are removed on parse and re-added on print only when needed
//! - Traversal helpers live here so callers never walk the tree by hand

pub mod parser;
pub mod printer;

pub use parser::{parse, ParseError};
pub use printer::print;

/// A single directive: `name param ...;` or `name param ... { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub params: Vec<String>,
    pub block: Option<Vec<Directive>>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            block: None,
        }
    }

    /// Simple directive with parameters.
    pub fn simple<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            block: None,
        }
    }

    /// Block directive with parameters and children.
    pub fn block<I, S>(name: impl Into<String>, params: I, children: Vec<Directive>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            block: Some(children),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn first_param(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }

    pub fn has_param(&self, value: &str) -> bool {
        self.params.iter().any(|p| p == value)
    }

    /// Children of the block, empty for simple directives.
    pub fn children(&self) -> &[Directive] {
        self.block.as_deref().unwrap_or(&[])
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Directive> {
        self.children().iter().find(|d| d.is(name))
    }
}

/// `server` blocks in document order: top-level ones and those nested
/// directly under a top-level `http` block.
pub fn server_blocks(directives: &[Directive]) -> impl Iterator<Item = &Directive> {
    directives.iter().flat_map(|d| {
        let nested: Box<dyn Iterator<Item = &Directive>> = if d.is("server") {
            Box::new(std::iter::once(d))
        } else if d.is("http") {
            Box::new(d.children().iter().filter(|c| c.is("server")))
        } else {
            Box::new(std::iter::empty())
        };
        nested
    })
}

/// Depth-first pre-order search for the first directive matching `pred`.
pub fn find_depth_first<'a, F>(directives: &'a [Directive], pred: &F) -> Option<&'a Directive>
where
    F: Fn(&Directive) -> bool,
{
    for d in directives {
        if pred(d) {
            return Some(d);
        }
        if let Some(found) = find_depth_first(d.children(), pred) {
            return Some(found);
        }
    }
    None
}
