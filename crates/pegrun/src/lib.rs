//! Packrat parsing engine over compiled PEG automata.
//!
//! The engine consumes a grammar compiled to a vector of finite automata
//! (one per non-terminal) and matches a positionable character input,
//! producing either an arena-allocated parse tree or a [`ParseError`]
//! locating the deepest failure.
//!
//! # Overview
//!
//! - Ordered choice with backtracking: a state's edges are tried in order
//!   and the first full match wins.
//! - Packrat memoization keyed by (automaton, start position) keeps the
//!   match linear in the input for non-pathological grammars; failures are
//!   memoized too.
//! - Positive (`&e`) and negative (`!e`) predicates match without
//!   consuming input; they are automata carrying the designated predicate
//!   tags.
//! - Pre-parsed non-terminals let a host recognize opaque spans (for
//!   example markup the host already parsed) that the engine wraps into
//!   the tree without inspecting.
//!
//! Left-recursive grammars are unsupported: a direct-left-recursive rule
//! re-enters itself at the same position before anything is memoized and
//! recurses until the native stack gives out or the configured depth limit
//! trips. Grammar compilers must emit right-recursive or iterative rules.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use pegrun::{ast_to_string, Automaton, CharSet, Edge, Mode, Parser, State, TagSet,
//!              Transition, TypeTag};
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Debug)]
//! enum Ty { S, Empty, Char, Pre, Pos, Neg }
//!
//! impl TypeTag for Ty {
//!     fn name(&self) -> &str {
//!         match self {
//!             Ty::S => "S", Ty::Empty => "Empty", Ty::Char => "Char",
//!             Ty::Pre => "Pre", Ty::Pos => "Pos", Ty::Neg => "Neg",
//!         }
//!     }
//! }
//!
//! // S <- 'a' 'b'
//! let automata = vec![Automaton::new(Ty::S, Mode::Normal, vec![
//!     State::new(vec![Edge::new(Transition::Char(CharSet::of(&['a'])), 1)], false),
//!     State::new(vec![Edge::new(Transition::Char(CharSet::of(&['b'])), 2)], false),
//!     State::accepting(),
//! ])];
//! let tags = TagSet {
//!     empty: Ty::Empty, character: Ty::Char, pre_parsed: Ty::Pre,
//!     positive: Ty::Pos, negative: Ty::Neg,
//! };
//! let parser = Parser::new(automata, 0, tags);
//!
//! let arena = Bump::new();
//! let ast = parser.parse_text(&arena, "ab").unwrap();
//! assert_eq!(ast_to_string(ast), "(S 'a' 'b')");
//! ```

mod charset;
mod engine;
mod fa;
pub mod format;
mod input;
mod node;

pub use charset::CharSet;
pub use engine::Parser;
pub use fa::{Automaton, Edge, Mode, State, TagSet, Transition, TypeTag};
pub use format::{ast_to_string, collect_text, format_node};
pub use input::{Buffer, Input};
pub use node::{Ast, ParseError, ParseResult, Span};
