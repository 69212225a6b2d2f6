//! The automaton-driven packrat parse engine.

use std::collections::HashMap;
use std::io::{self, Write};

use bumpalo::{collections::Vec as BumpVec, Bump};
use common::{logln, logln2, Logger};

use crate::charset::CharSet;
use crate::fa::{Automaton, Edge, Mode, TagSet, Transition, TypeTag};
use crate::input::{Buffer, Input};
use crate::node::{Ast, ParseError, ParseResult, Span};

/// A compiled grammar ready to parse: the automata vector, the starting
/// automaton, the designated tags, and configuration.
///
/// A `Parser` is immutable during parsing and freely shareable across
/// threads; every [`parse`](Parser::parse) call builds its own transient
/// state (cursor bookkeeping, memo table, deepest-error tracker).
pub struct Parser<T> {
    automata: Vec<Automaton<T>>,
    start: usize,
    tags: TagSet<T>,
    eof_check: bool,
    trace: bool,
    max_depth: Option<usize>,
}

impl<T: TypeTag> Parser<T> {
    /// Create a parser over `automata`, starting at index `start`.
    ///
    /// Every automaton index and state index stored in the automata must be
    /// in range; the grammar compiler guarantees this.
    pub fn new(automata: Vec<Automaton<T>>, start: usize, tags: TagSet<T>) -> Self {
        Self { automata, start, tags, eof_check: true, trace: false, max_depth: None }
    }

    /// Require the whole input to be consumed (on by default). When
    /// disabled, a successful prefix match returns its tree even if input
    /// remains.
    pub fn set_eof_check(&mut self, eof_check: bool) {
        self.eof_check = eof_check;
    }

    /// Emit a human-readable trace of automaton entries, edge attempts and
    /// match results to stderr.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Abort parses whose automaton nesting exceeds `limit` frames, instead
    /// of overflowing the native stack; the aborted parse reports the
    /// deepest failure seen up to that point.
    pub fn set_max_depth(&mut self, limit: Option<usize>) {
        self.max_depth = limit;
    }

    pub fn automata(&self) -> &[Automaton<T>] {
        &self.automata
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Parse `input` without pre-parsed non-terminal support.
    pub fn parse<'a, I>(&'a self, arena: &'a Bump, input: &mut I) -> ParseResult<'a, T, I::Ext>
    where
        I: Input,
        I::Ext: 'a,
    {
        Machine::new(self, arena, input, None).run()
    }

    /// Parse `input`, consulting `pre_parsed_at` for pre-parsed
    /// non-terminal transitions.
    ///
    /// `pre_parsed_at(name, input)` returns `Some(n)` when the named
    /// non-terminal occupies `n` characters at the input's current
    /// position, and `None` otherwise. The callback sees the input through
    /// a shared reference and therefore cannot move its cursor. On a match
    /// the engine captures the extended data, then jumps the cursor past
    /// the span; line and column are not advanced across the opaque span,
    /// so later positions report the line and column the span started on.
    pub fn parse_with<'a, I, F>(
        &'a self,
        arena: &'a Bump,
        input: &mut I,
        mut pre_parsed_at: F,
    ) -> ParseResult<'a, T, I::Ext>
    where
        I: Input,
        I::Ext: 'a,
        F: FnMut(&str, &I) -> Option<usize>,
    {
        Machine::new(self, arena, input, Some(&mut pre_parsed_at)).run()
    }

    /// Parse a string through a fresh [`Buffer`].
    pub fn parse_text<'a>(&'a self, arena: &'a Bump, text: &str) -> ParseResult<'a, T, ()> {
        self.parse(arena, &mut Buffer::new(text))
    }

    /// Write a human-readable listing of the automata vector.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{:=^60}", " AUTOMATA ")?;
        for (i, fa) in self.automata.iter().enumerate() {
            let start_mark = if i == self.start { " (start)" } else { "" };
            writeln!(out, "[{:3}] {} mode={:?}{}", i, fa.tag.name(), fa.mode, start_mark)?;
            for (j, state) in fa.states.iter().enumerate() {
                let accepts = if state.accepts { " accept" } else { "" };
                writeln!(out, "  state {}{}", j, accepts)?;
                for edge in &state.edges {
                    let voided = if edge.voided { " voided" } else { "" };
                    let step = match &edge.transition {
                        Transition::Char(set) => format!("char {:?}", set),
                        Transition::Wildcard => "any".to_string(),
                        Transition::Automaton(index) => {
                            format!("call {} ({})", index, self.automata[*index].tag.name())
                        }
                        Transition::PreParsed(name) => format!("<{}>", name),
                    };
                    writeln!(out, "    {} -> state {}{}", step, edge.target, voided)?;
                }
            }
        }
        Ok(())
    }
}

/// Saved cursor state for backtracking.
struct Mark<X> {
    pos: usize,
    ext: X,
    line: u32,
    col: u32,
    last_cr: bool,
}

/// Memoized outcome of one automaton at one start position. `result` is
/// `None` for a remembered failure; the remaining fields restore the
/// cursor state observed when the memoized match returned.
struct CacheEntry<'a, T, X> {
    result: Option<&'a Ast<'a, T, X>>,
    pos: usize,
    ext: X,
    line: u32,
    col: u32,
    last_cr: bool,
}

/// Deepest failure seen so far.
struct Furthest {
    pos: usize,
    line: u32,
    col: u32,
    nt: String,
}

type Children<'a, T, X> = BumpVec<'a, &'a Ast<'a, T, X>>;

/// Transient per-parse state; one machine per `parse` call.
struct Machine<'a, 'i, T: TypeTag, I: Input> {
    parser: &'a Parser<T>,
    arena: &'a Bump,
    input: &'i mut I,
    pre_parsed_at: Option<&'i mut dyn FnMut(&str, &I) -> Option<usize>>,
    cache: HashMap<(usize, usize), CacheEntry<'a, T, I::Ext>>,
    /// Indices of in-progress automata, innermost last. Consulted only to
    /// name the current non-terminal in error reports.
    fa_stack: Vec<usize>,
    line: u32,
    col: u32,
    last_cr: bool,
    furthest: Furthest,
    depth_exceeded: bool,
    log: Logger,
    depth: usize,
}

impl<'a, 'i, T: TypeTag, I: Input> Machine<'a, 'i, T, I> {
    fn new(
        parser: &'a Parser<T>,
        arena: &'a Bump,
        input: &'i mut I,
        pre_parsed_at: Option<&'i mut dyn FnMut(&str, &I) -> Option<usize>>,
    ) -> Self {
        let start_nt = parser.automata[parser.start].tag.name().to_string();
        Self {
            parser,
            arena,
            input,
            pre_parsed_at,
            cache: HashMap::new(),
            fa_stack: Vec::new(),
            line: 1,
            col: 0,
            last_cr: false,
            furthest: Furthest { pos: 0, line: 1, col: 0, nt: start_nt },
            depth_exceeded: false,
            log: Logger::new("engine"),
            depth: 0,
        }
    }

    fn run(mut self) -> ParseResult<'a, T, I::Ext> {
        let ast = self.match_automaton(self.parser.start);
        if self.depth_exceeded {
            return Err(self.parse_error());
        }
        match ast {
            None => Err(self.parse_error()),
            Some(ast) => {
                if self.parser.eof_check && self.input.peek().is_some() {
                    Err(self.parse_error())
                } else {
                    Ok(ast)
                }
            }
        }
    }

    fn parse_error(&self) -> ParseError {
        ParseError {
            pos: self.furthest.pos,
            line: self.furthest.line,
            col: self.furthest.col,
            non_terminal: self.furthest.nt.clone(),
        }
    }

    // --- cursor bookkeeping -------------------------------------------------

    fn mark(&self) -> Mark<I::Ext> {
        Mark {
            pos: self.input.position(),
            ext: self.input.extended(),
            line: self.line,
            col: self.col,
            last_cr: self.last_cr,
        }
    }

    fn rewind(&mut self, mark: &Mark<I::Ext>) {
        self.input.set_position(mark.pos);
        self.input.set_extended(mark.ext.clone());
        self.line = mark.line;
        self.col = mark.col;
        self.last_cr = mark.last_cr;
    }

    /// One line per CR, CRLF, or LF.
    fn update_line_col(&mut self, ch: char) {
        if ch == '\r' {
            self.line += 1;
            self.col = 0;
            self.last_cr = true;
        } else {
            if ch == '\n' {
                if !self.last_cr {
                    self.line += 1;
                    self.col = 0;
                }
            } else {
                self.col += 1;
            }
            self.last_cr = false;
        }
    }

    // --- error tracking -----------------------------------------------------

    /// Record the current position as the deepest failure if it is strictly
    /// past the recorded one.
    fn update_error(&mut self) {
        let pos = self.input.position();
        if self.furthest.pos < pos {
            let nt = self.current_nt().to_string();
            self.furthest = Furthest { pos, line: self.line, col: self.col, nt };
        }
    }

    /// Name of the innermost in-progress automaton; the start automaton
    /// stands in when none is.
    fn current_nt(&self) -> &str {
        let index = self.fa_stack.last().copied().unwrap_or(self.parser.start);
        self.parser.automata[index].tag.name()
    }

    // --- matching -----------------------------------------------------------

    fn match_automaton(&mut self, index: usize) -> Option<&'a Ast<'a, T, I::Ext>> {
        let start = self.mark();
        let key = (index, start.pos);

        if let Some(hit) = self.cache.get(&key) {
            let result = hit.result;
            let entry_state = Mark {
                pos: hit.pos,
                ext: hit.ext.clone(),
                line: hit.line,
                col: hit.col,
                last_cr: hit.last_cr,
            };
            self.rewind(&entry_state);
            return result;
        }

        let parser = self.parser;
        let automaton = &parser.automata[index];
        let tag = automaton.tag;

        if let Some(limit) = parser.max_depth {
            if self.fa_stack.len() >= limit {
                self.depth_exceeded = true;
                return None;
            }
        }

        self.trace_enter(tag.name(), start.pos);
        logln!(self.log, "try {} at pos {} ({}:{})", tag.name(), start.pos, self.line, self.col);

        self.fa_stack.push(index);
        let res = self.match_state(automaton, 0);
        self.fa_stack.pop();

        let value = if tag == parser.tags.positive {
            self.rewind(&start);
            res.map(|_| self.empty(parser.tags.empty))
        } else if tag == parser.tags.negative {
            self.rewind(&start);
            match res {
                None => Some(self.empty(parser.tags.empty)),
                Some(_) => {
                    self.update_error();
                    None
                }
            }
        } else {
            match res {
                None => {
                    self.update_error();
                    None
                }
                Some(children) => Some(match automaton.mode {
                    Mode::Void => self.empty(tag),
                    Mode::Prune => match children.len() {
                        0 => self.empty(tag),
                        1 => children[0],
                        _ => self.branch(tag, children, start.pos),
                    },
                    Mode::Normal => self.branch(tag, children, start.pos),
                }),
            }
        };

        self.cache.insert(
            key,
            CacheEntry {
                result: value,
                pos: self.input.position(),
                ext: self.input.extended(),
                line: self.line,
                col: self.col,
                last_cr: self.last_cr,
            },
        );

        if value.is_some() {
            logln!(self.log, "{} matched: pos {} -> {}", tag.name(), start.pos, self.input.position());
        } else {
            logln!(self.log, "{} failed at pos {}", tag.name(), start.pos);
        }
        self.trace_leave(tag.name(), start.pos, value.is_some());
        value
    }

    fn match_state(&mut self, fa: &'a Automaton<T>, index: usize) -> Option<Children<'a, T, I::Ext>> {
        let state = &fa.states[index];
        match self.match_edges(fa, &state.edges) {
            Some(children) => Some(children),
            None if state.accepts => Some(BumpVec::new_in(self.arena)),
            None => None,
        }
    }

    /// Ordered choice: the first edge whose whole chain matches wins.
    fn match_edges(&mut self, fa: &'a Automaton<T>, edges: &'a [Edge]) -> Option<Children<'a, T, I::Ext>> {
        for (i, edge) in edges.iter().enumerate() {
            self.trace_edge(fa, i, edges.len());
            logln2!(self.log, "edge {}/{} of {}", i + 1, edges.len(), fa.tag.name());
            if let Some(children) = self.match_edge(fa, edge) {
                return Some(children);
            }
        }
        None
    }

    fn match_edge(&mut self, fa: &'a Automaton<T>, edge: &'a Edge) -> Option<Children<'a, T, I::Ext>> {
        let start = self.mark();
        let head = self.match_transition(&edge.transition)?;
        match self.match_state(fa, edge.target) {
            None => {
                self.rewind(&start);
                None
            }
            Some(mut tail) => {
                if edge.voided || head.is_empty_node() {
                    Some(tail)
                } else {
                    // Prepending keeps children in source order: each edge in
                    // the chain puts its head in front of whatever the target
                    // state collected. Memoizing these lists per state would
                    // let a later hit observe the mutation; results are only
                    // cached per automaton, after wrapping.
                    tail.insert(0, head);
                    Some(tail)
                }
            }
        }
    }

    /// Single dispatch over the transition variants.
    fn match_transition(&mut self, transition: &'a Transition) -> Option<&'a Ast<'a, T, I::Ext>> {
        match transition {
            Transition::Char(set) => self.match_char(set),
            Transition::Wildcard => self.match_wildcard(),
            Transition::Automaton(index) => self.match_automaton(*index),
            Transition::PreParsed(name) => self.match_pre_parsed(name),
        }
    }

    fn match_char(&mut self, set: &CharSet) -> Option<&'a Ast<'a, T, I::Ext>> {
        match self.input.peek() {
            Some(c) if set.matches(c) => {
                self.input.consume();
                self.update_line_col(c);
                self.trace_char(c);
                Some(self.char_node(c))
            }
            _ => {
                self.update_error();
                None
            }
        }
    }

    fn match_wildcard(&mut self) -> Option<&'a Ast<'a, T, I::Ext>> {
        match self.input.peek() {
            Some(c) => {
                self.input.consume();
                self.update_line_col(c);
                self.trace_char(c);
                Some(self.char_node(c))
            }
            None => {
                self.update_error();
                None
            }
        }
    }

    fn match_pre_parsed(&mut self, name: &'a str) -> Option<&'a Ast<'a, T, I::Ext>> {
        let start = self.input.position();
        let skip = match self.pre_parsed_at.as_mut() {
            Some(host) => host(name, &*self.input),
            None => None,
        };
        match skip {
            Some(len) => {
                // Capture the payload before the jump; inputs that bind it
                // to the position reset it in set_position.
                let ext = self.input.extended();
                let end = start + len;
                self.input.set_position(end);
                self.trace_pre_parsed(name, true);
                Some(self.arena.alloc(Ast::PreParsed {
                    tag: self.parser.tags.pre_parsed,
                    name,
                    span: Span::new(start, end),
                    ext,
                }))
            }
            None => {
                self.trace_pre_parsed(name, false);
                self.update_error();
                None
            }
        }
    }

    // --- node construction --------------------------------------------------

    fn empty(&self, tag: T) -> &'a Ast<'a, T, I::Ext> {
        self.arena.alloc(Ast::Empty { tag })
    }

    fn char_node(&self, ch: char) -> &'a Ast<'a, T, I::Ext> {
        self.arena.alloc(Ast::Char { ch, tag: self.parser.tags.character, end: self.input.position() })
    }

    fn branch(&self, tag: T, children: Children<'a, T, I::Ext>, start: usize) -> &'a Ast<'a, T, I::Ext> {
        let span = Span::new(start, self.input.position());
        self.arena.alloc(Ast::Branch { tag, children: children.into_bump_slice(), span })
    }

    // --- tracing ------------------------------------------------------------

    fn trace_enter(&mut self, name: &str, pos: usize) {
        if self.parser.trace {
            eprintln!("{}[{}/{}] try {} at pos {}", "  ".repeat(self.depth), self.line, self.col, name, pos);
            self.depth += 1;
        }
    }

    fn trace_leave(&mut self, name: &str, pos: usize, matched: bool) {
        if self.parser.trace {
            self.depth = self.depth.saturating_sub(1);
            let outcome = if matched { "match" } else { "fail" };
            eprintln!(
                "{}[{}/{}] {} {}: pos {} to {}",
                "  ".repeat(self.depth),
                self.line,
                self.col,
                name,
                outcome,
                pos,
                self.input.position()
            );
        }
    }

    fn trace_edge(&self, fa: &Automaton<T>, index: usize, total: usize) {
        if self.parser.trace {
            eprintln!(
                "{}[{}/{}] edge {} of {} for {}",
                "  ".repeat(self.depth),
                self.line,
                self.col,
                index + 1,
                total,
                fa.tag.name()
            );
        }
    }

    fn trace_char(&self, c: char) {
        if self.parser.trace {
            let display = match c {
                '\n' => "\\n".to_string(),
                '\r' => "\\r".to_string(),
                '\t' => "\\t".to_string(),
                _ => c.to_string(),
            };
            eprintln!("{}[{}/{}] char '{}'", "  ".repeat(self.depth), self.line, self.col, display);
        }
    }

    fn trace_pre_parsed(&self, name: &str, matched: bool) {
        if self.parser.trace {
            let outcome = if matched { "match" } else { "no match" };
            eprintln!("{}[{}/{}] <{}> {}", "  ".repeat(self.depth), self.line, self.col, name, outcome);
        }
    }
}
