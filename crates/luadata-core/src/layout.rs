//! Layout engine: re-indents flat literal text by brace depth.
//!
//! Input is the [`encoder`](crate::encoder) output, one entry per line with
//! nested tables inline. Output breaks the text after every `{` and `,` and
//! before every `}`, indenting each line with one tab per nesting level:
//!
//! ```text
//! a=1,b={c=2,},
//! ```
//!
//! becomes (at the initial depth of 1)
//!
//! ```text
//! 	a=1,
//! 	b={
//! 		c=2,
//! 	},
//! ```
//!
//! Lines left holding only indentation are then removed, and the trailing
//! line break with its indentation is trimmed.
//!
//! The scan is purely structural: it does not track string literals, so a
//! `{`, `}` or `,` inside a quoted string is treated like any other. Data
//! strings holding those characters are not laid out faithfully.

use regex::Regex;
use std::sync::LazyLock;

use crate::encoder::EOL;

/// Indentation unit, repeated once per nesting level.
pub const INDENT: char = '\t';

/// Nesting depth of the first line: the body sits inside the entry's braces.
pub const INITIAL_DEPTH: usize = 1;

/// Whitespace-only lines, and the trailing run of line breaks plus whitespace.
static CLEANUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*$[\r\n]*|[\r\n]+\s+\z").expect("cleanup pattern is valid")
});

/// Indent `flat` starting at [`INITIAL_DEPTH`].
pub fn layout(flat: &str) -> String {
    layout_from(flat, INITIAL_DEPTH)
}

/// Indent `flat` starting at `depth`. Unbalanced closing braces clamp the
/// depth at zero.
pub fn layout_from(flat: &str, depth: usize) -> String {
    let mut out = String::with_capacity(flat.len() * 2);
    let mut depth = depth;
    // The output ends with a fresh line break plus indentation.
    let mut at_line_start = false;

    for line in flat.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !at_line_start {
            indent(&mut out, depth);
        }

        for c in line.chars() {
            at_line_start = false;
            match c {
                '{' => {
                    out.push(c);
                    depth += 1;
                    newline(&mut out, depth);
                    at_line_start = true;
                }
                '}' => {
                    out.push_str(EOL);
                    depth = depth.saturating_sub(1);
                    indent(&mut out, depth);
                    out.push(c);
                }
                ',' => {
                    out.push(c);
                    newline(&mut out, depth);
                    at_line_start = true;
                }
                _ => out.push(c),
            }
        }
    }

    CLEANUP.replace_all(&out, "").into_owned()
}

fn indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat_n(INDENT, depth));
}

fn newline(out: &mut String, depth: usize) {
    out.push_str(EOL);
    indent(out, depth);
}
