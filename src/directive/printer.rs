//! Serialize a directive tree back to config text.

use super::Directive;

const INDENT: &str = "    ";

/// Render directives with four-space indentation, one directive per line.
pub fn print(directives: &[Directive]) -> String {
    let mut out = String::new();
    write_block(&mut out, directives, 0);
    out
}

fn write_block(out: &mut String, directives: &[Directive], depth: usize) {
    for d in directives {
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push_str(&d.name);
        for p in &d.params {
            out.push(' ');
            out.push_str(&quote(p));
        }
        match &d.block {
            None => out.push_str(";\n"),
            Some(children) if children.is_empty() => out.push_str(" {}\n"),
            Some(children) => {
                out.push_str(" {\n");
                write_block(out, children, depth + 1);
                for _ in 0..depth {
                    out.push_str(INDENT);
                }
                out.push_str("}\n");
            }
        }
    }
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#' | '"' | '\''))
}

fn quote(value: &str) -> String {
    if !needs_quotes(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(print(std::slice::from_ref(self)).trim_end())
    }
}
