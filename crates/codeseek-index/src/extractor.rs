//! Python function/class extraction via tree-sitter.

use std::ops::Range;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{IndexError, Result};
use crate::tree::Preorder;
use crate::unit::{CodeUnit, UnitKind};

/// Parse `source` and return every function, async function, and class
/// definition in it, nested ones included, in pre-order.
///
/// # Errors
///
/// Returns [`IndexError::Syntax`] if the source does not parse cleanly, or
/// [`IndexError::Parse`] if the parser cannot be set up.
pub fn extract_units(source: &str, filepath: &str) -> Result<Vec<CodeUnit>> {
    let tree = parse(source)?;

    let units = Preorder::new(tree.root_node())
        .filter_map(|node| {
            let kind = classify(node)?;
            let name = node
                .child_by_field_name("name")
                .map(|n| source[n.byte_range()].to_string())?;
            let outer = with_decorators(node);
            Some(CodeUnit {
                text: render(source, outer),
                name,
                filepath: filepath.to_string(),
                kind,
                line_range: (outer.start_position().row + 1, last_line(node)),
            })
        })
        .collect();

    Ok(units)
}

fn parse(source: &str) -> Result<Tree> {
    let grammar: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| IndexError::Parse(format!("set_language failed: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| IndexError::Parse("parser returned no tree".into()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(syntax_error(root));
    }
    check_python3(root, source)?;
    Ok(tree)
}

fn syntax_at(node: Node<'_>, message: impl Into<String>) -> IndexError {
    let pos = node.start_position();
    IndexError::Syntax {
        line: pos.row + 1,
        column: pos.column + 1,
        message: message.into(),
    }
}

fn syntax_error(root: Node<'_>) -> IndexError {
    let Some(bad) = Preorder::new(root).find(|n| n.is_error() || n.is_missing()) else {
        return IndexError::Syntax {
            line: 1,
            column: 1,
            message: "invalid syntax".into(),
        };
    };
    if bad.is_missing() {
        syntax_at(bad, format!("missing {}", bad.kind()))
    } else {
        syntax_at(bad, "invalid syntax")
    }
}

/// The grammar also accepts Python 2 statements and backtick repr, and lets
/// misaligned statements through without an error node.
fn check_python3(root: Node<'_>, source: &str) -> Result<()> {
    for node in Preorder::new(root) {
        match node.kind() {
            "print_statement" => {
                return Err(syntax_at(node, "missing parentheses in call to 'print'"));
            }
            "exec_statement" => {
                return Err(syntax_at(node, "missing parentheses in call to 'exec'"));
            }
            "string_start" if source[node.byte_range()].ends_with('`') => {
                return Err(syntax_at(node, "invalid syntax"));
            }
            "module" | "block" => check_alignment(node, source)?,
            _ => {}
        }
    }
    Ok(())
}

/// Statements that begin a line must share their body's indentation:
/// column 0 in a module, the first statement's column in a block.
fn check_alignment(body: Node<'_>, source: &str) -> Result<()> {
    let mut cursor = body.walk();
    let statements: Vec<Node<'_>> = body
        .named_children(&mut cursor)
        .filter(|n| !n.is_extra())
        .collect();
    let Some(first) = statements.first() else {
        return Ok(());
    };

    let bom = if source.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };
    let expected = |row: usize| match body.kind() {
        "module" if row == 0 => bom,
        "module" => 0,
        _ => first.start_position().column,
    };

    let mut prev_row: Option<usize> = None;
    for stmt in &statements {
        let start = stmt.start_position();
        let leads_line = prev_row.is_none_or(|row| start.row > row);
        let previous = prev_row;
        prev_row = Some(last_row(*stmt));
        if !leads_line || start.column == expected(start.row) {
            continue;
        }
        // Shallower than the line before it means a dedent to no known level.
        let dedented = previous.is_some_and(|row| start.column < line_indent(source, row));
        let message = if dedented {
            "unindent does not match any outer indentation level"
        } else {
            "unexpected indent"
        };
        return Err(syntax_at(*stmt, message));
    }
    Ok(())
}

fn line_indent(source: &str, row: usize) -> usize {
    source.split('\n').nth(row).map_or(0, |line| {
        line.bytes()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\x0c'))
            .count()
    })
}

fn classify(node: Node<'_>) -> Option<UnitKind> {
    match node.kind() {
        "function_definition" if is_async(node) => Some(UnitKind::AsyncFunction),
        "function_definition" => Some(UnitKind::Function),
        "class_definition" => Some(UnitKind::Class),
        _ => None,
    }
}

fn is_async(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .next()
        .is_some_and(|first| first.kind() == "async")
}

/// 0-based last row, not counting a trailing newline the node may own.
fn last_row(node: Node<'_>) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}

fn last_line(node: Node<'_>) -> usize {
    last_row(node) + 1
}

/// Decorated definitions render with their decorators.
fn with_decorators(node: Node<'_>) -> Node<'_> {
    node.parent()
        .filter(|p| p.kind() == "decorated_definition")
        .unwrap_or(node)
}

/// Render a definition as standalone source: LF line endings, no trailing
/// whitespace, dedented by the definition's start column. Lines that begin
/// inside a string literal are kept verbatim.
fn render(source: &str, node: Node<'_>) -> String {
    let strings: Vec<Range<usize>> = Preorder::new(node)
        .filter(|n| n.kind() == "string")
        .map(|n| n.byte_range())
        .collect();
    let inside_string =
        |offset: usize| strings.iter().any(|r| r.start < offset && offset < r.end);

    let indent = node.start_position().column;
    let start = node.start_byte();
    let text = &source[node.byte_range()];

    let mut lines: Vec<&str> = Vec::new();
    let mut offset = start;
    for (i, raw) in text.split('\n').enumerate() {
        let line_start = offset;
        offset += raw.len() + 1;

        if i > 0 && inside_string(line_start) {
            lines.push(raw.strip_suffix('\r').unwrap_or(raw));
            continue;
        }

        let line = if i == 0 { raw } else { dedent(raw, indent) };
        lines.push(line.trim_end());
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Strip at most `width` bytes of leading spaces/tabs.
fn dedent(line: &str, width: usize) -> &str {
    let ws = line
        .bytes()
        .take(width)
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count();
    &line[ws..]
}
