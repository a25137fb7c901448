use tree_sitter::{Node, Parser, Tree};

use crate::error::TestgraftError;

pub mod index;
pub mod signature;


use signature::Signature;

pub(crate) fn parse_module(source: &str, origin: &'static str) -> Result<Tree, TestgraftError> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|error| TestgraftError::LanguageSetup {
            message: error.to_string(),
        })?;

    let tree = parser
        .parse(source, None)
        .ok_or(TestgraftError::InvalidSyntax { origin })?;
    if tree.root_node().has_error() {
        return Err(TestgraftError::InvalidSyntax { origin });
    }
    Ok(tree)
}

pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Whitespace-insensitive structural form of a statement: its leaf tokens
/// joined by single spaces, with comments dropped. Two imports that differ
/// only in formatting normalize to the same string.
pub(crate) fn normalized_tokens(node: Node<'_>, source: &str) -> String {
    let mut tokens = Vec::new();
    collect_leaf_tokens(node, source, &mut tokens);
    tokens.join(" ")
}

fn collect_leaf_tokens(node: Node<'_>, source: &str, tokens: &mut Vec<String>) {
    if node.kind() == "comment" {
        return;
    }
    if node.child_count() == 0 {
        let text = node_text(node, source).trim();
        if !text.is_empty() {
            tokens.push(text.to_string());
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_leaf_tokens(child, source, tokens);
    }
}

pub(crate) fn source_lines(source: &str) -> Vec<&str> {
    source.split_inclusive('\n').collect()
}

/// Raw source segment covering the given 0-based row range, with trailing
/// whitespace trimmed and a single terminator restored. Empty when the range
/// holds no content.
pub(crate) fn snippet_for_rows(lines: &[&str], start_row: usize, end_row: usize) -> String {
    if lines.is_empty() || start_row >= lines.len() {
        return String::new();
    }
    let end = end_row.min(lines.len() - 1);
    if start_row > end {
        return String::new();
    }
    let mut snippet = lines[start_row..=end].concat().trim_end().to_string();
    if snippet.is_empty() {
        return String::new();
    }
    snippet.push('\n');
    snippet
}

/// First and last statement rows of a definition's body block, skipping
/// comments so that a trailing comment never counts as the last statement.
pub(crate) fn body_rows(definition: Node<'_>) -> (Option<usize>, Option<usize>) {
    let Some(block) = definition.child_by_field_name("body") else {
        return (None, None);
    };
    let mut first = None;
    let mut last = None;
    let mut cursor = block.walk();
    for statement in block.named_children(&mut cursor) {
        if statement.kind() == "comment" {
            continue;
        }
        if first.is_none() {
            first = Some(statement.start_position().row);
        }
        last = Some(statement.end_position().row);
    }
    (first, last)
}

pub(crate) fn decorator_texts(wrapper: Node<'_>, source: &str) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = wrapper.walk();
    for child in wrapper.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(node_text(child, source).trim().to_string());
        }
    }
    decorators
}

/// One top-level statement of a new test unit, in source order.
#[derive(Debug, Clone)]
pub(crate) enum TopLevelItem {
    Import {
        normalized: String,
        text: String,
    },
    Class {
        name: String,
        text: String,
        methods: Vec<MethodItem>,
    },
    Function {
        name: String,
        text: String,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct MethodItem {
    pub name: String,
    pub text: String,
}

/// Classifies the top-level statements of a new unit as imports, classes
/// (with their immediate methods), and functions. Snippet texts span
/// decorators and are terminator-normalized.
pub(crate) fn scan_top_level(
    source: &str,
    origin: &'static str,
) -> Result<Vec<TopLevelItem>, TestgraftError> {
    let tree = parse_module(source, origin)?;
    let lines = source_lines(source);
    let root = tree.root_node();

    let mut items = Vec::new();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                let text =
                    snippet_for_rows(&lines, node.start_position().row, node.end_position().row);
                if text.is_empty() {
                    continue;
                }
                items.push(TopLevelItem::Import {
                    normalized: normalized_tokens(node, source),
                    text,
                });
            }
            "class_definition" => {
                if let Some(item) = class_item(node, node, source, &lines) {
                    items.push(item);
                }
            }
            "function_definition" => {
                if let Some(item) = function_item(node, node, source, &lines) {
                    items.push(item);
                }
            }
            "decorated_definition" => {
                let Some(definition) = node.child_by_field_name("definition") else {
                    continue;
                };
                let item = match definition.kind() {
                    "class_definition" => class_item(definition, node, source, &lines),
                    "function_definition" => function_item(definition, node, source, &lines),
                    _ => None,
                };
                if let Some(item) = item {
                    items.push(item);
                }
            }
            _ => {}
        }
    }
    Ok(items)
}

fn class_item(
    definition: Node<'_>,
    outer: Node<'_>,
    source: &str,
    lines: &[&str],
) -> Option<TopLevelItem> {
    let name = node_text(definition.child_by_field_name("name")?, source).to_string();
    let text = snippet_for_rows(lines, outer.start_position().row, outer.end_position().row);
    if text.is_empty() {
        return None;
    }

    let mut methods = Vec::new();
    if let Some(block) = definition.child_by_field_name("body") {
        let mut cursor = block.walk();
        for member in block.named_children(&mut cursor) {
            let (method_definition, method_outer) = match member.kind() {
                "function_definition" => (member, member),
                "decorated_definition" => match member.child_by_field_name("definition") {
                    Some(inner) if inner.kind() == "function_definition" => (inner, member),
                    _ => continue,
                },
                _ => continue,
            };
            let Some(method_name) = method_definition.child_by_field_name("name") else {
                continue;
            };
            let method_text = snippet_for_rows(
                lines,
                method_outer.start_position().row,
                method_outer.end_position().row,
            );
            if method_text.is_empty() {
                continue;
            }
            methods.push(MethodItem {
                name: node_text(method_name, source).to_string(),
                text: method_text,
            });
        }
    }

    Some(TopLevelItem::Class {
        name,
        text,
        methods,
    })
}

fn function_item(
    definition: Node<'_>,
    outer: Node<'_>,
    source: &str,
    lines: &[&str],
) -> Option<TopLevelItem> {
    let name = node_text(definition.child_by_field_name("name")?, source).to_string();
    let text = snippet_for_rows(lines, outer.start_position().row, outer.end_position().row);
    if text.is_empty() {
        return None;
    }
    Some(TopLevelItem::Function { name, text })
}

/// A standalone new-callable snippet parsed for APPEND: its decorators,
/// parameter shape, and the verbatim body segment (signature line excluded).
#[derive(Debug, Clone)]
pub(crate) struct SnippetCallable {
    pub name: String,
    pub decorators: Vec<String>,
    pub signature: Signature,
    pub body: String,
}

/// Parses a dedented snippet that must hold exactly one callable definition.
pub(crate) fn parse_single_callable(
    dedented: &str,
    qualified: &str,
) -> Result<SnippetCallable, TestgraftError> {
    let tree = parse_module(dedented, "snippet")?;
    let root = tree.root_node();

    let mut definition = None;
    let mut decorators = Vec::new();
    let mut statements = 0usize;
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        if node.kind() == "comment" {
            continue;
        }
        statements += 1;
        match node.kind() {
            "function_definition" => definition = Some(node),
            "decorated_definition" => {
                if let Some(inner) = node.child_by_field_name("definition")
                    && inner.kind() == "function_definition"
                {
                    decorators = decorator_texts(node, dedented);
                    definition = Some(inner);
                }
            }
            _ => {}
        }
    }

    let definition = match (statements, definition) {
        (1, Some(definition)) => definition,
        _ => {
            return Err(TestgraftError::MalformedSnippet {
                qualified: qualified.to_string(),
            });
        }
    };

    let name = definition
        .child_by_field_name("name")
        .map(|node| node_text(node, dedented).to_string())
        .unwrap_or_default();
    let signature = Signature::from_function(definition, dedented);

    let lines = source_lines(dedented);
    let body = match body_rows(definition) {
        (Some(first_row), Some(last_row)) if first_row < lines.len() => {
            lines[first_row..=last_row.min(lines.len() - 1)].concat()
        }
        _ => String::new(),
    };

    Ok(SnippetCallable {
        name,
        decorators,
        signature,
        body,
    })
}
