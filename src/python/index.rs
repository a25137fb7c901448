use std::collections::{BTreeMap, BTreeSet};

use tree_sitter::Node;

use crate::error::TestgraftError;

use super::signature::Signature;
use super::{body_rows, decorator_texts, node_text, normalized_tokens, parse_module};

/// Derived, disposable view over the current buffer text: the import set,
/// top-level classes with their methods, and top-level functions. Never
/// mutated in place; rebuilt wholesale after every splice.
#[derive(Debug, Clone, Default)]
pub struct StructuralIndex {
    /// Normalized structural forms of every top-level import.
    pub imports: BTreeSet<String>,
    /// 0-based row of the final line of the last top-level import.
    pub last_import_row: Option<usize>,
    pub classes: BTreeMap<String, ClassEntry>,
    pub functions: BTreeMap<String, CallableEntry>,
}

#[derive(Debug, Clone)]
pub struct ClassEntry {
    /// Row of the `class` header line (decorators sit above it).
    pub header_row: usize,
    pub body_first_row: Option<usize>,
    pub body_last_row: Option<usize>,
    pub methods: BTreeMap<String, CallableEntry>,
}

#[derive(Debug, Clone)]
pub struct CallableEntry {
    /// Row of the `def` line (decorators sit above it).
    pub def_row: usize,
    /// Trimmed decorator texts, `@` included.
    pub decorators: Vec<String>,
    pub signature: Signature,
    pub body_first_row: Option<usize>,
    pub body_last_row: Option<usize>,
}

impl StructuralIndex {
    pub fn build(source: &str, origin: &'static str) -> Result<Self, TestgraftError> {
        let tree = parse_module(source, origin)?;
        let root = tree.root_node();

        let mut index = Self::default();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "import_statement" | "import_from_statement" | "future_import_statement" => {
                    index.imports.insert(normalized_tokens(node, source));
                    let end_row = node.end_position().row;
                    index.last_import_row = Some(
                        index
                            .last_import_row
                            .map_or(end_row, |current| current.max(end_row)),
                    );
                }
                "class_definition" => {
                    if let Some((name, entry)) = class_entry(node, source) {
                        index.classes.insert(name, entry);
                    }
                }
                "function_definition" => {
                    if let Some((name, entry)) = callable_entry(node, Vec::new(), source) {
                        index.functions.insert(name, entry);
                    }
                }
                "decorated_definition" => {
                    let Some(definition) = node.child_by_field_name("definition") else {
                        continue;
                    };
                    match definition.kind() {
                        "class_definition" => {
                            if let Some((name, entry)) = class_entry(definition, source) {
                                index.classes.insert(name, entry);
                            }
                        }
                        "function_definition" => {
                            let decorators = decorator_texts(node, source);
                            if let Some((name, entry)) =
                                callable_entry(definition, decorators, source)
                            {
                                index.functions.insert(name, entry);
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        Ok(index)
    }
}

fn class_entry(definition: Node<'_>, source: &str) -> Option<(String, ClassEntry)> {
    let name = node_text(definition.child_by_field_name("name")?, source).to_string();
    let (body_first_row, body_last_row) = body_rows(definition);

    let mut methods = BTreeMap::new();
    if let Some(block) = definition.child_by_field_name("body") {
        let mut cursor = block.walk();
        for member in block.named_children(&mut cursor) {
            let (method_definition, decorators) = match member.kind() {
                "function_definition" => (member, Vec::new()),
                "decorated_definition" => match member.child_by_field_name("definition") {
                    Some(inner) if inner.kind() == "function_definition" => {
                        (inner, decorator_texts(member, source))
                    }
                    _ => continue,
                },
                _ => continue,
            };
            if let Some((method_name, entry)) =
                callable_entry(method_definition, decorators, source)
            {
                methods.insert(method_name, entry);
            }
        }
    }

    Some((
        name,
        ClassEntry {
            header_row: definition.start_position().row,
            body_first_row,
            body_last_row,
            methods,
        },
    ))
}

fn callable_entry(
    definition: Node<'_>,
    decorators: Vec<String>,
    source: &str,
) -> Option<(String, CallableEntry)> {
    let name = node_text(definition.child_by_field_name("name")?, source).to_string();
    let (body_first_row, body_last_row) = body_rows(definition);

    Some((
        name,
        CallableEntry {
            def_row: definition.start_position().row,
            decorators,
            signature: Signature::from_function(definition, source),
            body_first_row,
            body_last_row,
        },
    ))
}
