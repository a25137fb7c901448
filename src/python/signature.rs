use std::fmt;

use serde::Serialize;
use tree_sitter::Node;

use super::node_text;

/// Parameter-shape fingerprint of a callable: positional-only names,
/// positional names, `*args` name, keyword-only names, and `**kwargs` name.
/// Compatibility requires all five components to match exactly, compared in
/// that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub positional_only: Vec<String>,
    pub positional: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variadic: Option<String>,
    pub keyword_only: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_variadic: Option<String>,
}

impl Signature {
    pub(crate) fn from_function(definition: Node<'_>, source: &str) -> Self {
        let Some(parameters) = definition.child_by_field_name("parameters") else {
            return Self::default();
        };

        let mut signature = Self::default();
        let mut keyword_section = false;
        let mut cursor = parameters.walk();
        for parameter in parameters.named_children(&mut cursor) {
            match parameter.kind() {
                // a bare `/`: everything collected so far is positional-only
                "positional_separator" => {
                    signature
                        .positional_only
                        .append(&mut signature.positional);
                }
                // a bare `*`: what follows is keyword-only
                "keyword_separator" => keyword_section = true,
                "list_splat_pattern" => {
                    signature.variadic = first_identifier(parameter, source);
                    keyword_section = true;
                }
                "dictionary_splat_pattern" => {
                    signature.keyword_variadic = first_identifier(parameter, source);
                }
                "identifier" => {
                    signature.push_name(keyword_section, node_text(parameter, source));
                }
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = parameter.child_by_field_name("name") {
                        signature.push_name(keyword_section, node_text(name, source));
                    }
                }
                "typed_parameter" => {
                    if let Some(splat) = named_child_of_kind(parameter, "list_splat_pattern") {
                        signature.variadic = first_identifier(splat, source);
                        keyword_section = true;
                    } else if let Some(splat) =
                        named_child_of_kind(parameter, "dictionary_splat_pattern")
                    {
                        signature.keyword_variadic = first_identifier(splat, source);
                    } else if let Some(name) = named_child_of_kind(parameter, "identifier") {
                        signature.push_name(keyword_section, node_text(name, source));
                    }
                }
                _ => {}
            }
        }
        signature
    }

    fn push_name(&mut self, keyword_section: bool, name: &str) {
        if keyword_section {
            self.keyword_only.push(name.to_string());
        } else {
            self.positional.push(name.to_string());
        }
    }

    /// First differing component between this signature (the target) and a
    /// new callable's signature, or `None` when they are compatible.
    pub fn first_mismatch(&self, new: &Self) -> Option<SignatureDiff> {
        if self.positional_only != new.positional_only {
            return Some(SignatureDiff::PositionalOnly {
                target: self.positional_only.clone(),
                new: new.positional_only.clone(),
            });
        }
        if self.positional != new.positional {
            return Some(SignatureDiff::Positional {
                target: self.positional.clone(),
                new: new.positional.clone(),
            });
        }
        if self.variadic != new.variadic {
            return Some(SignatureDiff::Variadic {
                target: self.variadic.clone(),
                new: new.variadic.clone(),
            });
        }
        if self.keyword_only != new.keyword_only {
            return Some(SignatureDiff::KeywordOnly {
                target: self.keyword_only.clone(),
                new: new.keyword_only.clone(),
            });
        }
        if self.keyword_variadic != new.keyword_variadic {
            return Some(SignatureDiff::KeywordVariadic {
                target: self.keyword_variadic.clone(),
                new: new.keyword_variadic.clone(),
            });
        }
        None
    }
}

fn named_child_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    found
}

fn first_identifier(node: Node<'_>, source: &str) -> Option<String> {
    named_child_of_kind(node, "identifier").map(|identifier| node_text(identifier, source).to_string())
}

/// First differing signature component, target values before new values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureDiff {
    PositionalOnly {
        target: Vec<String>,
        new: Vec<String>,
    },
    Positional {
        target: Vec<String>,
        new: Vec<String>,
    },
    Variadic {
        target: Option<String>,
        new: Option<String>,
    },
    KeywordOnly {
        target: Vec<String>,
        new: Vec<String>,
    },
    KeywordVariadic {
        target: Option<String>,
        new: Option<String>,
    },
}

impl fmt::Display for SignatureDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionalOnly { target, new } => write!(
                f,
                "positional-only arguments differ: [{}] vs [{}]",
                target.join(", "),
                new.join(", ")
            ),
            Self::Positional { target, new } => write!(
                f,
                "positional arguments differ: [{}] vs [{}]",
                target.join(", "),
                new.join(", ")
            ),
            Self::Variadic { target, new } => write!(
                f,
                "*args differ: '{}' vs '{}'",
                display_name(target),
                display_name(new)
            ),
            Self::KeywordOnly { target, new } => write!(
                f,
                "keyword-only arguments differ: [{}] vs [{}]",
                target.join(", "),
                new.join(", ")
            ),
            Self::KeywordVariadic { target, new } => write!(
                f,
                "**kwargs differ: '{}' vs '{}'",
                display_name(target),
                display_name(new)
            ),
        }
    }
}

fn display_name(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("<none>")
}
