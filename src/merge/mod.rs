use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use tracing::{debug, warn};

use crate::error::TestgraftError;
use crate::identity::CallableIdentity;
use crate::merger::Merger;
use crate::python::{MethodItem, TopLevelItem, scan_top_level};


/// Qualified-name mapping for APPEND mode: each key names a callable in the
/// new unit, each value the existing callable its body is appended to.
pub type Mapping = BTreeMap<String, String>;

/// Merge mode selector. ADD inserts content missing from the target, APPEND
/// grows existing callables according to a caller-supplied mapping, FOLD is
/// reserved and not implemented.
#[derive(Debug, Clone, Copy)]
pub enum MergeMode<'a> {
    Add,
    Append { mapping: &'a Mapping },
    Fold,
}

impl<'a> MergeMode<'a> {
    /// Resolves a case-insensitive mode string, pairing APPEND with its
    /// required mapping up front so a missing mapping fails before any
    /// target mutation.
    pub fn resolve(
        mode: &str,
        mapping: Option<&'a Mapping>,
    ) -> Result<Self, TestgraftError> {
        match mode.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "append" => match mapping {
                Some(mapping) => Ok(Self::Append { mapping }),
                None => Err(TestgraftError::MissingMapping),
            },
            "fold" => Ok(Self::Fold),
            _ => Err(TestgraftError::UnknownMode {
                mode: mode.to_string(),
            }),
        }
    }
}

/// Non-fatal condition encountered while resolving APPEND mapping entries.
/// The affected entry is skipped; the rest of the merge proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeWarning {
    UnmappedMethod { qualified: String },
    MalformedMethodTarget { qualified: String, target: String },
    UnmappedFunction { name: String },
    FunctionMappedToMethod { name: String, target: String },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedMethod { qualified } => {
                write!(f, "no mapping entry for method '{qualified}'; skipped")
            }
            Self::MalformedMethodTarget { qualified, target } => write!(
                f,
                "mapping for '{qualified}' names '{target}', which is not of the form \
                 'ClassName.method_name'; skipped"
            ),
            Self::UnmappedFunction { name } => {
                write!(f, "no mapping entry for function '{name}'; skipped")
            }
            Self::FunctionMappedToMethod { name, target } => write!(
                f,
                "mapping for function '{name}' names method '{target}'; functions may only \
                 append into functions; skipped"
            ),
        }
    }
}

/// Everything a caller needs after a merge: the full merged text, the
/// identities of the callables that were actually merged (for selecting
/// which tests to run), and any mapping entries that were skipped.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: String,
    pub merged_callables: HashSet<CallableIdentity>,
    pub warnings: Vec<MergeWarning>,
}

/// Merges the new unit's top-level statements into the target source.
///
/// The new unit is parsed before the target is touched, so a syntax error in
/// either input leaves the caller's file untouched. Imports absent from the
/// target are inserted first in every mode; classes and functions follow in
/// the new unit's source order.
pub fn merge(
    new_unit_src: &str,
    target_src: &str,
    mode: MergeMode<'_>,
) -> Result<MergeOutcome, TestgraftError> {
    if matches!(mode, MergeMode::Fold) {
        return Err(TestgraftError::NotImplemented);
    }

    let items = scan_top_level(new_unit_src, "new unit")?;
    let mut merger = Merger::new(target_src)?;

    let mut seen: BTreeSet<String> = merger.index().imports.iter().cloned().collect();
    let mut pending_imports = Vec::new();
    for item in &items {
        if let TopLevelItem::Import { normalized, text } = item
            && seen.insert(normalized.clone())
        {
            pending_imports.push(text.clone());
        }
    }
    debug!(count = pending_imports.len(), "inserting new imports");
    merger.add_imports(&pending_imports)?;

    let mut merged_callables = HashSet::new();
    let mut warnings = Vec::new();

    match mode {
        MergeMode::Add => {
            for item in &items {
                match item {
                    TopLevelItem::Import { .. } => {}
                    TopLevelItem::Class {
                        name,
                        text,
                        methods,
                    } => add_class(&mut merger, name, text, methods, &mut merged_callables)?,
                    TopLevelItem::Function { name, text } => {
                        if merger.index().functions.contains_key(name) {
                            debug!(function = %name, "already present; left untouched");
                            continue;
                        }
                        merger.add_class_or_function(text)?;
                        merged_callables
                            .insert(CallableIdentity::function(name.clone()).with_source(text));
                    }
                }
            }
        }
        MergeMode::Append { mapping } => {
            // methods resolve before functions
            for item in &items {
                if let TopLevelItem::Class { name, methods, .. } = item {
                    for method in methods {
                        append_method(
                            &mut merger,
                            mapping,
                            name,
                            method,
                            &mut merged_callables,
                            &mut warnings,
                        )?;
                    }
                }
            }
            for item in &items {
                if let TopLevelItem::Function { name, text } = item {
                    append_function(
                        &mut merger,
                        mapping,
                        name,
                        text,
                        &mut merged_callables,
                        &mut warnings,
                    )?;
                }
            }
        }
        MergeMode::Fold => return Err(TestgraftError::NotImplemented),
    }

    Ok(MergeOutcome {
        merged: merger.result(),
        merged_callables,
        warnings,
    })
}

fn add_class(
    merger: &mut Merger,
    name: &str,
    text: &str,
    methods: &[MethodItem],
    merged_callables: &mut HashSet<CallableIdentity>,
) -> Result<(), TestgraftError> {
    let Some(existing) = merger.index().classes.get(name) else {
        merger.add_class_or_function(text)?;
        for method in methods {
            if method.name.starts_with("test_") {
                merged_callables.insert(
                    CallableIdentity::method(name, method.name.clone())
                        .with_source(method.text.clone()),
                );
            }
        }
        return Ok(());
    };

    let present: BTreeSet<String> = existing.methods.keys().cloned().collect();
    let new_only: Vec<&MethodItem> = methods
        .iter()
        .filter(|method| !present.contains(&method.name))
        .collect();
    if new_only.is_empty() {
        debug!(class = %name, "no new methods to add");
        return Ok(());
    }

    let snippets: Vec<String> = new_only.iter().map(|method| method.text.clone()).collect();
    merger.add_methods(name, &snippets)?;
    for method in new_only {
        merged_callables.insert(
            CallableIdentity::method(name, method.name.clone()).with_source(method.text.clone()),
        );
    }
    Ok(())
}

fn append_method(
    merger: &mut Merger,
    mapping: &Mapping,
    class_name: &str,
    method: &MethodItem,
    merged_callables: &mut HashSet<CallableIdentity>,
    warnings: &mut Vec<MergeWarning>,
) -> Result<(), TestgraftError> {
    let qualified = format!("{class_name}.{}", method.name);
    let Some(target) = mapping.get(&qualified) else {
        warn!(method = %qualified, "no mapping entry; skipping");
        warnings.push(MergeWarning::UnmappedMethod { qualified });
        return Ok(());
    };

    let Some((target_class, target_method)) = split_qualified(target) else {
        warn!(method = %qualified, target = %target, "malformed mapping target; skipping");
        warnings.push(MergeWarning::MalformedMethodTarget {
            qualified,
            target: target.clone(),
        });
        return Ok(());
    };

    merger.append_callable_body(target_method, &method.text, Some(target_class))?;
    merged_callables.insert(CallableIdentity::method(target_class, target_method));
    Ok(())
}

fn append_function(
    merger: &mut Merger,
    mapping: &Mapping,
    name: &str,
    text: &str,
    merged_callables: &mut HashSet<CallableIdentity>,
    warnings: &mut Vec<MergeWarning>,
) -> Result<(), TestgraftError> {
    let Some(target) = mapping.get(name) else {
        warn!(function = %name, "no mapping entry; skipping");
        warnings.push(MergeWarning::UnmappedFunction {
            name: name.to_string(),
        });
        return Ok(());
    };

    if target.contains('.') {
        warn!(function = %name, target = %target, "function mapped into a method; skipping");
        warnings.push(MergeWarning::FunctionMappedToMethod {
            name: name.to_string(),
            target: target.clone(),
        });
        return Ok(());
    }

    merger.append_callable_body(target, text, None)?;
    merged_callables.insert(CallableIdentity::function(target.clone()));
    Ok(())
}

fn split_qualified(target: &str) -> Option<(&str, &str)> {
    let (class_name, method_name) = target.split_once('.')?;
    if class_name.is_empty() || method_name.is_empty() || method_name.contains('.') {
        return None;
    }
    Some((class_name, method_name))
}
