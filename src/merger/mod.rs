use std::collections::BTreeSet;

use tracing::debug;

use crate::buffer::{LineBuffer, dedent, indent_unit, leading_whitespace, reindent};
use crate::error::TestgraftError;
use crate::python::index::{CallableEntry, StructuralIndex};
use crate::python::parse_single_callable;

#[cfg(test)]
mod tests;

/// Composes the structural index and line-splicing primitives into the four
/// merge operations. Constructed once from the target's base text, driven
/// through a strictly sequential call sequence, and discarded after
/// [`Merger::result`] is read. Every mutation re-derives the index, so no
/// partial state is ever observable between calls.
pub struct Merger {
    buffer: LineBuffer,
    index: StructuralIndex,
}

impl Merger {
    pub fn new(base_src: &str) -> Result<Self, TestgraftError> {
        let buffer = LineBuffer::new(base_src);
        let index = StructuralIndex::build(&buffer.text(), "target")?;
        Ok(Self { buffer, index })
    }

    pub fn index(&self) -> &StructuralIndex {
        &self.index
    }

    pub fn result(&self) -> String {
        self.buffer.text()
    }

    fn refresh_index(&mut self) -> Result<(), TestgraftError> {
        self.index = StructuralIndex::build(&self.buffer.text(), "target")?;
        Ok(())
    }

    /// Inserts import lines immediately after the last existing top-level
    /// import, or at the top of the file when there is none. Deduplication
    /// against the existing import set is the caller's job.
    pub fn add_imports(&mut self, imports: &[String]) -> Result<(), TestgraftError> {
        if imports.is_empty() {
            return Ok(());
        }
        let position = self.index.last_import_row.map_or(0, |row| row + 1);
        self.buffer.splice_at(position, imports);
        self.refresh_index()
    }

    /// Appends a top-level class or function snippet at end-of-file,
    /// separated from existing content by exactly one blank line unless the
    /// buffer is empty or already ends blank.
    pub fn add_class_or_function(&mut self, snippet: &str) -> Result<(), TestgraftError> {
        let trimmed = snippet.trim_end();
        if trimmed.is_empty() {
            return Ok(());
        }
        let mut block = String::new();
        if self
            .buffer
            .last_line()
            .is_some_and(|line| !line.trim().is_empty())
        {
            block.push('\n');
        }
        block.push_str(trimmed);
        block.push('\n');

        let end = self.buffer.len();
        self.buffer.splice_at(end, &[block]);
        self.refresh_index()
    }

    /// Inserts method snippets after the last statement of an existing
    /// class body, re-indented to the class's method indentation.
    pub fn add_methods(
        &mut self,
        class_name: &str,
        methods: &[String],
    ) -> Result<(), TestgraftError> {
        if methods.is_empty() {
            return Ok(());
        }
        let (header_row, body_first_row, insertion_row) = {
            let entry =
                self.index
                    .classes
                    .get(class_name)
                    .ok_or_else(|| TestgraftError::TargetNotFound {
                        qualified: class_name.to_string(),
                    })?;
            (
                entry.header_row,
                entry.body_first_row,
                entry
                    .body_last_row
                    .map_or(entry.header_row + 1, |row| row + 1),
            )
        };

        let method_indent = match body_first_row
            .and_then(|row| self.buffer.line(row))
            .map(leading_whitespace)
        {
            Some(indent) if !indent.is_empty() => indent.to_string(),
            _ => {
                let header_indent = self
                    .buffer
                    .line(header_row)
                    .map(leading_whitespace)
                    .unwrap_or("");
                format!("{header_indent}{}", indent_unit(header_indent))
            }
        };

        let mut payload = Vec::new();
        if !previous_line_is_blank(&self.buffer, insertion_row) {
            payload.push("\n".to_string());
        }
        for method in methods {
            payload.push(reindent(method, &method_indent));
        }
        self.buffer.splice_at(insertion_row, &payload);
        self.refresh_index()
    }

    /// Appends the body of a new callable to an existing one, merging any
    /// decorators the target does not already carry. The target's pre-merge
    /// body is preserved byte-for-byte as a prefix of the result.
    pub fn append_callable_body(
        &mut self,
        target_name: &str,
        new_callable_snippet: &str,
        target_class_name: Option<&str>,
    ) -> Result<(), TestgraftError> {
        let qualified = match target_class_name {
            Some(class_name) => format!("{class_name}.{target_name}"),
            None => target_name.to_string(),
        };

        let mut target = self.resolve_target(target_name, target_class_name, &qualified)?;
        let dedented = dedent(new_callable_snippet);
        let new_callable = parse_single_callable(&dedented, &qualified)?;
        if new_callable.name != target_name {
            debug!(
                snippet = %new_callable.name,
                target = %qualified,
                "appending a callable named differently from its target"
            );
        }

        if let Some(diff) = target.signature.first_mismatch(&new_callable.signature) {
            return Err(TestgraftError::SignatureMismatch {
                qualified,
                detail: diff.to_string(),
            });
        }

        // decorator merge: anything the target lacks goes directly above its
        // def line, below the decorators it already has
        let target_indent = self
            .buffer
            .line(target.def_row)
            .map(leading_whitespace)
            .unwrap_or("")
            .to_string();
        let existing: BTreeSet<&str> = target.decorators.iter().map(String::as_str).collect();
        let mut decorator_payload = Vec::new();
        for decorator in &new_callable.decorators {
            if existing.contains(decorator.trim()) {
                continue;
            }
            let mut block = String::new();
            for line in decorator.lines() {
                block.push_str(&target_indent);
                block.push_str(line.trim_start());
                block.push('\n');
            }
            decorator_payload.push(block);
        }
        if !decorator_payload.is_empty() {
            self.buffer.splice_at(target.def_row, &decorator_payload);
            self.refresh_index()?;
            // line numbers shifted; re-resolve the target
            target = self.resolve_target(target_name, target_class_name, &qualified)?;
        }

        if new_callable.body.trim().is_empty() {
            debug!(target = %qualified, "new callable has no body content to append");
            return Ok(());
        }

        let (splice_row, body_indent) = match (target.body_first_row, target.body_last_row) {
            (Some(first_row), Some(last_row)) => {
                let first_line = self.buffer.line(first_row).unwrap_or("");
                let indent = leading_whitespace(first_line);
                if indent.is_empty() && !first_line.trim().is_empty() {
                    (last_row + 1, one_level_below(&self.buffer, target.def_row))
                } else {
                    (last_row + 1, indent.to_string())
                }
            }
            _ => (
                target.def_row + 1,
                one_level_below(&self.buffer, target.def_row),
            ),
        };

        let reindented = reindent(&new_callable.body, &body_indent);
        let block = if previous_line_is_blank(&self.buffer, splice_row) {
            reindented
        } else {
            format!("\n{reindented}")
        };
        self.buffer.splice_at(splice_row, &[block]);
        self.refresh_index()
    }

    fn resolve_target(
        &self,
        name: &str,
        class_name: Option<&str>,
        qualified: &str,
    ) -> Result<CallableEntry, TestgraftError> {
        let entry = match class_name {
            Some(class_name) => {
                let class_entry = self.index.classes.get(class_name).ok_or_else(|| {
                    TestgraftError::TargetNotFound {
                        qualified: class_name.to_string(),
                    }
                })?;
                class_entry.methods.get(name)
            }
            None => self.index.functions.get(name),
        };
        entry.cloned().ok_or_else(|| TestgraftError::TargetNotFound {
            qualified: qualified.to_string(),
        })
    }
}

fn previous_line_is_blank(buffer: &LineBuffer, insertion_row: usize) -> bool {
    insertion_row
        .checked_sub(1)
        .and_then(|row| buffer.line(row))
        .is_some_and(|line| line.trim().is_empty())
}

fn one_level_below(buffer: &LineBuffer, def_row: usize) -> String {
    let def_indent = buffer.line(def_row).map(leading_whitespace).unwrap_or("");
    format!("{def_indent}{}", indent_unit(def_indent))
}
