use super::Merger;
use crate::error::TestgraftError;

const BASE: &str = "\
import pytest

from app.calc import add


class TestAdd:
    def test_small(self):
        assert add(1, 2) == 3


def test_zero():
    assert add(0, 0) == 0
";

#[test]
fn add_imports_inserts_after_last_existing_import() {
    let mut merger = Merger::new(BASE).unwrap();
    merger
        .add_imports(&["from app.calc import sub\n".to_string()])
        .unwrap();

    let result = merger.result();
    let expected_prefix = "\
import pytest

from app.calc import add
from app.calc import sub
";
    assert!(result.starts_with(expected_prefix), "got:\n{result}");
}

#[test]
fn add_imports_to_importless_file_inserts_at_top() {
    let mut merger = Merger::new("def test_a():\n    assert True\n").unwrap();
    merger
        .add_imports(&["import pytest\n".to_string()])
        .unwrap();
    assert_eq!(
        merger.result(),
        "import pytest\ndef test_a():\n    assert True\n"
    );
}

#[test]
fn add_imports_refreshes_the_import_index() {
    let mut merger = Merger::new(BASE).unwrap();
    merger
        .add_imports(&["import textwrap\n".to_string()])
        .unwrap();
    assert!(
        merger
            .index()
            .imports
            .contains("import textwrap")
    );
}

#[test]
fn add_class_or_function_appends_with_one_blank_separator() {
    let mut merger = Merger::new("def test_a():\n    assert True\n").unwrap();
    merger
        .add_class_or_function("def test_b():\n    assert False\n")
        .unwrap();
    assert_eq!(
        merger.result(),
        "def test_a():\n    assert True\n\ndef test_b():\n    assert False\n"
    );
}

#[test]
fn add_class_or_function_skips_separator_after_trailing_blank() {
    let mut merger = Merger::new("def test_a():\n    assert True\n\n").unwrap();
    merger
        .add_class_or_function("def test_b():\n    assert False\n")
        .unwrap();
    assert_eq!(
        merger.result(),
        "def test_a():\n    assert True\n\ndef test_b():\n    assert False\n"
    );
}

#[test]
fn add_class_or_function_on_empty_buffer_adds_no_separator() {
    let mut merger = Merger::new("").unwrap();
    merger
        .add_class_or_function("def test_b():\n    assert False\n")
        .unwrap();
    assert_eq!(merger.result(), "def test_b():\n    assert False\n");
}

#[test]
fn add_methods_splices_after_last_statement_with_class_indent() {
    let mut merger = Merger::new(BASE).unwrap();
    merger
        .add_methods(
            "TestAdd",
            &["def test_big(self):\n    assert add(10, 20) == 30\n".to_string()],
        )
        .unwrap();

    let result = merger.result();
    let expected = "\
class TestAdd:
    def test_small(self):
        assert add(1, 2) == 3

    def test_big(self):
        assert add(10, 20) == 30
";
    assert!(result.contains(expected), "got:\n{result}");
}

#[test]
fn add_methods_to_missing_class_reports_target_missing() {
    let mut merger = Merger::new(BASE).unwrap();
    let error = merger
        .add_methods("TestMissing", &["def test_x(self):\n    pass\n".to_string()])
        .unwrap_err();
    match error {
        TestgraftError::TargetNotFound { qualified } => assert_eq!(qualified, "TestMissing"),
        other => panic!("expected TargetNotFound, got {other:?}"),
    }
}

#[test]
fn add_methods_uses_tab_indent_when_class_body_is_tab_indented() {
    let base = "class TestTabs:\n\tdef test_a(self):\n\t\tassert True\n";
    let mut merger = Merger::new(base).unwrap();
    merger
        .add_methods(
            "TestTabs",
            &["def test_b(self):\n    assert False\n".to_string()],
        )
        .unwrap();
    let result = merger.result();
    assert!(result.contains("\n\tdef test_b(self):\n"), "got:\n{result}");
}

#[test]
fn append_callable_body_preserves_existing_body_as_prefix() {
    let mut merger = Merger::new(BASE).unwrap();
    merger
        .append_callable_body(
            "test_zero",
            "def test_zero():\n    assert add(0, 1) == 1\n",
            None,
        )
        .unwrap();

    let result = merger.result();
    let expected = "\
def test_zero():
    assert add(0, 0) == 0

    assert add(0, 1) == 1
";
    assert!(result.contains(expected), "got:\n{result}");
}

#[test]
fn append_callable_body_works_for_methods() {
    let mut merger = Merger::new(BASE).unwrap();
    merger
        .append_callable_body(
            "test_small",
            "def test_small(self):\n    assert add(2, 2) == 4\n",
            Some("TestAdd"),
        )
        .unwrap();

    let result = merger.result();
    let expected = "\
    def test_small(self):
        assert add(1, 2) == 3

        assert add(2, 2) == 4
";
    assert!(result.contains(expected), "got:\n{result}");
}

#[test]
fn append_callable_body_merges_missing_decorators_above_def() {
    let base = "\
import pytest


@pytest.mark.slow
def test_marked():
    assert True
";
    let mut merger = Merger::new(base).unwrap();
    merger
        .append_callable_body(
            "test_marked",
            "@pytest.mark.slow\n@pytest.mark.io\ndef test_marked():\n    assert 1\n",
            None,
        )
        .unwrap();

    let result = merger.result();
    let expected = "\
@pytest.mark.slow
@pytest.mark.io
def test_marked():
    assert True

    assert 1
";
    assert!(result.contains(expected), "got:\n{result}");
    // the shared decorator is not duplicated
    assert_eq!(result.matches("@pytest.mark.slow").count(), 1);
}

#[test]
fn append_callable_body_accepts_a_differently_named_snippet() {
    let mut merger = Merger::new(BASE).unwrap();
    merger
        .append_callable_body(
            "test_zero",
            "def test_zero_more():\n    assert add(5, 5) == 10\n",
            None,
        )
        .unwrap();

    let result = merger.result();
    assert!(
        result.contains("assert add(0, 0) == 0\n\n    assert add(5, 5) == 10\n"),
        "got:\n{result}"
    );
}

#[test]
fn append_callable_body_dedups_decorators_with_incidental_whitespace() {
    let base = "\
import pytest


class TestMarked:
    @pytest.mark.slow
    def test_marked(self):
        assert True
";
    // the snippet carries its own class-level indentation plus trailing
    // whitespace on the decorator line
    let snippet = "    @pytest.mark.slow  \t\n    def test_marked(self):\n        assert 1\n";
    let mut merger = Merger::new(base).unwrap();
    merger
        .append_callable_body("test_marked", snippet, Some("TestMarked"))
        .unwrap();

    let result = merger.result();
    assert_eq!(result.matches("@pytest.mark.slow").count(), 1, "got:\n{result}");
    assert!(result.contains("assert True\n\n        assert 1\n"), "got:\n{result}");
}

#[test]
fn append_callable_body_rejects_signature_mismatch() {
    let mut merger = Merger::new(BASE).unwrap();
    let error = merger
        .append_callable_body(
            "test_small",
            "def test_small(self, extra):\n    assert True\n",
            Some("TestAdd"),
        )
        .unwrap_err();
    match error {
        TestgraftError::SignatureMismatch { qualified, detail } => {
            assert_eq!(qualified, "TestAdd.test_small");
            assert_eq!(
                detail,
                "positional arguments differ: [self] vs [self, extra]"
            );
        }
        other => panic!("expected SignatureMismatch, got {other:?}"),
    }
}

#[test]
fn append_callable_body_to_missing_function_reports_target_missing() {
    let mut merger = Merger::new(BASE).unwrap();
    let error = merger
        .append_callable_body("test_absent", "def test_absent():\n    pass\n", None)
        .unwrap_err();
    match error {
        TestgraftError::TargetNotFound { qualified } => assert_eq!(qualified, "test_absent"),
        other => panic!("expected TargetNotFound, got {other:?}"),
    }
}

#[test]
fn append_callable_body_to_missing_class_names_the_class() {
    let mut merger = Merger::new(BASE).unwrap();
    let error = merger
        .append_callable_body(
            "test_x",
            "def test_x(self):\n    pass\n",
            Some("TestMissing"),
        )
        .unwrap_err();
    match error {
        TestgraftError::TargetNotFound { qualified } => assert_eq!(qualified, "TestMissing"),
        other => panic!("expected TargetNotFound, got {other:?}"),
    }
}

#[test]
fn append_callable_body_rejects_multi_statement_snippet() {
    let mut merger = Merger::new(BASE).unwrap();
    let error = merger
        .append_callable_body(
            "test_zero",
            "x = 1\ndef test_zero():\n    pass\n",
            None,
        )
        .unwrap_err();
    match error {
        TestgraftError::MalformedSnippet { qualified } => assert_eq!(qualified, "test_zero"),
        other => panic!("expected MalformedSnippet, got {other:?}"),
    }
}

#[test]
fn append_callable_body_with_docstring_only_body_still_appends() {
    let base = "def test_doc():\n    \"\"\"existing\"\"\"\n";
    let mut merger = Merger::new(base).unwrap();
    merger
        .append_callable_body("test_doc", "def test_doc():\n    assert True\n", None)
        .unwrap();
    let result = merger.result();
    assert!(
        result.contains("\"\"\"existing\"\"\"\n\n    assert True\n"),
        "got:\n{result}"
    );
}

#[test]
fn operations_compose_across_refreshes() {
    let mut merger = Merger::new(BASE).unwrap();
    merger
        .add_imports(&["from app.calc import mul\n".to_string()])
        .unwrap();
    merger
        .add_class_or_function("def test_mul():\n    assert mul(2, 3) == 6\n")
        .unwrap();
    merger
        .add_methods(
            "TestAdd",
            &["def test_negative(self):\n    assert add(-1, -1) == -2\n".to_string()],
        )
        .unwrap();
    merger
        .append_callable_body("test_mul", "def test_mul():\n    assert mul(0, 9) == 0\n", None)
        .unwrap();

    let result = merger.result();
    assert!(result.contains("from app.calc import mul\n"));
    assert!(result.contains("    def test_negative(self):\n"));
    assert!(result.contains("assert mul(2, 3) == 6\n\n    assert mul(0, 9) == 0\n"));
}
