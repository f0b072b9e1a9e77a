use c2pml_core::{TranslateError, translate};

const HEADER: &str = "#define MAX_NODES 100\n#define MAX_STRING_LENGTH 100\n\n";

#[test]
fn declarations_pass_through() {
    let out = translate("int main() { int a; int b = 5; int arr[10]; }").unwrap();
    let expected = format!("{HEADER}init {{\n  int a;\n  int b = 5;\n  int arr[10];\n}}");
    assert_eq!(out, expected);
}

#[test]
fn if_else_becomes_guarded_choice() {
    let out = translate("int main() { int a; if (a > 0) { a = 1; } else { a = 2; } }").unwrap();
    let expected = format!(
        "{HEADER}init {{\n  int a;\n  if\n  :: (a > 0) ->\n    a = 1;\n  :: else ->\n    a = 2;\n  fi;\n}}"
    );
    assert_eq!(out, expected);
}

#[test]
fn if_without_else_gets_skip_branch() {
    let out = translate("int main() { int a; if (a > 0) { a = 1; } }").unwrap();
    let expected = format!(
        "{HEADER}init {{\n  int a;\n  if\n  :: (a > 0) ->\n    a = 1;\n  :: else -> skip;\n  fi;\n}}"
    );
    assert_eq!(out, expected);
}

#[test]
fn while_becomes_do_loop() {
    let out = translate("int main() { int i; i = 0; while (i < 10) { i = i + 1; } }").unwrap();
    let expected = format!(
        "{HEADER}init {{\n  int i;\n  i = 0;\n  do\n  :: !(i < 10) -> break;\n  :: else ->\n    i = (i + 1);\n  od;\n}}"
    );
    assert_eq!(out, expected);
}

#[test]
fn for_loop_hoists_declaration_and_appends_increment() {
    let out =
        translate("int main() { int x; x = 0; for (int i = 0; i < 10; i++) { x = x + 1; } }")
            .unwrap();
    let expected = format!(
        "{HEADER}init {{\n  int x;\n  x = 0;\n  int i;\n  i = 0;\n  do\n  :: !(i < 10) -> break;\n  :: else ->\n    x = (x + 1);\n    i = i + 1;\n  od;\n}}"
    );
    assert_eq!(out, expected);
}

#[test]
fn do_while_becomes_label_and_goto() {
    let out = translate("int main() { int i; i = 0; do { i = i + 1; } while (i < 3); }").unwrap();
    let expected = format!(
        "{HEADER}init {{\n  int i;\n  i = 0;\n  do_label_0:\n  i = (i + 1);\n  if\n  :: (i < 3) -> goto do_label_0;\n  :: else -> skip;\n  fi;\n}}"
    );
    assert_eq!(out, expected);
}

#[test]
fn switch_guards_in_source_order_with_else_last() {
    let source = "int main() {\n\
                  int x;\n\
                  switch (x) {\n\
                  default: x = 0; break;\n\
                  case 1: x = 10; break;\n\
                  case 2: x = 20; break;\n\
                  }\n\
                  }\n";
    let out = translate(source).unwrap();
    let expected = format!(
        "{HEADER}init {{\n  int x;\n  if\n  :: (x == 1) ->\n    x = 10;\n  :: (x == 2) ->\n    x = 20;\n  :: else ->\n    x = 0;\n  fi;\n}}"
    );
    assert_eq!(out, expected);
}

#[test]
fn structs_and_heap_are_flattened() {
    let source = "struct Node {\n\
                  int value;\n\
                  struct Node *next;\n\
                  };\n\
                  \n\
                  int main() {\n\
                  struct Node *p;\n\
                  p = malloc(sizeof(struct Node));\n\
                  p->value = 4;\n\
                  p->next = NULL;\n\
                  free(p);\n\
                  return 0;\n\
                  }\n";
    let out = translate(source).unwrap();
    assert!(out.contains("typedef Node {"));
    assert!(out.contains("Node node_mem[MAX_NODES];"));
    assert!(out.contains("byte node_used[MAX_NODES];"));
    assert!(out.contains("proctype allocate_node(int allocate_node_result)"));
    assert!(out.contains("proctype free_node(int idx)"));
    assert!(out.contains("allocate_node(allocate_node_result);"));
    assert!(out.contains("p = allocate_node_result;"));
    assert!(out.contains("node_mem[p].value = 4;"));
    assert!(out.contains("node_mem[p].next = -1;"));
    assert!(out.contains("free_node(p);"));
    assert!(out.contains("init {"));
    assert!(!out.contains("malloc"));
    assert!(!out.contains("p->"));
    assert!(!out.contains("NULL"));
}

#[test]
fn cast_malloc_is_flattened() {
    let source = "struct Node {\n\
                  int v;\n\
                  };\n\
                  \n\
                  int main() {\n\
                  struct Node *p;\n\
                  p = (struct Node *) malloc(sizeof(struct Node));\n\
                  p->v = 1;\n\
                  free(p);\n\
                  }\n";
    let out = translate(source).unwrap();
    assert!(out.contains("allocate_node(allocate_node_result);"));
    assert!(out.contains("p = allocate_node_result;"));
    assert!(out.contains("node_mem[p].v = 1;"));
    assert!(out.contains("free_node(p);"));
    assert!(!out.contains("malloc"));
}

#[test]
fn return_values_become_out_parameters() {
    let source = "int f(int x) {\n\
                  return x + 1;\n\
                  }\n\
                  \n\
                  int main() {\n\
                  int y;\n\
                  y = f(5);\n\
                  return 0;\n\
                  }\n";
    let out = translate(source).unwrap();
    assert!(out.contains("proctype f(int x; int f_result)"));
    assert!(out.contains("f_result = (x + 1);"));
    assert!(out.contains("f(5, f_result);"));
    assert!(out.contains("y = f_result;"));
    assert!(out.contains("init {"));
    assert!(!out.contains("return"));
}

#[test]
fn continue_restructures_enclosing_if() {
    let source =
        "int main() { int i; i = 0; while (i < 10) { if (i == 5) { continue; } i = i + 1; } }";
    let out = translate(source).unwrap();
    assert!(out.contains(
        "    if\n    :: (i == 5) ->\n      skip;\n    :: else ->\n      i = (i + 1);\n    fi;"
    ));
}

#[test]
fn continue_discards_rest_of_statement_list() {
    let source = "int main() { int i; while (i < 10) { continue; i = 99; } }";
    let out = translate(source).unwrap();
    assert!(!out.contains("99"));
}

#[test]
fn printf_arguments_pass_through_verbatim() {
    let out = translate("int main() { printf(\"value: %d\\n\", 42); }").unwrap();
    assert!(out.contains("printf(\"value: %d\\n\", 42);"));
}

#[test]
fn compound_assignment_expands() {
    let out = translate("int main() { int x; x = 1; x += 2; }").unwrap();
    assert!(out.contains("x = (x + 2);"));
}

#[test]
fn source_without_main_gets_no_init() {
    let out = translate("void f(int x) { x = x + 1; }").unwrap();
    assert!(out.starts_with(HEADER));
    assert!(out.contains("proctype f(int x)"));
    assert!(!out.contains("init {"));
}

#[test]
fn empty_input_is_an_error() {
    assert!(matches!(translate("\n  \t"), Err(TranslateError::EmptyInput)));
}

#[test]
fn unknown_character_is_a_lexical_error() {
    match translate("int main() { int x; x = @; }") {
        Err(TranslateError::Lexical(e)) => {
            assert_eq!(e.character, '@');
            assert_eq!(e.line, 1);
        }
        other => panic!("expected a lexical error, got {other:?}"),
    }
}

#[test]
fn malformed_input_is_a_syntax_error() {
    match translate("int main() { if x > 0 { } }") {
        Err(TranslateError::Syntax(e)) => {
            assert_eq!(e.found, "'x'");
            assert!(e.expected.contains(&"'('".to_owned()));
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}
