//! Verifier coverage: one rejected program per type-checking rule

use lir::Program;

/// Parses `text` expecting verification to fail with a report containing
/// `needle`.
fn expect_error(text: &str, needle: &str) {
    let err = Program::from_string(text).unwrap_err();
    let report = err.to_string();
    assert!(
        report.contains(needle),
        "expected {needle:?} in report:\n{report}"
    );
}

/// Wraps one instruction line into a minimal `main`.
fn main_with(inst: &str) -> String {
    format!("function main() -> int {{\nentry:\n  {inst}\n  $ret 0\n}}")
}

#[test]
fn test_arith_requires_int_operands() {
    expect_error(
        &main_with("x:int = $arith add y:int* 1"),
        "operand of arithmetic must be an int",
    );
    expect_error(
        &main_with("x:int* = $arith add 1 2"),
        "result of arithmetic must be an int",
    );
}

#[test]
fn test_cmp_result_must_be_int() {
    expect_error(
        &main_with("x:int* = $cmp eq 1 2"),
        "result of comparison must be an int",
    );
}

#[test]
fn test_cmp_allows_pointer_operands() {
    let text = main_with("x:int = $cmp eq y:int* z:int*");
    Program::from_string(&text).unwrap();
}

#[test]
fn test_phi_operands_must_match_lhs() {
    expect_error(
        &main_with("x:int = $phi(1, y:int*)"),
        "operand type doesn't match left-hand side",
    );
}

#[test]
fn test_copy_types_must_match() {
    expect_error(
        &main_with("x:int = $copy y:int*"),
        "operand type doesn't match left-hand side",
    );
}

#[test]
fn test_alloc_lhs_must_be_pointer() {
    expect_error(
        &main_with("x:int = $alloc"),
        "result of alloc must be a pointer",
    );
}

#[test]
fn test_addrof_must_produce_pointer_to_operand() {
    expect_error(
        &main_with("x:int* = $addrof y:int*"),
        "result of addrof must be a pointer to operand type",
    );
}

#[test]
fn test_load_source_must_point_at_result_type() {
    expect_error(
        &main_with("x:int = $load y:int**"),
        "source of load must be a pointer to type of result",
    );
}

#[test]
fn test_store_destination_must_point_at_value_type() {
    expect_error(
        &main_with("$store x:int 1"),
        "destination of store must be a pointer to type of stored value",
    );
}

#[test]
fn test_gep_without_field_matches_source_type() {
    expect_error(
        &main_with("x:int* = $gep y:int** 0"),
        "type of source pointer must match left-hand side",
    );
}

#[test]
fn test_gep_index_must_be_int() {
    expect_error(
        &main_with("x:int* = $gep y:int* z:int* 0"),
        "Index must be an integer",
    );
}

#[test]
fn test_gep_field_must_exist() {
    expect_error(
        &format!(
            "struct s {{ f:int }}\n{}",
            main_with("x:int* = $gep y:s* 0 g")
        ),
        "mismatch between struct type and field name",
    );
}

#[test]
fn test_gep_result_must_point_at_field_type() {
    expect_error(
        &format!(
            "struct s {{ f:int }}\n{}",
            main_with("x:s* = $gep y:s* 0 f")
        ),
        "result type must be a pointer to type of field",
    );
}

#[test]
fn test_gep_field_requires_struct_pointer() {
    expect_error(
        &main_with("x:int* = $gep y:int* 0 f"),
        "source must be a pointer to a struct",
    );
}

#[test]
fn test_gep_on_undefined_struct_reports_only_the_struct() {
    // With the struct undefined, the field cannot be checked; the only
    // complaint is the missing struct itself.
    let err = Program::from_string(&main_with("x:int* = $gep y:ghost* 0 f")).unwrap_err();
    let report = err.to_string();
    assert!(report.contains("Type uses nonexistent struct: ghost"));
    assert!(!report.contains("mismatch between struct type"));
}

#[test]
fn test_select_condition_must_be_int() {
    expect_error(
        &main_with("x:int = $select y:int* 1 2"),
        "select condition must be an int",
    );
}

#[test]
fn test_select_arms_must_match_lhs() {
    expect_error(
        &main_with("x:int = $select 1 2 y:int*"),
        "type of select operands and left-hand side must match",
    );
}

#[test]
fn test_call_arity_and_types_are_checked() {
    let helper = "function helper(a:int) -> int {\nentry:\n  $ret a:int\n}\n\n";

    expect_error(
        &format!("{helper}{}", main_with("x:int = $call helper(1, 2)")),
        "incorrect number of call arguments",
    );
    expect_error(
        &format!("{helper}{}", main_with("x:int = $call helper(p:int*)")),
        "type of argument doesn't match type of parameter",
    );
    expect_error(
        &format!("{helper}{}", main_with("x:int* = $call helper(1)")),
        "function return type doesn't match left-hand side",
    );
}

#[test]
fn test_call_to_external_function_is_unchecked() {
    // Externally defined callees ('input', 'malloc', ...) are allowed with
    // any signature.
    let text = main_with("x:int* = $call malloc(40, y:int*)");
    Program::from_string(&text).unwrap();
}

#[test]
fn test_icall_requires_function_pointer() {
    expect_error(
        &main_with("x:int = $icall p:int*(1)"),
        "calling a non-function pointer",
    );
}

#[test]
fn test_icall_arity_and_return_are_checked() {
    expect_error(
        &main_with("x:int = $icall p:int[int]*()"),
        "incorrect number of call arguments",
    );
    expect_error(
        &main_with("x:int* = $icall p:int[]*()"),
        "function return type doesn't match left-hand side",
    );
}

#[test]
fn test_ret_must_match_function_return_type() {
    expect_error(
        "function main() -> int {\nentry:\n  $ret p:int*\n}",
        "operand type does not match function return type",
    );
}

#[test]
fn test_branch_targets_must_exist() {
    expect_error(
        "function main() -> int {\nentry:\n  $branch 1 gone exit\nexit:\n  $ret 0\n}",
        "branches to nonexistent basic block 'gone'",
    );
}

#[test]
fn test_parameters_must_be_toplevel_types() {
    expect_error(
        "struct foo { f:int }\nfunction main(s:foo) -> int {\nentry:\n  $ret 0\n}",
        "Top-level types must be int or pointer: foo",
    );
}

#[test]
fn test_parameters_cannot_be_global() {
    expect_error(
        "function main(@x:int*) -> int {\nentry:\n  $ret 0\n}",
        "Cannot use global variable as parameter in function main",
    );
}

#[test]
fn test_globals_cannot_be_assigned() {
    expect_error(
        &main_with("@nullptr:int* = $copy @nullptr:int*"),
        "cannot be assigned to or stored into",
    );
}

#[test]
fn test_global_function_pointer_must_name_a_function() {
    expect_error(
        &main_with("x:int[]* = $copy @ghost:int[]*"),
        "Global function pointer doesn't point to a real function",
    );
}

#[test]
fn test_entry_block_is_required() {
    expect_error(
        "function main() -> int {\nstart:\n  $ret 0\n}",
        "Function must have a basic block named 'entry': main",
    );
}

#[test]
fn test_main_is_required() {
    expect_error(
        "function helper() -> int {\nentry:\n  $ret 0\n}",
        "Program does not have a main function.",
    );
}
