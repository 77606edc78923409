use crate::compiler::compile;

fn asm(text: &str) -> String {
    match compile(text) {
        Ok(asm) => asm,
        Err(msg) => panic!("compile failed: {}", msg),
    }
}

#[test]
fn test_empty_program() {
    let asm = asm("begin end.");
    assert!(asm.contains("%include \"io.inc\""));
    assert!(asm.contains("global CMAIN"));
    assert!(asm.contains("CMAIN:"));
    assert!(asm.contains("; program entry"));
    assert!(asm.contains("mov [main_frame], ebp"));
    assert!(asm.contains("xor eax, eax"));
}

#[test]
fn test_assignment_and_write() {
    let asm = asm(
        "var x: integer;
         begin
             x := 2 + 3;
             write(x)
         end.",
    );
    // the sum folds at parse time
    assert!(asm.contains("push 5"));
    assert!(asm.contains("sub esp, 4"));
    assert!(asm.contains("lea eax, [eax-4]"));
    assert!(asm.contains("PRINT_DEC 4, eax"));
}

#[test]
fn test_integer_division() {
    let asm = asm(
        "var a: integer;
         begin
             a := 7;
             write(a div 2);
             write(a mod 2)
         end.",
    );
    assert!(asm.contains("cdq"));
    assert!(asm.contains("idiv ebx"));
    assert!(asm.contains("push edx"));
}

#[test]
fn test_double_arithmetic() {
    let asm = asm(
        "var d: double;
         begin
             d := 1.5;
             d := d / 2.0
         end.",
    );
    assert!(asm.contains("dq 1.5"));
    assert!(asm.contains("divsd xmm0, xmm1"));
    assert!(asm.contains("movsd [esp], xmm0"));
}

#[test]
fn test_while_loop() {
    let asm = asm(
        "var i: integer;
         begin
             i := 0;
             while i < 10 do
                 i := i + 1
         end.",
    );
    assert!(asm.contains(".L0:"));
    assert!(asm.contains("jz .L1"));
    assert!(asm.contains("jmp .L0"));
    assert!(asm.contains("setl al"));
}

#[test]
fn test_for_loop() {
    let asm = asm(
        "var i: integer;
         begin
             for i := 1 to 3 do
                 write(i)
         end.",
    );
    assert!(asm.contains("jg .L2"));
    assert!(asm.contains("add DWORD [eax], 1"));
    // the upper bound is dropped from the stack at the end
    assert!(asm.contains("add esp, 4"));
}

#[test]
fn test_for_downto_steps_down() {
    let asm = asm(
        "var i: integer;
         begin
             for i := 3 downto 1 do
                 write(i)
         end.",
    );
    assert!(asm.contains("jl .L2"));
    assert!(asm.contains("sub DWORD [eax], 1"));
}

#[test]
fn test_function_call() {
    let asm = asm(
        "function add(a: integer; b: integer): integer;
         begin
             result := a + b
         end;
         begin
             write(add(1, 2))
         end.",
    );
    assert!(asm.contains("fn_add:"));
    assert!(asm.contains("; routine add"));
    assert!(asm.contains("call fn_add"));
    // first parameter sits above the second in the frame
    assert!(asm.contains("lea eax, [ebp+12]"));
    assert!(asm.contains("lea eax, [ebp+8]"));
    // result comes back in eax and the callee pops both arguments
    assert!(asm.contains("mov eax, [ebp-4]"));
    assert!(asm.contains("ret 8"));
}

#[test]
fn test_var_parameter_is_an_address() {
    let asm = asm(
        "procedure bump(var x: integer);
         begin
             x := x + 1
         end;
         var n: integer;
         begin
             bump(n)
         end.",
    );
    assert!(asm.contains("call fn_bump"));
    // the callee loads the address instead of taking it
    assert!(asm.contains("mov eax, [ebp+8]"));
    assert!(asm.contains("ret 4"));
}

#[test]
fn test_nested_routine_labels() {
    let asm = asm(
        "function outer(): integer;
             function inner(): integer;
             begin
                 result := 1
             end;
         begin
             result := inner()
         end;
         begin
             write(outer())
         end.",
    );
    assert!(asm.contains("fn_outer_inner:"));
    assert!(asm.contains("call fn_outer_inner"));
    assert!(asm.contains("call fn_outer"));
}

#[test]
fn test_record_assignment_copies_words() {
    let asm = asm(
        "type point = record x: integer; y: integer; end;
         var a: point;
         var b: point;
         begin
             a.x := 1;
             b := a
         end.",
    );
    assert!(asm.contains("mov ecx, 2"));
    assert!(asm.contains("rep movsd"));
}

#[test]
fn test_array_indexing_scales_from_lower_bound() {
    let asm = asm(
        "var a: array[1..5] of integer;
         begin
             a[2] := 9;
             write(a[2])
         end.",
    );
    assert!(asm.contains("sub ebx, 1"));
    assert!(asm.contains("imul ebx, 4"));
}

#[test]
fn test_typed_constant_is_initialized() {
    let asm = asm(
        "const squares: array[1..3] of integer = (1, 4, 9);
         begin
             write(squares[2])
         end.",
    );
    assert!(asm.contains("mov DWORD [eax], 1"));
    assert!(asm.contains("mov DWORD [eax+4], 4"));
    assert!(asm.contains("mov DWORD [eax+8], 9"));
}

#[test]
fn test_write_string_and_char() {
    let asm = asm("begin write('total: ', 'A') end.");
    assert!(asm.contains("db `total: `,0"));
    assert!(asm.contains("PRINT_STRING str_"));
    assert!(asm.contains("PRINT_CHAR eax"));
}

#[test]
fn test_read_targets() {
    let asm = asm(
        "var n: integer;
         var c: char;
         begin
             read(n, c)
         end.",
    );
    assert!(asm.contains("GET_DEC 4, [eax]"));
    assert!(asm.contains("GET_CHAR [eax]"));
}

#[test]
fn test_double_comparison_handles_nan() {
    let asm = asm(
        "var d: double;
         begin
             d := 1.0;
             if d = 2.0 then
                 write(1)
         end.",
    );
    assert!(asm.contains("ucomisd xmm0, xmm1"));
    // equality must reject the unordered outcome
    assert!(asm.contains("setnp bl"));
    assert!(asm.contains("and al, bl"));
}

#[test]
fn test_global_access_from_routine() {
    let asm = asm(
        "var total: integer;
         procedure tally;
         begin
             total := total + 1
         end;
         begin
             total := 0;
             tally
         end.",
    );
    // routines reach program variables through the published frame
    assert!(asm.contains("mov eax, [main_frame]"));
    assert!(asm.contains("call fn_tally"));
}

#[test]
fn test_exit_jumps_to_epilogue() {
    let asm = asm(
        "function pick(n: integer): integer;
         begin
             if n > 0 then
                 exit(1);
             result := 0
         end;
         begin
             write(pick(3))
         end.",
    );
    assert!(asm.contains("jmp .exit"));
    assert!(asm.contains(".exit:"));
}
