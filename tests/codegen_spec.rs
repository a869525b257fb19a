/// Integration tests for ARM code generation.
///
/// Statement-level tests lower a checked main body through an `Emitter`
/// directly; whole-program tests inspect the rendered assembly text.
use rwacc::arm::{Instr, Register};
use rwacc::ast::{AssLhs, AssRhs, Expr, ExprKind, LhsKind, RhsKind, Stat, StatKind};
use rwacc::codegen::Emitter;
use rwacc::parse_tree::Position;
use rwacc::scope::{ScopeId, SymbolTable};
use rwacc::ty::Type;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn asm(src: &str) -> String {
  rwacc::generate_assembly(src).unwrap_or_else(|err| panic!("compilation failed:\n{err}"))
}

/// Whether `asm` has an instruction, label or directive reading exactly `line`.
fn has_line(asm: &str, line: &str) -> bool {
  asm.lines().any(|candidate| candidate.trim() == line)
}

fn assert_lines(asm: &str, expected: &[&str]) {
  for line in expected {
    assert!(has_line(asm, line), "missing `{line}` in:\n{asm}");
  }
}

// ---------------------------------------------------------------------------
// Statement lowering
// ---------------------------------------------------------------------------

#[test]
fn exit_loads_the_code_into_r0_then_calls_exit() {
  let analysis = rwacc::check("begin exit 7 end").unwrap();
  let mut emitter = Emitter::new(&analysis.symbols);
  let code = emitter.emit_stat(&analysis.program.body).unwrap();

  let instrs: Vec<&Instr> = code.instrs().collect();
  assert_eq!(
    instrs,
    vec![&Instr::ldr_imm(Register::R0, 7), &Instr::bl("exit")]
  );
  assert_eq!(code.to_string(), "    LDR r0, =7\n    BL exit\n");
}

#[test]
fn repeated_string_literals_get_their_own_labels() {
  let analysis = rwacc::check("begin print \"hi\"; println \"hi\" end").unwrap();
  let mut emitter = Emitter::new(&analysis.symbols);
  emitter.emit_stat(&analysis.program.body).unwrap();

  let entries = emitter.pool().entries();
  assert_eq!(entries.len(), 2);
  assert!(entries.iter().all(|entry| entry.text == "hi" && entry.length == 2));
  assert_ne!(entries[0].label, entries[1].label);
}

#[test]
fn locals_live_below_the_frame_pointer() {
  let out = asm(
    "begin
  int x = 5;
  int y = x
end",
  );
  assert_lines(
    &out,
    &[
      "PUSH {fp, lr}",
      "MOV fp, sp",
      "SUB sp, sp, #8",
      "STR r0, [fp, #-4]",
      "LDR r0, [fp, #-4]",
      "STR r0, [fp, #-8]",
      "LDR r0, =0",
      "MOV sp, fp",
      "POP {fp, pc}",
    ],
  );
}

#[test]
fn chars_and_bools_use_byte_transfers() {
  let out = asm(
    "begin
  char c = 'a';
  bool b = true;
  print c;
  println b
end",
  );
  assert_lines(
    &out,
    &[
      "MOV r0, #97",
      "STRB r0, [fp, #-4]",
      "STRB r0, [fp, #-8]",
      "LDRSB r0, [fp, #-4]",
      "BL putchar",
      "LDRSB r0, [fp, #-8]",
      "BL p_print_bool",
      "BL p_print_ln",
      "p_print_bool:",
      "p_print_ln:",
    ],
  );
}

#[test]
fn control_flow_uses_fresh_labels() {
  let out = asm(
    "begin
  int i = 0;
  while i < 3 do
    if i == 1 then println i else skip fi;
    i = i + 1
  done
end",
  );
  assert_lines(
    &out,
    &["B L1", "L0:", "BEQ L2", "B L3", "L2:", "L3:", "L1:", "CMP r0, #1", "BEQ L0"],
  );
}

// ---------------------------------------------------------------------------
// Runtime checks
// ---------------------------------------------------------------------------

#[test]
fn arithmetic_is_overflow_checked() {
  let out = asm("begin int x = 1 + 2; int y = x * 3; int z = -x end");
  assert_lines(
    &out,
    &[
      "PUSH {r0}",
      "POP {ip}",
      "ADDS r0, ip, r0",
      "BLVS p_throw_overflow_error",
      "SMULL r1, ip, ip, r0",
      "CMP ip, r1, ASR #31",
      "BLNE p_throw_overflow_error",
      "RSBS r0, r0, #0",
      "p_throw_overflow_error:",
      "p_throw_runtime_error:",
      "p_print_string:",
    ],
  );
}

#[test]
fn division_checks_for_zero() {
  let out = asm("begin int x = 7 / 2; int y = 7 % 2 end");
  assert_lines(
    &out,
    &[
      "BL p_check_divide_by_zero",
      "BL __aeabi_idiv",
      "BL __aeabi_idivmod",
      "MOV r0, r1",
      "p_check_divide_by_zero:",
    ],
  );
}

#[test]
fn array_access_is_bounds_checked() {
  let out = asm(
    "begin
  int[] a = [1, 2, 3];
  a[1] = 5;
  int x = a[2];
  char[] s = ['h', 'i'];
  println s
end",
  );
  assert_lines(
    &out,
    &[
      "LDR r0, =16",
      "BL malloc",
      "STR r0, [ip, #12]",
      "BL p_check_array_bounds",
      "ADD r0, r1, r0, LSL #2",
      "LDR r0, =6",
      "STRB r0, [ip, #5]",
      "BL p_print_string",
      "p_check_array_bounds:",
    ],
  );
  assert!(out.contains("LDRCS r0, =msg_"), "{out}");
}

#[test]
fn pair_access_is_null_checked() {
  let out = asm(
    "begin
  pair(int, char) p = newpair(10, 'x');
  char c = snd p;
  free p
end",
  );
  assert_lines(
    &out,
    &[
      "LDR r0, =8",
      "STRB r0, [ip, #4]",
      "BL p_check_null_pointer",
      "ADD r0, r0, #4",
      "BL p_free_pair",
      "p_free_pair:",
      "p_check_null_pointer:",
    ],
  );
}

#[test]
fn programs_without_io_need_no_runtime() {
  let out = asm("begin skip end");
  assert!(!out.contains("p_"), "{out}");
  assert!(!out.contains(".data"), "{out}");
  assert_lines(&out, &[".text", ".global main", "main:", ".ltorg"]);
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

#[test]
fn calls_push_arguments_and_read_them_above_the_frame() {
  let out = asm(
    "begin
  int add(int a, int b) is
    return a + b
  end
  int r = call add(1, 2);
  println r
end",
  );
  assert_lines(
    &out,
    &[
      "f_add:",
      "LDR r0, [fp, #8]",
      "LDR r0, [fp, #12]",
      "STR r0, [sp, #-4]!",
      "BL f_add",
      "ADD sp, sp, #8",
      "BL p_print_int",
    ],
  );
  let func = out.find("f_add:").unwrap();
  let main = out.find("main:").unwrap();
  assert!(func < main, "functions are emitted before main");
}

#[test]
fn string_literals_land_in_the_data_section() {
  let out = asm("begin string s = \"hello\"; println s end");
  assert!(out.starts_with("    .data\n"), "{out}");
  assert_lines(&out, &["msg_0:", ".word 5", ".ascii \"hello\"", "LDR r0, =msg_0"]);
}

#[test]
fn oversized_frames_fail_instead_of_truncating() {
  let mut symbols = SymbolTable::new();
  let pos = Position::new(1, 1);
  let mut last = None;
  for i in 0..1100 {
    last = Some(
      symbols
        .declare_variable(ScopeId::GLOBAL, pos, &format!("v{i}"), Type::Int)
        .unwrap(),
    );
  }
  let rhs = AssRhs {
    kind: RhsKind::Expr(Expr::new(ExprKind::Int(1), Type::Int, pos)),
    ty: Type::Int,
    pos,
  };
  let stat = Stat::new(
    StatKind::Declare {
      var: last.unwrap(),
      rhs,
    },
    ScopeId::GLOBAL,
    pos,
  );

  let err = Emitter::new(&symbols).emit_stat(&stat).unwrap_err();
  assert!(err.to_string().contains("v1099"), "{err}");
}

#[test]
fn reading_into_a_distant_local_loads_the_offset() {
  let mut symbols = SymbolTable::new();
  let pos = Position::new(1, 1);
  let vars: Vec<_> = (0..300)
    .map(|i| {
      symbols
        .declare_variable(ScopeId::GLOBAL, pos, &format!("v{i}"), Type::Int)
        .unwrap()
    })
    .collect();
  let read = |var| {
    Stat::new(
      StatKind::Read(AssLhs {
        kind: LhsKind::Ident(var),
        ty: Type::Int,
        pos,
      }),
      ScopeId::GLOBAL,
      pos,
    )
  };

  let mut emitter = Emitter::new(&symbols);
  let near = emitter.emit_stat(&read(vars[255])).unwrap().to_string();
  assert_lines(&near, &["SUB r0, fp, #1024", "BL p_read_int"]);

  // slot 256 sits 1028 bytes below fp, which no rotated immediate can encode
  let far = emitter.emit_stat(&read(vars[256])).unwrap().to_string();
  assert_lines(&far, &["LDR ip, =1028", "SUB r0, fp, ip", "BL p_read_int"]);
  assert!(!far.contains("#1028"), "{far}");
}
