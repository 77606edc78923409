use log::debug;

use crate::compiler::ast::{BinaryOperator, Node, Program, Value};
use crate::compiler::lexer::tokens::{Lex, Token};
use crate::compiler::semantics::symbol_table::SymbolTable;
use crate::compiler::types::{decay, Category, FunctionType, Type, TypeRef};

use super::assembly::{DirectOperand, Inst, Operand, Reg, Reg32, Reg8, Xmm};

/*
Evaluation model: every expression leaves its value on the machine stack,
sized by its type (integer 4 bytes, char 1, double 8, arrays and records
their full rounded size).  Binary operators pop their right operand into
ebx and their left into eax, operate, and push the result.  Doubles go
through xmm0/xmm1 instead.

Frames: a routine is entered with its arguments pushed left to right and
builds the usual ebp frame for its locals.  Program level variables live
in CMAIN's frame; its ebp is published in the `main_frame` data slot so
routines can reach them.  Scalar results return in eax (al for chars) or
xmm0; array and record results are copied into a static per routine
buffer which the caller drains.

The input tree has already been fully checked, so every inconsistency
found here is a compiler bug and panics.
*/

/// Lowers a checked program to an instruction vector.
pub fn generate(program: &Program) -> Vec<Inst> {
    let mut gen = CodeGen {
        program,
        code: vec![],
        data: vec![],
        label_count: 0,
        loops: vec![],
        frames: vec![],
    };
    gen.routines(&program.scope, None);
    gen.main();

    let mut out = vec![
        Inst::Include("io.inc".into()),
        Inst::Section(".data".into()),
        Inst::Data("main_frame".into(), 0),
    ];
    out.append(&mut gen.data);
    out.push(Inst::Section(".text".into()));
    out.push(Inst::Global("CMAIN".into()));
    out.append(&mut gen.code);
    out
}

struct Frame<'p> {
    func: Option<&'p FunctionType>,
    label: String,
}

struct CodeGen<'p> {
    program: &'p Program,
    code: Vec<Inst>,
    data: Vec<Inst>,
    label_count: u32,
    /// (continue target, break target) of each enclosing loop.
    loops: Vec<(String, String)>,
    frames: Vec<Frame<'p>>,
}

fn reg(r: Reg32) -> Operand {
    Operand::reg(r)
}

fn reg8(r: Reg8) -> Operand {
    Operand::Direct(DirectOperand::Register(Reg::R8(r)))
}

fn imm(i: i32) -> Operand {
    Operand::imm(i)
}

fn at(r: Reg32, disp: i32) -> Operand {
    Operand::MemoryAddr(r, disp)
}

impl<'p> CodeGen<'p> {
    /// Emits every routine declared in `scope`, nested routines first.
    fn routines(&mut self, scope: &'p SymbolTable, parent: Option<&str>) {
        for sym in scope.table() {
            let func = match sym.ty.as_ref() {
                Type::Function(func) => func,
                _ => continue,
            };
            let label = match parent {
                Some(parent) => format!("{}_{}", parent, sym.name),
                None => format!("fn_{}", sym.name),
            };
            let body = match &sym.value {
                Some(body) => body,
                None => panic!("CRITICAL: routine {} has no body", sym.name),
            };
            self.routine(func, label, body);
        }
    }

    fn routine(&mut self, func: &'p FunctionType, label: String, body: &'p Node) {
        debug!("generating {} as {}", func.name, label);
        self.frames.push(Frame {
            func: Some(func),
            label: label.clone(),
        });
        self.routines(&func.locals, Some(&label));

        if !func.ret.is_scalar() && *func.ret != Type::Nil {
            self.data
                .push(Inst::DataBuffer(format!("ret_{}", label), func.ret.size()));
        }

        self.code.push(Inst::Label(label));
        self.code.push(Inst::Comment(format!("routine {}", func.name)));
        self.code.push(Inst::Push(reg(Reg32::Ebp)));
        self.code.push(Inst::Mov(reg(Reg32::Ebp), reg(Reg32::Esp)));
        if func.locals.frame_size() > 0 {
            self.code
                .push(Inst::Sub(reg(Reg32::Esp), imm(func.locals.frame_size())));
        }
        self.init_consts(&func.locals);

        self.statement(body);

        self.code.push(Inst::Label(".exit".into()));
        self.move_result(func);
        self.code.push(Inst::Mov(reg(Reg32::Esp), reg(Reg32::Ebp)));
        self.code.push(Inst::Pop(reg(Reg32::Ebp)));
        if func.params.frame_size() > 0 {
            self.code.push(Inst::RetN(func.params.frame_size()));
        } else {
            self.code.push(Inst::Ret);
        }
        self.frames.pop();
    }

    /// Moves the `result` local into the return location just before the
    /// frame is torn down.
    fn move_result(&mut self, func: &'p FunctionType) {
        let result = match func.locals.get("result") {
            Some(result) => result,
            None => return, // procedure
        };
        let disp = -(result.offset + result.stack_size());
        let frame = self.frames.last().map(|f| f.label.clone());
        match func.ret.category() {
            Category::Integer => self.code.push(Inst::Mov(reg(Reg32::Eax), at(Reg32::Ebp, disp))),
            Category::Char => self
                .code
                .push(Inst::Movzx(reg(Reg32::Eax), at(Reg32::Ebp, disp))),
            Category::Double => self
                .code
                .push(Inst::MovsdLoad(Xmm::Xmm0, at(Reg32::Ebp, disp))),
            Category::Array | Category::Record => {
                let label = match frame {
                    Some(label) => label,
                    None => panic!("CRITICAL: result outside of a routine"),
                };
                self.code.push(Inst::Lea(reg(Reg32::Esi), at(Reg32::Ebp, disp)));
                self.code
                    .push(Inst::Mov(reg(Reg32::Edi), Operand::lbl(&format!("ret_{}", label))));
                self.copy_words(func.ret.size());
            }
            category => panic!("CRITICAL: routine returning {:?}", category),
        }
    }

    fn main(&mut self) {
        let program = self.program;
        self.frames.push(Frame {
            func: None,
            label: "CMAIN".into(),
        });
        self.code.push(Inst::Label("CMAIN".into()));
        self.code.push(Inst::Comment("program entry".into()));
        self.code.push(Inst::Push(reg(Reg32::Ebp)));
        self.code.push(Inst::Mov(reg(Reg32::Ebp), reg(Reg32::Esp)));
        self.code
            .push(Inst::Mov(Operand::mem("main_frame"), reg(Reg32::Ebp)));
        if program.scope.frame_size() > 0 {
            self.code
                .push(Inst::Sub(reg(Reg32::Esp), imm(program.scope.frame_size())));
        }
        self.init_consts(&program.scope);

        self.statement(&program.body);

        self.code.push(Inst::Label(".exit".into()));
        self.code.push(Inst::Mov(reg(Reg32::Esp), reg(Reg32::Ebp)));
        self.code.push(Inst::Pop(reg(Reg32::Ebp)));
        self.code.push(Inst::Xor(reg(Reg32::Eax), reg(Reg32::Eax)));
        self.code.push(Inst::Ret);
        self.frames.pop();
    }

    /// Fills the storage of array and record constants when their scope
    /// is entered.
    fn init_consts(&mut self, scope: &SymbolTable) {
        let consts: Vec<_> = scope
            .table()
            .iter()
            .filter_map(|sym| match &sym.value {
                Some(Node::TypedConstant(_, ty, items)) => {
                    Some((sym.name.clone(), ty.clone(), items.clone()))
                }
                _ => None,
            })
            .collect();
        for (name, ty, items) in consts {
            self.var_addr(&name);
            match ty.as_ref() {
                Type::Array(a) => {
                    let elem = a.element.size();
                    for (i, item) in items.iter().enumerate() {
                        self.store_const(item, i as i32 * elem);
                    }
                }
                Type::Record(r) => {
                    for (field, item) in r.fields.table().iter().zip(items.iter()) {
                        self.store_const(item, field.offset);
                    }
                }
                ty => panic!("CRITICAL: typed constant of type {}", ty),
            }
        }
    }

    /// Stores one constant element at `[eax + disp]`.
    fn store_const(&mut self, item: &Node, disp: i32) {
        match item.value() {
            Some(Value::Integer(i)) => {
                self.code.push(Inst::Mov(at(Reg32::Eax, disp), imm(*i as i32)))
            }
            Some(Value::Char(c)) => {
                self.code.push(Inst::Mov(reg(Reg32::Ebx), imm(*c as i32)));
                self.code.push(Inst::Mov(at(Reg32::Eax, disp), reg8(Reg8::Bl)));
            }
            Some(Value::Double(d)) => {
                let label = self.double_label(*d);
                self.code
                    .push(Inst::MovsdLoad(Xmm::Xmm0, Operand::mem(&label)));
                self.code.push(Inst::MovsdStore(at(Reg32::Eax, disp), Xmm::Xmm0));
            }
            value => panic!("CRITICAL: non scalar constant element {:?}", value),
        }
    }

    fn statement(&mut self, node: &'p Node) {
        match node {
            Node::Body(_, stmts) => {
                for stmt in stmts {
                    self.statement(stmt);
                }
            }
            Node::Assignment(_, target, value) => {
                self.expression(value);
                self.addr(target);
                self.pop_to_addr(&value.ty());
            }
            Node::If(_, cond, then, els) => {
                let else_lbl = self.new_label();
                let end_lbl = self.new_label();
                self.expression(cond);
                self.code.push(Inst::Pop(reg(Reg32::Eax)));
                self.code.push(Inst::Cmp(reg(Reg32::Eax), imm(0)));
                self.code.push(Inst::Jz(Operand::lbl(&else_lbl)));
                self.statement(then);
                match els {
                    Some(els) => {
                        self.code.push(Inst::Jmp(Operand::lbl(&end_lbl)));
                        self.code.push(Inst::Label(else_lbl));
                        self.statement(els);
                        self.code.push(Inst::Label(end_lbl));
                    }
                    None => self.code.push(Inst::Label(else_lbl)),
                }
            }
            Node::While(_, cond, body) => {
                let start = self.new_label();
                let end = self.new_label();
                self.code.push(Inst::Label(start.clone()));
                self.expression(cond);
                self.code.push(Inst::Pop(reg(Reg32::Eax)));
                self.code.push(Inst::Cmp(reg(Reg32::Eax), imm(0)));
                self.code.push(Inst::Jz(Operand::lbl(&end)));
                self.loops.push((start.clone(), end.clone()));
                self.statement(body);
                self.loops.pop();
                self.code.push(Inst::Jmp(Operand::lbl(&start)));
                self.code.push(Inst::Label(end));
            }
            Node::For {
                counter,
                from,
                to,
                down_to,
                body,
                ..
            } => self.for_loop(counter, from, to, *down_to, body),
            Node::Write(_, args) => {
                for arg in args {
                    self.write_arg(arg);
                }
            }
            Node::Read(_, targets) => {
                for target in targets {
                    self.addr(target);
                    match target.ty().category() {
                        Category::Integer => {
                            self.code.push(Inst::ReadDec(4, at(Reg32::Eax, 0)))
                        }
                        Category::Char => self.code.push(Inst::ReadChar(at(Reg32::Eax, 0))),
                        category => panic!("CRITICAL: reading into a {:?}", category),
                    }
                }
            }
            Node::Continue(_) => match self.loops.last() {
                Some((target, _)) => self.code.push(Inst::Jmp(Operand::lbl(target))),
                None => panic!("CRITICAL: continue outside of a loop"),
            },
            Node::Break(_) => match self.loops.last() {
                Some((_, target)) => self.code.push(Inst::Jmp(Operand::lbl(target))),
                None => panic!("CRITICAL: break outside of a loop"),
            },
            Node::Exit(_, value) => {
                if let Some(value) = value {
                    self.expression(value);
                    self.var_addr("result");
                    self.pop_to_addr(&value.ty());
                }
                self.code.push(Inst::Jmp(Operand::lbl(".exit")));
            }
            Node::FunctionCall(..) => self.call(node, true),
            node => panic!("CRITICAL: {:?} is not a statement", node.token()),
        }
    }

    /// `for` keeps its upper bound on the stack for the whole loop; the
    /// counter lives in its variable.  `continue` jumps to the step.
    fn for_loop(
        &mut self,
        counter: &'p Token,
        from: &'p Node,
        to: &'p Node,
        down_to: bool,
        body: &'p Node,
    ) {
        let name = match &counter.sym {
            Lex::Identifier(name) => name.clone(),
            sym => panic!("CRITICAL: {} is not a loop counter", sym),
        };
        let start = self.new_label();
        let step = self.new_label();
        let end = self.new_label();

        self.expression(from);
        self.var_addr(&name);
        self.pop_to_addr(&Type::integer());
        self.expression(to);

        self.code.push(Inst::Label(start.clone()));
        self.var_addr(&name);
        self.code.push(Inst::Mov(reg(Reg32::Ebx), at(Reg32::Eax, 0)));
        self.code.push(Inst::Mov(reg(Reg32::Ecx), at(Reg32::Esp, 0)));
        self.code.push(Inst::Cmp(reg(Reg32::Ebx), reg(Reg32::Ecx)));
        if down_to {
            self.code.push(Inst::Jl(Operand::lbl(&end)));
        } else {
            self.code.push(Inst::Jg(Operand::lbl(&end)));
        }

        self.loops.push((step.clone(), end.clone()));
        self.statement(body);
        self.loops.pop();

        self.code.push(Inst::Label(step));
        self.var_addr(&name);
        if down_to {
            self.code.push(Inst::Sub(at(Reg32::Eax, 0), imm(1)));
        } else {
            self.code.push(Inst::Add(at(Reg32::Eax, 0), imm(1)));
        }
        self.code.push(Inst::Jmp(Operand::lbl(&start)));

        self.code.push(Inst::Label(end));
        self.code.push(Inst::Add(reg(Reg32::Esp), imm(4)));
    }

    fn write_arg(&mut self, arg: &'p Node) {
        if let Some(Value::String(s)) = arg.value() {
            let label = self.string_label(s);
            self.code.push(Inst::PrintStr(Operand::lbl(&label)));
            return;
        }
        self.expression(arg);
        match arg.ty().category() {
            Category::Integer => {
                self.code.push(Inst::Pop(reg(Reg32::Eax)));
                self.code.push(Inst::PrintDec(4, reg(Reg32::Eax)));
            }
            Category::Char => {
                self.code.push(Inst::Movzx(reg(Reg32::Eax), at(Reg32::Esp, 0)));
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(1)));
                self.code.push(Inst::PrintChar(reg(Reg32::Eax)));
            }
            Category::Double => {
                self.code.push(Inst::PrintDec(8, at(Reg32::Esp, 0)));
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(8)));
            }
            category => panic!("CRITICAL: writing a {:?}", category),
        }
    }

    /// Evaluates an expression onto the stack.
    fn expression(&mut self, node: &'p Node) {
        match node {
            Node::Const(_, _, Value::Integer(i)) => {
                self.code.push(Inst::Push(imm(*i as i32)));
            }
            Node::Const(_, _, Value::Char(c)) => {
                self.code.push(Inst::Mov(reg(Reg32::Eax), imm(*c as i32)));
                self.push_char_from(Reg8::Al);
            }
            Node::Const(_, _, Value::Double(d)) => {
                let label = self.double_label(*d);
                self.code
                    .push(Inst::MovsdLoad(Xmm::Xmm0, Operand::mem(&label)));
                self.push_double();
            }
            Node::Var(..) | Node::Index(..) | Node::FieldAccess(..) => {
                let ty = node.ty();
                self.addr(node);
                self.push_from_addr(&ty);
            }
            Node::UnaryMinus(_, ty, operand) => {
                self.expression(operand);
                match ty.category() {
                    Category::Integer => {
                        self.code.push(Inst::Pop(reg(Reg32::Eax)));
                        self.code.push(Inst::Neg(Reg32::Eax));
                        self.code.push(Inst::Push(reg(Reg32::Eax)));
                    }
                    Category::Double => {
                        // 0.0 - x
                        self.code.push(Inst::MovsdLoad(Xmm::Xmm0, at(Reg32::Esp, 0)));
                        self.code.push(Inst::Mov(reg(Reg32::Eax), imm(0)));
                        self.code.push(Inst::Cvtsi2sd(Xmm::Xmm1, reg(Reg32::Eax)));
                        self.code.push(Inst::Subsd(Xmm::Xmm1, Xmm::Xmm0));
                        self.code.push(Inst::MovsdStore(at(Reg32::Esp, 0), Xmm::Xmm1));
                    }
                    category => panic!("CRITICAL: negating a {:?}", category),
                }
            }
            Node::Not(_, _, operand) => {
                self.expression(operand);
                self.code.push(Inst::Pop(reg(Reg32::Eax)));
                self.code.push(Inst::Not(Reg32::Eax));
                self.code.push(Inst::Push(reg(Reg32::Eax)));
            }
            Node::BinOp(_, op, ty, left, right) => {
                self.expression(left);
                self.expression(right);
                match ty.category() {
                    Category::Integer => self.integer_op(*op),
                    Category::Double => self.double_op(*op),
                    category => panic!("CRITICAL: {} on {:?} operands", op, category),
                }
            }
            Node::LogicOp(_, op, _, left, right) => self.compare(*op, left, right),
            Node::Cast(_, ty, operand) => {
                self.expression(operand);
                let from = decay(&operand.ty());
                self.cast(from.category(), ty.category());
            }
            Node::FunctionCall(..) => self.call(node, false),
            node => panic!("CRITICAL: {:?} is not an expression", node.token()),
        }
    }

    /// Pops both integer operands, applies `op`, and pushes the result.
    fn integer_op(&mut self, op: BinaryOperator) {
        use BinaryOperator::*;
        self.code.push(Inst::Pop(reg(Reg32::Ebx)));
        self.code.push(Inst::Pop(reg(Reg32::Eax)));
        match op {
            Add => self.code.push(Inst::Add(reg(Reg32::Eax), reg(Reg32::Ebx))),
            Sub => self.code.push(Inst::Sub(reg(Reg32::Eax), reg(Reg32::Ebx))),
            Mul => self.code.push(Inst::IMul(reg(Reg32::Eax), reg(Reg32::Ebx))),
            IntDiv => {
                self.code.push(Inst::Cdq);
                self.code.push(Inst::IDiv(Reg32::Ebx));
            }
            Mod => {
                self.code.push(Inst::Cdq);
                self.code.push(Inst::IDiv(Reg32::Ebx));
                self.code.push(Inst::Push(reg(Reg32::Edx)));
                return;
            }
            Shl => {
                self.code.push(Inst::Mov(reg(Reg32::Ecx), reg(Reg32::Ebx)));
                self.code.push(Inst::Shl(Reg32::Eax, Reg8::Cl));
            }
            Shr => {
                self.code.push(Inst::Mov(reg(Reg32::Ecx), reg(Reg32::Ebx)));
                self.code.push(Inst::Shr(Reg32::Eax, Reg8::Cl));
            }
            And => self.code.push(Inst::And(reg(Reg32::Eax), reg(Reg32::Ebx))),
            Or => self.code.push(Inst::Or(reg(Reg32::Eax), reg(Reg32::Ebx))),
            Xor => self.code.push(Inst::Xor(reg(Reg32::Eax), reg(Reg32::Ebx))),
            op => panic!("CRITICAL: {} is not an integer operator", op),
        }
        self.code.push(Inst::Push(reg(Reg32::Eax)));
    }

    fn double_op(&mut self, op: BinaryOperator) {
        use BinaryOperator::*;
        self.code.push(Inst::MovsdLoad(Xmm::Xmm1, at(Reg32::Esp, 0)));
        self.code.push(Inst::Add(reg(Reg32::Esp), imm(8)));
        self.code.push(Inst::MovsdLoad(Xmm::Xmm0, at(Reg32::Esp, 0)));
        match op {
            Add => self.code.push(Inst::Addsd(Xmm::Xmm0, Xmm::Xmm1)),
            Sub => self.code.push(Inst::Subsd(Xmm::Xmm0, Xmm::Xmm1)),
            Mul => self.code.push(Inst::Mulsd(Xmm::Xmm0, Xmm::Xmm1)),
            Div => self.code.push(Inst::Divsd(Xmm::Xmm0, Xmm::Xmm1)),
            op => panic!("CRITICAL: {} is not a double operator", op),
        }
        self.code.push(Inst::MovsdStore(at(Reg32::Esp, 0), Xmm::Xmm0));
    }

    /// Relational operators: pops both operands, pushes 1 or 0.
    fn compare(&mut self, op: BinaryOperator, left: &'p Node, right: &'p Node) {
        use BinaryOperator::*;
        let operand_ty = decay(&left.ty());
        self.expression(left);
        self.expression(right);
        match operand_ty.category() {
            Category::Integer | Category::Char => {
                if operand_ty.category() == Category::Char {
                    self.pop_char_into(Reg32::Ebx);
                    self.pop_char_into(Reg32::Eax);
                } else {
                    self.code.push(Inst::Pop(reg(Reg32::Ebx)));
                    self.code.push(Inst::Pop(reg(Reg32::Eax)));
                }
                self.code.push(Inst::Cmp(reg(Reg32::Eax), reg(Reg32::Ebx)));
                let set = match op {
                    Eq => Inst::Sete(Reg8::Al),
                    NEq => Inst::Setne(Reg8::Al),
                    Ls => Inst::Setl(Reg8::Al),
                    LsEq => Inst::Setle(Reg8::Al),
                    Gr => Inst::Setg(Reg8::Al),
                    GrEq => Inst::Setge(Reg8::Al),
                    op => panic!("CRITICAL: {} is not a comparison", op),
                };
                self.code.push(set);
            }
            Category::Double => {
                self.code.push(Inst::MovsdLoad(Xmm::Xmm1, at(Reg32::Esp, 0)));
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(8)));
                self.code.push(Inst::MovsdLoad(Xmm::Xmm0, at(Reg32::Esp, 0)));
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(8)));
                self.code.push(Inst::Ucomisd(Xmm::Xmm0, Xmm::Xmm1));
                // ucomisd sets the unsigned style flags; equality has to
                // reject the unordered (NaN) outcome via the parity flag
                match op {
                    Eq => {
                        self.code.push(Inst::Sete(Reg8::Al));
                        self.code.push(Inst::Setnp(Reg8::Bl));
                        self.code.push(Inst::And(reg8(Reg8::Al), reg8(Reg8::Bl)));
                    }
                    NEq => {
                        self.code.push(Inst::Setne(Reg8::Al));
                        self.code.push(Inst::Setp(Reg8::Bl));
                        self.code.push(Inst::Or(reg8(Reg8::Al), reg8(Reg8::Bl)));
                    }
                    Ls => self.code.push(Inst::Setb(Reg8::Al)),
                    LsEq => self.code.push(Inst::Setbe(Reg8::Al)),
                    Gr => self.code.push(Inst::Seta(Reg8::Al)),
                    GrEq => self.code.push(Inst::Setae(Reg8::Al)),
                    op => panic!("CRITICAL: {} is not a comparison", op),
                }
            }
            category => panic!("CRITICAL: comparing {:?} operands", category),
        }
        self.code.push(Inst::Movzx(reg(Reg32::Eax), reg8(Reg8::Al)));
        self.code.push(Inst::Push(reg(Reg32::Eax)));
    }

    /// Converts the value on top of the stack between scalar categories.
    fn cast(&mut self, from: Category, to: Category) {
        match (from, to) {
            (Category::Integer, Category::Double) => {
                self.code.push(Inst::Pop(reg(Reg32::Eax)));
                self.code.push(Inst::Cvtsi2sd(Xmm::Xmm0, reg(Reg32::Eax)));
                self.push_double();
            }
            (Category::Double, Category::Integer) => {
                self.code.push(Inst::MovsdLoad(Xmm::Xmm0, at(Reg32::Esp, 0)));
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(8)));
                self.code.push(Inst::Cvttsd2si(Reg32::Eax, Xmm::Xmm0));
                self.code.push(Inst::Push(reg(Reg32::Eax)));
            }
            (Category::Integer, Category::Char) => {
                self.code.push(Inst::Pop(reg(Reg32::Eax)));
                self.push_char_from(Reg8::Al);
            }
            (Category::Char, Category::Integer) => {
                self.pop_char_into(Reg32::Eax);
                self.code.push(Inst::Push(reg(Reg32::Eax)));
            }
            (Category::Char, Category::Double) => {
                self.cast(Category::Char, Category::Integer);
                self.cast(Category::Integer, Category::Double);
            }
            (Category::Double, Category::Char) => {
                self.cast(Category::Double, Category::Integer);
                self.cast(Category::Integer, Category::Char);
            }
            (from, to) if from == to => (),
            (from, to) => panic!("CRITICAL: cast from {:?} to {:?}", from, to),
        }
    }

    /// Pushes the arguments and calls the routine.  `as_statement` drops
    /// the return value instead of pushing it.
    fn call(&mut self, node: &'p Node, as_statement: bool) {
        let (token, ret, params) = match node {
            Node::FunctionCall(token, ret, params) => (token, ret, params),
            node => panic!("CRITICAL: {:?} is not a call", node.token()),
        };
        let name = match &token.sym {
            Lex::Identifier(name) => name,
            sym => panic!("CRITICAL: calling {}", sym),
        };
        let args = match params.as_ref() {
            Node::ParamList(_, _, args) => args,
            node => panic!("CRITICAL: {:?} is not an argument list", node.token()),
        };
        let (label, func) = self.resolve_routine(name);

        for (param, arg) in func.params.table().iter().zip(args.iter()) {
            if param.by_ref {
                self.addr(arg);
                self.code.push(Inst::Push(reg(Reg32::Eax)));
            } else {
                self.expression(arg);
            }
        }
        self.code.push(Inst::Call(Operand::lbl(&label)));

        if as_statement {
            return;
        }
        match ret.category() {
            Category::Integer => self.code.push(Inst::Push(reg(Reg32::Eax))),
            Category::Char => self.push_char_from(Reg8::Al),
            Category::Double => self.push_double(),
            Category::Array | Category::Record => {
                let size = ret.size();
                self.code.push(Inst::Sub(reg(Reg32::Esp), imm(size)));
                self.code
                    .push(Inst::Mov(reg(Reg32::Esi), Operand::lbl(&format!("ret_{}", label))));
                self.code.push(Inst::Mov(reg(Reg32::Edi), reg(Reg32::Esp)));
                self.copy_words(size);
            }
            category => panic!("CRITICAL: call result of {:?} used as a value", category),
        }
    }

    /// Finds the label and signature of a callable routine, searching the
    /// chain of open frames and then the program scope.
    fn resolve_routine(&self, name: &str) -> (String, &'p FunctionType) {
        for frame in self.frames.iter().rev() {
            if let Some(func) = frame.func {
                if let Some(sym) = func.locals.get(name) {
                    if let Type::Function(callee) = sym.ty.as_ref() {
                        return (format!("{}_{}", frame.label, name), callee);
                    }
                }
            }
        }
        if let Some(sym) = self.program.scope.get(name) {
            if let Type::Function(callee) = sym.ty.as_ref() {
                return (format!("fn_{}", name), callee);
            }
        }
        panic!("CRITICAL: no routine named {}", name)
    }

    /// Leaves the address of a designator in eax.
    fn addr(&mut self, node: &'p Node) {
        match node {
            Node::Var(token, _) => match &token.sym {
                Lex::Identifier(name) => self.var_addr(name),
                sym => panic!("CRITICAL: {} is not a variable", sym),
            },
            Node::Index(_, ty, base, index) => {
                let lower = match base.ty().as_ref() {
                    Type::Array(a) => a.lower,
                    ty => panic!("CRITICAL: indexing into {}", ty),
                };
                self.addr(base);
                self.code.push(Inst::Push(reg(Reg32::Eax)));
                self.expression(index);
                self.code.push(Inst::Pop(reg(Reg32::Ebx)));
                self.code.push(Inst::Pop(reg(Reg32::Eax)));
                self.code.push(Inst::Sub(reg(Reg32::Ebx), imm(lower as i32)));
                self.code.push(Inst::IMul(reg(Reg32::Ebx), imm(ty.size())));
                self.code.push(Inst::Add(reg(Reg32::Eax), reg(Reg32::Ebx)));
            }
            Node::FieldAccess(_, _, base, field) => {
                let offset = match base.ty().as_ref() {
                    Type::Record(r) => match r.fields.get(field) {
                        Some(sym) => sym.offset,
                        None => panic!("CRITICAL: no field named {}", field),
                    },
                    ty => panic!("CRITICAL: {} has no fields", ty),
                };
                self.addr(base);
                if offset != 0 {
                    self.code.push(Inst::Add(reg(Reg32::Eax), imm(offset)));
                }
            }
            node => panic!("CRITICAL: {:?} has no address", node.token()),
        }
    }

    /// Leaves the address of a named variable in eax.
    fn var_addr(&mut self, name: &str) {
        if let Some(frame) = self.frames.last() {
            if let Some(func) = frame.func {
                if let Some(sym) = func.locals.get(name) {
                    let disp = -(sym.offset + sym.stack_size());
                    self.code.push(Inst::Lea(reg(Reg32::Eax), at(Reg32::Ebp, disp)));
                    return;
                }
                if let Some(sym) = func.params.get(name) {
                    // arguments are pushed left to right, so the first
                    // parameter sits furthest from ebp
                    let disp = 8 + func.params.frame_size() - sym.offset - sym.stack_size();
                    if sym.by_ref {
                        self.code.push(Inst::Mov(reg(Reg32::Eax), at(Reg32::Ebp, disp)));
                    } else {
                        self.code.push(Inst::Lea(reg(Reg32::Eax), at(Reg32::Ebp, disp)));
                    }
                    return;
                }
            }
        }
        for frame in self.frames.iter().rev().skip(1) {
            if let Some(func) = frame.func {
                if func.locals.get(name).is_some() || func.params.get(name).is_some() {
                    panic!(
                        "CRITICAL: no access path to {} in enclosing routine {}",
                        name, func.name
                    );
                }
            }
        }
        match self.program.scope.get(name) {
            Some(sym) => {
                let disp = -(sym.offset + sym.stack_size());
                self.code.push(Inst::Mov(reg(Reg32::Eax), Operand::mem("main_frame")));
                self.code.push(Inst::Lea(reg(Reg32::Eax), at(Reg32::Eax, disp)));
            }
            None => panic!("CRITICAL: no variable named {}", name),
        }
    }

    /// Pushes the value at `[eax]` onto the stack.
    fn push_from_addr(&mut self, ty: &TypeRef) {
        match ty.category() {
            Category::Integer => self.code.push(Inst::Push(at(Reg32::Eax, 0))),
            Category::Char => {
                self.code.push(Inst::Movzx(reg(Reg32::Ebx), at(Reg32::Eax, 0)));
                self.push_char_from(Reg8::Bl);
            }
            Category::Double => {
                self.code.push(Inst::MovsdLoad(Xmm::Xmm0, at(Reg32::Eax, 0)));
                self.push_double();
            }
            Category::Array | Category::Record => {
                let size = ty.size();
                self.code.push(Inst::Mov(reg(Reg32::Esi), reg(Reg32::Eax)));
                self.code.push(Inst::Sub(reg(Reg32::Esp), imm(size)));
                self.code.push(Inst::Mov(reg(Reg32::Edi), reg(Reg32::Esp)));
                self.copy_words(size);
            }
            category => panic!("CRITICAL: loading a {:?}", category),
        }
    }

    /// Pops the value on top of the stack into `[eax]`.
    fn pop_to_addr(&mut self, ty: &TypeRef) {
        match ty.category() {
            Category::Integer => {
                self.code.push(Inst::Pop(reg(Reg32::Ebx)));
                self.code.push(Inst::Mov(at(Reg32::Eax, 0), reg(Reg32::Ebx)));
            }
            Category::Char => {
                self.code.push(Inst::Movzx(reg(Reg32::Ebx), at(Reg32::Esp, 0)));
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(1)));
                self.code.push(Inst::Mov(at(Reg32::Eax, 0), reg8(Reg8::Bl)));
            }
            Category::Double => {
                self.code.push(Inst::MovsdLoad(Xmm::Xmm0, at(Reg32::Esp, 0)));
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(8)));
                self.code.push(Inst::MovsdStore(at(Reg32::Eax, 0), Xmm::Xmm0));
            }
            Category::Array | Category::Record => {
                let size = ty.size();
                self.code.push(Inst::Mov(reg(Reg32::Edi), reg(Reg32::Eax)));
                self.code.push(Inst::Mov(reg(Reg32::Esi), reg(Reg32::Esp)));
                self.copy_words(size);
                self.code.push(Inst::Add(reg(Reg32::Esp), imm(size)));
            }
            category => panic!("CRITICAL: storing a {:?}", category),
        }
    }

    /// `rep movsd` for a size which is always word rounded.
    fn copy_words(&mut self, size: i32) {
        self.code.push(Inst::Mov(reg(Reg32::Ecx), imm(size / 4)));
        self.code.push(Inst::RepMovsd);
    }

    fn push_double(&mut self) {
        self.code.push(Inst::Sub(reg(Reg32::Esp), imm(8)));
        self.code.push(Inst::MovsdStore(at(Reg32::Esp, 0), Xmm::Xmm0));
    }

    fn push_char_from(&mut self, r: Reg8) {
        self.code.push(Inst::Sub(reg(Reg32::Esp), imm(1)));
        self.code.push(Inst::Mov(at(Reg32::Esp, 0), reg8(r)));
    }

    fn pop_char_into(&mut self, r: Reg32) {
        self.code.push(Inst::Movzx(
            Operand::Direct(DirectOperand::Register(Reg::R32(r))),
            at(Reg32::Esp, 0),
        ));
        self.code.push(Inst::Add(reg(Reg32::Esp), imm(1)));
    }

    fn new_label(&mut self) -> String {
        let label = format!(".L{}", self.label_count);
        self.label_count += 1;
        label
    }

    fn double_label(&mut self, d: f64) -> String {
        let label = format!("dbl_{}", self.label_count);
        self.label_count += 1;
        self.data.push(Inst::DataDouble(label.clone(), d));
        label
    }

    fn string_label(&mut self, s: &str) -> String {
        let label = format!("str_{}", self.label_count);
        self.label_count += 1;
        let escaped = s.replace('\\', "\\\\").replace('`', "\\`");
        self.data.push(Inst::DataString(label.clone(), escaped));
        label
    }
}
