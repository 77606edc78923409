use std::fmt::{self, Display, Formatter};
use std::io;

/*
NASM text is produced from a flat vector of `Inst` values.  The Display
implementations below own all of the formatting rules:

- non-local labels get a separating blank line before them
- directives and labels start at column one, instructions are indented
- a memory or immediate operand gets a size keyword wherever NASM cannot
  infer the operand size from a register

The output targets the io.inc macro set (PRINT_DEC, PRINT_CHAR,
PRINT_STRING, GET_DEC, GET_CHAR) and a CMAIN entry point.
*/

#[derive(Clone, Copy)]
pub enum Reg8 {
    Al,
    Bl,
    Cl,
}

impl Display for Reg8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Reg8::*;
        match self {
            Al => f.write_str("al"),
            Bl => f.write_str("bl"),
            Cl => f.write_str("cl"),
        }
    }
}

#[derive(Clone, Copy)]
pub enum Reg32 {
    Eax,
    Ecx,
    Edx,
    Ebx,
    Esp,
    Ebp,
    Edi,
    Esi,
}

impl Display for Reg32 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Reg32::*;
        match self {
            Eax => f.write_str("eax"),
            Ecx => f.write_str("ecx"),
            Edx => f.write_str("edx"),
            Ebx => f.write_str("ebx"),
            Esp => f.write_str("esp"),
            Ebp => f.write_str("ebp"),
            Edi => f.write_str("edi"),
            Esi => f.write_str("esi"),
        }
    }
}

#[derive(Clone, Copy)]
pub enum Xmm {
    Xmm0,
    Xmm1,
}

impl Display for Xmm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Xmm::*;
        match self {
            Xmm0 => f.write_str("xmm0"),
            Xmm1 => f.write_str("xmm1"),
        }
    }
}

#[derive(Clone, Copy)]
pub enum Reg {
    R8(Reg8),
    R32(Reg32),
}

impl Display for Reg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Reg::*;
        match self {
            R8(r8) => f.write_fmt(format_args!("{}", r8)),
            R32(r32) => f.write_fmt(format_args!("{}", r32)),
        }
    }
}

#[derive(Clone)]
pub enum DirectOperand {
    Integer(i32),
    Register(Reg),
    Label(String),
}

impl Display for DirectOperand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use DirectOperand::*;
        match self {
            Integer(i) => f.write_fmt(format_args!("{}", i)),
            Register(reg) => f.write_fmt(format_args!("{}", reg)),
            Label(lbl) => f.write_fmt(format_args!("{}", lbl)),
        }
    }
}

#[derive(Clone)]
pub enum Operand {
    Direct(DirectOperand),
    Memory(DirectOperand),
    MemoryAddr(Reg32, i32),
}

impl Operand {
    pub fn reg(r: Reg32) -> Operand {
        Operand::Direct(DirectOperand::Register(Reg::R32(r)))
    }

    pub fn imm(i: i32) -> Operand {
        Operand::Direct(DirectOperand::Integer(i))
    }

    pub fn lbl(l: &str) -> Operand {
        Operand::Direct(DirectOperand::Label(l.into()))
    }

    pub fn mem(l: &str) -> Operand {
        Operand::Memory(DirectOperand::Label(l.into()))
    }

    fn is_memory(&self) -> bool {
        matches!(self, Operand::Memory(_) | Operand::MemoryAddr(_, _))
    }

    /// The operand with a DWORD keyword when NASM could not infer its
    /// size from the other operand.
    fn sized(&self) -> String {
        match self {
            Operand::Direct(DirectOperand::Integer(_)) => format!("DWORD {}", self),
            _ if self.is_memory() => format!("DWORD {}", self),
            _ => format!("{}", self),
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Operand::*;
        match self {
            Direct(d) => f.write_fmt(format_args!("{}", d)),
            Memory(mem) => f.write_fmt(format_args!("[{}]", mem)),
            MemoryAddr(reg, d) => {
                if *d < 0 {
                    f.write_fmt(format_args!("[{}-{}]", reg, -d))
                } else if *d > 0 {
                    f.write_fmt(format_args!("[{}+{}]", reg, d))
                } else {
                    f.write_fmt(format_args!("[{}]", reg))
                }
            }
        }
    }
}

#[derive(Clone)]
pub enum Inst {
    Comment(String),
    Include(String),
    Section(String),
    Global(String),
    Data(String, i32),
    DataDouble(String, f64),
    DataString(String, String),
    /// `times n db 0`, a zeroed buffer of n bytes.
    DataBuffer(String, i32),
    Label(String),

    Jmp(Operand),
    Jz(Operand),
    Jg(Operand),
    Jl(Operand),
    Call(Operand),
    Ret,
    /// `ret n`, popping the arguments the caller pushed.
    RetN(i32),
    Cdq,

    Push(Operand),
    Pop(Operand),
    Mov(Operand, Operand),
    Movzx(Operand, Operand),
    Lea(Operand, Operand),

    Add(Operand, Operand),
    Sub(Operand, Operand),
    IMul(Operand, Operand),
    IDiv(Reg32),
    Neg(Reg32),
    Not(Reg32),
    Shl(Reg32, Reg8),
    Shr(Reg32, Reg8),

    Cmp(Operand, Operand),

    And(Operand, Operand),
    Or(Operand, Operand),
    Xor(Operand, Operand),

    Sete(Reg8),
    Setne(Reg8),
    Setl(Reg8),
    Setle(Reg8),
    Setg(Reg8),
    Setge(Reg8),
    Seta(Reg8),
    Setae(Reg8),
    Setb(Reg8),
    Setbe(Reg8),
    Setp(Reg8),
    Setnp(Reg8),

    MovsdLoad(Xmm, Operand),
    MovsdStore(Operand, Xmm),
    Addsd(Xmm, Xmm),
    Subsd(Xmm, Xmm),
    Mulsd(Xmm, Xmm),
    Divsd(Xmm, Xmm),
    Ucomisd(Xmm, Xmm),
    Cvtsi2sd(Xmm, Operand),
    Cvttsd2si(Reg32, Xmm),

    /// Copies ecx dwords from [esi] to [edi].
    RepMovsd,

    PrintDec(i32, Operand),
    PrintChar(Operand),
    PrintStr(Operand),
    ReadDec(i32, Operand),
    ReadChar(Operand),
}

impl Display for Inst {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Inst::*;

        // separating newline before non-local labels
        match self {
            Label(lbl) if !lbl.starts_with('.') => f.write_str("\n")?,
            _ => (),
        };

        // indent everything which is not a directive or label
        match self {
            Label(_) | Include(_) | Global(_) | Section(_) => (),
            _ => f.write_str("    ")?,
        };

        match self {
            Comment(comment) => f.write_fmt(format_args!("; {}", comment)),
            Include(inc) => f.write_fmt(format_args!("%include \"{}\"", inc)),
            Section(section) => f.write_fmt(format_args!("\nsection {}", section)),
            Global(global) => f.write_fmt(format_args!("global {}", global)),
            Data(lbl, value) => f.write_fmt(format_args!("{}: dd {}", lbl, value)),
            DataDouble(lbl, value) => f.write_fmt(format_args!("{}: dq {:?}", lbl, value)),
            DataString(lbl, value) => f.write_fmt(format_args!("{}: db `{}`,0", lbl, value)),
            DataBuffer(lbl, size) => f.write_fmt(format_args!("{}: times {} db 0", lbl, size)),
            Label(lbl) => f.write_fmt(format_args!("{}:", lbl)),

            Jmp(a) => f.write_fmt(format_args!("jmp {}", a)),
            Jz(a) => f.write_fmt(format_args!("jz {}", a)),
            Jg(a) => f.write_fmt(format_args!("jg {}", a)),
            Jl(a) => f.write_fmt(format_args!("jl {}", a)),
            Call(a) => f.write_fmt(format_args!("call {}", a)),
            Ret => f.write_str("ret"),
            RetN(n) => f.write_fmt(format_args!("ret {}", n)),
            Cdq => f.write_str("cdq"),

            Push(a) if a.is_memory() => f.write_fmt(format_args!("push DWORD {}", a)),
            Push(a) => f.write_fmt(format_args!("push {}", a)),
            Pop(a) => f.write_fmt(format_args!("pop {}", a)),

            Mov(a, b) if a.is_memory() && matches!(b, Operand::Direct(DirectOperand::Register(_))) => {
                f.write_fmt(format_args!("mov {}, {}", a, b))
            }
            Mov(a, b) if a.is_memory() => f.write_fmt(format_args!("mov DWORD {}, {}", a, b)),
            Mov(a, b) => f.write_fmt(format_args!("mov {}, {}", a, b)),
            Movzx(a, b) => f.write_fmt(format_args!(
                "movzx {}, {}",
                a,
                if b.is_memory() {
                    format!("BYTE {}", b)
                } else {
                    format!("{}", b)
                }
            )),
            Lea(a, b) => f.write_fmt(format_args!("lea {}, {}", a, b)),

            Add(a, b) if a.is_memory() => f.write_fmt(format_args!("add DWORD {}, {}", a, b)),
            Add(a, b) => f.write_fmt(format_args!("add {}, {}", a, b)),
            Sub(a, b) if a.is_memory() => f.write_fmt(format_args!("sub DWORD {}, {}", a, b)),
            Sub(a, b) => f.write_fmt(format_args!("sub {}, {}", a, b)),
            IMul(a, b) => f.write_fmt(format_args!("imul {}, {}", a, b)),
            IDiv(a) => f.write_fmt(format_args!("idiv {}", a)),
            Neg(a) => f.write_fmt(format_args!("neg {}", a)),
            Not(a) => f.write_fmt(format_args!("not {}", a)),
            Shl(a, b) => f.write_fmt(format_args!("shl {}, {}", a, b)),
            Shr(a, b) => f.write_fmt(format_args!("shr {}, {}", a, b)),

            Cmp(a, b) => f.write_fmt(format_args!("cmp {}, {}", a, b.sized())),
            And(a, b) => f.write_fmt(format_args!("and {}, {}", a, b)),
            Or(a, b) => f.write_fmt(format_args!("or {}, {}", a, b)),
            Xor(a, b) => f.write_fmt(format_args!("xor {}, {}", a, b)),

            Sete(a) => f.write_fmt(format_args!("sete {}", a)),
            Setne(a) => f.write_fmt(format_args!("setne {}", a)),
            Setl(a) => f.write_fmt(format_args!("setl {}", a)),
            Setle(a) => f.write_fmt(format_args!("setle {}", a)),
            Setg(a) => f.write_fmt(format_args!("setg {}", a)),
            Setge(a) => f.write_fmt(format_args!("setge {}", a)),
            Seta(a) => f.write_fmt(format_args!("seta {}", a)),
            Setae(a) => f.write_fmt(format_args!("setae {}", a)),
            Setb(a) => f.write_fmt(format_args!("setb {}", a)),
            Setbe(a) => f.write_fmt(format_args!("setbe {}", a)),
            Setp(a) => f.write_fmt(format_args!("setp {}", a)),
            Setnp(a) => f.write_fmt(format_args!("setnp {}", a)),

            MovsdLoad(a, b) => f.write_fmt(format_args!("movsd {}, {}", a, b)),
            MovsdStore(a, b) => f.write_fmt(format_args!("movsd {}, {}", a, b)),
            Addsd(a, b) => f.write_fmt(format_args!("addsd {}, {}", a, b)),
            Subsd(a, b) => f.write_fmt(format_args!("subsd {}, {}", a, b)),
            Mulsd(a, b) => f.write_fmt(format_args!("mulsd {}, {}", a, b)),
            Divsd(a, b) => f.write_fmt(format_args!("divsd {}, {}", a, b)),
            Ucomisd(a, b) => f.write_fmt(format_args!("ucomisd {}, {}", a, b)),
            Cvtsi2sd(a, b) => f.write_fmt(format_args!("cvtsi2sd {}, {}", a, b.sized())),
            Cvttsd2si(a, b) => f.write_fmt(format_args!("cvttsd2si {}, {}", a, b)),

            RepMovsd => f.write_str("rep movsd"),

            PrintDec(size, a) => f.write_fmt(format_args!("PRINT_DEC {}, {}", size, a)),
            PrintChar(a) => f.write_fmt(format_args!("PRINT_CHAR {}", a)),
            PrintStr(a) => f.write_fmt(format_args!("PRINT_STRING {}", a)),
            ReadDec(size, a) => f.write_fmt(format_args!("GET_DEC {}, {}", size, a)),
            ReadChar(a) => f.write_fmt(format_args!("GET_CHAR {}", a)),
        }
    }
}

/// Writes the instruction vector as a NASM listing.
pub fn print(code: &[Inst], output: &mut dyn io::Write) -> io::Result<()> {
    for inst in code {
        writeln!(output, "{}", inst)?;
    }
    Ok(())
}
