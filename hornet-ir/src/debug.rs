use std::fmt::{Debug, Display, Error, Formatter};

use super::*;

impl Debug for KVar {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "${}", self.0)
    }
}

impl Display for KVar {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "${}", self.0)
    }
}

impl Debug for ConstraintId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "c{}", self.index)
    }
}

impl Debug for BindId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "b{}", self.index)
    }
}

impl Debug for Sort {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Sort::Int => write!(fmt, "int"),
            Sort::Bool => write!(fmt, "bool"),
            Sort::Real => write!(fmt, "real"),
            Sort::Str => write!(fmt, "str"),
            Sort::Obj(s) => write!(fmt, "{}", s),
            Sort::Func(args, ret) => {
                write!(fmt, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "{:?}", a)?;
                }
                write!(fmt, ") -> {:?}", ret)
            }
        }
    }
}

impl Debug for Subst {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "[")?;
        for (i, (sym, e)) in self.iter().enumerate() {
            if i > 0 {
                write!(fmt, ", ")?;
            }
            write!(fmt, "{}:={:?}", sym, e)?;
        }
        write!(fmt, "]")
    }
}

impl Debug for Qualifier {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "qualif {}(", self.name)?;
        for (i, (sym, sort)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(fmt, ", ")?;
            }
            write!(fmt, "{}:{:?}", sym, sort)?;
        }
        write!(fmt, "): {:?}", self.body)
    }
}

impl BinOp {
    fn glyph(self) -> &'static str {
        match self {
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Times => "*",
            BinOp::Div => "/",
            BinOp::Mod => "mod",
        }
    }
}

impl Rel {
    fn glyph(self) -> &'static str {
        match self {
            Rel::Eq => "=",
            Rel::Ne => "!=",
            Rel::Gt => ">",
            Rel::Ge => ">=",
            Rel::Lt => "<",
            Rel::Le => "<=",
        }
    }
}

impl Debug for Expr {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Expr::Var(s) => write!(fmt, "{}", s),
            Expr::Int(n) => write!(fmt, "{}", n),
            Expr::Bool(b) => write!(fmt, "{}", b),
            Expr::Bin(op, a, b) => write!(fmt, "({:?} {} {:?})", a, op.glyph(), b),
            Expr::App(f, args) => {
                write!(fmt, "{}(", f)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "{:?}", a)?;
                }
                write!(fmt, ")")
            }
            Expr::Atom(rel, a, b) => write!(fmt, "({:?} {} {:?})", a, rel.glyph(), b),
            Expr::And(ps) => write_joined(fmt, ps, " && "),
            Expr::Or(ps) => write_joined(fmt, ps, " || "),
            Expr::Not(p) => write!(fmt, "!{:?}", p),
            Expr::Imp(p, q) => write!(fmt, "({:?} => {:?})", p, q),
            Expr::Iff(p, q) => write!(fmt, "({:?} <=> {:?})", p, q),
            Expr::KVar(k, su) => {
                if su.is_empty() {
                    write!(fmt, "{:?}", k)
                } else {
                    write!(fmt, "{:?}{:?}", k, su)
                }
            }
            Expr::Forall(binders, body) => write_quant(fmt, "forall", binders, body),
            Expr::Exists(binders, body) => write_quant(fmt, "exists", binders, body),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), Error> {
        write!(fmt, "{:?}", self)
    }
}

fn write_joined(fmt: &mut Formatter<'_>, ps: &[Expr], sep: &str) -> Result<(), Error> {
    write!(fmt, "(")?;
    for (i, p) in ps.iter().enumerate() {
        if i > 0 {
            write!(fmt, "{}", sep)?;
        }
        write!(fmt, "{:?}", p)?;
    }
    write!(fmt, ")")
}

fn write_quant(
    fmt: &mut Formatter<'_>,
    word: &str,
    binders: &[(Symbol, Sort)],
    body: &Expr,
) -> Result<(), Error> {
    write!(fmt, "({} ", word)?;
    for (i, (sym, sort)) in binders.iter().enumerate() {
        if i > 0 {
            write!(fmt, ", ")?;
        }
        write!(fmt, "{}:{:?}", sym, sort)?;
    }
    write!(fmt, " . {:?})", body)
}
