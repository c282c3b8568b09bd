//! Canonical SMT-LIB2 serialisation. The serialiser is a pure function
//! of the command so that the same command always produces the same
//! line, whichever solver variant is listening.

use hornet_ir::{BinOp, Expr, Rel, Sort, Symbol};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SetOption(String, String),
    DeclareSort(Symbol),
    DeclareFun(Symbol, Vec<Sort>, Sort),
    Assert(Expr),
    AssertWithTrigger(Expr, Vec<Expr>),
    Distinct(Vec<Expr>),
    Push,
    Pop,
    CheckSat,
    GetValue(Vec<Symbol>),
    GetInfo(String),
    Exit,
}

pub fn smt2(cmd: &Command) -> String {
    let mut out = String::new();
    match cmd {
        Command::SetOption(key, value) => {
            out.push_str("(set-option ");
            out.push_str(key);
            out.push(' ');
            out.push_str(value);
            out.push(')');
        }
        Command::DeclareSort(sym) => {
            out.push_str("(declare-sort ");
            out.push_str(&sym.to_string());
            out.push_str(" 0)");
        }
        Command::DeclareFun(sym, args, ret) => {
            out.push_str("(declare-fun ");
            out.push_str(&sym.to_string());
            out.push_str(" (");
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                sort_smt2(a, &mut out);
            }
            out.push_str(") ");
            sort_smt2(ret, &mut out);
            out.push(')');
        }
        Command::Assert(p) => {
            out.push_str("(assert ");
            expr_smt2(p, &mut out);
            out.push(')');
        }
        Command::AssertWithTrigger(p, triggers) => {
            out.push_str("(assert (! ");
            expr_smt2(p, &mut out);
            out.push_str(" :pattern (");
            for (i, t) in triggers.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                expr_smt2(t, &mut out);
            }
            out.push_str(")))");
        }
        Command::Distinct(es) => {
            out.push_str("(assert (distinct");
            for e in es {
                out.push(' ');
                expr_smt2(e, &mut out);
            }
            out.push_str("))");
        }
        Command::Push => out.push_str("(push 1)"),
        Command::Pop => out.push_str("(pop 1)"),
        Command::CheckSat => out.push_str("(check-sat)"),
        Command::GetValue(syms) => {
            out.push_str("(get-value (");
            for (i, s) in syms.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&s.to_string());
            }
            out.push_str("))");
        }
        Command::GetInfo(flag) => {
            out.push_str("(get-info ");
            out.push_str(flag);
            out.push(')');
        }
        Command::Exit => out.push_str("(exit)"),
    }
    out
}

fn sort_smt2(sort: &Sort, out: &mut String) {
    match sort {
        Sort::Int => out.push_str("Int"),
        Sort::Bool => out.push_str("Bool"),
        Sort::Real => out.push_str("Real"),
        Sort::Str => out.push_str("String"),
        Sort::Obj(sym) => out.push_str(&sym.to_string()),
        // Functional sorts only appear decomposed, inside declare-fun.
        Sort::Func(..) => panic!("functional sort {:?} has no ground serialisation", sort),
    }
}

fn expr_smt2(e: &Expr, out: &mut String) {
    match e {
        Expr::Var(s) => out.push_str(&s.to_string()),
        Expr::Int(n) => {
            if *n < 0 {
                out.push_str("(- ");
                out.push_str(&n.unsigned_abs().to_string());
                out.push(')');
            } else {
                out.push_str(&n.to_string());
            }
        }
        Expr::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Expr::Bin(op, a, b) => binary(op_smt2(*op), a, b, out),
        Expr::App(f, args) => {
            if args.is_empty() {
                out.push_str(&f.to_string());
            } else {
                out.push('(');
                out.push_str(&f.to_string());
                for a in args {
                    out.push(' ');
                    expr_smt2(a, out);
                }
                out.push(')');
            }
        }
        Expr::Atom(Rel::Ne, a, b) => {
            out.push_str("(not ");
            binary("=", a, b, out);
            out.push(')');
        }
        Expr::Atom(rel, a, b) => binary(rel_smt2(*rel), a, b, out),
        Expr::And(ps) => nary("and", "true", ps, out),
        Expr::Or(ps) => nary("or", "false", ps, out),
        Expr::Not(p) => {
            out.push_str("(not ");
            expr_smt2(p, out);
            out.push(')');
        }
        Expr::Imp(p, q) => binary("=>", p, q, out),
        Expr::Iff(p, q) => binary("=", p, q, out),
        Expr::KVar(k, _) => panic!("unexpanded kvar {:?} reached the solver", k),
        Expr::Forall(binders, body) => quant("forall", binders, body, out),
        Expr::Exists(binders, body) => quant("exists", binders, body, out),
    }
}

fn binary(op: &str, a: &Expr, b: &Expr, out: &mut String) {
    out.push('(');
    out.push_str(op);
    out.push(' ');
    expr_smt2(a, out);
    out.push(' ');
    expr_smt2(b, out);
    out.push(')');
}

fn nary(op: &str, empty: &str, ps: &[Expr], out: &mut String) {
    match ps {
        [] => out.push_str(empty),
        [p] => expr_smt2(p, out),
        _ => {
            out.push('(');
            out.push_str(op);
            for p in ps {
                out.push(' ');
                expr_smt2(p, out);
            }
            out.push(')');
        }
    }
}

fn quant(word: &str, binders: &[(Symbol, Sort)], body: &Expr, out: &mut String) {
    if binders.is_empty() {
        expr_smt2(body, out);
        return;
    }
    out.push('(');
    out.push_str(word);
    out.push_str(" (");
    for (i, (sym, sort)) in binders.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push('(');
        out.push_str(&sym.to_string());
        out.push(' ');
        sort_smt2(sort, out);
        out.push(')');
    }
    out.push_str(") ");
    expr_smt2(body, out);
    out.push(')');
}

fn op_smt2(op: BinOp) -> &'static str {
    match op {
        BinOp::Plus => "+",
        BinOp::Minus => "-",
        BinOp::Times => "*",
        BinOp::Div => "div",
        BinOp::Mod => "mod",
    }
}

fn rel_smt2(rel: Rel) -> &'static str {
    match rel {
        Rel::Eq => "=",
        Rel::Ne => unreachable!("Ne is serialised as a negated equality"),
        Rel::Gt => ">",
        Rel::Ge => ">=",
        Rel::Lt => "<",
        Rel::Le => "<=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hornet_ir::{p_and, p_atom, p_not, symbol};

    fn x() -> Expr {
        Expr::Var(symbol("x"))
    }

    #[test]
    fn declarations_and_scopes() {
        assert_eq!(smt2(&Command::Push), "(push 1)");
        assert_eq!(smt2(&Command::Pop), "(pop 1)");
        assert_eq!(
            smt2(&Command::DeclareFun(symbol("x"), vec![], Sort::Int)),
            "(declare-fun x () Int)"
        );
        assert_eq!(
            smt2(&Command::DeclareFun(
                symbol("f"),
                vec![Sort::Int, Sort::Bool],
                Sort::Int
            )),
            "(declare-fun f (Int Bool) Int)"
        );
    }

    #[test]
    fn refinement_bracket_transcript() {
        // The single-refinement session from the interface description.
        let lhs = p_and(vec![
            p_atom(Rel::Ge, x(), Expr::Int(0)),
            p_atom(Rel::Le, x(), Expr::Int(10)),
        ]);
        assert_eq!(
            smt2(&Command::Assert(lhs)),
            "(assert (and (>= x 0) (<= x 10)))"
        );
        let neg = p_not(p_atom(Rel::Ge, x(), Expr::Int(0)));
        assert_eq!(smt2(&Command::Assert(neg)), "(assert (not (>= x 0)))");
    }

    #[test]
    fn negative_literals_are_parenthesised() {
        let p = p_atom(Rel::Ge, x(), Expr::Int(-1));
        assert_eq!(smt2(&Command::Assert(p)), "(assert (>= x (- 1)))");
    }

    #[test]
    fn inequality_is_a_negated_equality() {
        let p = p_atom(Rel::Ne, x(), Expr::Int(0));
        assert_eq!(smt2(&Command::Assert(p)), "(assert (not (= x 0)))");
    }

    #[test]
    fn triggers_and_distinct() {
        let p = p_atom(Rel::Eq, x(), x());
        assert_eq!(
            smt2(&Command::AssertWithTrigger(p.clone(), vec![x()])),
            "(assert (! (= x x) :pattern (x)))"
        );
        assert_eq!(
            smt2(&Command::Distinct(vec![x(), Expr::Int(1)])),
            "(assert (distinct x 1))"
        );
    }

    #[test]
    fn quantifiers() {
        let body = p_atom(Rel::Ge, x(), Expr::Int(0));
        let q = Expr::Forall(vec![(symbol("x"), Sort::Int)], Box::new(body));
        assert_eq!(
            smt2(&Command::Assert(q)),
            "(assert (forall ((x Int)) (>= x 0)))"
        );
    }
}
