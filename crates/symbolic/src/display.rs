use std::fmt::{self, Display, Formatter, Write};

use crate::{Expr, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Sum,
    Product,
    Power,
    Atom,
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_expr(f, self, Prec::Sum)
    }
}

fn precedence(expr: &Expr) -> Prec {
    match expr.node() {
        Node::Num(v) if *v < 0.0 => Prec::Sum,
        Node::Num(_) | Node::Sym(_) | Node::Apply(..) => Prec::Atom,
        Node::Add(_) => Prec::Sum,
        Node::Mul(_) => Prec::Product,
        Node::Pow(..) => Prec::Power,
    }
}

fn write_expr(f: &mut Formatter<'_>, expr: &Expr, context: Prec) -> fmt::Result {
    let own = precedence(expr);
    let parens = own < context || (context == Prec::Power && own == Prec::Power);
    if parens {
        f.write_char('(')?;
    }

    match expr.node() {
        Node::Num(v) => write_number(f, *v)?,
        Node::Sym(s) => write!(f, "{s}")?,
        Node::Add(terms) => write_sum(f, terms)?,
        Node::Mul(factors) => write_product(f, factors)?,
        Node::Pow(base, exp) => {
            write_expr(f, base, Prec::Power)?;
            f.write_char('^')?;
            write_expr(f, exp, Prec::Power)?;
        }
        Node::Apply(func, arg) => {
            write!(f, "{func}(")?;
            write_expr(f, arg, Prec::Sum)?;
            f.write_char(')')?;
        }
    }

    if parens {
        f.write_char(')')?;
    }
    Ok(())
}

fn write_number(f: &mut Formatter<'_>, v: f64) -> fmt::Result {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        write!(f, "{v:.0}")
    } else {
        write!(f, "{v}")
    }
}

fn write_sum(f: &mut Formatter<'_>, terms: &[Expr]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        let (c, rest) = term.split_coefficient();
        if i == 0 {
            write_expr(f, term, Prec::Sum)?;
            continue;
        }
        if c < 0.0 {
            f.write_str(" - ")?;
            let positive = if rest.is_one() {
                Expr::num(-c)
            } else {
                Expr::product([Expr::num(-c), rest])
            };
            write_expr(f, &positive, Prec::Product)?;
        } else {
            f.write_str(" + ")?;
            write_expr(f, term, Prec::Product)?;
        }
    }
    Ok(())
}

fn write_product(f: &mut Formatter<'_>, factors: &[Expr]) -> fmt::Result {
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    let mut negative = false;

    for factor in factors {
        match factor.node() {
            Node::Num(v) if *v == -1.0 => negative = true,
            Node::Pow(base, exp) if exp.as_num().is_some_and(|e| e < 0.0) => {
                denominator.push(base.pow(-exp));
            }
            _ => numerator.push(factor.clone()),
        }
    }

    if negative {
        f.write_char('-')?;
    }
    if numerator.is_empty() {
        f.write_char('1')?;
    }
    for (i, factor) in numerator.iter().enumerate() {
        if i > 0 {
            f.write_char('*')?;
        }
        // A leading coefficient stays bare even when negative.
        match factor.as_num() {
            Some(v) if i == 0 => write_number(f, v)?,
            _ => write_expr(f, factor, Prec::Product)?,
        }
    }

    match denominator.len() {
        0 => Ok(()),
        1 => {
            f.write_char('/')?;
            let single = &denominator[0];
            let context = if matches!(single.node(), Node::Pow(..)) {
                Prec::Product
            } else {
                Prec::Power
            };
            write_expr(f, single, context)
        }
        _ => {
            f.write_str("/(")?;
            for (i, factor) in denominator.iter().enumerate() {
                if i > 0 {
                    f.write_char('*')?;
                }
                write_expr(f, factor, Prec::Product)?;
            }
            f.write_char(')')
        }
    }
}
