use std::{
    iter::{Product, Sum},
    ops::{Add, Div, Mul, Neg, Sub},
};

use crate::Symbol;

use super::Expr;

fn add(lhs: &Expr, rhs: &Expr) -> Expr {
    Expr::sum([lhs.clone(), rhs.clone()])
}

fn sub(lhs: &Expr, rhs: &Expr) -> Expr {
    Expr::sum([lhs.clone(), negate(rhs)])
}

fn mul(lhs: &Expr, rhs: &Expr) -> Expr {
    Expr::product([lhs.clone(), rhs.clone()])
}

fn div(lhs: &Expr, rhs: &Expr) -> Expr {
    Expr::product([lhs.clone(), rhs.recip()])
}

fn negate(expr: &Expr) -> Expr {
    Expr::product([Expr::num(-1.0), expr.clone()])
}

macro_rules! binary_op {
    ($op:ident, $method:ident, $impl:path) => {
        impl $op<Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                $impl(&self, &rhs)
            }
        }

        impl $op<&Expr> for Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                $impl(&self, rhs)
            }
        }

        impl $op<Expr> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                $impl(self, &rhs)
            }
        }

        impl $op<&Expr> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                $impl(self, rhs)
            }
        }

        impl $op<f64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                $impl(&self, &Expr::num(rhs))
            }
        }

        impl $op<f64> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                $impl(self, &Expr::num(rhs))
            }
        }

        impl $op<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                $impl(&Expr::num(self), &rhs)
            }
        }

        impl $op<&Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                $impl(&Expr::num(self), rhs)
            }
        }
    };
}

binary_op!(Add, add, add);
binary_op!(Sub, sub, sub);
binary_op!(Mul, mul, mul);
binary_op!(Div, div, div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        negate(&self)
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        negate(self)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::num(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::num(f64::from(value))
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::sym(&symbol)
    }
}

impl From<&Symbol> for Expr {
    fn from(symbol: &Symbol) -> Self {
        Expr::sym(symbol)
    }
}

impl Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Self {
        Expr::sum(iter)
    }
}

impl Product for Expr {
    fn product<I: Iterator<Item = Expr>>(iter: I) -> Self {
        Expr::product(iter)
    }
}

#[cfg(test)]
mod tests {
    use crate::symbols;

    use super::*;

    #[test]
    fn operators_mix_owned_borrowed_and_scalars() {
        let s = symbols("a b");
        let a = Expr::sym(&s[0]);
        let b = Expr::sym(&s[1]);

        let e = (&a + 1.0) * 2.0 - 2.0 * (Expr::num(1.0) + &a);

        assert!(e.is_zero());
        assert_eq!(-(-&b), b);
        assert_eq!(&a / &a, Expr::one());
    }

    #[test]
    fn sum_and_product_iterators() {
        let s = symbols("a");
        let a = Expr::sym(&s[0]);

        let total: Expr = (0..3).map(|_| a.clone()).sum();
        let cube: Expr = (0..3).map(|_| a.clone()).product();

        assert_eq!(total, 3.0 * &a);
        assert_eq!(cube, a.powi(3));
    }
}
