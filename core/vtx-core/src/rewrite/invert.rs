//! 쓰기 역변환
//!
//! 뷰 컬럼 정의식 `f(a)`와 대입 값 `v`에서 실제 컬럼 `a`에 들어갈 값을
//! 구한다. 상수 피연산자가 하나뿐인 사칙 연산과 단항 마이너스만 역변환한다.

use crate::sql::ast::visit::{VisitorMut, Walk, walk_expr_mut};
use crate::sql::ast::*;
use crate::types::Value;

/// 역변환 템플릿의 값 자리
pub fn value_placeholder() -> Expr {
    Expr::Name(NameRef::new("?").with_meta(NameMeta::Parameter))
}

fn operand(expr: Expr) -> Expr {
    if expr.is_compound() {
        Expr::Nested(Box::new(expr))
    } else {
        expr
    }
}

fn is_zero(expr: &Expr) -> bool {
    match expr.strip_nested() {
        Expr::Value(Value::Int(0)) => true,
        Expr::Value(Value::Float(f)) => *f == 0.0,
        _ => false,
    }
}

/// `expr = value`를 만족하는 (실제 컬럼, 값): 역변환할 수 없으면 `None`
pub fn invert(expr: &Expr, value: Expr) -> Option<(NameRef, Expr)> {
    match expr {
        Expr::Name(n) if !n.is_oid() && n.meta != NameMeta::Parameter => Some((n.clone(), value)),
        Expr::Nested(inner) => invert(inner, value),
        Expr::Unary {
            op: UnaryOp::Minus,
            expr: inner,
        } => invert(
            inner,
            Expr::Unary {
                op: UnaryOp::Minus,
                expr: Box::new(operand(value)),
            },
        ),
        Expr::Binary { op, left, right } => {
            let (l_const, r_const) = (left.is_constant(), right.is_constant());
            if l_const == r_const {
                return None;
            }
            let v = operand(value);
            match (op, r_const) {
                // a + c, c + a
                (BinaryOp::Plus, true) => {
                    invert(left, Expr::binary(BinaryOp::Minus, v, operand(*right.clone())))
                }
                (BinaryOp::Plus, false) => {
                    invert(right, Expr::binary(BinaryOp::Minus, v, operand(*left.clone())))
                }
                // a - c, c - a
                (BinaryOp::Minus, true) => {
                    invert(left, Expr::binary(BinaryOp::Plus, v, operand(*right.clone())))
                }
                (BinaryOp::Minus, false) => {
                    invert(right, Expr::binary(BinaryOp::Minus, operand(*left.clone()), v))
                }
                // a * c, c * a
                (BinaryOp::Multiply, true) if !is_zero(right) => {
                    invert(left, Expr::binary(BinaryOp::Divide, v, operand(*right.clone())))
                }
                (BinaryOp::Multiply, false) if !is_zero(left) => {
                    invert(right, Expr::binary(BinaryOp::Divide, v, operand(*left.clone())))
                }
                // a / c
                (BinaryOp::Divide, true) if !is_zero(right) => {
                    invert(left, Expr::binary(BinaryOp::Multiply, v, operand(*right.clone())))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// 템플릿의 값 자리에 실제 값을 넣는다
pub fn instantiate(template: &Expr, value: &Expr) -> Expr {
    struct Fill<'a> {
        value: &'a Expr,
        depth: u32,
    }
    impl VisitorMut for Fill<'_> {
        fn enter_expr(&mut self, expr: &mut Expr) -> Walk {
            self.depth += 1;
            if let Expr::Name(n) = expr {
                if n.meta == NameMeta::Parameter {
                    let filled = self.value.clone();
                    *expr = if self.depth > 1 { operand(filled) } else { filled };
                    return Walk::Skip;
                }
            }
            Walk::Continue
        }

        fn leave_expr(&mut self, _expr: &mut Expr) {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    let mut out = template.clone();
    let _ = walk_expr_mut(&mut Fill { value, depth: 0 }, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sal() -> Expr {
        Expr::Name(NameRef::bound("sal", SpecId(1), "e"))
    }

    fn solve(def: Expr) -> Option<String> {
        invert(&def, value_placeholder()).map(|(name, template)| {
            format!("{} := {}", name, instantiate(&template, &Expr::int(120)))
        })
    }

    #[test]
    fn test_invert_bare_name() {
        assert_eq!(solve(sal()).as_deref(), Some("e.sal := 120"));
    }

    #[test]
    fn test_invert_linear_expressions() {
        let c = || Expr::int(10);
        assert_eq!(
            solve(Expr::binary(BinaryOp::Plus, sal(), c())).as_deref(),
            Some("e.sal := 120 - 10")
        );
        assert_eq!(
            solve(Expr::binary(BinaryOp::Plus, c(), sal())).as_deref(),
            Some("e.sal := 120 - 10")
        );
        assert_eq!(
            solve(Expr::binary(BinaryOp::Minus, sal(), c())).as_deref(),
            Some("e.sal := 120 + 10")
        );
        assert_eq!(
            solve(Expr::binary(BinaryOp::Minus, c(), sal())).as_deref(),
            Some("e.sal := 10 - 120")
        );
        assert_eq!(
            solve(Expr::binary(BinaryOp::Multiply, sal(), c())).as_deref(),
            Some("e.sal := 120 / 10")
        );
        assert_eq!(
            solve(Expr::binary(BinaryOp::Divide, sal(), c())).as_deref(),
            Some("e.sal := 120 * 10")
        );
    }

    #[test]
    fn test_invert_nested_composition() {
        // (sal * 12) + 100 = v  ⇒  sal = (v - 100) / 12
        let def = Expr::binary(
            BinaryOp::Plus,
            Expr::Nested(Box::new(Expr::binary(BinaryOp::Multiply, sal(), Expr::int(12)))),
            Expr::int(100),
        );
        assert_eq!(solve(def).as_deref(), Some("e.sal := (120 - 100) / 12"));

        let neg = Expr::Unary {
            op: UnaryOp::Minus,
            expr: Box::new(sal()),
        };
        assert_eq!(solve(neg).as_deref(), Some("e.sal := -120"));
    }

    #[test]
    fn test_not_invertible() {
        assert!(solve(Expr::binary(BinaryOp::Divide, Expr::int(10), sal())).is_none());
        assert!(solve(Expr::binary(BinaryOp::Multiply, sal(), Expr::int(0))).is_none());
        assert!(solve(Expr::binary(BinaryOp::Plus, sal(), sal())).is_none());
        assert!(solve(Expr::int(3)).is_none());
        assert!(solve(Expr::Name(NameRef::oid(SpecId(1), "e", None))).is_none());
        let sum = Expr::Function(FunctionCall {
            name: "sum".into(),
            args: vec![sal()],
            kind: FunctionKind::Aggregate,
            distinct: false,
            star: false,
            over: None,
        });
        assert!(solve(sum).is_none());
    }
}
