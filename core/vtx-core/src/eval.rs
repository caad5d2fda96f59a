//! 실제 객체 행에 대한 표현식 평가
//!
//! 뷰 컬럼 값 계산과 WITH CHECK OPTION 검사에 쓰인다. 이름은 한정자와
//! 관계없이 행의 속성 이름으로 찾고, 식별자(OID) 이름은 행의 식별자다.
//! 비교와 논리 연산은 SQL 3값 논리를 따른다 (NULL = 알 수 없음).

use crate::catalog::ObjectRow;
use crate::error::{VtxError, VtxResult};
use crate::sql::ast::*;
use crate::types::Value;
use std::cmp::Ordering;

fn unsupported(what: &str) -> VtxError {
    VtxError::Evaluation(format!("cannot evaluate {what} against a single object"))
}

/// `expr`을 `row`에 대해 평가
pub fn evaluate(expr: &Expr, row: &ObjectRow) -> VtxResult<Value> {
    match expr {
        Expr::Value(v) => Ok(v.clone()),
        Expr::Nested(inner) => evaluate(inner, row),
        Expr::Name(n) => lookup(n, row),
        Expr::Binary { op, left, right } => binary(*op, left, right, row),
        Expr::Unary { op, expr } => unary(*op, evaluate(expr, row)?),
        Expr::Function(call) => function(call, row),
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let needle = evaluate(expr, row)?;
            if needle.is_null() {
                return Ok(Value::Null);
            }
            let mut saw_null = false;
            for item in list {
                match compare(&needle, &evaluate(item, row)?)? {
                    Some(Ordering::Equal) => return Ok(Value::Bool(!negated)),
                    Some(_) => {}
                    None => saw_null = true,
                }
            }
            Ok(if saw_null { Value::Null } else { Value::Bool(*negated) })
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let v = evaluate(expr, row)?;
            let lo = compare(&v, &evaluate(low, row)?)?.map(|o| o != Ordering::Less);
            let hi = compare(&v, &evaluate(high, row)?)?.map(|o| o != Ordering::Greater);
            let inside = and3(lo, hi);
            Ok(bool3(inside.map(|b| b != *negated)))
        }
        Expr::Sequence(items) => Ok(Value::Sequence(
            items
                .iter()
                .map(|e| evaluate(e, row))
                .collect::<VtxResult<_>>()?,
        )),
        Expr::Dot { .. } => Err(unsupported("path expression")),
        Expr::Method(_) => Err(unsupported("method call")),
        Expr::Subquery(_) | Expr::Exists(_) | Expr::InSubquery { .. } => Err(unsupported("subquery")),
        Expr::Pseudo(_) => Err(unsupported("row number pseudo column")),
        Expr::Assign { .. } | Expr::Variable(_) => Err(unsupported("session variable")),
        Expr::Star(_) => Err(unsupported("'*'")),
    }
}

/// 술어 평가: 참일 때만 `true` (거짓과 알 수 없음은 `false`)
pub fn is_satisfied(predicate: &Expr, row: &ObjectRow) -> VtxResult<bool> {
    Ok(matches!(evaluate(predicate, row)?, Value::Bool(true)))
}

fn lookup(name: &NameRef, row: &ObjectRow) -> VtxResult<Value> {
    if name.is_oid() {
        return Ok(row.identity());
    }
    if name.meta == NameMeta::Parameter {
        return Err(VtxError::Evaluation(format!("unbound parameter '{}'", name.name)));
    }
    row.get(&name.name)
        .cloned()
        .ok_or_else(|| VtxError::AttributeNotFound {
            class: row.class.to_string(),
            attribute: name.name.clone(),
        })
}

fn truth(v: &Value) -> VtxResult<Option<bool>> {
    match v {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        Value::Int(i) => Ok(Some(*i != 0)),
        other => Err(VtxError::Evaluation(format!("{other:?} is not a truth value"))),
    }
}

fn bool3(v: Option<bool>) -> Value {
    v.map_or(Value::Null, Value::Bool)
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// 두 값의 순서: 한쪽이 NULL이면 `None`
fn compare(a: &Value, b: &Value) -> VtxResult<Option<Ordering>> {
    let ord = match (a, b) {
        (Value::Null, _) | (_, Value::Null) => return Ok(None),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).total_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.total_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Object { class: c1, oid: o1 }, Value::Object { class: c2, oid: o2 }) => {
            c1.as_str().cmp(c2.as_str()).then(o1.cmp(o2))
        }
        (x, y) => {
            return Err(VtxError::Evaluation(format!("cannot compare {x:?} with {y:?}")));
        }
    };
    Ok(Some(ord))
}

fn arithmetic(op: BinaryOp, a: Value, b: Value) -> VtxResult<Value> {
    let (a, b) = match (a, b) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        pair => pair,
    };
    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        let (x, y) = (*x, *y);
        let result = match op {
            BinaryOp::Plus => x.checked_add(y),
            BinaryOp::Minus => x.checked_sub(y),
            BinaryOp::Multiply => x.checked_mul(y),
            BinaryOp::Divide | BinaryOp::Modulo if y == 0 => {
                return Err(VtxError::Evaluation("division by zero".into()));
            }
            BinaryOp::Divide => x.checked_div(y),
            BinaryOp::Modulo => x.checked_rem(y),
            _ => None,
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| VtxError::Evaluation(format!("integer overflow in {x} {op:?} {y}")));
    }
    let as_float = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    let (Some(x), Some(y)) = (as_float(&a), as_float(&b)) else {
        return Err(VtxError::Evaluation(format!("non-numeric operands {a:?}, {b:?}")));
    };
    match op {
        BinaryOp::Plus => Ok(Value::Float(x + y)),
        BinaryOp::Minus => Ok(Value::Float(x - y)),
        BinaryOp::Multiply => Ok(Value::Float(x * y)),
        BinaryOp::Divide | BinaryOp::Modulo if y == 0.0 => Err(VtxError::Evaluation("division by zero".into())),
        BinaryOp::Divide => Ok(Value::Float(x / y)),
        BinaryOp::Modulo => Ok(Value::Float(x % y)),
        _ => Err(VtxError::Evaluation(format!("{op:?} is not arithmetic"))),
    }
}

/// `%`, `_` 패턴 매칭
fn like(text: &str, pattern: &str) -> bool {
    fn go(t: &[char], p: &[char]) -> bool {
        match p.split_first() {
            None => t.is_empty(),
            Some(('%', rest)) => (0..=t.len()).any(|i| go(&t[i..], rest)),
            Some(('_', rest)) => !t.is_empty() && go(&t[1..], rest),
            Some((c, rest)) => t.first() == Some(c) && go(&t[1..], rest),
        }
    }
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    go(&t, &p)
}

fn text_of(v: &Value) -> String {
    match v {
        Value::Text(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

fn binary(op: BinaryOp, left: &Expr, right: &Expr, row: &ObjectRow) -> VtxResult<Value> {
    match op {
        BinaryOp::And => {
            let l = truth(&evaluate(left, row)?)?;
            if l == Some(false) {
                return Ok(Value::Bool(false));
            }
            Ok(bool3(and3(l, truth(&evaluate(right, row)?)?)))
        }
        BinaryOp::Or => {
            let l = truth(&evaluate(left, row)?)?;
            if l == Some(true) {
                return Ok(Value::Bool(true));
            }
            Ok(bool3(or3(l, truth(&evaluate(right, row)?)?)))
        }
        _ => {
            let l = evaluate(left, row)?;
            let r = evaluate(right, row)?;
            match op {
                BinaryOp::Eq => Ok(bool3(compare(&l, &r)?.map(|o| o == Ordering::Equal))),
                BinaryOp::NotEq => Ok(bool3(compare(&l, &r)?.map(|o| o != Ordering::Equal))),
                BinaryOp::Lt => Ok(bool3(compare(&l, &r)?.map(|o| o == Ordering::Less))),
                BinaryOp::LtEq => Ok(bool3(compare(&l, &r)?.map(|o| o != Ordering::Greater))),
                BinaryOp::Gt => Ok(bool3(compare(&l, &r)?.map(|o| o == Ordering::Greater))),
                BinaryOp::GtEq => Ok(bool3(compare(&l, &r)?.map(|o| o != Ordering::Less))),
                BinaryOp::Concat => match (&l, &r) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    _ => Ok(Value::Text(text_of(&l) + &text_of(&r))),
                },
                BinaryOp::Like => match (&l, &r) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (Value::Text(t), Value::Text(p)) => Ok(Value::Bool(like(t, p))),
                    _ => Err(VtxError::Evaluation("LIKE needs string operands".into())),
                },
                _ => arithmetic(op, l, r),
            }
        }
    }
}

fn unary(op: UnaryOp, v: Value) -> VtxResult<Value> {
    match op {
        UnaryOp::IsNull => Ok(Value::Bool(v.is_null())),
        UnaryOp::IsNotNull => Ok(Value::Bool(!v.is_null())),
        UnaryOp::Not => Ok(bool3(truth(&v)?.map(|b| !b))),
        UnaryOp::Minus => match v {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| VtxError::Evaluation("integer overflow in negation".into())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(VtxError::Evaluation(format!("cannot negate {other:?}"))),
        },
    }
}

fn function(call: &FunctionCall, row: &ObjectRow) -> VtxResult<Value> {
    if call.kind != FunctionKind::Scalar {
        return Err(unsupported("aggregate or analytic function"));
    }
    let args: Vec<Value> = call
        .args
        .iter()
        .map(|a| evaluate(a, row))
        .collect::<VtxResult<_>>()?;
    let name = call.name.to_lowercase();
    match (name.as_str(), args.as_slice()) {
        ("coalesce", _) => Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null)),
        (_, [Value::Null]) => Ok(Value::Null),
        ("upper", [Value::Text(s)]) => Ok(Value::Text(s.to_uppercase())),
        ("lower", [Value::Text(s)]) => Ok(Value::Text(s.to_lowercase())),
        ("length" | "char_length", [Value::Text(s)]) => Ok(Value::Int(s.chars().count() as i64)),
        ("abs", [Value::Int(i)]) => Ok(Value::Int(i.abs())),
        ("abs", [Value::Float(f)]) => Ok(Value::Float(f.abs())),
        _ => Err(VtxError::Evaluation(format!(
            "unsupported function {}({} args)",
            call.name,
            args.len()
        ))),
    }
}
