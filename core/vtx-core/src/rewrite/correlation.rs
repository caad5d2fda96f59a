//! 상관 깊이 조정
//!
//! 분기들을 UNION으로 묶으면 분기 하나가 한 단계 더 깊은 하위 질의가
//! 된다. 바깥 질의를 참조하던 (상관) 하위 질의의 깊이를 그만큼 올린다.

use crate::sql::ast::visit::{VisitorMut, Walk, Walkable, walk_select_mut};
use crate::sql::ast::{Query, QueryBody, SetOperator};

struct ChildQueries {
    increment: u32,
    match_level: u32,
}

impl VisitorMut for ChildQueries {
    fn enter_query(&mut self, query: &mut Query) -> Walk {
        bump_correlation_level(query, self.increment, self.match_level);
        Walk::Skip
    }
}

/// `match_level` 이상의 상관 깊이를 `increment`만큼 올린다
///
/// 하위 질의로 내려가면 `match_level`도 하나 늘고, 비상관(깊이 0) 질의에서
/// 멈춘다. 집합 연산의 분기는 같은 깊이로 취급한다.
pub fn bump_correlation_level(query: &mut Query, increment: u32, match_level: u32) {
    if query.correlation_level == 0 {
        return;
    }
    if query.correlation_level >= match_level {
        query.correlation_level += increment;
    }
    match &mut query.body {
        QueryBody::Select(select) => {
            let mut children = ChildQueries {
                increment,
                match_level: match_level + 1,
            };
            let _ = walk_select_mut(&mut children, select);
        }
        QueryBody::SetOp { left, right, .. } => {
            bump_correlation_level(left, increment, match_level);
            bump_correlation_level(right, increment, match_level);
        }
    }
}

/// 트리 안의 (가장 바깥) 하위 질의들에 [`bump_correlation_level`] 적용
///
/// 치환으로 하위 질의가 `increment` 단계 더 깊은 곳에 놓일 때 쓴다.
pub fn bump_nested_queries<T: Walkable + ?Sized>(tree: &mut T, increment: u32, match_level: u32) {
    if increment == 0 {
        return;
    }
    let _ = tree.walk_mut(&mut ChildQueries {
        increment,
        match_level,
    });
}

/// 두 질의를 집합 연산으로 묶고 상관 분기의 깊이를 한 단계 올린다
pub fn set_op_bump_correlation(op: SetOperator, mut left: Query, mut right: Query, distinct: bool) -> Query {
    for arm in [&mut left, &mut right] {
        let level = arm.correlation_level;
        if level > 0 {
            bump_correlation_level(arm, 1, level);
        }
    }
    let level = left.correlation_level.max(right.correlation_level);
    let is_subquery = left.is_subquery || right.is_subquery;
    let mut combined = Query::set_op(op, left, right, distinct);
    combined.correlation_level = level;
    combined.is_subquery = is_subquery;
    combined
}

/// 두 질의를 `UNION ALL`로 묶고 상관 분기의 깊이를 한 단계 올린다
pub fn union_bump_correlation(left: Query, right: Query) -> Query {
    set_op_bump_correlation(SetOperator::Union, left, right, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::*;

    fn select_with_sub(level: u32, sub_level: u32) -> Query {
        let mut sub = Query::from_select(Select {
            list: vec![Column::new(Expr::int(1))],
            ..Default::default()
        });
        sub.correlation_level = sub_level;
        let mut query = Query::from_select(Select {
            list: vec![Column::new(Expr::Exists(Box::new(sub)))],
            ..Default::default()
        });
        query.correlation_level = level;
        query
    }

    fn sub_level(query: &Query) -> u32 {
        match &query.as_select().unwrap().list[0].expr {
            Expr::Exists(q) => q.correlation_level,
            other => panic!("Expected EXISTS, got: {:?}", other),
        }
    }

    #[test]
    fn test_uncorrelated_is_untouched() {
        let mut query = select_with_sub(0, 1);
        bump_correlation_level(&mut query, 1, 1);
        assert_eq!(query.correlation_level, 0);
        assert_eq!(sub_level(&query), 1);
    }

    #[test]
    fn test_bump_descends_with_match_level() {
        // 바깥을 참조하는 하위 질의(깊이 2)는 올리고, 자기 부모만 참조(깊이 1)하면 그대로
        let mut query = select_with_sub(1, 2);
        bump_correlation_level(&mut query, 1, 1);
        assert_eq!(query.correlation_level, 2);
        assert_eq!(sub_level(&query), 3);

        let mut query = select_with_sub(1, 1);
        bump_correlation_level(&mut query, 1, 1);
        assert_eq!(sub_level(&query), 1);
    }

    #[test]
    fn test_union_bump_correlation() {
        let union = union_bump_correlation(select_with_sub(1, 0), select_with_sub(0, 0));
        assert_eq!(union.correlation_level, 2);
        assert!(!union.distinct);
        match &union.body {
            QueryBody::SetOp { op, left, right } => {
                assert_eq!(*op, SetOperator::Union);
                assert_eq!(left.correlation_level, 2);
                assert_eq!(right.correlation_level, 0);
            }
            other => panic!("Expected union, got: {:?}", other),
        }
    }

    #[test]
    fn test_bump_nested_queries_in_expression() {
        let mut sub = Query::from_select(Select::default());
        sub.correlation_level = 1;
        let mut expr = Expr::binary(BinaryOp::Gt, Expr::Subquery(Box::new(sub)), Expr::int(0));
        bump_nested_queries(&mut expr, 2, 1);
        match &expr {
            Expr::Binary { left, .. } => match left.as_ref() {
                Expr::Subquery(q) => assert_eq!(q.correlation_level, 3),
                other => panic!("Expected subquery, got: {:?}", other),
            },
            other => panic!("Expected comparison, got: {:?}", other),
        }
    }
}
