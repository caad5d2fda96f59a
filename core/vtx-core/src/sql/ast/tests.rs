use super::visit::*;
use super::*;

fn col(spec: u64, rv: &str, name: &str) -> Expr {
    Expr::Name(NameRef::bound(name, SpecId(spec), rv))
}

fn emp_select() -> Select {
    Select {
        list: vec![Column::new(col(1, "e", "name"))],
        from: vec![EntitySpec::new_class(SpecId(1), "emp", "e")],
        where_clause: vec![
            Expr::equals(col(1, "e", "dept"), Expr::int(1)),
            Expr::binary(BinaryOp::Gt, col(1, "e", "id"), Expr::int(10)),
        ],
        ..Default::default()
    }
}

// ── Identities ──

#[test]
fn test_id_generator_monotonic() {
    let mut ids = IdGenerator::new();
    let a = ids.next_id();
    let b = ids.next_id();
    assert!(b > a);
    assert_eq!(ids.issued(), 2);

    let mut from_default = IdGenerator::default();
    assert_eq!(from_default.next_id(), SpecId(1));
}

#[test]
fn test_name_targets() {
    let a = NameRef::bound("Name", SpecId(1), "e");
    let b = NameRef::bound("name", SpecId(1), "x");
    let c = NameRef::bound("name", SpecId(2), "e");
    assert!(a.same_target(&b));
    assert!(!a.same_target(&c));
    assert!(a.same_name(&c));
    assert!(!a.same_name(&NameRef::oid(SpecId(1), "e", None)));
}

// ── Expression helpers ──

#[test]
fn test_conjunct_split_and_join() {
    let select = emp_select();
    let joined = Expr::and_all(select.where_clause.clone()).unwrap();
    assert_eq!(joined.into_conjuncts(), select.where_clause);
    assert!(Expr::and_all(Vec::new()).is_none());
}

#[test]
fn test_nested_and_is_split() {
    let inner = Expr::binary(BinaryOp::And, Expr::int(1), Expr::int(2));
    let terms = Expr::Nested(Box::new(inner)).into_conjuncts();
    assert_eq!(terms.len(), 2);
}

#[test]
fn test_contains_aggregate_skips_subqueries() {
    let sum = Expr::Function(FunctionCall {
        name: "sum".into(),
        args: vec![col(1, "e", "sal")],
        kind: FunctionKind::Aggregate,
        distinct: false,
        star: false,
        over: None,
    });
    assert!(contains_aggregate(&Expr::binary(BinaryOp::Plus, sum.clone(), Expr::int(1))));

    let mut inner = emp_select();
    inner.list = vec![Column::new(sum)];
    let sub = Expr::Subquery(Box::new(Query::from_select(inner)));
    assert!(!contains_aggregate(&sub));
    assert!(contains_unpushable(&sub));
}

#[test]
fn test_constant_detection() {
    assert!(Expr::int(3).is_constant());
    assert!(
        Expr::Unary {
            op: UnaryOp::Minus,
            expr: Box::new(Expr::int(3)),
        }
        .is_constant()
    );
    assert!(!col(1, "e", "id").is_constant());
}

// ── Visitor ──

struct Renamer {
    from: SpecId,
    to: SpecId,
}

impl VisitorMut for Renamer {
    fn visit_name(&mut self, name: &mut NameRef) -> Walk {
        if name.spec_id == Some(self.from) {
            name.spec_id = Some(self.to);
        }
        Walk::Continue
    }
}

#[test]
fn test_walk_mut_reaches_every_clause() {
    let mut query = Query::from_select(emp_select());
    query.order_by.push(OrderBy {
        key: SortKey::Expr(col(1, "e", "id")),
        asc: false,
    });
    let _ = walk_query_mut(
        &mut Renamer {
            from: SpecId(1),
            to: SpecId(7),
        },
        &mut query,
    );

    let mut seen = Vec::new();
    let select = query.as_select().unwrap();
    for term in &select.where_clause {
        for_each_name(term, |n| seen.push(n.spec_id));
    }
    for_each_name(&select.list[0].expr, |n| seen.push(n.spec_id));
    assert!(seen.iter().all(|id| *id == Some(SpecId(7))));
    match &query.order_by[0].key {
        SortKey::Expr(Expr::Name(n)) => assert_eq!(n.spec_id, Some(SpecId(7))),
        other => panic!("Expected name sort key, got: {:?}", other),
    }
}

struct StopAtFirst {
    names: usize,
}

impl Visitor for StopAtFirst {
    fn visit_name(&mut self, _name: &NameRef) -> Walk {
        self.names += 1;
        Walk::Stop
    }
}

#[test]
fn test_walk_stop() {
    let query = Query::from_select(emp_select());
    let mut v = StopAtFirst { names: 0 };
    assert!(walk_query(&mut v, &query).is_break());
    assert_eq!(v.names, 1);
}

#[test]
fn test_leave_expr_can_replace() {
    struct Folder;
    impl VisitorMut for Folder {
        fn leave_expr(&mut self, expr: &mut Expr) {
            if let Expr::Binary {
                op: BinaryOp::Plus,
                left,
                right,
            } = expr
            {
                if let (Expr::Value(Value::Int(a)), Expr::Value(Value::Int(b))) =
                    (left.as_ref(), right.as_ref())
                {
                    *expr = Expr::int(a + b);
                }
            }
        }
    }
    let mut e = Expr::binary(
        BinaryOp::Plus,
        Expr::binary(BinaryOp::Plus, Expr::int(1), Expr::int(2)),
        Expr::int(3),
    );
    let _ = walk_expr_mut(&mut Folder, &mut e);
    assert_eq!(e, Expr::int(6));
}

// ── Display ──

#[test]
fn test_display_select() {
    let query = Query::from_select(emp_select());
    assert_eq!(
        query.to_string(),
        "SELECT e.name FROM emp e WHERE e.dept = 1 AND e.id > 10"
    );
}

#[test]
fn test_display_join_and_order() {
    let mut select = emp_select();
    select.where_clause.clear();
    let mut dept = EntitySpec::new_class(SpecId(2), "dept", "d");
    dept.join_type = JoinType::LeftOuter;
    dept.on_cond = vec![Expr::equals(col(1, "e", "dept"), col(2, "d", "id"))];
    select.from.push(dept);
    let mut query = Query::from_select(select);
    query.distinct = true;
    query.order_by.push(OrderBy::position(1));
    assert_eq!(
        query.to_string(),
        "SELECT DISTINCT e.name FROM emp e LEFT OUTER JOIN dept d ON e.dept = d.id ORDER BY 1"
    );
}

#[test]
fn test_display_derived_and_union() {
    let inner = Query::from_select(emp_select());
    let mut spec = EntitySpec::new_derived(SpecId(3), inner, "t");
    spec.as_attr_list = vec![NameRef::bound("name", SpecId(3), "t")];
    let outer = Select {
        list: vec![Column::new(col(3, "t", "name"))],
        from: vec![spec],
        ..Default::default()
    };
    let union = Query::set_op(
        SetOperator::Union,
        Query::from_select(outer.clone()),
        Query::from_select(outer),
        false,
    );
    let text = union.to_string();
    assert!(text.starts_with("SELECT t.name FROM (SELECT e.name FROM emp e"));
    assert!(text.contains(") t (name) UNION ALL SELECT"));
}

#[test]
fn test_display_oid_and_sequence() {
    let oid = Expr::Name(NameRef::oid(SpecId(1), "e", Some(ClassId::new("emp"))));
    assert_eq!(oid.to_string(), "e");
    let marker = Expr::Sequence(vec![Expr::text("v_emp")]);
    assert_eq!(marker.to_string(), "{'v_emp'}");
}

#[test]
fn test_display_update() {
    let stmt = Statement::Update(Update {
        specs: vec![EntitySpec::new_class(SpecId(1), "emp", "e")],
        assignments: vec![Assignment {
            target: NameRef::bound("sal", SpecId(1), "e"),
            value: Expr::binary(BinaryOp::Plus, col(1, "e", "sal"), Expr::int(1)),
        }],
        where_clause: vec![Expr::equals(col(1, "e", "id"), Expr::int(3))],
        check_where: vec![CheckOption {
            spec_id: SpecId(1),
            predicate: vec![Expr::equals(col(1, "e", "dept"), Expr::int(1))],
        }],
        hints: Hints::default(),
        using_index: Vec::new(),
    });
    assert_eq!(
        stmt.to_string(),
        "UPDATE emp e SET e.sal = e.sal + 1 WHERE e.id = 3 WITH CHECK (e.dept = 1)"
    );
    assert_eq!(stmt.kind(), "UPDATE");
}

#[test]
fn test_display_path_spec() {
    let mut root = EntitySpec::new_class(SpecId(1), "emp", "e");
    let mut path = EntitySpec::new_class(SpecId(2), "dept", "d");
    path.path_conjunct = Some(Expr::equals(
        col(1, "e", "dept"),
        Expr::Name(NameRef::oid(SpecId(2), "d", None)),
    ));
    root.path_entities.push(path);
    assert_eq!(root.to_string(), "emp e {dept d}");
    assert!(root.path_entities[0].path_join_left().is_some());
}

#[test]
fn test_hints_display() {
    let mut hints = Hints::default();
    hints.flags |= HintFlags::ORDERED | HintFlags::USE_NL;
    hints.use_nl.push(NameRef::bound("", SpecId(1), "e").with_meta(NameMeta::HintName));
    assert_eq!(hints.to_string(), "/*+ ORDERED USE_NL(e) */");
}
