// View Translation Integration Tests
//
// 종단 간 통합 테스트: 공개 API만으로 카탈로그 구성, 번역, 평가, 설정 영속성 검증

use vtx_core::catalog::{CheckOptionKind, ClassBuilder, InMemoryCatalog, ObjectRow};
use vtx_core::config::{FeatureFlags, RewriteFeature, TranslatorConfig};
use vtx_core::error::{VtxError, VtxResult};
use vtx_core::eval::evaluate;
use vtx_core::rewrite::invert::invert;
use vtx_core::rewrite::updatable::{Updatability, classify};
use vtx_core::sql::ast::{Expr, IdGenerator, Statement};
use vtx_core::sql::{Binder, SqlParser};
use vtx_core::types::{ClassId, DataType, Value};
use vtx_core::ViewTranslator;

use proptest::prelude::*;
use tempfile::tempdir;

// ─── Helpers ────────────────────────────────────────────

fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_class(
            ClassBuilder::real("emp")
                .attr("id", DataType::Integer)
                .attr("name", DataType::Varchar)
                .attr("sal", DataType::Integer)
                .attr("dept", DataType::Integer),
        )
        .with_class(
            ClassBuilder::real("other")
                .attr("id", DataType::Integer)
                .attr("label", DataType::Varchar),
        )
        .with_class(
            ClassBuilder::view("v_emp")
                .attr("id", DataType::Integer)
                .attr("name", DataType::Varchar)
                .attr("pay", DataType::Integer)
                .query("SELECT id, name, sal * 12 FROM emp WHERE dept = 1")
                .check_option(CheckOptionKind::Cascaded),
        )
        .with_class(
            ClassBuilder::view("v_g")
                .attr("id", DataType::Integer)
                .attr("s", DataType::Integer)
                .query("SELECT id, SUM(sal) AS s FROM emp GROUP BY id"),
        )
}

fn classify_sql(cat: &InMemoryCatalog, sql: &str) -> Updatability {
    let mut ids = IdGenerator::new();
    let mut query = SqlParser::new().parse_query(sql).unwrap();
    Binder::new(cat, &mut ids).bind_query(&mut query).unwrap();
    classify(&query, cat)
}

fn emp(oid: u64, dept: i64, sal: i64) -> ObjectRow {
    ObjectRow::new("emp", oid)
        .with("id", Value::Int(oid as i64))
        .with("name", Value::Text(format!("e{oid}")))
        .with("sal", Value::Int(sal))
        .with("dept", Value::Int(dept))
}

// ═══════════════════════════════════════════════════════════
// 종단 간 번역
// ═══════════════════════════════════════════════════════════

/// 뷰 읽기 → 실제 클래스 질의, 결과는 SQL 텍스트로 출력 가능
#[test]
fn test_select_through_view() -> VtxResult<()> {
    let cat = catalog();
    let mut t = ViewTranslator::new(&cat);
    let out = t.translate_sql("SELECT name, pay FROM v_emp WHERE pay > 1000")?;
    let text = out.to_string();
    assert!(text.contains("FROM emp v_emp"), "{text}");
    assert!(text.contains("v_emp.dept = 1"), "{text}");
    assert!(!text.contains("FROM v_emp"), "{text}");
    Ok(())
}

/// 쓰기 → 역변환된 실제 컬럼 쓰기 + 검사 술어
#[test]
fn test_update_through_view() -> VtxResult<()> {
    let cat = catalog();
    let mut t = ViewTranslator::new(&cat);
    let out = t.translate_sql("UPDATE v_emp SET pay = 2400 WHERE id = 3")?;
    match out.first() {
        Some(Statement::Update(u)) => {
            assert_eq!(u.assignments[0].target.name, "sal");
            assert_eq!(u.assignments[0].value.to_string(), "2400 / 12");
            assert_eq!(u.check_where.len(), 1);
        }
        other => panic!("Expected update, got: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_insert_into_aggregate_column_fails() {
    let cat = catalog();
    let mut t = ViewTranslator::new(&cat);
    match t.translate_sql("INSERT INTO v_g (s) VALUES (1)") {
        Err(VtxError::NotInvertible { attribute, .. }) => assert_eq!(attribute, "s"),
        other => panic!("Expected NotInvertible, got: {:?}", other),
    }
}

/// 실제 객체 기준 뷰 컬럼 값과 검사 옵션
#[test]
fn test_object_evaluation() -> VtxResult<()> {
    let cat = catalog();
    let mut t = ViewTranslator::new(&cat);
    let view = ClassId::new("v_emp");

    assert_eq!(t.get_attribute(&view, "pay", &emp(1, 1, 50))?, Value::Int(600));
    t.evaluate_check_option(&view, &emp(1, 1, 50))?;
    assert!(matches!(
        t.evaluate_check_option(&view, &emp(2, 9, 50)),
        Err(VtxError::CheckOptionViolation { .. })
    ));
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// 설정/카탈로그 영속성
// ═══════════════════════════════════════════════════════════

#[test]
fn test_config_file_roundtrip() -> VtxResult<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("translator.json");

    let mut config = TranslatorConfig::default();
    config.max_view_depth = 16;
    config.default_user = "alice".to_string();
    config.features.insert("copy_push_terms".to_string(), false);
    config.save_to_file(&path)?;

    let loaded = TranslatorConfig::load_from_file(&path)?;
    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn test_feature_flags_persistence() -> VtxResult<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flags").join("features.json");

    let flags = FeatureFlags::with_defaults().with_persistence(path.clone());
    flags.enable(RewriteFeature::TraceRewrites);
    flags.save_to_file()?;

    let restored = FeatureFlags::new().with_persistence(path);
    restored.load_from_file()?;
    assert!(restored.is_enabled(RewriteFeature::CopyPushTerms));
    assert!(restored.is_enabled(RewriteFeature::TraceRewrites));
    Ok(())
}

/// JSON으로 저장한 카탈로그로도 같은 번역 결과
#[test]
fn test_catalog_file_roundtrip_translates_identically() -> VtxResult<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    let original = catalog();
    original.save_to_file(&path)?;
    let loaded = InMemoryCatalog::load_from_file(&path)?;
    assert_eq!(loaded.class_count(), original.class_count());

    let sql = "SELECT name FROM v_emp WHERE id > 10";
    let a = ViewTranslator::new(&original).translate_sql(sql)?;
    let b = ViewTranslator::new(&loaded).translate_sql(sql)?;
    assert_eq!(a.to_string(), b.to_string());
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Property tests
// ═══════════════════════════════════════════════════════════

fn arb_columns() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(vec!["id", "name", "sal", "dept"], 1..=4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // ── View-free statements pass through ──

    #[test]
    fn prop_view_free_statement_unchanged(
        columns in arb_columns(),
        threshold in 0i64..10_000,
        join in any::<bool>(),
        ordered in any::<bool>(),
    ) {
        let cat = catalog();
        let list = columns
            .iter()
            .map(|c| format!("e.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = if join {
            format!("SELECT {list} FROM emp e, other o WHERE e.id = o.id AND e.sal > {threshold}")
        } else {
            format!("SELECT {list} FROM emp e WHERE e.sal > {threshold}")
        };
        if ordered {
            sql.push_str(" ORDER BY 1");
        }

        let prepared = ViewTranslator::new(&cat).prepare(&sql).unwrap();
        let translated = ViewTranslator::new(&cat).translate_sql(&sql).unwrap();
        prop_assert_eq!(translated.len(), 1);
        prop_assert_eq!(translated.to_string(), prepared.to_string());
    }

    // ── Updatability is monotone ──

    #[test]
    fn prop_distinct_or_group_never_raises_updatability(
        threshold in 0i64..1_000,
        distinct in any::<bool>(),
        grouped in any::<bool>(),
    ) {
        let cat = catalog();
        let base = format!("SELECT dept FROM emp WHERE sal > {threshold}");
        let mut changed = format!(
            "SELECT {}dept FROM emp WHERE sal > {threshold}",
            if distinct { "DISTINCT " } else { "" }
        );
        if grouped {
            changed.push_str(" GROUP BY dept");
        }
        let before = classify_sql(&cat, &base);
        let after = classify_sql(&cat, &changed);
        prop_assert_eq!(before, Updatability::Updatable);
        prop_assert!(after <= before);
        if distinct || grouped {
            prop_assert_eq!(after, Updatability::NotUpdatable);
        }
    }

    // ── Invert round trip on linear columns ──

    #[test]
    fn prop_invert_linear_roundtrip(
        factor in 1i64..50,
        offset in 0i64..1_000,
        x in -1_000i64..1_000,
    ) {
        let parser = SqlParser::new();
        let column = parser.parse_expr(&format!("sal * {factor} + {offset}")).unwrap();
        let written = x * factor + offset;

        let (target, value) = invert(&column, Expr::Value(Value::Int(written))).unwrap();
        prop_assert_eq!(target.name.as_str(), "sal");

        let empty = ObjectRow::new("emp", 0);
        let stored = evaluate(&value, &empty).unwrap();
        prop_assert_eq!(&stored, &Value::Int(x));

        let row = ObjectRow::new("emp", 0).with("sal", stored);
        prop_assert_eq!(evaluate(&column, &row).unwrap(), Value::Int(written));
    }
}
