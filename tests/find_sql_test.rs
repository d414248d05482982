use pretty_assertions::assert_eq;
use sqlspot::analyzer::{rust_ast, yaml};
use sqlspot::prelude::*;

const SELECT: &str = "\
SELECT distinct(first_name)
FROM users
WHERE user_id = :userId
AND :user_type = ANY (user_types)
";

const UPDATE: &str = "\
UPDATE user_update_jobs
SET state = 'CANCELED'
WHERE state IN ('QUEUED', 'ORPHANED', 'PROCESSING')
AND job_id = :jobId
";

const DELETE: &str = "\
DELETE FROM users
WHERE email = :email
";

fn view(sql: &str) -> QueryView {
    match view_of(&HostNode::plain_text(sql), SqlDialect::PostgreSql) {
        Detection::Query(view) => view,
        other => panic!("expected a query, got {:?}", other),
    }
}

fn row(operation: Operation, table: &str, column: Option<&str>, provenance: &Provenance) -> UsageRow {
    UsageRow {
        source_path: provenance.source_path.clone(),
        line_number: provenance.line_number,
        commit_hash: provenance.commit_hash.clone(),
        operation,
        table: table.to_string(),
        column: column.map(str::to_string),
    }
}

#[test]
fn select_reports_projected_column_only() {
    let provenance = Provenance {
        source_path: Some("select.sql".into()),
        line_number: Some(1),
        commit_hash: Some("1234".into()),
    };
    let rows: Vec<_> = view(SELECT).usage_rows(&provenance).collect();
    assert_eq!(
        rows,
        vec![row(Operation::Select, "users", Some("first_name"), &provenance)]
    );
}

#[test]
fn update_reports_assigned_column() {
    let provenance = Provenance::default();
    let rows: Vec<_> = view(UPDATE).usage_rows(&provenance).collect();
    assert_eq!(
        rows,
        vec![row(Operation::Update, "user_update_jobs", Some("state"), &provenance)]
    );
}

#[test]
fn delete_reports_table_without_column() {
    let provenance = Provenance::default();
    let rows: Vec<_> = view(DELETE).usage_rows(&provenance).collect();
    assert_eq!(rows, vec![row(Operation::Delete, "users", None, &provenance)]);
}

#[test]
fn insert_reports_listed_columns() {
    let sql = "INSERT INTO audit.events (kind, payload) VALUES ('login', :payload)";
    let rows: Vec<_> = view(sql).usage_rows(&Provenance::default()).collect();
    let columns: Vec<_> = rows.iter().map(|r| r.column.as_deref()).collect();
    assert_eq!(columns, vec![Some("kind"), Some("payload")]);
    assert!(rows.iter().all(|r| r.table == "audit.events" && r.operation == Operation::Insert));
}

#[test]
fn set_operations_report_nothing() {
    let sql = "SELECT a FROM t UNION SELECT b FROM u";
    assert_eq!(view(sql).usage_rows(&Provenance::default()).count(), 0);
}

#[test]
fn render_replaces_only_the_changed_literal() {
    let rendered = view(UPDATE).render(&mut ReplaceLiteral::new("CANCELED", "CANCELLED"));
    assert_eq!(
        rendered,
        "\
UPDATE user_update_jobs
SET state = 'CANCELLED'
WHERE state IN ('QUEUED', 'ORPHANED', 'PROCESSING')
AND job_id = :jobId
"
    );
}

#[test]
fn render_rewrites_calls_and_null_checks_in_place() {
    let sql = "update accounts\n   set email = lower(email)\n where verified_at is null\n";
    let mut call = ReplaceExpression::new("lower(email)", "upper(email)", SqlDialect::PostgreSql).unwrap();
    assert_eq!(
        view(sql).render(&mut call),
        "update accounts\n   set email = upper(email)\n where verified_at is null\n"
    );

    let mut null_check =
        ReplaceExpression::new("verified_at IS NULL", "verified_at < now()", SqlDialect::PostgreSql)
            .unwrap();
    assert_eq!(
        view(sql).render(&mut null_check),
        "update accounts\n   set email = lower(email)\n where verified_at < now()\n"
    );
}

#[test]
fn render_without_mutation_is_byte_identical() {
    for sql in [SELECT, UPDATE, DELETE, "select   *\n\tfrom  \"Users\"  -- all\n"] {
        let view = view(sql);
        assert_eq!(view.render(&mut NoRewrite), sql);
        assert_eq!(view.try_render(&mut NoRewrite), Ok(Rendered::Unchanged));
    }
}

#[test]
fn usage_extraction_is_repeatable() {
    let view = view(UPDATE);
    let provenance = Provenance::default();
    let first: Vec<_> = view.usage_rows(&provenance).collect();
    let second: Vec<_> = view.usage_rows(&provenance).collect();
    assert_eq!(first, second);
}

#[test]
fn not_sql_is_not_applicable() {
    let node = HostNode::plain_text("The heuristic won't match this at all");
    assert!(matches!(
        view_of(&node, SqlDialect::PostgreSql),
        Detection::NotApplicable
    ));
}

#[test]
fn keyword_without_sql_is_detection_failure() {
    for text in [
        "This will be SELECTed by the heuristic but not parse as SQL",
        "SELECT 'by' the heuristic but not parse as SQL",
    ] {
        let node = HostNode::plain_text(text);
        match view_of(&node, SqlDialect::PostgreSql) {
            Detection::Failed(failure) => assert_eq!(failure.node, node.id()),
            other => panic!("expected a detection failure, got {:?}", other),
        }
    }
}

#[test]
fn select_in_rust_literal_reports_line() {
    let code = r#"struct Test {}
const A_SELECT: &str = "
   SELECT distinct(first_name)
   FROM users
   WHERE user_id = :userId
   AND :user_type = ANY (user_types)
   ";
"#;
    let nodes = rust_ast::string_literals(code).unwrap();
    assert_eq!(nodes.len(), 1);

    let view = view_of(&nodes[0].node, SqlDialect::PostgreSql).into_view().unwrap();
    let provenance = Provenance {
        source_path: Some("Test.rs".into()),
        line_number: nodes[0].line,
        commit_hash: None,
    };
    let rows: Vec<_> = view.usage_rows(&provenance).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].line_number, Some(2));
    assert_eq!(rows[0].table, "users");
    assert_eq!(rows[0].column.as_deref(), Some("first_name"));
}

#[test]
fn select_in_yaml_scalar_reports_line() {
    let source = "\
foo: bar
query: >
    SELECT distinct(first_name)
    FROM users
    WHERE user_id = :userId
    AND :user_type = ANY (user_types)
";
    let nodes = yaml::document_scalars(source).unwrap();
    let views: Vec<_> = nodes
        .iter()
        .filter_map(|n| view_of(&n.node, SqlDialect::PostgreSql).into_view().map(|v| (n.line, v)))
        .collect();
    assert_eq!(views.len(), 1);

    let (line, view) = &views[0];
    assert_eq!(*line, Some(2));
    let rows: Vec<_> = view.usage_rows(&Provenance::default()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].operation, Operation::Select);
    assert_eq!(rows[0].column.as_deref(), Some("first_name"));
}

#[test]
fn query_text_row_keeps_raw_text() {
    let row = view(DELETE).query_text_row(Some("delete.sql"));
    assert_eq!(
        row,
        QueryTextRow {
            source_path: Some("delete.sql".into()),
            query: DELETE.to_string(),
        }
    );
}
