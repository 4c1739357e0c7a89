//! Predicate-to-SQL compilation
//!
//! Walks a predicate sequence left to right, building a parameterized
//! SELECT over the profile tables. Joins are added only for referenced
//! sub-tables, results deduplicate on profile id and order by display
//! name, so identical inputs always compile to identical queries.

use lexfind_corpus::{AliasResolver, CompiledQuery, SqlValue};
use std::collections::BTreeSet;

use crate::predicate::{AstNode, CmpOp, Connective, Field, Predicate, PredicateValue};

const BASE_SELECT: &str = "SELECT DISTINCT p.id, p.name, p.url FROM profiles p";
const ORDER_BY: &str = "ORDER BY p.name";

/// Sub-tables a query may need. Ordered so the FTS inner join always
/// precedes the LEFT JOINs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Join {
    NameIndex,
    Educations,
    Practices,
    Industries,
    Regions,
    Languages,
}

impl Join {
    fn clause(self) -> &'static str {
        match self {
            Join::NameIndex => "INNER JOIN profiles_fts fts ON p.id = fts.rowid",
            Join::Educations => "LEFT JOIN educations e ON p.id = e.profile_id",
            Join::Practices => "LEFT JOIN practices pr ON p.id = pr.profile_id",
            Join::Industries => "LEFT JOIN industries ind ON p.id = ind.profile_id",
            Join::Regions => "LEFT JOIN regions r ON p.id = r.profile_id",
            Join::Languages => "LEFT JOIN languages lang ON p.id = lang.profile_id",
        }
    }
}

/// Compile a predicate sequence into a parameterized storage query.
///
/// The empty sequence compiles to the match-all query. Unrecognized
/// field/operator combinations are dropped silently; the parser upstream
/// is permissive, so the compiler is defensive rather than validating.
pub fn compile(ast: &[AstNode], schools: &dyn AliasResolver) -> CompiledQuery {
    if ast.is_empty() {
        return CompiledQuery {
            sql: format!("{BASE_SELECT} {ORDER_BY}"),
            params: Vec::new(),
        };
    }

    let mut where_parts: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();
    let mut joins: BTreeSet<Join> = BTreeSet::new();

    for node in ast {
        match node {
            AstNode::Connective(connective) => push_connective(&mut where_parts, *connective),
            AstNode::Predicate(predicate) => {
                if let Some(condition) =
                    compile_predicate(predicate, schools, &mut params, &mut joins)
                {
                    // Implicit AND between adjacent conditions
                    if ends_with_condition(&where_parts) {
                        where_parts.push("AND".to_string());
                    }
                    where_parts.push(condition);
                }
            }
        }
    }

    // A dropped predicate can leave its connective trailing
    while where_parts.last().is_some_and(|last| is_connective(last)) {
        where_parts.pop();
    }

    let mut sql = String::from(BASE_SELECT);
    for join in &joins {
        sql.push(' ');
        sql.push_str(join.clause());
    }
    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" "));
    }
    sql.push(' ');
    sql.push_str(ORDER_BY);

    CompiledQuery { sql, params }
}

fn is_connective(part: &str) -> bool {
    matches!(part, "AND" | "OR" | "NOT")
}

fn ends_with_condition(parts: &[String]) -> bool {
    parts.last().is_some_and(|last| !is_connective(last))
}

fn push_connective(parts: &mut Vec<String>, connective: Connective) {
    match connective {
        // NOT may open the clause or follow AND/OR, but never stacks
        Connective::Not => {
            if parts.last().is_some_and(|last| last == "NOT") {
                return;
            }
            parts.push("NOT".to_string());
        }
        Connective::And | Connective::Or => {
            if !ends_with_condition(parts) {
                return;
            }
            let token = if connective == Connective::And {
                "AND"
            } else {
                "OR"
            };
            parts.push(token.to_string());
        }
    }
}

fn text_value(value: &PredicateValue) -> Option<&str> {
    match value {
        PredicateValue::Text(s) if !s.trim().is_empty() => Some(s.trim()),
        _ => None,
    }
}

fn year_value(value: &PredicateValue) -> Option<i64> {
    match value {
        PredicateValue::Year(year) => Some(*year),
        PredicateValue::Text(s) => s.trim().parse().ok(),
    }
}

fn compile_predicate(
    predicate: &Predicate,
    schools: &dyn AliasResolver,
    params: &mut Vec<SqlValue>,
    joins: &mut BTreeSet<Join>,
) -> Option<String> {
    match predicate.field {
        // Name goes through the full-text index so tokens match whole
        // words: "alon" must not match inside "Malone"
        Field::Name => {
            let value = text_value(&predicate.value)?;
            let fts_query = match predicate.op {
                CmpOp::Contains => value.split_whitespace().collect::<Vec<_>>().join(" "),
                CmpOp::Equals => format!("\"{value}\""),
                _ => return None,
            };
            joins.insert(Join::NameIndex);
            params.push(SqlValue::Text(fts_query));
            Some("fts.full_name MATCH ?".to_string())
        }

        Field::Title => {
            let value = text_value(&predicate.value)?;
            match predicate.op {
                CmpOp::Equals => {
                    params.push(SqlValue::Text(value.to_string()));
                    Some("p.title = ?".to_string())
                }
                CmpOp::Contains => {
                    params.push(SqlValue::Text(format!("%{value}%")));
                    Some("p.title LIKE ?".to_string())
                }
                _ => None,
            }
        }

        // The resolver may not know an entity's stored variant, so match
        // both the raw and normalized columns
        Field::School => {
            let value = text_value(&predicate.value)?;
            let normalized = schools.normalize(value);
            match predicate.op {
                CmpOp::Contains => {
                    joins.insert(Join::Educations);
                    params.push(SqlValue::Text(format!("%{value}%")));
                    params.push(SqlValue::Text(format!("%{normalized}%")));
                    Some("(e.school_name LIKE ? OR e.school_normalized LIKE ?)".to_string())
                }
                CmpOp::Equals => {
                    joins.insert(Join::Educations);
                    params.push(SqlValue::Text(value.to_string()));
                    params.push(SqlValue::Text(normalized));
                    Some("(e.school_name = ? OR e.school_normalized = ?)".to_string())
                }
                _ => None,
            }
        }

        // Year comparisons always mean the qualifying law degree, never
        // other degrees on record
        Field::GraduationYear => {
            let year = year_value(&predicate.value)?;
            let cmp = match predicate.op {
                CmpOp::GreaterThan => ">",
                CmpOp::LessThan => "<",
                CmpOp::Equals => "=",
                CmpOp::Contains => return None,
            };
            joins.insert(Join::Educations);
            params.push(SqlValue::Int(year));
            Some(format!("(e.year {cmp} ? AND e.is_law_degree = 1)"))
        }

        Field::Practice => compile_child_text(
            predicate,
            Join::Practices,
            "pr.practice_type",
            params,
            joins,
        ),
        Field::Industry => {
            compile_child_text(predicate, Join::Industries, "ind.industry", params, joins)
        }
        Field::Region => compile_child_text(predicate, Join::Regions, "r.region", params, joins),

        // Stored language casing varies by source page
        Field::Language => {
            let value = text_value(&predicate.value)?;
            match predicate.op {
                CmpOp::Equals => {
                    joins.insert(Join::Languages);
                    params.push(SqlValue::Text(value.to_string()));
                    Some("LOWER(lang.language) = LOWER(?)".to_string())
                }
                CmpOp::Contains => {
                    joins.insert(Join::Languages);
                    params.push(SqlValue::Text(format!("%{value}%")));
                    Some("LOWER(lang.language) LIKE LOWER(?)".to_string())
                }
                _ => None,
            }
        }
    }
}

fn compile_child_text(
    predicate: &Predicate,
    join: Join,
    column: &str,
    params: &mut Vec<SqlValue>,
    joins: &mut BTreeSet<Join>,
) -> Option<String> {
    let value = text_value(&predicate.value)?;
    match predicate.op {
        CmpOp::Equals => {
            joins.insert(join);
            params.push(SqlValue::Text(value.to_string()));
            Some(format!("{column} = ?"))
        }
        CmpOp::Contains => {
            joins.insert(join);
            params.push(SqlValue::Text(format!("%{value}%")));
            Some(format!("{column} LIKE ?"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexfind_corpus::{AliasTable, Education, NoAliases, ProfileRecord, ProfileStore};

    fn seed_store() -> ProfileStore {
        let store = ProfileStore::in_memory().unwrap();

        store
            .add_profile(
                &ProfileRecord::builder()
                    .url("https://example.com/chen")
                    .name("Alice Chen")
                    .title("Partner")
                    .education(Education::law("Yale Law School", 2010).normalized("Yale"))
                    .education(Education::undergrad("Cornell University", 2018))
                    .practice("Tax")
                    .region("Europe")
                    .language("French")
                    .build()
                    .unwrap(),
            )
            .unwrap();

        store
            .add_profile(
                &ProfileRecord::builder()
                    .url("https://example.com/malone")
                    .name("Sarah Malone")
                    .title("Associate")
                    .education(Education::law("Harvard Law School", 2018).normalized("Harvard"))
                    .practice("Tax")
                    .practice("Litigation")
                    .language("Spanish")
                    .build()
                    .unwrap(),
            )
            .unwrap();

        store
            .add_profile(
                &ProfileRecord::builder()
                    .url("https://example.com/baker")
                    .name("Tom Baker")
                    .title("Partner")
                    .education(Education::law("YLS", 2005).normalized("Yale"))
                    .practice("Litigation")
                    .region("Asia")
                    .build()
                    .unwrap(),
            )
            .unwrap();

        store
    }

    fn names(store: &ProfileStore, query: &CompiledQuery) -> Vec<String> {
        store
            .execute(query, None)
            .unwrap()
            .into_iter()
            .map(|row| row.name)
            .collect()
    }

    fn pred(field: Field, op: CmpOp, value: &str) -> AstNode {
        AstNode::predicate(field, op, value)
    }

    #[test]
    fn test_empty_sequence_matches_all() {
        let store = seed_store();
        let query = compile(&[], &NoAliases);

        assert!(query.params.is_empty());
        let all = names(&store, &query);
        assert_eq!(all, vec!["Alice Chen", "Sarah Malone", "Tom Baker"]);
    }

    #[test]
    fn test_title_equals() {
        let store = seed_store();
        let query = compile(&[pred(Field::Title, CmpOp::Equals, "Partner")], &NoAliases);

        assert_eq!(names(&store, &query), vec!["Alice Chen", "Tom Baker"]);
    }

    #[test]
    fn test_results_ordered_by_display_name() {
        let store = seed_store();
        let query = compile(
            &[pred(Field::Practice, CmpOp::Equals, "Litigation")],
            &NoAliases,
        );

        // Malone before Baker would be insertion order; name order differs
        assert_eq!(names(&store, &query), vec!["Sarah Malone", "Tom Baker"]);
    }

    #[test]
    fn test_implicit_and_between_adjacent_predicates() {
        let store = seed_store();
        let query = compile(
            &[
                pred(Field::Title, CmpOp::Equals, "Partner"),
                pred(Field::Practice, CmpOp::Equals, "Tax"),
            ],
            &NoAliases,
        );

        assert!(query.sql.contains("AND"));
        assert_eq!(names(&store, &query), vec!["Alice Chen"]);
    }

    #[test]
    fn test_or_connective() {
        let store = seed_store();
        let query = compile(
            &[
                pred(Field::Title, CmpOp::Equals, "Partner"),
                AstNode::Connective(Connective::Or),
                pred(Field::Title, CmpOp::Equals, "Associate"),
            ],
            &NoAliases,
        );

        assert_eq!(
            names(&store, &query),
            vec!["Alice Chen", "Sarah Malone", "Tom Baker"]
        );
    }

    #[test]
    fn test_not_connective_on_scalar_field() {
        let store = seed_store();
        let query = compile(
            &[
                pred(Field::Practice, CmpOp::Equals, "Litigation"),
                AstNode::Connective(Connective::And),
                AstNode::Connective(Connective::Not),
                pred(Field::Title, CmpOp::Equals, "Partner"),
            ],
            &NoAliases,
        );

        assert_eq!(names(&store, &query), vec!["Sarah Malone"]);
    }

    #[test]
    fn test_graduation_year_uses_law_degree_only() {
        let store = seed_store();

        // Alice's undergrad year is 2018, law year 2010: "graduated after
        // 2015" must not match her
        let query = compile(
            &[AstNode::predicate(
                Field::GraduationYear,
                CmpOp::GreaterThan,
                2015i64,
            )],
            &NoAliases,
        );
        assert_eq!(names(&store, &query), vec!["Sarah Malone"]);

        let query = compile(
            &[AstNode::predicate(
                Field::GraduationYear,
                CmpOp::LessThan,
                2012i64,
            )],
            &NoAliases,
        );
        assert_eq!(names(&store, &query), vec!["Alice Chen", "Tom Baker"]);
    }

    #[test]
    fn test_name_contains_matches_whole_tokens() {
        let store = seed_store();

        let query = compile(&[pred(Field::Name, CmpOp::Contains, "malone")], &NoAliases);
        assert_eq!(names(&store, &query), vec!["Sarah Malone"]);

        // Substring of a token must not match
        let query = compile(&[pred(Field::Name, CmpOp::Contains, "alon")], &NoAliases);
        assert!(names(&store, &query).is_empty());
    }

    #[test]
    fn test_name_equals_is_phrase_match() {
        let store = seed_store();

        let query = compile(
            &[pred(Field::Name, CmpOp::Equals, "sarah malone")],
            &NoAliases,
        );
        assert_eq!(names(&store, &query), vec!["Sarah Malone"]);
        assert_eq!(
            query.params,
            vec![SqlValue::Text("\"sarah malone\"".to_string())]
        );
    }

    #[test]
    fn test_school_matches_raw_or_normalized() {
        let store = seed_store();
        let mut aliases = AliasTable::new();
        aliases.insert("yale law school", "Yale");

        // Tom's stored school_name is "YLS"; only the normalized column
        // can match a "yale" query
        let query = compile(&[pred(Field::School, CmpOp::Contains, "yale")], &aliases);
        assert_eq!(names(&store, &query), vec!["Alice Chen", "Tom Baker"]);
    }

    #[test]
    fn test_school_value_passes_through_resolver() {
        let mut aliases = AliasTable::new();
        aliases.insert("yale law school", "Yale");

        let query = compile(
            &[pred(Field::School, CmpOp::Equals, "yale law school")],
            &aliases,
        );
        assert_eq!(
            query.params,
            vec![
                SqlValue::Text("yale law school".to_string()),
                SqlValue::Text("Yale".to_string()),
            ]
        );
    }

    #[test]
    fn test_language_case_insensitive() {
        let store = seed_store();
        let query = compile(
            &[pred(Field::Language, CmpOp::Contains, "french")],
            &NoAliases,
        );

        assert_eq!(names(&store, &query), vec!["Alice Chen"]);
    }

    #[test]
    fn test_region_equals() {
        let store = seed_store();
        let query = compile(&[pred(Field::Region, CmpOp::Equals, "Asia")], &NoAliases);

        assert_eq!(names(&store, &query), vec!["Tom Baker"]);
    }

    #[test]
    fn test_unknown_combination_dropped() {
        let store = seed_store();

        // Contains on a year field has no meaning; the predicate and its
        // connective are both dropped
        let query = compile(
            &[
                pred(Field::Title, CmpOp::Equals, "Partner"),
                AstNode::Connective(Connective::And),
                pred(Field::GraduationYear, CmpOp::Contains, "2015"),
            ],
            &NoAliases,
        );

        assert!(!query.sql.ends_with("AND ORDER BY p.name"));
        assert_eq!(names(&store, &query), vec!["Alice Chen", "Tom Baker"]);
    }

    #[test]
    fn test_all_predicates_dropped_matches_all() {
        let store = seed_store();
        let query = compile(
            &[pred(Field::Name, CmpOp::GreaterThan, "zzz")],
            &NoAliases,
        );

        assert!(!query.sql.contains("WHERE"));
        assert_eq!(names(&store, &query).len(), 3);
    }

    #[test]
    fn test_leading_connective_dropped() {
        let query = compile(
            &[
                AstNode::Connective(Connective::And),
                pred(Field::Title, CmpOp::Equals, "Partner"),
            ],
            &NoAliases,
        );

        assert!(query.sql.contains("WHERE p.title = ?"));
    }

    #[test]
    fn test_joins_deduplicated() {
        let query = compile(
            &[
                pred(Field::School, CmpOp::Contains, "yale"),
                AstNode::Connective(Connective::Or),
                pred(Field::School, CmpOp::Contains, "harvard"),
            ],
            &NoAliases,
        );

        assert_eq!(query.sql.matches("LEFT JOIN educations").count(), 1);
    }

    #[test]
    fn test_unreferenced_tables_not_joined() {
        let query = compile(&[pred(Field::Title, CmpOp::Equals, "Partner")], &NoAliases);

        assert!(!query.sql.contains("JOIN"));
    }

    #[test]
    fn test_values_never_interpolated() {
        let hostile = "Partner' OR '1'='1";
        let query = compile(&[pred(Field::Title, CmpOp::Equals, hostile)], &NoAliases);

        assert!(!query.sql.contains(hostile));
        assert_eq!(query.params, vec![SqlValue::Text(hostile.to_string())]);

        // Executes harmlessly: no title equals the hostile string
        let store = seed_store();
        assert!(names(&store, &query).is_empty());
    }

    #[test]
    fn test_deterministic_output() {
        let ast = vec![
            pred(Field::School, CmpOp::Contains, "yale"),
            AstNode::Connective(Connective::And),
            pred(Field::Practice, CmpOp::Equals, "Tax"),
        ];

        let first = compile(&ast, &NoAliases);
        let second = compile(&ast, &NoAliases);
        assert_eq!(first, second);
    }
}
