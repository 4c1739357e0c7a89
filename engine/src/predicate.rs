//! Structured predicate representation
//!
//! The parsed form of a structured query: an ordered sequence of field
//! predicates and boolean connectives. Produced by the parser, consumed
//! once by the compiler.

use serde::{Deserialize, Serialize};

/// Profile attribute a predicate constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Title,
    School,
    GraduationYear,
    Practice,
    Industry,
    Region,
    Language,
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

/// Predicate value: text for most fields, a year for graduation queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateValue {
    Year(i64),
    Text(String),
}

impl From<&str> for PredicateValue {
    fn from(s: &str) -> Self {
        PredicateValue::Text(s.to_string())
    }
}

impl From<String> for PredicateValue {
    fn from(s: String) -> Self {
        PredicateValue::Text(s)
    }
}

impl From<i64> for PredicateValue {
    fn from(year: i64) -> Self {
        PredicateValue::Year(year)
    }
}

/// A single field/operator/value condition over a profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: Field,
    pub op: CmpOp,
    pub value: PredicateValue,
}

impl Predicate {
    pub fn new(field: Field, op: CmpOp, value: impl Into<PredicateValue>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }
}

/// Boolean connective between predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
    And,
    Or,
    Not,
}

/// One node of the parsed query sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AstNode {
    Connective(Connective),
    Predicate(Predicate),
}

impl AstNode {
    pub fn predicate(field: Field, op: CmpOp, value: impl Into<PredicateValue>) -> Self {
        AstNode::Predicate(Predicate::new(field, op, value))
    }
}

impl From<Connective> for AstNode {
    fn from(connective: Connective) -> Self {
        AstNode::Connective(connective)
    }
}

/// Ordered sequence alternating predicates and connectives.
/// The empty sequence means "match everything".
pub type PredicateSequence = Vec<AstNode>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_constructor() {
        let p = Predicate::new(Field::Title, CmpOp::Equals, "Partner");
        assert_eq!(p.field, Field::Title);
        assert_eq!(p.value, PredicateValue::Text("Partner".to_string()));

        let p = Predicate::new(Field::GraduationYear, CmpOp::GreaterThan, 2015i64);
        assert_eq!(p.value, PredicateValue::Year(2015));
    }

    #[test]
    fn test_ast_node_serde() {
        let nodes: PredicateSequence = vec![
            AstNode::predicate(Field::School, CmpOp::Contains, "yale"),
            AstNode::Connective(Connective::And),
            AstNode::predicate(Field::Practice, CmpOp::Equals, "Tax"),
        ];

        let json = serde_json::to_string(&nodes).unwrap();
        assert!(json.contains("\"AND\""));
        assert!(json.contains("\"school\""));

        let back: PredicateSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(nodes, back);
    }

    #[test]
    fn test_year_value_serializes_as_number() {
        let p = Predicate::new(Field::GraduationYear, CmpOp::Equals, 2015i64);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(":2015"));
    }
}
