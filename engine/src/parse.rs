//! Natural-language query parsing
//!
//! Translates structured-intent queries into predicate sequences using a
//! fixed-priority set of extraction rules. Each rule consumes the slice
//! of the query it matched, so later rules only see the remaining text
//! and the first matching pattern wins per field. Queries joined with
//! "and" are split and parsed independently.

use lexfind_corpus::AliasResolver;
use regex::Regex;

use crate::predicate::{AstNode, CmpOp, Connective, Field, PredicateSequence};

const GRADUATION_PATTERNS: &[(&str, CmpOp)] = &[
    (r"\bgraduated\s+after\s+(\d{4})", CmpOp::GreaterThan),
    (r"\bgraduated\s+before\s+(\d{4})", CmpOp::LessThan),
    (r"\bgraduated\s+in\s+(\d{4})", CmpOp::Equals),
    (r"\bgraduated\s+(\d{4})", CmpOp::Equals),
    (r"\blaw\s+school\s+after\s+(\d{4})", CmpOp::GreaterThan),
    (r"\blaw\s+school\s+before\s+(\d{4})", CmpOp::LessThan),
    (r"\blaw\s+school\s+in\s+(\d{4})", CmpOp::Equals),
];

const NAME_PATTERNS: &[&str] = &[
    r"\blawyers?\s+named\s+([a-z\s]+)",
    r"\bname\s+is\s+([a-z\s]+)",
    r"\bname\s+([a-z\s]+)",
];

const SCHOOL_PATTERNS: &[&str] = &[
    r"\bwent\s+to\s+([a-z\s]+)",
    r"\bgraduated\s+from\s+([a-z\s]+)",
    r"\bfrom\s+([a-z\s]+)",
    r"\bschool\s+is\s+([a-z\s]+)",
];

const PRACTICE_PATTERNS: &[&str] = &[
    r"\bpractice\s+type\s+is\s+([a-z\s&]+)",
    r"\bpractice\s+([a-z\s&]+)",
    r"\blawyers?\s+in\s+([a-z\s&]+)",
    r"\bin\s+([a-z\s&]+)",
];

/// Longest title phrases first so "managing partners" never matches as
/// a bare "partners".
const TITLE_MAPPINGS: &[(&str, &str)] = &[
    (r"\bmanaging\s+partners?\b", "Managing Partner"),
    (r"\bsenior\s+partners?\b", "Senior Partner"),
    (r"\bsenior\s+counsel\b", "Senior Counsel"),
    (r"\bof\s+counsel\b", "Of Counsel"),
    (r"\bco-?heads?\b", "Co-Head"),
    (r"\bpartners?\b", "Partner"),
    (r"\bcounsel\b", "Counsel"),
    (r"\bassociates?\b", "Associate"),
    (r"\bheads?\b", "Head"),
];

const REGION_PATTERNS: &[&str] = &[
    r"\bin\s+(asia|china|japan|europe|latin\s+america|israel)",
    r"\bregion\s+is\s+([a-z\s]+)",
];

const LANGUAGE_PATTERNS: &[&str] = &[
    r"\blawyers?\s+who\s+speak\s+([a-z\s\-]+)",
    r"\bspeak\s+([a-z\s\-]+)",
    r"\blanguage\s+is\s+([a-z\s\-]+)",
    r"\blanguages?\s+([a-z\s\-]+)",
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "who", "that", "is", "are", "lawyers", "lawyer",
];

/// Parse a natural-language query into a predicate sequence.
/// An empty or unparseable query yields the empty sequence.
pub fn parse_query(query: &str, practice_aliases: &dyn AliasResolver) -> PredicateSequence {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    // "X and Y" splits into independently parsed parts joined with AND
    if let Ok(splitter) = Regex::new(r"\s+and\s+") {
        if splitter.is_match(&query) {
            let mut ast = Vec::new();
            for part in splitter.split(&query) {
                let part_ast = parse_part(part.trim(), practice_aliases);
                if part_ast.is_empty() {
                    continue;
                }
                if !ast.is_empty() {
                    ast.push(AstNode::Connective(Connective::And));
                }
                ast.extend(part_ast);
            }
            return ast;
        }
    }

    parse_part(&query, practice_aliases)
}

fn parse_part(query: &str, practice_aliases: &dyn AliasResolver) -> PredicateSequence {
    let mut buffer = query.to_string();
    let mut ast = Vec::new();

    extract_graduation(&mut buffer, &mut ast);
    extract_name(&mut buffer, &mut ast);
    extract_school(&mut buffer, &mut ast);
    extract_practice(&mut buffer, &mut ast, practice_aliases);
    extract_title(&mut buffer, &mut ast);
    extract_region(&mut buffer, &mut ast);
    extract_language(&mut buffer, &mut ast);

    if ast.is_empty() {
        extract_fallback_name(&buffer, &mut ast);
    }

    ast
}

/// Remove the first match of `pattern` from the buffer and return its
/// first capture group.
fn take_capture(buffer: &mut String, pattern: &str) -> Option<String> {
    let Ok(re) = Regex::new(pattern) else {
        return None;
    };
    let captured = re
        .captures(buffer)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())?;
    *buffer = collapse_whitespace(&re.replace(buffer, ""));
    Some(captured)
}

/// Remove the first match of `pattern` from the buffer, if any.
fn take_match(buffer: &mut String, pattern: &str) -> bool {
    let Ok(re) = Regex::new(pattern) else {
        return false;
    };
    if !re.is_match(buffer) {
        return false;
    }
    *buffer = collapse_whitespace(&re.replace(buffer, ""));
    true
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_graduation(buffer: &mut String, ast: &mut PredicateSequence) {
    for (pattern, op) in GRADUATION_PATTERNS {
        if let Some(year_text) = take_capture(buffer, pattern) {
            if let Ok(year) = year_text.parse::<i64>() {
                ast.push(AstNode::predicate(Field::GraduationYear, *op, year));
            }
            return;
        }
    }
}

fn extract_name(buffer: &mut String, ast: &mut PredicateSequence) {
    for pattern in NAME_PATTERNS {
        if let Some(name) = take_capture(buffer, pattern) {
            if !name.is_empty() {
                ast.push(AstNode::predicate(Field::Name, CmpOp::Contains, name));
            }
            return;
        }
    }
}

fn extract_school(buffer: &mut String, ast: &mut PredicateSequence) {
    for pattern in SCHOOL_PATTERNS {
        if let Some(school) = take_capture(buffer, pattern) {
            let school = strip_articles(&school);
            if !school.is_empty() {
                ast.push(AstNode::predicate(Field::School, CmpOp::Contains, school));
            }
            return;
        }
    }
}

fn strip_articles(text: &str) -> String {
    match Regex::new(r"\b(and|the|a|an)\b") {
        Ok(re) => collapse_whitespace(&re.replace_all(text, "")),
        Err(_) => text.to_string(),
    }
}

fn extract_practice(
    buffer: &mut String,
    ast: &mut PredicateSequence,
    aliases: &dyn AliasResolver,
) {
    for pattern in PRACTICE_PATTERNS {
        if let Some(practice) = take_capture(buffer, pattern) {
            if practice.is_empty() {
                return;
            }
            let resolved = aliases.normalize(&practice);
            // No alias mapping means we only have the lowercased raw text
            let practice = if resolved == practice {
                title_case(&practice)
            } else {
                resolved
            };
            ast.push(AstNode::predicate(Field::Practice, CmpOp::Equals, practice));
            return;
        }
    }
}

fn extract_title(buffer: &mut String, ast: &mut PredicateSequence) {
    for (pattern, title) in TITLE_MAPPINGS {
        if take_match(buffer, pattern) {
            ast.push(AstNode::predicate(Field::Title, CmpOp::Equals, *title));
            return;
        }
    }

    if let Some(title) = take_capture(buffer, r"title\s+is\s+([a-z\s\-]+)") {
        if !title.is_empty() {
            ast.push(AstNode::predicate(
                Field::Title,
                CmpOp::Equals,
                title_case(&title),
            ));
        }
    }
}

fn extract_region(buffer: &mut String, ast: &mut PredicateSequence) {
    for pattern in REGION_PATTERNS {
        if let Some(region) = take_capture(buffer, pattern) {
            if region.is_empty() {
                return;
            }
            let region = if region.contains("latin america") {
                "Latin America".to_string()
            } else {
                title_case(&region)
            };
            ast.push(AstNode::predicate(Field::Region, CmpOp::Equals, region));
            return;
        }
    }
}

fn extract_language(buffer: &mut String, ast: &mut PredicateSequence) {
    for pattern in LANGUAGE_PATTERNS {
        if let Some(language) = take_capture(buffer, pattern) {
            if !language.is_empty() {
                ast.push(AstNode::predicate(
                    Field::Language,
                    CmpOp::Contains,
                    language,
                ));
            }
            return;
        }
    }
}

/// Last resort: leftover non-stopword tokens become a name search.
fn extract_fallback_name(buffer: &str, ast: &mut PredicateSequence) {
    let keywords: Vec<&str> = buffer
        .split_whitespace()
        .filter(|word| word.len() > 2 && !STOP_WORDS.contains(word))
        .collect();

    if !keywords.is_empty() {
        ast.push(AstNode::predicate(
            Field::Name,
            CmpOp::Contains,
            keywords.join(" "),
        ));
    }
}
