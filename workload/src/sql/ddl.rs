//! `CREATE TABLE` introspection.

use crate::generation::GenerationRule;
use logos::Logos;
use tracing::warn;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"--[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token<'a> {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(".")]
    Dot,

    #[regex(r"[A-Za-z_][A-Za-z0-9_$]*", |lex| lex.slice())]
    Word(&'a str),

    /// `"Quoted Name"`, returned without the quotes
    #[regex(r#""([^"]|"")*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    QuotedIdent(&'a str),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'a str),

    #[regex(r"'([^']|'')*'")]
    StringLit,

    #[regex(r#"[^ \t\r\n\f(),;."'A-Za-z0-9_]"#)]
    Symbol,
}

impl Token<'_> {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn ident(&self) -> Option<&str> {
        match self {
            Token::Word(w) | Token::QuotedIdent(w) => Some(w),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// Upper-cased type name, e.g. `VARCHAR` or `DOUBLE PRECISION`
    pub data_type: String,
    /// Type modifiers such as the `20` in `VARCHAR(20)`
    pub args: Vec<u64>,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

/// Keywords that end a column's type and start its constraints
const CONSTRAINT_WORDS: &[&str] = &[
    "NOT", "NULL", "DEFAULT", "PRIMARY", "REFERENCES", "UNIQUE", "CHECK", "CONSTRAINT",
    "GENERATED", "COLLATE", "AUTOINCREMENT", "AUTO_INCREMENT",
];

/// Keywords that open a table-level constraint
const TABLE_CONSTRAINT_WORDS: &[&str] = &[
    "CONSTRAINT", "PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "EXCLUDE", "LIKE",
];

fn tokenize(sql: &str) -> Vec<Token<'_>> {
    // unknown bytes are not interesting for column extraction
    Token::lexer(sql).filter_map(Result::ok).collect()
}

/// Every `CREATE TABLE` statement in `sql`
pub fn create_tables(sql: &str) -> Vec<TableDef> {
    let tokens = tokenize(sql);
    let mut tables = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].is_keyword("CREATE") {
            if let Some((table, next)) = parse_create_table(&tokens, i + 1) {
                tables.push(table);
                i = next;
                continue;
            }
        }
        i += 1;
    }
    tables
}

/// The `CREATE TABLE` for `table`, matched case-insensitively and ignoring schema qualifiers
pub fn find_table(sql: &str, table: &str) -> Option<TableDef> {
    create_tables(sql)
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(table))
}

fn parse_create_table(tokens: &[Token<'_>], mut i: usize) -> Option<(TableDef, usize)> {
    while tokens.get(i).is_some_and(|t| {
        ["TEMP", "TEMPORARY", "UNLOGGED", "GLOBAL", "LOCAL"]
            .iter()
            .any(|k| t.is_keyword(k))
    }) {
        i += 1;
    }
    if !tokens.get(i)?.is_keyword("TABLE") {
        return None;
    }
    i += 1;
    if tokens.get(i)?.is_keyword("IF") {
        i += 3;
    }

    let mut name = tokens.get(i)?.ident()?.to_string();
    i += 1;
    while tokens.get(i) == Some(&Token::Dot) {
        name = tokens.get(i + 1)?.ident()?.to_string();
        i += 2;
    }
    if tokens.get(i) != Some(&Token::LParen) {
        return None;
    }
    i += 1;

    // split the body into top-level comma separated entries
    let mut entries: Vec<&[Token<'_>]> = Vec::new();
    let mut depth = 0usize;
    let mut start = i;
    loop {
        match tokens.get(i)? {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => {
                entries.push(&tokens[start..i]);
                i += 1;
                break;
            }
            Token::RParen => depth -= 1,
            Token::Comma if depth == 0 => {
                entries.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    let mut columns = Vec::new();
    let mut table_pk: Vec<String> = Vec::new();
    for entry in entries.into_iter().filter(|e| !e.is_empty()) {
        if TABLE_CONSTRAINT_WORDS.iter().any(|k| entry[0].is_keyword(k)) {
            if let Some(pk) = table_primary_key(entry) {
                table_pk = pk;
            }
            continue;
        }
        if let Some(column) = parse_column(entry) {
            columns.push(column);
        }
    }
    if let [single] = table_pk.as_slice() {
        for column in columns.iter_mut().filter(|c| c.name.eq_ignore_ascii_case(single)) {
            column.primary_key = true;
        }
    }
    Some((TableDef { name, columns }, i))
}

fn table_primary_key(entry: &[Token<'_>]) -> Option<Vec<String>> {
    let at = entry.iter().position(|t| t.is_keyword("PRIMARY"))?;
    if !entry.get(at + 1)?.is_keyword("KEY") {
        return None;
    }
    let open = at + 2;
    if entry.get(open) != Some(&Token::LParen) {
        return None;
    }
    let columns = entry[open + 1..]
        .iter()
        .take_while(|t| **t != Token::RParen)
        .filter_map(|t| t.ident().map(str::to_string))
        .collect();
    Some(columns)
}

fn parse_column(entry: &[Token<'_>]) -> Option<ColumnDef> {
    let name = entry.first()?.ident()?.to_string();
    let mut i = 1;
    let mut type_words = Vec::new();
    while let Some(Token::Word(word)) = entry.get(i) {
        if CONSTRAINT_WORDS.iter().any(|k| word.eq_ignore_ascii_case(k)) {
            break;
        }
        type_words.push(word.to_ascii_uppercase());
        i += 1;
    }

    let mut args = Vec::new();
    if entry.get(i) == Some(&Token::LParen) {
        i += 1;
        while let Some(token) = entry.get(i) {
            i += 1;
            match token {
                Token::RParen => break,
                Token::Number(n) => args.extend(n.parse::<u64>().ok()),
                _ => {}
            }
        }
        // `TIMESTAMP(3) WITH TIME ZONE`
        while let Some(Token::Word(word)) = entry.get(i) {
            if CONSTRAINT_WORDS.iter().any(|k| word.eq_ignore_ascii_case(k)) {
                break;
            }
            type_words.push(word.to_ascii_uppercase());
            i += 1;
        }
    }

    let rest = &entry[i..];
    let has = |a: &str, b: &str| {
        rest.windows(2)
            .any(|w| w[0].is_keyword(a) && w[1].is_keyword(b))
    };
    Some(ColumnDef {
        name,
        data_type: type_words.join(" "),
        args,
        primary_key: has("PRIMARY", "KEY"),
        unique: rest.iter().any(|t| t.is_keyword("UNIQUE")),
        not_null: has("NOT", "NULL"),
    })
}

/// Default string length for unbounded character types
pub const DEFAULT_STRING_LEN: usize = 100;

/// Pick a generator for a column from its declared type
pub fn rule_for_column(column: &ColumnDef) -> Option<GenerationRule> {
    let base = column
        .data_type
        .split(' ')
        .next()
        .unwrap_or_default();
    let arg = |i: usize| column.args.get(i).copied();
    let key = column.primary_key || column.unique;

    let int = |max: i64| {
        if key {
            GenerationRule::sequential(1, max).unique()
        } else {
            GenerationRule::int_range(1, max)
        }
    };

    let rule = match base {
        "SMALLINT" | "INT2" => int(i16::MAX as i64),
        "INT" | "INTEGER" | "INT4" | "MEDIUMINT" => int(i32::MAX as i64),
        "BIGINT" | "INT8" => int(i64::MAX),
        "SERIAL" | "SERIAL4" => GenerationRule::sequential(1, i32::MAX as i64).unique(),
        "SMALLSERIAL" | "SERIAL2" => GenerationRule::sequential(1, i16::MAX as i64).unique(),
        "BIGSERIAL" | "SERIAL8" => GenerationRule::sequential(1, i64::MAX).unique(),
        "BOOLEAN" | "BOOL" => GenerationRule::int_range(0, 1),
        "VARCHAR" | "NVARCHAR" | "VARCHAR2" | "TEXT" | "STRING" | "CHARACTER"
            if column.data_type.contains("VARYING") || base != "CHARACTER" =>
        {
            let max = arg(0).map_or(DEFAULT_STRING_LEN, |n| n as usize);
            let rule = GenerationRule::string(max.min(1), max);
            if key {
                rule.unique()
            } else {
                rule
            }
        }
        "CHAR" | "CHARACTER" | "BPCHAR" | "NCHAR" => {
            let len = arg(0).map_or(1, |n| n as usize);
            let rule = GenerationRule::string(len, len);
            if key {
                rule.unique()
            } else {
                rule
            }
        }
        "DECIMAL" | "NUMERIC" => {
            let precision = arg(0).unwrap_or(10) as i32;
            let scale = arg(1).unwrap_or(0) as i32;
            let digits = (precision - scale).clamp(0, 15);
            let max = if digits == 0 { 1.0 - 10f64.powi(-scale.max(1)) } else { 10f64.powi(digits) - 1.0 };
            GenerationRule::float_range(0.0, max)
        }
        "REAL" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" => GenerationRule::float_range(0.0, 1_000_000.0),
        "TIMESTAMP" | "TIMESTAMPTZ" | "DATE" | "DATETIME" | "TIME" => GenerationRule::now(),
        _ => {
            warn!(column = %column.name, data_type = %column.data_type, "no generator for column type, skipping");
            return None;
        }
    };
    Some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::RuleKind;

    #[test]
    fn test_columns_in_order() {
        let table = find_table(
            "CREATE TABLE t(id INT, name VARCHAR(20), created_at TIMESTAMP)",
            "t",
        )
        .unwrap();
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "created_at"]);
        assert_eq!(table.columns[1].data_type, "VARCHAR");
        assert_eq!(table.columns[1].args, [20]);
    }

    #[test]
    fn test_constraints_and_qualified_names() {
        let sql = r#"
            CREATE TABLE IF NOT EXISTS public."District" (
                d_id INTEGER NOT NULL,
                d_w_id INTEGER REFERENCES warehouse(w_id), -- fk
                d_tax DECIMAL(4, 4) DEFAULT 0.1,
                d_city CHARACTER VARYING(20),
                d_since TIMESTAMP(3) WITH TIME ZONE,
                PRIMARY KEY (d_w_id, d_id)
            );
        "#;
        let table = find_table(sql, "district").unwrap();
        assert_eq!(table.name, "District");
        assert_eq!(table.columns.len(), 5);
        assert!(table.columns[0].not_null);
        assert!(!table.columns[0].primary_key);
        assert_eq!(table.columns[2].args, [4, 4]);
        assert_eq!(table.columns[3].data_type, "CHARACTER VARYING");
        assert_eq!(table.columns[4].data_type, "TIMESTAMP WITH TIME ZONE");
    }

    #[test]
    fn test_single_column_table_pk() {
        let table = find_table("CREATE TABLE w (w_id INT, PRIMARY KEY (w_id))", "w").unwrap();
        assert!(table.columns[0].primary_key);
    }

    #[test]
    fn test_multiple_tables() {
        let sql = "CREATE TABLE a (x INT); CREATE INDEX i ON a (x); CREATE TEMP TABLE b (y TEXT);";
        let tables = create_tables(sql);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].name, "b");
    }

    #[test]
    fn test_rules_by_type() {
        let table = find_table(
            "CREATE TABLE t (a INT PRIMARY KEY, b VARCHAR(20), c CHAR(2), d DECIMAL(4,2), e TIMESTAMP, f TEXT, g BOOLEAN, h GEOMETRY)",
            "t",
        )
        .unwrap();
        let rules: Vec<_> = table.columns.iter().map(rule_for_column).collect();
        assert_eq!(
            rules[0].as_ref().unwrap().kind,
            RuleKind::Sequential {
                min: 1,
                max: i32::MAX as i64,
                wrap: true
            }
        );
        assert!(rules[0].as_ref().unwrap().unique);
        assert!(matches!(
            rules[1].as_ref().unwrap().kind,
            RuleKind::StringRange { min_len: 1, max_len: 20, .. }
        ));
        assert!(matches!(
            rules[2].as_ref().unwrap().kind,
            RuleKind::StringRange { min_len: 2, max_len: 2, .. }
        ));
        assert_eq!(
            rules[3].as_ref().unwrap().kind,
            RuleKind::FloatRange { min: 0.0, max: 99.0 }
        );
        assert_eq!(rules[4].as_ref().unwrap().kind, RuleKind::DateTimeNow);
        assert!(matches!(
            rules[5].as_ref().unwrap().kind,
            RuleKind::StringRange { max_len: DEFAULT_STRING_LEN, .. }
        ));
        assert_eq!(rules[6].as_ref().unwrap().kind, RuleKind::IntRange { min: 0, max: 1 });
        assert!(rules[7].is_none());
    }
}
