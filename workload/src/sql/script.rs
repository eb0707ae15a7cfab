//! SQL script sections.
//!
//! ```sql
//! --+ create_schema
//! --= create_accounts
//! CREATE TABLE accounts (id INT PRIMARY KEY, balance INT);
//! -- plain comments are dropped
//! --+ workload
//! --= debit
//! UPDATE accounts SET balance = balance - ${amount} WHERE id = ${id};
//! ```
//!
//! `--+ name` opens a section, `--= name` opens a statement that runs until
//! the next marker.

use super::placeholders;
use crate::error::ConfigurationError;
use indexmap::IndexMap;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum QueryKind {
    CreateTable,
    Insert,
    Other,
}

impl QueryKind {
    fn classify(sql: &str) -> Self {
        let mut words = sql.split_whitespace().map(str::to_ascii_uppercase);
        match words.next().as_deref() {
            Some("INSERT") => QueryKind::Insert,
            Some("CREATE") => {
                let table = words
                    .take(3)
                    .any(|w| w == "TABLE");
                if table {
                    QueryKind::CreateTable
                } else {
                    QueryKind::Other
                }
            }
            _ => QueryKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub name: String,
    pub sql: String,
    /// Placeholder names in order of first appearance
    pub params: Vec<String>,
    pub kind: QueryKind,
    /// 1-based line of the `--=` marker
    pub line: usize,
}

/// Named statements grouped by section, both in script order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedScript {
    sections: IndexMap<String, Vec<ParsedStatement>>,
}

impl ParsedScript {
    pub fn sections(&self) -> impl Iterator<Item = (&str, &[ParsedStatement])> {
        self.sections
            .iter()
            .map(|(name, statements)| (name.as_str(), statements.as_slice()))
    }

    pub fn section(&self, name: &str) -> Option<&[ParsedStatement]> {
        self.sections.get(name).map(Vec::as_slice)
    }

    pub fn find(&self, section: &str, name: &str) -> Option<&ParsedStatement> {
        self.section(section)?.iter().find(|s| s.name == name)
    }

    /// First statement with this name in any section
    pub fn find_any(&self, name: &str) -> Option<&ParsedStatement> {
        self.sections
            .values()
            .flat_map(|statements| statements.iter())
            .find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

struct Pending {
    name: String,
    line: usize,
    body: Vec<String>,
}

fn finish(
    script: &mut ParsedScript,
    section: &str,
    pending: Option<Pending>,
) -> Result<(), ConfigurationError> {
    let Some(pending) = pending else {
        return Ok(());
    };
    let sql = pending.body.join("\n").trim().to_string();
    if sql.is_empty() {
        return Err(ConfigurationError::malformed(format!(
            "statement `{}` at line {} is empty",
            pending.name, pending.line
        )));
    }
    let statements = script.sections.entry(section.to_string()).or_default();
    if statements.iter().any(|s| s.name == pending.name) {
        return Err(ConfigurationError::malformed(format!(
            "statement `{}` is declared twice in section `{section}`",
            pending.name
        )));
    }
    statements.push(ParsedStatement {
        params: placeholders::names(&sql),
        kind: QueryKind::classify(&sql),
        name: pending.name,
        sql,
        line: pending.line,
    });
    Ok(())
}

/// Split a script into sections of named statements
pub fn parse(text: &str) -> Result<ParsedScript, ConfigurationError> {
    let mut script = ParsedScript::default();
    let mut section = String::new();
    let mut pending: Option<Pending> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if let Some(name) = line.strip_prefix("--+") {
            finish(&mut script, &section, pending.take())?;
            section = name.trim().to_string();
            script.sections.entry(section.clone()).or_default();
            continue;
        }
        if let Some(name) = line.strip_prefix("--=") {
            finish(&mut script, &section, pending.take())?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigurationError::malformed(format!(
                    "statement marker without a name at line {line_no}"
                )));
            }
            pending = Some(Pending {
                name: name.to_string(),
                line: line_no,
                body: Vec::new(),
            });
            continue;
        }
        if line.starts_with("--") || line.is_empty() {
            continue;
        }
        match pending.as_mut() {
            Some(p) => p.body.push(raw.trim_end().to_string()),
            None => {
                return Err(ConfigurationError::malformed(format!(
                    "SQL outside of a named statement at line {line_no}"
                )))
            }
        }
    }
    finish(&mut script, &section, pending.take())?;
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "
--+ create_schema
--= create_accounts
CREATE TABLE accounts (
    id INT PRIMARY KEY,  -- trailing comments stay
    balance INT
);

--= create_history
CREATE TABLE IF NOT EXISTS history (id INT);

--+ workload
-- debit first
--= debit
UPDATE accounts SET balance = balance - ${amount}
WHERE id = :id;
--= log
INSERT INTO history VALUES (:id);
";

    #[test]
    fn test_sections_and_statements() {
        let script = parse(SCRIPT).unwrap();
        let sections: Vec<_> = script.sections().map(|(name, s)| (name, s.len())).collect();
        assert_eq!(sections, [("create_schema", 2), ("workload", 2)]);

        let create = script.find("create_schema", "create_accounts").unwrap();
        assert_eq!(create.kind, QueryKind::CreateTable);
        assert!(create.sql.starts_with("CREATE TABLE accounts ("));
        assert!(create.sql.contains("trailing comments stay"));
        assert_eq!(create.line, 3);

        let history = script.find("create_schema", "create_history").unwrap();
        assert_eq!(history.kind, QueryKind::CreateTable);

        let debit = script.find("workload", "debit").unwrap();
        assert_eq!(debit.kind, QueryKind::Other);
        assert_eq!(debit.params, ["amount", "id"]);
        assert_eq!(
            debit.sql,
            "UPDATE accounts SET balance = balance - ${amount}\nWHERE id = :id;"
        );
        assert_eq!(script.find_any("log").unwrap().kind, QueryKind::Insert);
    }

    #[test]
    fn test_sql_before_marker_is_rejected() {
        assert!(parse("--+ s\nSELECT 1;").is_err());
    }

    #[test]
    fn test_duplicate_and_empty_statements() {
        assert!(parse("--= a\nSELECT 1;\n--= a\nSELECT 2;").is_err());
        assert!(parse("--= a\n-- nothing here\n--= b\nSELECT 1;").is_err());
    }

    #[test]
    fn test_statements_without_section() {
        let script = parse("--= ping\nSELECT 1;").unwrap();
        assert_eq!(script.find("", "ping").unwrap().sql, "SELECT 1;");
    }
}
