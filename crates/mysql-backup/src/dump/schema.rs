//! Schema statement generation.
//!
//! `CREATE TABLE` text from the server is parsed into its clause list so
//! foreign keys can be pulled out and re-attached with `ALTER TABLE` once
//! every table exists. The parser only understands the parenthesised
//! column/constraint list: it splits on top-level commas, honoring quotes
//! and nested parentheses, and leaves each clause's text untouched.

use std::collections::HashMap;

use crate::core::identifier::quote_mysql;
use crate::core::traits::RoutineKind;
use crate::error::{BackupError, Result};

/// What a clause in a `CREATE TABLE` list defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    /// Column definition.
    Column,
    /// `PRIMARY KEY (...)`.
    PrimaryKey,
    /// `KEY`, `INDEX`, `UNIQUE`, `FULLTEXT` or `SPATIAL` index.
    Key,
    /// `[CONSTRAINT name] FOREIGN KEY (...) REFERENCES ...`.
    ForeignKey,
    /// `[CONSTRAINT name] CHECK (...)`.
    Check,
    /// Anything else.
    Other,
}

/// One entry of the column/constraint list, without its separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableClause {
    pub kind: ClauseKind,
    pub text: String,
}

impl TableClause {
    fn new(text: &str) -> Self {
        Self {
            kind: classify(text),
            text: text.to_string(),
        }
    }
}

/// A `CREATE TABLE` statement split into head, clauses and table options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    /// Everything up to and including the opening parenthesis.
    pub head: String,
    /// Column and constraint clauses in declaration order.
    pub clauses: Vec<TableClause>,
    /// The closing parenthesis and everything after it.
    pub tail: String,
}

impl CreateTable {
    /// Parse the server's `SHOW CREATE TABLE` text for `table`.
    pub fn parse(table: &str, sql: &str) -> Result<Self> {
        if !starts_with_ignore_case(sql.trim_start(), "CREATE TABLE") {
            return Err(BackupError::introspection(
                table,
                "create statement does not start with CREATE TABLE",
            ));
        }

        let mut tracker = QuoteTracker::default();
        let open = sql
            .char_indices()
            .find(|&(_, c)| tracker.step(c) && c == '(')
            .map(|(i, _)| i)
            .ok_or_else(|| BackupError::introspection(table, "missing column list"))?;

        let mut clauses = Vec::new();
        let mut depth = 0usize;
        let mut start = open + 1;
        let mut close = None;

        for (offset, c) in sql[open + 1..].char_indices() {
            let i = open + 1 + offset;
            if !tracker.step(c) {
                continue;
            }
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    push_clause(&mut clauses, &sql[start..i]);
                    close = Some(i);
                    break;
                }
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    push_clause(&mut clauses, &sql[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }

        let close = close
            .ok_or_else(|| BackupError::introspection(table, "unbalanced column list"))?;
        if clauses.is_empty() {
            return Err(BackupError::introspection(table, "empty column list"));
        }

        Ok(Self {
            head: sql[..=open].trim_end().to_string(),
            clauses,
            tail: sql[close..].to_string(),
        })
    }

    /// Guard creation with `IF NOT EXISTS` unless it already is.
    pub fn make_idempotent(&mut self) {
        let Some(rest) = self.head.trim_start().get("CREATE TABLE".len()..) else {
            return;
        };
        let rest = rest.trim_start();
        if !starts_with_ignore_case(rest, "IF NOT EXISTS") {
            self.head = format!("CREATE TABLE IF NOT EXISTS {}", rest);
        }
    }

    /// Remove every foreign-key clause, returning them in declaration order.
    pub fn take_foreign_keys(&mut self) -> Vec<TableClause> {
        let (foreign, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.clauses)
            .into_iter()
            .partition(|c| c.kind == ClauseKind::ForeignKey);
        self.clauses = kept;
        foreign
    }

    /// Render back in the server's layout: one clause per line, indented
    /// two spaces, comma-separated.
    pub fn render(&self) -> String {
        let body = self
            .clauses
            .iter()
            .map(|c| format!("  {}", c.text))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("{}\n{}\n{}", self.head, body, self.tail)
    }
}

fn push_clause(clauses: &mut Vec<TableClause>, raw: &str) {
    let text = raw.trim();
    if !text.is_empty() {
        clauses.push(TableClause::new(text));
    }
}

fn classify(text: &str) -> ClauseKind {
    if text.starts_with('`') {
        return ClauseKind::Column;
    }
    let upper = text.to_ascii_uppercase();
    let (constrained, rest) = match upper.strip_prefix("CONSTRAINT") {
        Some(rest) if rest.starts_with(char::is_whitespace) => {
            (true, skip_constraint_name(rest.trim_start()))
        }
        _ => (false, upper.as_str()),
    };

    if starts_with_words(rest, &["FOREIGN", "KEY"]) {
        ClauseKind::ForeignKey
    } else if starts_with_words(rest, &["PRIMARY", "KEY"]) {
        ClauseKind::PrimaryKey
    } else if starts_with_words(rest, &["CHECK"]) {
        ClauseKind::Check
    } else if ["UNIQUE", "KEY", "INDEX", "FULLTEXT", "SPATIAL"]
        .iter()
        .any(|kw| starts_with_words(rest, &[*kw]))
    {
        ClauseKind::Key
    } else if constrained {
        ClauseKind::Other
    } else {
        ClauseKind::Column
    }
}

/// Skip the optional symbol after `CONSTRAINT`.
fn skip_constraint_name(rest: &str) -> &str {
    if let Some(quoted) = rest.strip_prefix('`') {
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '`' {
                if matches!(chars.peek(), Some((_, '`'))) {
                    chars.next();
                    continue;
                }
                return quoted[i + 1..].trim_start();
            }
        }
        return "";
    }
    let keyword_follows = ["PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]
        .iter()
        .any(|kw| starts_with_words(rest, &[*kw]));
    if keyword_follows {
        return rest;
    }
    rest.split_once(char::is_whitespace)
        .map_or("", |(_, after)| after.trim_start())
}

/// Whether `text` begins with the given words separated by whitespace.
fn starts_with_words(text: &str, words: &[&str]) -> bool {
    let mut rest = text;
    for word in words {
        match rest.strip_prefix(word) {
            Some(after) if after.is_empty() || !is_ident_char(after.chars().next().unwrap_or(' ')) => {
                rest = after.trim_start();
            }
            _ => return false,
        }
    }
    true
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Tracks whether the walk is inside a quoted string or identifier.
#[derive(Debug, Default)]
struct QuoteTracker {
    quote: Option<char>,
    escaped: bool,
}

impl QuoteTracker {
    /// Feed the next character; returns true when it is unquoted text.
    fn step(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        match self.quote {
            None => {
                if matches!(c, '\'' | '"' | '`') {
                    self.quote = Some(c);
                    false
                } else {
                    true
                }
            }
            Some(q) => {
                if c == '\\' && q != '`' {
                    self.escaped = true;
                } else if c == q {
                    self.quote = None;
                }
                false
            }
        }
    }
}

/// Byte offset of the first unquoted occurrence of `keyword` as a word.
fn find_keyword(sql: &str, keyword: &str) -> Option<usize> {
    let mut tracker = QuoteTracker::default();
    let mut prev: Option<char> = None;
    for (i, c) in sql.char_indices() {
        let unquoted = tracker.step(c);
        let boundary_before = prev.map_or(true, |p| !is_ident_char(p));
        prev = Some(c);
        if !unquoted || !boundary_before {
            continue;
        }
        let matched = sql
            .get(i..i + keyword.len())
            .is_some_and(|w| w.eq_ignore_ascii_case(keyword));
        let boundary_after = sql[i..]
            .get(keyword.len()..)
            .map_or(false, |after| after.chars().next().map_or(true, |n| !is_ident_char(n)));
        if matched && boundary_after {
            return Some(i);
        }
    }
    None
}

/// Result of rewriting one table's create statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Idempotent `CREATE TABLE` without foreign keys, terminated and
    /// followed by a blank line.
    pub sql: String,
    /// `ADD <clause>` fragments for the deferred `ALTER TABLE`.
    pub foreign_keys: Vec<String>,
}

/// Rewrite the server's create text for `table`.
///
/// Fails with [`BackupError::SchemaRewrite`] if the table consists of
/// nothing but foreign keys: there would be no valid `CREATE TABLE` left.
pub fn create_table(table: &str, create_sql: &str) -> Result<TableSchema> {
    let mut parsed = CreateTable::parse(table, create_sql)?;
    parsed.make_idempotent();

    let foreign = parsed.take_foreign_keys();
    if parsed.clauses.is_empty() {
        return Err(BackupError::schema_rewrite(
            table,
            format!(
                "all {} clause(s) are foreign keys; nothing left to create",
                foreign.len()
            ),
        ));
    }

    Ok(TableSchema {
        sql: format!("{};\n\n", parsed.render()),
        foreign_keys: foreign
            .into_iter()
            .map(|c| format!("ADD {}", c.text.trim_end_matches(',')))
            .collect(),
    })
}

/// Rewrite `SHOW CREATE VIEW` text into `CREATE OR REPLACE VIEW ...;`.
///
/// Algorithm, definer and SQL security attributes are dropped.
pub fn create_view(view: &str, create_sql: &str) -> Result<String> {
    let pos = find_keyword(create_sql, "VIEW")
        .ok_or_else(|| BackupError::introspection(view, "no VIEW keyword in create statement"))?;
    Ok(format!("CREATE OR REPLACE {};\n\n", create_sql[pos..].trim_end()))
}

/// `DROP TABLE IF EXISTS`.
pub fn drop_table(table: &str) -> Result<String> {
    Ok(format!("DROP TABLE IF EXISTS {};\n", quote_mysql(table)?))
}

/// `TRUNCATE`.
pub fn truncate_table(table: &str) -> Result<String> {
    Ok(format!("TRUNCATE {};\n", quote_mysql(table)?))
}

/// One `ALTER TABLE` re-attaching every deferred clause; empty when there
/// are none.
pub fn foreign_keys(table: &str, clauses: &[String]) -> Result<String> {
    if clauses.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(
        "ALTER TABLE {}\n {};\n\n",
        quote_mysql(table)?,
        clauses.join(",\n ")
    ))
}

/// `CREATE DATABASE IF NOT EXISTS` followed by `USE`.
pub fn create_database(database: &str, charset: &str, collation: &str) -> Result<String> {
    let quoted = quote_mysql(database)?;
    Ok(format!(
        "CREATE DATABASE IF NOT EXISTS {}\n\tCHARACTER SET {}\n\tCOLLATE {};\n\nUSE {};\n\n",
        quoted, charset, collation, quoted
    ))
}

/// A stored routine wrapped in a `$$` delimiter block.
pub fn routine(kind: RoutineKind, name: &str, create_sql: &str) -> Result<String> {
    Ok(format!(
        "DELIMITER $$\nDROP {} IF EXISTS {}$$\n{}$$\nDELIMITER ;\n\n",
        kind.keyword(),
        quote_mysql(name)?,
        create_sql.trim_end()
    ))
}

/// Foreign-key clauses deferred during one run, keyed by table.
#[derive(Debug, Default)]
pub struct DeferredForeignKeys {
    by_table: HashMap<String, Vec<String>>,
}

impl DeferredForeignKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record clauses for `table`, after any already recorded.
    pub fn defer(&mut self, table: &str, clauses: Vec<String>) {
        if clauses.is_empty() {
            return;
        }
        self.by_table
            .entry(table.to_string())
            .or_default()
            .extend(clauses);
    }

    /// Remove and return the clauses for `table`.
    pub fn take(&mut self, table: &str) -> Vec<String> {
        self.by_table.remove(table).unwrap_or_default()
    }

    /// Total number of deferred clauses.
    pub fn count(&self) -> usize {
        self.by_table.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = "CREATE TABLE `orders` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  `user_id` int NOT NULL,\n  `product_id` int DEFAULT NULL,\n  `note` varchar(255) DEFAULT 'a, b (c)',\n  PRIMARY KEY (`id`),\n  KEY `fk_user` (`user_id`),\n  CONSTRAINT `fk_product` FOREIGN KEY (`product_id`) REFERENCES `products` (`id`) ON DELETE SET NULL,\n  CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

    #[test]
    fn test_parse_clauses() {
        let parsed = CreateTable::parse("orders", ORDERS).unwrap();
        assert_eq!(parsed.head, "CREATE TABLE `orders` (");
        assert_eq!(parsed.tail, ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4");
        let kinds: Vec<ClauseKind> = parsed.clauses.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ClauseKind::Column,
                ClauseKind::Column,
                ClauseKind::Column,
                ClauseKind::Column,
                ClauseKind::PrimaryKey,
                ClauseKind::Key,
                ClauseKind::ForeignKey,
                ClauseKind::ForeignKey,
            ]
        );
        assert_eq!(parsed.clauses[3].text, "`note` varchar(255) DEFAULT 'a, b (c)'");
    }

    #[test]
    fn test_render_round_trips_server_layout() {
        let parsed = CreateTable::parse("orders", ORDERS).unwrap();
        assert_eq!(parsed.render(), ORDERS);
    }

    #[test]
    fn test_rewrite_extracts_foreign_keys() {
        let schema = create_table("orders", ORDERS).unwrap();
        assert_eq!(
            schema.foreign_keys,
            vec![
                "ADD CONSTRAINT `fk_product` FOREIGN KEY (`product_id`) REFERENCES `products` (`id`) ON DELETE SET NULL",
                "ADD CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`)",
            ]
        );
        assert!(schema.sql.starts_with("CREATE TABLE IF NOT EXISTS `orders` (\n"));
        assert!(!schema.sql.contains("FOREIGN KEY"));
        assert!(schema
            .sql
            .contains("  KEY `fk_user` (`user_id`)\n) ENGINE=InnoDB"));
    }

    #[test]
    fn test_rewrite_without_foreign_keys_only_guards_creation() {
        let sql = "CREATE TABLE `t` (\n  `id` int NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB";
        let schema = create_table("t", sql).unwrap();
        assert!(schema.foreign_keys.is_empty());
        assert_eq!(
            schema.sql,
            "CREATE TABLE IF NOT EXISTS `t` (\n  `id` int NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB;\n\n"
        );
    }

    #[test]
    fn test_make_idempotent_is_not_applied_twice() {
        let sql = "CREATE TABLE IF NOT EXISTS `t` (\n  `id` int\n)";
        let schema = create_table("t", sql).unwrap();
        assert_eq!(schema.sql, format!("{};\n\n", sql));
    }

    #[test]
    fn test_only_foreign_keys_fails_fast() {
        let sql = "CREATE TABLE `link` (\n  CONSTRAINT `fk` FOREIGN KEY (`a`) REFERENCES `b` (`id`)\n)";
        let err = create_table("link", sql).unwrap_err();
        assert!(matches!(err, BackupError::SchemaRewrite { .. }));
    }

    #[test]
    fn test_foreign_key_text_inside_comment_is_not_extracted() {
        let sql = "CREATE TABLE `t` (\n  `ref` int COMMENT 'FOREIGN KEY to x',\n  `id` int\n)";
        let schema = create_table("t", sql).unwrap();
        assert!(schema.foreign_keys.is_empty());
        assert!(schema.sql.contains("COMMENT 'FOREIGN KEY to x'"));
    }

    #[test]
    fn test_unnamed_foreign_key_and_check() {
        let sql = "CREATE TABLE `t` (\n  `a` int,\n  FOREIGN KEY (`a`) REFERENCES `u` (`id`),\n  CONSTRAINT `chk` CHECK ((`a` > 0))\n)";
        let parsed = CreateTable::parse("t", sql).unwrap();
        assert_eq!(parsed.clauses[1].kind, ClauseKind::ForeignKey);
        assert_eq!(parsed.clauses[2].kind, ClauseKind::Check);
    }

    #[test]
    fn test_parse_rejects_non_table() {
        assert!(CreateTable::parse("v", "CREATE VIEW `v` AS select 1").is_err());
        assert!(CreateTable::parse("t", "CREATE TABLE `t` (`a` int").is_err());
    }

    #[test]
    fn test_quoted_parenthesis_and_escapes() {
        let sql = "CREATE TABLE `t` (\n  `a` varchar(5) DEFAULT 'x\\')',\n  `b``c` int\n)";
        let parsed = CreateTable::parse("t", sql).unwrap();
        assert_eq!(parsed.clauses.len(), 2);
        assert_eq!(parsed.clauses[1].text, "`b``c` int");
    }

    #[test]
    fn test_create_view_drops_definer() {
        let sql = "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `vi_aromas` AS select `a`.`id` AS `id` from `aromas` `a`";
        assert_eq!(
            create_view("vi_aromas", sql).unwrap(),
            "CREATE OR REPLACE VIEW `vi_aromas` AS select `a`.`id` AS `id` from `aromas` `a`;\n\n"
        );
    }

    #[test]
    fn test_create_view_ignores_quoted_keyword() {
        let sql = "CREATE DEFINER=`VIEW`@`%` SQL SECURITY INVOKER VIEW `preview` AS select 1";
        assert_eq!(
            create_view("preview", sql).unwrap(),
            "CREATE OR REPLACE VIEW `preview` AS select 1;\n\n"
        );
        assert!(create_view("x", "CREATE TABLE `previews` (`a` int)").is_err());
    }

    #[test]
    fn test_statement_helpers() {
        assert_eq!(drop_table("users").unwrap(), "DROP TABLE IF EXISTS `users`;\n");
        assert_eq!(truncate_table("users").unwrap(), "TRUNCATE `users`;\n");
        assert_eq!(
            create_database("acme", "utf8", "utf8_general_ci").unwrap(),
            "CREATE DATABASE IF NOT EXISTS `acme`\n\tCHARACTER SET utf8\n\tCOLLATE utf8_general_ci;\n\nUSE `acme`;\n\n"
        );
    }

    #[test]
    fn test_foreign_keys_statement() {
        assert_eq!(foreign_keys("t", &[]).unwrap(), "");
        let clauses = vec![
            "ADD CONSTRAINT `a` FOREIGN KEY (`x`) REFERENCES `u` (`id`)".to_string(),
            "ADD CONSTRAINT `b` FOREIGN KEY (`y`) REFERENCES `v` (`id`)".to_string(),
        ];
        assert_eq!(
            foreign_keys("t", &clauses).unwrap(),
            "ALTER TABLE `t`\n ADD CONSTRAINT `a` FOREIGN KEY (`x`) REFERENCES `u` (`id`),\n ADD CONSTRAINT `b` FOREIGN KEY (`y`) REFERENCES `v` (`id`);\n\n"
        );
    }

    #[test]
    fn test_routine_block() {
        let sql = "CREATE DEFINER=`root`@`localhost` PROCEDURE `p`()\nBEGIN\n  SELECT 1;\nEND";
        assert_eq!(
            routine(RoutineKind::Procedure, "p", sql).unwrap(),
            "DELIMITER $$\nDROP PROCEDURE IF EXISTS `p`$$\nCREATE DEFINER=`root`@`localhost` PROCEDURE `p`()\nBEGIN\n  SELECT 1;\nEND$$\nDELIMITER ;\n\n"
        );
    }

    #[test]
    fn test_deferred_foreign_keys() {
        let mut deferred = DeferredForeignKeys::new();
        deferred.defer("a", vec![]);
        assert_eq!(deferred.count(), 0);
        deferred.defer("a", vec!["ADD x".to_string()]);
        deferred.defer("a", vec!["ADD y".to_string()]);
        assert_eq!(deferred.count(), 2);
        assert_eq!(deferred.take("a"), vec!["ADD x", "ADD y"]);
        assert!(deferred.take("a").is_empty());
        assert_eq!(deferred.count(), 0);
    }
}
