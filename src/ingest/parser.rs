//! DDL statement parser.
//!
//! Walks the token stream of one schema source and extracts CREATE TABLE,
//! CREATE INDEX, CREATE VIEW, ALTER TABLE ADD CONSTRAINT and INSERT statements
//! into a [`RawModel`]. A malformed statement produces one ParseError
//! diagnostic and the parser resumes at the next `;`, so the rest of the
//! source still parses (best-effort recovery). Statements the generator has no use
//! for are skipped without comment.

use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::ingest::lexer::{Lexer, SpannedToken, Token};
use crate::schema::{
    ColumnDefinition, ForeignKeyReference, IndexDefinition, QualifiedName, RawModel, SeedBatch,
    TableDefinition, ViewDefinition, DEFAULT_SCHEMA,
};

/// Parse one schema source into a raw model plus parse diagnostics.
pub fn parse_source(name: &str, text: &str) -> (RawModel, Vec<Diagnostic>) {
    let tokens = Lexer::new(text).tokenize();
    let mut parser = Parser::new(name, tokens);
    parser.parse();
    (parser.model, parser.diagnostics)
}

struct ParseFailure {
    location: Location,
    message: String,
}

impl ParseFailure {
    fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    model: RawModel,
    diagnostics: Vec<Diagnostic>,
}

struct ParsedColumn {
    column: ColumnDefinition,
    inline_fk: Option<ForeignKeyReference>,
    unique: bool,
}

impl Parser {
    fn new(source: &str, tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            model: RawModel {
                source: source.to_string(),
                ..Default::default()
            },
            diagnostics: Vec::new(),
        }
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn location(&self) -> Location {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.location)
            .unwrap_or(Location::new(1, 1))
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParseFailure> {
        if self.current() == &token {
            self.advance();
            Ok(())
        } else {
            Err(ParseFailure::new(
                self.location(),
                format!("expected {}, found {:?}", what, self.current()),
            ))
        }
    }

    fn ident(&mut self) -> Result<String, ParseFailure> {
        match self.current() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(ParseFailure::new(
                self.location(),
                format!("expected identifier, found {:?}", other),
            )),
        }
    }

    fn qualified_name(&mut self) -> Result<QualifiedName, ParseFailure> {
        let first = self.ident()?;
        if self.eat(&Token::Dot) {
            let second = self.ident()?;
            Ok(QualifiedName::new(first, second))
        } else {
            Ok(QualifiedName::new(DEFAULT_SCHEMA, first))
        }
    }

    fn fail(&mut self, failure: ParseFailure) {
        let source = self.model.source.clone();
        self.diagnostics.push(
            Diagnostic::new(DiagnosticKind::ParseError, failure.message)
                .with_source(source)
                .with_location(failure.location),
        );
        self.skip_statement();
    }

    fn parse(&mut self) {
        loop {
            match self.current() {
                Token::Eof => break,
                Token::Create => {
                    self.advance();
                    let mut unique = false;
                    let mut clustered = false;
                    loop {
                        match self.current() {
                            Token::Unique => {
                                unique = true;
                                self.advance();
                            }
                            Token::Clustered => {
                                clustered = true;
                                self.advance();
                            }
                            Token::Nonclustered => {
                                self.advance();
                            }
                            _ => break,
                        }
                    }
                    match self.current().clone() {
                        Token::Table => {
                            self.advance();
                            if let Err(failure) = self.parse_create_table() {
                                self.fail(failure);
                            }
                        }
                        Token::View => {
                            self.advance();
                            if let Err(failure) = self.parse_create_view() {
                                self.fail(failure);
                            }
                        }
                        Token::Index => {
                            self.advance();
                            if let Err(failure) = self.parse_create_index(unique, clustered) {
                                self.fail(failure);
                            }
                        }
                        _ => {
                            // Other CREATE statements (SEQUENCE, TRIGGER, ...)
                            self.skip_statement();
                        }
                    }
                }
                Token::Alter => {
                    if let Err(failure) = self.parse_alter_table() {
                        self.fail(failure);
                    }
                }
                Token::Insert => {
                    self.advance();
                    if let Err(failure) = self.parse_insert() {
                        self.fail(failure);
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_if_not_exists(&mut self) {
        if self.eat(&Token::If) {
            self.eat(&Token::Not);
            self.eat(&Token::Exists);
        }
    }

    fn parse_create_table(&mut self) -> Result<(), ParseFailure> {
        self.skip_if_not_exists();
        let name = self.qualified_name()?;
        self.expect(Token::LParen, "'(' after table name")?;

        let mut columns: Vec<ColumnDefinition> = Vec::new();
        let mut indexes: Vec<IndexDefinition> = Vec::new();
        let mut foreign_keys: Vec<ForeignKeyReference> = Vec::new();
        let mut pk_columns: Vec<String> = Vec::new();
        let mut constraint_name: Option<String> = None;
        let mut synthesized = 0usize;

        loop {
            match self.current() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Comma => {
                    self.advance();
                    constraint_name = None;
                }
                Token::Constraint => {
                    self.advance();
                    constraint_name = Some(self.ident()?);
                }
                Token::Primary => {
                    self.advance();
                    self.expect(Token::Key, "KEY after PRIMARY")?;
                    let clustered = self.eat(&Token::Clustered);
                    self.eat(&Token::Nonclustered);
                    let cols = self.column_list()?;
                    if cols.is_empty() {
                        return Err(ParseFailure::new(
                            self.location(),
                            "PRIMARY KEY constraint requires at least one column",
                        ));
                    }
                    pk_columns.extend(cols.iter().cloned());
                    indexes.push(IndexDefinition {
                        name: constraint_name
                            .take()
                            .unwrap_or_else(|| format!("PK_{}", name.name)),
                        unique: true,
                        clustered,
                        primary_key: true,
                        columns: cols,
                    });
                }
                Token::Foreign => {
                    let fks = self.parse_foreign_key_clause()?;
                    foreign_keys.extend(fks);
                    constraint_name = None;
                }
                Token::Unique => {
                    self.advance();
                    self.eat(&Token::Key);
                    let clustered = self.eat(&Token::Clustered);
                    self.eat(&Token::Nonclustered);
                    let cols = self.column_list()?;
                    if !cols.is_empty() {
                        synthesized += 1;
                        indexes.push(IndexDefinition {
                            name: constraint_name
                                .take()
                                .unwrap_or_else(|| format!("UQ_{}_{}", name.name, synthesized)),
                            unique: true,
                            clustered,
                            primary_key: false,
                            columns: cols,
                        });
                    }
                }
                Token::Index | Token::Key => {
                    // MySQL inline INDEX/KEY definitions
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Semicolon => {
                    return Err(ParseFailure::new(
                        self.location(),
                        "unexpected ';' in table definition",
                    ));
                }
                Token::Ident(_) => {
                    let parsed = self.parse_column()?;
                    if parsed.unique {
                        indexes.push(IndexDefinition {
                            name: format!("UQ_{}_{}", name.name, parsed.column.name),
                            unique: true,
                            clustered: false,
                            primary_key: false,
                            columns: vec![parsed.column.name.clone()],
                        });
                    }
                    if let Some(fk) = parsed.inline_fk {
                        foreign_keys.push(fk);
                    }
                    columns.push(parsed.column);
                }
                Token::Eof => {
                    return Err(ParseFailure::new(
                        self.location(),
                        "unexpected end of input in table body",
                    ));
                }
                _ => {
                    self.advance();
                }
            }
        }

        // Table options (ENGINE=..., WITH (...), ...) up to the terminator
        self.skip_statement();

        for (ordinal, column) in columns.iter_mut().enumerate() {
            column.ordinal = ordinal;
            if pk_columns.iter().any(|p| p.eq_ignore_ascii_case(&column.name)) {
                column.primary_key = true;
                column.nullable = false;
            }
        }

        self.model.tables.push(TableDefinition {
            name,
            columns,
            indexes,
            foreign_keys,
        });
        Ok(())
    }

    fn parse_column(&mut self) -> Result<ParsedColumn, ParseFailure> {
        let name = self.ident()?;

        let mut source_type = match self.current() {
            Token::Ident(t) => {
                let t = t.clone();
                self.advance();
                t
            }
            other => {
                return Err(ParseFailure::new(
                    self.location(),
                    format!("expected type for column '{}', found {:?}", name, other),
                ));
            }
        };

        // Two-word type names like DOUBLE PRECISION or CHARACTER VARYING
        if let Token::Ident(next) = self.current() {
            let upper = next.to_uppercase();
            if upper == "PRECISION" || upper == "VARYING" {
                source_type = format!("{} {}", source_type, next);
                self.advance();
            }
        }

        let mut type_params = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                match self.current() {
                    Token::Num(n) => {
                        if let Ok(value) = n.parse::<u32>() {
                            type_params.push(value);
                        }
                        self.advance();
                    }
                    Token::Comma | Token::Ident(_) => {
                        // NVARCHAR(MAX) and friends carry no numeric parameter
                        self.advance();
                    }
                    Token::RParen => {
                        self.advance();
                        break;
                    }
                    Token::Eof => break,
                    _ => {
                        self.advance();
                    }
                }
            }
        }

        let mut column = ColumnDefinition {
            name,
            source_type,
            type_params,
            nullable: true,
            primary_key: false,
            default: None,
            ordinal: 0,
        };
        let mut inline_fk = None;
        let mut unique = false;

        loop {
            match self.current() {
                Token::Primary => {
                    self.advance();
                    self.eat(&Token::Key);
                    column.primary_key = true;
                    column.nullable = false;
                }
                Token::Not => {
                    self.advance();
                    if self.eat(&Token::Null) {
                        column.nullable = false;
                    }
                }
                Token::Null => {
                    self.advance();
                    column.nullable = true;
                }
                Token::Unique => {
                    self.advance();
                    self.eat(&Token::Key);
                    unique = true;
                }
                Token::Default => {
                    self.advance();
                    column.default = Some(self.parse_default_value());
                }
                Token::References => {
                    self.advance();
                    let (target_table, target_columns) = self.parse_reference()?;
                    inline_fk = Some(ForeignKeyReference {
                        column: column.name.clone(),
                        target_table,
                        target_column: target_columns
                            .into_iter()
                            .next()
                            .unwrap_or_else(|| "id".to_string()),
                    });
                    self.skip_on_actions();
                }
                Token::Check => {
                    self.advance();
                    self.skip_parenthesized();
                }
                Token::Constraint => {
                    self.advance();
                    if matches!(self.current(), Token::Ident(_)) {
                        self.advance();
                    }
                }
                Token::On => {
                    self.skip_on_actions();
                }
                Token::Comma | Token::RParen | Token::Semicolon | Token::Eof => break,
                _ => {
                    // IDENTITY, AUTO_INCREMENT, COLLATE ... and other noise
                    self.advance();
                }
            }
        }

        Ok(ParsedColumn {
            column,
            inline_fk,
            unique,
        })
    }

    fn parse_default_value(&mut self) -> String {
        match self.current().clone() {
            Token::Str(s) => {
                self.advance();
                s
            }
            Token::Num(n) => {
                self.advance();
                n
            }
            Token::Null => {
                self.advance();
                "NULL".to_string()
            }
            Token::Ident(s) => {
                self.advance();
                let mut value = s;
                // Function-call defaults like GETDATE() or NOW()
                if self.eat(&Token::LParen) {
                    value.push('(');
                    let mut depth = 1;
                    while depth > 0 {
                        match self.current() {
                            Token::LParen => {
                                depth += 1;
                                value.push('(');
                                self.advance();
                            }
                            Token::RParen => {
                                depth -= 1;
                                value.push(')');
                                self.advance();
                            }
                            Token::Eof => break,
                            other => {
                                value.push_str(&other.text());
                                self.advance();
                            }
                        }
                    }
                }
                value
            }
            Token::LParen => {
                self.advance();
                let mut parts = Vec::new();
                let mut depth = 1;
                while depth > 0 {
                    match self.current() {
                        Token::LParen => {
                            depth += 1;
                            parts.push("(".to_string());
                            self.advance();
                        }
                        Token::RParen => {
                            depth -= 1;
                            if depth > 0 {
                                parts.push(")".to_string());
                            }
                            self.advance();
                        }
                        Token::Eof => break,
                        other => {
                            parts.push(other.text());
                            self.advance();
                        }
                    }
                }
                parts.join(" ")
            }
            _ => String::new(),
        }
    }

    /// `target [. target] [(col, ...)]` after REFERENCES.
    fn parse_reference(&mut self) -> Result<(QualifiedName, Vec<String>), ParseFailure> {
        let target = self.qualified_name()?;
        let columns = if self.current() == &Token::LParen {
            self.column_list()?
        } else {
            Vec::new()
        };
        Ok((target, columns))
    }

    /// `FOREIGN KEY (col, ...) REFERENCES target (col, ...)`, pairing
    /// referencing and referenced columns by position.
    fn parse_foreign_key_clause(&mut self) -> Result<Vec<ForeignKeyReference>, ParseFailure> {
        self.expect(Token::Foreign, "FOREIGN")?;
        self.expect(Token::Key, "KEY after FOREIGN")?;
        let columns = self.column_list()?;
        if columns.is_empty() {
            return Err(ParseFailure::new(
                self.location(),
                "FOREIGN KEY constraint requires at least one column",
            ));
        }
        self.expect(Token::References, "REFERENCES")?;
        let (target_table, mut target_columns) = self.parse_reference()?;
        if target_columns.is_empty() {
            target_columns = vec!["id".to_string()];
        }
        if target_columns.len() != columns.len() {
            return Err(ParseFailure::new(
                self.location(),
                format!(
                    "FOREIGN KEY lists {} column(s) but references {}",
                    columns.len(),
                    target_columns.len()
                ),
            ));
        }
        self.skip_on_actions();

        Ok(columns
            .into_iter()
            .zip(target_columns)
            .map(|(column, target_column)| ForeignKeyReference {
                column,
                target_table: target_table.clone(),
                target_column,
            })
            .collect())
    }

    fn parse_create_index(&mut self, unique: bool, clustered: bool) -> Result<(), ParseFailure> {
        self.skip_if_not_exists();
        let index_name = self.ident()?;
        self.expect(Token::On, "ON in CREATE INDEX")?;
        let table = self.qualified_name()?;
        let columns = self.column_list()?;
        if columns.is_empty() {
            return Err(ParseFailure::new(
                self.location(),
                format!("index '{}' requires at least one column", index_name),
            ));
        }
        self.skip_statement();
        self.model.loose_indexes.push((
            table,
            IndexDefinition {
                name: index_name,
                unique,
                clustered,
                primary_key: false,
                columns,
            },
        ));
        Ok(())
    }

    fn parse_create_view(&mut self) -> Result<(), ParseFailure> {
        self.skip_if_not_exists();
        let name = self.qualified_name()?;
        let columns = if self.current() == &Token::LParen {
            self.column_list()?
        } else {
            Vec::new()
        };
        self.expect(Token::As, "AS in CREATE VIEW")?;

        // The query is opaque to the pipeline; keep a textual reconstruction
        let mut parts = Vec::new();
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            parts.push(self.current().text());
            self.advance();
        }
        self.eat(&Token::Semicolon);

        self.model.views.push(ViewDefinition {
            name,
            columns,
            query: parts.join(" "),
        });
        Ok(())
    }

    fn parse_alter_table(&mut self) -> Result<(), ParseFailure> {
        self.advance(); // ALTER
        if !self.eat(&Token::Table) {
            self.skip_statement();
            return Ok(());
        }
        self.eat(&Token::Only);
        let table = self.qualified_name()?;

        if !self.eat(&Token::Add) {
            // Other ALTER TABLE forms carry nothing the generator models
            self.skip_statement();
            return Ok(());
        }

        let mut constraint_name = None;
        if self.eat(&Token::Constraint) {
            constraint_name = Some(self.ident()?);
        }

        match self.current() {
            Token::Foreign => {
                let fks = self.parse_foreign_key_clause()?;
                for fk in fks {
                    self.model.pending_foreign_keys.push((table.clone(), fk));
                }
                self.skip_statement();
            }
            Token::Primary => {
                self.advance();
                self.expect(Token::Key, "KEY after PRIMARY")?;
                self.eat(&Token::Clustered);
                self.eat(&Token::Nonclustered);
                let columns = self.column_list()?;
                if columns.is_empty() {
                    return Err(ParseFailure::new(
                        self.location(),
                        "PRIMARY KEY constraint requires at least one column",
                    ));
                }
                let name =
                    constraint_name.unwrap_or_else(|| format!("PK_{}", table.name));
                self.model
                    .pending_primary_keys
                    .push((table, name, columns));
                self.skip_statement();
            }
            _ => {
                self.skip_statement();
            }
        }
        Ok(())
    }

    fn parse_insert(&mut self) -> Result<(), ParseFailure> {
        self.expect(Token::Into, "INTO after INSERT")?;
        let table = self.qualified_name()?;
        if self.current() != &Token::LParen {
            return Err(ParseFailure::new(
                self.location(),
                "INSERT without a column list is not supported",
            ));
        }
        let columns = self.column_list()?;
        if columns.is_empty() {
            return Err(ParseFailure::new(
                self.location(),
                "INSERT column list is empty",
            ));
        }
        self.expect(Token::Values, "VALUES")?;

        let mut rows = Vec::new();
        loop {
            self.expect(Token::LParen, "'(' to open a row literal")?;
            let mut row = Vec::new();
            loop {
                match self.current().clone() {
                    Token::Str(s) => {
                        row.push(s);
                        self.advance();
                    }
                    Token::Num(n) => {
                        row.push(n);
                        self.advance();
                    }
                    Token::Null => {
                        row.push(String::new());
                        self.advance();
                    }
                    Token::Ident(s) => {
                        row.push(s);
                        self.advance();
                    }
                    Token::Comma => {
                        self.advance();
                    }
                    Token::RParen => {
                        self.advance();
                        break;
                    }
                    other => {
                        return Err(ParseFailure::new(
                            self.location(),
                            format!("unexpected {:?} in row literal", other),
                        ));
                    }
                }
            }
            if row.len() != columns.len() {
                return Err(ParseFailure::new(
                    self.location(),
                    format!(
                        "row literal has {} value(s) but the column list names {}",
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            rows.push(row);

            if self.eat(&Token::Comma) {
                continue;
            }
            break;
        }
        self.skip_statement();

        self.model.seed_rows.push((table, SeedBatch { columns, rows }));
        Ok(())
    }

    fn column_list(&mut self) -> Result<Vec<String>, ParseFailure> {
        let mut columns = Vec::new();
        if !self.eat(&Token::LParen) {
            return Ok(columns);
        }
        loop {
            match self.current() {
                Token::Ident(name) => {
                    columns.push(name.clone());
                    self.advance();
                    // Sort direction in index column lists
                    if let Token::Ident(dir) = self.current() {
                        let upper = dir.to_uppercase();
                        if upper == "ASC" || upper == "DESC" {
                            self.advance();
                        }
                    }
                }
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Semicolon | Token::Eof => break,
                _ => {
                    self.advance();
                }
            }
        }
        Ok(columns)
    }

    fn skip_on_actions(&mut self) {
        while self.current() == &Token::On {
            self.advance();
            if matches!(self.current(), Token::Delete | Token::Update) {
                self.advance();
            }
            match self.current().clone() {
                Token::Cascade | Token::Restrict => {
                    self.advance();
                }
                Token::Ident(s) if s.to_uppercase() == "SET" => {
                    self.advance();
                    if matches!(self.current(), Token::Null | Token::Default) {
                        self.advance();
                    }
                }
                Token::Ident(s) if s.to_uppercase() == "NO" => {
                    self.advance();
                    if let Token::Ident(a) = self.current() {
                        if a.to_uppercase() == "ACTION" {
                            self.advance();
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_parenthesized(&mut self) {
        if !self.eat(&Token::LParen) {
            self.advance();
            return;
        }
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => {
                    depth += 1;
                    self.advance();
                }
                Token::RParen => {
                    depth -= 1;
                    self.advance();
                }
                Token::Eof => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        self.eat(&Token::Semicolon);
    }

    fn skip_until(&mut self, tokens: &[Token]) {
        while !tokens.contains(self.current()) && self.current() != &Token::Eof {
            if self.current() == &Token::LParen {
                self.skip_parenthesized();
            } else {
                self.advance();
            }
        }
    }
}
