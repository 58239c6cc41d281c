//! Lexer and parser for the statement dialect the builders emit.
//!
//! Only equality filters against named parameters are understood; literals,
//! expressions and joins are rejected.

use crate::builder::Direction;
use crate::error::{OrmError, OrmResult};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Bare identifier or keyword.
    Word(String),
    /// Backtick-quoted identifier.
    Quoted(String),
    /// `@name`
    Param(String),
    /// `@{FORCE_INDEX=name}`
    IndexHint(String),
    Number(u64),
    Star,
    Comma,
    LParen,
    RParen,
    Eq,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("'{w}'"),
            Token::Quoted(w) => format!("`{w}`"),
            Token::Param(p) => format!("@{p}"),
            Token::IndexHint(i) => format!("index hint {i}"),
            Token::Number(n) => n.to_string(),
            Token::Star => "'*'".into(),
            Token::Comma => "','".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Eq => "'='".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn take_word(&mut self, first: Option<char>) -> String {
        let mut word: String = first.into_iter().collect();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        word
    }

    fn next_token(&mut self) -> Result<Token, String> {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(c) = self.chars.next() else {
            return Ok(Token::Eof);
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '*' => Token::Star,
            '=' => Token::Eq,
            '`' => Token::Quoted(self.quoted()?),
            '@' if self.chars.next_if_eq(&'{').is_some() => Token::IndexHint(self.hint()?),
            '@' => {
                let name = self.take_word(None);
                if name.is_empty() {
                    return Err("expected parameter name after '@'".into());
                }
                Token::Param(name)
            }
            c if c.is_ascii_digit() => {
                let digits = self.take_word(Some(c));
                let n = digits
                    .parse()
                    .map_err(|_| format!("invalid number '{digits}'"))?;
                Token::Number(n)
            }
            c if c.is_alphabetic() || c == '_' => Token::Word(self.take_word(Some(c))),
            other => return Err(format!("unexpected character '{other}'")),
        };
        Ok(token)
    }

    fn quoted(&mut self) -> Result<String, String> {
        let mut name = String::new();
        loop {
            match self.chars.next() {
                Some('`') if self.chars.next_if_eq(&'`').is_some() => name.push('`'),
                Some('`') => return Ok(name),
                Some(c) => name.push(c),
                None => return Err("unterminated quoted identifier".into()),
            }
        }
    }

    fn hint(&mut self) -> Result<String, String> {
        let mut body = String::new();
        loop {
            match self.chars.next() {
                Some('}') => break,
                Some(c) => body.push(c),
                None => return Err("unterminated index hint".into()),
            }
        }
        match body.split_once('=') {
            Some((key, name)) if key.trim().eq_ignore_ascii_case("FORCE_INDEX") => {
                let name = name.trim();
                if name.is_empty() {
                    Err("empty FORCE_INDEX hint".into())
                } else {
                    Ok(name.to_string())
                }
            }
            _ => Err(format!("unsupported hint '{body}'")),
        }
    }
}

/// `column = @param`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Binding {
    pub column: String,
    pub param: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Projection {
    All,
    Columns(Vec<String>),
    /// `COUNT(*) AS alias`
    Count(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Select {
    pub projection: Projection,
    pub table: String,
    pub index: Option<String>,
    pub filter: Vec<Binding>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parsed {
    Select(Select),
    Insert {
        table: String,
        columns: Vec<String>,
        params: Vec<String>,
    },
    Update {
        table: String,
        assignments: Vec<Binding>,
        filter: Vec<Binding>,
    },
    Delete {
        table: String,
        filter: Vec<Binding>,
    },
}

/// Parse one statement.
pub(crate) fn parse(sql: &str) -> OrmResult<Parsed> {
    let parsed = Lexer::new(sql).tokenize().and_then(|tokens| {
        let mut parser = Parser { tokens, pos: 0 };
        let stmt = parser.statement()?;
        parser.expect(Token::Eof)?;
        Ok(stmt)
    });
    parsed.map_err(|message| OrmError::invalid_statement(format!("{message} in `{sql}`")))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let hit = self.at_keyword(keyword);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(format!("expected {keyword}, found {}", self.peek().describe()))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        let hit = self.peek() == token;
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn expect(&mut self, token: Token) -> Result<(), String> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(format!(
                "expected {}, found {}",
                token.describe(),
                self.peek().describe()
            ))
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.advance() {
            Token::Word(w) | Token::Quoted(w) => Ok(w),
            other => Err(format!("expected identifier, found {}", other.describe())),
        }
    }

    fn param(&mut self) -> Result<String, String> {
        match self.advance() {
            Token::Param(p) => Ok(p),
            other => Err(format!("expected @parameter, found {}", other.describe())),
        }
    }

    fn binding(&mut self) -> Result<Binding, String> {
        let column = self.ident()?;
        self.expect(Token::Eq)?;
        let param = self.param()?;
        Ok(Binding { column, param })
    }

    /// `a=@a AND b=@b`
    fn conditions(&mut self) -> Result<Vec<Binding>, String> {
        let mut out = vec![self.binding()?];
        while self.eat_keyword("AND") {
            out.push(self.binding()?);
        }
        Ok(out)
    }

    fn comma_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, String>,
    ) -> Result<Vec<T>, String> {
        let mut out = vec![item(self)?];
        while self.eat(&Token::Comma) {
            out.push(item(self)?);
        }
        Ok(out)
    }

    fn statement(&mut self) -> Result<Parsed, String> {
        if self.eat_keyword("SELECT") {
            self.select().map(Parsed::Select)
        } else if self.eat_keyword("INSERT") {
            self.insert()
        } else if self.eat_keyword("UPDATE") {
            self.update()
        } else if self.eat_keyword("DELETE") {
            self.delete()
        } else {
            Err(format!("unsupported statement starting with {}", self.peek().describe()))
        }
    }

    fn select(&mut self) -> Result<Select, String> {
        let projection = if self.eat(&Token::Star) {
            Projection::All
        } else if self.at_keyword("COUNT") && self.tokens.get(self.pos + 1) == Some(&Token::LParen) {
            self.pos += 1;
            self.expect(Token::LParen)?;
            self.expect(Token::Star)?;
            self.expect(Token::RParen)?;
            let alias = if self.eat_keyword("AS") {
                self.ident()?
            } else {
                "count".to_string()
            };
            Projection::Count(alias)
        } else {
            Projection::Columns(self.comma_list(Self::ident)?)
        };

        self.expect_keyword("FROM")?;
        let table = self.ident()?;
        let index = match self.peek() {
            Token::IndexHint(name) => {
                let name = name.clone();
                self.pos += 1;
                Some(name)
            }
            _ => None,
        };

        let filter = if self.eat_keyword("WHERE") {
            self.conditions()?
        } else {
            Vec::new()
        };

        let order = if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            self.comma_list(|p| {
                let column = p.ident()?;
                let dir = if p.eat_keyword("DESC") {
                    Direction::Desc
                } else {
                    p.eat_keyword("ASC");
                    Direction::Asc
                };
                Ok((column, dir))
            })?
        } else {
            Vec::new()
        };

        let limit = if self.eat_keyword("LIMIT") {
            match self.advance() {
                Token::Number(n) => Some(n),
                other => return Err(format!("expected LIMIT count, found {}", other.describe())),
            }
        } else {
            None
        };

        Ok(Select {
            projection,
            table,
            index,
            filter,
            order,
            limit,
        })
    }

    fn insert(&mut self) -> Result<Parsed, String> {
        self.eat_keyword("INTO");
        let table = self.ident()?;
        self.expect(Token::LParen)?;
        let columns = self.comma_list(Self::ident)?;
        self.expect(Token::RParen)?;
        self.expect_keyword("VALUES")?;
        self.expect(Token::LParen)?;
        let params = self.comma_list(Self::param)?;
        self.expect(Token::RParen)?;
        if columns.len() != params.len() {
            return Err(format!(
                "{} columns but {} values",
                columns.len(),
                params.len()
            ));
        }
        Ok(Parsed::Insert {
            table,
            columns,
            params,
        })
    }

    fn update(&mut self) -> Result<Parsed, String> {
        let table = self.ident()?;
        self.expect_keyword("SET")?;
        let assignments = self.comma_list(Self::binding)?;
        self.expect_keyword("WHERE")?;
        let filter = self.conditions()?;
        Ok(Parsed::Update {
            table,
            assignments,
            filter,
        })
    }

    fn delete(&mut self) -> Result<Parsed, String> {
        self.eat_keyword("FROM");
        let table = self.ident()?;
        self.expect_keyword("WHERE")?;
        let filter = self.conditions()?;
        Ok(Parsed::Delete { table, filter })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(column: &str, param: &str) -> Binding {
        Binding {
            column: column.into(),
            param: param.into(),
        }
    }

    #[test]
    fn parses_full_select() {
        let parsed = parse(
            "SELECT `Name`, `Age` FROM users@{FORCE_INDEX=UsersByAge} \
             WHERE `Age`=@Age AND `Name`=@Name ORDER BY `Age` DESC, `Name` ASC LIMIT 5",
        )
        .unwrap();
        assert_eq!(
            parsed,
            Parsed::Select(Select {
                projection: Projection::Columns(vec!["Name".into(), "Age".into()]),
                table: "users".into(),
                index: Some("UsersByAge".into()),
                filter: vec![binding("Age", "Age"), binding("Name", "Name")],
                order: vec![("Age".into(), Direction::Desc), ("Name".into(), Direction::Asc)],
                limit: Some(5),
            })
        );
    }

    #[test]
    fn parses_star_and_count() {
        let Parsed::Select(s) = parse("select * from users").unwrap() else {
            panic!("not a select");
        };
        assert_eq!(s.projection, Projection::All);
        assert!(s.filter.is_empty() && s.order.is_empty() && s.limit.is_none());

        let Parsed::Select(s) = parse("SELECT COUNT(*) AS n FROM users WHERE Age=@a").unwrap()
        else {
            panic!("not a select");
        };
        assert_eq!(s.projection, Projection::Count("n".into()));
    }

    #[test]
    fn parses_dml() {
        assert_eq!(
            parse("INSERT INTO t (`a`, `b`) VALUES (@a, @b)").unwrap(),
            Parsed::Insert {
                table: "t".into(),
                columns: vec!["a".into(), "b".into()],
                params: vec!["a".into(), "b".into()],
            }
        );
        assert_eq!(
            parse("UPDATE t SET `b`=@b WHERE `a`=@pk_a").unwrap(),
            Parsed::Update {
                table: "t".into(),
                assignments: vec![binding("b", "b")],
                filter: vec![binding("a", "pk_a")],
            }
        );
        assert_eq!(
            parse("DELETE FROM t WHERE `a`=@pk_a").unwrap(),
            Parsed::Delete {
                table: "t".into(),
                filter: vec![binding("a", "pk_a")],
            }
        );
    }

    #[test]
    fn doubled_backtick_is_unescaped() {
        let Parsed::Select(s) = parse("SELECT `we``ird` FROM t").unwrap() else {
            panic!("not a select");
        };
        assert_eq!(s.projection, Projection::Columns(vec!["we`ird".into()]));
    }

    #[test]
    fn rejects_malformed_sql() {
        for sql in [
            "",
            "INSERT INTO t () VALUES ()",
            "UPDATE t SET  WHERE `a`=@pk_a",
            "SELECT * FROM t WHERE a = 1",
            "SELECT * FROM t LIMIT",
            "SELECT * FROM t extra",
            "DELETE FROM t",
            "INSERT INTO t (a, b) VALUES (@a)",
            "SELECT * FROM t@{USE_INDEX=x}",
            "SELECT `a FROM t",
        ] {
            let err = parse(sql).unwrap_err();
            assert!(
                matches!(err, OrmError::InvalidStatement(_)),
                "{sql}: {err:?}"
            );
        }
    }
}
