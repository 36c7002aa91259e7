//! Formula parser
//!
//! A recursive descent parser for spreadsheet formulas with proper operator
//! precedence. Every failure carries the byte offset of the offending token,
//! counted from the start of the formula body (after any leading `=`).

use crate::ast::{
    Anchors, BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator,
};
use crate::error::{FormulaError, FormulaResult};
use paintbox_core::{CellAddress, CellError, CellRange, SheetName};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a formula string into an AST
///
/// The leading `=` is optional.
///
/// # Example
/// ```rust
/// use paintbox_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("IF(A1>0,\"Yes\",\"No\")").unwrap();
/// assert!(parse_formula("=SUM(A1").is_err());
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();
    let body = formula.strip_prefix('=').unwrap_or(formula);

    let mut parser = FormulaParser::new(body);
    if parser.current_token() == &Token::Eof {
        return Err(FormulaError::parse(0, "Empty formula"));
    }

    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if parser.current_token() != &Token::Eof {
        return Err(parser.unexpected());
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(Decimal),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    Identifier(String), // Function name or named range
    CellRef(String),    // Cell reference like A1, $A$1
    SheetRef(String),   // Sheet reference like Sheet1! or 'My Sheet'!

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    // Lexical error (message)
    Invalid(String),

    // End of input
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::String(s) => format!("string \"{}\"", s),
            Token::Boolean(b) => format!("{}", if *b { "TRUE" } else { "FALSE" }),
            Token::Error(e) => format!("error {}", e),
            Token::Identifier(s) => format!("'{}'", s),
            Token::CellRef(s) => format!("reference {}", s),
            Token::SheetRef(s) => format!("sheet {}!", s),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Caret => "'^'".into(),
            Token::Percent => "'%'".into(),
            Token::Ampersand => "'&'".into(),
            Token::Equal => "'='".into(),
            Token::NotEqual => "'<>'".into(),
            Token::LessThan => "'<'".into(),
            Token::LessEqual => "'<='".into(),
            Token::GreaterThan => "'>'".into(),
            Token::GreaterEqual => "'>='".into(),
            Token::Colon => "':'".into(),
            Token::Comma => "','".into(),
            Token::Semicolon => "';'".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::LeftBrace => "'{'".into(),
            Token::RightBrace => "'}'".into(),
            Token::Invalid(msg) => msg.clone(),
            Token::Eof => "end of formula".into(),
        }
    }
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Token,
    token_start: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: Token::Eof,
            token_start: 0,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.current_token = self.scan_token();
    }

    fn scan_token(&mut self) -> Token {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::LessEqual;
            } else if self.peek_char() == Some('>') {
                self.advance();
                return Token::NotEqual;
            }
            return Token::LessThan;
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::GreaterEqual;
            }
            return Token::GreaterThan;
        }

        // String literal
        if c == '"' {
            return self.scan_string();
        }

        // Quoted sheet name
        if c == '\'' {
            return self.scan_quoted_sheet();
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier, cell reference, or boolean/error
        if c.is_alphabetic() || c == '_' || c == '$' || c == '#' || c == '\\' {
            return self.scan_identifier_or_ref();
        }

        self.advance();
        Token::Invalid(format!("Unexpected character '{}'", c))
    }

    fn scan_string(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    // Check for escaped quote ("")
                    if self.peek_char_at(1) == Some('"') {
                        s.push('"');
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return Token::String(s);
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Token::Invalid("Unterminated string literal".into()),
            }
        }
    }

    fn scan_quoted_sheet(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') => {
                    if self.peek_char_at(1) == Some('\'') {
                        name.push('\'');
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        break;
                    }
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return Token::Invalid("Unterminated sheet name".into()),
            }
        }

        if self.peek_char() != Some('!') {
            return Token::Invalid(format!("Expected '!' after sheet name '{}'", name));
        }
        self.advance();
        Token::SheetRef(name)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part
        let mut scientific = false;
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E')
            && self.peek_char_at(1).map_or(false, |c| {
                c.is_ascii_digit()
                    || ((c == '+' || c == '-')
                        && self.peek_char_at(2).map_or(false, |d| d.is_ascii_digit()))
            })
        {
            scientific = true;
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        let padded;
        let digits = if num_str.starts_with('.') {
            padded = format!("0{}", num_str);
            padded.as_str()
        } else {
            num_str
        };
        let parsed = if scientific {
            Decimal::from_scientific(digits)
        } else {
            Decimal::from_str(digits)
        };
        match parsed {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Invalid(format!("Invalid number '{}'", num_str)),
        }
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        // Error values first (#VALUE!, #REF!, etc.)
        if self.peek_char() == Some('#') {
            // Longest known literal wins; `#DIV/0!/0` is an error divided by zero
            let rest = &self.input[self.pos..];
            let known = CellError::ALL
                .iter()
                .filter(|err| {
                    let literal = err.as_str();
                    rest.get(..literal.len())
                        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(literal))
                })
                .max_by_key(|err| err.as_str().len());
            if let Some(&err) = known {
                self.pos += err.as_str().len();
                return Token::Error(err);
            }

            let start = self.pos;
            self.advance();
            while self.peek_char().map_or(false, |c| {
                c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
            }) {
                self.advance();
            }
            let error_str = &self.input[start..self.pos];
            return Token::Invalid(format!("Unknown error literal '{}'", error_str));
        }

        let start = self.pos;

        while self.peek_char().map_or(false, |c| {
            c.is_alphanumeric() || c == '_' || c == '$' || c == '.' || c == '\\'
        }) {
            self.advance();
        }

        let text = &self.input[start..self.pos];

        // Sheet reference (ends with !)
        if self.peek_char() == Some('!') {
            self.advance();
            return Token::SheetRef(text.to_string());
        }

        // Booleans, unless called as functions: TRUE()
        let upper = text.to_uppercase();
        if upper == "TRUE" && self.peek_char() != Some('(') {
            return Token::Boolean(true);
        }
        if upper == "FALSE" && self.peek_char() != Some('(') {
            return Token::Boolean(false);
        }

        // Letters followed by digits is a cell reference, unless followed by '('
        // (LOG10(100) is a function call)
        if Self::is_cell_reference(text) && self.peek_char() != Some('(') {
            return Token::CellRef(text.to_string());
        }

        if text.contains('$') {
            return Token::Invalid(format!("Malformed reference '{}'", text));
        }

        Token::Identifier(text.to_string())
    }

    fn is_cell_reference(text: &str) -> bool {
        // [$]letters[$]digits
        let bytes = text.as_bytes();
        let mut i = 0;

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }

        let letter_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == letter_start {
            return false;
        }

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }

        let digit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digit_start {
            return false;
        }

        i == bytes.len()
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> Token {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token();
        token
    }

    fn error(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::parse(self.token_start, message)
    }

    fn unexpected(&self) -> FormulaError {
        match self.current_token() {
            Token::Invalid(msg) => self.error(msg.clone()),
            Token::Eof => self.error("Unexpected end of formula"),
            token => self.error(format!("Unexpected {}", token.describe())),
        }
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else if let Token::Invalid(_) = self.current_token() {
            Err(self.unexpected())
        } else {
            Err(self.error(format!(
                "Expected {}, found {}",
                expected.describe(),
                self.current_token().describe()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^
    // 6. Unary: -, %
    // 7. Range: :
    // 8. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = FormulaExpr::BinaryOp {
                op: BinaryOperator::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_exponent()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        // Left-associative: 2^3^2 is (2^3)^2
        while matches!(self.current_token(), Token::Caret) {
            self.consume();
            let right = self.parse_unary()?;
            left = FormulaExpr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        // Prefix unary minus
        if matches!(self.current_token(), Token::Minus) {
            self.consume();
            let operand = self.parse_unary()?;
            return Ok(FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        // Prefix plus (no-op)
        if matches!(self.current_token(), Token::Plus) {
            self.consume();
            return self.parse_unary();
        }

        // Parse primary, then check for postfix percent
        let mut expr = self.parse_range()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        if !matches!(self.current_token(), Token::Colon) {
            return Ok(left);
        }

        let colon_pos = self.token_start;
        self.consume();
        let right_pos = self.token_start;
        let right = self.parse_primary()?;

        match (left, right) {
            (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) => {
                let sheet = match (start.sheet, end.sheet) {
                    (s, None) => s,
                    (Some(s), Some(e)) if s == e => Some(s),
                    (None, Some(_)) | (Some(_), Some(_)) => {
                        return Err(FormulaError::parse(
                            right_pos,
                            "Range references must be on the same sheet",
                        ))
                    }
                };
                Ok(FormulaExpr::RangeRef(RangeReference {
                    sheet,
                    range: CellRange::new(start.address, end.address),
                    start_anchors: start.anchors,
                    end_anchors: end.anchors,
                }))
            }
            _ => Err(FormulaError::parse(
                colon_pos,
                "Range operator requires cell references on both sides",
            )),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(FormulaExpr::Number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(FormulaExpr::Text(s))
            }

            Token::Boolean(b) => {
                self.consume();
                Ok(FormulaExpr::Boolean(b))
            }

            Token::Error(e) => {
                self.consume();
                Ok(FormulaExpr::Error(e))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::LeftBrace => self.parse_array(),

            Token::SheetRef(sheet) => {
                let sheet_pos = self.token_start;
                self.consume();
                let sheet = SheetName::new(&sheet)
                    .map_err(|e| FormulaError::parse(sheet_pos, e.to_string()))?;
                self.parse_sheet_reference(sheet)
            }

            Token::CellRef(ref_str) => {
                let pos = self.token_start;
                self.consume();
                Self::cell_reference(None, &ref_str, pos)
            }

            Token::Identifier(name) => {
                self.consume();
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(FormulaExpr::NameRef(name))
                }
            }

            _ => Err(self.unexpected()),
        }
    }

    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftBrace)?;

        let mut rows = Vec::new();
        let mut current_row = vec![self.parse_array_item()?];

        loop {
            match self.current_token() {
                Token::Comma => {
                    self.consume();
                    current_row.push(self.parse_array_item()?);
                }
                Token::Semicolon => {
                    self.consume();
                    rows.push(std::mem::take(&mut current_row));
                    current_row.push(self.parse_array_item()?);
                }
                Token::RightBrace => break,
                _ => return Err(self.unexpected()),
            }
        }
        rows.push(current_row);

        if rows.iter().any(|row| row.len() != rows[0].len()) {
            return Err(self.error("Array rows must have the same number of items"));
        }

        self.expect(&Token::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    /// Array constants hold literals only (optionally negated)
    fn parse_array_item(&mut self) -> FormulaResult<FormulaExpr> {
        let negate = if matches!(self.current_token(), Token::Minus) {
            self.consume();
            true
        } else {
            false
        };
        let item = match self.current_token().clone() {
            Token::Number(n) => FormulaExpr::Number(n),
            Token::String(s) if !negate => FormulaExpr::Text(s),
            Token::Boolean(b) if !negate => FormulaExpr::Boolean(b),
            Token::Error(e) if !negate => FormulaExpr::Error(e),
            _ => return Err(self.unexpected()),
        };
        self.consume();
        Ok(if negate {
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(item),
            }
        } else {
            item
        })
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        })
    }

    fn parse_sheet_reference(&mut self, sheet: SheetName) -> FormulaResult<FormulaExpr> {
        // After Sheet1!, we expect a cell reference
        match self.current_token().clone() {
            Token::CellRef(ref_str) => {
                let pos = self.token_start;
                self.consume();
                Self::cell_reference(Some(sheet), &ref_str, pos)
            }
            _ => Err(self.error("Expected cell reference after sheet name")),
        }
    }

    fn cell_reference(
        sheet: Option<SheetName>,
        ref_str: &str,
        pos: usize,
    ) -> FormulaResult<FormulaExpr> {
        let address = CellAddress::parse(ref_str).map_err(|e| {
            FormulaError::parse(pos, format!("Invalid cell reference '{}': {}", ref_str, e))
        })?;

        let anchors = Anchors {
            col: ref_str.starts_with('$'),
            row: ref_str[1..].contains('$'),
        };

        Ok(FormulaExpr::CellRef(CellReference {
            sheet,
            address,
            anchors,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: i64) -> FormulaExpr {
        FormulaExpr::Number(Decimal::from(n))
    }

    fn parse_error_position(formula: &str) -> usize {
        match parse_formula(formula) {
            Err(FormulaError::Parse { position, .. }) => position,
            other => panic!("expected parse error for {:?}, got {:?}", formula, other),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("=42").unwrap(), num(42));
        assert_eq!(
            parse_formula("=3.14").unwrap(),
            FormulaExpr::Number(Decimal::new(314, 2))
        );
        assert_eq!(
            parse_formula("=1e3").unwrap(),
            FormulaExpr::Number(Decimal::from(1000))
        );
        assert_eq!(
            parse_formula("=.5").unwrap(),
            FormulaExpr::Number(Decimal::new(5, 1))
        );
    }

    #[test]
    fn test_leading_equals_optional() {
        assert_eq!(parse_formula("A1+1").unwrap(), parse_formula("=A1+1").unwrap());
        assert_eq!(parse_formula("  =A1+1  ").unwrap(), parse_formula("A1+1").unwrap());
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(
            parse_formula("=\"Hello\"").unwrap(),
            FormulaExpr::Text("Hello".into())
        );
        assert_eq!(
            parse_formula("=\"Hello \"\"World\"\"\"").unwrap(),
            FormulaExpr::Text("Hello \"World\"".into())
        );
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_formula("=TRUE").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(parse_formula("=false").unwrap(), FormulaExpr::Boolean(false));
        assert!(matches!(
            parse_formula("=TRUE()").unwrap(),
            FormulaExpr::Function { .. }
        ));
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let ast = parse_formula("=1+2*3").unwrap();
        if let FormulaExpr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Add);
            assert_eq!(*left, num(1));
            assert!(matches!(
                *right,
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }

        // Power is left associative
        let ast = parse_formula("=2^3^2").unwrap();
        if let FormulaExpr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Power);
            assert_eq!(*right, num(2));
            assert!(matches!(
                *left,
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::Power,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_comparison() {
        assert!(matches!(
            parse_formula("=A1>=5").unwrap(),
            FormulaExpr::BinaryOp {
                op: BinaryOperator::GreaterEqual,
                ..
            }
        ));
        assert!(matches!(
            parse_formula("=A1<>B1").unwrap(),
            FormulaExpr::BinaryOp {
                op: BinaryOperator::NotEqual,
                ..
            }
        ));
        assert!(matches!(
            parse_formula("=A1=B1").unwrap(),
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Equal,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_unary() {
        assert!(matches!(
            parse_formula("=-5").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                ..
            }
        ));
        assert!(matches!(
            parse_formula("=50%").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                ..
            }
        ));
        assert_eq!(parse_formula("=+5").unwrap(), num(5));
    }

    #[test]
    fn test_parse_cell_reference() {
        let ast = parse_formula("=$B$2").unwrap();
        if let FormulaExpr::CellRef(cell_ref) = ast {
            assert_eq!(cell_ref.address, CellAddress::new(1, 1));
            assert_eq!(cell_ref.anchors, Anchors { col: true, row: true });
            assert!(cell_ref.sheet.is_none());
        } else {
            panic!("Expected CellRef");
        }

        let ast = parse_formula("=B$2").unwrap();
        if let FormulaExpr::CellRef(cell_ref) = ast {
            assert_eq!(cell_ref.anchors, Anchors { col: false, row: true });
        } else {
            panic!("Expected CellRef");
        }
    }

    #[test]
    fn test_parse_sheet_references() {
        let ast = parse_formula("=Rates!B4").unwrap();
        if let FormulaExpr::CellRef(cell_ref) = ast {
            assert_eq!(cell_ref.sheet, Some(SheetName::new("RATES").unwrap()));
        } else {
            panic!("Expected CellRef");
        }

        let ast = parse_formula("='Room Data'!A1:A3").unwrap();
        if let FormulaExpr::RangeRef(range_ref) = ast {
            assert_eq!(range_ref.sheet, Some(SheetName::new("Room Data").unwrap()));
            assert_eq!(range_ref.range.cell_count(), 3);
        } else {
            panic!("Expected RangeRef");
        }

        assert!(parse_formula("=Rates!A1:Rates!A3").is_ok());
        assert!(parse_formula("=Rates!A1:Room!A3").is_err());
    }

    #[test]
    fn test_parse_range_reference() {
        let ast = parse_formula("=A1:B10").unwrap();
        if let FormulaExpr::RangeRef(range_ref) = ast {
            assert_eq!(range_ref.range.start, CellAddress::new(0, 0));
            assert_eq!(range_ref.range.end, CellAddress::new(9, 1));
        } else {
            panic!("Expected RangeRef");
        }
    }

    #[test]
    fn test_parse_function() {
        let ast = parse_formula("=sum(1,2,3)").unwrap();
        if let FormulaExpr::Function { name, args } = ast {
            assert_eq!(name, "SUM");
            assert_eq!(args.len(), 3);
        } else {
            panic!("Expected Function");
        }

        let ast = parse_formula("=CEILING.MATH(A1)").unwrap();
        assert!(matches!(ast, FormulaExpr::Function { ref name, .. } if name == "CEILING.MATH"));

        let ast = parse_formula("=NA()").unwrap();
        assert!(matches!(ast, FormulaExpr::Function { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            parse_formula("=DOOR_AREA").unwrap(),
            FormulaExpr::NameRef("DOOR_AREA".into())
        );
    }

    #[test]
    fn test_parse_array() {
        let ast = parse_formula("={1,2;3,4}").unwrap();
        if let FormulaExpr::Array(rows) = ast {
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[1], vec![num(3), num(4)]);
        } else {
            panic!("Expected Array");
        }
        assert!(parse_formula("={1,2;3}").is_err());
        assert!(parse_formula("={A1}").is_err());
    }

    #[test]
    fn test_parse_error_literal() {
        assert_eq!(
            parse_formula("=#DIV/0!").unwrap(),
            FormulaExpr::Error(CellError::Div0)
        );
        assert_eq!(parse_formula("=#N/A").unwrap(), FormulaExpr::Error(CellError::Na));
        assert_eq!(parse_formula("=#name?").unwrap(), FormulaExpr::Error(CellError::Name));
        assert!(parse_formula("=#BOGUS!").is_err());
    }

    #[test]
    fn test_error_literal_stops_before_operator() {
        assert_eq!(
            parse_formula("=#N/A/2").unwrap(),
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Divide,
                left: Box::new(FormulaExpr::Error(CellError::Na)),
                right: Box::new(num(2)),
            }
        );
        assert_eq!(
            parse_formula("=#DIV/0!/0").unwrap(),
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Divide,
                left: Box::new(FormulaExpr::Error(CellError::Div0)),
                right: Box::new(num(0)),
            }
        );
        let printed = parse_formula("=SUM(SUM(#DIV/0!/0))").unwrap().to_string();
        assert_eq!(printed, "=SUM(SUM(#DIV/0!/0))");
        assert!(parse_formula(&printed).is_ok());
    }

    #[test]
    fn test_error_positions() {
        // Unbalanced parentheses: reported at end of input
        assert_eq!(parse_error_position("=SUM(A1"), 6);
        // Unknown operator character
        assert_eq!(parse_error_position("=1 @ 2"), 2);
        // Trailing input
        assert_eq!(parse_error_position("=(1+2))"), 5);
        // Malformed references
        assert_eq!(parse_error_position("=A0+1"), 0);
        assert_eq!(parse_error_position("=1+XFE1"), 2);
        // Unterminated string
        assert_eq!(parse_error_position("=\"abc"), 0);
        // Missing operand
        assert_eq!(parse_error_position("=1+"), 2);
        assert_eq!(parse_error_position("="), 0);
    }

    #[test]
    fn test_never_partial() {
        assert!(parse_formula("=1 2").is_err());
        assert!(parse_formula("=SUM(1,)").is_err());
        assert!(parse_formula("=A1:SUM(B1)").is_err());
        assert!(parse_formula("=$A").is_err());
    }
}
