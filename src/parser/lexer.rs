//! Tokeniser for the problem file format (spec §6): identifiers, numeric
//! literals, and the punctuation the grammar needs, each carrying the
//! line/column it started at so [`crate::error::SolverError::Parse`] can
//! point at it.

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Ident(String),
    Number(f64),
    /// A two-character operator: `==`, `<=`, `>=`, or `..`.
    Op(&'static str),
    Symbol(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokKind,
    pub line: usize,
    pub column: usize,
}

pub fn lex(input: &str) -> Result<Vec<Token>, (String, usize, usize)> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut col = 1usize;

    let advance = |i: &mut usize, line: &mut usize, col: &mut usize, chars: &[char]| {
        if chars[*i] == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
        *i += 1;
    };

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            advance(&mut i, &mut line, &mut col, &chars);
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                advance(&mut i, &mut line, &mut col, &chars);
            }
            continue;
        }

        let start_line = line;
        let start_col = col;

        if c.is_ascii_digit() || (c == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit()) {
            let mut text = String::new();
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                text.push(chars[i]);
                advance(&mut i, &mut line, &mut col, &chars);
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                text.push(chars[i]);
                advance(&mut i, &mut line, &mut col, &chars);
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    text.push(chars[i]);
                    advance(&mut i, &mut line, &mut col, &chars);
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    text.push(chars[i]);
                    advance(&mut i, &mut line, &mut col, &chars);
                }
            }
            let value: f64 = text
                .parse()
                .map_err(|_| (format!("invalid numeric literal '{text}'"), start_line, start_col))?;
            tokens.push(Token { kind: TokKind::Number(value), line: start_line, column: start_col });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut text = String::new();
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                text.push(chars[i]);
                advance(&mut i, &mut line, &mut col, &chars);
            }
            tokens.push(Token { kind: TokKind::Ident(text), line: start_line, column: start_col });
            continue;
        }

        let two = if i + 1 < chars.len() { Some((c, chars[i + 1])) } else { None };
        match two {
            Some(('=', '=')) => {
                advance(&mut i, &mut line, &mut col, &chars);
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token { kind: TokKind::Op("=="), line: start_line, column: start_col });
                continue;
            }
            Some(('<', '=')) => {
                advance(&mut i, &mut line, &mut col, &chars);
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token { kind: TokKind::Op("<="), line: start_line, column: start_col });
                continue;
            }
            Some(('>', '=')) => {
                advance(&mut i, &mut line, &mut col, &chars);
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token { kind: TokKind::Op(">="), line: start_line, column: start_col });
                continue;
            }
            Some(('.', '.')) => {
                advance(&mut i, &mut line, &mut col, &chars);
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token { kind: TokKind::Op(".."), line: start_line, column: start_col });
                continue;
            }
            _ => {}
        }

        match c {
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';' | '=' | '<' | '>' | '+' | '-' | '*' | '/' | '^' => {
                advance(&mut i, &mut line, &mut col, &chars);
                tokens.push(Token { kind: TokKind::Symbol(c), line: start_line, column: start_col });
            }
            other => {
                return Err((format!("unexpected character '{other}'"), start_line, start_col));
            }
        }
    }

    tokens.push(Token { kind: TokKind::Eof, line, column: col });
    Ok(tokens)
}
