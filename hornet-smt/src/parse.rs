//! The solver's response grammar. The parser is incremental: when the
//! line it was handed runs out in the middle of an S-expression it asks
//! the supplied reader for another line, so multi-line errors and models
//! are handled without buffering the whole conversation.

use crate::SmtError;
use failure::Fallible;
use hornet_ir::{symbol, Symbol};
use std::fmt;

/// One solver response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// The implicit acknowledgement of a command that produces no output.
    Ok,
    Sat,
    Unsat,
    Unknown,
    Error(String),
    /// A `get-value` model: `((a 1) (b (- 2)))`. Values are kept as the
    /// verbatim token, parenthesised tokens included.
    Values(Vec<(Symbol, String)>),
}

impl fmt::Display for Response {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(fmt, "ok"),
            Response::Sat => write!(fmt, "sat"),
            Response::Unsat => write!(fmt, "unsat"),
            Response::Unknown => write!(fmt, "unknown"),
            Response::Error(msg) => write!(fmt, "(error \"{}\")", msg),
            Response::Values(vs) => {
                write!(fmt, "(")?;
                for (i, (sym, value)) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, " ")?;
                    }
                    write!(fmt, "({} {})", sym, value)?;
                }
                write!(fmt, ")")
            }
        }
    }
}

/// Parses exactly one response, pulling further lines from `read_line`
/// whenever the current input is exhausted mid-expression.
pub fn parse_response(read_line: &mut dyn FnMut() -> Fallible<String>) -> Fallible<Response> {
    let mut cursor = Cursor::new(read_line);
    cursor.skip_ws()?;
    if cursor.peek()? == '(' {
        cursor.bump()?;
        cursor.skip_ws()?;
        if cursor.peek()? == '(' {
            parse_values(&mut cursor)
        } else {
            parse_error(&mut cursor)
        }
    } else {
        let word = cursor.atom()?;
        match word.as_str() {
            "sat" => Ok(Response::Sat),
            "unsat" => Ok(Response::Unsat),
            "unknown" => Ok(Response::Unknown),
            other => Err(SmtError::BadResponse(other.to_string()).into()),
        }
    }
}

fn parse_error(cursor: &mut Cursor<'_>) -> Fallible<Response> {
    let word = cursor.atom()?;
    if word != "error" {
        return Err(SmtError::BadResponse(format!("({} ...", word)).into());
    }
    cursor.skip_ws()?;
    if cursor.peek()? != '"' {
        return Err(SmtError::BadResponse("(error without message".to_string()).into());
    }
    cursor.bump()?;
    let mut msg = String::new();
    loop {
        let c = cursor.peek()?;
        cursor.bump()?;
        if c == '"' {
            break;
        }
        msg.push(c);
    }
    cursor.skip_ws()?;
    cursor.expect(')')?;
    Ok(Response::Error(msg))
}

fn parse_values(cursor: &mut Cursor<'_>) -> Fallible<Response> {
    let mut values = Vec::new();
    loop {
        cursor.skip_ws()?;
        if cursor.peek()? == ')' {
            cursor.bump()?;
            return Ok(Response::Values(values));
        }
        cursor.expect('(')?;
        cursor.skip_ws()?;
        let sym = cursor.atom()?;
        cursor.skip_ws()?;
        let value = cursor.value_token()?;
        cursor.skip_ws()?;
        cursor.expect(')')?;
        values.push((symbol(&sym), value));
    }
}

/// A line buffer plus the continuation that refills it.
struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    read_line: &'a mut dyn FnMut() -> Fallible<String>,
}

impl<'a> Cursor<'a> {
    fn new(read_line: &'a mut dyn FnMut() -> Fallible<String>) -> Cursor<'a> {
        Cursor {
            chars: Vec::new(),
            pos: 0,
            read_line,
        }
    }

    fn refill(&mut self) -> Fallible<()> {
        let line = (self.read_line)()?;
        self.chars.extend(line.trim_end_matches(&['\r', '\n'][..]).chars());
        // The line break terminates a trailing token; without it the
        // parser would block on a read the solver will never answer.
        self.chars.push(' ');
        Ok(())
    }

    fn peek(&mut self) -> Fallible<char> {
        while self.pos >= self.chars.len() {
            self.refill()?;
        }
        Ok(self.chars[self.pos])
    }

    fn bump(&mut self) -> Fallible<()> {
        self.peek()?;
        self.pos += 1;
        Ok(())
    }

    fn expect(&mut self, want: char) -> Fallible<()> {
        let got = self.peek()?;
        if got != want {
            return Err(
                SmtError::BadResponse(format!("expected '{}', found '{}'", want, got)).into(),
            );
        }
        self.bump()
    }

    fn skip_ws(&mut self) -> Fallible<()> {
        while self.peek()?.is_whitespace() {
            self.bump()?;
        }
        Ok(())
    }

    /// A bare token: delimited by whitespace or a parenthesis.
    fn atom(&mut self) -> Fallible<String> {
        self.skip_ws()?;
        let mut out = String::new();
        loop {
            let c = self.peek()?;
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            out.push(c);
            self.bump()?;
        }
        if out.is_empty() {
            return Err(SmtError::BadResponse("expected a token".to_string()).into());
        }
        Ok(out)
    }

    /// A model value: a bare token, except that a parenthesised token
    /// such as `(- 3)` is consumed wholesale, parentheses preserved.
    fn value_token(&mut self) -> Fallible<String> {
        self.skip_ws()?;
        if self.peek()? != '(' {
            return self.atom();
        }
        let mut out = String::new();
        let mut depth = 0usize;
        loop {
            let c = self.peek()?;
            self.bump()?;
            out.push(c);
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_lines(lines: &[&str]) -> Fallible<Response> {
        let mut remaining: Vec<String> = lines.iter().rev().map(|s| s.to_string()).collect();
        let mut read = move || -> Fallible<String> {
            remaining
                .pop()
                .ok_or_else(|| SmtError::Disconnected.into())
        };
        parse_response(&mut read)
    }

    #[test]
    fn literals() {
        assert_eq!(parse_lines(&["sat"]).unwrap(), Response::Sat);
        assert_eq!(parse_lines(&["unsat"]).unwrap(), Response::Unsat);
        assert_eq!(parse_lines(&["unknown"]).unwrap(), Response::Unknown);
    }

    #[test]
    fn error_response() {
        assert_eq!(
            parse_lines(&["(error \"line 3: unknown constant\")"]).unwrap(),
            Response::Error("line 3: unknown constant".to_string())
        );
    }

    #[test]
    fn model_values() {
        let r = parse_lines(&["((a 1) (b (- 2)))"]).unwrap();
        match &r {
            Response::Values(vs) => {
                assert_eq!(vs.len(), 2);
                assert_eq!(vs[0].1, "1");
                assert_eq!(vs[1].1, "(- 2)");
            }
            other => panic!("expected values, got {:?}", other),
        }
    }

    #[test]
    fn parser_requests_more_input_for_split_responses() {
        let r = parse_lines(&["((a 1)", "(b (- 2)))"]).unwrap();
        match r {
            Response::Values(vs) => assert_eq!(vs.len(), 2),
            other => panic!("expected values, got {:?}", other),
        }
    }

    #[test]
    fn round_trip() {
        for text in &[
            "sat",
            "unsat",
            "unknown",
            "(error \"x\")",
            "((a 1) (b (- 2)))",
        ] {
            let parsed = parse_lines(&[text]).unwrap();
            assert_eq!(&parsed.to_string(), text);
        }
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_lines(&["success maybe"]).is_err());
        assert!(parse_lines(&["(warning \"odd\")"]).is_err());
    }
}
