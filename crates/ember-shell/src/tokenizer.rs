//! Scope-aware tokenizer.
//!
//! Input is consumed one token at a time. Quotes, parenthesized
//! sub-evaluations and braced literal groups are tracked by depth so that
//! delimiters (space, `;`, `,`) only act at the outer scope.
//!
//! ```text
//!   print (add 2 3); say "a;b" {raw (text)} :volume (1, 2, 3)
//!   ^---^ ^-------^  ^-^ ^---^ ^----------^ ^-----^ ^-------^
//!   lit   subeval    lit lit   lit          subeval lit (array)
//! ```

use ember_types::error::{Result, ShellError};

/// How a token's text is used by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Used as-is.
    Literal,
    /// Evaluated as a nested statement; its result replaces the token.
    SubEval,
    /// Nothing accumulated before a statement end or end of input.
    Blank,
}

/// One token plus the input left after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: String,
    pub remainder: &'a str,
    /// The token was ended by a top-level `;`.
    pub end_of_statement: bool,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, text: String, remainder: &'a str, end_of_statement: bool) -> Self {
        // A bare delimiter produces no argument.
        let kind = if kind == TokenKind::Literal && text.is_empty() && end_of_statement {
            TokenKind::Blank
        } else {
            kind
        };
        Self {
            kind,
            text,
            remainder,
            end_of_statement,
        }
    }
}

/// Nesting state of the characters consumed so far in the current token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeState {
    pub paren_depth: usize,
    pub brace_depth: usize,
    pub in_quote: bool,
}

impl ScopeState {
    /// No quote, paren or brace is open.
    pub fn is_outer(&self) -> bool {
        self.paren_depth == 0 && self.brace_depth == 0 && !self.in_quote
    }

    /// Fail with the delimiter that would close the innermost open scope.
    fn check_closed(&self) -> Result<()> {
        if self.in_quote {
            Err(ShellError::UnexpectedEof('"'))
        } else if self.paren_depth > 0 {
            Err(ShellError::UnexpectedEof(')'))
        } else if self.brace_depth > 0 {
            Err(ShellError::UnexpectedEof('}'))
        } else {
            Ok(())
        }
    }
}

/// Consume the next token from `input`.
pub fn next_token(input: &str) -> Result<Token<'_>> {
    let mut scope = ScopeState::default();
    let mut kind = TokenKind::Literal;
    let mut text = String::new();

    for (i, ch) in input.char_indices() {
        let rest = &input[i + ch.len_utf8()..];
        match ch {
            '\r' | '\n' => {},
            '"' => {
                scope.in_quote = !scope.in_quote;
                if scope.paren_depth > 0 || scope.brace_depth > 0 {
                    text.push(ch);
                } else if !scope.in_quote {
                    return Ok(Token::new(kind, text, rest, false));
                }
            },
            _ if scope.in_quote => text.push(ch),

            '(' if scope.brace_depth > 0 => text.push(ch),
            '(' => {
                if scope.paren_depth == 0 {
                    kind = TokenKind::SubEval;
                } else {
                    text.push(ch);
                }
                scope.paren_depth += 1;
            },
            ')' if scope.brace_depth > 0 || scope.paren_depth == 0 => text.push(ch),
            ')' => {
                scope.paren_depth -= 1;
                if scope.paren_depth == 0 {
                    return Ok(Token::new(kind, text, rest, false));
                }
                text.push(ch);
            },

            '{' if scope.paren_depth > 0 => text.push(ch),
            '{' => {
                if scope.brace_depth > 0 {
                    text.push(ch);
                }
                scope.brace_depth += 1;
            },
            '}' if scope.paren_depth > 0 || scope.brace_depth == 0 => text.push(ch),
            '}' => {
                scope.brace_depth -= 1;
                if scope.brace_depth == 0 {
                    return Ok(Token::new(kind, text, rest, false));
                }
                text.push(ch);
            },

            // Inside a group every other character is data. A comma directly
            // inside the outermost parens turns `(a, b)` into an array literal.
            _ if !scope.is_outer() => {
                if ch == ',' && scope.paren_depth == 1 && scope.brace_depth == 0 {
                    kind = TokenKind::Literal;
                }
                text.push(ch);
            },

            ':' => kind = TokenKind::SubEval,
            ' ' | '\t' => {
                if !text.is_empty() {
                    return Ok(Token::new(kind, text, rest, false));
                }
            },
            ';' => return Ok(Token::new(kind, text, rest, true)),
            _ => text.push(ch),
        }
    }

    scope.check_closed()?;
    let kind = if kind == TokenKind::Literal && text.is_empty() {
        TokenKind::Blank
    } else {
        kind
    };
    Ok(Token::new(kind, text, "", false))
}

/// Consume one statement: every token up to a top-level `;` or the end of
/// input. Blank tokens are dropped.
pub fn next_statement(input: &str) -> Result<(Vec<Token<'_>>, &str)> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        let token = next_token(rest)?;
        rest = token.remainder;
        let done = token.end_of_statement || rest.is_empty();
        if token.kind != TokenKind::Blank {
            log::trace!("token {:?} {:?}", token.kind, token.text);
            tokens.push(token);
        }
        if done {
            return Ok((tokens, rest));
        }
    }
}

/// Split array-literal text on top-level commas.
///
/// Quotes, parens and braces are balanced but left untouched: each element
/// is tokenized again when it is resolved.
pub fn split_array(text: &str) -> Result<Vec<&str>> {
    let mut scope = ScopeState::default();
    let mut parts = Vec::new();
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match ch {
            '"' => scope.in_quote = !scope.in_quote,
            _ if scope.in_quote => {},
            '(' => scope.paren_depth += 1,
            ')' => scope.paren_depth = scope.paren_depth.saturating_sub(1),
            '{' => scope.brace_depth += 1,
            '}' => scope.brace_depth = scope.brace_depth.saturating_sub(1),
            ',' if scope.is_outer() => {
                parts.push(&text[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }

    scope.check_closed()?;
    parts.push(&text[start..]);
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str) -> Vec<(TokenKind, String)> {
        let mut out = Vec::new();
        let mut rest = input;
        loop {
            let (tokens, next) = next_statement(rest).unwrap();
            out.extend(tokens.into_iter().map(|t| (t.kind, t.text)));
            if next.is_empty() {
                return out;
            }
            rest = next;
        }
    }

    fn lit(s: &str) -> (TokenKind, String) {
        (TokenKind::Literal, s.to_string())
    }

    fn sub(s: &str) -> (TokenKind, String) {
        (TokenKind::SubEval, s.to_string())
    }

    #[test]
    fn simple_words() {
        assert_eq!(words("print 1"), vec![lit("print"), lit("1")]);
    }

    #[test]
    fn repeated_spaces_and_tabs() {
        assert_eq!(words("  a \t  b   "), vec![lit("a"), lit("b")]);
    }

    #[test]
    fn empty_input_is_blank() {
        let t = next_token("").unwrap();
        assert_eq!(t.kind, TokenKind::Blank);
        assert!(!t.end_of_statement);
    }

    #[test]
    fn semicolon_ends_statement() {
        let (tokens, rest) = next_statement("print 1; print 2").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["print", "1"]);
        assert_eq!(rest, " print 2");
    }

    #[test]
    fn bare_semicolon_is_blank() {
        let t = next_token("; x").unwrap();
        assert_eq!(t.kind, TokenKind::Blank);
        assert!(t.end_of_statement);
        assert_eq!(t.remainder, " x");
    }

    #[test]
    fn quoted_text_keeps_delimiters() {
        assert_eq!(words("print \"a;b c\""), vec![lit("print"), lit("a;b c")]);
    }

    #[test]
    fn empty_quotes_are_an_argument() {
        assert_eq!(words("print \"\""), vec![lit("print"), lit("")]);
    }

    #[test]
    fn closing_quote_ends_token() {
        assert_eq!(words("\"ab\"cd"), vec![lit("ab"), lit("cd")]);
    }

    #[test]
    fn parens_make_sub_eval() {
        assert_eq!(
            words("print (add 2 3)"),
            vec![lit("print"), sub("add 2 3")]
        );
    }

    #[test]
    fn nested_parens_are_kept() {
        assert_eq!(
            words("print (add (mul 2 3) 1)"),
            vec![lit("print"), sub("add (mul 2 3) 1")]
        );
    }

    #[test]
    fn semicolon_inside_parens_is_data() {
        assert_eq!(
            words("x (print 1; print 2) y"),
            vec![lit("x"), sub("print 1; print 2"), lit("y")]
        );
    }

    #[test]
    fn quotes_inside_parens_are_kept() {
        assert_eq!(
            words("x (print \")\")"),
            vec![lit("x"), sub("print \")\"")]
        );
    }

    #[test]
    fn comma_makes_array_literal() {
        assert_eq!(words("cmd (1, 2, 3)"), vec![lit("cmd"), lit("1, 2, 3")]);
    }

    #[test]
    fn nested_comma_does_not_demote() {
        assert_eq!(
            words("cmd (pick (1, 2))"),
            vec![lit("cmd"), sub("pick (1, 2)")]
        );
    }

    #[test]
    fn array_of_arrays_stays_literal() {
        assert_eq!(
            words("cmd ((1, 2), (3, 4))"),
            vec![lit("cmd"), lit("(1, 2), (3, 4)")]
        );
    }

    #[test]
    fn braces_are_verbatim() {
        assert_eq!(
            words("if 1 {print (x); print \"y\"}"),
            vec![lit("if"), lit("1"), lit("print (x); print \"y\"")]
        );
    }

    #[test]
    fn nested_braces_are_kept() {
        assert_eq!(words("{a {b} c}"), vec![lit("a {b} c")]);
    }

    #[test]
    fn braces_inside_parens_are_plain_characters() {
        assert_eq!(
            words("(repeat 2 {print 1})"),
            vec![sub("repeat 2 {print 1}")]
        );
    }

    #[test]
    fn colon_is_variable_reference() {
        assert_eq!(words("print :volume"), vec![lit("print"), sub("volume")]);
    }

    #[test]
    fn colon_before_quotes_references_quoted_name() {
        assert_eq!(words(":\"my var\" x"), vec![sub("my var"), lit("x")]);
    }

    #[test]
    fn colon_inside_quotes_is_literal() {
        assert_eq!(words("print \"a:b\""), vec![lit("print"), lit("a:b")]);
    }

    #[test]
    fn newlines_are_ignored() {
        assert_eq!(words("pri\nnt\r 1"), vec![lit("print"), lit("1")]);
        assert_eq!(words("print \"a\nb\""), vec![lit("print"), lit("ab")]);
    }

    #[test]
    fn stray_closers_are_literal() {
        assert_eq!(words("a) b}"), vec![lit("a)"), lit("b}")]);
    }

    #[test]
    fn unterminated_quote() {
        let err = next_token("\"abc").unwrap_err();
        assert!(matches!(err, ShellError::UnexpectedEof('"')));
    }

    #[test]
    fn unterminated_paren() {
        let err = next_token("(add 1 (2)").unwrap_err();
        assert!(matches!(err, ShellError::UnexpectedEof(')')));
    }

    #[test]
    fn unterminated_brace() {
        let err = next_token("{print 1").unwrap_err();
        assert!(matches!(err, ShellError::UnexpectedEof('}')));
    }

    #[test]
    fn quote_reported_before_paren() {
        let err = next_token("(print \"x").unwrap_err();
        assert!(matches!(err, ShellError::UnexpectedEof('"')));
    }

    #[test]
    fn scope_outer() {
        assert!(ScopeState::default().is_outer());
        let s = ScopeState {
            paren_depth: 1,
            ..ScopeState::default()
        };
        assert!(!s.is_outer());
    }

    #[test]
    fn split_array_simple() {
        assert_eq!(split_array("1, 2,3").unwrap(), vec!["1", " 2", "3"]);
    }

    #[test]
    fn split_array_keeps_groups() {
        assert_eq!(
            split_array("(add 1, 2), \"a,b\", {x,y}").unwrap(),
            vec!["(add 1, 2)", " \"a,b\"", " {x,y}"]
        );
    }

    #[test]
    fn split_array_single_element() {
        assert_eq!(split_array("42").unwrap(), vec!["42"]);
    }

    #[test]
    fn split_array_unbalanced() {
        assert!(matches!(
            split_array("(1, 2"),
            Err(ShellError::UnexpectedEof(')'))
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics(input in ".{0,64}") {
                let mut rest = input.as_str();
                while !rest.is_empty() {
                    match next_statement(rest) {
                        Ok((_, next)) => {
                            prop_assert!(next.len() < rest.len());
                            rest = next;
                        },
                        Err(_) => break,
                    }
                }
            }

            #[test]
            fn plain_words_split_losslessly(ws in proptest::collection::vec("[a-z0-9_.]{1,8}", 1..8)) {
                let line = ws.join(" ");
                let got: Vec<String> = words(&line).into_iter().map(|(_, t)| t).collect();
                prop_assert_eq!(got, ws);
            }

            #[test]
            fn parenthesized_word_is_sub_eval(w in "[a-z]{1,8}( [a-z0-9]{1,4}){0,3}") {
                let line = format!("({w})");
                prop_assert_eq!(words(&line), vec![sub(&w)]);
            }

            #[test]
            fn braced_text_is_verbatim(w in "[a-z ;:(),]{0,16}") {
                let line = format!("{{{w}}}");
                prop_assert_eq!(words(&line), vec![lit(&w)]);
            }
        }
    }
}
