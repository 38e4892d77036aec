//! Tokenizer for template source.
//!
//! Splits raw source into a flat sequence of text, tag (`{% ... %}`) and
//! output (`{{ ... }}`) tokens. The scan is forgiving: a `{` that is not
//! followed by a completed `%}` or `}}` delimiter stays literal text, so the
//! tokenizer has no failure mode. Tokens borrow from the source string.

/// One token of template source. Tag and output tokens keep their
/// delimiters; header parsing happens later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Tag(&'a str),
    Output(&'a str),
}

/// Splits source into tokens.
///
/// Scans forward for `{`. A `{%` runs to the next `%}`, a `{{` to the next
/// `}}`; if the closing sequence never appears the brace is literal and the
/// scan resumes one character later. Text before each delimited token is
/// emitted even when empty, except that a leading empty text token is
/// dropped. The remaining tail is always emitted as a final text token.
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut prev_end = 0;
    let mut scan = 0;

    while let Some(offset) = src[scan..].find('{') {
        let start = scan + offset;
        let close = match bytes.get(start + 1) {
            Some(b'%') => src[start + 2..].find("%}").map(|i| start + 2 + i + 2),
            Some(b'{') => src[start + 2..].find("}}").map(|i| start + 2 + i + 2),
            _ => None,
        };
        match close {
            Some(end) => {
                tokens.push(Token::Text(&src[prev_end..start]));
                let raw = &src[start..end];
                if bytes[start + 1] == b'%' {
                    tokens.push(Token::Tag(raw));
                } else {
                    tokens.push(Token::Output(raw));
                }
                prev_end = end;
                scan = end;
            }
            // Unmatched opening brace: literal. Resume one character later.
            None => scan = start + 1,
        }
    }

    tokens.push(Token::Text(&src[prev_end..]));
    if tokens.first() == Some(&Token::Text("")) {
        tokens.remove(0);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(tokenize("hello world"), vec![Token::Text("hello world")]);
    }

    #[test]
    fn empty_source_has_no_tokens() {
        assert_eq!(tokenize(""), Vec::<Token>::new());
    }

    #[test]
    fn output_token_with_surrounding_text() {
        assert_eq!(
            tokenize("a {{ x }} b"),
            vec![Token::Text("a "), Token::Output("{{ x }}"), Token::Text(" b")]
        );
    }

    #[test]
    fn tag_token_with_surrounding_text() {
        assert_eq!(
            tokenize("a {% if x %} b"),
            vec![Token::Text("a "), Token::Tag("{% if x %}"), Token::Text(" b")]
        );
    }

    #[test]
    fn leading_empty_text_token_is_dropped() {
        assert_eq!(
            tokenize("{{ x }}rest"),
            vec![Token::Output("{{ x }}"), Token::Text("rest")]
        );
    }

    #[test]
    fn interior_empty_text_tokens_are_kept() {
        assert_eq!(
            tokenize("{{ a }}{{ b }}"),
            vec![
                Token::Output("{{ a }}"),
                Token::Text(""),
                Token::Output("{{ b }}"),
                Token::Text(""),
            ]
        );
    }

    #[test]
    fn unmatched_open_brace_stays_literal() {
        assert_eq!(tokenize("a{b"), vec![Token::Text("a{b")]);
        assert_eq!(tokenize("a {{ b"), vec![Token::Text("a {{ b")]);
        assert_eq!(tokenize("a {% b"), vec![Token::Text("a {% b")]);
    }

    #[test]
    fn literal_brace_before_real_token() {
        assert_eq!(
            tokenize("a{b{{ c }}"),
            vec![Token::Text("a{b"), Token::Output("{{ c }}"), Token::Text("")]
        );
    }

    #[test]
    fn delimiters_may_span_lines() {
        assert_eq!(
            tokenize("x{% for i\nin items %}y"),
            vec![
                Token::Text("x"),
                Token::Tag("{% for i\nin items %}"),
                Token::Text("y"),
            ]
        );
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            tokenize("héllo {{ x }} wörld"),
            vec![
                Token::Text("héllo "),
                Token::Output("{{ x }}"),
                Token::Text(" wörld"),
            ]
        );
        assert_eq!(tokenize("é{û"), vec![Token::Text("é{û")]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn brace_free_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 .,!?\n]{0,40}"
    }

    proptest! {
        #[test]
        fn brace_free_source_is_a_single_text_token(src in brace_free_text()) {
            let tokens = tokenize(&src);
            if src.is_empty() {
                prop_assert!(tokens.is_empty());
            } else {
                prop_assert_eq!(tokens, vec![Token::Text(src.as_str())]);
            }
        }

        #[test]
        fn tokens_reassemble_to_the_source(
            before in brace_free_text(),
            expr in "[a-z]{1,8}",
            after in brace_free_text()
        ) {
            let src = format!("{}{{{{ {} }}}}{}", before, expr, after);
            let joined: String = tokenize(&src)
                .iter()
                .map(|t| match t {
                    Token::Text(s) | Token::Tag(s) | Token::Output(s) => *s,
                })
                .collect();
            prop_assert_eq!(joined, src);
        }

        #[test]
        fn tokenizer_never_panics(src in "[a-z{}% ]{0,60}") {
            let _ = tokenize(&src);
        }
    }
}
