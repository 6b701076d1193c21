use linesh::lexer::{Lexer, Token};

fn word(s: &str) -> Token {
    Token::Word(s.to_string())
}

#[test]
fn test_one_token_per_unit_in_order() {
    let tokens = Lexer::tokenize("ls -la /tmp \"two words\" $HOME").unwrap();
    assert_eq!(
        tokens,
        vec![
            word("ls"),
            word("-la"),
            word("/tmp"),
            Token::QuotedString("two words".to_string()),
            Token::VariableRef("HOME".to_string()),
        ]
    );
}

#[test]
fn test_quoted_run_keeps_inner_spaces() {
    let tokens = Lexer::tokenize("\"a b c\"").unwrap();
    assert_eq!(tokens, vec![Token::QuotedString("a b c".to_string())]);

    let tokens = Lexer::tokenize("echo \"  padded  \"").unwrap();
    assert_eq!(tokens[1], Token::QuotedString("  padded  ".to_string()));
}

#[test]
fn test_unterminated_quote_closes_at_end_of_line() {
    let tokens = Lexer::tokenize("echo \"never closed").unwrap();
    assert_eq!(
        tokens,
        vec![word("echo"), Token::QuotedString("never closed".to_string())]
    );
}

#[test]
fn test_operators_stand_alone() {
    let tokens = Lexer::tokenize("N = cat f | wc -l > out").unwrap();
    assert_eq!(
        tokens,
        vec![
            word("N"),
            Token::Assign,
            word("cat"),
            word("f"),
            Token::Pipe,
            word("wc"),
            word("-l"),
            Token::Redirect,
            word("out"),
        ]
    );
}

#[test]
fn test_operators_without_spaces() {
    let tokens = Lexer::tokenize("echo hi|tr").unwrap();
    // Inside a run an operator character is part of the word.
    assert_eq!(tokens, vec![word("echo"), word("hi|tr")]);

    let tokens = Lexer::tokenize("|tr").unwrap();
    assert_eq!(tokens, vec![Token::Pipe, word("tr")]);
}

#[test]
fn test_variable_reference_strips_dollar() {
    let tokens = Lexer::tokenize("echo $X $LONG_NAME").unwrap();
    assert_eq!(
        tokens,
        vec![
            word("echo"),
            Token::VariableRef("X".to_string()),
            Token::VariableRef("LONG_NAME".to_string()),
        ]
    );
}

#[test]
fn test_blank_lines_have_no_tokens() {
    assert!(Lexer::tokenize("").unwrap().is_empty());
    assert!(Lexer::tokenize("   \t  ").unwrap().is_empty());
    assert!(Lexer::tokenize("\n").unwrap().is_empty());
}

#[test]
fn test_iterator_matches_tokenize() {
    let line = "X = echo \"a b\" $Y";
    let collected: Result<Vec<_>, _> = Lexer::new(line).collect();
    assert_eq!(collected.unwrap(), Lexer::tokenize(line).unwrap());
}
