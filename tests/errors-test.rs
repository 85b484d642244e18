use sift::compile;

mod errors {
    use super::*;

    #[test]
    #[should_panic(expected = "expected end of input")]
    fn junk_at_end() {
        compile("test", ". 5").unwrap();
    }

    #[test]
    #[should_panic(expected = "expected expression")]
    fn empty_slice() {
        compile("test", ".[:]").unwrap();
    }

    #[test]
    #[should_panic(expected = "expected a field name after '.'")]
    fn trailing_dot() {
        compile("test", ".x.").unwrap();
    }

    #[test]
    #[should_panic(expected = "expected attribute name or '}'")]
    fn numeric_object_key() {
        compile("test", "{1:2}").unwrap();
    }

    #[test]
    #[should_panic(expected = "expected ':'")]
    fn missing_key_separator() {
        compile("test", "{a 1}").unwrap();
    }

    #[test]
    #[should_panic(expected = "expected ',' or ']'")]
    fn unseparated_array_elements() {
        compile("test", "[1 2]").unwrap();
    }

    #[test]
    #[should_panic(expected = "expected ']'")]
    fn unclosed_index() {
        compile("test", ".[0").unwrap();
    }

    #[test]
    #[should_panic(expected = "expected ')'")]
    fn unclosed_paren() {
        compile("test", "(1,2").unwrap();
    }

    #[test]
    #[should_panic(expected = "string literal not terminated")]
    fn unterminated_string() {
        compile("test", "\"abc").unwrap();
    }

    #[test]
    #[should_panic(expected = "invalid number")]
    fn bare_exponent() {
        compile("test", "1e").unwrap();
    }

    #[test]
    #[should_panic(expected = "illegal character")]
    fn illegal_character() {
        compile("test", "$").unwrap();
    }

    #[test]
    #[should_panic(expected = "illegal byte order mark")]
    fn interior_byte_order_mark() {
        compile("test", ".\u{FEFF}").unwrap();
    }
}

#[test]
fn errors_render_name_line_and_column() {
    let err = compile("prog.jq", ".x +").unwrap_err();
    assert_eq!(
        err.to_string(),
        "prog.jq:1:5: expected expression, found end of input"
    );

    let err = compile("prog.jq", "\n\n  ☃").unwrap_err();
    assert_eq!(err.to_string(), "prog.jq:3:3: illegal character '☃'");

    let err = compile("prog.jq", ".foo[1:2:3]").unwrap_err();
    assert_eq!(err.to_string(), "prog.jq:1:9: expected ']', found ':'");
}

#[test]
fn type_errors_carry_no_position() {
    let filter = compile("test", ".x").unwrap();
    let input: sift::ValueRef = sift::value::number(1.0);
    let err = filter(&input).unwrap_err();
    assert_eq!(err.to_string(), "cannot index number with 'x'");
}
