use mms_engine_rs::codec::media_type::MediaType;

#[test]
fn parses_type_and_parameters() {
    let mt = MediaType::parse("text/html; charset=ISO-8859-4").expect("parse");
    assert_eq!(mt.mime, "text/html");
    assert_eq!(mt.params.len(), 1);
    assert_eq!(mt.param("charset"), Some("ISO-8859-4"));
    assert_eq!(mt.param("CHARSET"), Some("ISO-8859-4"));
}

#[test]
fn tolerates_linear_whitespace() {
    let mt = MediaType::parse("text/plain ;  charset = us-ascii").expect("parse");
    assert_eq!(mt.mime, "text/plain");
    assert_eq!(mt.param("charset"), Some("us-ascii"));
}

#[test]
fn quoted_string_values_with_escapes() {
    let mt = MediaType::parse(
        "application/vnd.wap.multipart.related; start=\"<a\\\"b>\"",
    )
    .expect("parse");
    assert_eq!(mt.param("start"), Some("<a\"b>"));
}

#[test]
fn canonical_unparse() {
    // Single space after ';', tokens unquoted, non-tokens quoted.
    let mt = MediaType::parse("text/plain;charset=utf-8").expect("parse");
    assert_eq!(mt.to_string(), "text/plain; charset=utf-8");

    let mt = MediaType::parse("a/b; k=\"v w\"").expect("parse");
    assert_eq!(mt.to_string(), "a/b; k=\"v w\"");

    // A canonical string survives a parse/unparse cycle unchanged.
    let canonical = "application/vnd.wap.multipart.related; start=\"<smil>\"; \
                     type=\"application/smil\"";
    let mt = MediaType::parse(canonical).expect("parse");
    assert_eq!(mt.to_string(), canonical);
}

#[test]
fn rejects_malformed_input() {
    assert!(MediaType::parse("").is_none());
    assert!(MediaType::parse("text").is_none());
    assert!(MediaType::parse("text/").is_none());
    assert!(MediaType::parse("/plain").is_none());
    assert!(MediaType::parse("text/plain; charset").is_none());
    assert!(MediaType::parse("text/plain; charset=\"oops").is_none());
    assert!(MediaType::parse("text/plain; =x").is_none());
}
