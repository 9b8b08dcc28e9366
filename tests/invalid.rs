use xmltokenize::{TokenizeOptions, XmlTokenizeError, XmlTokenizer};

fn data(statement: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>",
            "<Statements xmlns=\"http://www.apache.org/xml/test\">",
            "    <statement>Hello World</statement>",
            "    <statement>{}</statement>",
            "</Statements>",
        ),
        statement
    )
}

fn tokenizer(data: &str) -> XmlTokenizer<xmltokenize::QuickXmlParser<&[u8]>> {
    let options =
        TokenizeOptions::new("//statement").namespace("", "http://www.apache.org/xml/test");
    XmlTokenizer::from_reader(options, data.as_bytes()).unwrap()
}

#[test]
fn well_formed_test() {
    let data = data("Have a nice day");
    let mut tokenizer = tokenizer(&data);
    assert_eq!(
        tokenizer.next().unwrap().unwrap(),
        r#"<statement xmlns="http://www.apache.org/xml/test">Hello World</statement>"#
    );
    assert_eq!(
        tokenizer.next().unwrap().unwrap(),
        r#"<statement xmlns="http://www.apache.org/xml/test">Have a nice day</statement>"#
    );
    assert!(tokenizer.next().is_none());
}

#[test]
fn malformed_content_test() {
    let data = data("Have a nice< day");
    let mut tokenizer = tokenizer(&data);
    assert!(tokenizer.next().unwrap().is_ok());
    assert!(tokenizer.has_next());
    let err = tokenizer.next().unwrap().unwrap_err();
    assert!(err.is_parse(), "{err}");
    assert!(!err.is_configuration());
    // the sequence ends after an error
    assert!(!tokenizer.has_next());
    assert!(tokenizer.next().is_none());
}

#[test]
fn malformed_structure_test() {
    const CASES: &[&str] = &[
        "<a><b>1</b><b>2</c></a>",
        "<a><b>1</b><b>2",
        "<a><b>1</b><u:b>2</u:b></a>",
        "<a><b>1</b></a><a><b>2</b></a>",
        "<a><b>1</b></a>junk",
        "<a><b>1</b><b>x &bogus; y</b></a>",
        "<a><b>1</b><b c='&bogus;'>2</b></a>",
        "<a><b>1</b><b c='<'>2</b></a>",
    ];
    for &doc in CASES {
        let options = TokenizeOptions::new("//b").mode(xmltokenize::ExtractMode::Text);
        let results = XmlTokenizer::from_reader(options, doc.as_bytes())
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(results.len(), 2, "doc: {doc}");
        assert_eq!(results[0].as_ref().unwrap(), "1", "doc: {doc}");
        assert!(
            matches!(results[1], Err(XmlTokenizeError::Parse { .. })),
            "doc: {doc}, result: {:?}",
            results[1]
        );
    }
}

#[test]
fn first_token_error_test() {
    // the error found while reading ahead during construction surfaces on the first call
    let options = TokenizeOptions::new("//b");
    let mut tokenizer = XmlTokenizer::from_reader(options, "<a><b>1</c></a>".as_bytes()).unwrap();
    assert!(tokenizer.has_next());
    assert!(tokenizer.next().unwrap().is_err());
    assert!(tokenizer.next().is_none());
}
