use seedsmith_core::{
    extract_records, parse_record, split_fields, tokenize, unquote, values_body, RecordError,
    PRODUCT_RECORD_FIELDS,
};

#[test]
fn plain_input_matches_comma_split() {
    let inputs = ["a,b,c", " 1 , 2,3 ", "alpha,  beta gamma ,delta", "x"];
    for input in inputs {
        let expected: Vec<String> = input.split(',').map(|part| part.trim().to_string()).collect();
        assert_eq!(split_fields(input), expected, "input: {input}");
    }
}

#[test]
fn quoted_comma_stays_in_one_field() {
    let fields = tokenize("'hello, world', 2").expect("tokenize");
    assert_eq!(fields, vec!["'hello, world'", "2"]);
}

#[test]
fn bracketed_array_stays_in_one_field() {
    let fields = tokenize("1, [1,2,3], 4").expect("tokenize");
    assert_eq!(fields, vec!["1", "[1,2,3]", "4"]);
}

#[test]
fn nested_arrays_stay_in_one_field() {
    let fields = tokenize("[[1,2],[3,4]], 'x'").expect("tokenize");
    assert_eq!(fields, vec!["[[1,2],[3,4]]", "'x'"]);
}

#[test]
fn rejoined_fields_parse_to_the_same_sequence() {
    let inputs = [
        "'Widget', 'A nice, useful widget', [1,[2,3]]",
        r"'it\'s', 42, '[not, an, array]'",
        "a, b , c",
    ];
    for input in inputs {
        let first = tokenize(input).expect("first pass");
        let second = tokenize(&first.join(",")).expect("second pass");
        assert_eq!(first, second, "input: {input}");
    }
}

#[test]
fn product_record_example_yields_seven_fields() {
    let inner = r#"'Widget', 'A nice, useful widget', '2024-01-01', '2024-01-02', 'http://img', '[1,2,3]', '[\"a\",\"b\"]'"#;
    let fields = parse_record(inner, PRODUCT_RECORD_FIELDS).expect("valid record");

    assert_eq!(fields.len(), 7);
    assert_eq!(fields[1], "'A nice, useful widget'");
    assert_eq!(unquote(&fields[5]), "[1,2,3]");
    assert_eq!(fields[6], r#"'[\"a\",\"b\"]'"#);
}

#[test]
fn short_record_is_rejected() {
    let err = parse_record("'Widget', 'desc'", PRODUCT_RECORD_FIELDS).unwrap_err();
    assert_eq!(
        err,
        RecordError::FieldCount {
            expected: 7,
            found: 2
        }
    );
}

#[test]
fn unterminated_quote_is_rejected() {
    assert_eq!(
        tokenize("'open, 'closed'"),
        Err(RecordError::UnterminatedQuote)
    );
}

#[test]
fn bulk_dump_records_are_extracted_and_parsed() {
    let dump = "INSERT INTO `Products` (`title`, `description`) VALUES\n\
                ('Lamp', 'Bright (very), warm'),\n\
                ('Chair', 'Oak, [sturdy]');\n";
    let extracted = extract_records(values_body(dump));
    assert_eq!(extracted.records.len(), 2);

    let fields = parse_record(extracted.records[0], 2).expect("first record");
    assert_eq!(fields, vec!["'Lamp'", "'Bright (very), warm'"]);

    let fields = parse_record(extracted.records[1], 2).expect("last record");
    assert_eq!(fields[1], "'Oak, [sturdy]'");
}
