//! Integration tests: parse, inspect and write back interchange files

use edi_adapter_x12::{Document, EdiValue, Element, Options, Segment};
use std::fs;
use std::path::PathBuf;

fn testdata(path: &str) -> String {
    let full = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../testdata")
        .join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn test_interchange_file_round_trip() -> anyhow::Result<()> {
    let text = testdata("edi/997_00402.edi");
    let document = Document::parse_with(&text, Options::new().add_line_breaks(true))?;

    assert_eq!(document.segments.len(), 9);
    assert_eq!(document.options.segment_terminator, Some('~'));
    assert_eq!(document.options.element_separator, Some('*'));

    let ak2 = &document.segments[4];
    let codes = ak2.element(1).expect("AK201 is present");
    assert_eq!(codes.repetitions.len(), 2);
    assert_eq!(codes.repetitions[1].value(), Some("810"));

    assert_eq!(document.to_edi()?, text);
    Ok(())
}

#[test]
fn test_transaction_sets_from_file() -> anyhow::Result<()> {
    let document = Document::parse(&testdata("edi/997_00402.edi"))?;
    let sets = document.transaction_sets();

    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    assert_eq!(set.segments.len(), 5);
    assert_eq!(set.segments[0].get(1), Some("997"));
    assert_eq!(set.interchange_header.and_then(|isa| isa.get(12)), Some("00402"));
    assert_eq!(set.functional_group_header.and_then(|gs| gs.get(1)), Some("FA"));
    Ok(())
}

#[test]
fn test_edit_and_write() -> anyhow::Result<()> {
    let mut document = Document::parse("ST*850*0001~BEG*00*SA*PO1**20120315~SE*3*0001~")?;

    let beg = &mut document.segments[1];
    let date = beg.element(5).expect("BEG05 is present").date_value()?;
    beg.set(5, "20120316");
    beg.set(4, "R1");
    beg.set(7, "X");

    assert_eq!(date.to_string(), "2012-03-15");
    assert_eq!(
        document.to_edi()?,
        "ST*850*0001~BEG*00*SA*PO1*R1*20120316**X~SE*3*0001~"
    );
    Ok(())
}

#[test]
fn test_build_document_from_scratch() -> anyhow::Result<()> {
    let options = Options::new()
        .segment_terminator('~')
        .repetition_separator('^');
    let mut document = Document::new(options);

    let mut codes = Element::new("850");
    codes.repetitions.push(edi_adapter_x12::Repetition::new("810"));
    document.segments.push(
        Segment::new("AK2")
            .with_element(Some(codes))
            .with_element(None)
            .with_element(Some(Element::new("0001"))),
    );

    assert_eq!(document.to_edi()?, "AK2*850^810**0001~");
    Ok(())
}

#[test]
fn test_options_loaded_from_yaml() -> anyhow::Result<()> {
    let options = Options::from_yaml_str(
        "segment_terminator: \"\\n\"\nelement_separator: '|'\ncomponent_separator: ':'\n",
    )?;
    let document = Document::parse_with("N1|A:B|C\nN2|D\n", options)?;

    assert_eq!(document.segments.len(), 2);
    assert_eq!(document.segments[0].element(1).and_then(|e| e.get(2)), Some("B"));
    assert_eq!(document.to_edi()?, "N1|A:B|C\nN2|D\n");
    Ok(())
}
