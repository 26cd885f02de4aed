//! Integration Tests for form2txt
//!
//! 1つのブックからテキストを取り出す変換（`Converter`）と`Workbook`の読み取りを検証します。

mod common;

use common::{workbook_bytes, write_workbook, Line};
use form2txt::{
    CandidateSheetNames, CellKind, ConversionOutcome, ConverterBuilder, LineEnding, Workbook,
};
use std::io::Cursor;

fn english_converter() -> form2txt::Converter {
    ConverterBuilder::new()
        .with_candidate_sheets(CandidateSheetNames::new([
            "business overview",
            "issues to address",
        ]))
        .with_line_ending(LineEnding::Lf)
        .build()
        .unwrap()
}

#[test]
fn test_end_to_end_business_overview() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.xlsx");
    let output = dir.path().join("report.txt");
    write_workbook(
        &input,
        &[(
            "business overview",
            &[
                Line::Text("Intro text"),
                Line::Blank,
                Line::Bordered("More text"),
                Line::Text("Final text"),
            ],
        )],
    );

    let outcome = english_converter().convert_file(&input, &output).unwrap();

    assert_eq!(
        outcome,
        ConversionOutcome::Converted {
            sheets: vec!["business overview".to_string()],
            lines: 2,
        }
    );
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Intro text\nFinal text\n"
    );
}

#[test]
fn test_candidate_list_order_wins_over_physical_order() {
    let bytes = workbook_bytes(&[
        ("issues to address", &[Line::Text("issue line")]),
        ("appendix", &[Line::Text("ignored")]),
        ("business overview", &[Line::Text("overview line")]),
    ])
    .unwrap();

    let text = english_converter()
        .convert_to_string(Cursor::new(bytes))
        .unwrap()
        .unwrap();
    assert_eq!(text, "overview line\nissue line\n");
}

#[test]
fn test_sheet_not_found_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("other.xlsx");
    let output = dir.path().join("other.txt");
    write_workbook(&input, &[("Sheet1", &[Line::Text("text")])]);

    let outcome = english_converter().convert_file(&input, &output).unwrap();

    assert_eq!(outcome, ConversionOutcome::SheetNotFound);
    assert!(!output.exists());
}

#[test]
fn test_sheet_name_match_is_exact() {
    let bytes = workbook_bytes(&[("Business Overview", &[Line::Text("text")])]).unwrap();
    let text = english_converter()
        .convert_to_string(Cursor::new(bytes))
        .unwrap();
    assert_eq!(text, None);
}

#[test]
fn test_found_sheet_without_body_text_writes_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("table_only.xlsx");
    let output = dir.path().join("table_only.txt");
    write_workbook(
        &input,
        &[("business overview", &[Line::Bordered("a"), Line::Number(1.0)])],
    );

    let outcome = english_converter().convert_file(&input, &output).unwrap();

    assert!(matches!(outcome, ConversionOutcome::Converted { lines: 0, .. }));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
}

#[test]
fn test_non_text_cells_are_suppressed() {
    let bytes = workbook_bytes(&[(
        "business overview",
        &[
            Line::Number(42.0),
            Line::Formula("=\"計算\"&\"結果\"", "計算結果"),
            Line::ColumnB("column B only"),
            Line::StyledBlank,
            Line::Text("kept"),
        ],
    )])
    .unwrap();

    let text = english_converter()
        .convert_to_string(Cursor::new(bytes))
        .unwrap();
    assert_eq!(text.as_deref(), Some("kept\n"));
}

#[test]
fn test_no_break_space_is_normalized() {
    let bytes = workbook_bytes(&[(
        "business overview",
        &[Line::Text("売上高\u{00A0}\u{00A0}100億円")],
    )])
    .unwrap();

    let text = english_converter()
        .convert_to_string(Cursor::new(bytes))
        .unwrap();
    assert_eq!(text.as_deref(), Some("売上高  100億円\n"));
}

#[test]
fn test_default_candidates_are_report_sections() {
    let bytes = workbook_bytes(&[
        ("研究開発活動", &[Line::Text("研究開発の概要")]),
        ("事業の状況", &[Line::Text("事業の状況の本文")]),
        ("対処すべき課題", &[Line::Text("課題の本文")]),
    ])
    .unwrap();

    let converter = ConverterBuilder::new()
        .with_line_ending(LineEnding::CrLf)
        .build()
        .unwrap();
    let mut output = Vec::new();
    let outcome = converter.convert(Cursor::new(bytes), &mut output).unwrap();

    assert_eq!(
        outcome,
        ConversionOutcome::Converted {
            sheets: vec![
                "事業の状況".to_string(),
                "対処すべき課題".to_string(),
                "研究開発活動".to_string(),
            ],
            lines: 3,
        }
    );
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "事業の状況の本文\r\n課題の本文\r\n研究開発の概要\r\n"
    );
}

#[test]
fn test_multiline_cell_is_written_verbatim() {
    let bytes = workbook_bytes(&[("business overview", &[Line::Text("1行目\n2行目")])]).unwrap();
    let text = english_converter()
        .convert_to_string(Cursor::new(bytes))
        .unwrap();
    assert_eq!(text.as_deref(), Some("1行目\n2行目\n"));
}

#[test]
fn test_workbook_sheet_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    write_workbook(
        &path,
        &[
            ("first", &[Line::Text("a")]),
            (
                "second",
                &[Line::Bordered("table"), Line::StyledBlank, Line::Number(3.5)],
            ),
        ],
    );

    let mut workbook = Workbook::open(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["first", "second"]);
    assert!(workbook.sheet("missing").unwrap().is_none());
    assert!(workbook.sheet_at(2).unwrap().is_none());

    let sheet = workbook.sheet_at(1).unwrap().unwrap();
    assert_eq!(sheet.name(), "second");
    let rows = sheet.rows();
    assert_eq!(rows.len(), 3);

    let table = rows[0].cell(0).unwrap();
    assert_eq!(table.kind(), CellKind::String);
    assert_eq!(table.value(), Some("table"));
    assert!(table.has_left_border());

    // 値のない書式付きセルも行のセルとして存在する
    assert_eq!(rows[1].first_cell_index(), Some(0));
    assert_eq!(rows[1].cell(0).unwrap().value(), None);
    assert_eq!(rows[1].cell(0).unwrap().kind(), CellKind::Other);

    let number = rows[2].cell(0).unwrap();
    assert_eq!(number.kind(), CellKind::Number);
    assert!(!number.has_left_border());

    let first = workbook.sheet("first").unwrap().unwrap();
    assert_eq!(first.rows()[0].cell(0).unwrap().value(), Some("a"));
}

#[test]
fn test_extension_does_not_decide_format() {
    // 中身がOOXMLであれば拡張子が.xlsでも読める
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("misnamed.xls");
    let output = dir.path().join("misnamed.txt");
    write_workbook(&input, &[("business overview", &[Line::Text("text")])]);

    let outcome = english_converter().convert_file(&input, &output).unwrap();
    assert!(matches!(outcome, ConversionOutcome::Converted { lines: 1, .. }));
}
