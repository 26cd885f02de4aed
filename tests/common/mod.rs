//! Test fixtures shared by the integration tests
//!
//! ワークブックは`rust_xlsxwriter`で生成します。各行はA列（または B列）に1セルだけ書き込みます。

#![allow(dead_code)]

use std::path::Path;

use rust_xlsxwriter::{Format, FormatBorder, Formula, Workbook, XlsxError};

/// シートの1行分の内容（行番号は並び順）
#[derive(Debug, Clone, Copy)]
pub enum Line<'a> {
    /// 罫線のない文字列（本文）
    Text(&'a str),
    /// 左罫線付きの文字列（表）
    Bordered(&'a str),
    /// 数値
    Number(f64),
    /// 何も書かない行
    Blank,
    /// 値のない左罫線付きセル
    StyledBlank,
    /// B列だけに書いた文字列
    ColumnB(&'a str),
    /// 文字列を返す数式（式, キャッシュ値）
    Formula(&'a str, &'a str),
}

/// シート名と行の組からワークブックのバイト列を生成
pub fn workbook_bytes(sheets: &[(&str, &[Line<'_>])]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bordered = Format::new().set_border_left(FormatBorder::Thin);

    for (name, lines) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name)?;

        for (row, line) in lines.iter().enumerate() {
            let row = row as u32;
            match *line {
                Line::Text(text) => {
                    worksheet.write_string(row, 0, text)?;
                }
                Line::Bordered(text) => {
                    worksheet.write_string_with_format(row, 0, text, &bordered)?;
                }
                Line::Number(value) => {
                    worksheet.write_number(row, 0, value)?;
                }
                Line::Blank => {}
                Line::StyledBlank => {
                    worksheet.write_blank(row, 0, &bordered)?;
                }
                Line::ColumnB(text) => {
                    worksheet.write_string(row, 1, text)?;
                }
                Line::Formula(formula, result) => {
                    worksheet.write_formula(row, 0, Formula::new(formula).set_result(result))?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

/// ワークブックをファイルに書き出す（親ディレクトリも作成）
pub fn write_workbook(path: &Path, sheets: &[(&str, &[Line<'_>])]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, workbook_bytes(sheets).unwrap()).unwrap();
}

/// 本文1行だけを持つ「事業の状況」シートのワークブックを書き出す
pub fn write_report(path: &Path, text: &str) {
    write_workbook(path, &[("事業の状況", &[Line::Text(text)])]);
}
