//! Security Tests
//!
//! セキュリティ対策のテストケースを実装します。
//! ZIP bomb攻撃、パストラバーサル攻撃への対策を検証します。

use form2txt::{ConverterBuilder, Form2TxtError};
use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// 指定した名前のエントリを持つZIPアーカイブを作成
fn zip_with_entries<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);

        for name in names {
            zip.start_file(name, options).unwrap();
            zip.write_all(b"test").unwrap();
        }

        zip.finish().unwrap();
    }
    zip_data
}

fn convert(data: Vec<u8>) -> Result<Option<String>, Form2TxtError> {
    let converter = ConverterBuilder::new().build().unwrap();
    converter.convert_to_string(Cursor::new(data))
}

/// ZIP bomb攻撃のテスト: 大量のファイルを含むZIPアーカイブ
#[test]
fn test_zip_bomb_too_many_files() {
    // 10,001個のファイルを含むZIPアーカイブを作成（上限: 10,000）
    let names: Vec<String> = (0..10_001).map(|i| format!("xl/file{}.xml", i)).collect();
    let zip_data = zip_with_entries(names.iter().map(String::as_str));

    match convert(zip_data) {
        Err(Form2TxtError::SecurityViolation(msg)) => {
            assert!(msg.contains("too many files"));
        }
        e => panic!("Expected SecurityViolation, got {:?}", e),
    }
}

/// ZIP bomb攻撃のテスト: 展開後のサイズが大きすぎるZIPアーカイブ
#[test]
#[ignore] // 大きなファイルを作成するため、通常のテストではスキップ
fn test_zip_bomb_large_entry() {
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        // 上限（100MB）を超える1エントリ（圧縮後は小さい）
        let large_data = vec![0u8; 104_857_601];
        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(&large_data).unwrap();

        zip.finish().unwrap();
    }

    match convert(zip_data) {
        Err(Form2TxtError::SecurityViolation(msg)) => {
            assert!(msg.contains("exceeds maximum size"));
        }
        e => panic!("Expected SecurityViolation, got {:?}", e),
    }
}

/// パストラバーサル攻撃のテスト: `..`を含むパス
#[test]
fn test_path_traversal_dotdot() {
    let zip_data = zip_with_entries(["xl/workbook.xml", "../etc/passwd"]);

    match convert(zip_data) {
        Err(Form2TxtError::SecurityViolation(msg)) => {
            assert!(msg.contains("Path traversal") || msg.contains("Invalid ZIP path"));
        }
        e => panic!("Expected SecurityViolation, got {:?}", e),
    }
}

/// パストラバーサル攻撃のテスト: 絶対パス
#[test]
fn test_path_traversal_absolute_path() {
    let zip_data = zip_with_entries(["/etc/passwd"]);

    // ZIPライブラリがパスを正規化した場合は、ブックとして認識されずInvalidFormatになる
    match convert(zip_data) {
        Err(Form2TxtError::SecurityViolation(msg)) => {
            assert!(msg.contains("Absolute path") || msg.contains("Invalid ZIP path"));
        }
        Err(Form2TxtError::InvalidFormat { .. }) => {}
        e => panic!("Unexpected result: {:?}", e),
    }
}

/// パストラバーサル攻撃のテスト: Windows形式の絶対パス
#[test]
fn test_path_traversal_windows_absolute_path() {
    let zip_data = zip_with_entries(["C:\\Windows\\system32"]);

    match convert(zip_data) {
        Err(Form2TxtError::SecurityViolation(msg)) => {
            assert!(
                msg.contains("Absolute path")
                    || msg.contains("Invalid ZIP path")
                    || msg.contains("Backslash")
            );
        }
        Err(Form2TxtError::InvalidFormat { .. }) => {}
        e => panic!("Unexpected result: {:?}", e),
    }
}

/// ZIPだがブックではないアーカイブ
#[test]
fn test_plain_zip_archive_is_invalid_format() {
    let zip_data = zip_with_entries(["hello.txt"]);
    assert!(matches!(
        convert(zip_data),
        Err(Form2TxtError::InvalidFormat { .. })
    ));
}

/// 入力サイズの上限のテスト
#[test]
#[ignore] // 大きなデータを作成するため、通常のテストではスキップ
fn test_input_file_size_limit() {
    // 2GB + 1バイト
    let large_data = vec![0u8; 2_147_483_649];

    match convert(large_data) {
        Err(Form2TxtError::SecurityViolation(msg)) => {
            assert!(msg.contains("Input file size"));
        }
        e => panic!("Expected SecurityViolation, got {:?}", e),
    }
}
