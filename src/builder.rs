//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。
//! `Converter`は1つのブックから候補シートを探し、本文行をテキストに書き出します。

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::api::{CandidateSheetNames, ConversionOutcome, LineEnding, OutputLayout};
use crate::error::Form2TxtError;
use crate::extractor::extract_lines;
use crate::parser::Workbook;
use crate::tree::TreeConverter;
use crate::types::Sheet;

/// ストリーム入力時にエラーとログへ表示する名前
const STREAM_SOURCE: &str = "<stream>";

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 抽出対象のシート名（出力順）
    pub candidate_sheets: CandidateSheetNames,

    /// 出力ディレクトリのレイアウト
    pub layout: OutputLayout,

    /// 出力テキストの改行コード
    pub line_ending: LineEnding,

    /// 同じ出力ファイルへの2回目の書き込みをエラーにするか
    pub detect_collisions: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            candidate_sheets: CandidateSheetNames::default(),
            layout: OutputLayout::Mirrored,
            line_ending: LineEnding::Native,
            detect_collisions: true,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust
/// use form2txt::{CandidateSheetNames, ConverterBuilder, LineEnding, OutputLayout};
///
/// # fn main() -> Result<(), form2txt::Form2TxtError> {
/// let converter = ConverterBuilder::new()
///     .with_candidate_sheets(CandidateSheetNames::new(["事業の状況", "研究開発活動"]))
///     .with_layout(OutputLayout::Flattened)
///     .with_line_ending(LineEnding::Lf)
///     .build()?;
/// # let _ = converter;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 候補シート: 有価証券報告書「事業の状況」の6節
    /// - 出力レイアウト: 入力の階層を再現
    /// - 改行コード: 実行環境の既定
    /// - 出力ファイル名の衝突: エラーにする
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// 抽出対象のシート名リストを設定する
    ///
    /// 複数のシートが見つかった場合、このリストの順序で連結して出力します。
    pub fn with_candidate_sheets(mut self, names: CandidateSheetNames) -> Self {
        self.config.candidate_sheets = names;
        self
    }

    /// 出力ディレクトリのレイアウトを設定する
    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// 出力テキストの改行コードを設定する
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.config.line_ending = line_ending;
        self
    }

    /// 出力ファイル名の衝突を検出するかどうかを設定する
    ///
    /// `false`の場合、後から変換したファイルが先の出力を上書きし、警告をログに出します。
    pub fn detect_collisions(mut self, detect: bool) -> Self {
        self.config.detect_collisions = detect;
        self
    }

    /// 設定を検証して`Converter`を生成する
    ///
    /// # エラー
    ///
    /// 候補シート名のリストが空、空のシート名を含む、または重複を含む場合は
    /// `Form2TxtError::Config`を返します。
    pub fn build(self) -> Result<Converter, Form2TxtError> {
        // 1. 候補シート名の検証
        if self.config.candidate_sheets.is_empty() {
            return Err(Form2TxtError::Config(
                "Candidate sheet name list must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in self.config.candidate_sheets.iter() {
            if name.is_empty() {
                return Err(Form2TxtError::Config(
                    "Candidate sheet name must not be empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(Form2TxtError::Config(format!(
                    "Duplicate candidate sheet name: '{}'",
                    name
                )));
            }
        }

        // 2. Converterインスタンス生成
        Ok(Converter::new(self.config))
    }
}

/// 変換処理のファサード
///
/// 1つのExcelブックから候補シートを探し、本文行をテキストとして書き出します。
/// ディレクトリ単位の一括変換は[`Converter::tree`]で取得する[`TreeConverter`]が行います。
///
/// # 使用例
///
/// ```rust,no_run
/// use form2txt::{ConversionOutcome, ConverterBuilder};
/// use std::path::Path;
///
/// # fn main() -> Result<(), form2txt::Form2TxtError> {
/// let converter = ConverterBuilder::new().build()?;
/// match converter.convert_file(Path::new("report.xls"), Path::new("report.txt"))? {
///     ConversionOutcome::Converted { lines, .. } => println!("{} lines", lines),
///     ConversionOutcome::SheetNotFound => println!("no narrative sheet"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub(crate) fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// 同じ設定でディレクトリを一括変換する`TreeConverter`を生成する
    pub fn tree(&self) -> TreeConverter {
        TreeConverter::new(self.clone())
    }

    /// Excelファイルをテキストファイルに変換
    ///
    /// # 戻り値
    ///
    /// * `Ok(ConversionOutcome::Converted)` - 候補シートが見つかり、`output`を書き出した場合
    /// * `Ok(ConversionOutcome::SheetNotFound)` - 候補シートが1つもなかった場合（`output`は作成しない）
    /// * `Err(Form2TxtError)` - ブックを読めなかった、または書き込みに失敗した場合
    ///
    /// 対象シートをすべて読み終えてから出力ファイルを作成するため、
    /// ブックの読み取りに失敗しても書きかけのファイルは残りません。
    pub fn convert_file(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<ConversionOutcome, Form2TxtError> {
        let sheets = self.read_sheets(input)?;
        self.write_file(input, output, &sheets)
    }

    /// ブックを開き、候補シートをリスト順に読み取る
    pub(crate) fn read_sheets(&self, input: &Path) -> Result<Vec<Sheet>, Form2TxtError> {
        let mut workbook = Workbook::open(input)?;
        self.collect_sheets(&mut workbook)
    }

    /// 読み取ったシートを`output`に書き出す（シートがなければファイルを作らない）
    pub(crate) fn write_file(
        &self,
        input: &Path,
        output: &Path,
        sheets: &[Sheet],
    ) -> Result<ConversionOutcome, Form2TxtError> {
        if sheets.is_empty() {
            tracing::warn!(input = %input.display(), "no candidate sheet found");
            return Ok(ConversionOutcome::SheetNotFound);
        }

        let file = File::create(output)?;
        let lines = self.write_sheets(sheets, BufWriter::new(file))?;

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            sheets = sheets.len(),
            lines,
            "converted"
        );

        Ok(ConversionOutcome::Converted {
            sheets: sheets.iter().map(|s| s.name().to_string()).collect(),
            lines,
        })
    }

    /// 任意のリーダーから読み、任意のライターへ書き出す
    ///
    /// 候補シートがない場合、`output`には何も書き込みません。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use form2txt::ConverterBuilder;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), form2txt::Form2TxtError> {
    /// let converter = ConverterBuilder::new().build()?;
    /// let input = File::open("report.xlsx")?;
    /// converter.convert(input, std::io::stdout())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<ConversionOutcome, Form2TxtError> {
        let mut workbook = Workbook::from_reader(input, STREAM_SOURCE)?;
        let sheets = self.collect_sheets(&mut workbook)?;

        if sheets.is_empty() {
            tracing::warn!("no candidate sheet found in input stream");
            return Ok(ConversionOutcome::SheetNotFound);
        }

        let lines = self.write_sheets(&sheets, output)?;
        tracing::debug!(sheets = sheets.len(), lines, "converted input stream");

        Ok(ConversionOutcome::Converted {
            sheets: sheets.iter().map(|s| s.name().to_string()).collect(),
            lines,
        })
    }

    /// テキストを文字列として返す（候補シートがない場合は`None`）
    ///
    /// 改行コードは設定に従います。
    pub fn convert_to_string<R: Read>(&self, input: R) -> Result<Option<String>, Form2TxtError> {
        let mut buffer = Vec::new();
        match self.convert(input, &mut buffer)? {
            ConversionOutcome::SheetNotFound => Ok(None),
            ConversionOutcome::Converted { .. } => {
                let text = String::from_utf8(buffer).map_err(|e| {
                    Form2TxtError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                })?;
                Ok(Some(text))
            }
        }
    }

    /// 候補シートをリスト順に読み取る（存在しないシートは飛ばす）
    fn collect_sheets(&self, workbook: &mut Workbook) -> Result<Vec<Sheet>, Form2TxtError> {
        let mut sheets = Vec::new();
        for name in self.config.candidate_sheets.iter() {
            if let Some(sheet) = workbook.sheet(name)? {
                sheets.push(sheet);
            }
        }
        Ok(sheets)
    }

    /// シートの本文行を連結して書き出し、行数を返す
    fn write_sheets<W: Write>(&self, sheets: &[Sheet], mut writer: W) -> Result<usize, Form2TxtError> {
        let line_ending = self.config.line_ending.as_str();
        let mut lines = 0;

        for sheet in sheets {
            for line in extract_lines(sheet) {
                writer.write_all(line.as_bytes())?;
                writer.write_all(line_ending.as_bytes())?;
                lines += 1;
            }
        }

        writer.flush()?;
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SheetRow, SpreadsheetCell};

    #[test]
    fn test_converter_builder_new() {
        let builder = ConverterBuilder::new();
        assert_eq!(builder.config.candidate_sheets, CandidateSheetNames::default());
        assert_eq!(builder.config.layout, OutputLayout::Mirrored);
        assert_eq!(builder.config.line_ending, LineEnding::Native);
        assert!(builder.config.detect_collisions);
    }

    #[test]
    fn test_builder_method_chaining() {
        let converter = ConverterBuilder::new()
            .with_candidate_sheets(CandidateSheetNames::new(["a", "b"]))
            .with_layout(OutputLayout::Flattened)
            .with_line_ending(LineEnding::CrLf)
            .detect_collisions(false)
            .build()
            .unwrap();

        let config = converter.config();
        assert_eq!(config.candidate_sheets.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(config.layout, OutputLayout::Flattened);
        assert_eq!(config.line_ending, LineEnding::CrLf);
        assert!(!config.detect_collisions);
    }

    #[test]
    fn test_build_with_empty_candidate_list() {
        let result = ConverterBuilder::new()
            .with_candidate_sheets(CandidateSheetNames::new(Vec::<String>::new()))
            .build();
        assert!(matches!(result, Err(Form2TxtError::Config(_))));
    }

    #[test]
    fn test_build_with_empty_sheet_name() {
        let result = ConverterBuilder::new()
            .with_candidate_sheets(CandidateSheetNames::new(["事業の状況", ""]))
            .build();
        assert!(matches!(result, Err(Form2TxtError::Config(_))));
    }

    #[test]
    fn test_build_with_duplicate_sheet_name() {
        let result = ConverterBuilder::new()
            .with_candidate_sheets(CandidateSheetNames::new(["a", "b", "a"]))
            .build();
        match result {
            Err(Form2TxtError::Config(msg)) => assert!(msg.contains("'a'")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_sheets_concatenates_in_order() {
        let converter = ConverterBuilder::new()
            .with_line_ending(LineEnding::CrLf)
            .build()
            .unwrap();
        let sheets = vec![
            Sheet::new("first", vec![SheetRow::new().with_cell(0, SpreadsheetCell::text("one"))]),
            Sheet::new("empty", vec![SheetRow::new()]),
            Sheet::new("second", vec![SheetRow::new().with_cell(0, SpreadsheetCell::text("two"))]),
        ];

        let mut output = Vec::new();
        let lines = converter.write_sheets(&sheets, &mut output).unwrap();
        assert_eq!(lines, 2);
        assert_eq!(output, b"one\r\ntwo\r\n");
    }

    #[test]
    fn test_converter_convert_to_string_with_invalid_input() {
        let converter = ConverterBuilder::new().build().unwrap();
        let result = converter.convert_to_string(&b"not a workbook"[..]);
        assert!(matches!(result, Err(Form2TxtError::InvalidFormat { .. })));
    }
}
