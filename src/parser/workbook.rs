//! Workbook Module
//!
//! calamineのラッパーとして、ブックを開いてシートを読み取るモジュール。
//! セルの値はcalamineから、左罫線と数式の有無はコンテナを直接解析して取得し、
//! 1枚のシートを不変の[`Sheet`]スナップショットにまとめます。

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, Sheets, Xls, Xlsx};

use crate::error::Form2TxtError;
use crate::parser::biff::BiffStyleTable;
use crate::parser::compound::{is_compound_file, CompoundFile};
use crate::parser::XlsxMetadataParser;
use crate::security::SecurityConfig;
use crate::types::{CellKind, CellStyleInfo, Sheet, SheetRow, SheetStyles, SpreadsheetCell};

/// ZIPローカルファイルヘッダーのシグネチャ
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// 暗号化されたOOXMLを格納するOLE2ストリーム
const ENCRYPTION_STREAMS: [&str; 2] = ["EncryptedPackage", "EncryptionInfo"];

/// BIFF8とBIFF5のワークブックストリーム名
const WORKBOOK_STREAMS: [&str; 2] = ["Workbook", "Book"];

/// calamineが公開しない書式情報の取得元
enum StyleSource {
    Xlsx(XlsxMetadataParser<Cursor<Vec<u8>>>),
    Xls(BiffStyleTable),
}

/// 開いたExcelブック
///
/// `.xlsx`（OOXML）と`.xls`（BIFF5/BIFF8）の両方を扱います。
/// 形式は拡張子ではなくファイル先頭のシグネチャで判定します。
///
/// # 使用例
///
/// ```rust,no_run
/// use form2txt::Workbook;
///
/// let mut workbook = Workbook::open("report.xlsx")?;
/// if let Some(sheet) = workbook.sheet("事業の状況")? {
///     println!("{} rows", sheet.rows().len());
/// }
/// # Ok::<(), form2txt::Form2TxtError>(())
/// ```
pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<Cursor<Vec<u8>>>,
    styles: StyleSource,
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("path", &self.path)
            .field("sheet_names", &self.sheets.sheet_names())
            .finish()
    }
}

impl Workbook {
    /// ファイルパスからブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(Workbook)` - ブックを開けた場合
    /// * `Err(Form2TxtError::Io)` - ファイルを読めなかった場合
    /// * `Err(Form2TxtError::EncryptedDocument)` - パスワードで保護されている場合
    /// * `Err(Form2TxtError::InvalidFormat)` - 破損している、または対応していない形式の場合
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Form2TxtError> {
        let path = path.as_ref();

        // セキュリティチェック: 入力ファイルサイズの上限
        let size = fs::metadata(path)?.len();
        SecurityConfig::default().check_input_size(size)?;

        let buffer = fs::read(path)?;
        Self::from_bytes(buffer, path)
    }

    /// 任意のリーダーからブックを開く
    ///
    /// `source`はエラーとログに表示する名前としてのみ使用します。
    pub fn from_reader<R: Read>(reader: R, source: impl AsRef<Path>) -> Result<Self, Form2TxtError> {
        let security_config = SecurityConfig::default();

        // 上限を1バイト超えるまで読めば超過を検出できる
        let mut buffer = Vec::new();
        reader
            .take(security_config.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;
        security_config.check_input_size(buffer.len() as u64)?;

        Self::from_bytes(buffer, source.as_ref())
    }

    fn from_bytes(buffer: Vec<u8>, path: &Path) -> Result<Self, Form2TxtError> {
        let invalid = |message: String| Form2TxtError::InvalidFormat {
            path: path.to_path_buf(),
            message,
        };

        if buffer.starts_with(&ZIP_MAGIC) {
            let metadata = XlsxMetadataParser::new(Cursor::new(buffer.clone()))
                .map_err(|e| e.into_document_error(path))?;
            let workbook = Xlsx::new(Cursor::new(buffer))
                .map_err(|e| Form2TxtError::from_calamine(calamine::Error::Xlsx(e), path))?;

            return Ok(Self {
                path: path.to_path_buf(),
                sheets: Sheets::Xlsx(workbook),
                styles: StyleSource::Xlsx(metadata),
            });
        }

        if is_compound_file(&buffer) {
            let table = {
                let compound = CompoundFile::parse(&buffer).map_err(invalid)?;

                if ENCRYPTION_STREAMS.iter().any(|name| compound.has_stream(name)) {
                    return Err(Form2TxtError::EncryptedDocument {
                        path: path.to_path_buf(),
                    });
                }

                let mut stream = None;
                for name in WORKBOOK_STREAMS {
                    stream = compound.read_stream(name).map_err(invalid)?;
                    if stream.is_some() {
                        break;
                    }
                }
                let stream = stream
                    .ok_or_else(|| invalid("No Workbook stream in compound file".to_string()))?;
                BiffStyleTable::scan(&stream)
            };

            if table.encrypted {
                return Err(Form2TxtError::EncryptedDocument {
                    path: path.to_path_buf(),
                });
            }
            tracing::debug!(
                path = %path.display(),
                sheets = table.sheet_count(),
                "scanned BIFF workbook stream"
            );

            let workbook = Xls::new(Cursor::new(buffer))
                .map_err(|e| Form2TxtError::from_calamine(calamine::Error::Xls(e), path))?;

            return Ok(Self {
                path: path.to_path_buf(),
                sheets: Sheets::Xls(workbook),
                styles: StyleSource::Xls(table),
            });
        }

        Err(invalid(
            "Unrecognized file signature (neither OOXML nor BIFF)".to_string(),
        ))
    }

    /// ブックのパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// シート名（ブック内の順序）
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    /// 名前でシートを読み取る
    ///
    /// 名前は完全一致で比較します。存在しない場合は`Ok(None)`を返します。
    pub fn sheet(&mut self, name: &str) -> Result<Option<Sheet>, Form2TxtError> {
        let names = self.sheets.sheet_names();
        let Some(index) = names.iter().position(|n| n == name) else {
            return Ok(None);
        };
        self.load_sheet(index, name).map(Some)
    }

    /// インデックス（0始まり）でシートを読み取る
    pub fn sheet_at(&mut self, index: usize) -> Result<Option<Sheet>, Form2TxtError> {
        let Some(name) = self.sheets.sheet_names().get(index).cloned() else {
            return Ok(None);
        };
        self.load_sheet(index, &name).map(Some)
    }

    fn load_sheet(&mut self, index: usize, name: &str) -> Result<Sheet, Form2TxtError> {
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| Form2TxtError::from_calamine(e, &self.path))?;

        let styles = match &mut self.styles {
            StyleSource::Xlsx(metadata) => metadata
                .sheet_styles(name)
                .map_err(|e| e.into_document_error(&self.path))?,
            StyleSource::Xls(table) => table.sheet(index),
        };

        tracing::debug!(
            path = %self.path.display(),
            sheet = name,
            styled_cells = styles.len(),
            "loaded sheet"
        );

        Ok(Sheet::new(name, build_rows(&range, &styles)))
    }
}

/// セル値と書式情報から行を組み立てる
///
/// 値を持つセル、または書式付きのセル要素が存在するセルだけを行に含めます。
pub(crate) fn build_rows(range: &Range<Data>, styles: &SheetStyles) -> Vec<SheetRow> {
    let data_bounds = range.start().zip(range.end());
    let (first, last) = match (data_bounds, styles.row_bounds()) {
        (Some(((r0, _), (r1, _))), Some((s0, s1))) => (r0.min(s0), r1.max(s1)),
        (Some(((r0, _), (r1, _))), None) => (r0, r1),
        (None, Some(bounds)) => bounds,
        (None, None) => return Vec::new(),
    };

    (first..=last)
        .map(|row| {
            let mut columns = styles.columns_in_row(row);
            if let Some(((r0, c0), (r1, c1))) = data_bounds {
                if (r0..=r1).contains(&row) {
                    columns.extend((c0..=c1).filter(|&col| has_value(range.get_value((row, col)))));
                }
            }
            columns.sort_unstable();
            columns.dedup();

            let mut sheet_row = SheetRow::new();
            for col in columns {
                let data = range.get_value((row, col)).filter(|d| !matches!(d, Data::Empty));
                let style = styles.get(row, col).unwrap_or_default();
                sheet_row.insert(col, to_cell(data, style));
            }
            sheet_row
        })
        .collect()
}

fn has_value(data: Option<&Data>) -> bool {
    !matches!(data, None | Some(Data::Empty))
}

/// calamineの値をセルのスナップショットに変換
fn to_cell(data: Option<&Data>, style: CellStyleInfo) -> SpreadsheetCell {
    let kind = match data {
        // 数式セルは結果の型にかかわらずOTHER
        _ if style.formula => CellKind::Other,
        Some(Data::String(_)) => CellKind::String,
        Some(Data::Int(_)) | Some(Data::Float(_)) | Some(Data::DateTime(_)) => CellKind::Number,
        _ => CellKind::Other,
    };
    let value = data.map(|d| d.to_string());
    SpreadsheetCell::new(value, kind, style.left_border)
}
