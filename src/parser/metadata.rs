//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得不可能な情報を抽出するモジュール。
//! セルの左罫線、数式の有無、シート名とワークシートXMLの対応を提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::Form2TxtError;
use crate::security::{validate_zip_path, SecurityConfig};
use crate::types::{CellStyleInfo, SheetStyles};

/// XLSXメタデータパーサー
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析します。
/// `xl/styles.xml`とシート対応表は生成時に解析し、ワークシートごとの
/// セル書式は要求されたシートだけを後から解析します。
pub(crate) struct XlsxMetadataParser<R: Read + Seek> {
    archive: ZipArchive<R>,
    /// cellXfsのインデックス -> 左罫線の有無
    xf_left_border: Vec<bool>,
    /// シート名 -> ワークシートXMLのパス
    sheet_paths: HashMap<String, String>,
}

impl<R: Read + Seek> XlsxMetadataParser<R> {
    /// XLSXファイル（ZIPアーカイブ）からメタデータを解析
    ///
    /// # 引数
    ///
    /// * `xlsx_reader` - XLSXファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxMetadataParser)` - メタデータの解析に成功した場合
    /// * `Err(Form2TxtError)` - 解析エラー、またはセキュリティ制限に違反した場合
    pub fn new(xlsx_reader: R) -> Result<Self, Form2TxtError> {
        let security_config = SecurityConfig::default();

        let mut archive =
            ZipArchive::new(xlsx_reader).map_err(|e| Form2TxtError::Zip(format!("{}", e)))?;

        // セキュリティチェック: ファイル数の上限
        if archive.len() > security_config.max_file_count {
            return Err(Form2TxtError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                security_config.max_file_count
            )));
        }

        // セキュリティチェック: 各ファイルのパス検証とサイズチェック
        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| Form2TxtError::Zip(format!("{}", e)))?;

            let file_name = file.name();
            validate_zip_path(file_name).map_err(|e| {
                Form2TxtError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > security_config.max_file_size {
                return Err(Form2TxtError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, security_config.max_file_size
                )));
            }

            total_decompressed_size =
                total_decompressed_size
                    .checked_add(file_size)
                    .ok_or_else(|| {
                        Form2TxtError::SecurityViolation(
                            "Total decompressed size calculation overflow".to_string(),
                        )
                    })?;

            if total_decompressed_size > security_config.max_decompressed_size {
                return Err(Form2TxtError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, security_config.max_decompressed_size
                )));
            }
        }

        // 1. xl/styles.xml を解析
        let xf_left_border = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => Vec::new(),
        };

        // 2. xl/workbook.xml とリレーションシップからシートの場所を解析
        let sheet_paths = match read_part(&mut archive, "xl/workbook.xml")? {
            Some(workbook_xml) => {
                let rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
                    Some(rels_xml) => parse_relationships(&rels_xml)?,
                    None => HashMap::new(),
                };
                resolve_sheet_paths(parse_workbook_sheets(&workbook_xml)?, &rels)
            }
            None => HashMap::new(),
        };

        Ok(Self {
            archive,
            xf_left_border,
            sheet_paths,
        })
    }

    /// シートのセル書式情報を取得
    ///
    /// シートが見つからない場合は空の書式情報を返します。
    pub fn sheet_styles(&mut self, sheet_name: &str) -> Result<SheetStyles, Form2TxtError> {
        let Some(path) = self.sheet_paths.get(sheet_name).cloned() else {
            return Ok(SheetStyles::default());
        };

        validate_zip_path(&path)
            .map_err(|e| Form2TxtError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;

        match read_part(&mut self.archive, &path)? {
            Some(xml) => parse_worksheet_xml(&xml, &self.xf_left_border),
            None => Ok(SheetStyles::default()),
        }
    }
}

/// ZIPアーカイブ内のファイルを読み込む（存在しない場合は`None`）
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, Form2TxtError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Form2TxtError::Zip(format!("{}", e))),
    };

    let mut xml_content = Vec::new();
    file.read_to_end(&mut xml_content)?;
    Ok(Some(xml_content))
}

fn xml_error(e: quick_xml::Error) -> Form2TxtError {
    Form2TxtError::Xml(format!("{}", e))
}

/// 要素の属性値を名前空間接頭辞を無視して取得する
fn attribute<B>(
    reader: &Reader<B>,
    e: &BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>, Form2TxtError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Form2TxtError::Xml(format!("XML attribute error: {}", e)))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.decode_and_unescape_value(reader).map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// xl/styles.xml の解析
///
/// `<borders>`から左罫線の有無を、`<cellXfs>`から各スタイルの`borderId`を読み、
/// cellXfsのインデックスごとの左罫線フラグを返します。
pub(crate) fn parse_styles(xml: &[u8]) -> Result<Vec<bool>, Form2TxtError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut border_left: Vec<bool> = Vec::new();
    let mut xf_border_ids: Vec<usize> = Vec::new();
    let mut in_borders = false;
    let mut in_border = false;
    let mut in_cell_xfs = false;
    let mut current_left = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"borders" if !is_empty => in_borders = true,
                    b"border" if in_borders => {
                        if is_empty {
                            border_left.push(false);
                        } else {
                            in_border = true;
                            current_left = false;
                        }
                    }
                    // <left style="thin">（新しい書式では<start>）
                    b"left" | b"start" if in_border => {
                        if let Some(style) = attribute(&reader, e, b"style")? {
                            current_left = style != "none";
                        }
                    }
                    b"cellXfs" if !is_empty => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        let border_id = match attribute(&reader, e, b"borderId")? {
                            Some(id) => id.parse::<usize>()?,
                            None => 0,
                        };
                        xf_border_ids.push(border_id);
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"borders" => in_borders = false,
                b"border" if in_border => {
                    border_left.push(current_left);
                    in_border = false;
                }
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_border_ids
        .into_iter()
        .map(|id| border_left.get(id).copied().unwrap_or(false))
        .collect())
}

/// xl/workbook.xml からシート名とリレーションシップIDを順に取得する
fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, Option<String>)>, Form2TxtError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                // <sheet name="事業の状況" sheetId="1" r:id="rId1"/>
                if let Some(name) = attribute(&reader, e, b"name")? {
                    sheets.push((name, attribute(&reader, e, b"id")?));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, Form2TxtError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (attribute(&reader, e, b"Id")?, attribute(&reader, e, b"Target")?)
                {
                    relationships.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// シート名 -> ワークシートXMLのパスを組み立てる
///
/// リレーションシップが欠けている場合は`xl/worksheets/sheet{n}.xml`と推測します。
fn resolve_sheet_paths(
    sheets: Vec<(String, Option<String>)>,
    rels: &HashMap<String, String>,
) -> HashMap<String, String> {
    sheets
        .into_iter()
        .enumerate()
        .map(|(index, (name, rel_id))| {
            let path = match rel_id.and_then(|id| rels.get(&id)) {
                Some(target) => match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target.trim_start_matches("./")),
                },
                None => format!("xl/worksheets/sheet{}.xml", index + 1),
            };
            (name, path)
        })
        .collect()
}

/// ワークシートXMLからセルごとのスタイルと数式の有無を解析
pub(crate) fn parse_worksheet_xml(
    xml: &[u8],
    xf_left_border: &[bool],
) -> Result<SheetStyles, Form2TxtError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut styles = SheetStyles::default();
    let mut current_row: u32 = 0;
    let mut next_row: u32 = 0;
    let mut next_col: u32 = 0;
    // 解析中のセル: (行, 列, スタイルID, 数式か)
    let mut pending: Option<(u32, u32, usize, bool)> = None;

    let left_border_of =
        |style_id: usize| -> bool { xf_left_border.get(style_id).copied().unwrap_or(false) };

    loop {
        let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"row" => {
                        // <row r="15">（Excelの行番号は1始まり）
                        current_row = match attribute(&reader, e, b"r")? {
                            Some(r) => r.parse::<u32>()?.saturating_sub(1),
                            None => next_row,
                        };
                        next_row = current_row.saturating_add(1);
                        next_col = 0;
                    }
                    b"c" => {
                        // <c r="A1" s="3" t="s">
                        let (row, col) = match attribute(&reader, e, b"r")? {
                            Some(r) => parse_cell_ref(&r).unwrap_or((current_row, next_col)),
                            None => (current_row, next_col),
                        };
                        let style_id = match attribute(&reader, e, b"s")? {
                            Some(s) => s.parse::<usize>()?,
                            None => 0,
                        };
                        // t="str"は数式の結果文字列
                        let formula = attribute(&reader, e, b"t")?.as_deref() == Some("str");
                        next_col = col.saturating_add(1);

                        if is_empty {
                            styles.insert(
                                row,
                                col,
                                CellStyleInfo {
                                    left_border: left_border_of(style_id),
                                    formula,
                                },
                            );
                        } else {
                            pending = Some((row, col, style_id, formula));
                        }
                    }
                    b"f" => {
                        if let Some(cell) = pending.as_mut() {
                            cell.3 = true;
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"c" => {
                if let Some((row, col, style_id, formula)) = pending.take() {
                    styles.insert(
                        row,
                        col,
                        CellStyleInfo {
                            left_border: left_border_of(style_id),
                            formula,
                        },
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// セル参照文字列を座標に変換（例: "A1" -> (0, 0)）
fn parse_cell_ref(ref_str: &str) -> Option<(u32, u32)> {
    let split = ref_str.find(|ch: char| ch.is_ascii_digit())?;
    let (col_str, row_str) = ref_str.split_at(split);
    if col_str.is_empty() {
        return None;
    }

    // 列を数値に変換（A=0, B=1, ..., Z=25, AA=26, ...）
    let mut col: u32 = 0;
    for ch in col_str.chars() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add(ch as u32 - 'A' as u32 + 1)?;
    }

    // 行を数値に変換（1始まりなので0始まりに変換）
    let row = row_str.parse::<u32>().ok()?.checked_sub(1)?;

    Some((row, col - 1))
}
