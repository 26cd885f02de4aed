//! BIFF Style Scanner
//!
//! `.xls`の`Workbook`ストリーム（BIFF5/BIFF8）をレコード単位で走査し、
//! calamineが公開しないセルの左罫線と数式の有無を取り出すモジュール。

use crate::types::{CellStyleInfo, SheetStyles};

const RECORD_BOF: u16 = 0x0809;
const RECORD_EOF: u16 = 0x000A;
const RECORD_FILEPASS: u16 = 0x002F;
const RECORD_BOUNDSHEET: u16 = 0x0085;
const RECORD_XF: u16 = 0x00E0;

const RECORD_FORMULA: u16 = 0x0006;
const RECORD_MULRK: u16 = 0x00BD;
const RECORD_MULBLANK: u16 = 0x00BE;
/// 行・列・XFインデックスを先頭6バイトに持つセルレコード
const SIMPLE_CELL_RECORDS: [u16; 7] = [
    0x00FD, // LABELSST
    0x0204, // LABEL
    0x00D6, // RSTRING
    0x0203, // NUMBER
    0x027E, // RK
    0x0201, // BLANK
    0x0205, // BOOLERR
];

const BIFF8: u16 = 0x0600;

struct Record<'a> {
    kind: u16,
    data: &'a [u8],
}

/// `offset`から順にレコードを読むイテレータ（途中で切れたレコードで停止）
struct Records<'a> {
    stream: &'a [u8],
    offset: usize,
}

impl<'a> Records<'a> {
    fn at(stream: &'a [u8], offset: usize) -> Self {
        Self { stream, offset }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        let header = self.stream.get(self.offset..self.offset + 4)?;
        let kind = u16::from_le_bytes([header[0], header[1]]);
        let len = u16::from_le_bytes([header[2], header[3]]) as usize;
        let start = self.offset + 4;
        let data = self.stream.get(start..start + len)?;
        self.offset = start + len;
        Some(Record { kind, data })
    }
}

fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// ブック全体の書式情報
///
/// シートはBOUNDSHEETレコードの順序（calamineの`sheet_names()`と同じ順序）で保持します。
#[derive(Debug, Default)]
pub(crate) struct BiffStyleTable {
    /// FILEPASSレコードがあった（暗号化されている）
    pub encrypted: bool,
    sheets: Vec<SheetStyles>,
}

impl BiffStyleTable {
    /// `Workbook`ストリームを走査する
    pub fn scan(stream: &[u8]) -> Self {
        let mut table = BiffStyleTable::default();
        let mut version = BIFF8;
        let mut xf_left_border: Vec<bool> = Vec::new();
        let mut sheet_offsets: Vec<usize> = Vec::new();

        // グローバルサブストリーム
        for record in Records::at(stream, 0) {
            match record.kind {
                RECORD_BOF => {
                    if let Some(v) = u16_at(record.data, 0) {
                        version = v;
                    }
                }
                RECORD_FILEPASS => {
                    // 以降のレコード本体は暗号化されている
                    table.encrypted = true;
                    return table;
                }
                RECORD_XF => xf_left_border.push(xf_has_left_border(record.data, version)),
                RECORD_BOUNDSHEET => {
                    if let Some(pos) = u32_at(record.data, 0) {
                        sheet_offsets.push(pos as usize);
                    }
                }
                RECORD_EOF => break,
                _ => {}
            }
        }

        table.sheets = sheet_offsets
            .into_iter()
            .map(|offset| scan_sheet(stream, offset, &xf_left_border))
            .collect();
        table
    }

    /// BOUNDSHEET順のインデックスでシートの書式情報を取得する
    pub fn sheet(&self, index: usize) -> SheetStyles {
        self.sheets.get(index).cloned().unwrap_or_default()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }
}

/// XFレコードの左罫線スタイルが「なし」以外かどうか
fn xf_has_left_border(data: &[u8], version: u16) -> bool {
    if version >= BIFF8 {
        data.get(10).map(|b| b & 0x0F != 0).unwrap_or(false)
    } else {
        u32_at(data, 12)
            .map(|border| (border >> 3) & 0x07 != 0)
            .unwrap_or(false)
    }
}

/// シートのサブストリームを走査する（埋め込みチャートは読み飛ばす）
fn scan_sheet(stream: &[u8], offset: usize, xf_left_border: &[bool]) -> SheetStyles {
    let mut styles = SheetStyles::default();
    let mut depth = 0usize;

    let style = |ixfe: u16, formula: bool| CellStyleInfo {
        left_border: xf_left_border
            .get(ixfe as usize)
            .copied()
            .unwrap_or(false),
        formula,
    };

    for record in Records::at(stream, offset) {
        match record.kind {
            RECORD_BOF => depth += 1,
            RECORD_EOF => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            _ if depth != 1 => {}
            RECORD_FORMULA => {
                if let (Some(row), Some(col), Some(ixfe)) = (
                    u16_at(record.data, 0),
                    u16_at(record.data, 2),
                    u16_at(record.data, 4),
                ) {
                    styles.insert(row.into(), col.into(), style(ixfe, true));
                }
            }
            kind if SIMPLE_CELL_RECORDS.contains(&kind) => {
                if let (Some(row), Some(col), Some(ixfe)) = (
                    u16_at(record.data, 0),
                    u16_at(record.data, 2),
                    u16_at(record.data, 4),
                ) {
                    styles.insert(row.into(), col.into(), style(ixfe, false));
                }
            }
            RECORD_MULRK | RECORD_MULBLANK => {
                // row, colFirst, (ixfe[, rk])*, colLast
                let stride = if record.kind == RECORD_MULRK { 6 } else { 2 };
                let (Some(row), Some(col_first)) =
                    (u16_at(record.data, 0), u16_at(record.data, 2))
                else {
                    continue;
                };
                let count = record.data.len().saturating_sub(6) / stride;
                for i in 0..count {
                    if let Some(ixfe) = u16_at(record.data, 4 + i * stride) {
                        let col = u32::from(col_first) + i as u32;
                        styles.insert(row.into(), col, style(ixfe, false));
                    }
                }
            }
            _ => {}
        }
    }

    styles
}
