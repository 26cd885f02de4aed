//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! シート・行・セルはブックから読み取った不変のスナップショットです。

use std::collections::BTreeMap;
use std::path::PathBuf;

/// セルの型タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// 文字列セル
    String,

    /// 数値セル（日付を含む）
    Number,

    /// 論理値、エラー値、空セル、数式セルなど
    Other,
}

/// セルのスナップショット
///
/// 値、型タグ、左罫線の有無だけを保持します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetCell {
    value: Option<String>,
    kind: CellKind,
    left_border: bool,
}

impl SpreadsheetCell {
    /// 新しいセルを生成
    pub fn new(value: Option<String>, kind: CellKind, left_border: bool) -> Self {
        Self {
            value,
            kind,
            left_border,
        }
    }

    /// 罫線のない文字列セルを生成
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(Some(value.into()), CellKind::String, false)
    }

    /// 左罫線を設定したコピーを返す
    pub fn with_left_border(mut self, left_border: bool) -> Self {
        self.left_border = left_border;
        self
    }

    /// セルの値
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// セルの型タグ
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// 左罫線が引かれているかどうか
    pub fn has_left_border(&self) -> bool {
        self.left_border
    }
}

/// シートの1行
///
/// セルは列インデックスの昇順に疎に保持します。
/// セルが1つもない行は空行として扱われます。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    cells: Vec<(u32, SpreadsheetCell)>,
}

impl SheetRow {
    /// 空行を生成
    pub fn new() -> Self {
        Self::default()
    }

    /// セルを追加した行を返す（同じ列のセルは置き換え）
    pub fn with_cell(mut self, col: u32, cell: SpreadsheetCell) -> Self {
        self.insert(col, cell);
        self
    }

    pub(crate) fn insert(&mut self, col: u32, cell: SpreadsheetCell) {
        match self.cells.binary_search_by_key(&col, |(c, _)| *c) {
            Ok(pos) => self.cells[pos].1 = cell,
            Err(pos) => self.cells.insert(pos, (col, cell)),
        }
    }

    /// 指定した列のセル（存在しない場合は`None`）
    pub fn cell(&self, col: u32) -> Option<&SpreadsheetCell> {
        self.cells
            .binary_search_by_key(&col, |(c, _)| *c)
            .ok()
            .map(|pos| &self.cells[pos].1)
    }

    /// 最初にセルが存在する列（空行の場合は`None`）
    pub fn first_cell_index(&self) -> Option<u32> {
        self.cells.first().map(|(c, _)| *c)
    }

    /// セルが1つもないかどうか
    pub fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }
}

/// 名前付きのシート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    name: String,
    rows: Vec<SheetRow>,
}

impl Sheet {
    /// 新しいシートを生成
    pub fn new(name: impl Into<String>, rows: Vec<SheetRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// シート名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 行（シート上の順序）
    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }
}

/// 入力ファイルと出力ファイルの組
///
/// ツリー走査で生成され、ドキュメント変換で1回だけ消費されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    /// 入力Excelファイル
    pub input: PathBuf,
    /// 出力テキストファイル
    pub output: PathBuf,
}

/// calamineが公開しないセル単位の書式情報
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CellStyleInfo {
    /// 左罫線が引かれているか
    pub left_border: bool,
    /// 数式セルか
    pub formula: bool,
}

/// シート1枚分のセル書式情報（0始まりの(行, 列) -> 書式）
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetStyles {
    cells: BTreeMap<(u32, u32), CellStyleInfo>,
}

impl SheetStyles {
    pub fn insert(&mut self, row: u32, col: u32, info: CellStyleInfo) {
        self.cells.insert((row, col), info);
    }

    pub fn get(&self, row: u32, col: u32) -> Option<CellStyleInfo> {
        self.cells.get(&(row, col)).copied()
    }

    /// 指定した行に書式付きセルが存在する列（昇順）
    pub fn columns_in_row(&self, row: u32) -> Vec<u32> {
        self.cells
            .range((row, 0)..=(row, u32::MAX))
            .map(|((_, c), _)| *c)
            .collect()
    }

    /// 書式付きセルが存在する最初と最後の行
    pub fn row_bounds(&self) -> Option<(u32, u32)> {
        let first = self.cells.keys().next()?.0;
        let last = self.cells.keys().next_back()?.0;
        Some((first, last))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}
