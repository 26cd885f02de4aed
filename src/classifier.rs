//! Cell Classifier Module
//!
//! セルの内容を出力すべきかどうかを判定するモジュール。
//! 本文は罫線のない文字列セルとしてA列に書かれ、表は同じ列に罫線付きで
//! 書かれるため、左罫線の有無で本文と表を区別します。

use crate::types::{CellKind, SpreadsheetCell};

/// 出力すべきセルかどうかを判定する
///
/// 以下をすべて満たす場合に`true`を返します。
///
/// 1. セルが存在する
/// 2. 文字列セルである（数値・数式・空セルは出力しない）
/// 3. 左罫線が引かれていない
/// 4. 値が存在する
pub fn is_printable(cell: Option<&SpreadsheetCell>) -> bool {
    let Some(cell) = cell else {
        return false;
    };

    // 文字列ではないセルは出力しない
    if cell.kind() != CellKind::String {
        return false;
    }

    // 罫線が引かれているセルは出力しない
    if cell.has_left_border() {
        return false;
    }

    cell.value().is_some()
}
