//! Parser Module
//!
//! calamineを使用したExcelファイル解析の基礎実装。
//! セル値はcalamineから取得し、calamineが公開しない書式情報は
//! OOXML（XML）とBIFF（OLE2複合ドキュメント）を直接解析して補います。

mod biff;
mod compound;
mod metadata;
mod workbook;

pub(crate) use metadata::XlsxMetadataParser;
pub use workbook::Workbook;
