//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;
use thiserror::Error;

/// form2txtクレート全体で使用するエラー型
///
/// Excelファイルの読み込み、解析、テキスト出力、ディレクトリ走査中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io`: ファイルの読み書きやディレクトリ作成の失敗
/// - `EncryptedDocument`: パスワードで保護されたブック
/// - `InvalidFormat`: 破損した、またはサポートされていない形式のブック
/// - `Config`: 設定の検証に失敗したエラー
/// - `OutputCollision`: 同じ出力ファイルを2回生成しようとした
///
/// 対象シートが見つからないことはエラーではなく、
/// [`ConversionOutcome::SheetNotFound`](crate::ConversionOutcome::SheetNotFound)
/// として報告されます。
///
/// # 使用例
///
/// ```rust,no_run
/// use form2txt::{ConverterBuilder, Form2TxtError};
/// use std::path::Path;
///
/// let converter = ConverterBuilder::new().build().unwrap();
/// match converter.convert_file(Path::new("report.xls"), Path::new("report.txt")) {
///     Err(Form2TxtError::EncryptedDocument { path }) => {
///         eprintln!("パスワードが掛かっています: {}", path.display());
///     }
///     Err(e) => eprintln!("{}", e),
///     Ok(_) => {}
/// }
/// ```
#[derive(Error, Debug)]
pub enum Form2TxtError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// パスワードで保護されたブック
    ///
    /// 復号は行いません。バッチ全体を中断する致命的なエラーです。
    #[error("Encrypted document: {}", path.display())]
    EncryptedDocument {
        /// 対象のExcelファイル
        path: PathBuf,
    },

    /// 破損した、または認識できない形式のブック
    #[error("Invalid spreadsheet format in {}: {message}", path.display())]
    InvalidFormat {
        /// 対象のExcelファイル
        path: PathBuf,
        /// 詳細メッセージ
        message: String,
    },

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。例えば、候補シート名のリストが空の場合などです。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// 出力ファイル名の衝突
    ///
    /// フラット出力で、異なる階層にある同名ディレクトリ配下の同名ファイルが
    /// 同じ出力ファイル名になった場合に発生します。
    #[error("Output file collision: {} would be written twice", path.display())]
    OutputCollision {
        /// 衝突した出力ファイル
        path: PathBuf,
    },
}

impl Form2TxtError {
    /// コンテナ解析中の内部エラーを、ファイルパス付きの`InvalidFormat`に畳み込む
    ///
    /// `Io`、`EncryptedDocument`、`SecurityViolation`などはそのまま返します。
    pub(crate) fn into_document_error(self, path: &std::path::Path) -> Self {
        match self {
            Form2TxtError::Zip(message) | Form2TxtError::Xml(message) => {
                Form2TxtError::InvalidFormat {
                    path: path.to_path_buf(),
                    message,
                }
            }
            Form2TxtError::ParseInt(e) => Form2TxtError::InvalidFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            other => other,
        }
    }

    /// calamineのエラーを分類する
    ///
    /// パスワード保護は`EncryptedDocument`、I/Oは`Io`、それ以外は`InvalidFormat`になります。
    pub(crate) fn from_calamine(error: calamine::Error, path: &std::path::Path) -> Self {
        match error {
            calamine::Error::Io(e) => Form2TxtError::Io(e),
            calamine::Error::Xls(calamine::XlsError::Password) => {
                Form2TxtError::EncryptedDocument {
                    path: path.to_path_buf(),
                }
            }
            calamine::Error::Xls(calamine::XlsError::Io(e)) => Form2TxtError::Io(e),
            calamine::Error::Xlsx(calamine::XlsxError::Io(e)) => Form2TxtError::Io(e),
            other => Form2TxtError::InvalidFormat {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        }
    }
}
