//! Public API Types
//!
//! 公開APIで使用する設定値と結果型を定義するモジュール。

/// 既定の候補シート名（有価証券報告書「事業の状況」の各節）
const DEFAULT_SHEET_NAMES: [&str; 6] = [
    "事業の状況",
    "業績等の概要",
    "生産、受注及び販売の状況",
    "対処すべき課題",
    "経営上の重要な契約等",
    "研究開発活動",
];

/// 抽出対象のシート名リスト
///
/// 順序は出力の連結順を表します。1つのブックに複数の候補シートがある場合、
/// ブック内の物理的な順序ではなく、このリストの順序で出力されます。
/// 生成後は変更できません。
///
/// # 使用例
///
/// ```rust
/// use form2txt::CandidateSheetNames;
///
/// let names = CandidateSheetNames::new(["business overview", "issues to address"]);
/// assert_eq!(names.len(), 2);
/// assert_eq!(names.iter().next(), Some("business overview"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSheetNames {
    names: Vec<String>,
}

impl CandidateSheetNames {
    /// 任意のシート名リストから生成する
    ///
    /// 検証は`ConverterBuilder::build()`時に行われます。
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// シート名をリスト順に返す
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for CandidateSheetNames {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET_NAMES)
    }
}

/// 出力ディレクトリのレイアウト
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum OutputLayout {
    /// 入力ディレクトリの階層をそのまま再現する（デフォルト）
    ///
    /// `input/A/report.xlsx` → `out/A/report.txt`
    #[default]
    Mirrored,

    /// すべてのテキストファイルを出力ディレクトリ直下に出力する
    ///
    /// ファイル名の先頭に直接の親ディレクトリ名を付けます。
    /// `input/A/report.xlsx` → `out/A_report.txt`
    ///
    /// 異なる階層に同名のディレクトリがあると出力ファイル名が衝突します。
    Flattened,
}

/// 出力テキストの改行コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum LineEnding {
    /// 実行環境の既定（WindowsはCRLF、それ以外はLF）
    #[default]
    Native,

    /// LF (`\n`)
    Lf,

    /// CRLF (`\r\n`)
    CrLf,
}

impl LineEnding {
    /// 改行文字列
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Native => {
                if cfg!(windows) {
                    "\r\n"
                } else {
                    "\n"
                }
            }
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// 1ファイル分の変換結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// テキストファイルを出力した
    Converted {
        /// 出力したシート名（候補リスト順）
        sheets: Vec<String>,
        /// 出力した行数
        lines: usize,
    },

    /// 候補シートが1つも存在しなかった（出力ファイルは作成しない）
    SheetNotFound,
}

/// ディレクトリ一括変換の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSummary {
    /// テキストファイルを出力したExcelファイル数
    pub converted: usize,
    /// 候補シートがなくスキップしたExcelファイル数
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidate_names_order() {
        let names = CandidateSheetNames::default();
        assert_eq!(names.len(), 6);
        let collected: Vec<&str> = names.iter().collect();
        assert_eq!(collected[0], "事業の状況");
        assert_eq!(collected[5], "研究開発活動");
    }

    #[test]
    fn test_custom_candidate_names() {
        let names = CandidateSheetNames::new(vec!["a".to_string(), "b".to_string()]);
        assert!(!names.is_empty());
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_line_ending_strings() {
        assert_eq!(LineEnding::Lf.as_str(), "\n");
        assert_eq!(LineEnding::CrLf.as_str(), "\r\n");
        if cfg!(windows) {
            assert_eq!(LineEnding::Native.as_str(), "\r\n");
        } else {
            assert_eq!(LineEnding::Native.as_str(), "\n");
        }
    }

    #[test]
    fn test_default_layout_is_mirrored() {
        assert_eq!(OutputLayout::default(), OutputLayout::Mirrored);
    }
}
