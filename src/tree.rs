//! Tree Converter Module
//!
//! 入力ディレクトリを深さ優先で走査し、見つかったExcelファイルを
//! 1つずつテキストファイルに変換するモジュール。

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::api::{ConversionOutcome, OutputLayout, TreeSummary};
use crate::builder::Converter;
use crate::error::Form2TxtError;
use crate::types::ConversionTask;

/// 変換対象とみなす拡張子（大文字小文字を区別する）
const SPREADSHEET_EXTENSIONS: [&str; 2] = [".xls", ".xlsx"];

/// 出力ファイルの拡張子
const TEXT_EXTENSION: &str = ".txt";

/// ファイル名が変換対象のExcelファイルかどうか
///
/// # 使用例
///
/// ```rust
/// use form2txt::is_spreadsheet_name;
///
/// assert!(is_spreadsheet_name("report.xlsx"));
/// assert!(is_spreadsheet_name("report.xls"));
/// assert!(!is_spreadsheet_name("report.XLS"));
/// assert!(!is_spreadsheet_name("archive.zip"));
/// ```
pub fn is_spreadsheet_name(name: &str) -> bool {
    SPREADSHEET_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// 走査で辿るエントリかどうか（ディレクトリ、またはExcelファイル）
pub fn accept_entry(path: &Path) -> bool {
    if path.is_dir() {
        return true;
    }
    path.file_name()
        .map(|name| is_spreadsheet_name(&name.to_string_lossy()))
        .unwrap_or(false)
}

/// 出力ファイル名を生成する
///
/// 末尾の`.xls`/`.xlsx`を`.txt`に置き換えます。フラット出力では、
/// 直接の親ディレクトリ名と`_`を先頭に付けます。
///
/// # 使用例
///
/// ```rust
/// use form2txt::{output_file_name, OutputLayout};
///
/// assert_eq!(output_file_name("A", "report.xlsx", OutputLayout::Mirrored), "report.txt");
/// assert_eq!(output_file_name("A", "report.xlsx", OutputLayout::Flattened), "A_report.txt");
/// ```
pub fn output_file_name(parent_dir_name: &str, file_name: &str, layout: OutputLayout) -> String {
    let stem = SPREADSHEET_EXTENSIONS
        .iter()
        .rev()
        .find_map(|ext| file_name.strip_suffix(ext));
    let text_name = match stem {
        Some(stem) => format!("{}{}", stem, TEXT_EXTENSION),
        None => file_name.to_string(),
    };

    match layout {
        OutputLayout::Mirrored => text_name,
        OutputLayout::Flattened => format!("{}_{}", parent_dir_name, text_name),
    }
}

/// ディレクトリの名前（`.`などの場合は正規化したパスから取得）
fn dir_name(dir: &Path) -> String {
    if let Some(name) = dir.file_name() {
        return name.to_string_lossy().into_owned();
    }
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

/// 既に存在するディレクトリはエラーにしない
fn create_dir_idempotent(dir: &Path) -> io::Result<()> {
    match fs::create_dir(dir) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        other => other,
    }
}

/// 直下の対象エントリをファイル名のバイト順で返す
fn list_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if accept_entry(&path) {
            entries.push(path);
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

/// 1回の一括変換で共有する状態
#[derive(Debug, Default)]
struct TreeRun {
    summary: TreeSummary,
    /// この実行で書き出した出力ファイル
    written: HashSet<PathBuf>,
    /// 入力ツリーの中に出力先がある場合、走査から外すためのパス
    output_root: Option<PathBuf>,
}

impl TreeRun {
    fn is_output_root(&self, dir: &Path) -> bool {
        match &self.output_root {
            Some(root) => dir.canonicalize().is_ok_and(|d| &d == root),
            None => false,
        }
    }
}

/// ディレクトリの一括変換
///
/// [`Converter::tree`]で生成します。最初のエラーで走査全体を中断し、
/// それまでの途中結果は返しません。
///
/// # 使用例
///
/// ```rust,no_run
/// use form2txt::{ConverterBuilder, OutputLayout};
/// use std::path::Path;
///
/// # fn main() -> Result<(), form2txt::Form2TxtError> {
/// let converter = ConverterBuilder::new()
///     .with_layout(OutputLayout::Flattened)
///     .build()?;
/// let summary = converter.tree().convert_all(Path::new("input"), Path::new("out"))?;
/// println!("{} converted, {} skipped", summary.converted, summary.skipped);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TreeConverter {
    converter: Converter,
}

impl TreeConverter {
    pub(crate) fn new(converter: Converter) -> Self {
        Self { converter }
    }

    /// `input_dir`配下のExcelファイルをすべて`output_dir`へ変換する
    ///
    /// `output_dir`は存在している必要があります。
    /// `input_dir`の中にある場合、そのディレクトリは走査しません。
    pub fn convert_all(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<TreeSummary, Form2TxtError> {
        let mut run = TreeRun {
            output_root: output_dir.canonicalize().ok(),
            ..TreeRun::default()
        };
        self.walk(input_dir, output_dir, &mut run)?;
        Ok(run.summary)
    }

    fn walk(&self, input_dir: &Path, output_dir: &Path, run: &mut TreeRun) -> Result<(), Form2TxtError> {
        tracing::debug!(
            input = %input_dir.display(),
            output = %output_dir.display(),
            "entering directory"
        );

        let layout = self.converter.config().layout;
        let parent_name = match layout {
            OutputLayout::Flattened => dir_name(input_dir),
            OutputLayout::Mirrored => String::new(),
        };

        for path in list_entries(input_dir)? {
            if path.is_dir() {
                if run.is_output_root(&path) {
                    tracing::debug!(dir = %path.display(), "skipping output directory");
                    continue;
                }
                match layout {
                    OutputLayout::Flattened => self.walk(&path, output_dir, run)?,
                    OutputLayout::Mirrored => {
                        let Some(name) = path.file_name() else {
                            continue;
                        };
                        let sub_output = output_dir.join(name);
                        create_dir_idempotent(&sub_output)?;
                        self.walk(&path, &sub_output, run)?;
                    }
                }
                continue;
            }

            let file_name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let task = ConversionTask {
                output: output_dir.join(output_file_name(&parent_name, &file_name, layout)),
                input: path,
            };

            if let Err(e) = self.run_task(&task, run) {
                tracing::error!(
                    input = %task.input.display(),
                    error = %e,
                    "conversion failed; aborting the batch"
                );
                return Err(e);
            }
        }

        Ok(())
    }

    fn run_task(&self, task: &ConversionTask, run: &mut TreeRun) -> Result<(), Form2TxtError> {
        let sheets = self.converter.read_sheets(&task.input)?;

        // 何も書き出さないファイルは衝突しない
        if !sheets.is_empty() && run.written.contains(&task.output) {
            if self.converter.config().detect_collisions {
                return Err(Form2TxtError::OutputCollision {
                    path: task.output.clone(),
                });
            }
            tracing::warn!(
                input = %task.input.display(),
                output = %task.output.display(),
                "overwriting output written earlier in this run"
            );
        }

        match self
            .converter
            .write_file(&task.input, &task.output, &sheets)?
        {
            ConversionOutcome::Converted { .. } => {
                run.summary.converted += 1;
                run.written.insert(task.output.clone());
            }
            ConversionOutcome::SheetNotFound => run.summary.skipped += 1,
        }
        Ok(())
    }
}
