//! Security Module
//!
//! 信頼できないExcelファイルを読むためのセキュリティ対策を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃、巨大ファイルへの対策を提供します。

use crate::error::Form2TxtError;

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

impl SecurityConfig {
    /// 入力ファイルサイズの上限を検証する
    pub fn check_input_size(&self, size: u64) -> Result<(), Form2TxtError> {
        if size > self.max_input_file_size {
            return Err(Form2TxtError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            )));
        }
        Ok(())
    }
}

/// ZIPエントリ名を検証する
///
/// ブックの部品名は`xl/worksheets/sheet1.xml`のような`/`区切りの相対パスに限ります。
/// 先頭の`/`、ドライブ指定（`C:`）、`..`の要素、`\`を含む名前は拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }
    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }
    if path.starts_with('/') {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    for (index, part) in path.split('/').enumerate() {
        if part == ".." {
            return Err(format!("Path traversal detected: {}", path));
        }
        if index == 0 && part.len() == 2 && part.ends_with(':') {
            return Err(format!("Absolute path is not allowed: {}", path));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_zip_path_valid() {
        assert!(validate_zip_path("xl/workbook.xml").is_ok());
        assert!(validate_zip_path("xl/worksheets/sheet1.xml").is_ok());
        assert!(validate_zip_path("xl/styles.xml").is_ok());
    }

    #[test]
    fn test_validate_zip_path_empty() {
        assert!(validate_zip_path("").is_err());
    }

    #[test]
    fn test_validate_zip_path_absolute() {
        assert!(validate_zip_path("/etc/passwd").is_err());
        assert!(validate_zip_path("C:\\Windows\\system32").is_err());
    }

    #[test]
    fn test_validate_zip_path_traversal() {
        assert!(validate_zip_path("../etc/passwd").is_err());
        assert!(validate_zip_path("xl/../../etc/passwd").is_err());
    }

    #[test]
    fn test_validate_zip_path_backslash() {
        assert!(validate_zip_path("xl\\workbook.xml").is_err());
    }

    #[test]
    fn test_validate_zip_path_drive_letter() {
        assert!(validate_zip_path("C:/Windows/system32").is_err());
    }

    #[test]
    fn test_validate_zip_path_dots_inside_name() {
        assert!(validate_zip_path("xl/media/image..png").is_ok());
        assert!(validate_zip_path("xl/./workbook.xml").is_ok());
    }

    #[test]
    fn test_check_input_size() {
        let config = SecurityConfig {
            max_input_file_size: 10,
            ..SecurityConfig::default()
        };
        assert!(config.check_input_size(10).is_ok());
        match config.check_input_size(11) {
            Err(Form2TxtError::SecurityViolation(msg)) => {
                assert!(msg.contains("exceeds maximum"));
            }
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }
}
