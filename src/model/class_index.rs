//! クラス名とクラスインデックスの対応表
//!
//! 学習データのサブフォルダ名から作成します。インデックスはフォルダ名の
//! 昇順で割り当てられ、出力層のユニット順序と一致している前提です（未検証）。

use anyhow::{Context, Result};
use std::path::Path;

/// クラス名 → インデックスの対応表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIndex {
    names: Vec<String>,
}

impl ClassIndex {
    /// クラス名の一覧から作成（順序はそのまま）
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// ルートディレクトリ直下のサブフォルダ名から作成
    pub fn from_directory(root: &Path) -> Result<Self> {
        let mut names = Vec::new();

        let entries = std::fs::read_dir(root)
            .with_context(|| format!("ディレクトリを開けません: {}", root.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid directory name: {:?}", path))?
                .to_string();
            names.push(name);
        }

        names.sort();
        Ok(Self { names })
    }

    /// クラス数を取得
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// クラスインデックスからクラス名を取得
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// クラス名からクラスインデックスを取得
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// ワンホットのラベルベクトル（次元数 = クラス数）
    pub fn one_hot(&self, index: usize) -> Vec<f32> {
        let mut label = vec![0.0; self.names.len()];
        if let Some(slot) = label.get_mut(index) {
            *slot = 1.0;
        }
        label
    }

    /// 対応表を表示
    pub fn print_info(&self) {
        for (i, name) in self.names.iter().enumerate() {
            println!("  {}: {}", i, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "flower_class_index_{}_{}",
            name,
            std::process::id()
        ));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sorted_and_stable() {
        let root = scratch_dir("stable");
        for name in ["tulip", "daisy", "rose", "dandelion", "sunflower"] {
            std::fs::create_dir_all(root.join(name)).unwrap();
        }
        // ファイルはクラスとして扱わない
        std::fs::write(root.join("README.txt"), b"x").unwrap();

        let first = ClassIndex::from_directory(&root).unwrap();
        let second = ClassIndex::from_directory(&root).unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        assert_eq!(
            first.names(),
            &["daisy", "dandelion", "rose", "sunflower", "tulip"]
        );
        assert_eq!(first.index_of("rose"), Some(2));
        assert_eq!(first.name_of(4), Some("tulip"));
        assert_eq!(first.name_of(5), None);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_missing_directory_is_error() {
        let root = std::env::temp_dir().join("flower_class_index_does_not_exist");
        assert!(ClassIndex::from_directory(&root).is_err());
    }

    #[test]
    fn test_one_hot() {
        let index = ClassIndex::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(index.one_hot(1), vec![0.0, 1.0, 0.0]);
        assert_eq!(index.one_hot(7), vec![0.0, 0.0, 0.0]);
    }
}
