use crate::models::rubric::RubricSpec;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载评分标准
pub async fn load_rubric(rubric_file_path: &Path) -> Result<RubricSpec> {
    let content = fs::read_to_string(rubric_file_path)
        .await
        .with_context(|| format!("无法读取评分标准文件: {}", rubric_file_path.display()))?;

    let rubric = RubricSpec::from_toml_str(&content)
        .with_context(|| format!("无法解析评分标准文件: {}", rubric_file_path.display()))?;

    tracing::info!(
        "成功加载评分标准 {} (版本 {}, {} 条标准)",
        rubric.title,
        rubric.version,
        rubric.criteria.len()
    );

    Ok(rubric)
}

/// 按配置加载评分标准，未指定文件时使用内置版本
pub async fn load_rubric_or_embedded(rubric_file_path: Option<&Path>) -> Result<RubricSpec> {
    match rubric_file_path {
        Some(path) => load_rubric(path).await,
        None => RubricSpec::embedded().context("内置评分标准无效"),
    }
}
