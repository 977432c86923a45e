use crate::models::assessment::Assessment;
use crate::models::script::{AttemptScript, AuthorScript, GradeScript, SeedData};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 读取并解析单个 TOML 文件
async fn load_toml_file<T: DeserializeOwned>(toml_file_path: &Path) -> Result<T> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))
}

/// 收集文件夹中的全部 TOML 文件路径（按文件名排序）
async fn collect_toml_paths(folder_path: &str) -> Result<Vec<PathBuf>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }

    toml_files.sort();
    Ok(toml_files)
}

/// 从文件夹加载全部作答脚本，解析失败的文件跳过
pub async fn load_attempt_scripts(folder_path: &str) -> Result<Vec<AttemptScript>> {
    let mut scripts = Vec::new();

    for path in collect_toml_paths(folder_path).await? {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_toml_file::<AttemptScript>(&path).await {
            Ok(mut script) => {
                script.file_path = Some(path.to_string_lossy().to_string());
                tracing::info!("成功加载 {} 条作答", script.answers.len());
                scripts.push(script);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(scripts)
}

/// 从文件夹加载全部出题脚本，解析失败的文件跳过
pub async fn load_author_scripts(folder_path: &str) -> Result<Vec<AuthorScript>> {
    let mut scripts = Vec::new();

    for path in collect_toml_paths(folder_path).await? {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_toml_file::<AuthorScript>(&path).await {
            Ok(mut script) => {
                script.file_path = Some(path.to_string_lossy().to_string());
                tracing::info!("成功加载 {} 个题目", script.questions.len());
                scripts.push(script);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(scripts)
}

/// 从文件夹加载全部评分脚本，解析失败的文件跳过
pub async fn load_grade_scripts(folder_path: &str) -> Result<Vec<GradeScript>> {
    let mut scripts = Vec::new();

    for path in collect_toml_paths(folder_path).await? {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_toml_file::<GradeScript>(&path).await {
            Ok(mut script) => {
                script.file_path = Some(path.to_string_lossy().to_string());
                tracing::info!("成功加载 {} 条评分", script.scores.len());
                scripts.push(script);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(scripts)
}

/// 加载离线模式的种子数据；文件不存在时返回空列表
pub async fn load_seed_file(seed_path: &str) -> Result<Vec<Assessment>> {
    let path = Path::new(seed_path);

    if !path.exists() {
        tracing::warn!("种子文件不存在: {}，使用空数据启动", seed_path);
        return Ok(Vec::new());
    }

    let seed: SeedData = load_toml_file(path).await?;
    tracing::info!("成功加载 {} 份考核种子数据", seed.assessments.len());

    Ok(seed.assessments)
}
