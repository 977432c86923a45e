use crate::clients::AssessmentApi;
use crate::config::{Config, RunMode};
use crate::error::AppError;
use crate::models::assessment::option_label;
use crate::models::loaders;
use crate::models::script::{AttemptScript, AuthorScript};
use crate::models::submission::AnswerValue;
use crate::services::{
    AssessmentService, ConfirmationGate, FixedGate, MemoryAssessmentService, StdinGate,
    WarnWriter,
};
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_scripts_loaded, log_startup,
    print_final_stats, question_preview,
};
use crate::workflow::{AssessmentEditor, AssessmentRunner, GradingFlow, SubmitOutcome};
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    service: Arc<dyn AssessmentService>,
    gate: Arc<dyn ConfirmationGate>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(config.run_mode.name(), config.max_concurrent_scripts);

        // 选择后端：离线用内存服务，在线用 HTTP 客户端
        let service: Arc<dyn AssessmentService> = if config.offline {
            info!("💡 离线模式，使用内存服务（种子: {}）", config.seed_file);
            let seeds = loaders::load_seed_file(&config.seed_file).await?;
            Arc::new(MemoryAssessmentService::with_assessments(seeds))
        } else {
            info!("🔍 考核服务地址: {}", config.service_base_url);
            Arc::new(AssessmentApi::new(&config)?)
        };

        // 确认门：无人值守时一律按"是"
        let gate: Arc<dyn ConfirmationGate> = if config.assume_yes {
            Arc::new(FixedGate(true))
        } else {
            Arc::new(StdinGate)
        };

        Ok(Self {
            config,
            service,
            gate,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        match self.config.run_mode {
            RunMode::Attempt => self.run_attempt_mode().await,
            RunMode::Author => self.run_author_mode().await,
            RunMode::Grade => self.run_grade_mode().await,
        }
    }

    // ========== 作答模式 ==========

    async fn run_attempt_mode(&self) -> Result<()> {
        info!("\n📁 正在扫描待处理的作答脚本...");
        let scripts =
            loaders::load_attempt_scripts(&self.config.effective_script_folder()).await?;

        if scripts.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML脚本，程序结束");
            return Ok(());
        }

        let total = scripts.len();
        log_scripts_loaded(total, self.config.max_concurrent_scripts);

        let stats = self.process_all_attempts(scripts).await?;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 分批并发处理全部作答脚本
    async fn process_all_attempts(&self, scripts: Vec<AttemptScript>) -> Result<ProcessingStats> {
        let max_concurrent = self.config.max_concurrent_scripts;
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = scripts.len();
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        // 分批处理
        for batch_start in (0..total).step_by(max_concurrent) {
            let batch_end = (batch_start + max_concurrent).min(total);
            let batch_scripts = &scripts[batch_start..batch_end];
            let batch_num = (batch_start / max_concurrent) + 1;
            let total_batches = (total + max_concurrent - 1) / max_concurrent;

            log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);

            let batch_result = self
                .process_attempt_batch(batch_scripts, batch_start, semaphore.clone())
                .await?;

            stats.success += batch_result.success;
            stats.failed += batch_result.failed;

            log_batch_complete(
                batch_num,
                batch_result.success,
                batch_result.success + batch_result.failed,
            );
        }

        Ok(stats)
    }

    /// 处理单个批次，一个脚本一个任务
    async fn process_attempt_batch(
        &self,
        batch_scripts: &[AttemptScript],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut batch_handles = Vec::new();

        for (idx, script) in batch_scripts.iter().enumerate() {
            let script_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let script_clone = script.clone();
            let service = Arc::clone(&self.service);
            let gate = Arc::clone(&self.gate);
            let student_id = script.student_id.unwrap_or(self.config.student_id);
            let verbose = self.config.verbose_logging;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let warn_writer = WarnWriter::new();
                match process_attempt_script(
                    &service,
                    &gate,
                    &script_clone,
                    student_id,
                    script_index,
                    verbose,
                )
                .await
                {
                    Ok(submitted) => Ok(submitted),
                    Err(e) => {
                        error!("[脚本 {}] ❌ 处理过程中发生错误: {}", script_index, e);
                        if let Err(write_err) = warn_writer
                            .write(script_clone.assessment_id, 0, &e.to_string())
                            .await
                        {
                            warn!("写入 warn.txt 失败: {}", write_err);
                        }
                        Err(e)
                    }
                }
            });
            batch_handles.push((script_index, handle));
        }

        // 等待本批所有任务完成
        let mut result = BatchResult::default();

        for (script_index, handle) in batch_handles {
            match handle.await {
                Ok(Ok(true)) => {
                    result.success += 1;
                }
                Ok(Ok(false)) | Ok(Err(_)) => {
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[脚本 {}] 任务执行失败: {}", script_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }

    // ========== 出题模式 ==========

    async fn run_author_mode(&self) -> Result<()> {
        info!("\n📁 正在扫描待处理的出题脚本...");
        let scripts =
            loaders::load_author_scripts(&self.config.effective_script_folder()).await?;

        if scripts.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML脚本，程序结束");
            return Ok(());
        }

        let total = scripts.len();
        info!("✓ 找到 {} 个出题脚本，逐个处理\n", total);

        let warn_writer = WarnWriter::new();
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (idx, script) in scripts.iter().enumerate() {
            let script_index = idx + 1;
            match self
                .process_author_script(script, script_index, &warn_writer)
                .await
            {
                Ok(()) => stats.success += 1,
                Err(e) => {
                    error!("[脚本 {}] ❌ 处理过程中发生错误: {}", script_index, e);
                    if let Err(write_err) = warn_writer
                        .write(script.assessment_id.unwrap_or(0), 0, &e.to_string())
                        .await
                    {
                        warn!("写入 warn.txt 失败: {}", write_err);
                    }
                    stats.failed += 1;
                }
            }
        }

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 处理单个出题脚本：定位或创建考核，逐题走表单流程
    async fn process_author_script(
        &self,
        script: &AuthorScript,
        script_index: usize,
        warn_writer: &WarnWriter,
    ) -> Result<()> {
        info!(
            "[脚本 {}] 🚀 开始出题: {}",
            script_index,
            script.display_name()
        );

        let mut editor = match script.assessment_id {
            Some(assessment_id) => {
                AssessmentEditor::open(
                    Arc::clone(&self.service),
                    Arc::clone(&self.gate),
                    assessment_id,
                )
                .await?
            }
            None => match &script.assessment {
                Some(spec) => {
                    let new_assessment = match spec.to_new_assessment() {
                        Some(new_assessment) => new_assessment,
                        None => {
                            anyhow::bail!("考核类型 '{}' 无法识别", spec.assessment_type)
                        }
                    };
                    let assessment = self.service.create_assessment(new_assessment).await?;
                    info!(
                        "[脚本 {}] ✓ 已创建考核 {} 《{}》",
                        script_index, assessment.id, assessment.title
                    );
                    AssessmentEditor::new(
                        Arc::clone(&self.service),
                        Arc::clone(&self.gate),
                        assessment,
                    )
                }
                None => anyhow::bail!("脚本既没有 assessment_id 也没有 [assessment] 段"),
            },
        };

        let assessment_id = editor.assessment().id;
        let mut added = 0usize;

        for (question_idx, script_question) in script.questions.iter().enumerate() {
            let draft = match script_question.to_draft() {
                Some(draft) => draft,
                None => {
                    warn!(
                        "[脚本 {}] ⚠️ 第 {} 题类型 '{}' 无法识别，跳过",
                        script_index,
                        question_idx + 1,
                        script_question.question_type
                    );
                    if let Err(write_err) = warn_writer
                        .write(
                            assessment_id,
                            0,
                            &format!("题目类型无法识别: {}", script_question.question_type),
                        )
                        .await
                    {
                        warn!("写入 warn.txt 失败: {}", write_err);
                    }
                    continue;
                }
            };

            editor.open_create();
            if let Some(form) = editor.form_mut() {
                *form = draft;
            }

            match editor.submit_form().await {
                Ok(question) => {
                    added += 1;
                    info!(
                        "[脚本 {}] ✓ 第 {} 题已保存 (id: {})",
                        script_index,
                        question_idx + 1,
                        question.id
                    );
                }
                // 校验失败只跳过这一题，不中断整个脚本
                Err(AppError::Validation(e)) => {
                    warn!(
                        "[脚本 {}] ⚠️ 第 {} 题校验未通过，跳过: {}",
                        script_index,
                        question_idx + 1,
                        e
                    );
                    if let Err(write_err) =
                        warn_writer.write(assessment_id, 0, &e.to_string()).await
                    {
                        warn!("写入 warn.txt 失败: {}", write_err);
                    }
                    editor.cancel_form();
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            "[脚本 {}] ✅ 出题完成：新增 {} 题，当前共 {} 题，总分 {}",
            script_index,
            added,
            editor.assessment().question_count(),
            editor.assessment().total_score
        );
        Ok(())
    }

    // ========== 评分模式 ==========

    async fn run_grade_mode(&self) -> Result<()> {
        info!("\n📁 正在扫描待处理的评分脚本...");
        let scripts =
            loaders::load_grade_scripts(&self.config.effective_script_folder()).await?;

        if scripts.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML脚本，程序结束");
            return Ok(());
        }

        let total = scripts.len();
        info!("✓ 找到 {} 个评分脚本，逐个处理\n", total);

        let flow = GradingFlow::new(Arc::clone(&self.service));
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };
        let mut graded_ids = Vec::new();

        for (idx, script) in scripts.iter().enumerate() {
            let script_index = idx + 1;
            info!(
                "[脚本 {}] 🚀 开始评分: {}",
                script_index,
                script.display_name()
            );

            let scores = script.score_map();
            let graded_by = script
                .graded_by
                .clone()
                .unwrap_or_else(|| self.config.graded_by.clone());

            match flow
                .grade(
                    script.submission_id,
                    &scores,
                    &graded_by,
                    script.feedback.as_deref(),
                )
                .await
            {
                Ok(_) => {
                    stats.success += 1;
                    graded_ids.push(script.submission_id);
                }
                Err(e) => {
                    error!("[脚本 {}] ❌ 处理过程中发生错误: {}", script_index, e);
                    stats.failed += 1;
                }
            }
        }

        // 并发拉取全部成绩做汇总
        if !graded_ids.is_empty() {
            self.log_grade_summary(&graded_ids).await;
        }

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 并发拉取已评分提交的成绩并打印汇总块
    async fn log_grade_summary(&self, submission_ids: &[i64]) {
        info!("\n{}", "=".repeat(60));
        info!("📊 成绩汇总");
        info!("{}", "=".repeat(60));

        let futures: Vec<_> = submission_ids
            .iter()
            .map(|id| self.service.get_grade(*id))
            .collect();
        let results = join_all(futures).await;

        for (submission_id, result) in submission_ids.iter().zip(results) {
            match result {
                Ok(grade) => info!(
                    "📋 提交 {}: {}/{} (评分人: {})",
                    submission_id, grade.total_score, grade.max_score, grade.graded_by
                ),
                Err(e) => warn!("⚠️ 提交 {} 的成绩拉取失败: {}", submission_id, e),
            }
        }
        info!("{}", "=".repeat(60));
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}

/// 处理单个作答脚本：加载考核，按题目顺序记录脚本作答，最后提交
///
/// # 返回
/// `Ok(true)` 提交成功；`Ok(false)` 用户取消提交
async fn process_attempt_script(
    service: &Arc<dyn AssessmentService>,
    gate: &Arc<dyn ConfirmationGate>,
    script: &AttemptScript,
    student_id: i64,
    script_index: usize,
    verbose: bool,
) -> Result<bool> {
    info!(
        "[脚本 {}] 🚀 开始作答: {} (学生 {})",
        script_index,
        script.display_name(),
        student_id
    );

    let mut runner = AssessmentRunner::new(Arc::clone(service), Arc::clone(gate), student_id);
    runner.load(script.assessment_id).await?;

    let total = runner.question_count();

    // 按题目顺序逐题作答
    loop {
        let question = match runner.current_question() {
            Some(question) => question.clone(),
            None => break,
        };

        if verbose {
            info!(
                "[脚本 {}] 📄 第 {}/{} 题 ({:.0}%): {}",
                script_index,
                runner.current_index() + 1,
                total,
                runner.progress_percent(),
                question_preview(&question.text, 20)
            );
        }

        match script.answers.iter().find(|a| a.question_id == question.id) {
            Some(entry) => match entry.to_value() {
                Some(value) => {
                    let chosen = match &value {
                        AnswerValue::Choice(index) => Some(*index),
                        AnswerValue::Text(_) => None,
                    };
                    match runner.record_answer(question.id, value) {
                        Ok(()) => {
                            if verbose {
                                if let Some(index) = chosen {
                                    info!("[脚本 {}] ✓ 已选 {}", script_index, option_label(index));
                                }
                            }
                        }
                        Err(e) => warn!(
                            "[脚本 {}] ⚠️ 题目 {} 作答无效，跳过: {}",
                            script_index, question.id, e
                        ),
                    }
                }
                None => {
                    warn!(
                        "[脚本 {}] ⚠️ 题目 {} 的脚本作答需要且只能给 option 或 text 之一，跳过",
                        script_index, question.id
                    );
                }
            },
            None => {
                if verbose {
                    info!("[脚本 {}] 该题脚本未作答", script_index);
                }
            }
        }

        if runner.is_last_question() {
            break;
        }
        runner.go_next()?;
    }

    info!(
        "[脚本 {}] 已作答 {}/{} 题",
        script_index,
        runner.answered_count(),
        total
    );

    match runner.submit().await? {
        SubmitOutcome::Submitted => {
            info!("[脚本 {}] ✅ 作答完成", script_index);
            Ok(true)
        }
        SubmitOutcome::Cancelled => {
            info!("[脚本 {}] 已取消提交", script_index);
            Ok(false)
        }
    }
}
