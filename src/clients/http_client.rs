/// 考核服务 API 客户端
///
/// 封装所有与考核后端相关的 HTTP 调用逻辑
use crate::config::Config;
use crate::error::ServiceError;
use crate::models::assessment::{Assessment, NewAssessment, Question, QuestionInput};
use crate::models::submission::{
    Answer, AnswerPayload, Grade, SubmitRequest, Submission, SubmissionPayload,
};
use crate::services::AssessmentService;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// 考核服务 API 客户端
pub struct AssessmentApi {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl AssessmentApi {
    /// 创建新的考核服务客户端
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self {
            base_url: config.service_base_url.trim_end_matches('/').to_string(),
            token: config.auth_token.clone(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.token)
        }
    }

    /// 发送请求并做状态分类
    ///
    /// # 参数
    /// - `builder`: 已装配好的请求
    /// - `endpoint`: 端点路径（用于日志与错误信息）
    /// - `resource`: 404 时报告的资源名
    async fn send(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        resource: &str,
    ) -> Result<Response, ServiceError> {
        let response = self.authorized(builder).send().await.map_err(|e| {
            ServiceError::RequestFailed {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(endpoint, resource, status, &body))
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> Result<T, ServiceError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::DecodeFailed {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<T, ServiceError> {
        let builder = self.http.request(Method::GET, self.url(path));
        let response = self.send(builder, path, resource).await?;
        Self::decode(response, path).await
    }
}

#[async_trait]
impl AssessmentService for AssessmentApi {
    async fn list_assessments(&self) -> Result<Vec<Assessment>, ServiceError> {
        self.get_json("/v1/assessments", "考核列表").await
    }

    async fn get_assessment(&self, assessment_id: i64) -> Result<Assessment, ServiceError> {
        let path = format!("/v1/assessments/{}", assessment_id);
        self.get_json(&path, &format!("考核 {}", assessment_id)).await
    }

    async fn create_assessment(
        &self,
        new_assessment: NewAssessment,
    ) -> Result<Assessment, ServiceError> {
        let path = "/v1/assessments";
        debug!("创建考核 Payload: {:?}", new_assessment);

        let builder = self
            .http
            .request(Method::POST, self.url(path))
            .json(&new_assessment);
        let response = self.send(builder, path, "考核").await?;
        Self::decode(response, path).await
    }

    async fn update_assessment(
        &self,
        assessment_id: i64,
        details: NewAssessment,
    ) -> Result<Assessment, ServiceError> {
        let path = format!("/v1/assessments/{}", assessment_id);
        debug!("更新考核 Payload: {:?}", details);

        let builder = self
            .http
            .request(Method::PUT, self.url(&path))
            .json(&details);
        let response = self
            .send(builder, &path, &format!("考核 {}", assessment_id))
            .await?;
        Self::decode(response, &path).await
    }

    async fn delete_assessment(&self, assessment_id: i64) -> Result<(), ServiceError> {
        let path = format!("/v1/assessments/{}", assessment_id);

        let builder = self.http.request(Method::DELETE, self.url(&path));
        self.send(builder, &path, &format!("考核 {}", assessment_id))
            .await?;
        Ok(())
    }

    async fn create_question(
        &self,
        assessment_id: i64,
        input: QuestionInput,
    ) -> Result<Question, ServiceError> {
        let path = format!("/v1/assessments/{}/questions", assessment_id);
        debug!("添加题目 Payload: {:?}", input);

        let builder = self
            .http
            .request(Method::POST, self.url(&path))
            .json(&input);
        let response = self
            .send(builder, &path, &format!("考核 {}", assessment_id))
            .await?;
        Self::decode(response, &path).await
    }

    async fn update_question(
        &self,
        assessment_id: i64,
        question_id: i64,
        input: QuestionInput,
    ) -> Result<Question, ServiceError> {
        let path = format!(
            "/v1/assessments/{}/questions/{}",
            assessment_id, question_id
        );
        debug!("更新题目 Payload: {:?}", input);

        let builder = self.http.request(Method::PUT, self.url(&path)).json(&input);
        let response = self
            .send(builder, &path, &format!("题目 {}", question_id))
            .await?;
        Self::decode(response, &path).await
    }

    async fn delete_question(
        &self,
        assessment_id: i64,
        question_id: i64,
    ) -> Result<(), ServiceError> {
        let path = format!(
            "/v1/assessments/{}/questions/{}",
            assessment_id, question_id
        );

        let builder = self.http.request(Method::DELETE, self.url(&path));
        self.send(builder, &path, &format!("题目 {}", question_id))
            .await?;
        Ok(())
    }

    async fn submit_assessment(
        &self,
        assessment_id: i64,
        student_id: i64,
        answers: Vec<Answer>,
    ) -> Result<Submission, ServiceError> {
        let path = format!("/v1/assessments/{}/submit", assessment_id);
        let request = SubmitRequest {
            assessment_id,
            student_id,
            answers: answers.iter().map(AnswerPayload::from).collect(),
        };
        debug!("提交作答 Payload: {:?}", request);

        let builder = self
            .http
            .request(Method::POST, self.url(&path))
            .json(&request);
        let response = self
            .send(builder, &path, &format!("考核 {}", assessment_id))
            .await?;
        let payload: SubmissionPayload = Self::decode(response, &path).await?;
        Ok(payload.into())
    }

    async fn get_submissions(
        &self,
        assessment_id: i64,
    ) -> Result<Vec<Submission>, ServiceError> {
        let path = format!("/v1/assessments/{}/submissions", assessment_id);
        let payloads: Vec<SubmissionPayload> = self
            .get_json(&path, &format!("考核 {}", assessment_id))
            .await?;
        Ok(payloads.into_iter().map(Submission::from).collect())
    }

    async fn get_submission(&self, submission_id: i64) -> Result<Submission, ServiceError> {
        let path = format!("/v1/submissions/{}", submission_id);
        let payload: SubmissionPayload = self
            .get_json(&path, &format!("提交 {}", submission_id))
            .await?;
        Ok(payload.into())
    }

    async fn grade_answer(&self, answer_id: i64, score: f64) -> Result<Answer, ServiceError> {
        let path = format!("/v1/answers/{}/score", answer_id);

        let builder = self
            .http
            .request(Method::PUT, self.url(&path))
            .query(&[("score", score)]);
        let response = self
            .send(builder, &path, &format!("作答 {}", answer_id))
            .await?;
        let payload: AnswerPayload = Self::decode(response, &path).await?;
        Ok(payload.into())
    }

    async fn grade_submission(
        &self,
        submission_id: i64,
        graded_by: &str,
        feedback: Option<&str>,
    ) -> Result<Grade, ServiceError> {
        let path = format!("/v1/submissions/{}/grade", submission_id);
        let body = json!({
            "gradedBy": graded_by,
            "feedback": feedback,
        });
        debug!("出成绩 Payload: {}", body);

        let builder = self.http.request(Method::POST, self.url(&path)).json(&body);
        let response = self
            .send(builder, &path, &format!("提交 {}", submission_id))
            .await?;
        Self::decode(response, &path).await
    }

    async fn get_grade(&self, submission_id: i64) -> Result<Grade, ServiceError> {
        let path = format!("/v1/submissions/{}/grade", submission_id);
        self.get_json(&path, &format!("提交 {} 的成绩", submission_id))
            .await
    }

    async fn get_history(&self, student_id: i64) -> Result<Vec<Submission>, ServiceError> {
        let path = format!("/v1/history/{}", student_id);
        let payloads: Vec<SubmissionPayload> = self
            .get_json(&path, &format!("学生 {} 的历史", student_id))
            .await?;
        Ok(payloads.into_iter().map(Submission::from).collect())
    }
}

/// 把非 2xx 响应分类成服务错误
fn classify_error(
    endpoint: &str,
    resource: &str,
    status: StatusCode,
    body: &str,
) -> ServiceError {
    let message = extract_error_message(body);

    match status.as_u16() {
        404 => ServiceError::NotFound {
            resource: resource.to_string(),
        },
        400 | 422 => ServiceError::Rejected {
            message: message.unwrap_or_else(|| "请求被拒绝".to_string()),
        },
        409 => ServiceError::Conflict {
            message: message.unwrap_or_else(|| "资源状态冲突".to_string()),
        },
        code => ServiceError::BadResponse {
            endpoint: endpoint.to_string(),
            status: code,
            message,
        },
    }
}

/// 从响应体里提取错误信息
///
/// 优先取 JSON 的 message / error 字段，取不到就用裁剪后的原文
fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }

    // 按字符截断，避免切到多字节字符中间
    let preview: String = trimmed.chars().take(200).collect();
    Some(preview)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_resource_label() {
        let error = classify_error("/v1/assessments/99", "考核 99", StatusCode::NOT_FOUND, "");
        assert!(matches!(
            error,
            ServiceError::NotFound { resource } if resource == "考核 99"
        ));
    }

    #[test]
    fn rejection_uses_message_field_from_body() {
        let body = r#"{"message": "题干不能为空"}"#;
        let error = classify_error("/v1/assessments", "考核", StatusCode::BAD_REQUEST, body);
        assert!(matches!(
            error,
            ServiceError::Rejected { message } if message == "题干不能为空"
        ));
    }

    #[test]
    fn conflict_maps_to_conflict_error() {
        let body = r#"{"error": "考核已提交"}"#;
        let error = classify_error("/v1/assessments/1/submit", "考核 1", StatusCode::CONFLICT, body);
        assert!(matches!(
            error,
            ServiceError::Conflict { message } if message == "考核已提交"
        ));
    }

    #[test]
    fn server_error_keeps_status_and_body_preview() {
        let error = classify_error(
            "/v1/assessments",
            "考核列表",
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        );
        match error {
            ServiceError::BadResponse {
                status, message, ..
            } => {
                assert_eq!(status, 500);
                assert_eq!(message.as_deref(), Some("boom"));
            }
            other => panic!("意外的错误分类: {:?}", other),
        }
    }

    #[test]
    fn plain_text_body_is_truncated_to_preview() {
        let long_body = "x".repeat(500);
        let message = extract_error_message(&long_body).unwrap();
        assert_eq!(message.len(), 200);
    }
}
