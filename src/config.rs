use crate::error::ConfigError;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// 学生作答并提交
    #[default]
    Attempt,
    /// 教师出题（向考核中批量添加题目）
    Author,
    /// 教师评分
    Grade,
}

impl RunMode {
    /// 从字符串解析运行模式（大小写不敏感，接受常见别名）
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "attempt" | "take" | "student" | "作答" => Ok(RunMode::Attempt),
            "author" | "edit" | "teacher" | "出题" => Ok(RunMode::Author),
            "grade" | "grading" | "评分" => Ok(RunMode::Grade),
            _ => Err(ConfigError::EnvVarParseFailed {
                var_name: "RUN_MODE".to_string(),
                value: s.to_string(),
                expected_type: "attempt | author | grade".to_string(),
            }),
        }
    }

    /// 模式的显示名称
    pub fn name(self) -> &'static str {
        match self {
            RunMode::Attempt => "作答模式",
            RunMode::Author => "出题模式",
            RunMode::Grade => "评分模式",
        }
    }

    /// 模式默认的脚本子目录名
    pub fn dir_name(self) -> &'static str {
        match self {
            RunMode::Attempt => "attempt",
            RunMode::Author => "author",
            RunMode::Grade => "grade",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的作答脚本数量
    pub max_concurrent_scripts: usize,
    /// 运行模式
    pub run_mode: RunMode,
    /// 考核服务基础URL
    pub service_base_url: String,
    /// 请求鉴权令牌（为空则不携带 Authorization 头）
    pub auth_token: String,
    /// HTTP 请求超时（秒）
    pub http_timeout_secs: u64,
    /// 脚本文件存放目录（为空时按运行模式使用 scripts/<模式>）
    pub script_folder: String,
    /// 离线模式种子数据文件
    pub seed_file: String,
    /// 是否使用内存服务（离线演示，不访问后端）
    pub offline: bool,
    /// 作答学生ID（脚本未指定时使用）
    pub student_id: i64,
    /// 评分人名称（脚本未指定时使用）
    pub graded_by: String,
    /// 确认门一律按"是"处理（无人值守批量运行）
    pub assume_yes: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_scripts: 4,
            run_mode: RunMode::Attempt,
            service_base_url: "http://localhost:8080/api".to_string(),
            auth_token: String::new(),
            http_timeout_secs: 15,
            script_folder: String::new(),
            seed_file: "data/assessments.toml".to_string(),
            offline: false,
            student_id: 3,
            graded_by: "Instructor".to_string(),
            assume_yes: false,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    /// 当前模式实际使用的脚本目录
    pub fn effective_script_folder(&self) -> String {
        if self.script_folder.is_empty() {
            format!("scripts/{}", self.run_mode.dir_name())
        } else {
            self.script_folder.clone()
        }
    }

    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_scripts: std::env::var("MAX_CONCURRENT_SCRIPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_scripts),
            run_mode: std::env::var("RUN_MODE").ok().and_then(|v| match RunMode::parse(&v) {
                Ok(mode) => Some(mode),
                Err(e) => {
                    eprintln!("⚠️ {}，使用默认模式", e);
                    None
                }
            }).unwrap_or(default.run_mode),
            service_base_url: std::env::var("SERVICE_BASE_URL").unwrap_or(default.service_base_url),
            auth_token: std::env::var("AUTH_TOKEN").unwrap_or(default.auth_token),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.http_timeout_secs),
            script_folder: std::env::var("SCRIPT_FOLDER").unwrap_or(default.script_folder),
            seed_file: std::env::var("SEED_FILE").unwrap_or(default.seed_file),
            offline: std::env::var("OFFLINE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.offline),
            student_id: std::env::var("STUDENT_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(default.student_id),
            graded_by: std::env::var("GRADED_BY").unwrap_or(default.graded_by),
            assume_yes: std::env::var("ASSUME_YES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.assume_yes),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parses_aliases() {
        assert_eq!(RunMode::parse("Attempt").unwrap(), RunMode::Attempt);
        assert_eq!(RunMode::parse("take").unwrap(), RunMode::Attempt);
        assert_eq!(RunMode::parse("出题").unwrap(), RunMode::Author);
        assert_eq!(RunMode::parse(" grading ").unwrap(), RunMode::Grade);
    }

    #[test]
    fn run_mode_rejects_unknown_value() {
        assert!(RunMode::parse("review").is_err());
    }

    #[test]
    fn script_folder_falls_back_to_mode_directory() {
        let mut config = Config::default();
        config.run_mode = RunMode::Grade;
        assert_eq!(config.effective_script_folder(), "scripts/grade");

        config.script_folder = "my_scripts".to_string();
        assert_eq!(config.effective_script_folder(), "my_scripts");
    }
}
