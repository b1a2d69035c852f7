// ==========================================
// 车辆夜间入段排产系统 - 引擎层错误类型
// ==========================================

use crate::config::ConfigError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("数据源读取失败: {0}")]
    DataProvider(#[from] RepositoryError),

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error("无可用股道: {0}")]
    NoActiveBays(String),

    #[error("求解任务异常: {0}")]
    SolverTask(String),

    #[error("输入无效: {0}")]
    InvalidInput(String),
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
