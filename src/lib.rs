//! # Essay Feedback
//!
//! 论说文评改核心：接收学生输入的文本或手写照片，按固定评分标准调用
//! chat completion 服务，返回评改反馈。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 论说文、图片、评分标准、消息序列、评改结果
//! - `models/loaders` - 从 TOML 文件加载评分标准
//!
//! ### ② 业务能力层（Services / Clients）
//! - `services/image_encoder` - 图片转 data URI
//! - `services/prompt_builder` - 组装消息序列（文本 / 图片 / 提取三种模式）
//! - `clients/llm_client` - 调用补全服务，所有失败都在这里转换为 `CompletionError`
//!
//! ### ③ 流程层（Workflow）
//! - `AnalysisSession` - 会话状态，由交互上下文持有
//! - `EssayFlow` - 流程编排（文本评改 / 两阶段图片评改 / 单阶段图片评改）
//!
//! ### ④ 编排层（App）
//! - `App` - 初始化配置、评分标准和客户端，为表单宿主创建会话
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod test_utils;

// 重新导出常用类型
pub use app::App;
pub use clients::{CompletionClient, CompletionParams, LlmClient, RetryPolicy};
pub use config::{Config, ImageFlow};
pub use error::{AppError, AppResult, CompletionError, ConfigError, RubricError, ValidationError};
pub use models::{Essay, FeedbackResult, ImageAsset, MediaType, MessageSequence, RubricSpec};
pub use workflow::{Action, AnalysisSession, EssayFlow, FlowOutcome, FlowResponse, FlowState, FlowWarning};
