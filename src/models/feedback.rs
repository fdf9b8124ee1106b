use chrono::{DateTime, Local};

use crate::error::CompletionError;
use crate::models::rubric::StatusMarkers;

/// 表单宿主展示失败时使用的前缀
pub const SYSTEM_ERROR_PREFIX: &str = "시스템 오류가 발생했습니다";

/// 评改结果，只展示一次，不做持久化
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackResult {
    /// 评改成功
    Completed {
        text: String,
        completed_at: DateTime<Local>,
    },
    /// 评改失败
    Failed { error: CompletionError },
}

/// 反馈中各状态标记出现的次数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerCounts {
    pub pass: usize,
    pub partial: usize,
    pub fail: usize,
}

impl FeedbackResult {
    pub fn completed(text: impl Into<String>) -> Self {
        FeedbackResult::Completed {
            text: text.into(),
            completed_at: Local::now(),
        }
    }

    pub fn failed(error: CompletionError) -> Self {
        FeedbackResult::Failed { error }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FeedbackResult::Failed { .. })
    }

    /// 成功时的反馈正文
    pub fn text(&self) -> Option<&str> {
        match self {
            FeedbackResult::Completed { text, .. } => Some(text),
            FeedbackResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&CompletionError> {
        match self {
            FeedbackResult::Completed { .. } => None,
            FeedbackResult::Failed { error } => Some(error),
        }
    }

    /// 交给表单宿主渲染的文本，失败时带有系统错误前缀
    pub fn display_text(&self) -> String {
        match self {
            FeedbackResult::Completed { text, .. } => text.clone(),
            FeedbackResult::Failed { error } => format!("{}: {}", SYSTEM_ERROR_PREFIX, error),
        }
    }

    /// 统计反馈正文中的状态标记
    pub fn marker_counts(&self, markers: &StatusMarkers) -> MarkerCounts {
        let Some(text) = self.text() else {
            return MarkerCounts::default();
        };
        MarkerCounts {
            pass: count_marker(text, &markers.pass),
            partial: count_marker(text, &markers.partial),
            fail: count_marker(text, &markers.fail),
        }
    }
}

fn count_marker(text: &str, marker: &str) -> usize {
    if marker.is_empty() {
        0
    } else {
        text.matches(marker).count()
    }
}
