//! 分发引擎配置
//!
//! 可由宿主通过 serde 从任意格式加载，缺省字段回落到默认值。
//!
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// 实例名称（用于日志区分多个 hub）
    pub name: String,
    /// 消费者每处理多少个事件主动让出一次运行时
    pub consumer_yield_every: usize,
    /// 投递队列长度达到该值时记录告警（不做背压）
    pub queue_warn_threshold: Option<usize>,
    /// 单个聚合缓冲数达到该值时记录告警
    pub buffer_warn_threshold: Option<usize>,
}

impl HubConfig {
    pub const DEFAULT_NAME: &'static str = "default";
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            consumer_yield_every: 64,
            queue_warn_threshold: Some(10_000),
            buffer_warn_threshold: Some(1_000),
        }
    }
}
