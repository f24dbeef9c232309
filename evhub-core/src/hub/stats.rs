use serde::Serialize;

/// 同步发送的结果：本次匹配并尝试调用的处理器数量，以及其中失败的数量
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub matched: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn succeeded(&self) -> usize {
        self.matched - self.failed
    }
}

/// 运行统计快照（仅用于监控与测试）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// 成功完成的处理器调用
    pub delivered: usize,
    /// 返回错误或 panic 的处理器调用
    pub failed: usize,
    /// 出队时没有任何匹配处理器的事件
    pub unhandled: usize,
    pub queued: usize,
    pub buffered: usize,
    pub handlers: usize,
}
